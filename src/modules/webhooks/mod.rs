pub mod controllers;
pub mod services;
