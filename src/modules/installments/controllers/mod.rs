pub mod installment_controller;
pub mod jobs_controller;
