//! Installment payment service for event ticketing, backed by PostFinance
//! Checkout saved-token charges.
//!
//! The core is the installment scheduling and automatic-charging subsystem:
//! schedule building with exact monetary splits, a charging engine driven by
//! due dates, and a retry/grace-period controller with cascade cancellation.

pub mod config;
pub mod core;
pub mod modules;

// Re-export commonly used types
pub use modules::gateway;
pub use modules::installments;
pub use modules::notifications;
pub use modules::webhooks;
