pub mod gateway;
pub mod installments;
pub mod notifications;
pub mod webhooks;
