pub mod payment_gateway;
pub mod postfinance_client;

pub use payment_gateway::PaymentGateway;
pub use postfinance_client::PostFinanceClient;
