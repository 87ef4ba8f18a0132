pub mod transaction;

pub use transaction::{ChargeOutcome, TransactionState};
