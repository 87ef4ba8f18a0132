use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::core::{Currency, Result};
use crate::modules::gateway::models::ChargeOutcome;

/// Capability interface over the remote payment API.
///
/// The charging engine and grace controller only ever need these two calls;
/// tests substitute a scripted fake so no test touches the network.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge a saved token. Reuses the existing token; no new tokenization
    /// happens during recurring charges.
    ///
    /// `merchant_reference` must be unique per attempt and doubles as the
    /// gateway-side idempotency key.
    async fn charge_token(
        &self,
        token_reference: &str,
        amount: Decimal,
        currency: Currency,
        merchant_reference: &str,
    ) -> Result<ChargeOutcome>;

    /// Look up the current state of a transaction, used by webhook
    /// reconciliation.
    async fn read_transaction(&self, transaction_id: i64) -> Result<ChargeOutcome>;
}
