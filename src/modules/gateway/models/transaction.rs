use serde::{Deserialize, Serialize};

/// Lifecycle states of a PostFinance Checkout transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    Create,
    Pending,
    Confirmed,
    Processing,
    Authorized,
    Completed,
    Fulfill,
    Failed,
    Decline,
    Voided,
}

impl TransactionState {
    /// States PostFinance reports for a charge that went (or is going)
    /// through. `Processing` counts as success: the money movement has been
    /// accepted and the final state arrives via webhook.
    pub fn is_successful(&self) -> bool {
        matches!(
            self,
            Self::Authorized | Self::Completed | Self::Fulfill | Self::Confirmed | Self::Processing
        )
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "CREATE",
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Processing => "PROCESSING",
            Self::Authorized => "AUTHORIZED",
            Self::Completed => "COMPLETED",
            Self::Fulfill => "FULFILL",
            Self::Failed => "FAILED",
            Self::Decline => "DECLINE",
            Self::Voided => "VOIDED",
        };
        write!(f, "{}", s)
    }
}

/// Result of a token charge or transaction lookup at the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct ChargeOutcome {
    /// Gateway-assigned transaction id
    pub id: i64,
    pub state: TransactionState,
    /// Merchant reference echoed back by the gateway, when present
    #[serde(default, rename = "merchantReference")]
    pub merchant_reference: Option<String>,
}

impl ChargeOutcome {
    pub fn is_successful(&self) -> bool {
        self.state.is_successful()
    }

    pub fn transaction_reference(&self) -> String {
        self.id.to_string()
    }
}
