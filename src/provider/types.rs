//! Types exchanged with the chain provider

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A wave record as stored by the portal contract.
///
/// The timestamp is kept in the chain's unit (seconds since the Unix epoch); conversion into an
/// instant happens when the record enters the application state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainWave {
    /// The address that sent the wave.
    pub waver: String,
    /// The message attached to the wave.
    pub message: String,
    /// Block timestamp in seconds.
    pub timestamp: u64,
}

/// A decoded `NewWave` log delivered by the event feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewWaveEvent {
    /// The address that sent the wave.
    pub from: String,
    /// Block timestamp in seconds.
    pub timestamp: u64,
    /// The message attached to the wave.
    pub message: String,
    /// Hash of the transaction that emitted the log, when the feed reports it.
    #[serde(rename = "transactionHash", default)]
    pub transaction_hash: Option<String>,
    /// Position of the log within its block, when the feed reports it.
    #[serde(rename = "logIndex", default)]
    pub log_index: Option<u64>,
}

/// Handle to a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxHandle {
    pub hash: String,
}

/// Result of waiting for a transaction to be included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Included and executed successfully
    Success { block_number: Option<u64> },
    /// Included but execution reverted (including out-of-gas against the fee limit)
    Reverted { block_number: Option<u64> },
}

/// Identifier of a live event subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub String);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A live `NewWave` subscription: the provider pushes decoded events onto `events` until the
/// subscription is cancelled through [`ChainProvider::unsubscribe`](super::ChainProvider::unsubscribe).
#[derive(Debug)]
pub struct WaveSubscription {
    pub id: SubscriptionId,
    pub events: mpsc::Receiver<NewWaveEvent>,
}

/// JSON-RPC error code wallets use when the user rejects a request (EIP-1193).
pub const USER_REJECTED_CODE: i64 = 4001;

/// Error types for chain provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Request rejected by the user")]
    UserRejected,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ABI error: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Transaction {0} has no receipt yet")]
    ReceiptPending(String),

    #[error("Event subscriptions are not available: {0}")]
    SubscriptionUnavailable(String),

    #[error("Subscription closed before it was confirmed")]
    SubscriptionClosed,
}

impl ProviderError {
    /// Build the error for a JSON-RPC error object, recognising user rejection.
    pub fn from_rpc(code: i64, message: String) -> Self {
        if code == USER_REJECTED_CODE {
            ProviderError::UserRejected
        } else {
            ProviderError::Rpc { code, message }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_code_maps_to_user_rejected() {
        assert!(matches!(
            ProviderError::from_rpc(4001, "User denied".to_string()),
            ProviderError::UserRejected
        ));
        assert!(matches!(
            ProviderError::from_rpc(-32000, "execution reverted".to_string()),
            ProviderError::Rpc { code: -32000, .. }
        ));
    }

    #[test]
    fn new_wave_event_parses_without_transaction_hash() {
        let event: NewWaveEvent = serde_json::from_str(
            r#"{"from":"0xABC","timestamp":1700000000,"message":"hi"}"#,
        )
        .unwrap();
        assert_eq!(event.from, "0xABC");
        assert_eq!(event.transaction_hash, None);
    }
}
