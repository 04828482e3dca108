use crate::provider::{ProviderError, contract::DEFAULT_FEE_LIMIT};
use crate::state::Account;

use std::time::Duration;

/// Error types for session operations. They are caught and logged where they occur and
/// surface to callers only as outcome values.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
	#[error("Provider error: {0}")]
	Provider(#[from] ProviderError),

	#[error("Transaction {hash} not confirmed within {timeout_secs}s")]
	ConfirmationTimeout { hash: String, timeout_secs: u64 },

	#[error("Transaction {0} reverted")]
	Reverted(String),

	#[error("Event handler error: {0}")]
	Handler(String),
}

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
	/// Gas ceiling passed with every `wave` submission
	pub fee_limit: u64,
	/// Upper bound on waiting for a submitted wave to be mined
	pub confirmation_timeout: Duration,
}

impl Default for SessionSettings {
	fn default() -> Self {
		Self {
			fee_limit: DEFAULT_FEE_LIMIT,
			confirmation_timeout: Duration::from_secs(300),
		}
	}
}

/// Result of a connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
	/// Account adopted and the initial sync ran
	Connected { account: Account, sync: SyncReport },
	/// The wallet has no authorised account
	NoAccount,
	/// The user rejected the wallet prompt
	Declined,
	/// No wallet capability is present
	ProviderMissing,
	/// The account was cleared
	Disconnected,
	Failed { reason: String },
}

/// Result of a single ledger read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
	/// The store changed
	Updated,
	/// The read succeeded but matched the store
	Unchanged,
	/// No account or no provider; nothing was called
	Skipped,
	Failed { reason: String },
}

impl ReadOutcome {
	pub fn succeeded(&self) -> bool {
		matches!(self, ReadOutcome::Updated | ReadOutcome::Unchanged)
	}
}

/// Result of a full sync: total count followed by the full log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
	pub total_count: ReadOutcome,
	pub waves: ReadOutcome,
}

/// Result of a wave submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
	Mined { hash: String },
	Failed { reason: String },
	/// Another submission is in flight
	Busy,
	EmptyMessage,
	NotConnected,
	ProviderMissing,
}
