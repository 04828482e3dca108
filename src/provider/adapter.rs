use super::types::*;
use std::sync::Arc;

/// Capability bridging the session to a wallet and the chain.
///
/// Every call may suspend on a network round-trip or a wallet prompt. Implementations report
/// failures through [`ProviderError`]; the session catches them at the call site.
#[async_trait::async_trait]
pub trait ChainProvider: Send + Sync {
	/// Accounts the wallet has already authorised, without prompting.
	async fn list_authorized_accounts(&self) -> Result<Vec<String>, ProviderError>;

	/// Ask the wallet for accounts. May prompt the user and may be rejected.
	async fn request_accounts(&self) -> Result<Vec<String>, ProviderError>;

	/// `getTotalWaves()`
	async fn get_total_waves(&self) -> Result<u64, ProviderError>;

	/// `getAllWaves()`
	async fn get_all_waves(&self) -> Result<Vec<ChainWave>, ProviderError>;

	/// Sign and submit `wave(message)` from `from` with the given gas ceiling.
	async fn submit_wave(
		&self,
		from: &str,
		message: &str,
		fee_limit: u64,
	) -> Result<TxHandle, ProviderError>;

	/// Wait until the transaction is included. Does not time out on its own.
	async fn await_confirmation(&self, tx: &TxHandle) -> Result<Confirmation, ProviderError>;

	/// Subscribe to `NewWave` events.
	async fn subscribe_new_waves(&self) -> Result<WaveSubscription, ProviderError>;

	/// Cancel a subscription returned by [`ChainProvider::subscribe_new_waves`].
	async fn unsubscribe(&self, id: &SubscriptionId) -> Result<(), ProviderError>;

	/// Name of this provider for logging
	fn name(&self) -> &'static str;
}

/// Shared handle to a provider. Components hold `Option<SharedProvider>`; `None` means no wallet
/// capability is present.
pub type SharedProvider = Arc<dyn ChainProvider>;
