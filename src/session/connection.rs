use crate::provider::{ProviderError, SharedProvider};
use crate::session::events::{EventSink, SessionEvent};
use crate::session::reader::LedgerReader;
use crate::session::ConnectOutcome;
use crate::state::{Account, AppStateStore};

use tracing::{error, info, warn};

/// Shown when the user asks to connect and no wallet is available.
pub const INSTALL_WALLET_NOTICE: &str = "No wallet found. Install a wallet such as MetaMask to wave.";

/// Owns the wallet-connection lifecycle and the current account.
///
/// Every operation is a single best-effort attempt with no retry. Adopting an account
/// triggers exactly one full ledger sync.
pub struct ConnectionManager {
	provider: Option<SharedProvider>,
	store: AppStateStore,
	reader: LedgerReader,
	events: EventSink,
}

impl ConnectionManager {
	pub fn new(
		provider: Option<SharedProvider>,
		store: AppStateStore,
		reader: LedgerReader,
		events: EventSink,
	) -> Self {
		Self {
			provider,
			store,
			reader,
			events,
		}
	}

	/// Adopt an already-authorised account without prompting the user.
	pub async fn check_existing_connection(&self) -> ConnectOutcome {
		let Some(provider) = &self.provider else {
			info!("No wallet provider found, skipping connection check");
			return ConnectOutcome::ProviderMissing;
		};
		info!("Using wallet provider {}", provider.name());

		match provider.list_authorized_accounts().await {
			Ok(accounts) => match accounts.into_iter().next() {
				Some(address) => {
					info!("Found an authorized account: {}", address);
					self.adopt(Account::new(address)).await
				}
				None => {
					info!("No authorized account found");
					ConnectOutcome::NoAccount
				}
			},
			Err(e) => {
				error!("Failed to list authorized accounts: {}", e);
				ConnectOutcome::Failed {
					reason: e.to_string(),
				}
			}
		}
	}

	/// Prompt the wallet for an account.
	///
	/// Without a wallet the user is told to install one through the store's notice.
	pub async fn request_connection(&self) -> ConnectOutcome {
		let Some(provider) = &self.provider else {
			warn!("No wallet provider found, cannot connect");
			self.store.set_notice(INSTALL_WALLET_NOTICE);
			self.events.emit(SessionEvent::WalletMissing);
			return ConnectOutcome::ProviderMissing;
		};

		self.store.begin_connecting();
		match provider.request_accounts().await {
			Ok(accounts) => match accounts.into_iter().next() {
				Some(address) => {
					info!("Connected {}", address);
					self.adopt(Account::new(address)).await
				}
				None => {
					info!("Wallet returned no accounts");
					self.store.abort_connecting();
					ConnectOutcome::NoAccount
				}
			},
			Err(ProviderError::UserRejected) => {
				info!("User declined the connection request");
				self.store.abort_connecting();
				ConnectOutcome::Declined
			}
			Err(e) => {
				error!("Failed to request accounts: {}", e);
				self.store.abort_connecting();
				ConnectOutcome::Failed {
					reason: e.to_string(),
				}
			}
		}
	}

	/// Clear the account. The wave log is kept; reads are skipped until a new account is adopted.
	pub fn disconnect(&self) -> ConnectOutcome {
		if self.store.disconnect() {
			info!("Disconnected wallet");
			self.events.emit(SessionEvent::Disconnected);
		}
		ConnectOutcome::Disconnected
	}

	/// React to the wallet reporting a new account list.
	pub async fn account_changed(&self, accounts: Vec<String>) -> ConnectOutcome {
		match accounts.into_iter().next() {
			Some(address) if self.store.account().as_ref().map(Account::as_str) == Some(address.as_str()) => {
				info!("Account unchanged: {}", address);
				ConnectOutcome::Connected {
					account: Account::new(address),
					sync: self.reader.full_sync().await,
				}
			}
			Some(address) => {
				info!("Account changed to {}", address);
				self.adopt(Account::new(address)).await
			}
			None => self.disconnect(),
		}
	}

	async fn adopt(&self, account: Account) -> ConnectOutcome {
		self.store.connect(account.clone());
		self.events.emit(SessionEvent::Connected {
			account: account.clone(),
		});
		let sync = self.reader.full_sync().await;
		ConnectOutcome::Connected { account, sync }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::session::testing::MockChainProvider;
	use crate::session::{ReadOutcome, SyncReport};
	use crate::state::ConnectionStatus;
	use std::sync::Arc;

	fn manager(mock: Option<Arc<MockChainProvider>>) -> (ConnectionManager, AppStateStore) {
		let store = AppStateStore::new();
		let provider = mock.map(|mock| mock as SharedProvider);
		let reader = LedgerReader::new(provider.clone(), store.clone(), EventSink::disabled());
		(
			ConnectionManager::new(provider, store.clone(), reader, EventSink::disabled()),
			store,
		)
	}

	#[tokio::test]
	async fn existing_account_is_adopted_with_one_full_sync() {
		let mock = Arc::new(
			MockChainProvider::new()
				.with_authorized_accounts(&["0xAbC"])
				.with_total(4),
		);
		let (manager, store) = manager(Some(mock.clone()));

		let outcome = manager.check_existing_connection().await;

		assert_eq!(
			outcome,
			ConnectOutcome::Connected {
				account: Account::new("0xAbC"),
				sync: SyncReport {
					total_count: ReadOutcome::Updated,
					waves: ReadOutcome::Unchanged,
				},
			}
		);
		let state = store.snapshot();
		assert_eq!(state.account, Some(Account::new("0xAbC")));
		assert_eq!(state.connection, ConnectionStatus::Connected);
		assert_eq!(state.total_count, 4);
		assert_eq!(mock.calls_to("get_total_waves"), 1);
		assert_eq!(mock.calls_to("get_all_waves"), 1);
		assert_eq!(mock.calls_to("request_accounts"), 0);
	}

	#[tokio::test]
	async fn no_authorized_account_leaves_state_disconnected() {
		let mock = Arc::new(MockChainProvider::new());
		let (manager, store) = manager(Some(mock.clone()));

		assert_eq!(manager.check_existing_connection().await, ConnectOutcome::NoAccount);
		assert_eq!(store.snapshot().connection, ConnectionStatus::Disconnected);
		assert_eq!(mock.calls_to("get_all_waves"), 0);
	}

	#[tokio::test]
	async fn missing_provider_is_silent_on_check_and_notifies_on_request() {
		let (manager, store) = manager(None);

		assert_eq!(
			manager.check_existing_connection().await,
			ConnectOutcome::ProviderMissing
		);
		assert_eq!(store.snapshot().notice, None);

		assert_eq!(
			manager.request_connection().await,
			ConnectOutcome::ProviderMissing
		);
		assert_eq!(
			store.snapshot().notice.as_deref(),
			Some(INSTALL_WALLET_NOTICE)
		);
	}

	#[tokio::test]
	async fn requested_account_is_adopted() {
		let mock = Arc::new(MockChainProvider::new().with_requestable_accounts(&["0x1", "0x2"]));
		let (manager, store) = manager(Some(mock.clone()));

		let outcome = manager.request_connection().await;

		assert!(matches!(outcome, ConnectOutcome::Connected { .. }));
		assert_eq!(store.account(), Some(Account::new("0x1")));
		assert_eq!(mock.calls_to("get_all_waves"), 1);
	}

	#[tokio::test]
	async fn declined_request_changes_nothing() {
		let mock = Arc::new(MockChainProvider::new().rejecting_requests());
		let (manager, store) = manager(Some(mock.clone()));

		assert_eq!(manager.request_connection().await, ConnectOutcome::Declined);
		let state = store.snapshot();
		assert_eq!(state.account, None);
		assert_eq!(state.connection, ConnectionStatus::Disconnected);
		assert_eq!(mock.calls_to("get_all_waves"), 0);
	}

	#[tokio::test]
	async fn account_change_resyncs_and_empty_list_disconnects() {
		let mock = Arc::new(MockChainProvider::new().with_authorized_accounts(&["0x1"]));
		let (manager, store) = manager(Some(mock.clone()));
		manager.check_existing_connection().await;

		let outcome = manager.account_changed(vec!["0x2".to_string()]).await;
		assert!(matches!(outcome, ConnectOutcome::Connected { .. }));
		assert_eq!(store.account(), Some(Account::new("0x2")));
		assert_eq!(mock.calls_to("get_all_waves"), 2);

		assert_eq!(
			manager.account_changed(Vec::new()).await,
			ConnectOutcome::Disconnected
		);
		assert_eq!(store.account(), None);
		assert_eq!(store.snapshot().connection, ConnectionStatus::Disconnected);
	}
}
