//! Application state store.
//!
//! The store is a handle around a `watch` channel: every update is a closure applied to the
//! current [`AppState`] under the channel lock, and observers subscribe to receive snapshots.
//! Each field has one writing component; the writer methods below are grouped accordingly.

use super::types::*;

use std::sync::Arc;
use tokio::sync::watch;

/// Shared handle to the application state.
#[derive(Clone)]
pub struct AppStateStore {
	inner: Arc<watch::Sender<AppState>>,
}

impl Default for AppStateStore {
	fn default() -> Self {
		Self::new()
	}
}

impl AppStateStore {
	pub fn new() -> Self {
		let (sender, _) = watch::channel(AppState::default());
		Self {
			inner: Arc::new(sender),
		}
	}

	/// Clone of the current state.
	pub fn snapshot(&self) -> AppState {
		self.inner.borrow().clone()
	}

	/// Receiver notified after every effective update.
	pub fn subscribe(&self) -> watch::Receiver<AppState> {
		self.inner.subscribe()
	}

	pub fn account(&self) -> Option<Account> {
		self.inner.borrow().account.clone()
	}

	pub fn loading(&self) -> bool {
		self.inner.borrow().loading()
	}

	pub fn transaction(&self) -> TransactionState {
		self.inner.borrow().transaction.clone()
	}

	/// Apply `update`; observers are notified only when it returns `true`.
	fn update(&self, update: impl FnOnce(&mut AppState) -> bool) -> bool {
		self.inner.send_if_modified(update)
	}

	// Connection manager

	pub fn begin_connecting(&self) {
		self.update(|state| {
			state.connection = ConnectionStatus::Connecting;
			state.notice = None;
			true
		});
	}

	/// Adopt `account` and mark the connection established.
	pub fn connect(&self, account: Account) {
		self.update(|state| {
			state.account = Some(account);
			state.connection = ConnectionStatus::Connected;
			state.notice = None;
			true
		});
	}

	/// Leave `Connecting` without a new account, restoring the previous status.
	pub fn abort_connecting(&self) {
		self.update(|state| {
			let restored = if state.account.is_some() {
				ConnectionStatus::Connected
			} else {
				ConnectionStatus::Disconnected
			};
			let changed = state.connection != restored;
			state.connection = restored;
			changed
		});
	}

	/// Clear the account. Returns `false` if there was none.
	pub fn disconnect(&self) -> bool {
		self.update(|state| {
			let had_account = state.account.take().is_some();
			let changed = had_account || state.connection != ConnectionStatus::Disconnected;
			state.connection = ConnectionStatus::Disconnected;
			changed
		})
	}

	pub fn set_notice(&self, notice: impl Into<String>) {
		let notice = notice.into();
		self.update(|state| {
			let changed = state.notice.as_deref() != Some(notice.as_str());
			state.notice = Some(notice);
			changed
		});
	}

	// Ledger reader

	pub fn set_total_count(&self, total: u64) -> bool {
		self.update(|state| {
			let changed = state.total_count != total;
			state.total_count = total;
			changed
		})
	}

	pub fn replace_waves(&self, snapshot: Vec<Wave>) -> ReplaceSummary {
		let mut summary = None;
		self.update(|state| {
			let result = state.waves.replace(snapshot);
			summary = Some(result);
			result.changed
		});
		summary.unwrap_or(ReplaceSummary {
			snapshot_len: 0,
			carried_over: 0,
			changed: false,
		})
	}

	// Event reconciler

	/// Append an event-sourced wave. Returns `false` for a duplicate.
	pub fn append_wave(&self, wave: Wave, id: Option<EventId>) -> bool {
		self.update(|state| state.waves.append_event(wave, id))
	}

	// Transaction submitter

	/// Move `Idle` to `Signing` in one step. Returns `false` if a transaction is in flight.
	pub fn try_begin_transaction(&self) -> bool {
		self.update(|state| {
			if state.transaction != TransactionState::Idle {
				return false;
			}
			state.transaction = TransactionState::Signing;
			true
		})
	}

	pub fn set_transaction(&self, transaction: TransactionState) {
		self.update(|state| {
			let changed = state.transaction != transaction;
			state.transaction = transaction;
			changed
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_one_transaction_can_begin() {
		let store = AppStateStore::new();
		assert!(store.try_begin_transaction());
		assert!(store.loading());
		assert!(!store.try_begin_transaction());

		store.set_transaction(TransactionState::Failed {
			reason: "rejected".to_string(),
		});
		assert!(!store.loading());
		assert!(!store.try_begin_transaction());

		store.set_transaction(TransactionState::Idle);
		assert!(store.try_begin_transaction());
	}

	#[test]
	fn abort_connecting_restores_previous_status() {
		let store = AppStateStore::new();
		store.begin_connecting();
		store.abort_connecting();
		assert_eq!(store.snapshot().connection, ConnectionStatus::Disconnected);

		store.connect(Account::new("0xabc"));
		store.begin_connecting();
		store.abort_connecting();
		let state = store.snapshot();
		assert_eq!(state.connection, ConnectionStatus::Connected);
		assert_eq!(state.account, Some(Account::new("0xabc")));
	}

	#[test]
	fn disconnect_clears_account() {
		let store = AppStateStore::new();
		assert!(!store.disconnect());
		store.connect(Account::new("0xabc"));
		assert!(store.disconnect());
		assert_eq!(store.account(), None);
	}

	#[tokio::test]
	async fn observers_see_updates_but_not_no_ops() {
		let store = AppStateStore::new();
		let mut observer = store.subscribe();

		assert!(!store.set_total_count(0));
		assert!(!observer.has_changed().unwrap());

		assert!(store.set_total_count(3));
		observer.changed().await.unwrap();
		assert_eq!(observer.borrow_and_update().total_count, 3);
	}
}
