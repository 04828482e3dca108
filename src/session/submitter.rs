//! Outgoing wave transactions.
//!
//! A submission walks `Idle → Signing → Pending → Mined | Failed → Idle`. The store flips to
//! `Signing` before the wallet is called so observers see "loading" immediately, and that flip
//! is the same atomic update that checks for `Idle`, so two submissions can never overlap.

use crate::provider::{Confirmation, SharedProvider};
use crate::session::events::{EventSink, SessionEvent};
use crate::session::reader::LedgerReader;
use crate::session::{SessionError, SessionSettings, SubmitOutcome};
use crate::state::{Account, AppStateStore, TransactionState};

use tracing::{debug, error, info, warn};

pub struct TransactionSubmitter {
	provider: Option<SharedProvider>,
	store: AppStateStore,
	reader: LedgerReader,
	events: EventSink,
	settings: SessionSettings,
}

impl TransactionSubmitter {
	pub fn new(
		provider: Option<SharedProvider>,
		store: AppStateStore,
		reader: LedgerReader,
		events: EventSink,
		settings: SessionSettings,
	) -> Self {
		Self {
			provider,
			store,
			reader,
			events,
			settings,
		}
	}

	/// Submit `wave(message)` and drive it to completion.
	///
	/// On success the total count is re-read before returning to `Idle`. Failures are logged
	/// and reported through the outcome; the wave log and count are left as they were.
	pub async fn submit(&self, message: &str) -> SubmitOutcome {
		if message.trim().is_empty() {
			debug!("Ignoring empty wave message");
			return SubmitOutcome::EmptyMessage;
		}
		let Some(provider) = &self.provider else {
			info!("No wallet provider found, cannot wave");
			return SubmitOutcome::ProviderMissing;
		};
		let Some(account) = self.store.account() else {
			info!("Connect a wallet before waving");
			return SubmitOutcome::NotConnected;
		};
		if !self.store.try_begin_transaction() {
			warn!("A wave is already in flight, ignoring new submission");
			return SubmitOutcome::Busy;
		}
		self.events.emit(SessionEvent::TransactionChanged {
			state: TransactionState::Signing,
		});

		match self.drive(provider, &account, message).await {
			Ok(hash) => {
				self.transition(TransactionState::Mined { hash: hash.clone() });
				self.reader.fetch_total_count().await;
				self.transition(TransactionState::Idle);
				SubmitOutcome::Mined { hash }
			}
			Err(e) => {
				error!("Wave transaction failed: {}", e);
				let reason = e.to_string();
				self.transition(TransactionState::Failed {
					reason: reason.clone(),
				});
				self.transition(TransactionState::Idle);
				SubmitOutcome::Failed { reason }
			}
		}
	}

	async fn drive(
		&self,
		provider: &SharedProvider,
		account: &Account,
		message: &str,
	) -> Result<String, SessionError> {
		let handle = provider
			.submit_wave(account.as_str(), message, self.settings.fee_limit)
			.await?;
		info!("Mining... {}", handle.hash);
		self.transition(TransactionState::Pending {
			hash: handle.hash.clone(),
		});

		let confirmation = tokio::time::timeout(
			self.settings.confirmation_timeout,
			provider.await_confirmation(&handle),
		)
		.await
		.map_err(|_| SessionError::ConfirmationTimeout {
			hash: handle.hash.clone(),
			timeout_secs: self.settings.confirmation_timeout.as_secs(),
		})??;

		match confirmation {
			Confirmation::Success { block_number } => {
				info!("Mined -- {} (block {:?})", handle.hash, block_number);
				Ok(handle.hash)
			}
			Confirmation::Reverted { .. } => Err(SessionError::Reverted(handle.hash)),
		}
	}

	fn transition(&self, state: TransactionState) {
		self.store.set_transaction(state.clone());
		self.events.emit(SessionEvent::TransactionChanged { state });
	}
}
