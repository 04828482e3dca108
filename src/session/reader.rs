use crate::provider::SharedProvider;
use crate::session::events::{EventSink, SessionEvent};
use crate::session::{ReadOutcome, SyncReport};
use crate::state::{AppStateStore, Wave};

use tracing::{debug, error, info, warn};

/// Read-only queries against the portal contract.
///
/// Both reads are full replacements of their store field. They run only with an account and a
/// provider present, and never leave the store half-updated on failure.
#[derive(Clone)]
pub struct LedgerReader {
	provider: Option<SharedProvider>,
	store: AppStateStore,
	events: EventSink,
}

impl LedgerReader {
	pub fn new(provider: Option<SharedProvider>, store: AppStateStore, events: EventSink) -> Self {
		Self {
			provider,
			store,
			events,
		}
	}

	fn ready(&self, operation: &str) -> Option<&SharedProvider> {
		let Some(provider) = &self.provider else {
			info!("No wallet provider found, skipping {}", operation);
			return None;
		};
		if self.store.account().is_none() {
			info!("No connected account, skipping {}", operation);
			return None;
		}
		Some(provider)
	}

	/// Read `getTotalWaves()` into the store.
	pub async fn fetch_total_count(&self) -> ReadOutcome {
		let Some(provider) = self.ready("total count read") else {
			return ReadOutcome::Skipped;
		};

		match provider.get_total_waves().await {
			Ok(total) => {
				debug!("Retrieved total waves: {}", total);
				self.events.emit(SessionEvent::TotalCountUpdated { total });
				if self.store.set_total_count(total) {
					ReadOutcome::Updated
				} else {
					ReadOutcome::Unchanged
				}
			}
			Err(e) => {
				error!("Failed to read total waves: {}", e);
				ReadOutcome::Failed {
					reason: e.to_string(),
				}
			}
		}
	}

	/// Read `getAllWaves()` and replace the wave log.
	pub async fn fetch_all_waves(&self) -> ReadOutcome {
		let Some(provider) = self.ready("wave log read") else {
			return ReadOutcome::Skipped;
		};

		let chain_waves = match provider.get_all_waves().await {
			Ok(waves) => waves,
			Err(e) => {
				error!("Failed to read waves: {}", e);
				return ReadOutcome::Failed {
					reason: e.to_string(),
				};
			}
		};

		let snapshot: Vec<Wave> = chain_waves
			.into_iter()
			.filter_map(|raw| {
				let wave = Wave::from_chain(raw.waver.clone(), raw.timestamp, raw.message);
				if wave.is_none() {
					warn!(
						"Dropping wave from {} with out-of-range timestamp {}",
						raw.waver, raw.timestamp
					);
				}
				wave
			})
			.collect();

		debug!("Retrieved {} waves", snapshot.len());
		let summary = self.store.replace_waves(snapshot);
		self.events.emit(SessionEvent::WavesReplaced {
			count: summary.snapshot_len,
			carried_over: summary.carried_over,
		});

		if summary.changed {
			ReadOutcome::Updated
		} else {
			ReadOutcome::Unchanged
		}
	}

	/// Total count followed by the full log.
	pub async fn full_sync(&self) -> SyncReport {
		let total_count = self.fetch_total_count().await;
		let waves = self.fetch_all_waves().await;
		SyncReport { total_count, waves }
	}
}
