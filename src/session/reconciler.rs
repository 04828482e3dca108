//! Live `NewWave` subscription.
//!
//! The reconciler attaches once per provider session, consumes the subscription channel on
//! its own task, and appends each delivered wave through the store. Duplicates from
//! at-least-once delivery, or waves a full read already installed, are absorbed by the
//! wave log's identity check.

use crate::provider::{NewWaveEvent, SharedProvider, SubscriptionId};
use crate::session::events::{EventSink, SessionEvent};
use crate::state::{AppStateStore, EventId, Wave};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct ActiveSubscription {
	id: SubscriptionId,
	cancel: CancellationToken,
	worker: JoinHandle<()>,
}

pub struct EventReconciler {
	provider: Option<SharedProvider>,
	store: AppStateStore,
	events: EventSink,
	active: Option<ActiveSubscription>,
}

impl EventReconciler {
	pub fn new(provider: Option<SharedProvider>, store: AppStateStore, events: EventSink) -> Self {
		Self {
			provider,
			store,
			events,
			active: None,
		}
	}

	/// Whether a subscription is attached and its consumer is still running.
	pub fn is_attached(&self) -> bool {
		self.active
			.as_ref()
			.is_some_and(|active| !active.worker.is_finished())
	}

	/// Subscribe to `NewWave` events. Returns `false` without subscribing again when already
	/// attached, when no provider is present, or when the provider refuses.
	pub async fn attach(&mut self) -> bool {
		if self.is_attached() {
			debug!("NewWave subscription already attached");
			return false;
		}
		// The previous feed closed on its own; release it before subscribing again.
		if self.active.is_some() {
			self.teardown().await;
		}

		let Some(provider) = &self.provider else {
			debug!("No wallet provider found, not subscribing to NewWave");
			return false;
		};

		let subscription = match provider.subscribe_new_waves().await {
			Ok(subscription) => subscription,
			Err(e) => {
				error!("Failed to subscribe to NewWave events: {}", e);
				return false;
			}
		};

		let cancel = CancellationToken::new();
		let worker = tokio::spawn(consume_feed(
			subscription.events,
			self.store.clone(),
			self.events.clone(),
			cancel.clone(),
		));

		info!("Attached NewWave subscription {}", subscription.id);
		self.events.emit(SessionEvent::SubscriptionAttached {
			id: subscription.id.clone(),
		});
		self.active = Some(ActiveSubscription {
			id: subscription.id,
			cancel,
			worker,
		});
		true
	}

	/// Stop consuming and unsubscribe from the provider.
	pub async fn teardown(&mut self) {
		let Some(active) = self.active.take() else {
			return;
		};

		active.cancel.cancel();
		if let Err(e) = active.worker.await {
			warn!("NewWave consumer ended abnormally: {}", e);
		}

		if let Some(provider) = &self.provider {
			if let Err(e) = provider.unsubscribe(&active.id).await {
				warn!("Failed to unsubscribe {}: {}", active.id, e);
			}
		}
		info!("Detached NewWave subscription {}", active.id);
	}
}

async fn consume_feed(
	mut feed: mpsc::Receiver<NewWaveEvent>,
	store: AppStateStore,
	events: EventSink,
	cancel: CancellationToken,
) {
	loop {
		tokio::select! {
			_ = cancel.cancelled() => break,
			event = feed.recv() => match event {
				Some(event) => {
					apply_event(&store, &events, event);
				}
				None => {
					warn!("NewWave feed closed by provider");
					break;
				}
			}
		}
	}
	events.emit(SessionEvent::SubscriptionDetached);
}

/// Append one pushed wave. Returns `true` if the log grew.
pub fn apply_event(store: &AppStateStore, events: &EventSink, event: NewWaveEvent) -> bool {
	debug!("NewWave {} {} {}", event.from, event.timestamp, event.message);
	let id = event.transaction_hash.map(|transaction_hash| EventId {
		transaction_hash,
		log_index: event.log_index,
	});
	let Some(wave) = Wave::from_chain(event.from, event.timestamp, event.message) else {
		warn!("Dropping NewWave with out-of-range timestamp {}", event.timestamp);
		return false;
	};

	if store.append_wave(wave.clone(), id) {
		events.emit(SessionEvent::WaveAppended { wave });
		true
	} else {
		events.emit(SessionEvent::DuplicateWaveSkipped { wave });
		false
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::provider::ChainWave;
	use crate::session::reader::LedgerReader;
	use crate::session::testing::MockChainProvider;
	use crate::state::{Account, AppState};
	use std::sync::Arc;

	fn event(from: &str, timestamp: u64, message: &str) -> NewWaveEvent {
		NewWaveEvent {
			from: from.to_string(),
			timestamp,
			message: message.to_string(),
			transaction_hash: None,
			log_index: None,
		}
	}

	fn logged(from: &str, timestamp: u64, message: &str, hash: &str) -> NewWaveEvent {
		NewWaveEvent {
			transaction_hash: Some(hash.to_string()),
			log_index: Some(0),
			..event(from, timestamp, message)
		}
	}

	fn reconciler(mock: &Arc<MockChainProvider>) -> (EventReconciler, AppStateStore) {
		let store = AppStateStore::new();
		let provider: SharedProvider = mock.clone();
		(
			EventReconciler::new(Some(provider), store.clone(), EventSink::disabled()),
			store,
		)
	}

	async fn wait_for_waves(store: &AppStateStore, len: usize) -> AppState {
		store
			.subscribe()
			.wait_for(|state| state.waves.len() >= len)
			.await
			.unwrap()
			.clone()
	}

	#[tokio::test]
	async fn pushed_event_appends_one_wave_at_the_end() {
		let mock = Arc::new(MockChainProvider::new());
		let (mut reconciler, store) = reconciler(&mock);
		store.replace_waves(vec![Wave::from_chain("0x1", 10, "first").unwrap()]);

		assert!(reconciler.attach().await);
		assert!(mock.push_event(event("0xABC", 1_700_000_000, "hi")).await);

		let state = wait_for_waves(&store, 2).await;
		assert_eq!(state.waves.len(), 2);
		let last = &state.waves.entries()[1];
		assert_eq!(last.address, "0xABC");
		assert_eq!(last.message, "hi");
		assert_eq!(last.timestamp.timestamp(), 1_700_000_000);

		reconciler.teardown().await;
	}

	#[tokio::test]
	async fn attaches_at_most_once() {
		let mock = Arc::new(MockChainProvider::new());
		let (mut reconciler, _store) = reconciler(&mock);

		assert!(reconciler.attach().await);
		assert!(!reconciler.attach().await);
		assert!(reconciler.is_attached());
		assert_eq!(mock.calls_to("subscribe_new_waves"), 1);

		reconciler.teardown().await;
	}

	#[tokio::test]
	async fn teardown_unsubscribes_and_allows_reattach() {
		let mock = Arc::new(MockChainProvider::new());
		let (mut reconciler, _store) = reconciler(&mock);

		reconciler.attach().await;
		reconciler.teardown().await;

		assert!(!reconciler.is_attached());
		assert_eq!(mock.unsubscribed(), vec![SubscriptionId("0x1".to_string())]);
		assert!(!mock.push_event(event("0x1", 1, "late")).await);

		assert!(reconciler.attach().await);
		assert_eq!(mock.calls_to("subscribe_new_waves"), 2);
		reconciler.teardown().await;
	}

	#[tokio::test]
	async fn no_provider_never_attaches() {
		let mut reconciler = EventReconciler::new(None, AppStateStore::new(), EventSink::disabled());
		assert!(!reconciler.attach().await);
		assert!(!reconciler.is_attached());
		reconciler.teardown().await;
	}

	#[tokio::test]
	async fn duplicate_delivery_appends_once() {
		let store = AppStateStore::new();
		let events = EventSink::disabled();

		assert!(apply_event(&store, &events, event("0xABC", 5, "hi")));
		assert!(!apply_event(&store, &events, event("0xabc", 5, "hi")));
		assert_eq!(store.snapshot().waves.len(), 1);
	}

	#[tokio::test]
	async fn same_content_from_two_transactions_appends_twice() {
		let store = AppStateStore::new();
		let events = EventSink::disabled();

		assert!(apply_event(&store, &events, logged("0xABC", 5, "gm", "0xaaa")));
		assert!(apply_event(&store, &events, logged("0xABC", 5, "gm", "0xbbb")));
		assert!(!apply_event(&store, &events, logged("0xABC", 5, "gm", "0xbbb")));
		assert_eq!(store.snapshot().waves.len(), 2);
	}

	#[tokio::test]
	async fn full_read_after_event_keeps_the_event() {
		let mock = Arc::new(MockChainProvider::new().with_waves(vec![ChainWave {
			waver: "0x1".to_string(),
			message: "old".to_string(),
			timestamp: 10,
		}]));
		let (mut reconciler, store) = reconciler(&mock);
		store.connect(Account::new("0xme"));
		let provider: SharedProvider = mock.clone();
		let reader = LedgerReader::new(Some(provider), store.clone(), EventSink::disabled());

		reconciler.attach().await;
		mock.push_event(event("0x2", 20, "new")).await;
		wait_for_waves(&store, 1).await;

		// The chain read does not include the new wave yet.
		reader.fetch_all_waves().await;

		let state = store.snapshot();
		let messages: Vec<&str> = state.waves.iter().map(|w| w.message.as_str()).collect();
		assert_eq!(messages, vec!["old", "new"]);
		reconciler.teardown().await;
	}

	#[tokio::test]
	async fn closed_feed_detaches_and_can_reattach() {
		let mock = Arc::new(MockChainProvider::new());
		let (mut reconciler, _store) = reconciler(&mock);
		reconciler.attach().await;

		mock.close_feed();
		while reconciler.is_attached() {
			tokio::task::yield_now().await;
		}

		assert!(reconciler.attach().await);
		assert_eq!(mock.calls_to("subscribe_new_waves"), 2);
		assert_eq!(mock.calls_to("unsubscribe"), 1);
		reconciler.teardown().await;
	}
}
