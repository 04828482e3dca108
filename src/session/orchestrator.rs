//! Wave portal session orchestrator.
//!
//! This module defines the `WavePortalSession`, which wires the connection manager, ledger
//! reader, transaction submitter and event reconciler around one shared store, runs the
//! startup sequence and owns teardown.
//!
//! The session is responsible for:
//! - Creating the event channel and running the dispatcher on its own task
//! - Attaching the live `NewWave` subscription once the provider is available
//! - Adopting an already-authorised account and performing the initial sync
//! - Forwarding user actions (connect, wave, refresh, disconnect) to the owning component
//! - Unsubscribing and draining pending events on shutdown

use crate::provider::SharedProvider;
use crate::session::{
    ConnectOutcome, SessionSettings, SubmitOutcome, SyncReport,
    connection::ConnectionManager,
    events::{EventDispatcher, EventSink},
    reader::LedgerReader,
    reconciler::EventReconciler,
    submitter::TransactionSubmitter,
};
use crate::state::AppStateStore;

use tokio::task::JoinHandle;
use tracing::{info, warn};

/// One portal session against a single provider.
pub struct WavePortalSession {
    store: AppStateStore,
    connection: ConnectionManager,
    reader: LedgerReader,
    submitter: TransactionSubmitter,
    reconciler: EventReconciler,
    events: EventSink,
    dispatcher: JoinHandle<()>,
}

impl WavePortalSession {
    /// Create a session. `None` for the provider means no wallet capability is present.
    ///
    /// Must be called inside a Tokio runtime; the dispatcher is spawned immediately.
    pub fn new(
        provider: Option<SharedProvider>,
        settings: SessionSettings,
        dispatcher: EventDispatcher,
    ) -> Self {
        let (events, receiver) = EventSink::channel();
        let dispatcher = tokio::spawn(dispatcher.run(receiver));

        let store = AppStateStore::new();
        let reader = LedgerReader::new(provider.clone(), store.clone(), events.clone());
        let connection = ConnectionManager::new(
            provider.clone(),
            store.clone(),
            reader.clone(),
            events.clone(),
        );
        let submitter = TransactionSubmitter::new(
            provider.clone(),
            store.clone(),
            reader.clone(),
            events.clone(),
            settings,
        );
        let reconciler = EventReconciler::new(provider, store.clone(), events.clone());

        Self {
            store,
            connection,
            reader,
            submitter,
            reconciler,
            events,
            dispatcher,
        }
    }

    /// Startup sequence: attach the live subscription, then adopt an authorised account (with
    /// its initial sync). Waves mined while the first read is in flight arrive as events and
    /// survive the read's replace.
    pub async fn start(&mut self) -> ConnectOutcome {
        info!("Starting wave portal session");
        self.reconciler.attach().await;
        self.connection.check_existing_connection().await
    }

    /// Handle to the store for observers.
    pub fn store(&self) -> &AppStateStore {
        &self.store
    }

    pub fn is_subscribed(&self) -> bool {
        self.reconciler.is_attached()
    }

    /// Prompt the wallet for an account.
    pub async fn connect(&self) -> ConnectOutcome {
        self.connection.request_connection().await
    }

    pub fn disconnect(&self) -> ConnectOutcome {
        self.connection.disconnect()
    }

    pub async fn account_changed(&self, accounts: Vec<String>) -> ConnectOutcome {
        self.connection.account_changed(accounts).await
    }

    /// Submit a wave with `message`.
    pub async fn wave(&self, message: &str) -> SubmitOutcome {
        self.submitter.submit(message).await
    }

    /// Re-read the total count and the full log.
    pub async fn refresh(&self) -> SyncReport {
        self.reader.full_sync().await
    }

    /// Tear down the subscription and wait for every emitted event to be handled.
    pub async fn shutdown(self) {
        let Self {
            mut reconciler,
            connection,
            reader,
            submitter,
            events,
            dispatcher,
            ..
        } = self;

        reconciler.teardown().await;

        // The dispatcher stops once every sink is gone.
        drop((reconciler, connection, reader, submitter, events));
        if let Err(e) = dispatcher.await {
            warn!("Event dispatcher ended abnormally: {}", e);
        }
        info!("Wave portal session stopped");
    }
}
