//! Event system for a wave portal session.
//!
//! Components report each observable step (connection changes, reads, appended waves,
//! transaction transitions) as a [`SessionEvent`] on an [`EventSink`]. The sink is a channel;
//! the [`EventDispatcher`] drains it on its own task and hands every event to the registered
//! handlers in order. This keeps reporting off the components' call paths.

use crate::provider::SubscriptionId;
use crate::session::SessionError;
use crate::state::{Account, TransactionState, Wave};
use crate::utils::{format_wave_timestamp, short_address};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events that occur during a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// An account was adopted
    Connected { account: Account },
    /// The account was cleared
    Disconnected,
    /// `request_connection` found no wallet capability
    WalletMissing,
    /// The ledger count was read
    TotalCountUpdated { total: u64 },
    /// The wave log was replaced by a full read
    WavesReplaced { count: usize, carried_over: usize },
    /// A pushed wave was appended
    WaveAppended { wave: Wave },
    /// A pushed wave was already in the log
    DuplicateWaveSkipped { wave: Wave },
    /// The outgoing transaction moved to a new state
    TransactionChanged { state: TransactionState },
    /// The live subscription was attached
    SubscriptionAttached { id: SubscriptionId },
    /// The live subscription ended, by teardown or because the feed closed
    SubscriptionDetached,
}

/// Cloneable sending side handed to every component.
#[derive(Clone, Default)]
pub struct EventSink {
    sender: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl EventSink {
    /// A sink that discards events.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// A sink and the receiver the dispatcher drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    pub fn emit(&self, event: SessionEvent) {
        if let Some(sender) = &self.sender {
            if sender.send(event).is_err() {
                debug!("Event dispatcher stopped, dropping session event");
            }
        }
    }
}

/// Trait for handling session events.
#[async_trait::async_trait]
pub trait SessionEventHandler: Send + Sync {
    /// Handle a session event.
    async fn handle(&mut self, event: &SessionEvent) -> Result<(), SessionError>;

    /// Get the name of this handler for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Event dispatcher that manages multiple event handlers.
pub struct EventDispatcher {
    handlers: Vec<Box<dyn SessionEventHandler>>,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    /// Create a new, empty event dispatcher.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Register a new event handler.
    ///
    /// Handlers are called in the order they are registered.
    pub fn register_handler(&mut self, handler: Box<dyn SessionEventHandler>) {
        self.handlers.push(handler);
    }

    /// Dispatch an event to all registered handlers.
    ///
    /// Errors from handlers are logged, but do not stop other handlers from running.
    pub async fn dispatch(&mut self, event: &SessionEvent) {
        for handler in &mut self.handlers {
            if let Err(e) = handler.handle(event).await {
                warn!("Handler {} failed to process event: {}", handler.name(), e);
            }
        }
    }

    /// Drain `events` until every sink is dropped.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            self.dispatch(&event).await;
        }
        debug!("Event dispatcher finished");
    }
}

/// Logs every session event.
#[derive(Default)]
pub struct LoggingEventHandler;

#[async_trait::async_trait]
impl SessionEventHandler for LoggingEventHandler {
    async fn handle(&mut self, event: &SessionEvent) -> Result<(), SessionError> {
        match event {
            SessionEvent::Connected { account } => info!("Connected {}", account),
            SessionEvent::Disconnected => info!("Wallet disconnected"),
            SessionEvent::WalletMissing => warn!("No wallet found, install one to connect"),
            SessionEvent::TotalCountUpdated { total } => info!("Total waves: {}", total),
            SessionEvent::WavesReplaced {
                count,
                carried_over,
            } => info!(
                "Wave log synced: {} waves ({} pending confirmation by a full read)",
                count + carried_over,
                carried_over
            ),
            SessionEvent::WaveAppended { wave } => info!(
                "NewWave {} at {}: {}",
                short_address(&wave.address),
                format_wave_timestamp(&wave.timestamp),
                wave.message
            ),
            SessionEvent::DuplicateWaveSkipped { wave } => debug!(
                "Skipped duplicate wave from {}",
                short_address(&wave.address)
            ),
            SessionEvent::TransactionChanged { state } => match state {
                TransactionState::Idle => debug!("Transaction idle"),
                TransactionState::Signing => info!("Waiting for wallet signature"),
                TransactionState::Pending { hash } => info!("Mining... {}", hash),
                TransactionState::Mined { hash } => info!("Mined -- {}", hash),
                TransactionState::Failed { reason } => warn!("Wave failed: {}", reason),
            },
            SessionEvent::SubscriptionAttached { id } => {
                info!("Listening for NewWave events ({})", id)
            }
            SessionEvent::SubscriptionDetached => info!("Stopped listening for NewWave events"),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LoggingEventHandler"
    }
}
