//! Wave Portal Session Module
//!
//! This module holds the on-chain interaction and state-sync logic of the wave portal. Each
//! submodule owns one concern and writes to the shared [`crate::state::AppStateStore`]:
//!
//! - `orchestrator`: Wires the components together, runs the startup sequence and owns teardown.
//! - `connection`: Wallet-connection lifecycle and the current account.
//! - `reader`: Read-only ledger queries (total count, full wave log).
//! - `submitter`: State machine for the single outgoing wave transaction.
//! - `reconciler`: Live `NewWave` subscription merged into the wave log.
//! - `events`: Session event types, the sink components emit on, and the dispatcher.
//!
//! Every operation completes with an outcome value; failures are logged where they are caught.

/// Wallet-connection lifecycle
pub mod connection;
/// Event system for observing a session
pub mod events;
/// Main coordinator of a session
pub mod orchestrator;
/// Ledger read queries
pub mod reader;
/// Live event subscription
pub mod reconciler;
/// Outgoing wave transactions
pub mod submitter;
/// Session errors, settings and outcomes
mod types;

#[cfg(test)]
pub mod testing;

pub use orchestrator::WavePortalSession;
pub use types::*;
