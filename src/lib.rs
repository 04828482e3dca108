//! Wave portal on-chain interaction and state sync.
//!
//! A [`session::WavePortalSession`] connects a wallet through a [`provider::ChainProvider`],
//! reads the portal's wave log, submits waves, and merges live `NewWave` events into one
//! [`state::AppStateStore`] observed by the presentation layer.

/// Portal configuration loading
pub mod config;
/// Chain provider capability and its JSON-RPC implementation
pub mod provider;
/// Connection, reads, writes and live events
pub mod session;
/// Application state and its store
pub mod state;
/// Display and logging helpers
pub mod utils;
