//! Chain provider integration for the wave portal contract
//!
//! This module defines the capability the session consumes to reach a wallet and the chain,
//! the types that cross that boundary, the contract ABI bindings, and a JSON-RPC
//! implementation backed by HTTP requests and a WebSocket log subscription.

/// The `ChainProvider` trait consumed by the session
mod adapter;
/// JSON-RPC client implementing `ChainProvider`
mod client;
/// ABI bindings for the portal contract
pub mod contract;
/// Type definitions for provider data structures
mod types;

pub use adapter::{ChainProvider, SharedProvider};
pub use client::{JsonRpcChainProvider, ProviderSettings};
pub use types::*;
