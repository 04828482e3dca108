//! Application state for a wave portal session.
//!
//! Re-exports the state types and the store handle shared by every session component.
/// State container shared by the session components
pub mod store;
/// Account, wave, and transaction types
pub mod types;

pub use store::AppStateStore;
pub use types::*;
