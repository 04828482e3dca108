use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A connected wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account(String);

impl Account {
	pub fn new(address: impl Into<String>) -> Self {
		Self(address.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Display for Account {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

/// One immutable wave record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wave {
	pub address: String,
	pub message: String,
	pub timestamp: DateTime<Utc>,
}

impl Wave {
	/// Build a wave from chain data, converting the timestamp from seconds.
	///
	/// Returns `None` when the timestamp is outside the representable range.
	pub fn from_chain(address: impl Into<String>, timestamp_secs: u64, message: impl Into<String>) -> Option<Self> {
		let secs = i64::try_from(timestamp_secs).ok()?;
		let timestamp = DateTime::from_timestamp(secs, 0)?;
		Some(Self {
			address: address.into(),
			message: message.into(),
			timestamp,
		})
	}

	/// Identity used to reconcile event-sourced and polled waves.
	pub fn key(&self) -> WaveKey {
		WaveKey {
			address: self.address.to_ascii_lowercase(),
			timestamp: self.timestamp.timestamp(),
			message: self.message.clone(),
		}
	}
}

/// Identity of a wave: sender (case-insensitive), second, and message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WaveKey {
	address: String,
	timestamp: i64,
	message: String,
}

/// Identity of one emitted log: transaction hash plus position in the block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventId {
	pub transaction_hash: String,
	pub log_index: Option<u64>,
}

/// An event-sourced wave not yet seen in a full read.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UnconfirmedWave {
	wave: Wave,
	/// Entries with the same key already in the log when this one arrived
	baseline: usize,
}

/// The ordered wave log.
///
/// Entries are only ever appended or replaced wholesale. Waves that arrived through the event
/// feed are tracked until a full read contains them, so a replace never drops them.
///
/// Distinct waves may share a [`WaveKey`] (same sender, second and message), so keys are
/// counted rather than treated as a set. Events carrying an [`EventId`] are deduplicated by
/// that id; an event with a fresh id is first matched against entries of its key that no event
/// has accounted for yet (waves a full read installed before their event arrived).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaveLog {
	entries: Vec<Wave>,
	unconfirmed: Vec<UnconfirmedWave>,
	/// Ids of every event applied so far
	seen_events: HashSet<EventId>,
	/// Per key, how many entries an event has accounted for
	claimed: HashMap<WaveKey, usize>,
}

/// What a full replace did to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceSummary {
	/// Number of waves in the installed snapshot
	pub snapshot_len: usize,
	/// Event-sourced waves re-appended after the snapshot
	pub carried_over: usize,
	/// Whether the visible log changed
	pub changed: bool,
}

impl WaveLog {
	pub fn entries(&self) -> &[Wave] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Wave> {
		self.entries.iter()
	}

	pub fn contains(&self, key: &WaveKey) -> bool {
		self.entries.iter().any(|wave| &wave.key() == key)
	}

	/// Number of entries with `key`.
	pub fn count(&self, key: &WaveKey) -> usize {
		self.entries.iter().filter(|wave| &wave.key() == key).count()
	}

	/// Append an event-sourced wave at the end. Returns `false` if the event was already
	/// applied, or if it accounts for an entry a full read already installed.
	///
	/// Without an id the wave's key is its only identity, and any entry with that key makes it
	/// a duplicate.
	pub fn append_event(&mut self, wave: Wave, id: Option<EventId>) -> bool {
		let key = wave.key();
		let present = self.count(&key);
		let claimed = self.claimed.get(&key).copied().unwrap_or(0);

		match id {
			Some(id) => {
				if !self.seen_events.insert(id) {
					return false;
				}
				if present > claimed {
					self.claimed.insert(key, claimed + 1);
					return false;
				}
			}
			None if present > 0 => return false,
			None => {}
		}

		self.claimed.insert(key, claimed + 1);
		self.unconfirmed.push(UnconfirmedWave {
			wave: wave.clone(),
			baseline: present,
		});
		self.entries.push(wave);
		true
	}

	/// Replace the log with a full read, then re-append event-sourced waves the read did not
	/// contain yet.
	///
	/// An event-sourced wave is contained once the read holds more entries of its key than the
	/// log did when the event arrived.
	pub fn replace(&mut self, snapshot: Vec<Wave>) -> ReplaceSummary {
		let mut snapshot_counts: HashMap<WaveKey, usize> = HashMap::new();
		for wave in &snapshot {
			*snapshot_counts.entry(wave.key()).or_default() += 1;
		}
		self.unconfirmed.retain(|pending| {
			let read = snapshot_counts.get(&pending.wave.key()).copied().unwrap_or(0);
			read <= pending.baseline
		});

		let snapshot_len = snapshot.len();
		let mut entries = snapshot;
		entries.extend(self.unconfirmed.iter().map(|pending| pending.wave.clone()));

		let changed = entries != self.entries;
		self.entries = entries;

		ReplaceSummary {
			snapshot_len,
			carried_over: self.unconfirmed.len(),
			changed,
		}
	}
}

/// Lifecycle of the wallet connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
	#[default]
	Disconnected,
	Connecting,
	Connected,
}

/// State of the single outgoing wave transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransactionState {
	#[default]
	Idle,
	/// The wallet is building and signing the call
	Signing,
	/// Accepted by the network, waiting for confirmation
	Pending { hash: String },
	Mined { hash: String },
	Failed { reason: String },
}

impl TransactionState {
	/// "Loading" as the presentation layer sees it.
	pub fn is_loading(&self) -> bool {
		matches!(self, TransactionState::Signing | TransactionState::Pending { .. })
	}
}

/// The single source of truth observed by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
	pub account: Option<Account>,
	pub connection: ConnectionStatus,
	/// Count as last read from the ledger; may lag `waves.len()`
	pub total_count: u64,
	pub waves: WaveLog,
	pub transaction: TransactionState,
	/// Message for the user, e.g. asking them to install a wallet
	pub notice: Option<String>,
}

impl AppState {
	pub fn loading(&self) -> bool {
		self.transaction.is_loading()
	}
}
