//! Scripted in-memory provider for session tests.

use crate::provider::*;

use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc};

/// How `await_confirmation` behaves.
#[derive(Clone)]
pub enum ConfirmationScript {
	/// Mine immediately: bump the total and record the wave
	Succeed,
	Revert,
	Fail(String),
	/// Never resolve
	Hang,
	/// Mine once the gate is notified
	Gate(Arc<Notify>),
}

struct MockState {
	authorized: Vec<String>,
	requestable: Vec<String>,
	reject_requests: bool,
	total: u64,
	waves: Vec<ChainWave>,
	fail_reads: bool,
	submit_failure: Option<String>,
	confirmation: ConfirmationScript,
	submitted: Vec<(String, String, u64)>,
	calls: Vec<&'static str>,
	feed: Option<mpsc::Sender<NewWaveEvent>>,
	unsubscribed: Vec<SubscriptionId>,
	next_subscription: u64,
}

pub struct MockChainProvider {
	state: Mutex<MockState>,
}

impl MockChainProvider {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(MockState {
				authorized: Vec::new(),
				requestable: Vec::new(),
				reject_requests: false,
				total: 0,
				waves: Vec::new(),
				fail_reads: false,
				submit_failure: None,
				confirmation: ConfirmationScript::Succeed,
				submitted: Vec::new(),
				calls: Vec::new(),
				feed: None,
				unsubscribed: Vec::new(),
				next_subscription: 1,
			}),
		}
	}

	fn with(self, f: impl FnOnce(&mut MockState)) -> Self {
		f(&mut self.state.lock().unwrap());
		self
	}

	pub fn with_authorized_accounts(self, accounts: &[&str]) -> Self {
		let accounts = accounts.iter().map(|a| a.to_string()).collect();
		self.with(|state| state.authorized = accounts)
	}

	pub fn with_requestable_accounts(self, accounts: &[&str]) -> Self {
		let accounts = accounts.iter().map(|a| a.to_string()).collect();
		self.with(|state| state.requestable = accounts)
	}

	pub fn rejecting_requests(self) -> Self {
		self.with(|state| state.reject_requests = true)
	}

	pub fn with_total(self, total: u64) -> Self {
		self.with(|state| state.total = total)
	}

	pub fn with_waves(self, waves: Vec<ChainWave>) -> Self {
		self.with(|state| {
			state.total = waves.len() as u64;
			state.waves = waves;
		})
	}

	pub fn failing_submit(self, reason: &str) -> Self {
		let reason = reason.to_string();
		self.with(|state| state.submit_failure = Some(reason))
	}

	pub fn with_confirmation(self, script: ConfirmationScript) -> Self {
		self.with(|state| state.confirmation = script)
	}

	pub fn fail_reads(&self, fail: bool) {
		self.state.lock().unwrap().fail_reads = fail;
	}

	/// Number of calls made to the named trait method.
	pub fn calls_to(&self, method: &str) -> usize {
		self.state
			.lock()
			.unwrap()
			.calls
			.iter()
			.filter(|call| **call == method)
			.count()
	}

	/// Every trait method called so far, in order.
	pub fn call_order(&self) -> Vec<&'static str> {
		self.state.lock().unwrap().calls.clone()
	}

	pub fn submitted(&self) -> Vec<(String, String, u64)> {
		self.state.lock().unwrap().submitted.clone()
	}

	pub fn unsubscribed(&self) -> Vec<SubscriptionId> {
		self.state.lock().unwrap().unsubscribed.clone()
	}

	/// Push an event onto the live feed. Returns `false` if nobody is subscribed.
	pub async fn push_event(&self, event: NewWaveEvent) -> bool {
		let feed = self.state.lock().unwrap().feed.clone();
		match feed {
			Some(feed) => feed.send(event).await.is_ok(),
			None => false,
		}
	}

	/// Drop the sending side of the feed, as a provider does when its socket closes.
	pub fn close_feed(&self) {
		self.state.lock().unwrap().feed = None;
	}

	fn record(&self, method: &'static str) {
		self.state.lock().unwrap().calls.push(method);
	}

	fn read_failure(&self) -> Option<ProviderError> {
		self.state.lock().unwrap().fail_reads.then(|| ProviderError::Rpc {
			code: -32000,
			message: "header not found".to_string(),
		})
	}

	fn mine(&self, from: &str, message: &str) {
		let mut state = self.state.lock().unwrap();
		state.total += 1;
		let timestamp = 1_700_000_000 + state.total;
		state.waves.push(ChainWave {
			waver: from.to_string(),
			message: message.to_string(),
			timestamp,
		});
	}
}

#[async_trait::async_trait]
impl ChainProvider for MockChainProvider {
	async fn list_authorized_accounts(&self) -> Result<Vec<String>, ProviderError> {
		self.record("list_authorized_accounts");
		Ok(self.state.lock().unwrap().authorized.clone())
	}

	async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
		self.record("request_accounts");
		let state = self.state.lock().unwrap();
		if state.reject_requests {
			return Err(ProviderError::from_rpc(USER_REJECTED_CODE, "User rejected".to_string()));
		}
		Ok(state.requestable.clone())
	}

	async fn get_total_waves(&self) -> Result<u64, ProviderError> {
		self.record("get_total_waves");
		if let Some(e) = self.read_failure() {
			return Err(e);
		}
		Ok(self.state.lock().unwrap().total)
	}

	async fn get_all_waves(&self) -> Result<Vec<ChainWave>, ProviderError> {
		self.record("get_all_waves");
		if let Some(e) = self.read_failure() {
			return Err(e);
		}
		Ok(self.state.lock().unwrap().waves.clone())
	}

	async fn submit_wave(
		&self,
		from: &str,
		message: &str,
		fee_limit: u64,
	) -> Result<TxHandle, ProviderError> {
		self.record("submit_wave");
		let mut state = self.state.lock().unwrap();
		if let Some(reason) = &state.submit_failure {
			return Err(ProviderError::Rpc {
				code: -32000,
				message: reason.clone(),
			});
		}
		state
			.submitted
			.push((from.to_string(), message.to_string(), fee_limit));
		Ok(TxHandle {
			hash: format!("0x{:064x}", state.submitted.len()),
		})
	}

	async fn await_confirmation(&self, tx: &TxHandle) -> Result<Confirmation, ProviderError> {
		self.record("await_confirmation");
		let script = self.state.lock().unwrap().confirmation.clone();
		match script {
			ConfirmationScript::Succeed => {}
			ConfirmationScript::Revert => return Ok(Confirmation::Reverted { block_number: Some(1) }),
			ConfirmationScript::Fail(reason) => {
				return Err(ProviderError::InvalidResponse(reason));
			}
			ConfirmationScript::Hang => std::future::pending::<()>().await,
			ConfirmationScript::Gate(gate) => gate.notified().await,
		}

		let (from, message) = {
			let state = self.state.lock().unwrap();
			let index = tx.hash.trim_start_matches("0x");
			let index = usize::from_str_radix(index, 16).unwrap_or(1).saturating_sub(1);
			let (from, message, _) = state.submitted[index].clone();
			(from, message)
		};
		self.mine(&from, &message);
		Ok(Confirmation::Success { block_number: Some(1) })
	}

	async fn subscribe_new_waves(&self) -> Result<WaveSubscription, ProviderError> {
		self.record("subscribe_new_waves");
		let (sender, events) = mpsc::channel(16);
		let mut state = self.state.lock().unwrap();
		let id = SubscriptionId(format!("0x{}", state.next_subscription));
		state.next_subscription += 1;
		state.feed = Some(sender);
		Ok(WaveSubscription { id, events })
	}

	async fn unsubscribe(&self, id: &SubscriptionId) -> Result<(), ProviderError> {
		self.record("unsubscribe");
		let mut state = self.state.lock().unwrap();
		state.feed = None;
		state.unsubscribed.push(id.clone());
		Ok(())
	}

	fn name(&self) -> &'static str {
		"MockChainProvider"
	}
}
