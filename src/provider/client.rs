//!
//! Ethereum JSON-RPC client for the wave portal contract.
//!
//! This module provides an async [`ChainProvider`] that talks to a wallet-backed JSON-RPC
//! endpoint. Reads go through `eth_call`, writes through `eth_sendTransaction` (the endpoint
//! holds the signer), confirmation is a receipt poll, and `NewWave` events arrive over a
//! WebSocket `eth_subscribe("logs")` subscription. All methods are async and designed for use
//! with Tokio.

use super::adapter::ChainProvider;
use super::contract;
use super::types::*;

use alloy_primitives::{Address, B256};
use backoff::ExponentialBackoffBuilder;
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Buffered events per subscription before the feed applies backpressure.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Connection settings for [`JsonRpcChainProvider`].
#[derive(Debug, Clone)]
pub struct ProviderSettings {
	/// HTTP endpoint for requests.
	pub rpc_url: String,
	/// WebSocket endpoint for subscriptions. Without it the provider cannot push events.
	pub ws_url: Option<String>,
	/// Address of the deployed portal contract.
	pub contract_address: Address,
	/// Per-request HTTP timeout.
	pub request_timeout: Duration,
	/// Initial interval between receipt polls.
	pub receipt_poll_interval: Duration,
}

/// Wave portal JSON-RPC client
pub struct JsonRpcChainProvider {
	/// The underlying HTTP client for JSON-RPC requests.
	http_client: Client,
	settings: ProviderSettings,
	next_id: AtomicU64,
	/// Cancellation tokens of the live log subscriptions, keyed by subscription id.
	subscriptions: Mutex<HashMap<SubscriptionId, CancellationToken>>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
	code: i64,
	message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
	#[serde(default)]
	result: Value,
	error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
	status: Option<String>,
	block_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
	topics: Vec<String>,
	data: String,
	transaction_hash: Option<String>,
	log_index: Option<String>,
	#[serde(default)]
	removed: bool,
}

impl JsonRpcChainProvider {
	/// Create a new client.
	///
	/// # Errors
	/// Returns `ProviderError::Http` if the HTTP client cannot be built.
	pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
		let http_client = Client::builder()
			.timeout(settings.request_timeout)
			.build()?;

		Ok(Self {
			http_client,
			settings,
			next_id: AtomicU64::new(1),
			subscriptions: Mutex::new(HashMap::new()),
		})
	}

	/// Execute a JSON-RPC request and deserialize its `result`.
	///
	/// # Errors
	/// Returns `ProviderError::Rpc`/`UserRejected` for error responses, and transport or
	/// parse errors otherwise.
	pub async fn request<T: DeserializeOwned>(
		&self,
		method: &str,
		params: Value,
	) -> Result<T, ProviderError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let request_body = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});

		debug!("JSON-RPC request {} #{}", method, id);

		let response = self
			.http_client
			.post(&self.settings.rpc_url)
			.header("Content-Type", "application/json")
			.json(&request_body)
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(ProviderError::InvalidResponse(format!(
				"HTTP error: {}",
				response.status()
			)));
		}

		let response: RpcResponse = response.json().await?;
		if let Some(error) = response.error {
			return Err(ProviderError::from_rpc(error.code, error.message));
		}

		Ok(serde_json::from_value(response.result)?)
	}

	async fn call_contract(&self, calldata: Vec<u8>) -> Result<Vec<u8>, ProviderError> {
		let result: String = self
			.request(
				"eth_call",
				json!([
					{
						"to": self.settings.contract_address.to_string(),
						"data": hex_prefixed(&calldata),
					},
					"latest"
				]),
			)
			.await?;
		decode_hex(&result)
	}

	async fn fetch_receipt(&self, hash: &str) -> Result<Option<RpcReceipt>, ProviderError> {
		self.request("eth_getTransactionReceipt", json!([hash]))
			.await
	}
}

#[async_trait::async_trait]
impl ChainProvider for JsonRpcChainProvider {
	async fn list_authorized_accounts(&self) -> Result<Vec<String>, ProviderError> {
		self.request("eth_accounts", json!([])).await
	}

	async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
		info!("Requesting accounts from wallet");
		self.request("eth_requestAccounts", json!([])).await
	}

	async fn get_total_waves(&self) -> Result<u64, ProviderError> {
		let data = self
			.call_contract(contract::encode_get_total_waves())
			.await?;
		contract::decode_total_waves(&data)
	}

	async fn get_all_waves(&self) -> Result<Vec<ChainWave>, ProviderError> {
		let data = self.call_contract(contract::encode_get_all_waves()).await?;
		contract::decode_all_waves(&data)
	}

	async fn submit_wave(
		&self,
		from: &str,
		message: &str,
		fee_limit: u64,
	) -> Result<TxHandle, ProviderError> {
		let hash: String = self
			.request(
				"eth_sendTransaction",
				json!([{
					"from": from,
					"to": self.settings.contract_address.to_string(),
					"gas": format!("{:#x}", fee_limit),
					"data": hex_prefixed(&contract::encode_wave(message)),
				}]),
			)
			.await?;

		debug!("Transaction accepted by network: {}", hash);
		Ok(TxHandle { hash })
	}

	async fn await_confirmation(&self, tx: &TxHandle) -> Result<Confirmation, ProviderError> {
		// Unbounded here; the submitter owns the deadline.
		let policy = ExponentialBackoffBuilder::new()
			.with_initial_interval(self.settings.receipt_poll_interval)
			.with_max_interval(self.settings.receipt_poll_interval * 8)
			.with_max_elapsed_time(None)
			.build();

		let provider = self;
		let hash = tx.hash.clone();
		let receipt = backoff::future::retry(policy, move || {
			let hash = hash.clone();
			async move {
				match provider.fetch_receipt(&hash).await {
					Ok(Some(receipt)) => Ok(receipt),
					Ok(None) => Err(backoff::Error::transient(ProviderError::ReceiptPending(
						hash,
					))),
					Err(e) => Err(backoff::Error::permanent(e)),
				}
			}
		})
		.await?;

		let block_number = receipt
			.block_number
			.as_deref()
			.map(parse_quantity)
			.transpose()?;

		match receipt.status.as_deref() {
			Some("0x1") => Ok(Confirmation::Success { block_number }),
			Some(_) => Ok(Confirmation::Reverted { block_number }),
			None => Err(ProviderError::InvalidResponse(format!(
				"receipt for {} has no status",
				tx.hash
			))),
		}
	}

	async fn subscribe_new_waves(&self) -> Result<WaveSubscription, ProviderError> {
		let ws_url = self.settings.ws_url.as_deref().ok_or_else(|| {
			ProviderError::SubscriptionUnavailable("no WebSocket endpoint configured".to_string())
		})?;

		debug!("Attempting WebSocket connection to: {}", ws_url);
		let (mut ws_stream, response) = connect_async(ws_url).await?;
		debug!(
			"WebSocket connection established, response status: {}",
			response.status()
		);

		let subscribe_message = json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": "eth_subscribe",
			"params": [
				"logs",
				{
					"address": self.settings.contract_address.to_string(),
					"topics": [contract::new_wave_topic().to_string()],
				}
			]
		});
		ws_stream
			.send(Message::Text(subscribe_message.to_string()))
			.await?;

		let subscription_id = await_subscription_id(&mut ws_stream).await?;
		info!("Subscribed to NewWave logs: {}", subscription_id);

		let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
		let cancel = CancellationToken::new();
		self.subscriptions
			.lock()
			.await
			.insert(subscription_id.clone(), cancel.clone());

		tokio::spawn(forward_wave_logs(
			ws_stream,
			subscription_id.clone(),
			events_tx,
			cancel,
		));

		Ok(WaveSubscription {
			id: subscription_id,
			events: events_rx,
		})
	}

	async fn unsubscribe(&self, id: &SubscriptionId) -> Result<(), ProviderError> {
		match self.subscriptions.lock().await.remove(id) {
			Some(cancel) => {
				cancel.cancel();
				debug!("Cancelled subscription {}", id);
			}
			None => debug!("Subscription {} is not active", id),
		}
		Ok(())
	}

	fn name(&self) -> &'static str {
		"JsonRpcChainProvider"
	}
}

/// Read frames until the `eth_subscribe` response arrives.
async fn await_subscription_id(ws_stream: &mut WsStream) -> Result<SubscriptionId, ProviderError> {
	while let Some(msg) = ws_stream.next().await {
		match msg? {
			Message::Text(text) => {
				let parsed: Value = serde_json::from_str(&text)?;
				if parsed.get("id").and_then(Value::as_u64) != Some(1) {
					debug!("Ignoring message before subscription ack: {}", text);
					continue;
				}
				if let Some(error) = parsed.get("error") {
					let error: RpcErrorObject = serde_json::from_value(error.clone())?;
					return Err(ProviderError::from_rpc(error.code, error.message));
				}
				return parsed
					.get("result")
					.and_then(Value::as_str)
					.map(|id| SubscriptionId(id.to_string()))
					.ok_or_else(|| {
						ProviderError::InvalidResponse("eth_subscribe returned no id".to_string())
					});
			}
			Message::Close(_) => break,
			_ => continue,
		}
	}
	Err(ProviderError::SubscriptionClosed)
}

/// Forward `eth_subscription` notifications for `subscription_id` onto `events` until cancelled,
/// the socket closes, or the receiving side goes away.
async fn forward_wave_logs(
	mut ws_stream: WsStream,
	subscription_id: SubscriptionId,
	events: mpsc::Sender<NewWaveEvent>,
	cancel: CancellationToken,
) {
	loop {
		tokio::select! {
			_ = cancel.cancelled() => {
				let unsubscribe = json!({
					"jsonrpc": "2.0",
					"id": 2,
					"method": "eth_unsubscribe",
					"params": [subscription_id.0],
				});
				if let Err(e) = ws_stream.send(Message::Text(unsubscribe.to_string())).await {
					warn!("Failed to send eth_unsubscribe for {}: {}", subscription_id, e);
				}
				let _ = ws_stream.close(None).await;
				debug!("Log subscription {} stopped", subscription_id);
				return;
			}
			msg = ws_stream.next() => {
				let text = match msg {
					Some(Ok(Message::Text(text))) => text,
					Some(Ok(Message::Close(_))) | None => {
						warn!("Log subscription {} closed by remote", subscription_id);
						return;
					}
					Some(Ok(_)) => continue,
					Some(Err(e)) => {
						error!("Error in log subscription {}: {}", subscription_id, e);
						return;
					}
				};

				match parse_notification(&text, &subscription_id) {
					Ok(Some(event)) => {
						if events.send(event).await.is_err() {
							debug!("Event receiver dropped, stopping subscription {}", subscription_id);
							return;
						}
					}
					Ok(None) => {}
					Err(e) => error!("Failed to decode NewWave notification: {}", e),
				}
			}
		}
	}
}

/// Decode one WebSocket frame. Returns `Ok(None)` for frames that are not a live log of this
/// subscription (acks, other subscriptions, reorg removals).
fn parse_notification(
	text: &str,
	subscription_id: &SubscriptionId,
) -> Result<Option<NewWaveEvent>, ProviderError> {
	let parsed: Value = serde_json::from_str(text)?;
	if parsed.get("method").and_then(Value::as_str) != Some("eth_subscription") {
		return Ok(None);
	}
	let Some(params) = parsed.get("params") else {
		return Ok(None);
	};
	if params.get("subscription").and_then(Value::as_str) != Some(subscription_id.0.as_str()) {
		return Ok(None);
	}
	let log: RpcLog = serde_json::from_value(params.get("result").cloned().unwrap_or_default())?;
	if log.removed {
		debug!("Skipping removed log from reorg");
		return Ok(None);
	}

	let topics = log
		.topics
		.iter()
		.map(|topic| {
			B256::from_str(topic)
				.map_err(|e| ProviderError::InvalidResponse(format!("bad topic {}: {}", topic, e)))
		})
		.collect::<Result<Vec<_>, _>>()?;
	let data = decode_hex(&log.data)?;
	let log_index = log.log_index.as_deref().map(parse_quantity).transpose()?;

	contract::decode_new_wave(&topics, &data, log.transaction_hash, log_index).map(Some)
}

fn hex_prefixed(bytes: &[u8]) -> String {
	format!("0x{}", hex::encode(bytes))
}

fn decode_hex(value: &str) -> Result<Vec<u8>, ProviderError> {
	hex::decode(value.trim_start_matches("0x"))
		.map_err(|e| ProviderError::InvalidResponse(format!("invalid hex data: {}", e)))
}

fn parse_quantity(value: &str) -> Result<u64, ProviderError> {
	u64::from_str_radix(value.trim_start_matches("0x"), 16)
		.map_err(|e| ProviderError::InvalidResponse(format!("invalid quantity {}: {}", value, e)))
}
