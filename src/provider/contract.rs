//! ABI bindings for the wave portal contract.
//!
//! The call shapes are fixed by the deployed contract; everything that crosses the wire goes
//! through the helpers below so the JSON-RPC client never handles raw ABI words itself.

use super::types::{ChainWave, NewWaveEvent, ProviderError};

use alloy_primitives::{B256, U256};
use alloy_sol_types::{SolCall, SolEvent, sol};

sol! {
	#[derive(Debug, PartialEq, Eq)]
	contract WavePortal {
		struct Wave {
			address waver;
			string message;
			uint256 timestamp;
		}

		event NewWave(address indexed from, uint256 timestamp, string message);

		function wave(string memory message) public payable;
		function getAllWaves() public view returns (Wave[] memory);
		function getTotalWaves() public view returns (uint256);
	}
}

/// Default gas ceiling for `wave(message)`.
pub const DEFAULT_FEE_LIMIT: u64 = 300_000;

pub fn encode_get_total_waves() -> Vec<u8> {
	WavePortal::getTotalWavesCall {}.abi_encode()
}

pub fn encode_get_all_waves() -> Vec<u8> {
	WavePortal::getAllWavesCall {}.abi_encode()
}

pub fn encode_wave(message: &str) -> Vec<u8> {
	WavePortal::waveCall {
		message: message.to_string(),
	}
	.abi_encode()
}

/// Decode the return data of `getTotalWaves()`.
pub fn decode_total_waves(data: &[u8]) -> Result<u64, ProviderError> {
	let total: U256 = WavePortal::getTotalWavesCall::abi_decode_returns(data)?;
	u64_from_word(total, "total waves")
}

/// Decode the return data of `getAllWaves()`, preserving contract order.
pub fn decode_all_waves(data: &[u8]) -> Result<Vec<ChainWave>, ProviderError> {
	let waves: Vec<WavePortal::Wave> = WavePortal::getAllWavesCall::abi_decode_returns(data)?;
	waves
		.into_iter()
		.map(|wave| {
			Ok(ChainWave {
				waver: wave.waver.to_checksum(None),
				message: wave.message,
				timestamp: u64_from_word(wave.timestamp, "wave timestamp")?,
			})
		})
		.collect()
}

/// Topic0 of the `NewWave` event.
pub fn new_wave_topic() -> B256 {
	WavePortal::NewWave::SIGNATURE_HASH
}

/// Decode a raw `NewWave` log.
pub fn decode_new_wave(
	topics: &[B256],
	data: &[u8],
	transaction_hash: Option<String>,
	log_index: Option<u64>,
) -> Result<NewWaveEvent, ProviderError> {
	let event = WavePortal::NewWave::decode_raw_log(topics.iter().copied(), data)?;
	Ok(NewWaveEvent {
		from: event.from.to_checksum(None),
		timestamp: u64_from_word(event.timestamp, "event timestamp")?,
		message: event.message,
		transaction_hash,
		log_index,
	})
}

fn u64_from_word(value: U256, what: &str) -> Result<u64, ProviderError> {
	u64::try_from(value)
		.map_err(|_| ProviderError::InvalidResponse(format!("{} {} does not fit in u64", what, value)))
}
