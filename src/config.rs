//! Portal configuration.
//!
//! Values come from an optional TOML file (`portal.toml` unless `WAVE_PORTAL_CONFIG` names
//! another path), then `WAVE_PORTAL_<KEY>` environment variables override individual keys.
//! Every key has a default, so an empty environment runs a session with no provider.

use crate::provider::{ProviderSettings, contract::DEFAULT_FEE_LIMIT};
use crate::session::SessionSettings;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "portal.toml";
/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "WAVE_PORTAL_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Failed to read {path}: {source}")]
	Read {
		path: String,
		source: std::io::Error,
	},

	#[error("Failed to parse config: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("Invalid value for {key}: {reason}")]
	Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
	/// HTTP JSON-RPC endpoint. Without it the session runs with no wallet provider.
	#[serde(default)]
	pub rpc_url: Option<String>,
	/// WebSocket endpoint for the `NewWave` subscription.
	#[serde(default)]
	pub ws_url: Option<String>,
	#[serde(default = "default_contract_address")]
	pub contract_address: String,
	#[serde(default = "default_fee_limit")]
	pub fee_limit: u64,
	#[serde(default = "default_confirmation_timeout_secs")]
	pub confirmation_timeout_secs: u64,
	#[serde(default = "default_receipt_poll_interval_ms")]
	pub receipt_poll_interval_ms: u64,
	#[serde(default = "default_request_timeout_secs")]
	pub request_timeout_secs: u64,
	#[serde(default = "default_log_level")]
	pub log_level: String,
	/// Wave to submit once connected.
	#[serde(default)]
	pub wave_message: Option<String>,
}

fn default_contract_address() -> String {
	"0xBFbbA13D83A9C026F9226a5C071C5a20A2cA6Fd0".to_string()
}

fn default_fee_limit() -> u64 {
	DEFAULT_FEE_LIMIT
}

fn default_confirmation_timeout_secs() -> u64 {
	300
}

fn default_receipt_poll_interval_ms() -> u64 {
	1000
}

fn default_request_timeout_secs() -> u64 {
	30
}

fn default_log_level() -> String {
	"info".to_string()
}

impl Default for PortalConfig {
	fn default() -> Self {
		Self {
			rpc_url: None,
			ws_url: None,
			contract_address: default_contract_address(),
			fee_limit: default_fee_limit(),
			confirmation_timeout_secs: default_confirmation_timeout_secs(),
			receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
			request_timeout_secs: default_request_timeout_secs(),
			log_level: default_log_level(),
			wave_message: None,
		}
	}
}

impl PortalConfig {
	/// Load from the default file (if present) and the process environment.
	pub fn load() -> Result<Self, ConfigError> {
		let path = std::env::var(format!("{}CONFIG", ENV_PREFIX))
			.unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
		let mut config = if Path::new(&path).exists() {
			info!("Loading config from {}", path);
			Self::from_toml_file(&path)?
		} else {
			debug!("No config file at {}, using defaults", path);
			Self::default()
		};
		config.apply_overrides(std::env::vars())?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_toml_file(path: &str) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_string(),
			source,
		})?;
		Self::from_toml_str(&content)
	}

	pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(s)?)
	}

	/// Apply `WAVE_PORTAL_<KEY>` overrides. Unknown keys are ignored; an empty value clears an
	/// optional key.
	pub fn apply_overrides(
		&mut self,
		vars: impl IntoIterator<Item = (String, String)>,
	) -> Result<(), ConfigError> {
		for (name, value) in vars {
			let Some(key) = name.strip_prefix(ENV_PREFIX) else {
				continue;
			};
			match key.to_ascii_lowercase().as_str() {
				"rpc_url" => self.rpc_url = non_empty(value),
				"ws_url" => self.ws_url = non_empty(value),
				"contract_address" => self.contract_address = value,
				"fee_limit" => self.fee_limit = parse_number("fee_limit", &value)?,
				"confirmation_timeout_secs" => {
					self.confirmation_timeout_secs =
						parse_number("confirmation_timeout_secs", &value)?
				}
				"receipt_poll_interval_ms" => {
					self.receipt_poll_interval_ms = parse_number("receipt_poll_interval_ms", &value)?
				}
				"request_timeout_secs" => {
					self.request_timeout_secs = parse_number("request_timeout_secs", &value)?
				}
				"log_level" => self.log_level = value,
				"wave_message" => self.wave_message = non_empty(value),
				_ => continue,
			}
			debug!("Config override from {}", name);
		}
		Ok(())
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		self.contract_address()?;
		if self.fee_limit == 0 {
			return Err(ConfigError::Invalid {
				key: "fee_limit",
				reason: "must be greater than zero".to_string(),
			});
		}
		if self.confirmation_timeout_secs == 0 {
			return Err(ConfigError::Invalid {
				key: "confirmation_timeout_secs",
				reason: "must be greater than zero".to_string(),
			});
		}
		Ok(())
	}

	pub fn contract_address(&self) -> Result<Address, ConfigError> {
		Address::from_str(&self.contract_address).map_err(|e| ConfigError::Invalid {
			key: "contract_address",
			reason: e.to_string(),
		})
	}

	pub fn session_settings(&self) -> SessionSettings {
		SessionSettings {
			fee_limit: self.fee_limit,
			confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
		}
	}

	/// Provider settings, or `None` when no RPC endpoint is configured.
	pub fn provider_settings(&self) -> Result<Option<ProviderSettings>, ConfigError> {
		let Some(rpc_url) = &self.rpc_url else {
			return Ok(None);
		};
		Ok(Some(ProviderSettings {
			rpc_url: rpc_url.clone(),
			ws_url: self.ws_url.clone(),
			contract_address: self.contract_address()?,
			request_timeout: Duration::from_secs(self.request_timeout_secs),
			receipt_poll_interval: Duration::from_millis(self.receipt_poll_interval_ms),
		}))
	}
}

fn non_empty(value: String) -> Option<String> {
	(!value.trim().is_empty()).then_some(value)
}

fn parse_number(key: &'static str, value: &str) -> Result<u64, ConfigError> {
	value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
		key,
		reason: e.to_string(),
	})
}
