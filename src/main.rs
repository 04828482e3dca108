use std::sync::Arc;
use tracing::{error, info, warn};

use wave_portal_sync::config::PortalConfig;
use wave_portal_sync::provider::{JsonRpcChainProvider, SharedProvider};
use wave_portal_sync::session::{
	ConnectOutcome, SubmitOutcome, WavePortalSession,
	events::{EventDispatcher, LoggingEventHandler},
};
use wave_portal_sync::state::AppState;
use wave_portal_sync::utils::{format_wave_timestamp, init_tracing, short_address};

/// Waves shown when rendering the log.
const RENDERED_WAVES: usize = 5;

#[tokio::main(flavor = "current_thread")]
async fn main() {
	let config = match PortalConfig::load() {
		Ok(config) => config,
		Err(e) => {
			init_tracing("info");
			error!("Failed to load configuration: {}", e);
			return;
		}
	};
	init_tracing(&config.log_level);

	info!("Starting wave portal session");

	let provider: Option<SharedProvider> = match config.provider_settings() {
		Ok(Some(settings)) => match JsonRpcChainProvider::new(settings) {
			Ok(provider) => Some(Arc::new(provider)),
			Err(e) => {
				error!("Failed to create chain provider: {}", e);
				return;
			}
		},
		Ok(None) => {
			warn!("No rpc_url configured, running without a wallet provider");
			None
		}
		Err(e) => {
			error!("Invalid provider configuration: {}", e);
			return;
		}
	};

	let mut dispatcher = EventDispatcher::new();
	dispatcher.register_handler(Box::new(LoggingEventHandler));

	let mut session = WavePortalSession::new(provider, config.session_settings(), dispatcher);
	session.start().await;
	render(&session.store().snapshot());

	if let Some(message) = &config.wave_message {
		if session.store().account().is_none() {
			if let ConnectOutcome::Connected { account, .. } = session.connect().await {
				info!("Connected {} to wave", account);
			}
		}
		match session.wave(message).await {
			SubmitOutcome::Mined { hash } => info!("Wave mined in {}", hash),
			outcome => warn!("Wave not sent: {:?}", outcome),
		}
	}

	let mut observer = session.store().subscribe();
	let shutdown = tokio::signal::ctrl_c();
	tokio::pin!(shutdown);

	loop {
		tokio::select! {
			result = &mut shutdown => {
				if let Err(e) = result {
					error!("Failed to listen for shutdown signal: {}", e);
				}
				break;
			}
			changed = observer.changed() => {
				if changed.is_err() {
					break;
				}
				let state = observer.borrow_and_update().clone();
				render(&state);
			}
		}
	}

	info!("Shutting down");
	session.shutdown().await;
}

fn render(state: &AppState) {
	match &state.account {
		Some(account) => info!("Account: {} ({:?})", account, state.connection),
		None => info!("Account: none ({:?})", state.connection),
	}
	if let Some(notice) = &state.notice {
		warn!("{}", notice);
	}
	info!(
		"Total waves: {} | log entries: {} | loading: {}",
		state.total_count,
		state.waves.len(),
		state.loading()
	);
	let skip = state.waves.len().saturating_sub(RENDERED_WAVES);
	for wave in state.waves.iter().skip(skip) {
		info!(
			"  {} {} {}",
			format_wave_timestamp(&wave.timestamp),
			short_address(&wave.address),
			wave.message
		);
	}
}
