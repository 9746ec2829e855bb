//! campus: command-line host for the meeting presence synchronizer.
//!
//! Activates presence for one meeting, prints the roster as JSON whenever
//! it changes and tears the connection down on Ctrl-C.

mod cli;

use std::path::Path;

use campus_common::ConfigError;
use campus_config::CampusConfig;
use campus_presence::{PresenceSynchronizer, PresenceUpdate};
use tracing_subscriber::EnvFilter;

fn load_config(path: Option<&str>) -> Result<CampusConfig, ConfigError> {
    match path {
        Some(path) => campus_config::load_config_from(Path::new(path)),
        None => campus_config::load_config(),
    }
}

fn init_logging(directive: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive)),
        )
        .init();
}

#[tokio::main]
async fn main() {
    let args = cli::parse();

    // Logging depends on the config, so load first and report afterwards.
    let loaded = load_config(args.config.as_deref());
    let directive = match (&args.log_level, &loaded) {
        (Some(level), _) => level.clone(),
        (None, Ok(config)) => config.logging.level.as_directive().to_string(),
        (None, Err(_)) => "info".to_string(),
    };
    init_logging(&directive);

    tracing::info!("campus v{} starting...", env!("CARGO_PKG_VERSION"));
    if let Some(ref path) = args.config {
        tracing::info!("Using config override: {path}");
    }
    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        CampusConfig::default()
    });

    let (mut presence, mut updates) = PresenceSynchronizer::new(config.presence);
    if presence.activate(&args.activation_inputs()).await.is_none() {
        tracing::error!("--meeting, --user, --session-key and --token are all required");
        return;
    }

    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(update) = update else { break };
                match update {
                    PresenceUpdate::Connected => tracing::info!("Presence online"),
                    PresenceUpdate::Disconnected => tracing::warn!("Presence offline"),
                    PresenceUpdate::Error(message) => tracing::warn!("Presence error: {message}"),
                    PresenceUpdate::RosterChanged(participants) => {
                        tracing::info!(count = participants.len(), "Roster changed");
                        match serde_json::to_string(&presence.snapshot().await) {
                            Ok(json) => println!("{json}"),
                            Err(e) => tracing::warn!("Failed to encode snapshot: {e}"),
                        }
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    presence.deactivate().await;
    tracing::info!("Shutdown complete");
}
