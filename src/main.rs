//! Transaction confirmation monitor entry point.
//!
//! Loads the settings, resumes every persisted monitor, then long-polls the chat API for
//! tracking requests until interrupted.
//!
//! # Flow
//! 1. Loads the settings file (`--config`, default `config/settings.json`)
//! 2. Initializes the provider, registry, notifier and watcher service
//! 3. Resumes monitors for entries of the configured provider
//! 4. Dispatches chat commands and button presses
//! 5. Handles shutdown on Ctrl+C

pub mod bootstrap;
pub mod models;
pub mod services;
pub mod utils;

use crate::{
	bootstrap::{initialize_services, CommandDispatcher, Result},
	models::{ConfigLoader, Settings},
	services::{
		blockchain::{ProviderClient, ProviderClientType},
		txwatcher::{FileTransactionRegistry, TransactionRegistry},
	},
	utils::{
		constants::{DEFAULT_SETTINGS_PATH, DOCUMENTATION_PATH},
		logging::setup_logging,
		metrics::server::{create_metrics_server, RegistryArc},
		parse_string_to_bytes_size,
	},
};

use clap::Parser;
use dotenvy::dotenv_override;
use std::{
	env::{set_var, var},
	path::PathBuf,
	sync::Arc,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(
	name = "txconfirm-monitor",
	about = "Watches blockchain transactions and notifies chat users when they confirm, get double-spent or miss a block.",
	version
)]
struct Cli {
	/// Path to the settings file
	#[arg(long, value_name = "PATH", default_value = DEFAULT_SETTINGS_PATH)]
	config: PathBuf,

	/// Write logs to file instead of stdout
	#[arg(long)]
	log_file: bool,

	/// Set log level (trace, debug, info, warn, error)
	#[arg(long, value_name = "LEVEL")]
	log_level: Option<String>,

	/// Path to store log files (default: logs/)
	#[arg(long, value_name = "PATH")]
	log_path: Option<String>,

	/// Maximum log file size before rolling (e.g., "1GB", "500MB", "1024KB")
	#[arg(long, value_name = "SIZE", value_parser = parse_string_to_bytes_size)]
	log_max_size: Option<u64>,

	/// Address to start the metrics server on (default: 127.0.0.1:8081)
	#[arg(long, value_name = "HOST:PORT")]
	metrics_address: Option<String>,

	/// Enable metrics server
	#[arg(long)]
	metrics: bool,

	/// Validate the configuration without starting the service; exits non-zero on failure
	#[arg(long)]
	check: bool,
}

impl Cli {
	/// Apply CLI options to environment variables, overriding any existing values
	fn apply_to_env(&self) {
		// Reload environment variables from .env file
		dotenv_override().ok();

		if self.log_file {
			set_var("LOG_MODE", "file");
		}

		if let Ok(level) = var("RUST_LOG") {
			set_var("LOG_LEVEL", level);
		}

		if let Some(level) = &self.log_level {
			set_var("LOG_LEVEL", level);
			set_var("RUST_LOG", level);
		}

		if let Some(path) = &self.log_path {
			set_var("LOG_DATA_DIR", path);
		}

		if let Some(max_size) = &self.log_max_size {
			set_var("LOG_MAX_SIZE", max_size.to_string());
		}

		if self.metrics {
			set_var("METRICS_ENABLED", "true");
		}

		if let Some(address) = &self.metrics_address {
			if let Some(port) = address.split(':').nth(1) {
				set_var("METRICS_PORT", port);
			}
		}
	}
}

/// Main entry point for the confirmation monitor.
///
/// # Errors
/// Returns an error if the settings are invalid or a service cannot be initialized.
#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	cli.apply_to_env();

	setup_logging().unwrap_or_else(|e| {
		error!("Failed to setup logging: {}", e);
	});

	if cli.check {
		return validate_configuration(&cli.config).await;
	}

	let settings = Settings::load_from_path(&cli.config).await.map_err(|e| {
		anyhow::anyhow!(
			"Failed to load settings from {}: {}. Please refer to {} on how to configure the service.",
			cli.config.display(),
			e,
			DOCUMENTATION_PATH
		)
	})?;

	let services = initialize_services(&settings).await.map_err(|e| {
		anyhow::anyhow!(
			"Failed to initialize services: {}. Please refer to {} on how to configure the service.",
			e,
			DOCUMENTATION_PATH
		)
	})?;

	let metrics_enabled =
		cli.metrics || var("METRICS_ENABLED").map(|v| v == "true").unwrap_or(false);

	let metrics_address = if var("IN_DOCKER").unwrap_or_default() == "true" {
		var("METRICS_PORT")
			.map(|port| format!("0.0.0.0:{}", port))
			.unwrap_or_else(|_| "0.0.0.0:8081".to_string())
	} else {
		cli.metrics_address
			.clone()
			.unwrap_or_else(|| "127.0.0.1:8081".to_string())
	};

	let metrics_server = if metrics_enabled {
		info!("Metrics server enabled, starting on {}", metrics_address);
		let registry: RegistryArc = services.registry.clone();
		match create_metrics_server(metrics_address, registry) {
			Ok(server) => Some(server),
			Err(e) => {
				error!("Failed to create metrics server: {}", e);
				None
			}
		}
	} else {
		info!("Metrics server disabled. Use --metrics flag or METRICS_ENABLED=true to enable");
		None
	};

	let bot = services.telegram.get_me().await?;
	info!(username = ?bot.username, "connected to chat API");

	let summary = services.watcher.resume_all().await?;
	info!(
		resumed = summary.resumed,
		dropped = summary.dropped,
		"Resumed tracked transactions"
	);

	let dispatcher = Arc::new(CommandDispatcher::new(
		services.watcher.clone(),
		services.telegram.clone(),
		bot,
	));
	let dispatcher_task = tokio::spawn(dispatcher.run());

	info!("Service started. Press Ctrl+C to shutdown");

	let ctrl_c = tokio::signal::ctrl_c();

	if let Some(metrics_future) = metrics_server {
		tokio::select! {
			result = ctrl_c => {
				if let Err(e) = result {
					error!("Error waiting for Ctrl+C: {}", e);
				}
				info!("Shutdown signal received, stopping services...");
			}
			result = metrics_future => {
				if let Err(e) = result {
					error!("Metrics server error: {}", e);
				}
				info!("Metrics server stopped, shutting down services...");
			}
		}
	} else {
		let _ = ctrl_c.await;
		info!("Shutdown signal received, stopping services...");
	}

	dispatcher_task.abort();
	info!("Shutdown complete");
	Ok(())
}

/// Validates the settings file, the proxy list and the registry without starting the service
async fn validate_configuration(path: &std::path::Path) -> Result<()> {
	info!("Validating configuration...");

	let settings = match Settings::load_from_path(path).await {
		Ok(settings) => settings,
		Err(e) => {
			error!("{}.\nPlease refer to {} for proper configuration setup.", e, DOCUMENTATION_PATH);
			return Err(anyhow::anyhow!("Settings validation failed: {}", e).into());
		}
	};
	info!("✓ Settings loaded from {}", path.display());

	match ProviderClientType::from_settings(&settings).await {
		Ok(provider) => info!(
			"✓ Provider {} ready (hourly budget: {})",
			provider.name(),
			provider.max_requests_per_hour()
		),
		Err(e) => {
			error!("{}.\nPlease refer to {} for proxy configuration.", e, DOCUMENTATION_PATH);
			return Err(anyhow::anyhow!("Provider validation failed: {}", e).into());
		}
	}

	let registry = FileTransactionRegistry::new(settings.registry_path.clone());
	match registry.get_all().await {
		Ok(entries) => info!("✓ Registry readable ({} tracked transaction(s))", entries.len()),
		Err(e) => {
			error!("Registry {} is unreadable: {}", settings.registry_path.display(), e);
			return Err(anyhow::anyhow!("Registry validation failed: {}", e).into());
		}
	}

	info!("Configuration validation completed successfully!");
	Ok(())
}
