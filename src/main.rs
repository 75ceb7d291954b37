//! Daemon entry point: loads configuration, wires the exchange manager to
//! whatever adapters are configured, and serves the webhook listener.
//! Grounded on the teacher's `main.rs` shape: load config, initialize
//! logging, `tokio::select!` the main run future against `signal::ctrl_c()`.

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use tradebot_engine::config::Config;
use tradebot_engine::manager::{ApiFactory, ExchangeManager};
use tradebot_engine::port::notifier::{HttpNotifier, LoggingNotifier, Notifier};
use tradebot_engine::port::UnconfiguredExchangeApi;
use tradebot_engine::webhook;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig => check_config(&cli.config),
        Commands::Status { url } => status(&url).await,
        Commands::Run => run(&cli.config).await,
    }
}

fn check_config(path: &std::path::Path) -> ExitCode {
    match Config::load(path) {
        Ok(config) => {
            println!(
                "config OK: {} credentials, webhook on {}",
                config.credentials.len(),
                config.webhook.bind_address
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("config error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn status(url: &str) -> ExitCode {
    let client = reqwest::Client::new();
    match client.get(format!("{url}/healthz")).send().await {
        Ok(response) if response.status().is_success() => {
            let body = response.text().await.unwrap_or_default();
            println!("ok: {body} exchange(s) open");
            ExitCode::SUCCESS
        }
        Ok(response) => {
            eprintln!("unhealthy: status {}", response.status());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("unreachable: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config_path: &std::path::Path) -> ExitCode {
    let config = match Config::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    config.logging.init();
    info!("tradebot-engine starting");

    let notifier: Arc<dyn Notifier> = match &config.notifier.webhook_url {
        Some(url) => Arc::new(HttpNotifier::new(url.clone())),
        None => Arc::new(LoggingNotifier),
    };

    let factory: ApiFactory = Arc::new(|creds| Arc::new(UnconfiguredExchangeApi::new(creds.exchange.clone())));
    let manager = ExchangeManager::new(factory, config.polling.into(), notifier);
    let credentials = config.credentials();

    let bind_address = match config.webhook.bind_address.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, "invalid webhook.bind_address");
            return ExitCode::FAILURE;
        }
    };

    let result = tokio::select! {
        result = webhook::serve(manager, credentials, config.webhook.shared_secret, bind_address) => result.map_err(|e| e.to_string()),
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    };

    info!("tradebot-engine stopped");
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal error");
            ExitCode::FAILURE
        }
    }
}
