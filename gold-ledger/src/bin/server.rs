//! Gold ledger server binary
//!
//! Bootstraps storage, starts the pipeline and, when `demo.enabled` is set,
//! drives the synthetic load: `producer_pairs` threads submitting `+1` and as
//! many submitting `-1`.

use anyhow::Context;
use gold_ledger::{Config, GoldLedger, GoldProducer, LogFormat};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(config.log_format);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        "Starting gold ledger server"
    );

    let ledger = GoldLedger::open(config.clone())
        .await
        .context("Failed to open gold ledger")?;
    tracing::info!(data_dir = ?config.data_dir, "Gold ledger opened");

    if config.demo.enabled {
        let producer = ledger.producer();
        let pairs = config.demo.producer_pairs;
        tokio::task::spawn_blocking(move || run_demo_load(producer, pairs));
    }

    tokio::signal::ctrl_c()
        .await
        .context("Unable to listen for shutdown signal")?;
    tracing::info!("Received shutdown signal");

    let balance = ledger.balance()?;
    tracing::debug!("Final metrics:\n{}", ledger.metrics().render());
    ledger.shutdown().await?;

    tracing::info!(balance, "Gold ledger server stopped");
    Ok(())
}

fn load_config() -> anyhow::Result<Config> {
    let config = match std::env::var("GOLD_CONFIG") {
        Ok(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        Err(_) => Config::from_env().context("Failed to load config from environment")?,
    };
    Ok(config)
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

/// Submit `pairs` × (+1, -1) from one OS thread per delta
fn run_demo_load(producer: GoldProducer, pairs: usize) {
    tracing::info!(pairs, "Starting demo load");

    let mut threads = Vec::with_capacity(pairs * 2);
    for _ in 0..pairs {
        for delta in [1, -1] {
            let producer = producer.clone();
            threads.push(std::thread::spawn(move || {
                if let Err(e) = producer.blocking_submit_delta(delta) {
                    tracing::warn!(delta, "Demo producer interrupted: {}", e);
                }
            }));
        }
    }

    for thread in threads {
        if thread.join().is_err() {
            tracing::error!("Demo producer thread panicked");
        }
    }

    tracing::info!(submitted = pairs * 2, "Demo load submitted");
}
