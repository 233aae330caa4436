//! Hypercache - Trace-replay harness
//!
//! Replays a cache access trace against every configured policy and
//! capacity, printing one JSON report per run.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hypercache::trace::load_trace;
use hypercache::{run_experiment, Config};

/// Main entry point for the replay harness.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Load and parse the trace once
/// 4. Run every (capacity, policy) pair concurrently
/// 5. Print reports in configuration order
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" for this crate, can be overridden with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hypercache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    let policies = config.policies().context("invalid CACHE_POLICIES")?;
    info!(
        "Configuration loaded: trace={}, policies={:?}, capacities={:?} {}, sample_size={}, seed={:?}",
        config.trace_file.display(),
        policies,
        config.max_capacities,
        config.capacity_mode,
        config.sample_size,
        config.seed
    );

    let events = load_trace(&config.trace_file)
        .await
        .with_context(|| format!("failed to load trace {}", config.trace_file.display()))?;
    let events = Arc::new(events);
    info!("Trace loaded: {} events", events.len());

    let mut runs = Vec::new();
    for &max_capacity in &config.max_capacities {
        for &policy in &policies {
            let events = events.clone();
            let (sample_size, seed, mode) =
                (config.sample_size, config.seed, config.capacity_mode);
            runs.push(tokio::spawn(async move {
                run_experiment(policy, max_capacity, sample_size, seed, mode, events).await
            }));
        }
    }

    for run in runs {
        let report = run.await.context("experiment task failed")??;
        info!("{}", report);
        println!("{}", serde_json::to_string(&report)?);
    }

    Ok(())
}
