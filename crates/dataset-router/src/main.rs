//! dataset-router: fans each dataset request out to every configured backend
//! and answers with the best-scoring transformation.

mod config;
mod correlation;
mod dispatch;
mod error;
mod evaluate;
mod response;
mod select;
mod server;
mod stats;
mod target;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use config::RouterConfig;
use dispatch::Dispatcher;
use evaluate::ScoreStrategy;
use select::ResponseSelector;
use server::AppState;
use stats::RouterStats;
use target::Target;

fn main() -> anyhow::Result<()> {
    let config_path = {
        let args: Vec<String> = std::env::args().collect();
        args.iter()
            .position(|a| a == "--config")
            .and_then(|i| args.get(i + 1).cloned())
            .or_else(|| args.get(1).filter(|a| !a.starts_with('-')).cloned())
            .or_else(|| std::env::var("DATASET_ROUTER_CONFIG").ok())
            .unwrap_or_else(|| "dataset-router.toml".to_string())
    };

    let config = RouterConfig::load(&config_path)?;

    // Build the tokio runtime first: the tonic gRPC exporter needs a reactor context
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let tracing_guard = router_tracing::init_tracing(&config.tracing);

        tracing::info!(
            config_path = %config_path,
            listen_address = %config.router.listen_address(),
            path = %config.router.path,
            targets = config.targets.len(),
            otlp = tracing_guard.exporting(),
            "Starting dataset-router"
        );

        run(config).await
    })
}

async fn run(config: RouterConfig) -> anyhow::Result<()> {
    // One client for every target; the common timeout bounds each call.
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.common.timeout))
        .build()?;

    let common = Arc::new(config.common.clone());
    let targets: Vec<Target> = config
        .targets
        .iter()
        .map(|t| Target::new(t, common.clone()))
        .collect();
    for target in &targets {
        tracing::info!(target = %target.name(), "Registered target");
    }

    let strategy = ScoreStrategy::from_name(&config.router.score_function);
    tracing::info!(score_function = %strategy, "Response scoring configured");

    let stats = RouterStats::new();
    let state = AppState {
        listen: config.router,
        dispatcher: Dispatcher::new(client, targets, stats.clone()),
        selector: ResponseSelector::new(strategy),
        stats,
    };

    server::run(state).await
}
