use fetchline::config::{Config, DEFAULT_CONFIG_FILE};
use fetchline::{Coordinator, fetch::HttpFetcher};
use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config_path =
        std::env::var("FETCHLINE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    let cfg = Config::load(&config_path)?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        config = %config_path,
        work_list = %cfg.basic.work_list.display(),
        data_dir = %cfg.basic.data_dir.display(),
        proxy = %cfg.http.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        base_url = %cfg.http.base_url.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        workers = cfg.run.workers,
        requests_per_second = cfg.http.requests_per_second,
    );

    let fetcher = Arc::new(HttpFetcher::new(&cfg.http, cfg.run.expect_json)?);
    let cancel = CancellationToken::new();
    tokio::spawn(watch_signals(cancel.clone()));

    let report = Coordinator::new(cfg, fetcher).run(cancel).await?;
    info!(
        items = report.items,
        workers = report.workers,
        attempts = report.totals.attempts,
        successes = report.totals.successes,
        not_found = report.totals.not_found,
        abandoned = report.totals.abandoned,
        elapsed_s = report.elapsed.as_secs_f64(),
        "Run finished"
    );
    if !report.stragglers.is_empty() {
        warn!(workers = ?report.stragglers, "Run ended with workers that did not stop cleanly");
    }
    Ok(())
}

/// First signal cancels gracefully; a second one exits immediately.
async fn watch_signals(cancel: CancellationToken) {
    if shutdown_signal().await.is_err() {
        return;
    }
    info!("Stop requested; finishing in-flight work (signal again to force exit)");
    cancel.cancel();

    if shutdown_signal().await.is_ok() {
        warn!("Second stop request; exiting immediately");
        std::process::exit(130);
    }
}

async fn shutdown_signal() -> std::io::Result<()> {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())?
            .recv()
            .await;
        Ok::<(), std::io::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<std::io::Result<()>>();

    tokio::select! {
        res = ctrl_c => res,
        res = terminate => res,
    }
}
