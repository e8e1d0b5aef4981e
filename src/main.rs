use anyhow::Result;
use candle_seeder::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let store = Arc::new(
        store::SeedStore::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    store.init().await?;
    if !app_config.seed.symbols.is_empty() {
        let added = store.register_symbols(&app_config.seed.symbols).await?;
        tracing::info!(added, "registered configured symbols");
    }

    let source = Arc::new(source::HttpCandleSource::new(&app_config.api)?);
    let scheduler = scheduler::BatchScheduler::new(
        store.clone(),
        source,
        store.clone(),
        store.clone(),
    );
    let service = Arc::new(seed::SeedService::new(
        store.clone(),
        scheduler,
        store.clone(),
        store.clone(),
        app_config.seed.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let trigger_handle = if app_config.trigger.enabled {
        Some(scheduler::trigger::spawn(
            service.clone(),
            app_config.trigger.clone(),
            shutdown_rx,
        ))
    } else {
        tracing::info!("batch trigger disabled; batches run only via POST /api/seed/run");
        None
    };

    let app = routes::app(service, store);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            if let Some(handle) = trigger_handle {
                let _ = handle.await;
            }
        }
    }

    Ok(())
}
