// Periodic trigger: fires one scheduler invocation per tick (fixed interval or cron, local time)
// until the shutdown signal arrives. An invocation in progress is never interrupted.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::TriggerConfig;
use crate::models::BatchOutcome;
use crate::seed::SeedService;

pub fn spawn(
    service: Arc<SeedService>,
    config: TriggerConfig,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let (tick_tx, mut tick_rx) = mpsc::channel::<()>(1);
        let ticker = tokio::spawn(tick_source(config.clone(), tick_tx));

        if config.run_on_startup {
            run_and_log(&service).await;
        }

        loop {
            tokio::select! {
                tick = tick_rx.recv() => {
                    if tick.is_none() {
                        warn!("batch trigger has no schedule; stopping");
                        break;
                    }
                    run_and_log(&service).await;
                }
                _ = &mut shutdown_rx => {
                    debug!("Batch trigger shutting down");
                    break;
                }
            }
        }
        ticker.abort();
    })
}

/// Sends on `tx` at each trigger time. Stops when the receiver is gone or the cron has no next time.
async fn tick_source(config: TriggerConfig, tx: mpsc::Sender<()>) {
    if let Some(ref cron_str) = config.schedule {
        let Ok(schedule) = cron::Schedule::from_str(cron_str) else {
            warn!(cron = %cron_str, "invalid trigger schedule; batches will not run");
            return;
        };
        loop {
            let now = chrono::Local::now();
            let Some(next) = schedule.after(&now).next() else {
                return;
            };
            let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
            tokio::time::sleep(delay).await;
            if tx.send(()).await.is_err() {
                break;
            }
        }
    } else {
        let period = Duration::from_secs(config.interval_secs);
        let mut tick = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            if tx.send(()).await.is_err() {
                break;
            }
        }
    }
}

async fn run_and_log(service: &SeedService) {
    match service.run_once().await {
        Ok(report) if report.outcome == BatchOutcome::Paused => {
            debug!("seed paused; trigger tick skipped");
        }
        Ok(report) if report.processed > 0 => {
            info!(
                processed = report.processed,
                done = report.done,
                skipped = report.skipped,
                failed = report.failed,
                running = report.running,
                "triggered seed batch"
            );
        }
        Ok(_) => debug!("no seed tasks to advance"),
        Err(e) => warn!(error = %e, "seed batch failed"),
    }
}
