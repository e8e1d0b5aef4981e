// Periodic trigger: startup run, interval ticks, shutdown

mod common;

use candle_seeder::config::{SeedConfig, TriggerConfig};
use candle_seeder::models::TaskStatus;
use candle_seeder::scheduler::trigger;
use candle_seeder::seed::{SeedRequest, SeedService};
use common::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

#[tokio::test]
async fn test_trigger_runs_batches_until_shutdown() {
    let (_dir, store) = temp_store().await;
    store.register_symbols(&strings(&["AAPL"])).await.unwrap();
    let source = Arc::new(ScriptedSource::grid(DAY));
    let defaults = SeedConfig {
        rate_limit_microseconds: 0,
        request_limit: 10,
        batch_requests_per_run: 1,
        ..SeedConfig::default()
    };
    let service = Arc::new(SeedService::new(
        store.clone(),
        scheduler_for(&store, source.clone()),
        store.clone(),
        store.clone(),
        defaults,
    ));
    service.start_seed(&SeedRequest::default()).await.unwrap();
    let config = TriggerConfig {
        enabled: true,
        interval_secs: 1,
        schedule: None,
        run_on_startup: true,
    };
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let handle = trigger::spawn(service, config, shutdown_rx);
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("trigger stops after shutdown")
        .unwrap();

    // one run at startup plus one after the first interval
    let calls = source.calls().len();
    assert_eq!(calls, 2);
    let task = store.find_task("AAPL", "1D").await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert!(task.progressed);
}
