// Seed control tests: start, pause/resume, settings and the run entry point

mod common;

use candle_seeder::config::SeedConfig;
use candle_seeder::error::SeedError;
use candle_seeder::models::{BatchOutcome, RangeMode, RequestedConstraints, SettingsPatch, TaskStatus};
use candle_seeder::seed::{SeedRequest, SeedService};
use candle_seeder::store::{SeedStore, SymbolRegistry};
use common::*;
use std::sync::Arc;

fn service_for(store: &Arc<SeedStore>, source: Arc<ScriptedSource>) -> SeedService {
    let defaults = SeedConfig {
        rate_limit_microseconds: 0,
        ..SeedConfig::default()
    };
    SeedService::new(
        store.clone(),
        scheduler_for(store, source),
        store.clone(),
        store.clone(),
        defaults,
    )
}

#[tokio::test]
async fn test_start_without_symbols_fails_and_audits() {
    let (_dir, store) = temp_store().await;
    let service = service_for(&store, Arc::new(ScriptedSource::empty()));

    let err = service.start_seed(&SeedRequest::default()).await.unwrap_err();

    assert!(matches!(err, SeedError::Configuration(_)));
    assert!(store.list_tasks().await.unwrap().is_empty());
    let audit = store.recent_audit(5).await.unwrap();
    assert_eq!(audit[0].kind, "seed_failed");
}

#[tokio::test]
async fn test_start_creates_tasks_for_registered_symbols() {
    let (_dir, store) = temp_store().await;
    store
        .register_symbols(&strings(&["AAPL", "MSFT"]))
        .await
        .unwrap();
    let service = service_for(&store, Arc::new(ScriptedSource::empty()));
    let request = SeedRequest {
        constraints: RequestedConstraints {
            mode: Some(RangeMode::DateRange),
            from_time: Some(1_600_000_000),
            to_time: Some(1_650_000_000),
            session_count: None,
        },
        timeframes: Some(strings(&["1D", "4H"])),
    };

    let started = service.start_seed(&request).await.unwrap();

    assert_eq!(started.tasks_created, 4);
    assert_eq!(started.constraints.from_time, 1_600_000_000);
    let status = service.status().await.unwrap();
    assert!(!status.paused);
    assert_eq!(status.tasks.pending, 4);
    assert_eq!(status.settings.timeframes, strings(&["1D", "4H"]));
    assert_eq!(status.constraints, Some(started.constraints));
    let audit = store.recent_audit(5).await.unwrap();
    assert_eq!(audit[0].kind, "seed_started");
}

#[tokio::test]
async fn test_start_with_empty_timeframes_is_skipped() {
    let (_dir, store) = temp_store().await;
    store.register_symbols(&strings(&["AAPL"])).await.unwrap();
    let service = service_for(&store, Arc::new(ScriptedSource::empty()));
    let request = SeedRequest {
        timeframes: Some(Vec::new()),
        ..Default::default()
    };

    let started = service.start_seed(&request).await.unwrap();

    assert_eq!(started.tasks_created, 0);
    assert!(store.list_tasks().await.unwrap().is_empty());
    assert_eq!(store.recent_audit(1).await.unwrap()[0].kind, "seed_skipped");
}

fn date_range_request(from: i64, to: i64, timeframes: Option<&[&str]>) -> SeedRequest {
    SeedRequest {
        constraints: RequestedConstraints {
            mode: Some(RangeMode::DateRange),
            from_time: Some(from),
            to_time: Some(to),
            session_count: None,
        },
        timeframes: timeframes.map(strings),
    }
}

#[tokio::test]
async fn test_skipped_start_keeps_previous_run() {
    let (_dir, store) = temp_store().await;
    store.register_symbols(&strings(&["AAPL"])).await.unwrap();
    let service = service_for(&store, Arc::new(ScriptedSource::empty()));
    let first = service
        .start_seed(&date_range_request(1_600_000_000, 1_650_000_000, Some(&["1H"])))
        .await
        .unwrap();
    service.pause().await.unwrap();

    let skipped = service
        .start_seed(&date_range_request(1_500_000_000, 1_550_000_000, Some(&[])))
        .await
        .unwrap();

    assert_eq!(skipped.tasks_created, 0);
    assert_eq!(skipped.constraints, first.constraints);
    let status = service.status().await.unwrap();
    assert!(status.paused);
    assert_eq!(status.constraints, Some(first.constraints));
    assert_eq!(status.settings.timeframes, strings(&["1H"]));
    assert_eq!(status.tasks.pending, 1);
}

#[tokio::test]
async fn test_failed_start_leaves_settings_untouched() {
    let (_dir, store) = temp_store().await;
    let service = service_for(&store, Arc::new(ScriptedSource::empty()));

    let err = service
        .start_seed(&date_range_request(1_600_000_000, 1_650_000_000, Some(&["4H"])))
        .await
        .unwrap_err();

    assert!(matches!(err, SeedError::Configuration(_)));
    let status = service.status().await.unwrap();
    assert!(status.constraints.is_none());
    assert_eq!(status.settings.timeframes, strings(&["1D"]));
}

#[tokio::test]
async fn test_start_without_bounds_reuses_stored_range() {
    let (_dir, store) = temp_store().await;
    store.register_symbols(&strings(&["AAPL"])).await.unwrap();
    let service = service_for(&store, Arc::new(ScriptedSource::empty()));
    let first = service
        .start_seed(&date_range_request(1_600_000_000, 1_650_000_000, None))
        .await
        .unwrap();

    let second = service.start_seed(&SeedRequest::default()).await.unwrap();

    assert_eq!(second.constraints, first.constraints);
    assert_eq!(store.load_constraints().await.unwrap(), Some(first.constraints));
}

#[tokio::test]
async fn test_add_symbols_queues_tasks_without_resetting_progress() {
    let (_dir, store) = temp_store().await;
    store.register_symbols(&strings(&["AAPL"])).await.unwrap();
    let service = service_for(&store, Arc::new(ScriptedSource::empty()));
    service
        .start_seed(&date_range_request(1_600_000_000, 1_650_000_000, Some(&["1D", "1H"])))
        .await
        .unwrap();
    let aapl = store.find_task("AAPL", "1D").await.unwrap().unwrap();
    store.update_progress(aapl.id, 1_620_000_000).await.unwrap();

    let added = service
        .add_symbols(&strings(&["MSFT", "AAPL", " "]))
        .await
        .unwrap();

    assert_eq!(added.symbols_registered, 1);
    assert_eq!(added.tasks_created, 2);
    let aapl = store.find_task("AAPL", "1D").await.unwrap().unwrap();
    assert_eq!(aapl.last_to_time, 1_620_000_000);
    assert!(aapl.progressed);
    assert!(store.find_task("MSFT", "1H").await.unwrap().is_some());
    assert_eq!(store.get_all_symbols().await.unwrap(), strings(&["AAPL", "MSFT"]));
    assert_eq!(store.recent_audit(1).await.unwrap()[0].kind, "seed_extended");
}

#[tokio::test]
async fn test_add_symbols_rejects_empty_list() {
    let (_dir, store) = temp_store().await;
    let service = service_for(&store, Arc::new(ScriptedSource::empty()));

    let err = service.add_symbols(&strings(&["", "  "])).await.unwrap_err();

    assert!(matches!(err, SeedError::Configuration(_)));
    assert!(store.get_all_symbols().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_start_clears_pause() {
    let (_dir, store) = temp_store().await;
    store.register_symbols(&strings(&["AAPL"])).await.unwrap();
    let service = service_for(&store, Arc::new(ScriptedSource::empty()));
    service.pause().await.unwrap();

    service.start_seed(&SeedRequest::default()).await.unwrap();

    assert!(!store.is_paused().await.unwrap());
}

#[tokio::test]
async fn test_pause_and_resume_gate_runs() {
    let (_dir, store) = temp_store().await;
    store.register_symbols(&strings(&["AAPL"])).await.unwrap();
    let source = Arc::new(ScriptedSource::empty());
    let service = service_for(&store, source.clone());
    service.start_seed(&SeedRequest::default()).await.unwrap();

    service.pause().await.unwrap();
    let paused = service.run_once().await.unwrap();
    assert_eq!(paused.outcome, BatchOutcome::Paused);
    assert!(source.calls().is_empty());

    service.resume().await.unwrap();
    let report = service.run_once().await.unwrap();
    assert_eq!(report.outcome, BatchOutcome::Completed);
    assert_eq!(report.done, 1);
    let task = store.find_task("AAPL", "1D").await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Done);

    let kinds: Vec<String> = store
        .recent_audit(10)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.kind)
        .collect();
    assert!(kinds.contains(&"seed_paused".to_string()));
    assert!(kinds.contains(&"seed_resumed".to_string()));
}

#[tokio::test]
async fn test_run_uses_persisted_window_and_settings() {
    let (_dir, store) = temp_store().await;
    store.register_symbols(&strings(&["AAPL"])).await.unwrap();
    let source = Arc::new(ScriptedSource::grid(DAY));
    let service = service_for(&store, source.clone());
    let to = 19_676 * DAY;
    service
        .start_seed(&SeedRequest {
            constraints: RequestedConstraints {
                mode: Some(RangeMode::DateRange),
                from_time: Some(to - 100 * DAY),
                to_time: Some(to),
                session_count: None,
            },
            timeframes: None,
        })
        .await
        .unwrap();
    service
        .update_settings(&SettingsPatch {
            request_limit: Some(10),
            batch_requests_per_run: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();

    service.run_once().await.unwrap();

    let calls = source.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].to, to);
    assert_eq!(calls[0].from, to - 10 * DAY);
}
