//! Poll controller tests

use std::sync::Arc;
use std::time::Duration;

use super::fixtures::{CountingSource, GatedSource, snapshot};
use crate::Error;
use crate::poll::{self, FetchOrigin, PollController, PollEvent, PollPhase, PollUpdate};
use mobupps_types::RefreshInterval;

#[test]
fn test_controller_phases() {
    let mut controller = PollController::new(RefreshInterval::Manual);
    assert_eq!(controller.phase(), PollPhase::Idle);

    assert!(controller.set_interval(RefreshInterval::TenSeconds));
    assert!(!controller.set_interval(RefreshInterval::TenSeconds));
    assert_eq!(controller.phase(), PollPhase::Scheduled);

    let token = controller.begin(FetchOrigin::Tick).unwrap();
    assert_eq!(controller.phase(), PollPhase::Fetching);

    assert!(matches!(
        controller.finish(token, Ok(snapshot(1))),
        PollEvent::Committed
    ));
    assert_eq!(controller.phase(), PollPhase::Scheduled);
}

#[test]
fn test_controller_rejects_late_older_result() {
    let mut controller = PollController::new(RefreshInterval::Manual);
    let first = controller.begin(FetchOrigin::Manual).unwrap();
    let second = controller.begin(FetchOrigin::Manual).unwrap();
    assert_eq!(second.get(), 2);

    assert!(matches!(
        controller.finish(second, Ok(snapshot(2))),
        PollEvent::Committed
    ));
    assert!(matches!(
        controller.finish(first, Ok(snapshot(1))),
        PollEvent::Discarded
    ));

    assert_eq!(controller.latest().unwrap().total_requests, 2);
    assert_eq!(controller.latest_token(), Some(second));
}

#[test]
fn test_controller_ignores_stale_failure() {
    let mut controller = PollController::new(RefreshInterval::Manual);
    let first = controller.begin(FetchOrigin::Manual).unwrap();
    let second = controller.begin(FetchOrigin::Manual).unwrap();

    let stale = controller.finish(first, Err(Error::Config("boom".to_string())));
    assert!(matches!(stale, PollEvent::Discarded));

    let current = controller.finish(second, Err(Error::Config("boom".to_string())));
    assert!(matches!(current, PollEvent::Failed(_)));
    assert!(controller.latest().is_none());
}

#[test]
fn test_controller_coalesces_ticks() {
    let mut controller = PollController::new(RefreshInterval::FiveSeconds);
    let token = controller.begin(FetchOrigin::Tick).unwrap();

    assert!(controller.begin(FetchOrigin::Tick).is_none());
    assert!(controller.begin(FetchOrigin::Tick).is_none());
    assert!(!controller.take_pending_refetch());

    controller.finish(token, Ok(snapshot(1)));
    assert!(controller.take_pending_refetch());
    assert!(!controller.take_pending_refetch());
}

#[test]
fn test_interval_change_drops_pending_refetch() {
    let mut controller = PollController::new(RefreshInterval::FiveSeconds);
    let token = controller.begin(FetchOrigin::Tick).unwrap();
    assert!(controller.begin(FetchOrigin::Tick).is_none());

    controller.set_interval(RefreshInterval::Manual);
    controller.finish(token, Ok(snapshot(1)));
    assert!(!controller.take_pending_refetch());
}

#[tokio::test(start_paused = true)]
async fn test_later_request_wins_when_it_resolves_first() {
    let (source, mut gates) = GatedSource::new(2);
    let source = Arc::new(source);
    let (mut handle, task) = poll::spawn(Arc::clone(&source), RefreshInterval::Manual);

    source.wait_started(1).await;
    handle.refresh();
    source.wait_started(2).await;

    let second = gates.pop().unwrap();
    let first = gates.pop().unwrap();

    second.send(Ok(snapshot(2))).unwrap();
    match handle.next_update().await {
        Some(PollUpdate::Committed { token, snapshot }) => {
            assert_eq!(token.get(), 2);
            assert_eq!(snapshot.total_requests, 2);
        }
        other => panic!("expected commit of #2, got {other:?}"),
    }

    first.send(Ok(snapshot(1))).unwrap();
    match handle.next_update().await {
        Some(PollUpdate::Discarded { token }) => assert_eq!(token.get(), 1),
        other => panic!("expected #1 to be discarded, got {other:?}"),
    }

    assert_eq!(handle.latest().unwrap().total_requests, 2);

    handle.stop();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_ticks_during_fetch_are_coalesced() {
    let (source, mut gates) = GatedSource::new(2);
    let source = Arc::new(source);
    let (mut handle, _task) = poll::spawn(Arc::clone(&source), RefreshInterval::FiveSeconds);

    // Two ticks fire while the initial fetch is still running
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(source.started(), 1);

    let refetch = gates.pop().unwrap();
    let initial = gates.pop().unwrap();
    refetch.send(Ok(snapshot(2))).unwrap();
    initial.send(Ok(snapshot(1))).unwrap();

    let mut committed = Vec::new();
    while committed.len() < 2 {
        if let Some(PollUpdate::Committed { token, .. }) = handle.next_update().await {
            committed.push(token.get());
        }
    }

    assert_eq!(committed, vec![1, 2]);
    assert_eq!(source.started(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_interval_change_cancels_old_timer() {
    let source = Arc::new(CountingSource::default());
    let (mut handle, _task) = poll::spawn(Arc::clone(&source), RefreshInterval::FiveSeconds);

    assert!(matches!(
        handle.next_update().await,
        Some(PollUpdate::Committed { .. })
    ));
    handle.set_interval(RefreshInterval::ThirtySeconds);

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(source.calls(), 1);

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(source.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_manual_interval_never_ticks() {
    let source = Arc::new(CountingSource::default());
    let (mut handle, _task) = poll::spawn(Arc::clone(&source), RefreshInterval::Manual);

    handle.next_update().await.unwrap();
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(source.calls(), 1);
    assert!(handle.try_next_update().is_none());

    handle.refresh();
    match handle.next_update().await {
        Some(PollUpdate::Committed { token, snapshot }) => {
            assert_eq!(token.get(), 2);
            assert_eq!(snapshot.total_requests, 2);
        }
        other => panic!("expected manual refresh to commit, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_fetch_keeps_previous_snapshot() {
    let (source, mut gates) = GatedSource::new(2);
    let (mut handle, _task) = poll::spawn(source, RefreshInterval::Manual);

    gates.remove(0).send(Ok(snapshot(7))).unwrap();
    handle.next_update().await.unwrap();

    handle.refresh();
    gates
        .remove(0)
        .send(Err(Error::Config("backend down".to_string())))
        .unwrap();

    match handle.next_update().await {
        Some(PollUpdate::Failed { token, error }) => {
            assert_eq!(token.get(), 2);
            assert_eq!(error.to_string(), "Config error: backend down");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(handle.latest().unwrap().total_requests, 7);
}

#[tokio::test(start_paused = true)]
async fn test_export_needs_a_resolved_snapshot() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (source, mut gates) = GatedSource::new(1);
    let (mut handle, _task) = poll::spawn(source, RefreshInterval::Manual);

    assert_eq!(handle.export(temp_dir.path()).unwrap(), None);

    gates.remove(0).send(Ok(snapshot(42))).unwrap();
    handle.next_update().await.unwrap();

    let path = handle.export(temp_dir.path()).unwrap().unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("metrics-"));
    assert!(name.ends_with(".json"));
    assert!(!name.contains(':'));

    let content = std::fs::read_to_string(&path).unwrap();
    let exported: mobupps_types::MetricsSnapshot = serde_json::from_str(&content).unwrap();
    assert_eq!(exported.total_requests, 42);
}

#[tokio::test]
async fn test_dropping_handle_stops_task() {
    let (handle, task) = poll::spawn(CountingSource::default(), RefreshInterval::FiveSeconds);
    drop(handle);
    task.await.unwrap();
}
