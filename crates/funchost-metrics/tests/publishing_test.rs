//! End-to-end publishing tests
//!
//! Drives the host publisher on a paused tokio clock and inspects the artifacts
//! written to a scratch directory the way the scaling consumer would.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use funchost_common::LifecycleState;
use funchost_metrics::{
    ActivityMeter, FileSink, HostMetricsPublisher, MetricsPublisher, MetricsPublisherOptions,
    PeriodicPublisher, PublisherMetrics, Snapshot, StandbyMonitor,
};

fn read_artifacts(dir: &Path) -> Vec<(String, Snapshot)> {
    if !dir.exists() {
        return Vec::new();
    }
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            assert!(entry.file_type().unwrap().is_file());
            let name = entry.file_name().to_string_lossy().into_owned();
            let content = std::fs::read_to_string(entry.path()).unwrap();
            (name, serde_json::from_str(&content).unwrap())
        })
        .collect()
}

fn fast_options(dir: &Path) -> MetricsPublisherOptions {
    MetricsPublisherOptions {
        publish_path: dir.to_string_lossy().into_owned(),
        publish_interval_ms: 1000,
        initial_publish_delay_ms: 0,
        minimum_activity_interval_ms: 100,
        stamp_name: Some("test-stamp".into()),
    }
}

#[tokio::test(start_paused = true)]
async fn test_short_haul_publishes_expected_totals() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("metrics");
    let monitor = StandbyMonitor::new(LifecycleState::Specialized);
    let host = HostMetricsPublisher::new(&fast_options(&dir), &monitor).unwrap();

    // offset so no invocation lands exactly on a tick boundary
    tokio::time::sleep(Duration::from_millis(525)).await;

    let mut executions = 0u64;
    for i in 0..100 {
        let id = format!("inv-{}", i);
        host.on_function_started("HttpTrigger", &id);
        host.on_function_completed("HttpTrigger", &id);
        executions += 1;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // let the trailing partial interval publish
    tokio::time::sleep(Duration::from_millis(1000)).await;
    host.shutdown().await;

    let artifacts = read_artifacts(&dir);
    assert_eq!(artifacts.len(), 5000 / 1000 + 1);

    let mut total_count = 0;
    let mut total_time = 0;
    for (name, snapshot) in &artifacts {
        assert!(name.ends_with(".json"));
        assert_eq!(name, &name.to_lowercase());
        assert_eq!(snapshot.execution_count * 100, snapshot.execution_time_ms);
        total_count += snapshot.execution_count;
        total_time += snapshot.execution_time_ms;
    }
    assert_eq!(total_count, executions);
    assert_eq!(total_time, executions * 100);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_invocations_billed_per_window() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("metrics");
    let mut options = fast_options(&dir);
    options.initial_publish_delay_ms = 2000;
    let monitor = StandbyMonitor::new(LifecycleState::Specialized);
    let host = HostMetricsPublisher::new(&options, &monitor).unwrap();

    for i in 0..4 {
        host.on_function_started("HttpTrigger", &format!("inv-{}", i));
    }
    tokio::time::sleep(Duration::from_millis(30)).await;
    for i in 0..4 {
        host.on_function_completed("HttpTrigger", &format!("inv-{}", i));
    }
    tokio::time::sleep(Duration::from_millis(2500)).await;
    host.shutdown().await;

    let artifacts = read_artifacts(&dir);
    assert_eq!(artifacts.len(), 1);
    assert_eq!(
        artifacts[0].1,
        Snapshot {
            execution_time_ms: 100,
            execution_count: 4
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_idle_intervals_produce_no_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("metrics");
    let monitor = StandbyMonitor::new(LifecycleState::Specialized);
    let host = HostMetricsPublisher::new(&fast_options(&dir), &monitor).unwrap();

    host.on_function_started("HttpTrigger", "inv-1");
    host.on_function_completed("HttpTrigger", "inv-1");
    tokio::time::sleep(Duration::from_millis(5500)).await;
    host.shutdown().await;

    assert_eq!(read_artifacts(&dir).len(), 1);
    assert!(host.metrics().idle_ticks_total.get() >= 5);
}

#[tokio::test(start_paused = true)]
async fn test_specialization_starts_metering() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("metrics");
    let monitor = StandbyMonitor::new(LifecycleState::Standby);
    let host = HostMetricsPublisher::new(&fast_options(&dir), &monitor).unwrap();

    // placeholder traffic
    for _ in 0..10 {
        host.on_function_started("Warmup", "inv");
        host.on_function_completed("Warmup", "inv");
    }
    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert!(read_artifacts(&dir).is_empty());
    assert_eq!(host.metrics().ticks_total.get(), 0);

    monitor.set(LifecycleState::Specialized);
    assert!(host.is_active());

    for i in 0..3 {
        let id = format!("inv-{}", i);
        let _guard = host.track("HttpTrigger", &id);
    }
    tokio::time::sleep(Duration::from_millis(500)).await;
    host.shutdown().await;

    let artifacts = read_artifacts(&dir);
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].1.execution_count, 3);
    assert_eq!(artifacts[0].1.execution_time_ms, 300);
}

#[tokio::test(start_paused = true)]
async fn test_unwritable_sink_keeps_publishing() {
    let tmp = tempfile::tempdir().unwrap();
    // a regular file where the directory should be
    let blocked = tmp.path().join("metrics");
    std::fs::write(&blocked, b"").unwrap();

    let monitor = StandbyMonitor::new(LifecycleState::Specialized);
    let host = HostMetricsPublisher::new(&fast_options(&blocked), &monitor).unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    for _ in 0..3 {
        host.on_function_started("HttpTrigger", "inv");
        host.on_function_completed("HttpTrigger", "inv");
        tokio::time::sleep(Duration::from_millis(1000)).await;
    }
    host.shutdown().await;

    assert_eq!(host.metrics().write_errors_total.get(), 3);
    assert_eq!(host.metrics().artifacts_written_total.get(), 0);
}

#[tokio::test]
async fn test_thousand_publishes_have_distinct_names() {
    let tmp = tempfile::tempdir().unwrap();
    let meter = Arc::new(ActivityMeter::new(Duration::from_millis(100)));
    meter.enable();
    let publisher = PeriodicPublisher::new(
        meter.clone(),
        Arc::new(FileSink::new(tmp.path())),
        Arc::new(PublisherMetrics::new().unwrap()),
        Duration::from_secs(3600),
        Duration::from_secs(3600),
    )
    .unwrap();

    let mut names = HashSet::new();
    for _ in 0..1000 {
        meter.on_function_started();
        meter.on_function_completed();
        names.insert(publisher.on_tick().unwrap());
    }

    assert_eq!(names.len(), 1000);
    assert_eq!(read_artifacts(tmp.path()).len(), 1000);
}
