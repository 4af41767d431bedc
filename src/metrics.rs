use std::sync::LazyLock;

use prometheus::*;

use crate::scene::{ReconcileReport, RemovalReason};

static METRIC_SCENE_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "arkprep_scene_count",
        "count of reconciled scenes",
        &["dry_run", "subsample"]
    )
    .unwrap()
});

static METRIC_REMOVED_FILES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "arkprep_removed_files",
        "files removed or planned for removal",
        &["dry_run", "reason"]
    )
    .unwrap()
});

static METRIC_FAILED_REMOVALS: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("arkprep_failed_removals", "deletions that failed").unwrap()
});

static METRIC_RECONCILE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "arkprep_reconcile_duration",
        "duration of the per-scene reconcile in seconds"
    )
    .unwrap()
});

/// 记录一次场景对账的结果
pub fn observe_report(report: &ReconcileReport) {
    let dry_run = report.dry_run.to_string();
    let subsample = serde_json::to_value(report.subsample)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_default();

    METRIC_SCENE_COUNT.with_label_values(&[dry_run.as_str(), subsample.as_str()]).inc();
    for reason in [
        RemovalReason::Orphan,
        RemovalReason::Duplicate,
        RemovalReason::Malformed,
        RemovalReason::Subsampled,
    ] {
        let n = report.removals.iter().filter(|r| r.reason == reason).count();
        METRIC_REMOVED_FILES
            .with_label_values(&[dry_run.as_str(), reason_label(reason)])
            .inc_by(n as u64);
    }
    METRIC_FAILED_REMOVALS.inc_by(report.failed.len() as u64);
    METRIC_RECONCILE_DURATION.observe(report.elapsed_ms as f64 / 1000.0);
}

fn reason_label(reason: RemovalReason) -> &'static str {
    match reason {
        RemovalReason::Orphan => "orphan",
        RemovalReason::Duplicate => "duplicate",
        RemovalReason::Malformed => "malformed",
        RemovalReason::Subsampled => "subsampled",
    }
}

/// 以文本格式导出所有指标
pub fn render() -> String {
    let encoder = TextEncoder::new();
    encoder.encode_to_string(&prometheus::gather()).unwrap_or_default()
}
