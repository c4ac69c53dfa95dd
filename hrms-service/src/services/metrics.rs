//! Domain metrics for hrms-service, exported through the service-core
//! Prometheus recorder.

use metrics::{counter, histogram};
use std::time::Duration;

/// Count a hierarchy mutation by operation, node kind and outcome.
///
/// `outcome` is `ok` or an error class such as `circular_reference`.
pub fn record_mutation(operation: &'static str, kind: &'static str, outcome: &'static str) {
    counter!(
        "hrms_hierarchy_mutations_total",
        "operation" => operation,
        "kind" => kind,
        "outcome" => outcome
    )
    .increment(1);
}

/// Count stored-state corruption detected by a defensive check.
pub fn record_consistency_violation(check: &'static str) {
    counter!("hrms_consistency_violations_total", "check" => check).increment(1);
}

/// Record database statement latency by repository operation.
pub fn record_db_query(operation: &'static str, elapsed: Duration) {
    histogram!("hrms_db_query_duration_seconds", "operation" => operation)
        .record(elapsed.as_secs_f64());
}
