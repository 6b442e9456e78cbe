//! Metric names
//!
//! Every counter and histogram emitted through the `metrics` macros is named
//! here.
//!
//! # Naming
//!
//! - prefix: `ingestprobe_`
//! - suffix: `_total` (counter), `_seconds` (histogram)

/// Status label key (IN_PROGRESS, COMPLETED, ...)
pub const LABEL_STATUS: &str = "status";

/// Service action label key (suspend, resume)
pub const LABEL_ACTION: &str = "action";

/// Result label key (success, failure)
pub const LABEL_RESULT: &str = "result";

/// Status queries issued by the poller (counter)
pub const POLL_QUERIES_TOTAL: &str = "ingestprobe_poll_queries_total";

/// Polls ending in a terminal status (counter, label: status)
pub const POLL_TERMINAL_TOTAL: &str = "ingestprobe_poll_terminal_total";

/// Polls that ran out of time (counter)
pub const POLL_TIMEOUTS_TOTAL: &str = "ingestprobe_poll_timeouts_total";

/// Status queries that hit a connectivity failure (counter)
pub const POLL_CONNECTIVITY_FAILURES_TOTAL: &str = "ingestprobe_poll_connectivity_failures_total";

/// Time from first query to terminal status (histogram, seconds)
pub const POLL_DURATION_SECONDS: &str = "ingestprobe_poll_duration_seconds";

/// Ingestion requests published (counter, label: result)
pub const TRIGGER_PUBLISHED_TOTAL: &str = "ingestprobe_trigger_published_total";

/// Artifact verifications (counter, label: result)
pub const ARTIFACT_VERIFICATIONS_TOTAL: &str = "ingestprobe_artifact_verifications_total";

/// Service control actions (counter, labels: action, result)
pub const SERVICE_ACTIONS_TOTAL: &str = "ingestprobe_service_actions_total";

/// Registers descriptions for every metric above.
///
/// Harmless when no recorder is installed.
pub fn describe_metrics() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(POLL_QUERIES_TOTAL, "Status queries issued by the poller");
    describe_counter!(
        POLL_TERMINAL_TOTAL,
        "Polls that reached a terminal status, by status"
    );
    describe_counter!(POLL_TIMEOUTS_TOTAL, "Polls that exceeded their bound");
    describe_counter!(
        POLL_CONNECTIVITY_FAILURES_TOTAL,
        "Status queries that could not reach the store"
    );
    describe_histogram!(
        POLL_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Time from first status query to terminal status"
    );
    describe_counter!(TRIGGER_PUBLISHED_TOTAL, "Ingestion requests published");
    describe_counter!(ARTIFACT_VERIFICATIONS_TOTAL, "Stored artifact checks");
    describe_counter!(SERVICE_ACTIONS_TOTAL, "Service suspend/resume actions");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_share_prefix() {
        for name in [
            POLL_QUERIES_TOTAL,
            POLL_TERMINAL_TOTAL,
            POLL_TIMEOUTS_TOTAL,
            POLL_CONNECTIVITY_FAILURES_TOTAL,
            POLL_DURATION_SECONDS,
            TRIGGER_PUBLISHED_TOTAL,
            ARTIFACT_VERIFICATIONS_TOTAL,
            SERVICE_ACTIONS_TOTAL,
        ] {
            assert!(name.starts_with("ingestprobe_"), "{name}");
        }
    }

    #[test]
    fn describe_without_recorder_does_not_panic() {
        describe_metrics();
    }
}
