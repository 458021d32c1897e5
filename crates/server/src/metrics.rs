//! Prometheus recorder for the job counters recorded by the jobs crate.

use std::sync::OnceLock;

use metrics::{describe_counter, describe_gauge, describe_histogram, gauge, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Playbook runs take seconds to tens of minutes.
const JOB_DURATION_BUCKETS: &[f64] = &[1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0];

static PROMETHEUS: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Install the recorder on first call. Returns `false` if it could not be installed.
pub fn init_metrics() -> bool {
    PROMETHEUS.get_or_init(install_recorder).is_some()
}

fn install_recorder() -> Option<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full("job_duration_seconds".into()), JOB_DURATION_BUCKETS)
        .and_then(PrometheusBuilder::install_recorder)
        .map_err(|e| tracing::warn!(error = %e, "Metrics recorder not installed"))
        .ok()?;

    describe_counter!("jobs_submitted_total", "Jobs accepted by POST /run");
    describe_counter!("jobs_finished_total", "Jobs that reached a terminal outcome, by outcome");
    describe_counter!("jobs_removed_total", "Jobs removed before their log was consumed");
    describe_histogram!(
        "job_duration_seconds",
        Unit::Seconds,
        "Wall time from job start to terminal outcome"
    );
    describe_gauge!("log_subscribers", "Open WebSocket log subscriptions");
    Some(handle)
}

/// Prometheus text exposition, or `None` before [`init_metrics`].
pub fn render_metrics() -> Option<String> {
    PROMETHEUS.get()?.as_ref().map(PrometheusHandle::render)
}

/// Counts one open log subscription in `log_subscribers` while alive.
pub struct SubscriberGauge(());

impl SubscriberGauge {
    pub fn open() -> Self {
        gauge!("log_subscribers").increment(1.0);
        Self(())
    }
}

impl Drop for SubscriberGauge {
    fn drop(&mut self) {
        gauge!("log_subscribers").decrement(1.0);
    }
}
