//! Client observability metrics
//!
//! Emitted through the `metrics` facade; installing an exporter is left to
//! the application.

use std::time::{Duration, Instant};

/// Record a completed HTTP request
pub fn record_request(method: &str, status: u16, duration: Duration) {
    metrics::counter!(
        "quarry_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);

    metrics::histogram!(
        "quarry_request_duration_seconds",
        "method" => method.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record a request that ended in an error
pub fn record_request_error(error_type: &str) {
    metrics::counter!(
        "quarry_request_errors_total",
        "error_type" => error_type.to_string(),
    )
    .increment(1);
}

pub fn record_retry() {
    metrics::counter!("quarry_retries_total").increment(1);
}

pub fn record_node_dead(node: &str) {
    metrics::counter!(
        "quarry_node_marked_dead_total",
        "node" => node.to_string(),
    )
    .increment(1);
}

pub fn record_sniff(success: bool) {
    let status = if success { "ok" } else { "error" };
    metrics::counter!("quarry_sniff_total", "status" => status).increment(1);
}

/// Record a healthcheck round, counting node outcomes by status
pub fn record_healthcheck(alive: usize, dead: usize) {
    metrics::counter!("quarry_healthcheck_total", "status" => "ok").increment(alive as u64);
    metrics::counter!("quarry_healthcheck_total", "status" => "error").increment(dead as u64);
    record_pool_size(alive, dead);
}

/// Update the gauge of pooled connections by state
pub fn record_pool_size(alive: usize, dead: usize) {
    metrics::gauge!("quarry_pool_connections", "state" => "alive").set(alive as f64);
    metrics::gauge!("quarry_pool_connections", "state" => "dead").set(dead as f64);
}

/// Record a bulk processor commit
pub fn record_bulk_commit(processor: &str, actions: usize, success: bool) {
    let status = if success { "ok" } else { "error" };
    metrics::counter!(
        "quarry_bulk_processor_commits_total",
        "processor" => processor.to_string(),
        "status" => status,
    )
    .increment(1);

    metrics::counter!(
        "quarry_bulk_processor_actions_total",
        "processor" => processor.to_string(),
    )
    .increment(actions as u64);
}

/// Timer for a single request
pub struct RequestTimer {
    method: String,
    start: Instant,
}

impl RequestTimer {
    pub fn new(method: &str) -> Self {
        Self {
            method: method.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Record success with the response status
    pub fn finish(self, status: u16) -> Duration {
        let elapsed = self.start.elapsed();
        record_request(&self.method, status, elapsed);
        elapsed
    }

    /// Record failure; a request that got a response also counts by status
    pub fn error(self, error_type: &str, status: Option<u16>) {
        if let Some(status) = status {
            record_request(&self.method, status, self.start.elapsed());
        }
        record_request_error(error_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
    use std::sync::Mutex;

    /// Remembers every metric key touched, rendered as `name{k=v,...}`
    #[derive(Default)]
    struct KeyRecorder {
        keys: Mutex<Vec<String>>,
    }

    impl KeyRecorder {
        fn push(&self, key: &Key) {
            let labels: Vec<String> = key
                .labels()
                .map(|l| format!("{}={}", l.key(), l.value()))
                .collect();
            self.keys
                .lock()
                .unwrap()
                .push(format!("{}{{{}}}", key.name(), labels.join(",")));
        }

        fn keys(&self) -> Vec<String> {
            self.keys.lock().unwrap().clone()
        }
    }

    impl Recorder for KeyRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            self.push(key);
            Counter::noop()
        }

        fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
            self.push(key);
            Gauge::noop()
        }

        fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
            self.push(key);
            Histogram::noop()
        }
    }

    #[test]
    fn test_api_error_counts_request_by_status() {
        let recorder = KeyRecorder::default();
        metrics::with_local_recorder(&recorder, || {
            RequestTimer::new("GET").error("api", Some(404));
        });
        let keys = recorder.keys();
        assert!(keys.contains(&"quarry_requests_total{method=GET,status=404}".to_string()));
        assert!(keys.contains(&"quarry_request_duration_seconds{method=GET}".to_string()));
        assert!(keys.contains(&"quarry_request_errors_total{error_type=api}".to_string()));
    }

    #[test]
    fn test_transport_error_has_no_status() {
        let recorder = KeyRecorder::default();
        metrics::with_local_recorder(&recorder, || {
            RequestTimer::new("POST").error("transport", None);
        });
        let keys = recorder.keys();
        assert_eq!(keys, vec!["quarry_request_errors_total{error_type=transport}".to_string()]);
    }

    #[test]
    fn test_healthcheck_reports_failures() {
        let recorder = KeyRecorder::default();
        metrics::with_local_recorder(&recorder, || record_healthcheck(0, 2));
        let keys = recorder.keys();
        assert!(keys.contains(&"quarry_healthcheck_total{status=error}".to_string()));
        assert!(keys.contains(&"quarry_pool_connections{state=dead}".to_string()));
    }
}
