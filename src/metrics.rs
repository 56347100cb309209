//! In-process counters exposed at `/metrics`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

/// A point-in-time copy of every counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Accepted webhooks by `X-GitHub-Event`.
    pub webhooks: BTreeMap<String, u64>,
    /// Gateway responses by HTTP status code.
    pub responses: BTreeMap<u16, u64>,
    /// Failed or panicked plugin invocations by plugin name.
    pub plugin_failures: BTreeMap<String, u64>,
}

/// Process-wide counters. Cheap to share behind an `Arc`.
#[derive(Debug, Default)]
pub struct Metrics {
    counters: Mutex<MetricsSnapshot>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a counter half-updated.
    fn counters(&self) -> MutexGuard<'_, MetricsSnapshot> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_webhook(&self, event_type: &str) {
        *self
            .counters()
            .webhooks
            .entry(event_type.to_string())
            .or_default() += 1;
    }

    pub fn record_response(&self, status: u16) {
        *self.counters().responses.entry(status).or_default() += 1;
    }

    pub fn record_plugin_failure(&self, plugin: &str) {
        *self
            .counters()
            .plugin_failures
            .entry(plugin.to_string())
            .or_default() += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.counters().clone()
    }

    /// Prometheus-style text exposition.
    pub fn render(&self) -> String {
        let snapshot = self.snapshot();
        let mut out = String::new();

        out.push_str("# TYPE chatops_webhook_counter counter\n");
        for (event_type, count) in &snapshot.webhooks {
            let _ = writeln!(out, "chatops_webhook_counter{{event_type=\"{event_type}\"}} {count}");
        }
        out.push_str("# TYPE chatops_response_counter counter\n");
        for (status, count) in &snapshot.responses {
            let _ = writeln!(out, "chatops_response_counter{{status=\"{status}\"}} {count}");
        }
        out.push_str("# TYPE chatops_plugin_failure_counter counter\n");
        for (plugin, count) in &snapshot.plugin_failures {
            let _ = writeln!(out, "chatops_plugin_failure_counter{{plugin=\"{plugin}\"}} {count}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_key() {
        let metrics = Metrics::new();
        metrics.record_webhook("issue_comment");
        metrics.record_webhook("issue_comment");
        metrics.record_webhook("push");
        metrics.record_response(200);
        metrics.record_response(401);
        metrics.record_plugin_failure("label");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.webhooks["issue_comment"], 2);
        assert_eq!(snapshot.webhooks["push"], 1);
        assert_eq!(snapshot.responses[&200], 1);
        assert_eq!(snapshot.responses[&401], 1);
        assert_eq!(snapshot.plugin_failures["label"], 1);
    }

    #[test]
    fn render_lists_every_series() {
        let metrics = Metrics::new();
        metrics.record_webhook("push");
        metrics.record_response(200);

        let text = metrics.render();
        assert!(text.contains("chatops_webhook_counter{event_type=\"push\"} 1\n"));
        assert!(text.contains("chatops_response_counter{status=\"200\"} 1\n"));
        assert!(text.contains("# TYPE chatops_plugin_failure_counter counter\n"));
    }
}
