//! Atomic-counter server metrics (C11, ambient), exposed as JSON at `GET /metrics`
//! and as Prometheus exposition text at `GET /metrics/prom`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, delta: u64) {
        self.0.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct Metrics {
    pub rooms_created: Counter,
    pub rooms_active: Counter,
    pub messages_sent: Counter,
    pub answers_submitted: Counter,
    pub timer_ticks: Counter,
    pub provider_fallbacks: Counter,
    pub provider_successes: Counter,
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub rooms_created: u64,
    pub rooms_active: u64,
    pub messages_sent: u64,
    pub answers_submitted: u64,
    pub timer_ticks: u64,
    pub provider_fallbacks: u64,
    pub provider_successes: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rooms_created: self.rooms_created.get(),
            rooms_active: self.rooms_active.get(),
            messages_sent: self.messages_sent.get(),
            answers_submitted: self.answers_submitted.get(),
            timer_ticks: self.timer_ticks.get(),
            provider_fallbacks: self.provider_fallbacks.get(),
            provider_successes: self.provider_successes.get(),
        }
    }

    /// Renders the Prometheus text exposition format (one gauge per counter).
    pub fn render_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut out = String::new();
        let line = |out: &mut String, name: &str, help: &str, value: u64| {
            out.push_str(&format!("# HELP {name} {help}\n"));
            out.push_str(&format!("# TYPE {name} counter\n"));
            out.push_str(&format!("{name} {value}\n"));
        };
        line(&mut out, "trivia_rooms_created_total", "Total rooms created", snapshot.rooms_created);
        line(&mut out, "trivia_rooms_active", "Rooms currently in the ACTIVE state", snapshot.rooms_active);
        line(&mut out, "trivia_messages_sent_total", "Total broadcast events dispatched", snapshot.messages_sent);
        line(&mut out, "trivia_answers_submitted_total", "Total answers submitted", snapshot.answers_submitted);
        line(&mut out, "trivia_timer_ticks_total", "Total per-second timer ticks", snapshot.timer_ticks);
        line(&mut out, "trivia_provider_fallbacks_total", "Question provider calls that fell back to the static bank", snapshot.provider_fallbacks);
        line(&mut out, "trivia_provider_successes_total", "Question provider calls that succeeded upstream", snapshot.provider_successes);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let metrics = Arc::new(Metrics::new());
        let workers = 32;
        let per_worker = 100;
        let barrier = Arc::new(Barrier::new(workers));

        let mut handles = Vec::new();
        for _ in 0..workers {
            let metrics = Arc::clone(&metrics);
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                for _ in 0..per_worker {
                    metrics.messages_sent.increment();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(metrics.messages_sent.get(), (workers * per_worker) as u64);
    }

    #[test]
    fn prometheus_output_contains_all_counters() {
        let metrics = Metrics::new();
        metrics.rooms_created.increment();
        let rendered = metrics.render_prometheus();
        assert!(rendered.contains("trivia_rooms_created_total 1"));
        assert!(rendered.contains("trivia_provider_successes_total 0"));
    }
}
