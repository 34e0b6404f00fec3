use crate::state::MetricSample;
use chrono::{DateTime, Utc};
use prometheus::core::Collector;
use prometheus::{opts, Counter, CounterVec, Encoder, Gauge, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub monitor_cpu_usage_percent: Gauge,
    pub monitor_ram_usage_percent: Gauge,
    pub monitor_disk_usage_percent: Gauge,
    pub monitor_last_tick_timestamp_seconds: Gauge,
    pub monitor_last_alert_timestamp_seconds: Gauge,
    pub monitor_started_timestamp_seconds: Gauge,
    pub monitor_ticks_total: Counter,
    pub monitor_alerts_suppressed_total: Counter,
    pub monitor_notifications_sent_total: CounterVec,
    pub monitor_dispatch_errors_total: CounterVec,
    pub monitor_collect_errors_total: CounterVec,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let monitor_cpu_usage_percent = Gauge::with_opts(opts!(
            "monitor_cpu_usage_percent",
            "CPU usage from the latest sample"
        ))?;
        let monitor_ram_usage_percent = Gauge::with_opts(opts!(
            "monitor_ram_usage_percent",
            "RAM usage from the latest sample"
        ))?;
        let monitor_disk_usage_percent = Gauge::with_opts(opts!(
            "monitor_disk_usage_percent",
            "Root filesystem usage from the latest sample"
        ))?;
        let monitor_last_tick_timestamp_seconds = Gauge::with_opts(opts!(
            "monitor_last_tick_timestamp_seconds",
            "Unix time of the latest completed tick"
        ))?;
        let monitor_last_alert_timestamp_seconds = Gauge::with_opts(opts!(
            "monitor_last_alert_timestamp_seconds",
            "Unix time of the latest dispatched resource alert, 0 if none"
        ))?;
        let monitor_started_timestamp_seconds = Gauge::with_opts(opts!(
            "monitor_started_timestamp_seconds",
            "Unix time at which the monitor started"
        ))?;
        let monitor_ticks_total =
            Counter::with_opts(opts!("monitor_ticks_total", "Completed monitor ticks"))?;
        let monitor_alerts_suppressed_total = Counter::with_opts(opts!(
            "monitor_alerts_suppressed_total",
            "Breaching samples swallowed by the alert cooldown"
        ))?;
        let monitor_notifications_sent_total = CounterVec::new(
            opts!(
                "monitor_notifications_sent_total",
                "Notifications delivered, by kind"
            ),
            &["kind"],
        )?;
        let monitor_dispatch_errors_total = CounterVec::new(
            opts!(
                "monitor_dispatch_errors_total",
                "Notifications that failed to deliver, by kind"
            ),
            &["kind"],
        )?;
        let monitor_collect_errors_total = CounterVec::new(
            opts!(
                "monitor_collect_errors_total",
                "Failed metric readings replaced with a neutral value, by reading"
            ),
            &["reading"],
        )?;

        register(&registry, &monitor_cpu_usage_percent)?;
        register(&registry, &monitor_ram_usage_percent)?;
        register(&registry, &monitor_disk_usage_percent)?;
        register(&registry, &monitor_last_tick_timestamp_seconds)?;
        register(&registry, &monitor_last_alert_timestamp_seconds)?;
        register(&registry, &monitor_started_timestamp_seconds)?;
        register(&registry, &monitor_ticks_total)?;
        register(&registry, &monitor_alerts_suppressed_total)?;
        register(&registry, &monitor_notifications_sent_total)?;
        register(&registry, &monitor_dispatch_errors_total)?;
        register(&registry, &monitor_collect_errors_total)?;

        Ok(Arc::new(Self {
            registry,
            monitor_cpu_usage_percent,
            monitor_ram_usage_percent,
            monitor_disk_usage_percent,
            monitor_last_tick_timestamp_seconds,
            monitor_last_alert_timestamp_seconds,
            monitor_started_timestamp_seconds,
            monitor_ticks_total,
            monitor_alerts_suppressed_total,
            monitor_notifications_sent_total,
            monitor_dispatch_errors_total,
            monitor_collect_errors_total,
        }))
    }

    pub fn set_started(&self, at: DateTime<Utc>) {
        self.monitor_started_timestamp_seconds
            .set(at.timestamp() as f64);
    }

    pub fn record_tick(&self, sample: &MetricSample, at: DateTime<Utc>) {
        self.monitor_cpu_usage_percent.set(sample.cpu_percent);
        self.monitor_ram_usage_percent.set(sample.ram_percent);
        self.monitor_disk_usage_percent.set(sample.disk_percent);
        self.monitor_last_tick_timestamp_seconds
            .set(at.timestamp() as f64);
        self.monitor_ticks_total.inc();
    }

    pub fn record_alert(&self, at: DateTime<Utc>) {
        self.monitor_last_alert_timestamp_seconds
            .set(at.timestamp() as f64);
    }

    pub fn inc_suppressed(&self) {
        self.monitor_alerts_suppressed_total.inc();
    }

    pub fn inc_sent(&self, kind: &str) {
        self.monitor_notifications_sent_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn inc_dispatch_error(&self, kind: &str) {
        self.monitor_dispatch_errors_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn inc_collect_error(&self, reading: &str) {
        self.monitor_collect_errors_total
            .with_label_values(&[reading])
            .inc();
    }

    pub fn encode_metrics(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        encoder.encode(&mf, &mut buf)?;
        Ok(buf)
    }
}

fn register<T: Collector + Clone + 'static>(
    registry: &Registry,
    collector: &T,
) -> Result<(), prometheus::Error> {
    registry.register(Box::new(collector.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn text(metrics: &Metrics) -> String {
        String::from_utf8(metrics.encode_metrics().unwrap()).unwrap()
    }

    #[test]
    fn tick_updates_gauges_and_counter() {
        let metrics = Metrics::new().unwrap();
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        metrics.record_tick(
            &MetricSample {
                cpu_percent: 55.0,
                ram_percent: 30.0,
                disk_percent: 10.0,
            },
            at,
        );
        assert_eq!(metrics.monitor_cpu_usage_percent.get(), 55.0);
        assert_eq!(metrics.monitor_ticks_total.get(), 1.0);
        assert_eq!(
            metrics.monitor_last_tick_timestamp_seconds.get(),
            at.timestamp() as f64
        );
    }

    #[test]
    fn labelled_counters_are_exported() {
        let metrics = Metrics::new().unwrap();
        metrics.inc_sent("alert");
        metrics.inc_dispatch_error("summary");
        metrics.inc_collect_error("cpu");
        let out = text(&metrics);
        assert!(out.contains("monitor_notifications_sent_total{kind=\"alert\"} 1"));
        assert!(out.contains("monitor_dispatch_errors_total{kind=\"summary\"} 1"));
        assert!(out.contains("monitor_collect_errors_total{reading=\"cpu\"} 1"));
    }
}
