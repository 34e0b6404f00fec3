use crate::config::Thresholds;
use chrono::{DateTime, Local, NaiveDate, Timelike, Utc};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricSample {
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub disk_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreachKind {
    Cpu,
    Ram,
    Disk,
}

impl BreachKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Cpu => "CPU Usage",
            Self::Ram => "RAM Usage",
            Self::Disk => "Disk Usage",
        }
    }

    pub fn metric_name(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Ram => "ram",
            Self::Disk => "disk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breach {
    pub kind: BreachKind,
    pub value_percent: f64,
    pub threshold_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertDecision {
    Clear,
    Suppressed,
    Fire(Vec<Breach>),
}

impl MetricSample {
    /// Every metric at or above its threshold, in CPU, RAM, Disk order.
    pub fn breaches(&self, thresholds: &Thresholds) -> Vec<Breach> {
        [
            (BreachKind::Cpu, self.cpu_percent, thresholds.cpu_percent),
            (BreachKind::Ram, self.ram_percent, thresholds.ram_percent),
            (BreachKind::Disk, self.disk_percent, thresholds.disk_percent),
        ]
        .into_iter()
        .filter(|(_, value, threshold)| value >= threshold)
        .map(|(kind, value_percent, threshold_percent)| Breach {
            kind,
            value_percent,
            threshold_percent,
        })
        .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    last_alert_at: Option<DateTime<Utc>>,
    last_alert_instant: Option<Instant>,
    last_summary_on: Option<NaiveDate>,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_alert_at(&self) -> Option<DateTime<Utc>> {
        self.last_alert_at
    }

    pub fn last_summary_on(&self) -> Option<NaiveDate> {
        self.last_summary_on
    }

    pub fn cooldown_elapsed(&self, instant: Instant, cooldown: Duration) -> bool {
        match self.last_alert_instant {
            Some(last) => instant.saturating_duration_since(last) > cooldown,
            None => true,
        }
    }

    /// Decides whether this sample produces an alert. A `Fire` decision
    /// records the alert time before anything is dispatched.
    pub fn evaluate(
        &mut self,
        sample: &MetricSample,
        thresholds: &Thresholds,
        cooldown: Duration,
        now: DateTime<Utc>,
        instant: Instant,
    ) -> AlertDecision {
        let breaches = sample.breaches(thresholds);
        if breaches.is_empty() {
            return AlertDecision::Clear;
        }
        if !self.cooldown_elapsed(instant, cooldown) {
            return AlertDecision::Suppressed;
        }
        self.last_alert_at = Some(now);
        self.last_alert_instant = Some(instant);
        AlertDecision::Fire(breaches)
    }

    pub fn summary_due(&self, now: DateTime<Local>, summary_hour: u32) -> bool {
        now.hour() == summary_hour
            && now.minute() == 0
            && self.last_summary_on != Some(now.date_naive())
    }

    pub fn record_summary(&mut self, now: DateTime<Local>) {
        self.last_summary_on = Some(now.date_naive());
    }
}
