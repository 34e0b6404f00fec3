use crate::collectors::{CollectError, MetricSource};
use crate::config::{Config, Thresholds};
use crate::metrics::Metrics;
use crate::report::{self, DailySummary};
use crate::state::{AlertDecision, MetricSample, MonitorState};
use crate::telegram::Notifier;
use chrono::{DateTime, Local, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const TICK_INTERVAL: Duration = Duration::from_secs(30);
pub const SUMMARY_GUARD: Duration = Duration::from_secs(61);

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
    fn instant(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub thresholds: Thresholds,
    pub cooldown: Duration,
    pub summary_hour: u32,
    pub debug_notify: bool,
}

impl From<&Config> for MonitorSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            thresholds: cfg.thresholds,
            cooldown: cfg.alert_cooldown(),
            summary_hour: cfg.summary_hour,
            debug_notify: cfg.debug_notify,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub sample: MetricSample,
    pub alert: AlertDecision,
    pub summary_sent: bool,
}

pub struct Monitor<S, N, C = SystemClock> {
    source: S,
    notifier: N,
    clock: C,
    settings: MonitorSettings,
    state: MonitorState,
    metrics: Arc<Metrics>,
}

impl<S, N, C> Monitor<S, N, C>
where
    S: MetricSource,
    N: Notifier,
    C: Clock,
{
    pub fn new(
        source: S,
        notifier: N,
        clock: C,
        settings: MonitorSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            source,
            notifier,
            clock,
            settings,
            state: MonitorState::new(),
            metrics,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Sends the one-time startup notification, plus the debug message
    /// when enabled.
    pub async fn announce_start(&mut self) {
        let now = self.clock.now().with_timezone(&Utc);
        self.metrics.set_started(now);

        let host = degrade(&self.metrics, "host_name", self.source.host_name());
        self.dispatch("started", &report::started(&host)).await;

        if self.settings.debug_notify {
            let ram = degrade(&self.metrics, "ram_human", self.source.ram_human());
            let cores = degrade(&self.metrics, "core_count", self.source.core_count());
            self.dispatch("debug", &report::debug_info(&host, &ram, cores))
                .await;
        }
    }

    pub async fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        let now_utc = now.with_timezone(&Utc);

        let sample = self.sample();
        self.metrics.record_tick(&sample, now_utc);

        let alert = self.state.evaluate(
            &sample,
            &self.settings.thresholds,
            self.settings.cooldown,
            now_utc,
            self.clock.instant(),
        );
        match &alert {
            AlertDecision::Fire(breaches) => {
                info!(
                    breached = ?breaches.iter().map(|b| b.kind.metric_name()).collect::<Vec<_>>(),
                    cpu = sample.cpu_percent,
                    ram = sample.ram_percent,
                    disk = sample.disk_percent,
                    "thresholds exceeded, sending alert"
                );
                self.metrics.record_alert(now_utc);
                let host = degrade(&self.metrics, "host_name", self.source.host_name());
                let top = degrade(&self.metrics, "top_processes", self.source.top_processes());
                let text = report::resource_alert(&host, now_utc, breaches, &top);
                self.dispatch("alert", &text).await;
            }
            AlertDecision::Suppressed => {
                debug!(
                    cpu = sample.cpu_percent,
                    ram = sample.ram_percent,
                    disk = sample.disk_percent,
                    "thresholds exceeded inside cooldown, alert suppressed"
                );
                self.metrics.inc_suppressed();
            }
            AlertDecision::Clear => {}
        }

        let summary_sent = if self.state.summary_due(now, self.settings.summary_hour) {
            self.state.record_summary(now);
            self.send_summary(sample, now_utc).await;
            true
        } else {
            false
        };

        TickReport {
            sample,
            alert,
            summary_sent,
        }
    }

    /// Runs ticks every [`TICK_INTERVAL`] until `shutdown` flips or its
    /// sender is dropped. The first tick runs immediately.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = TICK_INTERVAL.as_secs(),
            cooldown = %humantime::format_duration(self.settings.cooldown),
            summary_hour = self.settings.summary_hour,
            "monitor loop started"
        );

        if *shutdown.borrow() {
            return;
        }

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("shutdown signal received, stopping monitor loop");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.tick().await;
                    if report.summary_sent {
                        tokio::select! {
                            _ = shutdown.changed() => {
                                info!("shutdown signal received, stopping monitor loop");
                                break;
                            }
                            _ = tokio::time::sleep(SUMMARY_GUARD) => {}
                        }
                    }
                }
            }
        }
    }

    fn sample(&mut self) -> MetricSample {
        MetricSample {
            cpu_percent: degrade(&self.metrics, "cpu", self.source.cpu_percent()),
            ram_percent: degrade(&self.metrics, "ram", self.source.ram_percent()),
            disk_percent: degrade(&self.metrics, "disk", self.source.disk_percent()),
        }
    }

    async fn send_summary(&mut self, sample: MetricSample, now: DateTime<Utc>) {
        let summary = DailySummary {
            host: degrade(&self.metrics, "host_name", self.source.host_name()),
            uptime: degrade(&self.metrics, "uptime", self.source.uptime()),
            cores: degrade(&self.metrics, "core_count", self.source.core_count()),
            sample,
            ram_human: degrade(&self.metrics, "ram_human", self.source.ram_human()),
            top_processes: degrade(&self.metrics, "top_processes", self.source.top_processes()),
        };
        info!(host = %summary.host, "sending daily summary");
        self.dispatch("summary", &report::daily_summary(&summary, now))
            .await;
    }

    async fn dispatch(&self, kind: &'static str, text: &str) {
        match self.notifier.send(text).await {
            Ok(()) => self.metrics.inc_sent(kind),
            Err(err) => {
                warn!(kind, error = %err, "notification was not delivered");
                self.metrics.inc_dispatch_error(kind);
            }
        }
    }
}

fn degrade<T: Default>(
    metrics: &Metrics,
    reading: &'static str,
    result: Result<T, CollectError>,
) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            debug!(reading, error = %err, "reading failed, using neutral value");
            metrics.inc_collect_error(reading);
            T::default()
        }
    }
}
