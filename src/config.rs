use serde::{Serialize, Serializer};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const TOKEN_ENV: &str = "TELEGRAM_TOKEN";
pub const CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";
pub const CPU_THRESHOLD_ENV: &str = "ALERT_CPU";
pub const RAM_THRESHOLD_ENV: &str = "ALERT_RAM";
pub const DISK_THRESHOLD_ENV: &str = "ALERT_DISK";
pub const COOLDOWN_ENV: &str = "ALERT_INTERVAL_MINUTES";
pub const SUMMARY_HOUR_ENV: &str = "SUMMARY_HOUR";
pub const SOURCE_ENV: &str = "MONITOR_SOURCE";
pub const DEBUG_NOTIFY_ENV: &str = "MONITOR_DEBUG_NOTIFY";
pub const METRICS_LISTEN_ENV: &str = "MONITOR_METRICS_LISTEN";

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    #[serde(serialize_with = "redact")]
    pub telegram_token: String,
    pub chat_id: String,
    pub thresholds: Thresholds,
    pub alert_cooldown_minutes: u64,
    pub summary_hour: u32,
    pub source: SourceKind,
    pub debug_notify: bool,
    pub metrics_listen: Option<SocketAddr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub disk_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Sysinfo,
    Command,
}

impl FromStr for SourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sysinfo" => Ok(Self::Sysinfo),
            "command" | "shell" => Ok(Self::Command),
            _ => Err(()),
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_percent: DEFAULT_THRESHOLD_PERCENT,
            ram_percent: DEFAULT_THRESHOLD_PERCENT,
            disk_percent: DEFAULT_THRESHOLD_PERCENT,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing TELEGRAM_TOKEN: set the Telegram bot token in the environment")]
    MissingToken,
    #[error("missing TELEGRAM_CHAT_ID: set the destination chat id in the environment")]
    MissingChatId,
}

const DEFAULT_THRESHOLD_PERCENT: f64 = 50.0;
const DEFAULT_COOLDOWN_MINUTES: u64 = 15;
const DEFAULT_SUMMARY_HOUR: u32 = 9;

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_token = required(&lookup, TOKEN_ENV).ok_or(ConfigError::MissingToken)?;
        let chat_id = required(&lookup, CHAT_ID_ENV).ok_or(ConfigError::MissingChatId)?;

        let thresholds = Thresholds {
            cpu_percent: percent_or_default(&lookup, CPU_THRESHOLD_ENV),
            ram_percent: percent_or_default(&lookup, RAM_THRESHOLD_ENV),
            disk_percent: percent_or_default(&lookup, DISK_THRESHOLD_ENV),
        };

        let alert_cooldown_minutes =
            parsed_or(&lookup, COOLDOWN_ENV).unwrap_or(DEFAULT_COOLDOWN_MINUTES);

        let summary_hour = parsed_or::<u32, _>(&lookup, SUMMARY_HOUR_ENV)
            .filter(|h| *h < 24)
            .unwrap_or(DEFAULT_SUMMARY_HOUR);

        let source = parsed_or(&lookup, SOURCE_ENV).unwrap_or_default();
        let debug_notify = lookup(DEBUG_NOTIFY_ENV)
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        let metrics_listen = parsed_or(&lookup, METRICS_LISTEN_ENV);

        Ok(Self {
            telegram_token,
            chat_id,
            thresholds,
            alert_cooldown_minutes,
            summary_hour,
            source,
            debug_notify,
            metrics_listen,
        })
    }

    pub fn alert_cooldown(&self) -> Duration {
        Duration::from_secs(self.alert_cooldown_minutes.saturating_mul(60))
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn example_env() -> &'static str {
        include_str!("../monitor.env.example")
    }
}

fn required<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed_or<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse::<T>().ok())
}

fn percent_or_default<F>(lookup: &F, key: &str) -> f64
where
    F: Fn(&str) -> Option<String>,
{
    parsed_or::<f64, _>(lookup, key)
        .filter(|v| v.is_finite())
        .unwrap_or(DEFAULT_THRESHOLD_PERCENT)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn redact<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_empty() {
        serializer.serialize_str("")
    } else {
        serializer.serialize_str("<redacted>")
    }
}
