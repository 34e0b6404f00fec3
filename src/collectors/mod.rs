pub mod command;
pub mod system;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("command `{command}` failed: {reason}")]
    Command { command: String, reason: String },
    #[error("could not parse {what} from {raw:?}")]
    Parse { what: &'static str, raw: String },
    #[error("{0} is unavailable on this host")]
    Unavailable(&'static str),
}

/// Blocking access to the host readings the monitor needs.
pub trait MetricSource {
    fn cpu_percent(&mut self) -> Result<f64, CollectError>;
    fn ram_percent(&mut self) -> Result<f64, CollectError>;
    /// `used / total`, e.g. `3.1G / 7.7G`.
    fn ram_human(&mut self) -> Result<String, CollectError>;
    fn disk_percent(&mut self) -> Result<f64, CollectError>;
    fn top_processes(&mut self) -> Result<String, CollectError>;
    fn host_name(&mut self) -> Result<String, CollectError>;
    fn uptime(&mut self) -> Result<String, CollectError>;
    fn core_count(&mut self) -> Result<usize, CollectError>;
}

impl<T: MetricSource + ?Sized> MetricSource for Box<T> {
    fn cpu_percent(&mut self) -> Result<f64, CollectError> {
        (**self).cpu_percent()
    }
    fn ram_percent(&mut self) -> Result<f64, CollectError> {
        (**self).ram_percent()
    }
    fn ram_human(&mut self) -> Result<String, CollectError> {
        (**self).ram_human()
    }
    fn disk_percent(&mut self) -> Result<f64, CollectError> {
        (**self).disk_percent()
    }
    fn top_processes(&mut self) -> Result<String, CollectError> {
        (**self).top_processes()
    }
    fn host_name(&mut self) -> Result<String, CollectError> {
        (**self).host_name()
    }
    fn uptime(&mut self) -> Result<String, CollectError> {
        (**self).uptime()
    }
    fn core_count(&mut self) -> Result<usize, CollectError> {
        (**self).core_count()
    }
}

pub const TOP_PROCESS_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRow {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub mem_percent: f64,
}

pub fn format_process_table(rows: &[ProcessRow]) -> String {
    let mut out = format!("{:>7} {:<16} {:>6} {:>6}", "PID", "COMMAND", "%CPU", "%MEM");
    for row in rows.iter().take(TOP_PROCESS_LIMIT) {
        let name: String = row.name.chars().take(16).collect();
        out.push('\n');
        out.push_str(&format!(
            "{:>7} {:<16} {:>6.1} {:>6.1}",
            row.pid, name, row.cpu_percent, row.mem_percent
        ));
    }
    out
}

pub fn human_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let mins = (secs % 3600) / 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(plural(days, "day"));
    }
    if hours > 0 {
        parts.push(plural(hours, "hour"));
    }
    if mins > 0 || parts.is_empty() {
        parts.push(plural(mins, "minute"));
    }
    format!("up {}", parts.join(", "))
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "K", "M", "G", "T"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}B")
    } else {
        format!("{value:.1}{}", UNITS[unit])
    }
}

pub fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (used as f64 / total as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_table_keeps_header_and_top_rows() {
        let rows: Vec<ProcessRow> = (0..8)
            .map(|i| ProcessRow {
                pid: 100 + i,
                name: format!("worker-{i}"),
                cpu_percent: 80.0 - i as f64,
                mem_percent: 1.5,
            })
            .collect();
        let table = format_process_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 1 + TOP_PROCESS_LIMIT);
        assert!(lines[0].contains("COMMAND"));
        assert!(lines[1].contains("worker-0"));
        assert!(lines[1].contains("80.0"));
        assert!(!table.contains("worker-5"));
    }

    #[test]
    fn uptime_reads_like_uptime_p() {
        assert_eq!(human_uptime(0), "up 0 minutes");
        assert_eq!(human_uptime(61), "up 1 minute");
        assert_eq!(human_uptime(3 * 86_400 + 2 * 3600 + 5 * 60), "up 3 days, 2 hours, 5 minutes");
        assert_eq!(human_uptime(86_400), "up 1 day");
    }

    #[test]
    fn bytes_are_rendered_with_binary_units() {
        assert_eq!(human_bytes(512), "512B");
        assert_eq!(human_bytes(1536), "1.5K");
        assert_eq!(human_bytes(8 * 1024 * 1024 * 1024), "8.0G");
    }

    #[test]
    fn percent_of_zero_total_is_zero() {
        assert_eq!(percent(10, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }
}
