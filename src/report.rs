use crate::state::{Breach, MetricSample};
use chrono::{DateTime, Utc};
use teloxide::utils::html::{bold, code_block, code_inline, escape};

#[derive(Debug, Clone, Default)]
pub struct DailySummary {
    pub host: String,
    pub uptime: String,
    pub cores: usize,
    pub sample: MetricSample,
    pub ram_human: String,
    pub top_processes: String,
}

pub fn started(host: &str) -> String {
    format!(
        "✅ {}\n🖥 Host: {}",
        bold("Server monitor started"),
        code_inline(host)
    )
}

pub fn debug_info(host: &str, ram_human: &str, cores: usize) -> String {
    format!(
        "🧪 {}\n\nHostname: {}\nRAM: {}\nCPU Cores: {}",
        bold("Debug Information"),
        code_inline(host),
        code_inline(ram_human),
        code_inline(&cores.to_string())
    )
}

pub fn resource_alert(
    host: &str,
    at: DateTime<Utc>,
    breaches: &[Breach],
    top_processes: &str,
) -> String {
    let lines = breaches
        .iter()
        .map(|b| {
            format!(
                "• {}: {:.1}% (threshold {:.1}%)",
                b.kind.label(),
                b.value_percent,
                b.threshold_percent
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "🚨 {}\n\n🖥 {} {}\n⏰ {} {}\n\n⚠️ {}\n{}\n\n🔥 {}\n{}",
        bold("Server Resource Alert"),
        bold("Host:"),
        code_inline(host),
        bold("Time:"),
        format_time(at),
        bold("Thresholds exceeded:"),
        lines,
        bold("Top Processes:"),
        process_block(top_processes)
    )
}

pub fn daily_summary(summary: &DailySummary, at: DateTime<Utc>) -> String {
    format!(
        "📊 {}\n\n🖥 {} {}\n⏰ {} {}\n⏱ {} {}\n🧠 {} {}\n\n📈 {}\n• CPU: {:.1}%\n• RAM: {:.1}% ({})\n• Disk: {:.1}%\n\n🔥 {}\n{}",
        bold("Daily Server Summary"),
        bold("Host:"),
        code_inline(&summary.host),
        bold("Time:"),
        format_time(at),
        bold("Uptime:"),
        escape(or_na(&summary.uptime)),
        bold("CPU Cores:"),
        summary.cores,
        bold("Current Usage:"),
        summary.sample.cpu_percent,
        summary.sample.ram_percent,
        escape(or_na(&summary.ram_human)),
        summary.sample.disk_percent,
        bold("Top Processes:"),
        process_block(&summary.top_processes)
    )
}

pub fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn process_block(top_processes: &str) -> String {
    code_block(or_na(top_processes))
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        "n/a"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::BreachKind;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 12).unwrap()
    }

    #[test]
    fn alert_lists_only_given_breaches() {
        let breaches = [Breach {
            kind: BreachKind::Cpu,
            value_percent: 55.0,
            threshold_percent: 50.0,
        }];
        let text = resource_alert("web-1", at(), &breaches, "PID COMMAND");
        assert!(text.contains("CPU Usage: 55.0% (threshold 50.0%)"));
        assert!(!text.contains("RAM Usage"));
        assert!(!text.contains("Disk Usage"));
        assert!(text.contains("<code>web-1</code>"));
        assert!(text.contains("2026-10-18 09:00 UTC"));
    }

    #[test]
    fn collaborator_text_is_escaped() {
        let text = resource_alert("a<b>", at(), &[], "1 cc1plus <defunct>");
        assert!(!text.contains("<defunct>"));
        assert!(text.contains("&lt;defunct&gt;"));
        assert!(!text.contains("a<b>"));
    }

    #[test]
    fn summary_shows_readings_and_placeholders() {
        let summary = DailySummary {
            host: "web-1".to_string(),
            uptime: String::new(),
            cores: 8,
            sample: MetricSample {
                cpu_percent: 12.34,
                ram_percent: 40.0,
                disk_percent: 71.5,
            },
            ram_human: "3.1G / 7.7G".to_string(),
            top_processes: String::new(),
        };
        let text = daily_summary(&summary, at());
        assert!(text.contains("Daily Server Summary"));
        assert!(text.contains("• CPU: 12.3%"));
        assert!(text.contains("• RAM: 40.0% (3.1G / 7.7G)"));
        assert!(text.contains("• Disk: 71.5%"));
        assert!(text.contains("CPU Cores:</b> 8"));
        assert!(text.contains("n/a"));
    }

    #[test]
    fn started_mentions_host() {
        assert!(started("db-2").contains("<code>db-2</code>"));
        assert!(debug_info("db-2", "1.0G / 2.0G", 4).contains("<code>4</code>"));
    }
}
