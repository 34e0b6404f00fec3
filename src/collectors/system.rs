use crate::collectors::{
    format_process_table, human_bytes, human_uptime, percent, CollectError, MetricSource,
    ProcessRow,
};
use std::path::Path;
use sysinfo::{CpuExt, DiskExt, PidExt, ProcessExt, System, SystemExt};
use tracing::debug;

pub struct SysinfoSource {
    system: System,
}

impl SysinfoSource {
    pub fn new() -> Self {
        let mut system = System::new_all();
        system.refresh_cpu();
        Self { system }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for SysinfoSource {
    fn cpu_percent(&mut self) -> Result<f64, CollectError> {
        self.system.refresh_cpu();
        if self.system.cpus().is_empty() {
            return Err(CollectError::Unavailable("cpu usage"));
        }
        Ok(self.system.global_cpu_info().cpu_usage() as f64)
    }

    fn ram_percent(&mut self) -> Result<f64, CollectError> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(CollectError::Unavailable("memory"));
        }
        Ok(percent(self.system.used_memory(), total))
    }

    fn ram_human(&mut self) -> Result<String, CollectError> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(CollectError::Unavailable("memory"));
        }
        Ok(format!(
            "{} / {}",
            human_bytes(self.system.used_memory()),
            human_bytes(total)
        ))
    }

    fn disk_percent(&mut self) -> Result<f64, CollectError> {
        self.system.refresh_disks_list();
        self.system.refresh_disks();

        let usage: Vec<(&Path, f64)> = self
            .system
            .disks()
            .iter()
            .map(|d| {
                let total = d.total_space();
                let used = total.saturating_sub(d.available_space());
                (d.mount_point(), percent(used, total))
            })
            .collect();

        if let Some((_, pct)) = usage.iter().find(|(mount, _)| *mount == Path::new("/")) {
            return Ok(*pct);
        }
        let fullest = usage
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or(CollectError::Unavailable("disk usage"))?;
        debug!(mount = %fullest.0.display(), "no root filesystem, using the fullest disk");
        Ok(fullest.1)
    }

    fn top_processes(&mut self) -> Result<String, CollectError> {
        self.system.refresh_memory();
        self.system.refresh_processes();
        let total_memory = self.system.total_memory();

        let mut rows: Vec<ProcessRow> = self
            .system
            .processes()
            .values()
            .map(|p| ProcessRow {
                pid: p.pid().as_u32(),
                name: p.name().to_string(),
                cpu_percent: p.cpu_usage() as f64,
                mem_percent: percent(p.memory(), total_memory),
            })
            .collect();
        if rows.is_empty() {
            return Err(CollectError::Unavailable("process list"));
        }
        rows.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
        Ok(format_process_table(&rows))
    }

    fn host_name(&mut self) -> Result<String, CollectError> {
        self.system
            .host_name()
            .filter(|h| !h.trim().is_empty())
            .ok_or(CollectError::Unavailable("host name"))
    }

    fn uptime(&mut self) -> Result<String, CollectError> {
        Ok(human_uptime(self.system.uptime()))
    }

    fn core_count(&mut self) -> Result<usize, CollectError> {
        match self.system.cpus().len() {
            0 => Err(CollectError::Unavailable("cpu cores")),
            n => Ok(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_stay_within_percent_range() {
        let mut source = SysinfoSource::new();
        for reading in [
            source.cpu_percent(),
            source.ram_percent(),
            source.disk_percent(),
        ]
        .into_iter()
        .flatten()
        {
            assert!((0.0..=100.0).contains(&reading), "reading {reading}");
        }
    }

    #[test]
    fn top_processes_has_header() {
        let mut source = SysinfoSource::new();
        if let Ok(table) = source.top_processes() {
            assert!(table.starts_with(&format!("{:>7}", "PID")));
        }
    }
}
