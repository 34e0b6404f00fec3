use crate::collectors::{CollectError, MetricSource};
use std::process::Command;

const CPU_SCRIPT: &str = "top -bn1 | awk '/Cpu/ {print 100 - $8}'";
const RAM_SCRIPT: &str = "free | awk '/Mem:/ {print $3/$2*100}'";
const RAM_HUMAN_SCRIPT: &str = "free -h | awk '/Mem:/ {print $3 \" / \" $2}'";
const DISK_SCRIPT: &str = "df / | tail -1 | awk '{print $5}' | tr -d '%'";
const TOP_SCRIPT: &str = "ps -eo pid,comm,%cpu,%mem --sort=-%cpu | head -6";
const HOSTNAME_SCRIPT: &str = "hostname";
const UPTIME_SCRIPT: &str = "uptime -p";
const NPROC_SCRIPT: &str = "nproc";

type Runner = Box<dyn Fn(&str) -> Result<String, CollectError> + Send>;

/// Samples the host by piping standard Linux utilities through `bash -c`.
pub struct CommandSource {
    runner: Runner,
}

impl CommandSource {
    pub fn new() -> Self {
        Self::with_runner(run_bash)
    }

    pub fn with_runner<F>(runner: F) -> Self
    where
        F: Fn(&str) -> Result<String, CollectError> + Send + 'static,
    {
        Self {
            runner: Box::new(runner),
        }
    }

    fn text(&self, script: &str, what: &'static str) -> Result<String, CollectError> {
        let out = (self.runner)(script)?;
        if out.is_empty() {
            return Err(CollectError::Parse { what, raw: out });
        }
        Ok(out)
    }

    fn number(&self, script: &str, what: &'static str) -> Result<f64, CollectError> {
        let out = (self.runner)(script)?;
        parse_number(what, &out)
    }
}

impl Default for CommandSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for CommandSource {
    fn cpu_percent(&mut self) -> Result<f64, CollectError> {
        self.number(CPU_SCRIPT, "cpu usage")
    }

    fn ram_percent(&mut self) -> Result<f64, CollectError> {
        self.number(RAM_SCRIPT, "ram usage")
    }

    fn ram_human(&mut self) -> Result<String, CollectError> {
        self.text(RAM_HUMAN_SCRIPT, "ram summary")
    }

    fn disk_percent(&mut self) -> Result<f64, CollectError> {
        self.number(DISK_SCRIPT, "disk usage")
    }

    fn top_processes(&mut self) -> Result<String, CollectError> {
        self.text(TOP_SCRIPT, "process list")
    }

    fn host_name(&mut self) -> Result<String, CollectError> {
        self.text(HOSTNAME_SCRIPT, "host name")
    }

    fn uptime(&mut self) -> Result<String, CollectError> {
        self.text(UPTIME_SCRIPT, "uptime")
    }

    fn core_count(&mut self) -> Result<usize, CollectError> {
        let out = self.text(NPROC_SCRIPT, "core count")?;
        out.parse::<usize>().map_err(|_| CollectError::Parse {
            what: "core count",
            raw: out,
        })
    }
}

fn run_bash(script: &str) -> Result<String, CollectError> {
    let output = Command::new("bash")
        .arg("-c")
        .arg(script)
        .output()
        .map_err(|err| CollectError::Command {
            command: script.to_string(),
            reason: err.to_string(),
        })?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Parses the first numeric token of a command's output, accepting a
/// comma decimal separator.
pub fn parse_number(what: &'static str, raw: &str) -> Result<f64, CollectError> {
    let parse_err = || CollectError::Parse {
        what,
        raw: raw.to_string(),
    };
    let token = raw.split_whitespace().next().ok_or_else(parse_err)?;
    let value = token
        .parse::<f64>()
        .or_else(|_| token.replace(',', ".").parse::<f64>())
        .map_err(|_| parse_err())?;
    if !value.is_finite() {
        return Err(parse_err());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_returning(output: &'static str) -> CommandSource {
        CommandSource::with_runner(move |_| Ok(output.to_string()))
    }

    #[test]
    fn parses_plain_and_comma_decimals() {
        assert_eq!(parse_number("cpu", "12.5").unwrap(), 12.5);
        assert_eq!(parse_number("cpu", " 7,25\n").unwrap(), 7.25);
        assert_eq!(parse_number("disk", "42 extra").unwrap(), 42.0);
    }

    #[test]
    fn malformed_output_is_a_parse_error() {
        for raw in ["", "   ", "n/a", "NaN", "inf"] {
            let err = parse_number("cpu", raw).unwrap_err();
            assert!(matches!(err, CollectError::Parse { .. }), "{raw:?}");
        }
    }

    #[test]
    fn numeric_readings_use_runner_output() {
        let mut source = source_returning("63.2");
        assert_eq!(source.cpu_percent().unwrap(), 63.2);
        assert_eq!(source.ram_percent().unwrap(), 63.2);
        assert_eq!(source.disk_percent().unwrap(), 63.2);
    }

    #[test]
    fn empty_output_fails_every_reading() {
        let mut source = source_returning("");
        assert!(source.cpu_percent().is_err());
        assert!(source.ram_human().is_err());
        assert!(source.host_name().is_err());
        assert!(source.core_count().is_err());
    }

    #[test]
    fn runner_errors_propagate() {
        let mut source = CommandSource::with_runner(|script| {
            Err(CollectError::Command {
                command: script.to_string(),
                reason: "not found".to_string(),
            })
        });
        assert!(matches!(
            source.uptime(),
            Err(CollectError::Command { .. })
        ));
    }

    #[test]
    fn core_count_parses_nproc() {
        let mut source = source_returning("8");
        assert_eq!(source.core_count().unwrap(), 8);
    }
}
