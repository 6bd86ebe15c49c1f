//! Run configuration
//!
//! Values come from a TOML file and can be overridden from the command line.

use serde::Deserialize;
use shared::AlertRules;
use shared::logging::LogSettings;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HarnessError, HarnessResult};

/// Placeholder substituted with the zero-based launch sequence number
pub const SEQ_PLACEHOLDER: &str = "${seq}";

pub const DEFAULT_CONFIG_FILE: &str = "stress-tester.toml";
pub const DEFAULT_PORT: u16 = 9999;
pub const DEFAULT_SPAWN_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_STARTUP_GRACE_MS: u64 = 500;
pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_OUTPUT_TAIL_CHARS: usize = 1000;

/// Worker command line with a `${seq}` placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate(String);

impl CommandTemplate {
    pub fn new(template: impl Into<String>) -> HarnessResult<Self> {
        let template = template.into();
        if template.split_whitespace().next().is_none() {
            return Err(HarnessError::config("stream.command cannot be empty"));
        }
        Ok(Self(template))
    }

    pub fn render(&self, seq: u64) -> String {
        self.0.replace(SEQ_PLACEHOLDER, &seq.to_string())
    }

    pub fn has_placeholder(&self) -> bool {
        self.0.contains(SEQ_PLACEHOLDER)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    stream: StreamSection,
    #[serde(default)]
    monitor: MonitorSection,
    alerts: Option<AlertsSection>,
    #[serde(default)]
    logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    alert_callback_server_port: Option<u16>,
    bind_address: Option<IpAddr>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamSection {
    execution_interval_secs: Option<u64>,
    command: Option<String>,
    startup_grace_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MonitorSection {
    interval_secs: Option<u64>,
    output_tail_chars: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct AlertsSection {
    #[serde(default = "default_alert_categories")]
    categories: Vec<String>,
    codes: Vec<String>,
}

fn default_alert_categories() -> Vec<String> {
    AlertRules::default().categories.into_iter().collect()
}

#[derive(Debug, Default, Deserialize)]
struct LoggingSection {
    file: Option<PathBuf>,
    level: Option<String>,
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub interval_secs: Option<u64>,
    pub command: Option<String>,
    pub log_file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub report: Option<PathBuf>,
}

/// Fully resolved run configuration
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub bind_addr: SocketAddr,
    pub command: CommandTemplate,
    pub spawn_interval: Duration,
    pub startup_grace: Duration,
    pub monitor_interval: Duration,
    pub output_tail_chars: usize,
    pub alert_rules: AlertRules,
    pub log: LogSettings,
    pub report_path: Option<PathBuf>,
}

impl HarnessConfig {
    /// Build a config with defaults around a command template
    pub fn new(command: CommandTemplate) -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            command,
            spawn_interval: Duration::from_secs(DEFAULT_SPAWN_INTERVAL_SECS),
            startup_grace: Duration::from_millis(DEFAULT_STARTUP_GRACE_MS),
            monitor_interval: Duration::from_secs(DEFAULT_MONITOR_INTERVAL_SECS),
            output_tail_chars: DEFAULT_OUTPUT_TAIL_CHARS,
            alert_rules: AlertRules::default(),
            log: LogSettings::default(),
            report_path: None,
        }
    }

    /// Load from `path` (if given, it must exist) or the default file when present
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> HarnessResult<Self> {
        let file = match path {
            Some(path) => Some(std::fs::read_to_string(path)?),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Some(std::fs::read_to_string(default)?)
                } else {
                    None
                }
            }
        };

        let parsed = match file {
            Some(contents) => toml::from_str::<FileConfig>(&contents)?,
            None => FileConfig::default(),
        };

        Self::resolve(parsed, overrides)
    }

    /// Parse TOML text and apply overrides
    pub fn from_toml_str(contents: &str, overrides: ConfigOverrides) -> HarnessResult<Self> {
        Self::resolve(toml::from_str(contents)?, overrides)
    }

    fn resolve(file: FileConfig, overrides: ConfigOverrides) -> HarnessResult<Self> {
        let command = overrides
            .command
            .or(file.stream.command)
            .ok_or_else(|| HarnessError::config("stream.command is required"))?;

        let mut config = Self::new(CommandTemplate::new(command)?);

        let port = overrides
            .port
            .or(file.server.alert_callback_server_port)
            .unwrap_or(DEFAULT_PORT);
        let ip = file
            .server
            .bind_address
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        config.bind_addr = SocketAddr::new(ip, port);

        let interval = overrides
            .interval_secs
            .or(file.stream.execution_interval_secs)
            .unwrap_or(DEFAULT_SPAWN_INTERVAL_SECS);
        if interval == 0 {
            return Err(HarnessError::config("stream.execution_interval_secs must be greater than 0"));
        }
        config.spawn_interval = Duration::from_secs(interval);

        if let Some(grace) = file.stream.startup_grace_ms {
            config.startup_grace = Duration::from_millis(grace);
        }

        let monitor_interval = file
            .monitor
            .interval_secs
            .unwrap_or(DEFAULT_MONITOR_INTERVAL_SECS);
        if monitor_interval == 0 {
            return Err(HarnessError::config("monitor.interval_secs must be greater than 0"));
        }
        config.monitor_interval = Duration::from_secs(monitor_interval);

        if let Some(chars) = file.monitor.output_tail_chars {
            config.output_tail_chars = chars;
        }

        if let Some(alerts) = file.alerts {
            if alerts.codes.is_empty() {
                return Err(HarnessError::config("alerts.codes cannot be empty"));
            }
            config.alert_rules = AlertRules::new(alerts.categories, alerts.codes);
        }

        if let Some(log_file) = overrides.log_file.or(file.logging.file) {
            config.log.file = Some(log_file);
        }
        if let Some(level) = overrides.log_level.or(file.logging.level) {
            shared::logging::validate_level(&level)?;
            config.log.level = level;
        }

        config.report_path = overrides.report;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [server]
        alert_callback_server_port = 8088

        [stream]
        execution_interval_secs = 3
        command = "ffmpeg -re -i input.mp4 -f flv rtmp://localhost/app/stream${seq}"
    "#;

    #[test]
    fn test_render_substitutes_every_placeholder() {
        let template = CommandTemplate::new("push --name s${seq} --id ${seq}").unwrap();
        assert_eq!(template.render(0), "push --name s0 --id 0");
        assert_eq!(template.render(12), "push --name s12 --id 12");
        assert!(template.has_placeholder());
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(CommandTemplate::new("   ").is_err());
    }

    #[test]
    fn test_parse_sample_config() {
        let config = HarnessConfig::from_toml_str(SAMPLE, ConfigOverrides::default()).unwrap();

        assert_eq!(config.bind_addr.port(), 8088);
        assert_eq!(config.spawn_interval, Duration::from_secs(3));
        assert_eq!(config.startup_grace, Duration::from_millis(DEFAULT_STARTUP_GRACE_MS));
        assert_eq!(config.monitor_interval, Duration::from_secs(DEFAULT_MONITOR_INTERVAL_SECS));
        assert_eq!(config.output_tail_chars, DEFAULT_OUTPUT_TAIL_CHARS);
        assert_eq!(config.alert_rules, AlertRules::default());
        assert_eq!(config.command.render(4), "ffmpeg -re -i input.mp4 -f flv rtmp://localhost/app/stream4");
    }

    #[test]
    fn test_overrides_take_precedence() {
        let overrides = ConfigOverrides {
            port: Some(7000),
            interval_secs: Some(1),
            command: Some("sleep 30".to_string()),
            log_level: Some("info".to_string()),
            ..Default::default()
        };
        let config = HarnessConfig::from_toml_str(SAMPLE, overrides).unwrap();

        assert_eq!(config.bind_addr.port(), 7000);
        assert_eq!(config.spawn_interval, Duration::from_secs(1));
        assert_eq!(config.command.as_str(), "sleep 30");
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_missing_command_is_error() {
        let result = HarnessConfig::from_toml_str("[server]\nalert_callback_server_port = 1\n", ConfigOverrides::default());
        assert!(matches!(result, Err(HarnessError::Config { .. })));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let overrides = ConfigOverrides {
            interval_secs: Some(0),
            ..Default::default()
        };
        assert!(HarnessConfig::from_toml_str(SAMPLE, overrides).is_err());
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let overrides = ConfigOverrides {
            log_level: Some("chatty".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            HarnessConfig::from_toml_str(SAMPLE, overrides),
            Err(HarnessError::Shared(shared::SharedError::InvalidConfig { .. }))
        ));
    }

    #[test]
    fn test_custom_alert_rules() {
        let contents = format!(
            "{SAMPLE}\n[alerts]\ncategories = [\"INTERNAL_QUEUE\"]\ncodes = [\"INTERNAL_QUEUE_CONGESTION\"]\n"
        );
        let config = HarnessConfig::from_toml_str(&contents, ConfigOverrides::default()).unwrap();

        assert_eq!(config.alert_rules.codes.len(), 1);
        assert!(config.alert_rules.categories.contains("INTERNAL_QUEUE"));
    }

    #[test]
    fn test_alert_codes_without_categories() {
        let contents = "[stream]\ncommand = \"sleep 30\"\n\n[alerts]\ncodes = [\"INTERNAL_QUEUE_CONGESTION\"]\n";
        let config = HarnessConfig::from_toml_str(contents, ConfigOverrides::default()).unwrap();

        assert_eq!(config.alert_rules.categories, AlertRules::default().categories);
        assert_eq!(config.alert_rules.codes.len(), 1);
    }

    #[test]
    fn test_unknown_section_rejected() {
        let contents = format!("{SAMPLE}\n[bogus]\nvalue = 1\n");
        assert!(matches!(
            HarnessConfig::from_toml_str(&contents, ConfigOverrides::default()),
            Err(HarnessError::Toml(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = HarnessConfig::load(Some(file.path()), ConfigOverrides::default()).unwrap();
        assert_eq!(config.bind_addr.port(), 8088);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let result = HarnessConfig::load(Some(Path::new("/nonexistent/stress.toml")), ConfigOverrides::default());
        assert!(matches!(result, Err(HarnessError::Io(_))));
    }
}
