// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Logging initialization for livebridge
//!
//! Every binary in the workspace goes through [`CliLoggingArgs::init`] so that
//! filters, formats and log file placement behave the same way. A process that
//! owns the terminal (the bridge TUI) always logs to a file; otherwise logs go
//! to stderr unless a file destination was requested explicitly.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use tracing::Level;

const LOG_DIR_NAME: &str = "livebridge";

/// Output format for log messages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable plaintext format
    #[default]
    Plaintext,
    /// Structured JSON format
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Plaintext => write!(f, "plaintext"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Log level accepted on the command line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CliLogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for Level {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

impl std::fmt::Display for CliLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CliLogLevel::Error => "error",
            CliLogLevel::Warn => "warn",
            CliLogLevel::Info => "info",
            CliLogLevel::Debug => "debug",
            CliLogLevel::Trace => "trace",
        };
        f.write_str(name)
    }
}

/// Where log output ends up once initialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    Stderr,
    File(PathBuf),
}

/// Logging flags shared by all livebridge binaries.
///
/// Flatten into a clap parser with `#[command(flatten)]`.
#[derive(Clone, Debug, Default, clap::Args, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CliLoggingArgs {
    /// Log verbosity level
    #[arg(long, value_enum, help = "Log verbosity level (default: info)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<CliLogLevel>,

    /// Log output format
    #[arg(long, value_enum, help = "Log output format (default: plaintext)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_format: Option<LogFormat>,

    /// Directory for log files
    #[arg(long, help = "Directory for log files (default: platform specific)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Log filename
    #[arg(long, help = "Log filename")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

impl CliLoggingArgs {
    /// Initialize the global subscriber.
    ///
    /// `owns_terminal` forces file output so log lines never tear the TUI.
    /// `default_level` applies when neither `--log-level` nor `RUST_LOG` is set.
    pub fn init(
        &self,
        component: &str,
        owns_terminal: bool,
        default_level: CliLogLevel,
    ) -> anyhow::Result<LogDestination> {
        let level: Level = self.log_level.unwrap_or(default_level).into();
        let format = self.log_format.unwrap_or_default();

        match self.destination(component, owns_terminal) {
            LogDestination::File(path) => {
                init_to_file(component, level, format, &path)?;
                Ok(LogDestination::File(path))
            }
            LogDestination::Stderr => {
                init_with_writer(component, level, format, io::stderr)?;
                Ok(LogDestination::Stderr)
            }
        }
    }

    /// Decide where logs go without touching the global subscriber.
    pub fn destination(&self, component: &str, owns_terminal: bool) -> LogDestination {
        if owns_terminal || self.log_file.is_some() || self.log_dir.is_some() {
            LogDestination::File(self.resolve_log_path(component))
        } else {
            LogDestination::Stderr
        }
    }

    /// Resolve the log file path.
    ///
    /// An absolute `--log-file` wins. A relative one is placed under
    /// `--log-dir` when given. Without `--log-file` the file is named after
    /// the component inside `--log-dir` or the platform log directory.
    pub fn resolve_log_path(&self, component: &str) -> PathBuf {
        let file_name = format!("{component}.log");
        match (&self.log_file, &self.log_dir) {
            (Some(file), _) if Path::new(file).is_absolute() => PathBuf::from(file),
            (Some(file), Some(dir)) => Path::new(dir).join(file),
            (Some(file), None) => PathBuf::from(file),
            (None, Some(dir)) => Path::new(dir).join(file_name),
            (None, None) => standard_log_dir().join(file_name),
        }
    }
}

/// Platform log directory for livebridge.
///
/// - macOS: `~/Library/Logs/livebridge`
/// - Linux: `$XDG_DATA_HOME/livebridge` (usually `~/.local/share/livebridge`)
/// - Windows: `%APPDATA%\livebridge`
pub fn standard_log_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        let mut path = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
        path.push("Library");
        path.push("Logs");
        path.push(LOG_DIR_NAME);
        path
    }

    #[cfg(not(target_os = "macos"))]
    {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(std::env::temp_dir);
        path.push(LOG_DIR_NAME);
        path
    }
}

/// Initialize logging into `log_path`, creating parent directories as needed.
pub fn init_to_file(
    component: &str,
    default_level: Level,
    format: LogFormat,
    log_path: &Path,
) -> anyhow::Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = std::fs::OpenOptions::new().create(true).append(true).open(log_path)?;
    init_with_writer(component, default_level, format, std::sync::Mutex::new(log_file))
}

/// Initialize logging with a custom writer
pub fn init_with_writer<W>(
    component: &str,
    default_level: Level,
    format: LogFormat,
    writer: W,
) -> anyhow::Result<()>
where
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(component, default_level)));

    match format {
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).json();
            #[cfg(debug_assertions)]
            let layer = layer.with_file(true).with_line_number(true);

            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
        LogFormat::Plaintext => {
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);
            #[cfg(debug_assertions)]
            let layer = layer.with_file(true).with_line_number(true);

            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
    }

    Ok(())
}

/// Filter directive used when `RUST_LOG` is unset.
///
/// Crate targets use underscores, so `lb-server` also enables `lb_server`.
pub fn default_filter(component: &str, level: Level) -> String {
    let target = component.replace('-', "_");
    format!("{level},{target}={level}")
}

/// Redact sensitive information from log output
///
/// ```rust
/// use lb_logging::redact;
///
/// let api_key = "sk-ant-1234567890abcdef";
/// tracing::info!(api_key = %redact(api_key), "API key configured");
/// ```
pub fn redact(_value: impl std::fmt::Display) -> &'static str {
    "[REDACTED]"
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn terminal_owner_always_logs_to_file() {
        let args = CliLoggingArgs::default();
        assert_eq!(args.destination("livebridge", false), LogDestination::Stderr);
        assert!(matches!(
            args.destination("livebridge", true),
            LogDestination::File(_)
        ));
    }

    #[test]
    fn explicit_log_file_switches_to_file_output() {
        let args = CliLoggingArgs {
            log_file: Some("bridge.log".to_string()),
            ..Default::default()
        };
        assert_eq!(
            args.destination("livebridge", false),
            LogDestination::File(PathBuf::from("bridge.log"))
        );
    }

    #[test]
    fn relative_log_file_is_placed_under_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let args = CliLoggingArgs {
            log_dir: Some(dir.path().display().to_string()),
            log_file: Some("custom.log".to_string()),
            ..Default::default()
        };
        assert_eq!(args.resolve_log_path("livebridge"), dir.path().join("custom.log"));
    }

    #[test]
    fn log_dir_without_file_uses_component_name() {
        let dir = tempfile::tempdir().unwrap();
        let args = CliLoggingArgs {
            log_dir: Some(dir.path().display().to_string()),
            ..Default::default()
        };
        assert_eq!(
            args.resolve_log_path("lb-server"),
            dir.path().join("lb-server.log")
        );
    }

    #[test]
    fn absolute_log_file_ignores_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let absolute = dir.path().join("elsewhere.log");
        let args = CliLoggingArgs {
            log_dir: Some("/does/not/matter".to_string()),
            log_file: Some(absolute.display().to_string()),
            ..Default::default()
        };
        assert_eq!(args.resolve_log_path("livebridge"), absolute);
    }

    #[test]
    fn standard_dir_is_named_after_the_product() {
        assert!(standard_log_dir().ends_with(LOG_DIR_NAME));
    }

    #[test]
    fn default_filter_covers_crate_target() {
        assert_eq!(
            default_filter("lb-cli", Level::DEBUG),
            "DEBUG,lb_cli=DEBUG"
        );
    }

    #[test]
    fn cli_level_maps_to_tracing_level() {
        assert_eq!(Level::from(CliLogLevel::Error), Level::ERROR);
        assert_eq!(Level::from(CliLogLevel::Debug), Level::DEBUG);
        assert_eq!(CliLogLevel::default(), CliLogLevel::Info);
        assert_eq!(CliLogLevel::Warn.to_string(), "warn");
    }

    #[test]
    fn redact_hides_value() {
        assert_eq!(redact("sk-ant-secret"), "[REDACTED]");
    }
}
