//! Subscriber setup for the `harbor` binary.
//!
//! A [`LogConfig`] picks the filter, the line format and where lines go.
//! File output rotates daily as `harbor.<date>.log` inside the configured
//! directory and never carries ANSI escapes.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::error::{TelemetryError, TelemetryResult};

/// File name prefix of rotated log files.
const LOG_FILE_PREFIX: &str = "harbor";

/// Line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human oriented.
    Pretty,
    /// One line per event, no module target.
    #[default]
    Compact,
    /// Newline-delimited JSON objects.
    Json,
    /// One line per event with every field.
    Full,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            "full" => Ok(Self::Full),
            other => Err(TelemetryError::ConfigError(format!(
                "unknown log format '{other}' (expected pretty, compact, json or full)"
            ))),
        }
    }
}

/// Where log lines are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Standard output.
    Stdout,
    /// Standard error, so command output on stdout stays clean.
    #[default]
    Stderr,
    /// Daily-rotated files in this directory.
    File(PathBuf),
}

impl LogTarget {
    /// Resolve a target name (`stderr`, `stdout`, `file`).
    ///
    /// `directory` is only called for `file`.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::ConfigError`] for any other name.
    pub fn from_name(
        name: &str,
        directory: impl FnOnce() -> PathBuf,
    ) -> TelemetryResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "stderr" => Ok(Self::Stderr),
            "stdout" => Ok(Self::Stdout),
            "file" => Ok(Self::File(directory())),
            other => Err(TelemetryError::ConfigError(format!(
                "unknown log target '{other}' (expected stderr, stdout or file)"
            ))),
        }
    }

    fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    /// Build the writer for this target, creating the log directory if needed.
    fn make_writer(&self) -> TelemetryResult<BoxMakeWriter> {
        match self {
            Self::Stdout => Ok(BoxMakeWriter::new(std::io::stdout)),
            Self::Stderr => Ok(BoxMakeWriter::new(std::io::stderr)),
            Self::File(dir) => {
                std::fs::create_dir_all(dir)?;
                let appender = RollingFileAppender::builder()
                    .rotation(Rotation::DAILY)
                    .filename_prefix(LOG_FILE_PREFIX)
                    .filename_suffix("log")
                    .build(dir)
                    .map_err(|e| {
                        TelemetryError::InitError(format!(
                            "cannot log to {}: {e}",
                            dir.display()
                        ))
                    })?;
                Ok(BoxMakeWriter::new(appender))
            },
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base filter (e.g. `"warn"` or `"harbor_plugins=trace"`).
    pub level: String,
    /// Line format.
    pub format: LogFormat,
    /// Output target.
    pub target: LogTarget,
    /// Include timestamps.
    pub timestamps: bool,
    /// Colorize terminal output. Ignored for file targets.
    pub ansi: bool,
    /// Extra filter directives layered on top of `level`.
    pub directives: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            timestamps: true,
            ansi: true,
            directives: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Config with the given base level and defaults elsewhere.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    /// Set the line format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the output target.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Add a filter directive.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Drop timestamps from each line.
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Disable colors.
    #[must_use]
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    fn use_ansi(&self) -> bool {
        self.ansi && !self.target.is_file()
    }

    fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        let base = EnvFilter::try_new(&self.level)
            .map_err(|e| TelemetryError::ConfigError(format!("log level '{}': {e}", self.level)))?;

        self.directives.iter().try_fold(base, |filter, directive| -> TelemetryResult<EnvFilter> {
            let parsed = directive.parse().map_err(
                |e: tracing_subscriber::filter::ParseError| {
                    TelemetryError::ConfigError(format!("log directive '{directive}': {e}"))
                },
            )?;
            Ok(filter.add_directive(parsed))
        })
    }

    fn build_layer(&self, writer: BoxMakeWriter) -> Box<dyn Layer<Registry> + Send + Sync> {
        let ansi = self.use_ansi();
        let base = fmt::layer().with_writer(writer);
        match (self.format, self.timestamps) {
            (LogFormat::Json, true) => base.json().boxed(),
            (LogFormat::Json, false) => base.json().without_time().boxed(),
            (LogFormat::Pretty, true) => base.pretty().with_ansi(ansi).boxed(),
            (LogFormat::Pretty, false) => base.pretty().with_ansi(ansi).without_time().boxed(),
            (LogFormat::Compact, true) => {
                base.compact().with_ansi(ansi).with_target(false).boxed()
            },
            (LogFormat::Compact, false) => base
                .compact()
                .with_ansi(ansi)
                .with_target(false)
                .without_time()
                .boxed(),
            (LogFormat::Full, true) => base.with_ansi(ansi).boxed(),
            (LogFormat::Full, false) => base.with_ansi(ansi).without_time().boxed(),
        }
    }
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Returns an error if the filter does not parse, the log directory cannot
/// be created, or a global subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.build_filter()?;
    let writer = config.target.make_writer()?;

    tracing_subscriber::registry()
        .with(config.build_layer(writer))
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::InitError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_log_warnings_to_stderr() {
        let config = LogConfig::default();
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.target, LogTarget::Stderr);
        assert!(config.timestamps);
        assert!(config.use_ansi());
    }

    #[test]
    fn builder_sets_fields() {
        let config = LogConfig::new("debug")
            .with_format(LogFormat::Json)
            .without_timestamps()
            .without_ansi()
            .with_directive("harbor_plugins=trace");

        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.timestamps);
        assert!(!config.use_ansi());
        assert_eq!(config.directives, vec!["harbor_plugins=trace"]);
    }

    #[test]
    fn target_names_resolve() {
        let dir = || PathBuf::from("/var/log/harbor");
        assert_eq!(LogTarget::from_name("stderr", dir).unwrap(), LogTarget::Stderr);
        assert_eq!(LogTarget::from_name(" STDOUT ", dir).unwrap(), LogTarget::Stdout);
        assert_eq!(
            LogTarget::from_name("file", dir).unwrap(),
            LogTarget::File(PathBuf::from("/var/log/harbor"))
        );
        assert!(LogTarget::from_name("syslog", dir).is_err());
    }

    #[test]
    fn file_target_never_uses_ansi() {
        let config = LogConfig::new("info").with_target(LogTarget::File("/tmp/x".into()));
        assert!(config.ansi);
        assert!(!config.use_ansi());
    }

    #[test]
    fn file_writer_creates_the_log_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("logs/nested");

        LogTarget::File(dir.clone()).make_writer().unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn file_writer_fails_when_directory_is_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("logs");
        std::fs::write(&blocker, "not a directory").unwrap();

        assert!(LogTarget::File(blocker).make_writer().is_err());
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let parsed: LogConfig =
            serde_json::from_str(r#"{ "format": "full", "target": { "file": "/tmp/h" } }"#).unwrap();
        assert_eq!(parsed.level, "warn");
        assert_eq!(parsed.format, LogFormat::Full);
        assert_eq!(parsed.target, LogTarget::File(PathBuf::from("/tmp/h")));
    }

    #[test]
    fn bad_directive_names_itself() {
        let err = LogConfig::new("debug")
            .with_directive("[invalid=syntax")
            .build_filter()
            .unwrap_err();
        assert!(err.to_string().contains("[invalid=syntax"), "{err}");
        assert!(LogConfig::new("debug").with_directive("harbor=trace").build_filter().is_ok());
    }
}
