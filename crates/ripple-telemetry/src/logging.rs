//! Subscriber installation for applications using the event core.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{TelemetryError, TelemetryResult};

/// Log targets of the event core crates, filtered by
/// [`LogConfig::core_level`].
const CORE_TARGETS: &[&str] = &["ripple_supply", "ripple_events"];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, for reading in a terminal.
    #[default]
    Pretty,
    /// One short line per event.
    Compact,
    /// One JSON object per event.
    Json,
    /// One line per event with every field.
    Full,
}

/// When a new log file is started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRotation {
    /// Every day.
    #[default]
    Daily,
    /// Every hour.
    Hourly,
    /// Every minute.
    Minutely,
    /// Never; a single file is written.
    Never,
}

impl From<FileRotation> for Rotation {
    fn from(rotation: FileRotation) -> Self {
        match rotation {
            FileRotation::Daily => Rotation::DAILY,
            FileRotation::Hourly => Rotation::HOURLY,
            FileRotation::Minutely => Rotation::MINUTELY,
            FileRotation::Never => Rotation::NEVER,
        }
    }
}

/// Rolling log files in one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFiles {
    /// Directory holding the files. Created if missing.
    pub directory: PathBuf,
    /// File name prefix, followed by the rotation date and `.log`.
    #[serde(default = "LogFiles::default_prefix")]
    pub prefix: String,
    /// When a new file is started.
    #[serde(default)]
    pub rotation: FileRotation,
    /// Number of files kept after rotation. All are kept when unset.
    #[serde(default)]
    pub keep: Option<usize>,
}

impl LogFiles {
    /// Daily rotated `ripple.*.log` files in `directory`.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            prefix: Self::default_prefix(),
            rotation: FileRotation::default(),
            keep: None,
        }
    }

    /// Rotate files by `rotation`.
    #[must_use]
    pub fn with_rotation(mut self, rotation: FileRotation) -> Self {
        self.rotation = rotation;
        self
    }

    fn default_prefix() -> String {
        "ripple".to_owned()
    }

    fn appender(&self) -> TelemetryResult<RollingFileAppender> {
        let directory: &Path = &self.directory;
        std::fs::create_dir_all(directory).map_err(|source| TelemetryError::LogDirectory {
            path: directory.to_path_buf(),
            source,
        })?;

        let mut builder = RollingFileAppender::builder()
            .rotation(self.rotation.into())
            .filename_prefix(self.prefix.as_str())
            .filename_suffix("log");
        if let Some(keep) = self.keep {
            builder = builder.max_log_files(keep);
        }
        builder
            .build(directory)
            .map_err(|source| TelemetryError::LogFiles {
                path: directory.to_path_buf(),
                source,
            })
    }
}

/// Where log lines go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output.
    Stdout,
    /// Standard error.
    #[default]
    Stderr,
    /// Rolling files.
    Files(LogFiles),
}

impl LogOutput {
    fn is_terminal(&self) -> bool {
        !matches!(self, Self::Files(_))
    }
}

/// Logging configuration, usually read from the `[logging]` table of a
/// TOML file (see [`LogConfig::from_toml_str`]).
///
/// Missing fields take their default values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base filter, e.g. `info` or `warn,my_app=debug`.
    pub level: String,
    /// Level of the event core crates, overriding `level` for them.
    pub core_level: Option<String>,
    /// Additional filter directives, applied last.
    pub directives: Vec<String>,
    /// Line rendering.
    pub format: LogFormat,
    /// Destination of log lines.
    pub output: LogOutput,
    /// Prefix lines with a timestamp.
    pub timestamps: bool,
    /// Include the source file and line of each event.
    pub source_location: bool,
    /// Colorize terminal output. Files and JSON are never colorized.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            core_level: None,
            directives: Vec::new(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            timestamps: true,
            source_location: false,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// A configuration filtering at `level`.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    /// Filter the event core crates at `level`.
    #[must_use]
    pub fn with_core_level(mut self, level: impl Into<String>) -> Self {
        self.core_level = Some(level.into());
        self
    }

    /// Add a filter directive.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Render lines as `format`.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Write lines to `output`.
    #[must_use]
    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// The filter built from `level`, `core_level` and `directives`.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidDirective`] for the first level or
    /// directive that does not parse.
    pub fn filter(&self) -> TelemetryResult<EnvFilter> {
        let mut filter =
            EnvFilter::try_new(&self.level).map_err(|source| TelemetryError::InvalidDirective {
                directive: self.level.clone(),
                source,
            })?;

        let core = self
            .core_level
            .iter()
            .flat_map(|level| CORE_TARGETS.iter().map(move |target| format!("{target}={level}")));
        for directive in core.chain(self.directives.iter().cloned()) {
            let parsed = directive.parse::<Directive>().map_err(|source| {
                TelemetryError::InvalidDirective {
                    directive: directive.clone(),
                    source,
                }
            })?;
            filter = filter.add_directive(parsed);
        }

        Ok(filter)
    }

    fn layer<W>(&self, writer: W) -> BoxedLayer
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let ansi = self.ansi && self.output.is_terminal() && self.format != LogFormat::Json;
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_file(self.source_location)
            .with_line_number(self.source_location);

        match (self.format, self.timestamps) {
            (LogFormat::Pretty, true) => layer.pretty().boxed(),
            (LogFormat::Pretty, false) => layer.pretty().without_time().boxed(),
            (LogFormat::Compact, true) => layer.compact().boxed(),
            (LogFormat::Compact, false) => layer.compact().without_time().boxed(),
            (LogFormat::Json, true) => layer.json().boxed(),
            (LogFormat::Json, false) => layer.json().without_time().boxed(),
            (LogFormat::Full, true) => layer.boxed(),
            (LogFormat::Full, false) => layer.without_time().boxed(),
        }
    }
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Fails if a directive does not parse, the log files cannot be opened, or a
/// global subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.filter()?;
    let layer = match &config.output {
        LogOutput::Stdout => config.layer(std::io::stdout),
        LogOutput::Stderr => config.layer(std::io::stderr),
        LogOutput::Files(files) => config.layer(files.appender()?),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()?;
    Ok(())
}
