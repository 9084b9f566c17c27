//! Loading the logging configuration from TOML and the environment.
//!
//! Environment variables are fallbacks: they only fill fields the TOML
//! document leaves unset.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

use crate::error::{TelemetryError, TelemetryResult};
use crate::logging::LogConfig;

/// Prefix of the environment variables read by [`LogConfig::from_env`].
pub const ENV_PREFIX: &str = "RIPPLE_LOG_";

/// Mapping from environment variable name to a `[logging]` field.
struct EnvMapping {
    var_name: &'static str,
    field: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "RIPPLE_LOG_LEVEL",
        field: "level",
    },
    EnvMapping {
        var_name: "RIPPLE_LOG_CORE_LEVEL",
        field: "core_level",
    },
    EnvMapping {
        var_name: "RIPPLE_LOG_FORMAT",
        field: "format",
    },
    EnvMapping {
        var_name: "RIPPLE_LOG_TARGET",
        field: "output",
    },
];

impl LogConfig {
    /// Parse the `[logging]` table of a TOML document.
    ///
    /// A document without the table yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidConfig`] if the document is not
    /// valid TOML or the table does not describe a log configuration, and
    /// [`TelemetryError::LoggingNotTable`] if `logging` is not a table.
    pub fn from_toml_str(input: &str) -> TelemetryResult<Self> {
        Self::load(input, &HashMap::<String, String>::new())
    }

    /// Build a configuration from the `RIPPLE_LOG_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidConfig`] if a variable holds an
    /// invalid value.
    pub fn from_env() -> TelemetryResult<Self> {
        let env_vars: HashMap<String, String> = std::env::vars()
            .filter(|(name, _)| name.starts_with(ENV_PREFIX))
            .collect();
        Self::load("", &env_vars)
    }

    /// Parse the `[logging]` table of a TOML document, filling unset fields
    /// from `env_vars`.
    ///
    /// `RIPPLE_LOG_TARGET` accepts `stdout`, `stderr`, or a directory to
    /// write log files to.
    ///
    /// # Errors
    ///
    /// See [`LogConfig::from_toml_str`].
    pub fn load<S: BuildHasher>(
        input: &str,
        env_vars: &HashMap<String, String, S>,
    ) -> TelemetryResult<Self> {
        let mut document: toml::Table = input.parse()?;

        let mut logging = match document.remove("logging") {
            Some(toml::Value::Table(table)) => table,
            Some(other) => {
                return Err(TelemetryError::LoggingNotTable {
                    found: other.type_str(),
                });
            },
            None => toml::Table::new(),
        };

        let applied = apply_env_fallbacks(&mut logging, env_vars);
        if applied > 0 {
            debug!(applied, "Logging configuration completed from environment");
        }

        Ok(toml::Value::Table(logging).try_into()?)
    }
}

/// Fill the fields of `logging` that are unset from the environment.
///
/// Returns the number of env vars applied.
fn apply_env_fallbacks<S: BuildHasher>(
    logging: &mut toml::Table,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if logging.contains_key(mapping.field) {
            continue;
        }

        if let Some(value) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field,
                "applying env var fallback"
            );

            logging.insert(mapping.field.to_owned(), field_value(mapping.field, value));
            count = count.saturating_add(1);
        }
    }

    count
}

fn field_value(field: &str, value: &str) -> toml::Value {
    let value = value.trim();
    match field {
        "format" => toml::Value::String(value.to_lowercase()),
        "output" => match value.to_lowercase().as_str() {
            output @ ("stdout" | "stderr") => toml::Value::String(output.to_owned()),
            _ => {
                let mut files = toml::Table::new();
                files.insert("directory".to_owned(), toml::Value::String(value.to_owned()));
                let mut output = toml::Table::new();
                output.insert("files".to_owned(), toml::Value::Table(files));
                toml::Value::Table(output)
            },
        },
        _ => toml::Value::String(value.to_owned()),
    }
}
