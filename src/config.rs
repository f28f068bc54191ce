//! Configuration for tracing behavior.

use std::collections::HashMap;
use std::time::Duration;

/// Setting key controlling parameter logging.
pub const PARAMETER_LOGGING_KEY: &str = "EnableParameterLogging";

/// Configuration options for command tracing.
///
/// # Example
///
/// ```rust
/// use command_tracing::TracingConfig;
/// use std::time::Duration;
///
/// let config = TracingConfig::default()
///     .with_parameter_logging(true)
///     .with_slow_query_threshold(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Whether to append bound parameter values to the telemetry payload.
    /// Default: `false` (parameters may contain sensitive data)
    pub log_parameters: bool,

    /// Threshold for logging slow commands at WARN level.
    /// Default: 500ms
    pub slow_query_threshold: Duration,

    /// Whether to record the number of rows affected by non-queries.
    /// Default: `true`
    pub record_row_counts: bool,

    /// Custom database name to include in spans and telemetry records.
    /// Default: `None`
    pub database_name: Option<String>,

    /// Value of the `db.system` span attribute.
    /// Default: "oracle"
    pub db_system: &'static str,

    /// Dependency name to report instead of the wrapped command's type name.
    /// Default: `None`
    pub operation_name: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_parameters: false,
            slow_query_threshold: Duration::from_millis(500),
            record_row_counts: true,
            database_name: None,
            db_system: "oracle",
            operation_name: None,
        }
    }
}

impl TracingConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from a settings source.
    ///
    /// Only `EnableParameterLogging` is read. A missing or unparsable value
    /// leaves parameter logging disabled.
    pub fn from_settings<S: SettingsSource + ?Sized>(settings: &S) -> Self {
        let log_parameters = settings
            .setting(PARAMETER_LOGGING_KEY)
            .and_then(|value| parse_bool(&value))
            .unwrap_or(false);
        Self::default().with_parameter_logging(log_parameters)
    }

    /// Build a configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_settings(&EnvSettings::new())
    }

    /// Enable or disable parameter logging in telemetry payloads.
    ///
    /// **Security Warning**: Query parameters often contain user input and
    /// potentially sensitive data. Only enable in development or controlled environments.
    pub fn with_parameter_logging(mut self, enabled: bool) -> Self {
        self.log_parameters = enabled;
        self
    }

    /// Set the threshold for slow query warnings.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    /// Enable or disable row count recording.
    pub fn with_row_count_recording(mut self, enabled: bool) -> Self {
        self.record_row_counts = enabled;
        self
    }

    /// Set a database name to include in spans.
    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = Some(name.into());
        self
    }

    pub fn with_db_system(mut self, system: &'static str) -> Self {
        self.db_system = system;
        self
    }

    /// Report dependencies under a fixed name instead of the command type name.
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Create a development-friendly configuration with full logging enabled.
    ///
    /// **Warning**: Do not use in production as it logs all parameter values.
    pub fn development() -> Self {
        Self {
            log_parameters: true,
            slow_query_threshold: Duration::from_millis(100),
            ..Self::default()
        }
    }

    /// Create a production-safe configuration.
    pub fn production() -> Self {
        Self {
            log_parameters: false,
            slow_query_threshold: Duration::from_secs(1),
            ..Self::default()
        }
    }
}

/// A process-wide key/value store of application settings.
pub trait SettingsSource {
    fn setting(&self, key: &str) -> Option<String>;
}

impl SettingsSource for HashMap<String, String> {
    fn setting(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Reads settings from environment variables.
///
/// Keys are mapped to SCREAMING_SNAKE_CASE, so `EnableParameterLogging` is
/// read from `ENABLE_PARAMETER_LOGGING` (after the optional prefix).
#[derive(Debug, Clone, Default)]
pub struct EnvSettings {
    prefix: String,
}

impl EnvSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Environment variable name used for `key`.
    pub fn variable_name(&self, key: &str) -> String {
        let mut name = self.prefix.clone();
        let mut prev_lower = false;
        for c in key.chars() {
            if c.is_ascii_uppercase() && prev_lower {
                name.push('_');
            }
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            name.push(c.to_ascii_uppercase());
        }
        name
    }
}

impl SettingsSource for EnvSettings {
    fn setting(&self, key: &str) -> Option<String> {
        std::env::var(self.variable_name(key)).ok()
    }
}

/// Parse a boolean setting: `true`/`false`, case-insensitive, surrounding
/// whitespace ignored.
pub fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
