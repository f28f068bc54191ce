//! # command-tracing
//!
//! Dependency-tracking instrumentation for Oracle-style database commands.
//!
//! This crate wraps a driver command in [`InstrumentedCommand`], a decorator that forwards
//! every property and method unchanged and records one dependency record per execution:
//! dependency name, execution kind, success flag, duration and the executed SQL text,
//! optionally followed by the bound parameter values.
//!
//! ## Features
//!
//! - **Drop-in Decorator**: `InstrumentedCommand<C>` implements the same [`DbCommand`] trait as `C`
//! - **Guaranteed Emission**: records are emitted from a scope guard, on success, error and unwind
//! - **Span Nesting**: each execution runs inside a `db.dependency` tracing span
//! - **Parameter Logging**: optionally append `name = value` lines for every bound parameter
//! - **Injectable Telemetry**: pass a [`TelemetryClient`] explicitly or install a process-wide one
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use command_tracing::prelude::*;
//!
//! // Wrap your driver's command
//! let mut command = connection.create_command("SELECT 1 FROM DUAL").with_tracing();
//!
//! // Use it exactly like the wrapped command
//! let one = command.execute_scalar()?;
//! ```
//!
//! ## Configuration
//!
//! ```rust,ignore
//! use command_tracing::{InstrumentedCommand, MemorySink, TelemetryClient, TracingConfig};
//!
//! let config = TracingConfig::default()
//!     .with_parameter_logging(true) // Append parameter values (default: false)
//!     .with_slow_query_threshold(Duration::from_millis(100));
//!
//! let client = TelemetryClient::new(MemorySink::new());
//! let command = InstrumentedCommand::new(command, config, client);
//! ```
//!
//! `TracingConfig::from_env()` reads the `EnableParameterLogging` setting from the
//! `ENABLE_PARAMETER_LOGGING` environment variable; anything other than `true`/`false`
//! leaves parameter logging off.
//!
//! ## Span Attributes
//!
//! | Attribute | Description |
//! |-----------|-------------|
//! | `db.system` | "oracle" unless configured otherwise |
//! | `db.operation` | SQL operation (SELECT, INSERT, MERGE, CALL, BLOCK, ...) |
//! | `db.sql.table` | Target table or procedure name (when detectable) |
//! | `dependency.name` | Wrapped command type name |
//! | `dependency.kind` | `NonQuery`, `Scalar` or `Reader` |
//! | `dependency.success` | Whether the delegated call succeeded |
//! | `db.statement` | Command text, with parameters when enabled |
//! | `db.rows_affected` | Rows affected by a non-query |
//! | `otel.status_code` | "OK" or "ERROR" |
//! | `error.message` | Error details (on failure) |

mod command;
mod config;
mod driver;
mod parser;
mod telemetry;

#[cfg(test)]
mod testing;

pub use command::{InstrumentedCommand, TracingExt};
pub use config::{parse_bool, EnvSettings, SettingsSource, TracingConfig, PARAMETER_LOGGING_KEY};
pub use driver::{
    CommandBehavior, CommandType, DbCommand, OracleBinding, Parameter, ParameterDirection,
    Parameters, UpdateRowSource, Value,
};
pub use parser::{ParsedSql, SqlOperation};
pub use telemetry::{
    DependencyKind, DependencyOperation, DependencyTelemetry, MemorySink, TelemetryClient,
    TelemetrySink, TracingSink,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        DbCommand, InstrumentedCommand, OracleBinding, TelemetryClient, TracingConfig, TracingExt,
    };
}
