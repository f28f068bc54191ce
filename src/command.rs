//! Traced database command wrapper.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use tracing::{field, Span};

use crate::config::TracingConfig;
use crate::driver::{
    CommandBehavior, CommandType, DbCommand, OracleBinding, Parameter, Parameters,
    UpdateRowSource, Value,
};
use crate::parser::ParsedSql;
use crate::telemetry::{DependencyKind, DependencyOperation, TelemetryClient};

/// A traced wrapper around a driver command.
///
/// The wrapper implements [`DbCommand`] itself, so it is a drop-in replacement
/// for the command it owns. Every property and method is forwarded unchanged;
/// the three execution entry points additionally emit one dependency record
/// per call, successful or not.
///
/// # Span Nesting
///
/// Each execution runs inside a `db.dependency` span that becomes a child of
/// the current tracing span, so driver-level events nest under it.
///
/// # Example
///
/// ```rust,ignore
/// use command_tracing::prelude::*;
///
/// let mut command = connection.create_command("SELECT 1 FROM DUAL").with_tracing();
/// let one = command.execute_scalar()?;
/// ```
pub struct InstrumentedCommand<C: DbCommand> {
    inner: C,
    config: Arc<TracingConfig>,
    client: TelemetryClient,
    disposed: bool,
}

impl<C: DbCommand> InstrumentedCommand<C> {
    /// Wrap a command with the given configuration and telemetry client.
    pub fn new(command: C, config: TracingConfig, client: TelemetryClient) -> Self {
        Self {
            inner: command,
            config: Arc::new(config),
            client,
            disposed: false,
        }
    }

    /// Wrap a command using settings from the environment and the process-wide client.
    pub fn wrap(command: C) -> Self {
        Self::new(command, TracingConfig::from_env(), TelemetryClient::global())
    }

    /// Get a reference to the wrapped command.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Get a mutable reference to the wrapped command.
    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// Get the tracing configuration.
    pub fn config(&self) -> &TracingConfig {
        &self.config
    }

    /// Get the telemetry client executions report to.
    pub fn client(&self) -> &TelemetryClient {
        &self.client
    }

    /// Whether the wrapped command has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn operation_name(&self) -> String {
        match &self.config.operation_name {
            Some(name) => name.clone(),
            None => type_name::<C>().to_string(),
        }
    }

    /// Create a tracing span for a command execution.
    fn create_span(&self, name: &str, kind: DependencyKind) -> Span {
        let parsed = ParsedSql::for_command(self.inner.command_text(), self.inner.command_type());
        let span_name = parsed.span_name();

        let span = tracing::info_span!(
            "db.dependency",
            otel.name = %span_name,
            otel.kind = "client",
            db.system = %self.config.db_system,
            db.operation = %parsed.operation.as_str(),
            db.sql.table = field::Empty,
            db.name = field::Empty,
            dependency.name = %name,
            dependency.kind = %kind,
            dependency.success = field::Empty,
            db.statement = field::Empty,
            db.rows_affected = field::Empty,
            db.duration_ms = field::Empty,
            otel.status_code = field::Empty,
            error.message = field::Empty,
            slow_query = field::Empty,
        );

        if let Some(table) = &parsed.table {
            span.record("db.sql.table", table.as_str());
        }

        if let Some(db_name) = &self.config.database_name {
            span.record("db.name", db_name.as_str());
        }

        span
    }

    /// Build the telemetry payload: the command text, then the bound
    /// parameters when parameter logging is enabled.
    fn executed_query(&self) -> String {
        let mut query = self.inner.command_text().to_string();
        if self.config.log_parameters {
            query.push_str("\n\n");
            let lines: Vec<String> = self
                .inner
                .parameters()
                .iter()
                .map(|p| format!("{} = {}", p.name, p.value))
                .collect();
            query.push_str(&lines.join("\n"));
        }
        query
    }

    /// Record the outcome of an execution on the operation and its span.
    fn record_result<T>(
        &self,
        operation: &mut DependencyOperation<'_>,
        result: &Result<T, C::Error>,
        row_count: Option<u64>,
    ) {
        let span = operation.span().clone();
        let elapsed = operation.elapsed();

        if self.config.record_row_counts {
            if let Some(count) = row_count {
                span.record("db.rows_affected", count);
                operation.telemetry_mut().rows_affected = Some(count);
            }
        }

        if elapsed > self.config.slow_query_threshold {
            span.record("slow_query", true);
            let duration_ms = elapsed.as_millis() as i64;
            let threshold_ms = self.config.slow_query_threshold.as_millis() as i64;
            tracing::warn!(
                parent: &span,
                duration_ms = duration_ms,
                threshold_ms = threshold_ms,
                "Slow query detected"
            );
        }

        match result {
            Ok(_) => {
                span.record("otel.status_code", "OK");
                operation.telemetry_mut().success = true;
            }
            Err(e) => {
                let message = e.to_string();
                span.record("otel.status_code", "ERROR");
                span.record("error.message", message.as_str());
                tracing::error!(
                    parent: &span,
                    error = %e,
                    "Database command failed"
                );
                operation.telemetry_mut().error = Some(message);
            }
        }
    }

    /// Run one execution entry point under a dependency operation.
    ///
    /// With telemetry disabled the call goes straight to the wrapped command.
    fn track<T, F, R>(&mut self, kind: DependencyKind, call: F, rows: R) -> Result<T, C::Error>
    where
        F: FnOnce(&mut C) -> Result<T, C::Error>,
        R: FnOnce(&T) -> Option<u64>,
    {
        let Some(sink) = self.client.active_sink() else {
            return call(&mut self.inner);
        };

        let name = self.operation_name();
        let span = self.create_span(&name, kind);
        let mut operation = DependencyOperation::start(sink, name, kind, span);
        operation.telemetry_mut().target = self.config.database_name.clone();
        // Pre-seed the payload so an unwind still reports the command text
        operation.telemetry_mut().data = self.inner.command_text().to_string();

        let inner = &mut self.inner;
        let result = operation.in_scope(|| call(inner));

        let row_count = result.as_ref().ok().and_then(rows);
        self.record_result(&mut operation, &result, row_count);
        operation.telemetry_mut().data = self.executed_query();

        result
    }
}

impl<C: DbCommand> DbCommand for InstrumentedCommand<C> {
    type Error = C::Error;
    type Reader = C::Reader;
    type Connection = C::Connection;
    type Transaction = C::Transaction;

    fn command_text(&self) -> &str {
        self.inner.command_text()
    }

    fn set_command_text(&mut self, text: String) {
        self.inner.set_command_text(text)
    }

    fn command_timeout(&self) -> u32 {
        self.inner.command_timeout()
    }

    fn set_command_timeout(&mut self, seconds: u32) {
        self.inner.set_command_timeout(seconds)
    }

    fn command_type(&self) -> CommandType {
        self.inner.command_type()
    }

    fn set_command_type(&mut self, command_type: CommandType) {
        self.inner.set_command_type(command_type)
    }

    fn updated_row_source(&self) -> UpdateRowSource {
        self.inner.updated_row_source()
    }

    fn set_updated_row_source(&mut self, source: UpdateRowSource) {
        self.inner.set_updated_row_source(source)
    }

    fn parameters(&self) -> &Parameters {
        self.inner.parameters()
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        self.inner.parameters_mut()
    }

    fn create_parameter(&self) -> Parameter {
        self.inner.create_parameter()
    }

    fn connection(&self) -> Option<&Self::Connection> {
        self.inner.connection()
    }

    fn set_connection(&mut self, connection: Option<Self::Connection>) {
        self.inner.set_connection(connection)
    }

    fn transaction(&self) -> Option<&Self::Transaction> {
        self.inner.transaction()
    }

    fn set_transaction(&mut self, transaction: Option<Self::Transaction>) {
        self.inner.set_transaction(transaction)
    }

    fn prepare(&mut self) -> Result<(), Self::Error> {
        self.inner.prepare()
    }

    fn cancel(&self) -> Result<(), Self::Error> {
        self.inner.cancel()
    }

    fn execute_non_query(&mut self) -> Result<u64, Self::Error> {
        self.track(
            DependencyKind::NonQuery,
            |command| command.execute_non_query(),
            |affected| Some(*affected),
        )
    }

    fn execute_scalar(&mut self) -> Result<Option<Value>, Self::Error> {
        self.track(
            DependencyKind::Scalar,
            |command| command.execute_scalar(),
            |_| None,
        )
    }

    fn execute_reader(&mut self, behavior: CommandBehavior) -> Result<Self::Reader, Self::Error> {
        self.track(
            DependencyKind::Reader,
            |command| command.execute_reader(behavior),
            |_| None,
        )
    }

    /// Dispose the wrapped command. Only the first call reaches it.
    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        tracing::debug!(command = type_name::<C>(), "Disposing wrapped command");
        self.inner.dispose();
    }
}

impl<C: OracleBinding> OracleBinding for InstrumentedCommand<C> {
    fn bind_by_name(&self) -> bool {
        self.inner.bind_by_name()
    }

    fn set_bind_by_name(&mut self, enabled: bool) {
        self.inner.set_bind_by_name(enabled)
    }

    fn array_bind_count(&self) -> usize {
        self.inner.array_bind_count()
    }

    fn set_array_bind_count(&mut self, count: usize) {
        self.inner.set_array_bind_count(count)
    }
}

impl<C: DbCommand> Drop for InstrumentedCommand<C> {
    fn drop(&mut self) {
        DbCommand::dispose(self);
    }
}

impl<C: DbCommand> From<C> for InstrumentedCommand<C> {
    fn from(command: C) -> Self {
        Self::wrap(command)
    }
}

impl<C: DbCommand> AsRef<C> for InstrumentedCommand<C> {
    fn as_ref(&self) -> &C {
        &self.inner
    }
}

impl<C: DbCommand + fmt::Debug> fmt::Debug for InstrumentedCommand<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedCommand")
            .field("inner", &self.inner)
            .field("config", &self.config)
            .field("client", &self.client)
            .field("disposed", &self.disposed)
            .finish()
    }
}

/// Extension trait for easy wrapping of driver commands.
pub trait TracingExt: DbCommand + Sized {
    /// Wrap this command with tracing instrumentation.
    fn with_tracing(self) -> InstrumentedCommand<Self>;

    /// Wrap this command with custom tracing configuration and telemetry client.
    fn with_tracing_config(
        self,
        config: TracingConfig,
        client: TelemetryClient,
    ) -> InstrumentedCommand<Self>;
}

impl<C: DbCommand> TracingExt for C {
    fn with_tracing(self) -> InstrumentedCommand<Self> {
        InstrumentedCommand::wrap(self)
    }

    fn with_tracing_config(
        self,
        config: TracingConfig,
        client: TelemetryClient,
    ) -> InstrumentedCommand<Self> {
        InstrumentedCommand::new(self, config, client)
    }
}
