//! Dependency telemetry records, sinks and the scoped operation guard.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use once_cell::sync::OnceCell;
use tracing::Span;

/// Which execution entry point produced a dependency record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    NonQuery,
    Scalar,
    Reader,
}

impl DependencyKind {
    /// Name reported as the dependency type.
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::NonQuery => "NonQuery",
            DependencyKind::Scalar => "Scalar",
            DependencyKind::Reader => "Reader",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One telemetry record for one execution attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyTelemetry {
    /// Dependency name, by default the wrapped command's type name.
    pub name: String,
    /// Execution kind, reported as the dependency type.
    pub kind: DependencyKind,
    /// `true` only when the delegated call returned successfully.
    pub success: bool,
    /// Command text, optionally followed by bound parameter values.
    pub data: String,
    pub duration: Duration,
    pub started_at: SystemTime,
    /// Database the command ran against, when configured.
    pub target: Option<String>,
    pub rows_affected: Option<u64>,
    /// Display text of the error returned by the wrapped command.
    pub error: Option<String>,
}

impl DependencyTelemetry {
    /// Start an unsuccessful record with an empty payload.
    pub fn new(name: impl Into<String>, kind: DependencyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            success: false,
            data: String::new(),
            duration: Duration::ZERO,
            started_at: SystemTime::now(),
            target: None,
            rows_affected: None,
            error: None,
        }
    }
}

/// Destination for completed dependency records.
///
/// Sinks are shared by every traced command in the process and must be safe
/// for concurrent use.
pub trait TelemetrySink: Send + Sync {
    /// Whether records should be collected at all. When this returns `false`
    /// commands execute without any instrumentation.
    fn is_enabled(&self) -> bool {
        true
    }

    fn track_dependency(&self, telemetry: &DependencyTelemetry);
}

/// Scope guard for a single tracked execution.
///
/// The record is emitted to the sink exactly once, when the guard is dropped,
/// on every exit path including unwinding.
pub struct DependencyOperation<'a> {
    sink: &'a dyn TelemetrySink,
    telemetry: DependencyTelemetry,
    span: Span,
    start: Instant,
}

impl<'a> DependencyOperation<'a> {
    /// Open an operation that reports to `sink` when dropped.
    pub fn start(
        sink: &'a dyn TelemetrySink,
        name: impl Into<String>,
        kind: DependencyKind,
        span: Span,
    ) -> Self {
        Self {
            sink,
            telemetry: DependencyTelemetry::new(name, kind),
            span,
            start: Instant::now(),
        }
    }

    /// The record that will be emitted.
    pub fn telemetry(&self) -> &DependencyTelemetry {
        &self.telemetry
    }

    /// Mutable access to the record before it is emitted.
    pub fn telemetry_mut(&mut self) -> &mut DependencyTelemetry {
        &mut self.telemetry
    }

    /// The tracing span covering this operation.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Run `f` with the operation's span entered.
    pub fn in_scope<F: FnOnce() -> T, T>(&self, f: F) -> T {
        self.span.in_scope(f)
    }

    /// Time since the operation started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for DependencyOperation<'_> {
    fn drop(&mut self) {
        self.telemetry.duration = self.start.elapsed();

        self.span.record("dependency.success", self.telemetry.success);
        self.span.record("db.statement", self.telemetry.data.as_str());
        self.span
            .record("db.duration_ms", self.telemetry.duration.as_millis() as i64);

        let _entered = self.span.enter();
        self.sink.track_dependency(&self.telemetry);
    }
}

/// Sink that reports completed dependencies as `tracing` events.
///
/// It is enabled whenever the active subscriber is interested in INFO spans.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn is_enabled(&self) -> bool {
        tracing::enabled!(tracing::Level::INFO)
    }

    fn track_dependency(&self, telemetry: &DependencyTelemetry) {
        let duration_ms = telemetry.duration.as_millis() as u64;
        if telemetry.success {
            tracing::info!(
                dependency.name = %telemetry.name,
                dependency.kind = %telemetry.kind,
                dependency.success = true,
                dependency.data = %telemetry.data,
                dependency.target = telemetry.target.as_deref(),
                db.rows_affected = telemetry.rows_affected,
                duration_ms = duration_ms,
                "Dependency call completed"
            );
        } else {
            tracing::error!(
                dependency.name = %telemetry.name,
                dependency.kind = %telemetry.kind,
                dependency.success = false,
                dependency.data = %telemetry.data,
                dependency.target = telemetry.target.as_deref(),
                error.message = telemetry.error.as_deref(),
                duration_ms = duration_ms,
                "Dependency call failed"
            );
        }
    }
}

/// Sink that keeps every record in memory.
#[derive(Debug)]
pub struct MemorySink {
    records: Mutex<Vec<DependencyTelemetry>>,
    enabled: AtomicBool,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            enabled: AtomicBool::new(true),
        }
    }
}

impl MemorySink {
    /// Create an enabled, empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that reports itself disabled until switched on.
    pub fn disabled() -> Self {
        let sink = Self::default();
        sink.set_enabled(false);
        sink
    }

    /// Switch record collection on or off at runtime.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Snapshot of the collected records, oldest first.
    pub fn records(&self) -> Vec<DependencyTelemetry> {
        self.lock().clone()
    }

    /// Remove and return all collected records.
    pub fn take(&self) -> Vec<DependencyTelemetry> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of records collected so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no records have been collected.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DependencyTelemetry>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TelemetrySink for MemorySink {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn track_dependency(&self, telemetry: &DependencyTelemetry) {
        self.lock().push(telemetry.clone());
    }
}

static GLOBAL_CLIENT: OnceCell<TelemetryClient> = OnceCell::new();

/// Handle to the telemetry sink used by traced commands.
///
/// Cloning is cheap; all clones share the same sink. A client without a sink
/// is disabled.
#[derive(Clone, Default)]
pub struct TelemetryClient {
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl TelemetryClient {
    /// Create a client reporting to `sink`.
    pub fn new<S: TelemetrySink + 'static>(sink: S) -> Self {
        Self::from_arc(Arc::new(sink))
    }

    /// Create a client sharing an existing sink.
    pub fn from_arc(sink: Arc<dyn TelemetrySink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// A client that never records anything.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// A client reporting through [`TracingSink`].
    pub fn tracing() -> Self {
        Self::new(TracingSink)
    }

    /// The configured sink, enabled or not.
    pub fn sink(&self) -> Option<&dyn TelemetrySink> {
        self.sink.as_deref()
    }

    /// The sink, if present and currently enabled.
    pub fn active_sink(&self) -> Option<&dyn TelemetrySink> {
        self.sink().filter(|sink| sink.is_enabled())
    }

    /// Whether executions should currently be tracked.
    pub fn is_enabled(&self) -> bool {
        self.active_sink().is_some()
    }

    /// Install the process-wide client. Only the first call succeeds; later
    /// calls hand the rejected client back.
    pub fn install_global(client: TelemetryClient) -> Result<(), TelemetryClient> {
        GLOBAL_CLIENT.set(client)
    }

    /// The process-wide client, defaulting to [`TelemetryClient::tracing`]
    /// when none was installed.
    pub fn global() -> TelemetryClient {
        GLOBAL_CLIENT.get_or_init(Self::tracing).clone()
    }
}

impl fmt::Debug for TelemetryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryClient")
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(DependencyKind::NonQuery.to_string(), "NonQuery");
        assert_eq!(DependencyKind::Scalar.as_str(), "Scalar");
        assert_eq!(DependencyKind::Reader.as_str(), "Reader");
    }

    #[test]
    fn test_operation_emits_once_on_drop() {
        let sink = MemorySink::new();
        {
            let mut operation =
                DependencyOperation::start(&sink, "cmd", DependencyKind::Scalar, Span::none());
            operation.telemetry_mut().data = "SELECT 1 FROM DUAL".to_string();
            operation.telemetry_mut().success = true;
            assert!(sink.is_empty());
        }

        let records = sink.take();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "cmd");
        assert_eq!(records[0].kind, DependencyKind::Scalar);
        assert!(records[0].success);
        assert_eq!(records[0].data, "SELECT 1 FROM DUAL");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_operation_defaults_to_unsuccessful() {
        let sink = MemorySink::new();
        drop(DependencyOperation::start(
            &sink,
            "cmd",
            DependencyKind::NonQuery,
            Span::none(),
        ));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].success);
        assert_eq!(records[0].error, None);
    }

    #[test]
    fn test_operation_emits_on_unwind() {
        let sink = MemorySink::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _operation =
                DependencyOperation::start(&sink, "cmd", DependencyKind::Reader, Span::none());
            panic!("driver blew up");
        }));

        assert!(result.is_err());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_client_enabled_states() {
        assert!(!TelemetryClient::disabled().is_enabled());
        assert!(!TelemetryClient::default().is_enabled());
        assert!(TelemetryClient::new(MemorySink::new()).is_enabled());

        let sink = Arc::new(MemorySink::disabled());
        let client = TelemetryClient::from_arc(sink.clone());
        assert!(!client.is_enabled());
        assert!(client.sink().is_some());

        sink.set_enabled(true);
        assert!(client.is_enabled());
    }

    #[test]
    fn test_tracing_sink_without_subscriber_is_disabled() {
        assert!(!TracingSink.is_enabled());
    }

    #[test]
    fn test_global_client_installs_once() {
        let sink = Arc::new(MemorySink::new());
        let first = TelemetryClient::install_global(TelemetryClient::from_arc(sink.clone()));
        let second = TelemetryClient::install_global(TelemetryClient::disabled());

        assert!(first.is_ok());
        assert!(second.is_err());
        assert!(TelemetryClient::global().is_enabled());

        sink.set_enabled(false);
        assert!(!TelemetryClient::global().is_enabled());
        sink.set_enabled(true);
    }
}
