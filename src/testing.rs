//! In-memory command used by the unit tests.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::driver::{
    CommandBehavior, CommandType, DbCommand, OracleBinding, Parameters, UpdateRowSource, Value,
};

#[derive(Debug, Clone, PartialEq)]
pub struct FakeError(pub String);

impl fmt::Display for FakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ORA-{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct FakeCommand {
    pub text: String,
    pub timeout: u32,
    pub command_type: CommandType,
    pub row_source: UpdateRowSource,
    pub params: Parameters,
    pub connection: Option<String>,
    pub transaction: Option<u32>,
    pub bind_by_name: bool,
    pub array_bind_count: usize,

    pub affected: u64,
    pub scalar: Option<Value>,
    pub rows: Vec<Vec<Value>>,
    pub fail_with: Option<String>,
    pub panic_on_execute: bool,
    /// Time spent inside every execution.
    pub delay: Duration,
    /// Output parameter written by the driver during execution.
    pub output: Option<(String, Value)>,

    pub prepared: bool,
    pub cancelled: AtomicBool,
    pub last_behavior: Option<CommandBehavior>,
    pub executions: usize,
    pub disposals: Arc<AtomicUsize>,
}

impl FakeCommand {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn failing(text: &str, code: &str) -> Self {
        Self {
            fail_with: Some(code.to_string()),
            ..Self::new(text)
        }
    }

    fn run(&mut self) -> Result<(), FakeError> {
        self.executions += 1;
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.panic_on_execute {
            panic!("driver panicked");
        }
        if let Some((name, value)) = self.output.clone() {
            if let Some(param) = self.params.get_mut(&name) {
                param.value = value;
            }
        }
        match &self.fail_with {
            Some(code) => Err(FakeError(code.clone())),
            None => Ok(()),
        }
    }
}

impl DbCommand for FakeCommand {
    type Error = FakeError;
    type Reader = std::vec::IntoIter<Vec<Value>>;
    type Connection = String;
    type Transaction = u32;

    fn command_text(&self) -> &str {
        &self.text
    }

    fn set_command_text(&mut self, text: String) {
        self.text = text;
    }

    fn command_timeout(&self) -> u32 {
        self.timeout
    }

    fn set_command_timeout(&mut self, seconds: u32) {
        self.timeout = seconds;
    }

    fn command_type(&self) -> CommandType {
        self.command_type
    }

    fn set_command_type(&mut self, command_type: CommandType) {
        self.command_type = command_type;
    }

    fn updated_row_source(&self) -> UpdateRowSource {
        self.row_source
    }

    fn set_updated_row_source(&mut self, source: UpdateRowSource) {
        self.row_source = source;
    }

    fn parameters(&self) -> &Parameters {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }

    fn connection(&self) -> Option<&String> {
        self.connection.as_ref()
    }

    fn set_connection(&mut self, connection: Option<String>) {
        self.connection = connection;
    }

    fn transaction(&self) -> Option<&u32> {
        self.transaction.as_ref()
    }

    fn set_transaction(&mut self, transaction: Option<u32>) {
        self.transaction = transaction;
    }

    fn prepare(&mut self) -> Result<(), FakeError> {
        if let Some(code) = &self.fail_with {
            return Err(FakeError(code.clone()));
        }
        self.prepared = true;
        Ok(())
    }

    fn cancel(&self) -> Result<(), FakeError> {
        self.cancelled.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn execute_non_query(&mut self) -> Result<u64, FakeError> {
        self.run()?;
        Ok(self.affected)
    }

    fn execute_scalar(&mut self) -> Result<Option<Value>, FakeError> {
        self.run()?;
        Ok(self.scalar.clone())
    }

    fn execute_reader(&mut self, behavior: CommandBehavior) -> Result<Self::Reader, FakeError> {
        self.last_behavior = Some(behavior);
        self.run()?;
        Ok(self.rows.clone().into_iter())
    }

    fn dispose(&mut self) {
        self.disposals.fetch_add(1, Ordering::SeqCst);
    }
}

impl OracleBinding for FakeCommand {
    fn bind_by_name(&self) -> bool {
        self.bind_by_name
    }

    fn set_bind_by_name(&mut self, enabled: bool) {
        self.bind_by_name = enabled;
    }

    fn array_bind_count(&self) -> usize {
        self.array_bind_count
    }

    fn set_array_bind_count(&mut self, count: usize) {
        self.array_bind_count = count;
    }
}
