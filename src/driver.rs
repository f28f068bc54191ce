//! The command contract wrapped by [`InstrumentedCommand`](crate::InstrumentedCommand).
//!
//! Drivers implement [`DbCommand`] for their native command type. The trait mirrors the
//! full capability set of an ADO-style database command: text, timeout, parameters,
//! connection/transaction association, prepare, cancel and the three execution entry points.

use std::fmt;

/// How the command text should be interpreted by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandType {
    /// A SQL statement or PL/SQL block.
    #[default]
    Text,
    /// The name of a stored procedure, optionally package-qualified.
    StoredProcedure,
    /// The name of a table; every row and column is returned.
    TableDirect,
}

/// How command results are applied to the row that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateRowSource {
    None,
    OutputParameters,
    FirstReturnedRecord,
    #[default]
    Both,
}

/// Direction of a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

/// Hints passed through to the driver when opening a reader.
///
/// The wrapper never interprets these; they are forwarded unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandBehavior {
    pub single_result: bool,
    pub schema_only: bool,
    pub key_info: bool,
    pub single_row: bool,
    pub sequential_access: bool,
    pub close_connection: bool,
}

impl CommandBehavior {
    /// No hints.
    pub const DEFAULT: CommandBehavior = CommandBehavior {
        single_result: false,
        schema_only: false,
        key_info: false,
        single_row: false,
        sequential_access: false,
        close_connection: false,
    };

    pub fn single_row() -> Self {
        Self {
            single_row: true,
            ..Self::DEFAULT
        }
    }

    pub fn schema_only() -> Self {
        Self {
            schema_only: true,
            ..Self::DEFAULT
        }
    }

    pub fn sequential_access() -> Self {
        Self {
            sequential_access: true,
            ..Self::DEFAULT
        }
    }
}

/// A bound parameter value or scalar result.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Renders the value the way it appears in telemetry payloads.
///
/// `Null` renders as an empty string and bytes as lowercase hex with a `0x` prefix.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::String(s) => f.write_str(s),
            Value::Bytes(bytes) => {
                f.write_str("0x")?;
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A named parameter bound to a command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
    pub direction: ParameterDirection,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            direction: ParameterDirection::Input,
        }
    }

    pub fn with_direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }
}

/// Ordered collection of parameters bound to a command.
///
/// Iteration follows insertion order, which is also the order parameters are
/// written into telemetry payloads.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameters {
    items: Vec<Parameter>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a new input parameter and return it for further adjustment.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Parameter {
        self.push(Parameter::new(name, value))
    }

    pub fn push(&mut self, parameter: Parameter) -> &mut Parameter {
        self.items.push(parameter);
        let last = self.items.len() - 1;
        &mut self.items[last]
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.items.iter().find(|p| p.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.items.iter_mut().find(|p| p.name == name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Parameter> {
        let index = self.items.iter().position(|p| p.name == name)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Parameter> for Parameters {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// An executable database command.
///
/// This is the seam between the instrumentation and a concrete driver. Every
/// method has the semantics of the driver's own command; [`InstrumentedCommand`]
/// implements this trait too, so a traced command is a drop-in replacement.
///
/// [`InstrumentedCommand`]: crate::InstrumentedCommand
pub trait DbCommand {
    /// Error raised by the driver for any failed operation.
    type Error: fmt::Display;
    /// Streaming row cursor returned by [`execute_reader`](DbCommand::execute_reader).
    type Reader;
    type Connection;
    type Transaction;

    fn command_text(&self) -> &str;
    fn set_command_text(&mut self, text: String);

    /// Timeout in seconds; `0` means wait indefinitely.
    fn command_timeout(&self) -> u32;
    fn set_command_timeout(&mut self, seconds: u32);

    fn command_type(&self) -> CommandType;
    fn set_command_type(&mut self, command_type: CommandType);

    fn updated_row_source(&self) -> UpdateRowSource;
    fn set_updated_row_source(&mut self, source: UpdateRowSource);

    fn parameters(&self) -> &Parameters;
    fn parameters_mut(&mut self) -> &mut Parameters;

    /// Create a parameter suitable for this driver. It is not bound until
    /// pushed onto [`parameters_mut`](DbCommand::parameters_mut).
    fn create_parameter(&self) -> Parameter {
        Parameter::default()
    }

    fn connection(&self) -> Option<&Self::Connection>;
    fn set_connection(&mut self, connection: Option<Self::Connection>);

    fn transaction(&self) -> Option<&Self::Transaction>;
    fn set_transaction(&mut self, transaction: Option<Self::Transaction>);

    fn prepare(&mut self) -> Result<(), Self::Error>;
    fn cancel(&self) -> Result<(), Self::Error>;

    /// Execute a statement and return the number of affected rows.
    fn execute_non_query(&mut self) -> Result<u64, Self::Error>;

    /// Execute a query and return the first column of the first row, or
    /// `None` when the result set is empty.
    fn execute_scalar(&mut self) -> Result<Option<Value>, Self::Error>;

    fn execute_reader(&mut self, behavior: CommandBehavior) -> Result<Self::Reader, Self::Error>;

    /// Release driver resources held by the command.
    fn dispose(&mut self) {}
}

/// Oracle-specific binding controls.
pub trait OracleBinding: DbCommand {
    /// Whether parameters bind by name rather than by position.
    fn bind_by_name(&self) -> bool;
    fn set_bind_by_name(&mut self, enabled: bool);

    /// Number of array elements bound per parameter for array DML.
    fn array_bind_count(&self) -> usize;
    fn set_array_bind_count(&mut self, count: usize);
}
