//! Basic example showing how to use command-tracing.
//!
//! Run with: cargo run --example basic
//!
//! The command below is a stand-in for a real driver command; with a driver you
//! would implement `DbCommand` (or use the driver's implementation) instead.

use std::convert::Infallible;

use command_tracing::prelude::*;
use command_tracing::{CommandBehavior, CommandType, Parameters, UpdateRowSource, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Default)]
struct EchoCommand {
    text: String,
    timeout: u32,
    command_type: CommandType,
    row_source: UpdateRowSource,
    params: Parameters,
}

impl DbCommand for EchoCommand {
    type Error = Infallible;
    type Reader = std::vec::IntoIter<Value>;
    type Connection = ();
    type Transaction = ();

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

    fn connection(&self) -> Option<&()> {
        None
    }

    fn set_connection(&mut self, _connection: Option<()>) {}

    fn transaction(&self) -> Option<&()> {
        None
    }

    fn set_transaction(&mut self, _transaction: Option<()>) {}

    fn prepare(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn cancel(&self) -> Result<(), Infallible> {
        Ok(())
    }

    fn execute_non_query(&mut self) -> Result<u64, Infallible> {
        Ok(self.params.len() as u64)
    }

    fn execute_scalar(&mut self) -> Result<Option<Value>, Infallible> {
        Ok(Some(Value::Int(1)))
    }

    fn execute_reader(&mut self, _behavior: CommandBehavior) -> Result<Self::Reader, Infallible> {
        Ok(self
            .params
            .iter()
            .map(|p| p.value.clone())
            .collect::<Vec<_>>()
            .into_iter())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Option 1: Simple wrapping with environment settings and the global client
    let mut command = EchoCommand {
        text: "SELECT 1 FROM DUAL".into(),
        ..Default::default()
    }
    .with_tracing();

    // Option 2: With custom configuration and an explicit client
    // let mut command = EchoCommand::default().with_tracing_config(
    //     TracingConfig::development(),
    //     TelemetryClient::tracing(),
    // );

    let one = command.execute_scalar()?;
    tracing::info!(result = ?one, "Scalar executed");

    command.set_command_text("UPDATE orders SET status = :status WHERE id = :id".into());
    command.parameters_mut().add("status", "SHIPPED");
    command.parameters_mut().add("id", 42);
    let updated = command.execute_non_query()?;
    tracing::info!(rows = updated, "Update executed");

    let rows = command.execute_reader(CommandBehavior::sequential_access())?;
    tracing::info!(values = rows.count(), "Reader drained");

    Ok(())
}
