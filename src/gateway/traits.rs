// ABOUTME: Defines the Gateway trait - the narrow command interface to devices.
// ABOUTME: Gateways run a named command and return raw stdout/stderr.

use async_trait::async_trait;

use super::CommandOutput;
use crate::error::TransportError;

/// Executes named commands against remote control daemons.
///
/// Timeouts, if any, are the gateway's business. Callers never add their own
/// deadline, so a hung command blocks whoever awaits it.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Run `command` and return its raw output.
    ///
    /// Only failures to reach the device are errors here; the success
    /// convention is applied by [`Gateway::invoke`].
    async fn execute(&self, command: &str, args: &[String]) -> Result<CommandOutput, TransportError>;

    /// Run `command` and require its stderr to start with "OK".
    async fn invoke(&self, command: &str, args: &[String]) -> Result<CommandOutput, TransportError> {
        tracing::debug!(command, args = ?args, "invoking gateway command");
        let output = self.execute(command, args).await?;
        output.ensure_ok(command, args)
    }
}
