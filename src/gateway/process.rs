// ABOUTME: ProcessGateway - runs gateway commands as local or ssh subprocesses.
// ABOUTME: Captures stdout/stderr; routing comes from GatewayConfig.

use std::process::Stdio;

use async_trait::async_trait;

use super::{CommandOutput, Gateway};
use crate::config::GatewayConfig;
use crate::error::TransportError;

/// Gateway that spawns one subprocess per command.
///
/// Commands routed to a host run as `ssh <host> <command> <args...>`;
/// everything else runs locally.
#[derive(Debug, Clone, Default)]
pub struct ProcessGateway {
    config: GatewayConfig,
}

impl ProcessGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    fn build_command(&self, command: &str, args: &[String]) -> tokio::process::Command {
        let mut cmd = match self.config.route(command) {
            Some(host) => {
                let mut c = tokio::process::Command::new(&self.config.ssh_program);
                c.arg(host).arg(command).args(args);
                c
            }
            None => {
                let mut c = tokio::process::Command::new(command);
                c.args(args);
                c
            }
        };
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd
    }
}

#[async_trait]
impl Gateway for ProcessGateway {
    async fn execute(&self, command: &str, args: &[String]) -> Result<CommandOutput, TransportError> {
        let output = self
            .build_command(command, args)
            .output()
            .await
            .map_err(|source| TransportError::Unreachable {
                command: command.to_string(),
                source,
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::debug!(command, "{}", line);
        }

        Ok(CommandOutput::new(output.stdout, output.stderr))
    }
}
