// ABOUTME: CommandOutput - raw stdout/stderr from a gateway command.
// ABOUTME: Implements the "stderr starts with OK" success convention.

use crate::error::TransportError;

/// Raw output of one gateway command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// A successful response carrying `stdout`.
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self::new(stdout, "OK\n")
    }

    /// A rejected response whose stderr is `message`.
    pub fn rejected(message: impl Into<Vec<u8>>) -> Self {
        Self::new(Vec::new(), message)
    }

    /// Whether stderr signals success. Stdout is not consulted.
    pub fn is_ok(&self) -> bool {
        self.stderr.starts_with(b"OK")
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Apply the success convention, turning any non-"OK" stderr into a
    /// `TransportError::Rejected` carrying the literal stderr text.
    pub fn ensure_ok(self, command: &str, args: &[String]) -> Result<Self, TransportError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(TransportError::Rejected {
                command: command.to_string(),
                args: args.to_vec(),
                stderr: self.stderr_text(),
            })
        }
    }
}
