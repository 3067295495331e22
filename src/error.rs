// ABOUTME: Defines all error types for the ata-control library using thiserror.
// ABOUTME: Each subsystem has its own error enum, unified under AtaError.

use crate::membership::{AntennaId, Group};

/// Top-level error type for the ata-control library.
#[derive(Debug, thiserror::Error)]
pub enum AtaError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Reservation error: {0}")]
    Reservation(#[from] ReservationError),

    #[error("Fan-out error: {0}")]
    FanOut(#[from] FanOutError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from the device command gateway.
///
/// Always fatal to the call that produced them and never retried inside the
/// library.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("command '{command}' could not be run: {source}")]
    Unreachable {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command '{command} {}' failed: {stderr}", .args.join(" "))]
    Rejected {
        command: String,
        args: Vec<String>,
        stderr: String,
    },

    #[error("command '{command}' returned a malformed response: {reason}")]
    Malformed { command: String, reason: String },
}

impl TransportError {
    /// The literal stderr text when the gateway rejected the command.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            TransportError::Rejected { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Where in the move protocol a conflict was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictStage {
    /// Antennas were missing from the source group before any mutation.
    PreFlight,
    /// Antennas were missing from the destination group after the move.
    PostMove,
}

impl std::fmt::Display for ConflictStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictStage::PreFlight => write!(f, "pre-flight"),
            ConflictStage::PostMove => write!(f, "post-move"),
        }
    }
}

/// Requested antennas that were not where the protocol expected them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationConflict {
    /// Offending antennas, in request order.
    pub antennas: Vec<AntennaId>,
    /// The group they were expected to be members of.
    pub expected_group: Group,
    pub stage: ConflictStage,
}

impl std::fmt::Display for ReservationConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ants: Vec<&str> = self.antennas.iter().map(AntennaId::as_str).collect();
        write!(
            f,
            "antennas [{}] not in group '{}' ({})",
            ants.join(","),
            self.expected_group,
            self.stage
        )
    }
}

impl std::error::Error for ReservationConflict {}

/// Errors from the antenna resource coordinator.
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("empty antenna list")]
    EmptyRequest,

    #[error("reservation conflict: {0}")]
    Conflict(ReservationConflict),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(
        "{conflict}; compensation could not be verified for [{}]",
        .stranded.iter().map(AntennaId::as_str).collect::<Vec<_>>().join(",")
    )]
    CompensationUnverified {
        conflict: ReservationConflict,
        stranded: Vec<AntennaId>,
    },
}

impl ReservationError {
    /// The conflict carried by this error, if any.
    pub fn conflict(&self) -> Option<&ReservationConflict> {
        match self {
            ReservationError::Conflict(c) => Some(c),
            ReservationError::CompensationUnverified { conflict, .. } => Some(conflict),
            _ => None,
        }
    }
}

/// A single fan-out task failed. Isolated to its own slot.
#[derive(Debug, thiserror::Error)]
#[error("task for '{target}' failed: {source}")]
pub struct TaskError {
    pub target: String,
    #[source]
    pub source: anyhow::Error,
}

/// Errors from the fan-out executor.
#[derive(Debug, thiserror::Error)]
pub enum FanOutError {
    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("batch of {size} tasks exceeds the limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },
}

/// Errors from device control operations.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("no targets given")]
    EmptyTargets,

    #[error("{targets} targets but {values} values")]
    LengthMismatch { targets: usize, values: usize },

    #[error("attenuation {value} dB for '{target}' outside {min}..={max} dB")]
    AttenuationOutOfRange {
        target: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("could not parse '{command}' output: {reason}")]
    Parse { command: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    FanOut(#[from] FanOutError),
}

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
