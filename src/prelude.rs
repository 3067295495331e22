// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use ata_control::prelude::*;` to get started quickly.

pub use crate::config::{
    ArrayConfig, AtaConfig, CompensationPolicy, CoordinatorConfig, DeviceCommands, FanOutConfig,
    GatewayConfig, ListingFormat, MembershipConfig,
};
pub use crate::coordinator::{AntennaCoordinator, ReleaseReport};
pub use crate::devices::{AttenuationRequest, DeviceController, LnaState, PamReadings};
pub use crate::error::{
    AtaError, ConfigError, ConflictStage, DeviceError, FanOutError, ReservationConflict,
    ReservationError, TaskError, TransportError,
};
pub use crate::fanout::{
    FanOutBatch, FanOutExecutor, FanOutOutcome, FanOutPolicy, FanOutReport, FanOutTask,
};
pub use crate::gateway::{
    CommandOutput, Fault, Gateway, Invocation, ListingStyle, ProcessGateway, SimulatedArray,
};
pub use crate::logging::{LogFormat, init_logging};
pub use crate::membership::{AntennaId, Group, GroupRegistry};
