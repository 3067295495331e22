// ABOUTME: Device control module - attenuators, RF switch, LNAs, PAMs and parking.
// ABOUTME: Each operation is a thin command over the gateway.

mod controller;
mod types;

pub use controller::{AttenuationRequest, DeviceController};
pub use types::{ATTENUATION_MAX_DB, ATTENUATION_MIN_DB, LnaState, PamReadings};
