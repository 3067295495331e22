// ABOUTME: Coordinator module for exclusive antenna reservation.
// ABOUTME: Verify-move-verify protocol with compensating rollback.

mod coordinator;

pub use coordinator::{AntennaCoordinator, ReleaseReport};
