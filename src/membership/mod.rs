// ABOUTME: Membership module - antenna and group identifiers plus the
// ABOUTME: registry client for the external group membership service.

mod registry;
mod types;

pub use registry::*;
pub use types::*;
