// ABOUTME: Gateway module - the narrow command interface to devices.
// ABOUTME: Trait, output convention, subprocess and simulated implementations.

mod output;
mod process;
mod simulated;
mod traits;

pub use output::*;
pub use process::*;
pub use simulated::*;
pub use traits::*;

#[cfg(test)]
mod output_test;
