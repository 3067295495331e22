// ABOUTME: Root module for ata-control - antenna reservation and device control.
// ABOUTME: Re-exports all public types from submodules.

pub mod config;
pub mod coordinator;
pub mod devices;
pub mod error;
pub mod fanout;
pub mod gateway;
pub mod logging;
pub mod membership;
pub mod prelude;

pub use error::AtaError;
