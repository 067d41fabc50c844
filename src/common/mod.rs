//! Shared infrastructure: coded errors and CLI definitions

pub mod cli;
pub mod error;

pub use cli::{DelayArgs, DumpArgs, EmulatorArgs};
pub use error::{DelayError, DelayResult};
