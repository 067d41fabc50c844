//! tagdelay: delay selected channels of a time-tagger stream and re-merge
//!
//! Records on channels in the start pattern are held back by a fixed delay
//! in a bounded ring buffer and replayed in time order among the remaining
//! records, which pass straight through.

pub mod classifier;
pub mod common;
pub mod config;
pub mod driver;
pub mod emulator;
pub mod format;
pub mod merger;
pub mod ring;
