pub mod charts;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod sequencer;
pub mod ui;

pub use error::{ReleaseError, Result};
