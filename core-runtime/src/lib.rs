//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the player crates:
//! - Logging and tracing setup ([`logging`])
//! - Host configuration and bridge resolution ([`config`])
//! - Broadcast event bus with typed events ([`events`])

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
