//! Leo Common - Shared configuration, errors, and logging for Leo Clubs services.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Error types and handling utilities
//! - Logging setup
//! - Small string helpers used when logging user content

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod util;

pub use config::{ChatConfig, Config, GeminiConfig, NetworkConfig, ObservabilityConfig};
pub use error::{Error, Result};

