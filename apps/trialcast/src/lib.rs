//! # Trialcast Library
//!
//! This library exposes the Trialcast modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod error;

pub use error::AppError;

// Re-export trialcast_core for convenience
pub use trialcast_core;
