//! # Formats Module
//!
//! On-disk formats for the two fitted artifacts.
//!
//! This module contains:
//! - JSON artifacts (`.json`), the form exporters write
//! - Binary artifacts (postcard + header), any other extension
//! - Startup loading and cross-artifact validation
//!
//! File I/O is limited to reading whole files; nothing here writes to disk
//! except the explicit encode helpers used by the app's `pack` command.

mod artifact;

pub use artifact::*;
