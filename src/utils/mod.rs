//! Utilities Module
//!
//! Common utilities used across the crate.

pub mod hex_format;
pub mod logging;
pub mod signing_config;

pub use hex_format::*;
pub use signing_config::*;
