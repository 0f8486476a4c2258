//! Configuration module for harvest
//!
//! Handles loading settings from TOML files, environment variable overrides
//! and validation of the acquisition limits.

pub mod config;

pub use config::*;
