//! Shared utilities for the Kapichat binaries.

pub mod logger;
pub mod time;
