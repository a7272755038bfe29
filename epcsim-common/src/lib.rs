//! Common types and utilities for epcsim
//!
//! This crate provides shared types, configuration structures, and utilities
//! used across the epcsim crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::MmeConfig;
pub use error::Error;
pub use logging::{init_logging, init_logging_with_filter, LogLevel};
pub use types::{Gummei, Guti, Imei, Imsi, Plmn, UeId};
