//! Common types shared across the QuickAPI crates.
//!
//! This crate provides:
//! - Request-time error types rendered as `{"detail": ...}` JSON bodies
//! - Server configuration loaded from the environment

pub mod config;
pub mod error;

pub use config::ServerConfig;
pub use error::{AppError, AppResult, ErrorKind, HttpException, OptionExt, RaisedError, ValidationIssue};
