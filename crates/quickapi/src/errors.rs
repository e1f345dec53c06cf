//! Errors raised while building or serving an application.

use thiserror::Error;

use common::AppError;
use routing::RouterError;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error(transparent)]
    Router(#[from] RouterError),

    #[error("Startup hook '{hook}' failed: {source}")]
    Startup { hook: String, source: AppError },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}
