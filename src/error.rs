// ABOUTME: Error taxonomy for a dump run
// ABOUTME: Separates connection, output sink, and query failures

use std::fmt::Display;
use thiserror::Error;

/// Errors that abort a dump run.
///
/// Every variant is fatal: the run stops at the first error and any partial
/// output file is left on disk as-is. Driver and I/O causes are kept as
/// `source`, so print with `{:#}` (via anyhow) to see the full chain.
#[derive(Debug, Error)]
pub enum DumpError {
    /// The server could not be reached or rejected the credentials.
    #[error("Failed to connect to MySQL at {host}")]
    Connection {
        host: String,
        #[source]
        source: mysql_async::Error,
    },

    /// The output file could not be opened, written, or inspected.
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A statement failed (or returned nothing usable) during the dump.
    #[error("{context}: {reason}")]
    Query { context: String, reason: String },
}

impl DumpError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        DumpError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn query(context: impl Into<String>, reason: impl Display) -> Self {
        DumpError::Query {
            context: context.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DumpError>;
