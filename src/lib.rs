// ABOUTME: Library module for mysql-backup
// ABOUTME: Exports the dump algorithm, MySQL source, and config for the binary and tests

pub mod config;
pub mod dump;
pub mod error;
pub mod filters;
pub mod mysql;
pub mod utils;

pub use config::DumpConfig;
pub use dump::{DumpSource, DumpSummary, Dumper};
pub use error::DumpError;
