// ABOUTME: Table filtering for selective dumps
// ABOUTME: Handles include/exclude table lists

use anyhow::{bail, Result};
use std::fmt;

/// Represents table filtering rules
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    include_tables: Option<Vec<String>>,
    exclude_tables: Option<Vec<String>>,
}

impl TableFilter {
    /// Creates a filter from CLI or config-file lists
    pub fn new(
        include_tables: Option<Vec<String>>,
        exclude_tables: Option<Vec<String>>,
    ) -> Result<Self> {
        if include_tables.is_some() && exclude_tables.is_some() {
            bail!("Cannot use both --include-tables and --exclude-tables");
        }

        for table in include_tables.iter().chain(exclude_tables.iter()).flatten() {
            if table.trim().is_empty() {
                bail!("Table names in filters cannot be empty");
            }
        }

        Ok(Self {
            include_tables,
            exclude_tables,
        })
    }

    /// Checks if any filters are active
    pub fn is_empty(&self) -> bool {
        self.include_tables.is_none() && self.exclude_tables.is_none()
    }

    /// Determines if a table should be dumped
    pub fn should_dump(&self, table_name: &str) -> bool {
        // If include list exists, table must be in it
        if let Some(ref include) = self.include_tables {
            if !include.iter().any(|t| t == table_name) {
                return false;
            }
        }

        // If exclude list exists, table must not be in it
        if let Some(ref exclude) = self.exclude_tables {
            if exclude.iter().any(|t| t == table_name) {
                return false;
            }
        }

        true
    }
}

impl fmt::Display for TableFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.include_tables, &self.exclude_tables) {
            (Some(include), _) => write!(f, "include {}", include.join(", ")),
            (None, Some(exclude)) => write!(f, "exclude {}", exclude.join(", ")),
            (None, None) => write!(f, "all tables"),
        }
    }
}
