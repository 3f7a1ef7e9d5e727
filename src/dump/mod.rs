// ABOUTME: Chunked schema and data dump algorithm
// ABOUTME: Drives a DumpSource table by table and writes a replayable SQL script

pub mod writer;

use crate::config::DumpConfig;
use crate::error::{DumpError, Result};
use crate::filters::TableFilter;
use crate::mysql::reader::MysqlSource;
use mysql_async::Value;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use writer::SqlWriter;

/// One windowed fetch of table rows
#[derive(Debug, Clone, Copy)]
pub struct ChunkRequest<'a> {
    pub table: &'a str,
    pub columns: &'a [String],
    /// Columns to order by; empty means engine order
    pub order_by: &'a [String],
    pub limit: usize,
    pub offset: u64,
}

/// Read-only view of a database as needed by the dump
///
/// Implemented over a live MySQL session by [`MysqlSource`].
#[allow(async_fn_in_trait)]
pub trait DumpSource {
    fn database_name(&self) -> &str;

    async fn list_tables(&mut self) -> Result<Vec<String>>;

    async fn create_statement(&mut self, table: &str) -> Result<String>;

    async fn row_count(&mut self, table: &str) -> Result<u64>;

    async fn column_names(&mut self, table: &str) -> Result<Vec<String>>;

    async fn primary_key(&mut self, table: &str) -> Result<Vec<String>>;

    /// Fetch at most `request.limit` rows, each aligned with `request.columns`
    async fn fetch_chunk(&mut self, request: &ChunkRequest<'_>) -> Result<Vec<Vec<Value>>>;
}

/// Counters collected while dumping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpSummary {
    pub tables: usize,
    pub skipped_tables: usize,
    pub rows: u64,
    pub insert_statements: usize,
}

/// Produces a SQL dump of one database
#[derive(Debug)]
pub struct Dumper {
    config: DumpConfig,
    filter: TableFilter,
}

impl Dumper {
    /// Validate the config and prepare the table filter
    ///
    /// This is the only place a fully layered config is validated.
    pub fn new(config: DumpConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let filter =
            TableFilter::new(config.include_tables.clone(), config.exclude_tables.clone())?;
        if !filter.is_empty() {
            tracing::info!("Table filter active: {}", filter);
        }
        Ok(Self { config, filter })
    }

    /// Connect to the configured server and dump it to `output_path`
    ///
    /// Returns the size of the written file in bytes. The connection is
    /// released whether or not the dump succeeds; a failed dump leaves the
    /// partial file on disk.
    ///
    /// # Errors
    ///
    /// - [`DumpError::Connection`] if the server cannot be reached (no file is created)
    /// - [`DumpError::Io`] if the output file cannot be opened or written
    /// - [`DumpError::Query`] if any statement fails mid-dump
    pub async fn run(&self, output_path: &Path) -> Result<u64> {
        let mut source = MysqlSource::open(&self.config).await?;

        let outcome = self.dump_to_file(&mut source, output_path).await;
        let closed = source.close().await;

        let size = outcome?;
        closed?;
        Ok(size)
    }

    /// Dump `source` into a freshly truncated file and return its size
    pub async fn dump_to_file<S: DumpSource>(
        &self,
        source: &mut S,
        output_path: &Path,
    ) -> Result<u64> {
        let file = File::create(output_path).map_err(|e| {
            DumpError::io(
                format!("Cannot open output file: {}", output_path.display()),
                e,
            )
        })?;

        let generated_at = chrono::Local::now()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();

        let mut writer = SqlWriter::new(BufWriter::new(file));
        let summary = self.dump(source, &mut writer, &generated_at).await?;
        writer
            .finish()
            .map_err(|e| write_error(output_path, e))?;

        let size = fs::metadata(output_path)
            .map_err(|e| {
                DumpError::io(
                    format!("Cannot read size of {}", output_path.display()),
                    e,
                )
            })?
            .len();

        tracing::info!(
            "Dumped {} table(s), {} row(s) in {} INSERT statement(s) to {}",
            summary.tables,
            summary.rows,
            summary.insert_statements,
            output_path.display()
        );

        Ok(size)
    }

    /// Write the complete script for `source` into `writer`
    ///
    /// Tables are processed in the order the source lists them. A failure
    /// stops the dump immediately, before the epilogue is written.
    pub async fn dump<S: DumpSource, W: Write>(
        &self,
        source: &mut S,
        writer: &mut SqlWriter<W>,
        generated_at: &str,
    ) -> Result<DumpSummary> {
        let database = source.database_name().to_string();
        let mut summary = DumpSummary::default();

        writer
            .write_header(&database, generated_at)
            .map_err(sink_error)?;
        writer.write_preamble().map_err(sink_error)?;

        let tables = source.list_tables().await?;

        for table in &tables {
            if !self.filter.should_dump(table) {
                tracing::debug!("Skipping table '{}' (filtered)", table);
                summary.skipped_tables += 1;
                continue;
            }

            tracing::info!("Backing up table: {}", table);
            self.dump_table(source, writer, table, &mut summary).await?;
            summary.tables += 1;
        }

        writer.write_epilogue().map_err(sink_error)?;

        Ok(summary)
    }

    async fn dump_table<S: DumpSource, W: Write>(
        &self,
        source: &mut S,
        writer: &mut SqlWriter<W>,
        table: &str,
        summary: &mut DumpSummary,
    ) -> Result<()> {
        let create_sql = source.create_statement(table).await?;
        writer
            .write_table_definition(table, &create_sql)
            .map_err(sink_error)?;

        let row_count = source.row_count(table).await?;
        if row_count == 0 {
            return Ok(());
        }

        let columns = source.column_names(table).await?;
        if columns.is_empty() {
            tracing::warn!("Table '{}' has no insertable columns", table);
            return Ok(());
        }

        let order_by = if self.config.order_by_primary_key {
            source.primary_key(table).await?
        } else {
            Vec::new()
        };
        if self.config.order_by_primary_key && order_by.is_empty() {
            tracing::debug!(
                "Table '{}' has no primary key; paging in engine order",
                table
            );
        }

        let chunk_size = self.config.chunk_size;
        let mut offset: u64 = 0;
        while offset < row_count {
            let request = ChunkRequest {
                table,
                columns: &columns,
                order_by: &order_by,
                limit: chunk_size,
                offset,
            };
            let rows = source.fetch_chunk(&request).await?;
            if rows.is_empty() {
                tracing::debug!(
                    "Table '{}' returned no rows at offset {} (expected {})",
                    table,
                    offset,
                    row_count
                );
                break;
            }

            let written = writer
                .write_insert(table, &columns, &rows)
                .map_err(sink_error)?;
            summary.rows += written as u64;
            summary.insert_statements += 1;

            tracing::debug!(
                "Wrote {} row(s) of '{}' at offset {}",
                written,
                table,
                offset
            );

            offset += chunk_size as u64;
        }

        Ok(())
    }
}

fn sink_error(e: std::io::Error) -> DumpError {
    DumpError::io("Failed to write dump output", e)
}

fn write_error(path: &Path, e: std::io::Error) -> DumpError {
    DumpError::io(format!("Failed to write {}", path.display()), e)
}
