// ABOUTME: Renders the SQL text of a dump into any io::Write sink
// ABOUTME: Header, transaction envelope, table DDL, and multi-row INSERTs

use crate::mysql::converter::push_row_tuple;
use crate::mysql::{quote_column_list, quote_identifier};
use mysql_async::Value;
use std::io::{self, Write};

/// Tool identifier written in the header comment
pub const TOOL_NAME: &str = "MySQL";

/// Writes dump statements in replay order
///
/// Value literals are backslash-escaped, matching the SQL mode the preamble
/// sets for the replaying session.
pub struct SqlWriter<W: Write> {
    out: W,
    row_buf: String,
}

impl<W: Write> SqlWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            row_buf: String::new(),
        }
    }

    /// Comment block naming the tool, generation time, and database
    pub fn write_header(&mut self, database: &str, generated_at: &str) -> io::Result<()> {
        writeln!(self.out, "-- {} Backup", TOOL_NAME)?;
        writeln!(self.out, "-- Generated: {}", generated_at)?;
        writeln!(self.out, "-- Database: {}", database)?;
        writeln!(
            self.out,
            "-- --------------------------------------------------------"
        )?;
        writeln!(self.out)
    }

    /// Envelope opening, executed by the restore step
    pub fn write_preamble(&mut self) -> io::Result<()> {
        self.out.write_all(
            b"SET FOREIGN_KEY_CHECKS=0;\n\
              SET SQL_MODE='NO_AUTO_VALUE_ON_ZERO';\n\
              SET AUTOCOMMIT=0;\n\
              START TRANSACTION;\n\n",
        )
    }

    /// `DROP TABLE IF EXISTS` followed by the server's verbatim CREATE statement
    pub fn write_table_definition(&mut self, table: &str, create_sql: &str) -> io::Result<()> {
        writeln!(self.out, "DROP TABLE IF EXISTS {};", quote_identifier(table))?;
        write!(self.out, "{};\n\n", create_sql)
    }

    /// One multi-row INSERT for a chunk; writes nothing for an empty chunk
    ///
    /// Returns the number of tuples written.
    pub fn write_insert(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> io::Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        writeln!(
            self.out,
            "INSERT INTO {} ({}) VALUES",
            quote_identifier(table),
            quote_column_list(columns)
        )?;

        for (idx, row) in rows.iter().enumerate() {
            self.row_buf.clear();
            if idx > 0 {
                self.row_buf.push_str(",\n");
            }
            push_row_tuple(&mut self.row_buf, row);
            self.out.write_all(self.row_buf.as_bytes())?;
        }

        self.out.write_all(b";\n\n")?;
        Ok(rows.len())
    }

    /// Envelope closing: restore FK checks and commit
    pub fn write_epilogue(&mut self) -> io::Result<()> {
        self.out.write_all(b"SET FOREIGN_KEY_CHECKS=1;\nCOMMIT;\n")
    }

    /// Flush buffered output and hand back the sink
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}
