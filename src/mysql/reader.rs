// ABOUTME: MySQL database introspection and chunked data reading
// ABOUTME: Read-only queries behind the DumpSource seam, streamed row by row

use crate::config::DumpConfig;
use crate::dump::{ChunkRequest, DumpSource};
use crate::error::{DumpError, Result};
use crate::mysql::{quote_column_list, quote_identifier};
use mysql_async::{prelude::*, Conn, Value};

/// Upper bound on rows reserved up front for one chunk
const MAX_PREALLOCATED_ROWS: usize = 1024;

/// List the base tables of the connected database
///
/// Uses `SHOW FULL TABLES`, so tables come back in whatever order the
/// server returns them. Views are skipped: their definition is not a
/// `CREATE TABLE` statement.
///
/// # Arguments
///
/// * `conn` - MySQL connection with a default database selected
///
/// # Returns
///
/// Table names in server order
///
/// # Errors
///
/// Returns [`DumpError::Query`] if `SHOW FULL TABLES` fails.
///
/// # Examples
///
/// ```no_run
/// # use mysql_backup::{DumpConfig, mysql::{connect_mysql, reader::list_tables}};
/// # async fn example() -> anyhow::Result<()> {
/// let config = DumpConfig::from_env()?;
/// let mut conn = connect_mysql(&config).await?;
/// let tables = list_tables(&mut conn).await?;
/// println!("Found {} tables", tables.len());
/// # Ok(())
/// # }
/// ```
pub async fn list_tables(conn: &mut Conn) -> Result<Vec<String>> {
    let rows: Vec<(String, String)> = conn
        .query("SHOW FULL TABLES")
        .await
        .map_err(|e| DumpError::query("Failed to list tables", e))?;

    let mut tables = Vec::with_capacity(rows.len());
    for (name, table_type) in rows {
        if table_type == "BASE TABLE" {
            tables.push(name);
        } else {
            tracing::debug!("Skipping '{}' ({})", name, table_type);
        }
    }

    tracing::info!("Found {} table(s)", tables.len());

    Ok(tables)
}

/// Fetch the server's own `CREATE TABLE` statement for a table
pub async fn show_create_table(conn: &mut Conn, table_name: &str) -> Result<String> {
    let query = format!("SHOW CREATE TABLE {}", quote_identifier(table_name));
    let context = || format!("Failed to read definition of table '{}'", table_name);

    let row: Option<(String, String)> = conn
        .query_first(query.as_str())
        .await
        .map_err(|e| DumpError::query(context(), e))?;

    match row {
        Some((_, create)) => Ok(create),
        None => Err(DumpError::query(context(), "SHOW CREATE TABLE returned no rows")),
    }
}

/// Get row count for a MySQL table
///
/// Executes `COUNT(*)` once per table; the dump pages up to this count.
///
/// # Arguments
///
/// * `conn` - MySQL connection
/// * `table_name` - Table to count, quoted before use
///
/// # Returns
///
/// Number of rows (0 if the server returns no row)
///
/// # Errors
///
/// Returns [`DumpError::Query`] if the count query fails.
///
/// # Examples
///
/// ```no_run
/// # use mysql_backup::{DumpConfig, mysql::{connect_mysql, reader::get_table_row_count}};
/// # async fn example() -> anyhow::Result<()> {
/// let config = DumpConfig::from_env()?;
/// let mut conn = connect_mysql(&config).await?;
/// let count = get_table_row_count(&mut conn, "users").await?;
/// println!("users has {} rows", count);
/// # Ok(())
/// # }
/// ```
pub async fn get_table_row_count(conn: &mut Conn, table_name: &str) -> Result<u64> {
    let query = format!("SELECT COUNT(*) FROM {}", quote_identifier(table_name));

    let count: Option<u64> = conn
        .query_first(query.as_str())
        .await
        .map_err(|e| {
            DumpError::query(format!("Failed to count rows in table '{}'", table_name), e)
        })?;

    let count = count.unwrap_or(0);

    tracing::debug!("Table '{}' has {} rows", table_name, count);

    Ok(count)
}

/// Get the insertable column names of a table, in ordinal order
///
/// Generated columns are left out: the server computes them and rejects
/// explicit values on replay.
pub async fn get_column_names(conn: &mut Conn, table_name: &str) -> Result<Vec<String>> {
    let query = r#"
        SELECT COLUMN_NAME
        FROM INFORMATION_SCHEMA.COLUMNS
        WHERE TABLE_SCHEMA = DATABASE()
        AND TABLE_NAME = ?
        AND EXTRA NOT LIKE '%VIRTUAL GENERATED%'
        AND EXTRA NOT LIKE '%STORED GENERATED%'
        ORDER BY ORDINAL_POSITION
    "#;

    let columns: Vec<String> = conn
        .exec(query, (table_name,))
        .await
        .map_err(|e| {
            DumpError::query(
                format!("Failed to get column names for table '{}'", table_name),
                e,
            )
        })?;

    Ok(columns)
}

/// Get the primary key columns of a table, in key order (empty if none)
pub async fn get_primary_key(conn: &mut Conn, table_name: &str) -> Result<Vec<String>> {
    let query = r#"
        SELECT COLUMN_NAME
        FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
        WHERE TABLE_SCHEMA = DATABASE()
        AND TABLE_NAME = ?
        AND CONSTRAINT_NAME = 'PRIMARY'
        ORDER BY ORDINAL_POSITION
    "#;

    let columns: Vec<String> = conn
        .exec(query, (table_name,))
        .await
        .map_err(|e| {
            DumpError::query(
                format!("Failed to get primary key for table '{}'", table_name),
                e,
            )
        })?;

    Ok(columns)
}

/// Build the windowed SELECT for one chunk
///
/// # Examples
///
/// ```
/// # use mysql_backup::dump::ChunkRequest;
/// # use mysql_backup::mysql::reader::build_chunk_query;
/// let columns = vec!["id".to_string(), "name".to_string()];
/// let order_by = vec!["id".to_string()];
/// let request = ChunkRequest {
///     table: "users",
///     columns: &columns,
///     order_by: &order_by,
///     limit: 1000,
///     offset: 2000,
/// };
/// assert_eq!(
///     build_chunk_query(&request),
///     "SELECT `id`, `name` FROM `users` ORDER BY `id` LIMIT 1000 OFFSET 2000"
/// );
/// ```
pub fn build_chunk_query(request: &ChunkRequest<'_>) -> String {
    let mut query = format!(
        "SELECT {} FROM {}",
        quote_column_list(request.columns),
        quote_identifier(request.table)
    );
    if !request.order_by.is_empty() {
        query.push_str(" ORDER BY ");
        query.push_str(&quote_column_list(request.order_by));
    }
    query.push_str(&format!(
        " LIMIT {} OFFSET {}",
        request.limit, request.offset
    ));
    query
}

/// Read one chunk of rows, consuming the result stream row by row
///
/// Values keep the driver's text-protocol form, so non-NULL values arrive
/// as `Value::Bytes`.
///
/// # Arguments
///
/// * `conn` - MySQL connection
/// * `request` - Table, column list, ordering and window to read
///
/// # Returns
///
/// At most `request.limit` rows, each aligned with `request.columns`
///
/// # Errors
///
/// Returns [`DumpError::Query`] if the SELECT fails or the stream breaks
/// mid-chunk.
///
/// # Examples
///
/// ```no_run
/// # use mysql_backup::{DumpConfig, dump::ChunkRequest};
/// # use mysql_backup::mysql::{connect_mysql, reader::read_chunk};
/// # async fn example() -> anyhow::Result<()> {
/// let config = DumpConfig::from_env()?;
/// let mut conn = connect_mysql(&config).await?;
/// let columns = vec!["id".to_string(), "email".to_string()];
/// let request = ChunkRequest {
///     table: "users",
///     columns: &columns,
///     order_by: &[],
///     limit: 1000,
///     offset: 0,
/// };
/// let rows = read_chunk(&mut conn, &request).await?;
/// # Ok(())
/// # }
/// ```
pub async fn read_chunk(conn: &mut Conn, request: &ChunkRequest<'_>) -> Result<Vec<Vec<Value>>> {
    let query = build_chunk_query(request);
    let context = || {
        format!(
            "Failed to read rows {}..{} from table '{}'",
            request.offset,
            request.offset + request.limit as u64,
            request.table
        )
    };

    let mut result = conn
        .query_iter(query.as_str())
        .await
        .map_err(|e| DumpError::query(context(), e))?;

    let mut rows = Vec::with_capacity(request.limit.min(MAX_PREALLOCATED_ROWS));
    while let Some(mut row) = result
        .next()
        .await
        .map_err(|e| DumpError::query(context(), e))?
    {
        let values: Vec<Value> = (0..row.len())
            .map(|idx| row.take::<Value, _>(idx).unwrap_or(Value::NULL))
            .collect();
        rows.push(values);
    }
    result
        .drop_result()
        .await
        .map_err(|e| DumpError::query(context(), e))?;

    Ok(rows)
}

/// A live MySQL session used as the source of a dump
pub struct MysqlSource {
    conn: Conn,
    database: String,
    in_snapshot: bool,
}

impl MysqlSource {
    /// Connect and optionally open a snapshot
    ///
    /// With `consistent_snapshot`, the whole run reads from one
    /// REPEATABLE READ, read-only transaction, so every table reflects the
    /// same point in time.
    pub async fn open(config: &DumpConfig) -> Result<Self> {
        let conn = crate::mysql::connect_mysql(config).await?;

        let mut source = Self {
            conn,
            database: config.database.clone(),
            in_snapshot: false,
        };

        if config.consistent_snapshot {
            source.begin_snapshot().await?;
        }

        Ok(source)
    }

    async fn begin_snapshot(&mut self) -> Result<()> {
        let context = "Failed to start consistent snapshot";
        self.conn
            .query_drop("SET SESSION TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .await
            .map_err(|e| DumpError::query(context, e))?;
        self.conn
            .query_drop("START TRANSACTION WITH CONSISTENT SNAPSHOT, READ ONLY")
            .await
            .map_err(|e| DumpError::query(context, e))?;
        self.in_snapshot = true;

        tracing::debug!("Started consistent snapshot transaction");

        Ok(())
    }

    /// End the snapshot (if any) and disconnect
    pub async fn close(mut self) -> Result<()> {
        if self.in_snapshot {
            self.conn
                .query_drop("COMMIT")
                .await
                .map_err(|e| DumpError::query("Failed to end snapshot transaction", e))?;
        }
        self.conn
            .disconnect()
            .await
            .map_err(|e| DumpError::query("Failed to disconnect from MySQL", e))?;
        Ok(())
    }
}

impl DumpSource for MysqlSource {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn list_tables(&mut self) -> Result<Vec<String>> {
        list_tables(&mut self.conn).await
    }

    async fn create_statement(&mut self, table: &str) -> Result<String> {
        show_create_table(&mut self.conn, table).await
    }

    async fn row_count(&mut self, table: &str) -> Result<u64> {
        get_table_row_count(&mut self.conn, table).await
    }

    async fn column_names(&mut self, table: &str) -> Result<Vec<String>> {
        get_column_names(&mut self.conn, table).await
    }

    async fn primary_key(&mut self, table: &str) -> Result<Vec<String>> {
        get_primary_key(&mut self.conn, table).await
    }

    async fn fetch_chunk(&mut self, request: &ChunkRequest<'_>) -> Result<Vec<Vec<Value>>> {
        read_chunk(&mut self.conn, request).await
    }
}
