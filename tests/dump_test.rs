// ABOUTME: Dump algorithm tests against an in-memory source
// ABOUTME: Covers pagination, NULL rendering, quoting, filtering, and failure framing

use mysql_async::Value;
use mysql_backup::dump::writer::SqlWriter;
use mysql_backup::dump::{ChunkRequest, DumpSource};
use mysql_backup::error::Result;
use mysql_backup::{DumpConfig, DumpError, DumpSummary, Dumper};
use std::collections::HashMap;

/// In-memory table used by the fake source
struct MemoryTable {
    name: String,
    create_sql: String,
    columns: Vec<String>,
    primary_key: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    fn new(name: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let column_defs: Vec<String> = columns.iter().map(|c| format!("  `{}` text", c)).collect();
        Self {
            name: name.to_string(),
            create_sql: format!("CREATE TABLE `{}` (\n{}\n)", name, column_defs.join(",\n")),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            primary_key: vec![columns[0].to_string()],
            rows,
        }
    }
}

/// Fake source that pages over vectors the way LIMIT/OFFSET would
#[derive(Default)]
struct MemorySource {
    tables: Vec<MemoryTable>,
    /// Row counts reported instead of the real length (stale counts)
    reported_counts: HashMap<String, u64>,
    /// Fail the Nth fetch of this table
    fail_fetch: Option<(String, usize)>,
    fetches: Vec<ChunkLog>,
}

#[derive(Debug, Clone, PartialEq)]
struct ChunkLog {
    table: String,
    order_by: Vec<String>,
    limit: usize,
    offset: u64,
}

impl MemorySource {
    fn with_tables(tables: Vec<MemoryTable>) -> Self {
        Self {
            tables,
            ..Default::default()
        }
    }

    fn table(&self, name: &str) -> Result<&MemoryTable> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| DumpError::query(format!("table '{}'", name), "doesn't exist"))
    }
}

impl DumpSource for MemorySource {
    fn database_name(&self) -> &str {
        "testdb"
    }

    async fn list_tables(&mut self) -> Result<Vec<String>> {
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn create_statement(&mut self, table: &str) -> Result<String> {
        Ok(self.table(table)?.create_sql.clone())
    }

    async fn row_count(&mut self, table: &str) -> Result<u64> {
        if let Some(count) = self.reported_counts.get(table) {
            return Ok(*count);
        }
        Ok(self.table(table)?.rows.len() as u64)
    }

    async fn column_names(&mut self, table: &str) -> Result<Vec<String>> {
        Ok(self.table(table)?.columns.clone())
    }

    async fn primary_key(&mut self, table: &str) -> Result<Vec<String>> {
        Ok(self.table(table)?.primary_key.clone())
    }

    async fn fetch_chunk(&mut self, request: &ChunkRequest<'_>) -> Result<Vec<Vec<Value>>> {
        self.fetches.push(ChunkLog {
            table: request.table.to_string(),
            order_by: request.order_by.to_vec(),
            limit: request.limit,
            offset: request.offset,
        });

        if let Some((ref table, nth)) = self.fail_fetch {
            let seen = self
                .fetches
                .iter()
                .filter(|f| &f.table == table)
                .count();
            if table == request.table && seen == nth {
                return Err(DumpError::query(
                    format!("Failed to read rows from table '{}'", table),
                    "Lost connection to MySQL server during query",
                ));
            }
        }

        let rows = &self.table(request.table)?.rows;
        let start = (request.offset as usize).min(rows.len());
        let end = (start + request.limit).min(rows.len());
        Ok(rows[start..end].to_vec())
    }
}

/// Text-protocol value, the form a live MySQL session yields for non-NULL data
fn cell(s: &str) -> Value {
    Value::Bytes(s.as_bytes().to_vec())
}

fn numbered_rows(n: usize) -> Vec<Vec<Value>> {
    (0..n)
        .map(|i| vec![cell(&(i + 1).to_string()), cell(&format!("user{}", i + 1))])
        .collect()
}

fn dumper_with<F>(tweak: F) -> Dumper
where
    F: FnOnce(&mut DumpConfig),
{
    let mut config = DumpConfig::from_lookup(|_| None).unwrap();
    tweak(&mut config);
    Dumper::new(config).unwrap()
}

async fn render(dumper: &Dumper, source: &mut MemorySource) -> (String, DumpSummary) {
    let mut writer = SqlWriter::new(Vec::new());
    let summary = dumper
        .dump(source, &mut writer, "2024-01-15 10:30:45")
        .await
        .unwrap();
    let text = String::from_utf8(writer.finish().unwrap()).unwrap();
    (text, summary)
}

/// Number of value tuples in each INSERT statement, in output order
fn tuples_per_insert(text: &str) -> Vec<usize> {
    text.split("INSERT INTO ")
        .skip(1)
        .map(|stmt| {
            let body = stmt.split(";\n").next().unwrap();
            body.lines().skip(1).count()
        })
        .collect()
}

#[tokio::test]
async fn test_users_2500_rows_three_inserts() {
    let dumper = dumper_with(|_| {});
    let mut source = MemorySource::with_tables(vec![MemoryTable::new(
        "users",
        &["id", "name"],
        numbered_rows(2500),
    )]);

    let (text, summary) = render(&dumper, &mut source).await;

    assert_eq!(tuples_per_insert(&text), vec![1000, 1000, 500]);
    assert_eq!(summary.insert_statements, 3);
    assert_eq!(summary.rows, 2500);
    assert_eq!(summary.tables, 1);

    let offsets: Vec<u64> = source.fetches.iter().map(|f| f.offset).collect();
    assert_eq!(offsets, vec![0, 1000, 2000]);

    // Rows come out in source order across chunk boundaries
    let first = text.find("('1', 'user1')").unwrap();
    let boundary = text.find("('1001', 'user1001')").unwrap();
    let last = text.find("('2500', 'user2500')").unwrap();
    assert!(first < boundary && boundary < last);
}

#[tokio::test]
async fn test_insert_count_is_ceiling_of_rows_over_chunk() {
    for (rows, chunk, expected) in [(1, 3, 1), (3, 3, 1), (4, 3, 2), (10, 3, 4), (7, 1, 7)] {
        let dumper = dumper_with(|c| c.chunk_size = chunk);
        let mut source = MemorySource::with_tables(vec![MemoryTable::new(
            "items",
            &["id", "label"],
            numbered_rows(rows),
        )]);

        let (text, summary) = render(&dumper, &mut source).await;
        let tuples = tuples_per_insert(&text);

        assert_eq!(
            tuples.len(),
            expected,
            "rows={} chunk={}",
            rows,
            chunk
        );
        assert_eq!(tuples.iter().sum::<usize>(), rows);
        assert_eq!(summary.rows, rows as u64);
    }
}

#[tokio::test]
async fn test_empty_table_gets_ddl_but_no_insert() {
    let dumper = dumper_with(|_| {});
    let mut source = MemorySource::with_tables(vec![
        MemoryTable::new("empty_table", &["id", "data"], vec![]),
        MemoryTable::new("posts", &["id", "title"], numbered_rows(2)),
    ]);

    let (text, summary) = render(&dumper, &mut source).await;

    assert!(text.contains("DROP TABLE IF EXISTS `empty_table`;\nCREATE TABLE `empty_table`"));
    assert!(!text.contains("INSERT INTO `empty_table`"));
    assert!(text.contains("INSERT INTO `posts` (`id`, `title`) VALUES"));
    assert_eq!(summary.tables, 2);
    assert!(source.fetches.iter().all(|f| f.table == "posts"));
}

#[tokio::test]
async fn test_full_script_layout() {
    let dumper = dumper_with(|_| {});
    let mut source = MemorySource::with_tables(vec![MemoryTable::new(
        "users",
        &["id", "name"],
        vec![
            vec![cell("1"), cell("Alice")],
            vec![cell("2"), Value::NULL],
        ],
    )]);

    let (text, _) = render(&dumper, &mut source).await;

    let expected = "-- MySQL Backup\n\
                    -- Generated: 2024-01-15 10:30:45\n\
                    -- Database: testdb\n\
                    -- --------------------------------------------------------\n\n\
                    SET FOREIGN_KEY_CHECKS=0;\n\
                    SET SQL_MODE='NO_AUTO_VALUE_ON_ZERO';\n\
                    SET AUTOCOMMIT=0;\n\
                    START TRANSACTION;\n\n\
                    DROP TABLE IF EXISTS `users`;\n\
                    CREATE TABLE `users` (\n  `id` text,\n  `name` text\n);\n\n\
                    INSERT INTO `users` (`id`, `name`) VALUES\n\
                    ('1', 'Alice'),\n\
                    ('2', NULL);\n\n\
                    SET FOREIGN_KEY_CHECKS=1;\n\
                    COMMIT;\n";
    assert_eq!(text, expected);
}

#[tokio::test]
async fn test_null_only_unquoted_for_real_nulls() {
    let dumper = dumper_with(|_| {});
    let mut source = MemorySource::with_tables(vec![MemoryTable::new(
        "notes",
        &["id", "body"],
        vec![
            vec![cell("1"), Value::NULL],
            vec![cell("2"), cell("NULL")],
        ],
    )]);

    let (script, _) = render(&dumper, &mut source).await;

    assert!(script.contains("('1', NULL)"));
    assert!(script.contains("('2', 'NULL')"));
}

#[tokio::test]
async fn test_backslashes_escaped_in_dumped_rows() {
    let dumper = dumper_with(|_| {});
    let mut source = MemorySource::with_tables(vec![MemoryTable::new(
        "paths",
        &["id", "path"],
        vec![
            vec![cell("1"), cell("C:\\")],
            vec![cell("2"), cell("it's")],
        ],
    )]);

    let (script, _) = render(&dumper, &mut source).await;

    // Replay runs under the preamble's SQL_MODE, where backslash escapes apply
    assert!(script.contains("SET SQL_MODE='NO_AUTO_VALUE_ON_ZERO';"));
    assert!(script.contains("('1', 'C:\\\\'),\n('2', 'it\\'s');"), "got {}", script);
}

#[tokio::test]
async fn test_identifiers_always_quoted() {
    let dumper = dumper_with(|_| {});
    let mut source = MemorySource::with_tables(vec![MemoryTable::new(
        "select",
        &["id", "we`ird"],
        numbered_rows(1),
    )]);

    let (text, _) = render(&dumper, &mut source).await;

    assert!(text.contains("DROP TABLE IF EXISTS `select`;"));
    assert!(text.contains("INSERT INTO `select` (`id`, `we``ird`) VALUES"));
}

#[tokio::test]
async fn test_stale_count_stops_on_empty_fetch() {
    let dumper = dumper_with(|c| c.chunk_size = 10);
    let mut source = MemorySource::with_tables(vec![MemoryTable::new(
        "events",
        &["id", "kind"],
        numbered_rows(15),
    )]);
    // Count taken before rows were deleted: claims 50, only 15 remain
    source.reported_counts.insert("events".to_string(), 50);

    let (text, summary) = render(&dumper, &mut source).await;

    assert_eq!(tuples_per_insert(&text), vec![10, 5]);
    assert_eq!(summary.rows, 15);
    // Third fetch (offset 20) comes back empty and ends pagination
    assert_eq!(source.fetches.len(), 3);
    assert!(text.ends_with("SET FOREIGN_KEY_CHECKS=1;\nCOMMIT;\n"));
}

#[tokio::test]
async fn test_order_by_primary_key_toggle() {
    let ordered = dumper_with(|_| {});
    let mut source = MemorySource::with_tables(vec![MemoryTable::new(
        "users",
        &["id", "name"],
        numbered_rows(3),
    )]);
    render(&ordered, &mut source).await;
    assert_eq!(source.fetches[0].order_by, vec!["id".to_string()]);

    let unordered = dumper_with(|c| c.order_by_primary_key = false);
    let mut source = MemorySource::with_tables(vec![MemoryTable::new(
        "users",
        &["id", "name"],
        numbered_rows(3),
    )]);
    render(&unordered, &mut source).await;
    assert!(source.fetches[0].order_by.is_empty());
    assert_eq!(source.fetches[0].limit, 1000);
}

#[tokio::test]
async fn test_tables_dumped_in_source_order_with_filter() {
    let dumper = dumper_with(|c| c.exclude_tables = Some(vec!["sessions".to_string()]));
    let mut source = MemorySource::with_tables(vec![
        MemoryTable::new("zeta", &["id"], vec![vec![cell("1")]]),
        MemoryTable::new("sessions", &["id"], vec![vec![cell("1")]]),
        MemoryTable::new("alpha", &["id"], vec![vec![cell("1")]]),
    ]);

    let (text, summary) = render(&dumper, &mut source).await;

    let zeta = text.find("DROP TABLE IF EXISTS `zeta`").unwrap();
    let alpha = text.find("DROP TABLE IF EXISTS `alpha`").unwrap();
    assert!(zeta < alpha);
    assert!(!text.contains("`sessions`"));
    assert_eq!(summary.tables, 2);
    assert_eq!(summary.skipped_tables, 1);
}

#[tokio::test]
async fn test_query_failure_leaves_file_without_footer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("backup.sql");

    let dumper = dumper_with(|c| c.chunk_size = 2);
    let mut source = MemorySource::with_tables(vec![MemoryTable::new(
        "orders",
        &["id", "ref"],
        numbered_rows(5),
    )]);
    source.fail_fetch = Some(("orders".to_string(), 2));

    let err = dumper.dump_to_file(&mut source, &path).await.unwrap_err();
    assert!(matches!(err, DumpError::Query { .. }));
    assert!(err.to_string().contains("Lost connection"));

    let partial = std::fs::read_to_string(&path).unwrap();
    assert!(partial.starts_with("-- MySQL Backup\n"));
    assert!(partial.contains("INSERT INTO `orders`"));
    assert!(!partial.contains("COMMIT;"));
}

#[tokio::test]
async fn test_dump_to_file_returns_size_and_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("backup.sql");
    std::fs::write(&path, "x".repeat(100_000)).unwrap();

    let dumper = dumper_with(|_| {});
    let mut source = MemorySource::with_tables(vec![MemoryTable::new(
        "users",
        &["id", "name"],
        numbered_rows(3),
    )]);

    let size = dumper.dump_to_file(&mut source, &path).await.unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();

    assert_eq!(size, contents.len() as u64);
    assert!(!contents.contains("xxxx"));
    assert!(contents.ends_with("COMMIT;\n"));
}

#[tokio::test]
async fn test_unwritable_output_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("backup.sql");

    let dumper = dumper_with(|_| {});
    let mut source = MemorySource::default();

    let err = dumper.dump_to_file(&mut source, &path).await.unwrap_err();
    assert!(matches!(err, DumpError::Io { .. }));
    assert!(err.to_string().contains("Cannot open output file"));
    assert!(source.fetches.is_empty());
}
