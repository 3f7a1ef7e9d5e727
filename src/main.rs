// ABOUTME: CLI entry point for mysql-backup
// ABOUTME: Resolves configuration, runs the dump, and maps the outcome to an exit code

use anyhow::Result;
use clap::Parser;
use mysql_backup::utils::{default_output_path, format_size};
use mysql_backup::{DumpConfig, Dumper};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "mysql-backup")]
#[command(about = "Dump a MySQL database's schema and data to a SQL script", long_about = None)]
struct Cli {
    /// Destination file (default: <backup_dir>/backup_YYYYMMDD_HHMMSS.sql)
    output: Option<PathBuf>,
    /// TOML file overriding environment settings
    #[arg(long)]
    config: Option<String>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    database: Option<String>,
    #[arg(long)]
    user: Option<String>,
    /// Rows per INSERT statement
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Dump only these tables (comma-separated)
    #[arg(long, value_delimiter = ',')]
    include_tables: Option<Vec<String>>,
    /// Skip these tables (comma-separated)
    #[arg(long, value_delimiter = ',')]
    exclude_tables: Option<Vec<String>>,
    /// Do not hold a consistent snapshot transaction across tables
    #[arg(long)]
    no_snapshot: bool,
    /// Page through rows in engine order instead of primary key order
    #[arg(long)]
    unordered: bool,
}

impl Cli {
    fn into_config(self) -> Result<(DumpConfig, Option<PathBuf>)> {
        let mut config = DumpConfig::from_env()?;
        if let Some(ref path) = self.config {
            config = config.merge_file(path)?;
        }

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(database) = self.database {
            config.database = database;
        }
        if let Some(user) = self.user {
            config.username = user;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if self.include_tables.is_some() {
            config.include_tables = self.include_tables;
        }
        if self.exclude_tables.is_some() {
            config.exclude_tables = self.exclude_tables;
        }
        if self.no_snapshot {
            config.consistent_snapshot = false;
        }
        if self.unordered {
            config.order_by_primary_key = false;
        }

        Ok((config, self.output))
    }
}

async fn backup(cli: Cli) -> Result<(PathBuf, u64)> {
    let (config, output) = cli.into_config()?;
    let output = output.unwrap_or_else(|| {
        default_output_path(&config.backup_dir, chrono::Local::now().naive_local())
    });

    tracing::debug!("Resolved configuration: {:?}", config);

    let dumper = Dumper::new(config)?;
    let size = dumper.run(&output).await?;

    Ok((output, size))
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging - default to INFO level if RUST_LOG not set.
    // Logs go to stderr; stdout carries only the final status line.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match backup(cli).await {
        Ok((path, size)) => {
            println!(
                "Backup completed: {} ({})",
                path.display(),
                format_size(size)
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
