// ABOUTME: MySQL connection setup and dialect quoting rules
// ABOUTME: Opens utf8mb4 sessions and quotes identifiers with backticks

pub mod converter;
pub mod reader;

use crate::config::DumpConfig;
use crate::error::{DumpError, Result};
use mysql_async::{Conn, OptsBuilder};

/// Quote a MySQL identifier with backticks
///
/// Every identifier is quoted, even when it would be legal bare. Embedded
/// backticks are doubled, so any table or column name round-trips.
///
/// # Examples
///
/// ```
/// # use mysql_backup::mysql::quote_identifier;
/// assert_eq!(quote_identifier("users"), "`users`");
/// assert_eq!(quote_identifier("odd`name"), "`odd``name`");
/// ```
pub fn quote_identifier(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

/// Quote and join a column list as `` `a`, `b`, `c` ``
pub fn quote_column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build connection options for the configured server
///
/// The session character set is forced to utf8mb4 so 4-byte code points
/// survive the round trip.
pub fn connection_opts(config: &DumpConfig) -> OptsBuilder {
    OptsBuilder::default()
        .ip_or_hostname(config.host.clone())
        .tcp_port(config.port)
        .user(Some(config.username.clone()))
        .pass(Some(config.password.clone()))
        .db_name(Some(config.database.clone()))
        .init(vec!["SET NAMES utf8mb4"])
}

/// Connect to the MySQL server named in the config
///
/// Opens a single session with the options from [`connection_opts`]; the
/// database named in the config becomes the session default.
///
/// # Arguments
///
/// * `config` - Host, port, credentials and database to use
///
/// # Returns
///
/// An open MySQL connection
///
/// # Errors
///
/// Returns [`DumpError::Connection`] if:
/// - The host cannot be resolved or reached
/// - The credentials are rejected
/// - The database does not exist
///
/// # Examples
///
/// ```no_run
/// # use mysql_backup::{DumpConfig, mysql::connect_mysql};
/// # async fn example() -> anyhow::Result<()> {
/// let config = DumpConfig::from_env()?;
/// let conn = connect_mysql(&config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn connect_mysql(config: &DumpConfig) -> Result<Conn> {
    tracing::info!(
        "Connecting to MySQL at {}:{} (database '{}')",
        config.host,
        config.port,
        config.database
    );

    let conn = Conn::new(connection_opts(config))
        .await
        .map_err(|source| DumpError::Connection {
            host: format!("{}:{}", config.host, config.port),
            source,
        })?;

    tracing::debug!("Successfully connected to MySQL");

    Ok(conn)
}
