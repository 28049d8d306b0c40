use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};

/// Default database file, relative to the working directory.
pub const DEFAULT_DATABASE: &str = "suffragium.db";

/// Everything needed to open the ledger's store. Passed explicitly to
/// [`LedgerService`](crate::application::LedgerService); there is no global.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub database_path: PathBuf,
    /// Create the database file when it does not exist yet
    pub create_if_missing: bool,
    /// How long a writer waits for the database lock before giving up
    pub busy_timeout: Duration,
    pub max_connections: u32,
}

impl LedgerConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            create_if_missing: false,
            busy_timeout: Duration::from_secs(5),
            max_connections: 5,
        }
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// SQLite connection options: foreign keys on, WAL journal.
    pub fn connect_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.database_path)
            .create_if_missing(self.create_if_missing)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(self.busy_timeout)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.database_path(), Path::new(DEFAULT_DATABASE));
        assert!(!config.create_if_missing);
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_pool_size_is_at_least_one() {
        let config = LedgerConfig::new("x.db").with_max_connections(0);
        assert_eq!(config.max_connections, 1);
    }
}
