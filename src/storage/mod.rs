#[cfg(feature = "accounts")]
mod accounts;
mod repository;

#[cfg(feature = "accounts")]
pub use accounts::*;
pub use repository::*;

/// SQL migration for the ledger schema
pub const MIGRATION_001_LEDGER: &str = include_str!("migrations/001_ledger.sql");

/// SQL migration for credential accounts
#[cfg(feature = "accounts")]
pub const MIGRATION_002_ACCOUNTS: &str = include_str!("migrations/002_accounts.sql");
