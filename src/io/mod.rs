pub mod export;
pub mod import;

pub use export::{Exporter, LedgerSnapshot};
pub use import::{ImportError, ImportOptions, ImportResult, Importer};
