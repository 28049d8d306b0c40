// Application layer - use cases and orchestration over the repository

#[cfg(feature = "accounts")]
pub mod accounts;
pub mod error;
pub mod reporting;
pub mod service;

#[cfg(feature = "accounts")]
pub use accounts::AccountService;
pub use error::*;
pub use reporting::*;
pub use service::*;
