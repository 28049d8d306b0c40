use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::{info, warn};

use crate::config::LedgerConfig;
use crate::domain::Account;
use crate::storage::{AccountRepository, Repository, unique_violation};

use super::AppError;

/// Register/login by voter id and password.
///
/// Accounts are not linked to the ledger's voters: a voter id here is just
/// a login name.
pub struct AccountService {
    repo: AccountRepository,
}

impl AccountService {
    pub fn new(repo: AccountRepository) -> Self {
        Self { repo }
    }

    /// Open the database described by `config` and create the accounts table.
    pub async fn init(config: &LedgerConfig) -> Result<Self, AppError> {
        let ledger = Repository::connect(config).await?;
        let repo = AccountRepository::new(ledger.pool().clone());
        repo.migrate().await?;
        Ok(Self::new(repo))
    }

    pub async fn register(&self, voter_id: &str, password: &str) -> Result<Account, AppError> {
        let voter_id = voter_id.trim();
        if voter_id.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Voter ID and password are required".to_string(),
            ));
        }

        if self.repo.get_credentials(voter_id).await?.is_some() {
            return Err(AppError::DuplicateAccount(voter_id.to_string()));
        }

        let hash = hash_password(password)?;
        let account = self
            .repo
            .insert_account(voter_id, &hash)
            .await
            .map_err(|e| {
                if unique_violation(&e).is_some() {
                    AppError::DuplicateAccount(voter_id.to_string())
                } else {
                    AppError::Database(e)
                }
            })?;

        info!(voter_id, "account registered");
        Ok(account)
    }

    /// Check a voter id and password. Unknown ids and wrong passwords fail
    /// the same way.
    pub async fn login(&self, voter_id: &str, password: &str) -> Result<Account, AppError> {
        let Some((account, hash)) = self.repo.get_credentials(voter_id.trim()).await? else {
            warn!(voter_id, "login failed");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(password, &hash)? {
            warn!(voter_id, "login failed");
            return Err(AppError::InvalidCredentials);
        }

        info!(voter_id, "login succeeded");
        Ok(account)
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts().await?)
    }
}

/// Hash a password using Argon2 with a fresh random salt.
fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Database(anyhow::anyhow!("Failed to hash password: {e}")))
}

/// Verify a password against a stored PHC hash string.
fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Database(anyhow::anyhow!("Invalid stored hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_salted_and_verifiable() {
        let first = hash_password("correct horse").unwrap();
        let second = hash_password("correct horse").unwrap();

        assert_ne!(first, second, "each hash gets its own salt");
        assert!(first.starts_with("$argon2"));
        assert!(!first.contains("correct horse"));
        assert!(verify_password("correct horse", &first).unwrap());
        assert!(!verify_password("battery staple", &first).unwrap());
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
