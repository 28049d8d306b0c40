use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type AccountId = i64;

/// Login credentials for a voter.
///
/// This is a separate notion from [`Voter`](super::Voter): accounts live in
/// their own table and are never joined to the ledger's voters. The password
/// hash stays in storage and is not part of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub voter_id: String,
    pub created_at: DateTime<Utc>,
}
