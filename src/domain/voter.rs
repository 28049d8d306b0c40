use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Internal row id of a voter. Votes reference this, not the external id.
pub type VoterKey = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub id: VoterKey,
    /// External identifier, e.g. a national id number
    pub voter_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Reserved for biometric data. Stored as-is, never interpreted.
    pub face_embedding: Option<String>,
    /// Set once the voter has cast a vote in *any* election. It is not
    /// scoped per election; use `LedgerService::has_voted_in` for that.
    pub has_voted: bool,
    pub registered_at: DateTime<Utc>,
}

impl Voter {
    pub fn status(&self) -> VoterStatus {
        if self.has_voted {
            VoterStatus::Voted
        } else {
            VoterStatus::Registered
        }
    }
}

/// Lifecycle of a voter. There is no way back from `Voted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoterStatus {
    Registered,
    Voted,
}

impl VoterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoterStatus::Registered => "registered",
            VoterStatus::Voted => "voted",
        }
    }
}

impl std::fmt::Display for VoterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVoter {
    pub voter_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl NewVoter {
    pub fn new(voter_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            voter_id: voter_id.into().trim().to_string(),
            name: name.into().trim().to_string(),
            email: None,
            phone: None,
        }
    }

    /// Blank values are stored as NULL, so they never collide on the
    /// email uniqueness constraint.
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = non_blank(email);
        self
    }

    pub fn with_phone(mut self, phone: Option<String>) -> Self {
        self.phone = non_blank(phone);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.voter_id.is_empty() || self.name.is_empty() {
            return Err("Voter ID and name are required".to_string());
        }
        Ok(())
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
