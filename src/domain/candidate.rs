use serde::{Deserialize, Serialize};

use super::{ElectionId, voter::non_blank};

pub type CandidateId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub election_id: ElectionId,
    pub name: String,
    pub party: Option<String>,
    /// Denormalized tally. Always equal to the number of votes that
    /// reference this candidate.
    pub vote_count: i64,
}

/// A candidate joined with the name of the election it runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEntry {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub election_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCandidate {
    pub election_id: ElectionId,
    pub name: String,
    pub party: Option<String>,
}

impl NewCandidate {
    pub fn new(election_id: ElectionId, name: impl Into<String>) -> Self {
        Self {
            election_id,
            name: name.into().trim().to_string(),
            party: None,
        }
    }

    pub fn with_party(mut self, party: Option<String>) -> Self {
        self.party = non_blank(party);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Candidate name and election are required".to_string());
        }
        Ok(())
    }
}
