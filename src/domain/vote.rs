use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CandidateId, ElectionId, VoterKey};

pub type VoteId = i64;

/// Audit record of a single cast vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub election_id: ElectionId,
    pub voter: VoterKey,
    pub candidate_id: CandidateId,
    pub cast_at: DateTime<Utc>,
}
