use thiserror::Error;

use crate::domain::{CandidateId, ElectionId};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Election with name \"{0}\" already exists")]
    DuplicateElectionName(String),

    #[error("Voter with ID \"{0}\" already exists")]
    DuplicateVoterId(String),

    #[error("Email \"{0}\" is already registered")]
    DuplicateEmail(String),

    #[error("An account for voter \"{0}\" already exists")]
    DuplicateAccount(String),

    #[error("Election not found: {0}")]
    UnknownElection(ElectionId),

    #[error("Candidate {candidate_id} is not running in election {election_id}")]
    UnknownCandidate {
        candidate_id: CandidateId,
        election_id: ElectionId,
    },

    #[error("Voter not found: {0}")]
    VoterNotFound(String),

    #[error("Voter {voter_id} has already voted in election {election_id}")]
    AlreadyVoted {
        voter_id: String,
        election_id: ElectionId,
    },

    #[error("Vote could not be recorded, nothing was changed: {0}")]
    Transaction(String),

    #[error("Invalid voter ID or password")]
    InvalidCredentials,

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// True for any unique-constraint style rejection.
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            AppError::DuplicateElectionName(_)
                | AppError::DuplicateVoterId(_)
                | AppError::DuplicateEmail(_)
                | AppError::DuplicateAccount(_)
        )
    }

    /// True when the request referenced a row that does not exist.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            AppError::UnknownElection(_) | AppError::UnknownCandidate { .. }
        )
    }
}
