use serde::Serialize;

use crate::domain::{CandidateEntry, Election, ElectionId, Standing};

/// Aggregate view of the whole ledger.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub election_count: i64,
    pub voter_count: i64,
    pub candidate_count: i64,
    pub vote_count: i64,
    /// Every candidate, by election name then most votes first
    pub candidates: Vec<CandidateEntry>,
}

/// Results page: the elections to choose from plus the chosen one, if any.
#[derive(Debug, Clone, Serialize)]
pub struct ResultsPage {
    pub elections: Vec<Election>,
    pub selection: ResultsSelection,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResultsSelection {
    /// No election was requested
    None,
    /// The requested id does not match any election
    Invalid { election_id: ElectionId },
    Selected {
        election: Election,
        total_votes: i64,
        standings: Vec<Standing>,
    },
}

impl ResultsPage {
    pub fn election(&self) -> Option<&Election> {
        match &self.selection {
            ResultsSelection::Selected { election, .. } => Some(election),
            _ => None,
        }
    }

    pub fn standings(&self) -> &[Standing] {
        match &self.selection {
            ResultsSelection::Selected { standings, .. } => standings,
            _ => &[],
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.selection, ResultsSelection::Invalid { .. })
    }
}
