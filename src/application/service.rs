use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::domain::{
    build_integrity_report, build_standings, Candidate, CandidateEntry, CandidateId, Election,
    ElectionId, IntegrityReport, NewCandidate, NewElection, NewVoter, Vote, Voter,
};
use crate::storage::{unique_violation, Repository};

use super::{AppError, Dashboard, ResultsPage, ResultsSelection};

/// Application service providing the ledger's operations.
/// This is the primary interface for any client (CLI, API, etc.).
pub struct LedgerService {
    repo: Repository,
}

/// A successfully cast vote with the names needed to confirm it.
pub struct CastVoteResult {
    pub vote: Vote,
    pub voter: Voter,
    pub election_name: String,
    pub candidate_name: String,
}

impl LedgerService {
    /// Create a new ledger service over an existing repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Open the database described by `config`, creating the schema if needed.
    pub async fn init(config: &LedgerConfig) -> Result<Self, AppError> {
        let repo = Repository::init(config).await?;
        debug!(path = %config.database_path().display(), "ledger initialized");
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(config: &LedgerConfig) -> Result<Self, AppError> {
        let repo = Repository::connect(config).await?;
        Ok(Self::new(repo))
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // ========================
    // Elections
    // ========================

    /// Register a new election. Elections start inactive.
    pub async fn create_election(
        &self,
        name: &str,
        election_type: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Election, AppError> {
        let new = NewElection::new(name, election_type).with_dates(start_date, end_date);
        new.validate().map_err(AppError::Validation)?;

        if self.repo.get_election_by_name(&new.name).await?.is_some() {
            return Err(AppError::DuplicateElectionName(new.name));
        }

        let election = self.repo.insert_election(&new).await.map_err(|e| {
            if unique_violation(&e).is_some() {
                AppError::DuplicateElectionName(new.name.clone())
            } else {
                AppError::Database(e)
            }
        })?;

        info!(election_id = election.id, name = %election.name, "election created");
        Ok(election)
    }

    pub async fn get_election(&self, id: ElectionId) -> Result<Election, AppError> {
        self.repo
            .get_election(id)
            .await?
            .ok_or(AppError::UnknownElection(id))
    }

    pub async fn list_elections(&self) -> Result<Vec<Election>, AppError> {
        Ok(self.repo.list_elections().await?)
    }

    // ========================
    // Voters
    // ========================

    /// Register a voter. Blank email/phone are stored as absent.
    pub async fn create_voter(
        &self,
        voter_id: &str,
        name: &str,
        email: Option<String>,
        phone: Option<String>,
    ) -> Result<Voter, AppError> {
        let new = NewVoter::new(voter_id, name)
            .with_email(email)
            .with_phone(phone);
        self.check_new_voter(&new).await?;

        let voter = self.repo.insert_voter(&new).await.map_err(|e| {
            match unique_violation(&e) {
                Some(msg) if msg.contains("voters.email") => {
                    AppError::DuplicateEmail(new.email.clone().unwrap_or_default())
                }
                Some(_) => AppError::DuplicateVoterId(new.voter_id.clone()),
                None => AppError::Database(e),
            }
        })?;

        info!(voter_id = %voter.voter_id, "voter registered");
        Ok(voter)
    }

    /// Everything `create_voter` checks before writing: required fields and
    /// clashes with stored voter ids or emails.
    pub async fn check_new_voter(&self, new: &NewVoter) -> Result<(), AppError> {
        new.validate().map_err(AppError::Validation)?;

        if self.repo.get_voter(&new.voter_id).await?.is_some() {
            return Err(AppError::DuplicateVoterId(new.voter_id.clone()));
        }
        if let Some(email) = &new.email {
            if self.repo.get_voter_by_email(email).await?.is_some() {
                return Err(AppError::DuplicateEmail(email.clone()));
            }
        }
        Ok(())
    }

    /// Look a voter up by external voter id.
    pub async fn get_voter(&self, voter_id: &str) -> Result<Voter, AppError> {
        self.repo
            .get_voter(voter_id.trim())
            .await?
            .ok_or_else(|| AppError::VoterNotFound(voter_id.trim().to_string()))
    }

    pub async fn list_voters(&self) -> Result<Vec<Voter>, AppError> {
        Ok(self.repo.list_voters().await?)
    }

    // ========================
    // Candidates
    // ========================

    pub async fn create_candidate(
        &self,
        election_id: ElectionId,
        name: &str,
        party: Option<String>,
    ) -> Result<Candidate, AppError> {
        let new = NewCandidate::new(election_id, name).with_party(party);
        new.validate().map_err(AppError::Validation)?;

        let election = self.get_election(election_id).await?;
        let candidate = self.repo.insert_candidate(&new).await?;

        info!(
            candidate_id = candidate.id,
            election = %election.name,
            name = %candidate.name,
            "candidate added"
        );
        Ok(candidate)
    }

    /// All candidates with their election's name, by election name then candidate name.
    pub async fn list_candidates(&self) -> Result<Vec<CandidateEntry>, AppError> {
        Ok(self.repo.list_candidates().await?)
    }

    // ========================
    // Voting
    // ========================

    /// Cast a vote for `candidate_id` in `election_id` on behalf of the
    /// voter with external id `voter_id`.
    ///
    /// The audit row, the candidate's tally and the voter's `has_voted`
    /// flag change together or not at all. `has_voted` is global: it is
    /// set no matter which election the vote is for.
    pub async fn cast_vote(
        &self,
        voter_id: &str,
        election_id: ElectionId,
        candidate_id: CandidateId,
    ) -> Result<CastVoteResult, AppError> {
        let voter_id = voter_id.trim();
        if voter_id.is_empty() {
            return Err(AppError::Validation(
                "Voter ID, election and candidate are required".to_string(),
            ));
        }

        let voter = match self.repo.get_voter(voter_id).await? {
            Some(voter) => voter,
            None => {
                warn!(voter_id, election_id, "vote rejected: unknown voter");
                return Err(AppError::VoterNotFound(voter_id.to_string()));
            }
        };

        let election = self.get_election(election_id).await?;
        let candidate = self
            .repo
            .get_candidate(candidate_id)
            .await?
            .filter(|c| c.election_id == election_id)
            .ok_or(AppError::UnknownCandidate {
                candidate_id,
                election_id,
            })?;

        if self.repo.find_vote(voter.id, election_id).await?.is_some() {
            warn!(voter_id, election_id, "vote rejected: already voted");
            return Err(AppError::AlreadyVoted {
                voter_id: voter_id.to_string(),
                election_id,
            });
        }

        let vote = self
            .repo
            .record_vote(voter.id, election_id, candidate_id, Utc::now())
            .await
            .map_err(|e| {
                if unique_violation(&e).is_some() {
                    warn!(voter_id, election_id, "vote rejected: concurrent ballot won");
                    AppError::AlreadyVoted {
                        voter_id: voter_id.to_string(),
                        election_id,
                    }
                } else {
                    let reason = format!("{e:#}");
                    warn!(voter_id, election_id, error = %reason, "vote rolled back");
                    AppError::Transaction(reason)
                }
            })?;

        info!(
            vote_id = vote.id,
            voter_id,
            election_id,
            candidate_id,
            "vote recorded"
        );

        Ok(CastVoteResult {
            vote,
            voter: Voter {
                has_voted: true,
                ..voter
            },
            election_name: election.name,
            candidate_name: candidate.name,
        })
    }

    /// Whether the voter has a vote recorded in this specific election.
    pub async fn has_voted_in(
        &self,
        voter_id: &str,
        election_id: ElectionId,
    ) -> Result<bool, AppError> {
        let voter = self.get_voter(voter_id).await?;
        Ok(self.repo.find_vote(voter.id, election_id).await?.is_some())
    }

    pub async fn list_votes(&self) -> Result<Vec<Vote>, AppError> {
        Ok(self.repo.list_votes().await?)
    }

    // ========================
    // Reporting
    // ========================

    /// Counts of every entity plus all candidates ranked within their election.
    pub async fn dashboard(&self) -> Result<Dashboard, AppError> {
        let counts = self.repo.counts().await?;
        let candidates = self.repo.list_candidates_by_tally().await?;

        Ok(Dashboard {
            election_count: counts.elections,
            voter_count: counts.voters,
            candidate_count: counts.candidates,
            vote_count: counts.votes,
            candidates,
        })
    }

    /// Results for one election. An id that matches no election yields an
    /// `Invalid` selection rather than an error.
    pub async fn results(&self, election_id: Option<ElectionId>) -> Result<ResultsPage, AppError> {
        let elections = self.repo.list_elections().await?;

        let selection = match election_id {
            None => ResultsSelection::None,
            Some(id) => match elections.iter().find(|e| e.id == id) {
                None => {
                    debug!(election_id = id, "results requested for unknown election");
                    ResultsSelection::Invalid { election_id: id }
                }
                Some(election) => {
                    let candidates = self.repo.list_candidates_for_election(id).await?;
                    let total_votes = self.repo.count_votes_for_election(id).await?;
                    ResultsSelection::Selected {
                        election: election.clone(),
                        total_votes,
                        standings: build_standings(candidates),
                    }
                }
            },
        };

        Ok(ResultsPage {
            elections,
            selection,
        })
    }

    // ========================
    // Integrity
    // ========================

    /// Recompute tallies from the vote log and report any disagreement.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let stats = self.repo.get_integrity_stats().await?;
        let counted_total = self.repo.sum_tallies().await?;
        let report = build_integrity_report(&stats, counted_total);

        if !report.is_healthy() {
            warn!(issues = report.issues.len(), "ledger integrity check failed");
        }
        Ok(report)
    }
}
