// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use suffragium::application::LedgerService;
use suffragium::config::LedgerConfig;
use suffragium::domain::{Candidate, Election, Voter};
use tempfile::TempDir;

/// Config pointing at a fresh database inside `temp_dir`
pub fn test_config(temp_dir: &TempDir) -> LedgerConfig {
    LedgerConfig::new(temp_dir.path().join("test.db")).create_if_missing(true)
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = LedgerService::init(&test_config(&temp_dir)).await?;
    Ok((service, temp_dir))
}

/// Test fixture: an election with its candidates
pub struct SeededElection {
    pub election: Election,
    pub candidates: Vec<Candidate>,
}

impl SeededElection {
    pub fn candidate(&self, name: &str) -> &Candidate {
        self.candidates
            .iter()
            .find(|c| c.name == name)
            .expect("candidate seeded")
    }
}

/// Create an election and one candidate per name
pub async fn seed_election(
    service: &LedgerService,
    name: &str,
    candidate_names: &[&str],
) -> Result<SeededElection> {
    let election = service
        .create_election(name, "General", None, None)
        .await?;

    let mut candidates = Vec::new();
    for candidate_name in candidate_names {
        candidates.push(
            service
                .create_candidate(election.id, candidate_name, None)
                .await?,
        );
    }

    Ok(SeededElection {
        election,
        candidates,
    })
}

/// Register `count` voters named `{prefix}-1`, `{prefix}-2`, ...
pub async fn register_voters(
    service: &LedgerService,
    prefix: &str,
    count: usize,
) -> Result<Vec<Voter>> {
    let mut voters = Vec::with_capacity(count);
    for i in 1..=count {
        voters.push(
            service
                .create_voter(&format!("{prefix}-{i}"), &format!("Voter {i}"), None, None)
                .await?,
        );
    }
    Ok(voters)
}

/// Cast `votes` votes for one candidate using fresh voters
pub async fn cast_votes_for(
    service: &LedgerService,
    seeded: &SeededElection,
    candidate_name: &str,
    votes: usize,
) -> Result<()> {
    let candidate_id = seeded.candidate(candidate_name).id;
    let prefix = format!("{}-{}", seeded.election.id, candidate_name);
    for voter in register_voters(service, &prefix, votes).await? {
        service
            .cast_vote(&voter.voter_id, seeded.election.id, candidate_id)
            .await?;
    }
    Ok(())
}
