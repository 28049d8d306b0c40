use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::{LedgerService, ResultsSelection};
use crate::domain::{Candidate, Election, ElectionId, Standing, Vote, Voter};

/// Full copy of the ledger for archiving
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub elections: Vec<Election>,
    pub voters: Vec<Voter>,
    pub candidates: Vec<Candidate>,
    pub votes: Vec<Vote>,
}

/// Exporter for converting ledger data to CSV or JSON
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    async fn standings(&self, election_id: ElectionId) -> Result<(Election, Vec<Standing>)> {
        let page = self.service.results(Some(election_id)).await?;
        match page.selection {
            ResultsSelection::Selected {
                election,
                standings,
                ..
            } => Ok((election, standings)),
            _ => anyhow::bail!("Election not found: {}", election_id),
        }
    }

    /// Export one election's ranked results to CSV
    pub async fn export_results_csv<W: Write>(
        &self,
        election_id: ElectionId,
        writer: W,
    ) -> Result<usize> {
        let (_, standings) = self.standings(election_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "rank",
            "candidate_id",
            "candidate",
            "party",
            "votes",
            "share",
        ])?;

        for standing in &standings {
            let candidate = &standing.candidate;
            csv_writer.write_record([
                standing.rank.to_string(),
                candidate.id.to_string(),
                candidate.name.clone(),
                candidate.party.clone().unwrap_or_default(),
                candidate.vote_count.to_string(),
                format!("{:.2}", standing.share),
            ])?;
        }

        csv_writer.flush()?;
        Ok(standings.len())
    }

    /// Export one election's ranked results to JSON
    pub async fn export_results_json<W: Write>(
        &self,
        election_id: ElectionId,
        mut writer: W,
    ) -> Result<usize> {
        let (election, standings) = self.standings(election_id).await?;

        let json = serde_json::to_string_pretty(&serde_json::json!({
            "election": election,
            "standings": standings,
        }))?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(standings.len())
    }

    /// Export voters to CSV, in the same layout `Importer` reads
    pub async fn export_voters_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let voters = self.service.list_voters().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["voter_id", "name", "email", "phone", "has_voted"])?;

        for voter in &voters {
            csv_writer.write_record([
                voter.voter_id.as_str(),
                voter.name.as_str(),
                voter.email.as_deref().unwrap_or(""),
                voter.phone.as_deref().unwrap_or(""),
                if voter.has_voted { "1" } else { "0" },
            ])?;
        }

        csv_writer.flush()?;
        Ok(voters.len())
    }

    /// Export the full ledger as a JSON snapshot
    pub async fn export_snapshot_json<W: Write>(&self, mut writer: W) -> Result<LedgerSnapshot> {
        let elections = self.service.list_elections().await?;
        let voters = self.service.list_voters().await?;
        let candidates = self
            .service
            .list_candidates()
            .await?
            .into_iter()
            .map(|entry| entry.candidate)
            .collect();
        let votes = self.service.list_votes().await?;

        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            elections,
            voters,
            candidates,
            votes,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
