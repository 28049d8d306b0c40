use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::config::LedgerConfig;
use crate::domain::{
    Candidate, CandidateEntry, CandidateId, CounterDrift, Election, ElectionId, IntegrityStats,
    NewCandidate, NewElection, NewVoter, Vote, Voter, VoterKey,
};

use super::MIGRATION_001_LEDGER;

const DATE_FORMAT: &str = "%Y-%m-%d";

const ELECTION_COLUMNS: &str =
    "id, name, election_type, start_date, end_date, is_active, created_at";
const VOTER_COLUMNS: &str =
    "id, voter_id, name, email, phone, face_embedding, has_voted, registered_at";

/// Row counts across the whole ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerCounts {
    pub elections: i64,
    pub voters: i64,
    pub candidates: i64,
    pub votes: i64,
}

/// Repository for persisting and querying elections, voters, candidates and votes.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool on the database described by `config`.
    pub async fn connect(config: &LedgerConfig) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(config.connect_options())
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to database {}",
                    config.database_path().display()
                )
            })?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_LEDGER)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(config: &LedgerConfig) -> Result<Self> {
        let repo = Self::connect(config).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// The underlying pool, for sharing with other stores on the same file.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ========================
    // Election operations
    // ========================

    pub async fn insert_election(&self, election: &NewElection) -> Result<Election> {
        let created_at = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO elections (name, election_type, start_date, end_date, is_active, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&election.name)
        .bind(&election.election_type)
        .bind(election.start_date.map(|d| d.format(DATE_FORMAT).to_string()))
        .bind(election.end_date.map(|d| d.format(DATE_FORMAT).to_string()))
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save election")?;

        Ok(Election {
            id: result.last_insert_rowid(),
            name: election.name.clone(),
            election_type: election.election_type.clone(),
            start_date: election.start_date,
            end_date: election.end_date,
            is_active: false,
            created_at,
        })
    }

    pub async fn get_election(&self, id: ElectionId) -> Result<Option<Election>> {
        let row = sqlx::query(&format!(
            "SELECT {ELECTION_COLUMNS} FROM elections WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch election")?;

        row.as_ref().map(Self::row_to_election).transpose()
    }

    pub async fn get_election_by_name(&self, name: &str) -> Result<Option<Election>> {
        let row = sqlx::query(&format!(
            "SELECT {ELECTION_COLUMNS} FROM elections WHERE name = ?"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch election by name")?;

        row.as_ref().map(Self::row_to_election).transpose()
    }

    /// List all elections in creation order.
    pub async fn list_elections(&self) -> Result<Vec<Election>> {
        let rows = sqlx::query(&format!(
            "SELECT {ELECTION_COLUMNS} FROM elections ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list elections")?;

        rows.iter().map(Self::row_to_election).collect()
    }

    fn row_to_election(row: &SqliteRow) -> Result<Election> {
        let start_date: Option<String> = row.get("start_date");
        let end_date: Option<String> = row.get("end_date");
        let created_at_str: String = row.get("created_at");

        Ok(Election {
            id: row.get("id"),
            name: row.get("name"),
            election_type: row.get("election_type"),
            start_date: parse_stored_date(start_date).context("Invalid start_date")?,
            end_date: parse_stored_date(end_date).context("Invalid end_date")?,
            is_active: row.get::<i32, _>("is_active") != 0,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
        })
    }

    // ========================
    // Voter operations
    // ========================

    pub async fn insert_voter(&self, voter: &NewVoter) -> Result<Voter> {
        let registered_at = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO voters (voter_id, name, email, phone, has_voted, registered_at)
            VALUES (?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&voter.voter_id)
        .bind(&voter.name)
        .bind(&voter.email)
        .bind(&voter.phone)
        .bind(registered_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save voter")?;

        Ok(Voter {
            id: result.last_insert_rowid(),
            voter_id: voter.voter_id.clone(),
            name: voter.name.clone(),
            email: voter.email.clone(),
            phone: voter.phone.clone(),
            face_embedding: None,
            has_voted: false,
            registered_at,
        })
    }

    /// Look a voter up by external voter id.
    pub async fn get_voter(&self, voter_id: &str) -> Result<Option<Voter>> {
        let row = sqlx::query(&format!(
            "SELECT {VOTER_COLUMNS} FROM voters WHERE voter_id = ?"
        ))
        .bind(voter_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch voter")?;

        row.as_ref().map(Self::row_to_voter).transpose()
    }

    pub async fn get_voter_by_email(&self, email: &str) -> Result<Option<Voter>> {
        let row = sqlx::query(&format!(
            "SELECT {VOTER_COLUMNS} FROM voters WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch voter by email")?;

        row.as_ref().map(Self::row_to_voter).transpose()
    }

    /// List all voters in registration order.
    pub async fn list_voters(&self) -> Result<Vec<Voter>> {
        let rows = sqlx::query(&format!("SELECT {VOTER_COLUMNS} FROM voters ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list voters")?;

        rows.iter().map(Self::row_to_voter).collect()
    }

    fn row_to_voter(row: &SqliteRow) -> Result<Voter> {
        let registered_at_str: String = row.get("registered_at");

        Ok(Voter {
            id: row.get("id"),
            voter_id: row.get("voter_id"),
            name: row.get("name"),
            email: row.get("email"),
            phone: row.get("phone"),
            face_embedding: row.get("face_embedding"),
            has_voted: row.get::<i32, _>("has_voted") != 0,
            registered_at: parse_timestamp(&registered_at_str)
                .context("Invalid registered_at timestamp")?,
        })
    }

    // ========================
    // Candidate operations
    // ========================

    pub async fn insert_candidate(&self, candidate: &NewCandidate) -> Result<Candidate> {
        let result = sqlx::query(
            r#"
            INSERT INTO candidates (election_id, name, party, vote_count)
            VALUES (?, ?, ?, 0)
            "#,
        )
        .bind(candidate.election_id)
        .bind(&candidate.name)
        .bind(&candidate.party)
        .execute(&self.pool)
        .await
        .context("Failed to save candidate")?;

        Ok(Candidate {
            id: result.last_insert_rowid(),
            election_id: candidate.election_id,
            name: candidate.name.clone(),
            party: candidate.party.clone(),
            vote_count: 0,
        })
    }

    pub async fn get_candidate(&self, id: CandidateId) -> Result<Option<Candidate>> {
        let row = sqlx::query(
            "SELECT id, election_id, name, party, vote_count FROM candidates WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch candidate")?;

        Ok(row.as_ref().map(Self::row_to_candidate))
    }

    /// All candidates with their election's name, by election name then candidate name.
    pub async fn list_candidates(&self) -> Result<Vec<CandidateEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.election_id, c.name, c.party, c.vote_count, e.name AS election_name
            FROM candidates c
            JOIN elections e ON e.id = c.election_id
            ORDER BY e.name, c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list candidates")?;

        Ok(rows.iter().map(Self::row_to_candidate_entry).collect())
    }

    /// All candidates by election name, then most votes first.
    pub async fn list_candidates_by_tally(&self) -> Result<Vec<CandidateEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.election_id, c.name, c.party, c.vote_count, e.name AS election_name
            FROM candidates c
            JOIN elections e ON e.id = c.election_id
            ORDER BY e.name, c.vote_count DESC, c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list candidate tallies")?;

        Ok(rows.iter().map(Self::row_to_candidate_entry).collect())
    }

    /// Candidates of one election, most votes first, ties by name.
    pub async fn list_candidates_for_election(
        &self,
        election_id: ElectionId,
    ) -> Result<Vec<Candidate>> {
        let rows = sqlx::query(
            r#"
            SELECT id, election_id, name, party, vote_count
            FROM candidates
            WHERE election_id = ?
            ORDER BY vote_count DESC, name
            "#,
        )
        .bind(election_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list candidates for election")?;

        Ok(rows.iter().map(Self::row_to_candidate).collect())
    }

    fn row_to_candidate(row: &SqliteRow) -> Candidate {
        Candidate {
            id: row.get("id"),
            election_id: row.get("election_id"),
            name: row.get("name"),
            party: row.get("party"),
            vote_count: row.get("vote_count"),
        }
    }

    fn row_to_candidate_entry(row: &SqliteRow) -> CandidateEntry {
        CandidateEntry {
            candidate: Self::row_to_candidate(row),
            election_name: row.get("election_name"),
        }
    }

    // ========================
    // Vote operations
    // ========================

    /// The vote a voter cast in an election, if any.
    pub async fn find_vote(&self, voter: VoterKey, election_id: ElectionId) -> Result<Option<Vote>> {
        let row = sqlx::query(
            r#"
            SELECT id, election_id, voter_id, candidate_id, cast_at
            FROM votes
            WHERE voter_id = ? AND election_id = ?
            "#,
        )
        .bind(voter)
        .bind(election_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up existing vote")?;

        row.as_ref().map(Self::row_to_vote).transpose()
    }

    /// Record a vote as one unit: audit row, candidate tally and voter flag.
    ///
    /// The insert runs first so the write lock is held before the counters
    /// are touched. A second ballot for the same (voter, election) fails on
    /// the `UNIQUE` constraint. On any error the transaction is dropped and
    /// rolled back.
    pub async fn record_vote(
        &self,
        voter: VoterKey,
        election_id: ElectionId,
        candidate_id: CandidateId,
        cast_at: DateTime<Utc>,
    ) -> Result<Vote> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin vote transaction")?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO votes (election_id, voter_id, candidate_id, cast_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(election_id)
        .bind(voter)
        .bind(candidate_id)
        .bind(cast_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to record vote")?;

        let tallied = sqlx::query(
            "UPDATE candidates SET vote_count = vote_count + 1 WHERE id = ? AND election_id = ?",
        )
        .bind(candidate_id)
        .bind(election_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update candidate tally")?;

        if tallied.rows_affected() != 1 {
            anyhow::bail!(
                "Candidate {} is not running in election {}",
                candidate_id,
                election_id
            );
        }

        let flagged = sqlx::query("UPDATE voters SET has_voted = 1 WHERE id = ?")
            .bind(voter)
            .execute(&mut *tx)
            .await
            .context("Failed to mark voter as voted")?;

        if flagged.rows_affected() != 1 {
            anyhow::bail!("Voter {} disappeared while voting", voter);
        }

        tx.commit().await.context("Failed to commit vote")?;

        Ok(Vote {
            id: inserted.last_insert_rowid(),
            election_id,
            voter,
            candidate_id,
            cast_at,
        })
    }

    /// List all votes in the order they were cast.
    pub async fn list_votes(&self) -> Result<Vec<Vote>> {
        let rows = sqlx::query(
            "SELECT id, election_id, voter_id, candidate_id, cast_at FROM votes ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list votes")?;

        rows.iter().map(Self::row_to_vote).collect()
    }

    pub async fn count_votes_for_election(&self, election_id: ElectionId) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM votes WHERE election_id = ?")
            .bind(election_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count votes")?;

        Ok(row.get("count"))
    }

    fn row_to_vote(row: &SqliteRow) -> Result<Vote> {
        let cast_at_str: String = row.get("cast_at");

        Ok(Vote {
            id: row.get("id"),
            election_id: row.get("election_id"),
            voter: row.get("voter_id"),
            candidate_id: row.get("candidate_id"),
            cast_at: parse_timestamp(&cast_at_str).context("Invalid cast_at timestamp")?,
        })
    }

    // ========================
    // Aggregates
    // ========================

    pub async fn counts(&self) -> Result<LedgerCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM elections) AS elections,
                (SELECT COUNT(*) FROM voters) AS voters,
                (SELECT COUNT(*) FROM candidates) AS candidates,
                (SELECT COUNT(*) FROM votes) AS votes
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count ledger rows")?;

        Ok(LedgerCounts {
            elections: row.get("elections"),
            voters: row.get("voters"),
            candidates: row.get("candidates"),
            votes: row.get("votes"),
        })
    }

    /// Sum of all candidates' stored tallies.
    pub async fn sum_tallies(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COALESCE(SUM(vote_count), 0) AS total FROM candidates")
            .fetch_one(&self.pool)
            .await
            .context("Failed to sum tallies")?;

        Ok(row.get("total"))
    }

    /// Get statistics for integrity checking.
    pub async fn get_integrity_stats(&self) -> Result<IntegrityStats> {
        let counts = self.counts().await?;

        let drift_rows = sqlx::query(
            r#"
            SELECT c.id, c.name, c.vote_count, COUNT(v.id) AS counted
            FROM candidates c
            LEFT JOIN votes v ON v.candidate_id = c.id
            GROUP BY c.id
            HAVING c.vote_count != COUNT(v.id)
            ORDER BY c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to compare tallies")?;

        let drifted_counters = drift_rows
            .iter()
            .map(|row| CounterDrift {
                candidate_id: row.get("id"),
                candidate_name: row.get("name"),
                recorded: row.get("vote_count"),
                counted: row.get("counted"),
            })
            .collect();

        let misplaced_votes: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) AS count
            FROM votes v
            JOIN candidates c ON c.id = v.candidate_id
            WHERE c.election_id != v.election_id
            "#,
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        let unflagged_voters: i64 = sqlx::query(
            r#"
            SELECT COUNT(DISTINCT v.voter_id) AS count
            FROM votes v
            JOIN voters vo ON vo.id = v.voter_id
            WHERE vo.has_voted = 0
            "#,
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        let duplicate_ballots: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) AS count FROM (
                SELECT 1 FROM votes
                GROUP BY voter_id, election_id
                HAVING COUNT(*) > 1
            )
            "#,
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        Ok(IntegrityStats {
            election_count: counts.elections,
            voter_count: counts.voters,
            candidate_count: counts.candidates,
            vote_count: counts.votes,
            drifted_counters,
            misplaced_votes,
            unflagged_voters,
            duplicate_ballots,
        })
    }
}

/// The message of a unique-constraint violation, if that is what `err` is.
///
/// SQLite reports the offending column, e.g. `UNIQUE constraint failed: voters.email`.
pub fn unique_violation(err: &anyhow::Error) -> Option<String> {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Some(db_err.message().to_string())
        }
        _ => None,
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

fn parse_stored_date(value: Option<String>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT))
        .transpose()
        .map_err(Into::into)
}
