use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::{Candidate, CandidateId};

/// Result ordering: most votes first, ties broken by name ascending.
pub fn compare_standing(a: &Candidate, b: &Candidate) -> Ordering {
    b.vote_count
        .cmp(&a.vote_count)
        .then_with(|| a.name.cmp(&b.name))
}

/// A candidate's position in an election's results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    /// Competition rank: tied candidates share a rank and the next rank
    /// skips accordingly (1, 1, 3).
    pub rank: usize,
    pub candidate: Candidate,
    /// Percentage of the election's votes, 0.0 when nobody has voted.
    pub share: f64,
}

/// Order candidates for display and assign ranks and vote shares.
pub fn build_standings(mut candidates: Vec<Candidate>) -> Vec<Standing> {
    candidates.sort_by(compare_standing);
    let total: i64 = candidates.iter().map(|c| c.vote_count).sum();

    let mut standings: Vec<Standing> = Vec::with_capacity(candidates.len());
    for (position, candidate) in candidates.into_iter().enumerate() {
        let rank = match standings.last() {
            Some(prev) if prev.candidate.vote_count == candidate.vote_count => prev.rank,
            _ => position + 1,
        };
        let share = if total == 0 {
            0.0
        } else {
            candidate.vote_count as f64 * 100.0 / total as f64
        };
        standings.push(Standing {
            rank,
            candidate,
            share,
        });
    }
    standings
}

/// A candidate whose stored counter disagrees with its vote rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterDrift {
    pub candidate_id: CandidateId,
    pub candidate_name: String,
    pub recorded: i64,
    pub counted: i64,
}

/// Raw figures gathered from storage for an integrity check.
#[derive(Debug, Clone, Default)]
pub struct IntegrityStats {
    pub election_count: i64,
    pub voter_count: i64,
    pub candidate_count: i64,
    pub vote_count: i64,
    pub drifted_counters: Vec<CounterDrift>,
    /// Votes whose candidate runs in a different election
    pub misplaced_votes: i64,
    /// Voters with at least one vote but `has_voted` unset
    pub unflagged_voters: i64,
    /// (voter, election) pairs with more than one vote
    pub duplicate_ballots: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub election_count: i64,
    pub voter_count: i64,
    pub candidate_count: i64,
    pub vote_count: i64,
    pub counted_total: i64,
    pub issues: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn build_integrity_report(stats: &IntegrityStats, counted_total: i64) -> IntegrityReport {
    let mut issues = Vec::new();

    for drift in &stats.drifted_counters {
        issues.push(format!(
            "Candidate '{}' (#{}) records {} votes but {} were cast",
            drift.candidate_name, drift.candidate_id, drift.recorded, drift.counted
        ));
    }
    if stats.misplaced_votes > 0 {
        issues.push(format!(
            "{} vote(s) reference a candidate from another election",
            stats.misplaced_votes
        ));
    }
    if stats.unflagged_voters > 0 {
        issues.push(format!(
            "{} voter(s) have votes but are not marked as voted",
            stats.unflagged_voters
        ));
    }
    if stats.duplicate_ballots > 0 {
        issues.push(format!(
            "{} voter/election pair(s) have more than one vote",
            stats.duplicate_ballots
        ));
    }
    if counted_total != stats.vote_count {
        issues.push(format!(
            "Candidate tallies sum to {} but {} votes are recorded",
            counted_total, stats.vote_count
        ));
    }

    IntegrityReport {
        election_count: stats.election_count,
        voter_count: stats.voter_count,
        candidate_count: stats.candidate_count,
        vote_count: stats.vote_count,
        counted_total,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: CandidateId, name: &str, votes: i64) -> Candidate {
        Candidate {
            id,
            election_id: 1,
            name: name.to_string(),
            party: None,
            vote_count: votes,
        }
    }

    #[test]
    fn test_standings_order_by_votes_then_name() {
        let standings = build_standings(vec![
            candidate(1, "A", 3),
            candidate(2, "B", 5),
            candidate(3, "C", 3),
        ]);

        let names: Vec<&str> = standings
            .iter()
            .map(|s| s.candidate.name.as_str())
            .collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_tied_candidates_share_a_rank() {
        let standings = build_standings(vec![
            candidate(1, "A", 3),
            candidate(2, "B", 5),
            candidate(3, "C", 3),
            candidate(4, "D", 1),
        ]);

        let ranks: Vec<usize> = standings.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, vec![1, 2, 2, 4]);
    }

    #[test]
    fn test_shares_sum_to_one_hundred() {
        let standings = build_standings(vec![
            candidate(1, "A", 1),
            candidate(2, "B", 2),
            candidate(3, "C", 1),
        ]);
        assert_eq!(standings[0].share, 50.0);
        let total: f64 = standings.iter().map(|s| s.share).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_votes_means_zero_share() {
        let standings = build_standings(vec![candidate(1, "A", 0), candidate(2, "B", 0)]);
        assert!(standings.iter().all(|s| s.share == 0.0 && s.rank == 1));
    }

    #[test]
    fn test_clean_stats_are_healthy() {
        let stats = IntegrityStats {
            election_count: 1,
            voter_count: 3,
            candidate_count: 2,
            vote_count: 3,
            ..Default::default()
        };
        let report = build_integrity_report(&stats, 3);
        assert!(report.is_healthy());
    }

    #[test]
    fn test_drift_is_reported() {
        let stats = IntegrityStats {
            vote_count: 2,
            drifted_counters: vec![CounterDrift {
                candidate_id: 7,
                candidate_name: "A".into(),
                recorded: 3,
                counted: 2,
            }],
            ..Default::default()
        };
        let report = build_integrity_report(&stats, 3);
        assert!(!report.is_healthy());
        assert_eq!(report.issues.len(), 2);
        assert!(report.issues[0].contains("records 3 votes but 2 were cast"));
    }
}
