use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type ElectionId = i64;

/// A named voting event. Elections are created inactive and are never
/// updated or deleted afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    pub id: ElectionId,
    pub name: String,
    /// Free text, e.g. "Lok Sabha" or "Nagar Panchayat"
    pub election_type: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// An election that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewElection {
    pub name: String,
    pub election_type: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl NewElection {
    pub fn new(name: impl Into<String>, election_type: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            election_type: election_type.into().trim().to_string(),
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_dates(mut self, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    /// Check the required fields and the date range.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() || self.election_type.is_empty() {
            return Err("Election name and type are required".to_string());
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(format!(
                    "End date {} is before start date {}",
                    end, start
                ));
            }
        }
        Ok(())
    }
}

/// Parse an optional `YYYY-MM-DD` form value. Blank input means "no date".
pub fn parse_optional_date(input: Option<&str>) -> Result<Option<NaiveDate>, chrono::ParseError> {
    match input.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_new_election_trims_fields() {
        let election = NewElection::new("  General 2024 ", " Lok Sabha");
        assert_eq!(election.name, "General 2024");
        assert_eq!(election.election_type, "Lok Sabha");
        assert!(election.validate().is_ok());
    }

    #[test]
    fn test_blank_name_or_type_is_rejected() {
        assert!(NewElection::new("   ", "Lok Sabha").validate().is_err());
        assert!(NewElection::new("General 2024", "").validate().is_err());
    }

    #[test]
    fn test_end_date_before_start_is_rejected() {
        let election = NewElection::new("General 2024", "Lok Sabha")
            .with_dates(Some(date("2024-05-10")), Some(date("2024-05-01")));
        assert!(election.validate().is_err());

        let same_day = NewElection::new("By-election", "Municipal")
            .with_dates(Some(date("2024-05-10")), Some(date("2024-05-10")));
        assert!(same_day.validate().is_ok());
    }

    #[test]
    fn test_open_ended_range_is_accepted() {
        let election = NewElection::new("Council", "Municipal")
            .with_dates(None, Some(date("2024-05-01")));
        assert!(election.validate().is_ok());
    }

    #[test]
    fn test_parse_optional_date() {
        assert_eq!(parse_optional_date(None).unwrap(), None);
        assert_eq!(parse_optional_date(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_optional_date(Some("2024-04-19")).unwrap(),
            Some(date("2024-04-19"))
        );
        assert!(parse_optional_date(Some("19/04/2024")).is_err());
    }
}
