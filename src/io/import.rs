use anyhow::Result;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;

use crate::application::{AppError, LedgerService};
use crate::domain::NewVoter;

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred on one input line
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Run every check the import would, including duplicates, without
    /// writing anything
    pub dry_run: bool,
    /// Count rows that clash with existing voters as skipped instead of failed
    pub skip_duplicates: bool,
}

#[derive(Debug, Deserialize)]
struct VoterRecord {
    voter_id: String,
    name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
}

/// Importer for bulk-loading voters
pub struct Importer<'a> {
    service: &'a LedgerService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Import voters from CSV with a `voter_id,name,email,phone` header.
    /// Extra columns (such as `has_voted` from an export) are ignored.
    pub async fn import_voters_csv<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut result = ImportResult::default();
        let mut seen = SeenVoters::default();

        for (index, record) in csv_reader.deserialize::<VoterRecord>().enumerate() {
            let line = index + 2; // header is line 1

            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let outcome = if options.dry_run {
                self.check_record(record, &mut seen).await
            } else {
                self.service
                    .create_voter(&record.voter_id, &record.name, record.email, record.phone)
                    .await
                    .map(|_| ())
            };

            match outcome {
                Ok(()) => result.imported += 1,
                Err(e) if e.is_duplicate() && options.skip_duplicates => result.skipped += 1,
                Err(e) => result.errors.push(ImportError {
                    line,
                    error: e.to_string(),
                }),
            }
        }

        Ok(result)
    }

    /// Dry-run a record: the service's pre-checks against stored voters,
    /// then clashes with earlier rows of the same file.
    async fn check_record(
        &self,
        record: VoterRecord,
        seen: &mut SeenVoters,
    ) -> Result<(), AppError> {
        let new = NewVoter::new(record.voter_id, record.name)
            .with_email(record.email)
            .with_phone(record.phone);
        self.service.check_new_voter(&new).await?;

        if seen.voter_ids.contains(&new.voter_id) {
            return Err(AppError::DuplicateVoterId(new.voter_id));
        }
        if let Some(email) = &new.email {
            if seen.emails.contains(email) {
                return Err(AppError::DuplicateEmail(email.clone()));
            }
            seen.emails.insert(email.clone());
        }
        seen.voter_ids.insert(new.voter_id);
        Ok(())
    }
}

/// Voter ids and emails accepted so far during a dry run
#[derive(Default)]
struct SeenVoters {
    voter_ids: HashSet<String>,
    emails: HashSet<String>,
}
