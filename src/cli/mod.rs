use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::application::{LedgerService, ResultsSelection};
use crate::config::{DEFAULT_DATABASE, LedgerConfig};
use crate::domain::{ElectionId, parse_optional_date};
use crate::io::{Exporter, ImportOptions, Importer};

/// Suffragium - Election Ledger
#[derive(Parser)]
#[command(name = "suffragium")]
#[command(about = "A local-first ledger of elections, voters, candidates and votes")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "SUFFRAGIUM_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Milliseconds a write waits for the database lock
    #[arg(long, global = true, env = "SUFFRAGIUM_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    pub busy_timeout: u64,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

/// Output for listings, which have no CSV form
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Election management commands
    #[command(subcommand)]
    Election(ElectionCommands),

    /// Voter management commands
    #[command(subcommand)]
    Voter(VoterCommands),

    /// Candidate management commands
    #[command(subcommand)]
    Candidate(CandidateCommands),

    /// Cast a vote
    Vote {
        /// External voter ID
        voter_id: String,

        /// Election ID
        #[arg(short, long)]
        election: ElectionId,

        /// Candidate ID
        #[arg(short, long)]
        candidate: i64,
    },

    /// Show counts and every candidate's tally
    Dashboard {
        #[arg(short, long, value_enum, default_value = "table")]
        format: ListFormat,
    },

    /// Show ranked results for an election
    Results {
        /// Election ID (omit to list the elections to choose from)
        #[arg(short, long)]
        election: Option<ElectionId>,

        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Verify that tallies match the vote log
    Check,

    /// Export data to CSV or JSON
    Export {
        /// What to export: results, voters, snapshot
        export_type: String,

        /// Election ID (for results)
        #[arg(short, long)]
        election: Option<ElectionId>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Output format. results: csv (default) or json; voters: csv; snapshot: json
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Import voters from CSV
    Import {
        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Validate without importing
        #[arg(long)]
        dry_run: bool,

        /// Skip voters that already exist
        #[arg(long)]
        skip_duplicates: bool,
    },

    /// Credential accounts (register/login), separate from the voter roll
    #[cfg(feature = "accounts")]
    #[command(subcommand)]
    Account(AccountCommands),
}

#[derive(Subcommand)]
pub enum ElectionCommands {
    /// Register a new election
    Add {
        /// Election name (must be unique)
        name: String,

        /// Election type, e.g. "Lok Sabha"
        #[arg(short = 't', long = "type")]
        election_type: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<String>,
    },

    /// List all elections
    List {
        #[arg(short, long, value_enum, default_value = "table")]
        format: ListFormat,
    },
}

#[derive(Subcommand)]
pub enum VoterCommands {
    /// Register a new voter
    Register {
        /// External voter ID (must be unique)
        voter_id: String,

        /// Full name
        name: String,

        /// Email address (must be unique)
        #[arg(short, long)]
        email: Option<String>,

        /// Phone number
        #[arg(short, long)]
        phone: Option<String>,
    },

    /// List all voters
    List {
        #[arg(short, long, value_enum, default_value = "table")]
        format: ListFormat,
    },

    /// Show a voter's details
    Show {
        voter_id: String,

        /// Also report whether the voter voted in this election
        #[arg(short, long)]
        election: Option<ElectionId>,
    },
}

#[derive(Subcommand)]
pub enum CandidateCommands {
    /// Add a candidate to an election
    Add {
        /// Election ID
        election_id: ElectionId,

        /// Candidate name
        name: String,

        /// Party label
        #[arg(short, long)]
        party: Option<String>,
    },

    /// List all candidates with their election
    List {
        #[arg(short, long, value_enum, default_value = "table")]
        format: ListFormat,
    },
}

#[cfg(feature = "accounts")]
#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a login account
    Register {
        voter_id: String,

        #[arg(long, env = "SUFFRAGIUM_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Check a voter ID and password
    Login {
        voter_id: String,

        #[arg(long, env = "SUFFRAGIUM_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// List accounts
    List,
}

impl Cli {
    fn config(&self) -> LedgerConfig {
        LedgerConfig::new(&self.database)
            .with_busy_timeout(Duration::from_millis(self.busy_timeout))
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config();

        match self.command {
            Commands::Init => {
                LedgerService::init(&config.create_if_missing(true)).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Election(cmd) => {
                let service = LedgerService::connect(&config).await?;
                run_election_command(&service, cmd).await?;
            }

            Commands::Voter(cmd) => {
                let service = LedgerService::connect(&config).await?;
                run_voter_command(&service, cmd).await?;
            }

            Commands::Candidate(cmd) => {
                let service = LedgerService::connect(&config).await?;
                run_candidate_command(&service, cmd).await?;
            }

            Commands::Vote {
                voter_id,
                election,
                candidate,
            } => {
                let service = LedgerService::connect(&config).await?;
                let result = service.cast_vote(&voter_id, election, candidate).await?;
                println!(
                    "Vote recorded: {} voted for {} in {} (vote #{})",
                    result.voter.voter_id,
                    result.candidate_name,
                    result.election_name,
                    result.vote.id
                );
            }

            Commands::Dashboard { format } => {
                let service = LedgerService::connect(&config).await?;
                run_dashboard_command(&service, format).await?;
            }

            Commands::Results { election, format } => {
                let service = LedgerService::connect(&config).await?;
                run_results_command(&service, election, format).await?;
            }

            Commands::Check => {
                let service = LedgerService::connect(&config).await?;
                run_check_command(&service).await?;
            }

            Commands::Export {
                export_type,
                election,
                output,
                format,
            } => {
                let service = LedgerService::connect(&config).await?;
                run_export_command(&service, &export_type, election, output.as_deref(), format)
                    .await?;
            }

            Commands::Import {
                input,
                dry_run,
                skip_duplicates,
            } => {
                let service = LedgerService::connect(&config).await?;
                let options = ImportOptions {
                    dry_run,
                    skip_duplicates,
                };
                run_import_command(&service, input.as_deref(), options).await?;
            }

            #[cfg(feature = "accounts")]
            Commands::Account(cmd) => {
                let service = crate::application::AccountService::init(&config).await?;
                run_account_command(&service, cmd).await?;
            }
        }

        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_election_command(service: &LedgerService, cmd: ElectionCommands) -> Result<()> {
    match cmd {
        ElectionCommands::Add {
            name,
            election_type,
            start_date,
            end_date,
        } => {
            let start = parse_optional_date(start_date.as_deref())
                .context("Invalid start date. Use YYYY-MM-DD")?;
            let end = parse_optional_date(end_date.as_deref())
                .context("Invalid end date. Use YYYY-MM-DD")?;

            let election = service
                .create_election(&name, &election_type, start, end)
                .await?;
            println!(
                "Election \"{}\" added successfully (id {})",
                election.name, election.id
            );
        }

        ElectionCommands::List { format } => {
            let elections = service.list_elections().await?;
            if format == ListFormat::Json {
                return print_json(&elections);
            }
            if elections.is_empty() {
                println!("No elections found.");
            } else {
                println!(
                    "{:<5} {:<30} {:<18} {:<11} {:<11} ACTIVE",
                    "ID", "NAME", "TYPE", "START", "END"
                );
                println!("{}", "-".repeat(84));
                for e in elections {
                    println!(
                        "{:<5} {:<30} {:<18} {:<11} {:<11} {}",
                        e.id,
                        truncate(&e.name, 30),
                        truncate(&e.election_type, 18),
                        e.start_date.map(|d| d.to_string()).unwrap_or_default(),
                        e.end_date.map(|d| d.to_string()).unwrap_or_default(),
                        if e.is_active { "yes" } else { "no" }
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_voter_command(service: &LedgerService, cmd: VoterCommands) -> Result<()> {
    match cmd {
        VoterCommands::Register {
            voter_id,
            name,
            email,
            phone,
        } => {
            let voter = service.create_voter(&voter_id, &name, email, phone).await?;
            println!(
                "Voter \"{}\" ({}) registered successfully!",
                voter.name, voter.voter_id
            );
        }

        VoterCommands::List { format } => {
            let voters = service.list_voters().await?;
            if format == ListFormat::Json {
                return print_json(&voters);
            }
            if voters.is_empty() {
                println!("No voters found.");
            } else {
                println!(
                    "{:<16} {:<24} {:<28} {:<14} STATUS",
                    "VOTER ID", "NAME", "EMAIL", "PHONE"
                );
                println!("{}", "-".repeat(92));
                for v in voters {
                    println!(
                        "{:<16} {:<24} {:<28} {:<14} {}",
                        truncate(&v.voter_id, 16),
                        truncate(&v.name, 24),
                        truncate(v.email.as_deref().unwrap_or(""), 28),
                        v.phone.as_deref().unwrap_or(""),
                        v.status()
                    );
                }
            }
        }

        VoterCommands::Show { voter_id, election } => {
            let voter = service.get_voter(&voter_id).await?;
            println!("Voter: {}", voter.name);
            println!("  Voter ID:   {}", voter.voter_id);
            if let Some(email) = &voter.email {
                println!("  Email:      {}", email);
            }
            if let Some(phone) = &voter.phone {
                println!("  Phone:      {}", phone);
            }
            println!(
                "  Registered: {}",
                voter.registered_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!("  Status:     {}", voter.status());
            if let Some(election_id) = election {
                let voted = service.has_voted_in(&voter_id, election_id).await?;
                println!(
                    "  Election {}: {}",
                    election_id,
                    if voted { "voted" } else { "not voted" }
                );
            }
        }
    }
    Ok(())
}

async fn run_candidate_command(service: &LedgerService, cmd: CandidateCommands) -> Result<()> {
    match cmd {
        CandidateCommands::Add {
            election_id,
            name,
            party,
        } => {
            let candidate = service.create_candidate(election_id, &name, party).await?;
            println!(
                "Candidate \"{}\" added to election {} (id {})",
                candidate.name, candidate.election_id, candidate.id
            );
        }

        CandidateCommands::List { format } => {
            let candidates = service.list_candidates().await?;
            if format == ListFormat::Json {
                return print_json(&candidates);
            }
            if candidates.is_empty() {
                println!("No candidates found.");
            } else {
                println!(
                    "{:<5} {:<30} {:<24} {:<16} {:>6}",
                    "ID", "ELECTION", "NAME", "PARTY", "VOTES"
                );
                println!("{}", "-".repeat(85));
                for entry in candidates {
                    let c = &entry.candidate;
                    println!(
                        "{:<5} {:<30} {:<24} {:<16} {:>6}",
                        c.id,
                        truncate(&entry.election_name, 30),
                        truncate(&c.name, 24),
                        truncate(c.party.as_deref().unwrap_or(""), 16),
                        c.vote_count
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_dashboard_command(service: &LedgerService, format: ListFormat) -> Result<()> {
    let dashboard = service.dashboard().await?;
    if format == ListFormat::Json {
        return print_json(&dashboard);
    }

    println!("Elections:  {}", dashboard.election_count);
    println!("Voters:     {}", dashboard.voter_count);
    println!("Candidates: {}", dashboard.candidate_count);
    println!("Votes:      {}", dashboard.vote_count);

    if !dashboard.candidates.is_empty() {
        println!();
        println!("{:<30} {:<24} {:>6}", "ELECTION", "CANDIDATE", "VOTES");
        println!("{}", "-".repeat(62));
        for entry in &dashboard.candidates {
            println!(
                "{:<30} {:<24} {:>6}",
                truncate(&entry.election_name, 30),
                truncate(&entry.candidate.name, 24),
                entry.candidate.vote_count
            );
        }
    }
    Ok(())
}

async fn run_results_command(
    service: &LedgerService,
    election: Option<ElectionId>,
    format: OutputFormat,
) -> Result<()> {
    let page = service.results(election).await?;

    if format == OutputFormat::Csv {
        match &page.selection {
            ResultsSelection::None => anyhow::bail!("--election is required for CSV results"),
            ResultsSelection::Invalid { election_id } => print_invalid_selection(*election_id),
            ResultsSelection::Selected { election, .. } => {
                Exporter::new(service)
                    .export_results_csv(election.id, io::stdout().lock())
                    .await?;
            }
        }
        return Ok(());
    }

    if format == OutputFormat::Json {
        return print_json(&page);
    }

    match &page.selection {
        ResultsSelection::None => {
            if page.elections.is_empty() {
                println!("No elections found.");
            } else {
                println!("Select an election with --election:");
                for e in &page.elections {
                    println!("  {:<5} {}", e.id, e.name);
                }
            }
        }
        ResultsSelection::Invalid { election_id } => print_invalid_selection(*election_id),
        ResultsSelection::Selected {
            election,
            total_votes,
            standings,
        } => {
            println!("Results: {} ({})", election.name, election.election_type);
            println!("Total votes: {}", total_votes);
            println!();
            if standings.is_empty() {
                println!("No candidates in this election.");
            } else {
                println!(
                    "{:<5} {:<24} {:<16} {:>6} {:>7}",
                    "RANK", "CANDIDATE", "PARTY", "VOTES", "SHARE"
                );
                println!("{}", "-".repeat(62));
                for s in standings {
                    println!(
                        "{:<5} {:<24} {:<16} {:>6} {:>6.1}%",
                        s.rank,
                        truncate(&s.candidate.name, 24),
                        truncate(s.candidate.party.as_deref().unwrap_or(""), 16),
                        s.candidate.vote_count,
                        s.share
                    );
                }
            }
        }
    }
    Ok(())
}

fn print_invalid_selection(election_id: ElectionId) {
    println!("Selected election {} is invalid.", election_id);
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity().await?;

    println!("Elections:  {}", report.election_count);
    println!("Voters:     {}", report.voter_count);
    println!("Candidates: {}", report.candidate_count);
    println!(
        "Votes:      {} (tallies sum to {})",
        report.vote_count, report.counted_total
    );
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    export_type: &str,
    election: Option<ElectionId>,
    output: Option<&str>,
    format: Option<OutputFormat>,
) -> Result<()> {
    let format = export_format(export_type, format)?;
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    let exporter = Exporter::new(service);

    let count = match export_type {
        "results" => {
            let election_id = election.context("--election is required for results export")?;
            match format {
                OutputFormat::Json => exporter.export_results_json(election_id, writer).await?,
                _ => exporter.export_results_csv(election_id, writer).await?,
            }
        }
        "voters" => exporter.export_voters_csv(writer).await?,
        "snapshot" => {
            let snapshot = exporter.export_snapshot_json(writer).await?;
            snapshot.elections.len()
                + snapshot.voters.len()
                + snapshot.candidates.len()
                + snapshot.votes.len()
        }
        other => anyhow::bail!("Unknown export type '{}'", other),
    };

    if let Some(path) = output {
        eprintln!("Exported {} record(s) to {}", count, path);
    }
    Ok(())
}

/// The format an export will be written in. Each export type supports a
/// fixed set of formats; anything else is rejected up front.
fn export_format(export_type: &str, requested: Option<OutputFormat>) -> Result<OutputFormat> {
    let (supported, default): (&[OutputFormat], OutputFormat) = match export_type {
        "results" => (&[OutputFormat::Csv, OutputFormat::Json], OutputFormat::Csv),
        "voters" => (&[OutputFormat::Csv], OutputFormat::Csv),
        "snapshot" => (&[OutputFormat::Json], OutputFormat::Json),
        other => anyhow::bail!(
            "Unknown export type '{}'. Valid types: results, voters, snapshot",
            other
        ),
    };

    match requested {
        None => Ok(default),
        Some(format) if supported.contains(&format) => Ok(format),
        Some(format) => anyhow::bail!(
            "Format '{}' is not available for {} export",
            format_name(format),
            export_type
        ),
    }
}

fn format_name(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Table => "table",
        OutputFormat::Json => "json",
        OutputFormat::Csv => "csv",
    }
}

async fn run_import_command(
    service: &LedgerService,
    input: Option<&str>,
    options: ImportOptions,
) -> Result<()> {
    let importer = Importer::new(service);
    let dry_run = options.dry_run;

    let result = match input {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open {}", path))?;
            importer
                .import_voters_csv(BufReader::new(file), options)
                .await?
        }
        None => importer.import_voters_csv(io::stdin().lock(), options).await?,
    };

    println!(
        "{} {} voter(s), skipped {}",
        if dry_run { "Validated" } else { "Imported" },
        result.imported,
        result.skipped
    );
    if !result.errors.is_empty() {
        println!("Errors:");
        for err in &result.errors {
            println!("  line {}: {}", err.line, err.error);
        }
        anyhow::bail!("{} row(s) could not be imported", result.errors.len());
    }
    Ok(())
}

#[cfg(feature = "accounts")]
async fn run_account_command(
    service: &crate::application::AccountService,
    cmd: AccountCommands,
) -> Result<()> {
    match cmd {
        AccountCommands::Register { voter_id, password } => {
            let account = service.register(&voter_id, &password).await?;
            println!("Account created for {}", account.voter_id);
        }
        AccountCommands::Login { voter_id, password } => {
            let account = service.login(&voter_id, &password).await?;
            println!("Welcome, {}", account.voter_id);
        }
        AccountCommands::List => {
            let accounts = service.list_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<20} CREATED", "VOTER ID");
                println!("{}", "-".repeat(40));
                for a in accounts {
                    println!(
                        "{:<20} {}",
                        truncate(&a.voter_id, 20),
                        a.created_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
        }
    }
    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_export_format_defaults() -> Result<()> {
        assert_eq!(export_format("results", None)?, OutputFormat::Csv);
        assert_eq!(export_format("voters", None)?, OutputFormat::Csv);
        assert_eq!(export_format("snapshot", None)?, OutputFormat::Json);
        assert_eq!(
            export_format("results", Some(OutputFormat::Json))?,
            OutputFormat::Json
        );
        Ok(())
    }

    #[test]
    fn test_export_format_rejects_unsupported_formats() {
        assert!(export_format("voters", Some(OutputFormat::Json)).is_err());
        assert!(export_format("snapshot", Some(OutputFormat::Csv)).is_err());
        assert!(export_format("results", Some(OutputFormat::Table)).is_err());
        assert!(export_format("ballots", None).is_err());
    }

    #[test]
    fn test_busy_timeout_flag_reaches_config() -> Result<()> {
        let cli = Cli::try_parse_from(["suffragium", "--busy-timeout", "250", "check"])?;
        assert_eq!(cli.config().busy_timeout, Duration::from_millis(250));

        let cli = Cli::try_parse_from(["suffragium", "check", "--busy-timeout", "1200"])?;
        assert_eq!(cli.config().busy_timeout, Duration::from_millis(1200));
        Ok(())
    }

    #[tokio::test]
    async fn test_csv_results_for_unknown_election_is_not_an_error() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = LedgerConfig::new(temp_dir.path().join("cli.db")).create_if_missing(true);
        let service = LedgerService::init(&config).await?;

        run_results_command(&service, Some(404), OutputFormat::Csv).await?;
        assert!(
            run_results_command(&service, None, OutputFormat::Csv)
                .await
                .is_err()
        );
        Ok(())
    }
}
