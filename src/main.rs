use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod aggregate;
mod config;
mod error;
mod ingest;
mod models;
mod report;
mod roster;
mod sentiment;
mod store;

use crate::config::Config;
use crate::error::FeedbackError;
use crate::ingest::Submission;
use crate::models::FeedbackRecord;
use crate::roster::Roster;
use crate::sentiment::LexiconScorer;
use crate::store::{CsvFeedbackStore, RecordStore};

#[derive(Parser)]
#[command(name = "livepulse")]
#[command(
    about = "Collect live session feedback and summarize the audience mood",
    long_about = None
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Feedback store file (defaults to $LIVEPULSE_STORE, then feedback.csv)
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// Student roster file (defaults to $LIVEPULSE_ROSTER, then students.csv)
    #[arg(long, global = true)]
    roster: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the feedback store if it does not exist yet
    Init,
    /// Submit one piece of feedback
    Submit {
        #[arg(long, allow_negative_numbers = true)]
        rating: i64,
        /// happy, neutral or sad
        #[arg(long)]
        emoji: String,
        #[arg(long, default_value = "")]
        name: String,
        /// Log in with a register number from the roster
        #[arg(long)]
        regno: Option<String>,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Render the live dashboard
    Dashboard {
        #[arg(long, default_value_t = config::DEFAULT_RECENT)]
        recent: usize,
        #[arg(long, default_value_t = 30)]
        words: usize,
        /// Emit the snapshot as JSON instead of markdown
        #[arg(long)]
        json: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Export every record as CSV
    Export {
        #[arg(long, default_value = "livepulse_feedback.csv")]
        out: PathBuf,
    },
    /// Look up a student in the roster
    Lookup {
        #[arg(long)]
        regno: String,
    },
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::resolve(cli.store, cli.roster);

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: &Config) -> anyhow::Result<()> {
    match command {
        Commands::Init => {
            let store = CsvFeedbackStore::open(&config.store_path)?;
            println!("Feedback store ready at {}.", store.path().display());
        }
        Commands::Submit {
            rating,
            emoji,
            name,
            regno,
            comment,
        } => {
            let name = match regno {
                Some(regno) => login_name(config, &regno, name),
                None => name,
            };
            let submission = Submission {
                name,
                rating,
                emoji,
                comment,
            };

            let mut stderr = std::io::stderr();
            let record = save_submission(&config.store_path, &submission, &mut stderr)?;
            println!(
                "✅ Feedback submitted, thank you {}! (sentiment {:.2})",
                record.name, record.sentiment
            );
        }
        Commands::Dashboard {
            recent,
            words,
            json,
            out,
        } => {
            let store = CsvFeedbackStore::open(&config.store_path)?;
            let records = match store.read_all() {
                Ok(records) => records,
                Err(err @ FeedbackError::StoreRead { .. }) => {
                    eprintln!("Dashboard temporarily unavailable.");
                    return Err(err.into());
                }
                Err(err) => return Err(err.into()),
            };

            let snapshot = aggregate::compute_snapshot(&records, recent);
            let rendered = if json {
                serde_json::to_string_pretty(&snapshot)?
            } else {
                let top_words = aggregate::word_frequencies(&records, words);
                report::build_dashboard(&snapshot, &top_words)
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Dashboard written to {}.", path.display());
                }
                None => println!("{rendered}"),
            }
        }
        Commands::Export { out } => {
            let store = CsvFeedbackStore::open(&config.store_path)?;
            let records = store.read_all()?;
            let file = File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            store::export_csv(&records, BufWriter::new(file))?;
            println!("Exported {} records to {}.", records.len(), out.display());
        }
        Commands::Lookup { regno } => {
            let roster = Roster::load(&config.roster_path)?;
            match roster.lookup(&regno) {
                Some(student) => println!(
                    "{} ({}): {}, year {}",
                    student.name, student.regno, student.department, student.year
                ),
                None => println!(
                    "RegNo {} not found among {} students.",
                    regno.trim(),
                    roster.len()
                ),
            }
        }
    }

    Ok(())
}

/// Opens the store and submits. On any failure the unsaved comment is echoed
/// to `echo` so the user can retry without retyping it.
fn save_submission(
    store_path: &Path,
    submission: &Submission,
    echo: &mut impl Write,
) -> anyhow::Result<FeedbackRecord> {
    let result = CsvFeedbackStore::open(store_path)
        .and_then(|store| ingest::submit(&store, &LexiconScorer, submission));

    result.map_err(|err| {
        if !submission.comment.is_empty() {
            let _ = writeln!(echo, "Your comment was not saved, copy it to retry:");
            let _ = writeln!(echo, "{}", submission.comment);
        }
        err.into()
    })
}

/// Uses the roster name when the register number matches, otherwise keeps
/// whatever name was typed and continues anonymously if it is blank.
fn login_name(config: &Config, regno: &str, typed: String) -> String {
    let roster = match Roster::load(&config.roster_path) {
        Ok(roster) => roster,
        Err(err) => {
            tracing::warn!(error = %err, "roster unavailable, continuing without login");
            return typed;
        }
    };
    if roster.is_empty() {
        tracing::warn!(path = %config.roster_path.display(), "roster is empty, login unavailable");
    }
    match roster.lookup(regno) {
        Some(student) => {
            println!(
                "Welcome, {}! ({}, year {})",
                student.name, student.department, student.year
            );
            student.name.clone()
        }
        None => {
            tracing::warn!(
                regno = regno.trim(),
                "register number not found, continuing without login"
            );
            typed
        }
    }
}
