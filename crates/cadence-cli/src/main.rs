use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cadence_engine::{
    apply_edit, expand_instances, validate, Edit, EvaluationContext, MasterEntry, Window,
};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "cadence",
    version,
    about = "Expand and edit recurring bill/income schedules"
)]
struct Cli {
    /// Master entry JSON file (default: stdin)
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Materialize the occurrences inside a date window
    Expand {
        /// First day of the window (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the window, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Evaluation instant for autopay status (RFC 3339); defaults to now
        #[arg(long, env = "CADENCE_NOW")]
        now: Option<DateTime<Utc>>,

        /// IANA timezone used to decide which day "now" falls on
        #[arg(long, env = "CADENCE_TIMEZONE", default_value = "UTC")]
        timezone: String,
    },

    /// Report move-pair inconsistencies (advisory, always exits 0)
    Validate,

    /// Apply one edit and print the next record, or null if it was deleted
    Edit {
        /// The edit as JSON, e.g. '{"op":"deleteSingleOccurrence","date":"2024-03-11"}'
        #[arg(long)]
        edit: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let master = read_master(cli.input.as_deref())?;

    let output = match cli.command {
        Command::Expand {
            start,
            end,
            now,
            timezone,
        } => {
            let now = now.unwrap_or_else(Utc::now);
            let ctx = EvaluationContext::from_iana(now, &timezone)?;
            let instances = expand_instances(&master, Window::new(start, end), &ctx);
            tracing::info!(count = instances.len(), "materialized instances");
            serde_json::to_value(instances)?
        }
        Command::Validate => serde_json::to_value(validate(&master))?,
        Command::Edit { edit } => {
            let edit: Edit = serde_json::from_str(&edit).context("failed to parse --edit")?;
            serde_json::to_value(apply_edit(&master, &edit))?
        }
    };

    let text = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{text}");
    Ok(())
}

fn read_master(path: Option<&Path>) -> Result<MasterEntry> {
    let text = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };
    serde_json::from_str(&text).context("failed to parse master entry")
}
