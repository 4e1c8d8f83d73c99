// Operator utility: list the events in the data file and check slot invariants
// Usage: cargo run --bin inspect-events -- [--data-file data.json] [--status pending] [--upcoming]

use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, ValueEnum};

use event_desk_api::models::Event;
use event_desk_api::services::slots;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StatusFilter {
    Pending,
    Accepted,
    Rejected,
}

impl StatusFilter {
    fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::Pending => "pending",
            StatusFilter::Accepted => "accepted",
            StatusFilter::Rejected => "rejected",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "inspect-events", about = "List stored event requests and check slot invariants")]
struct Args {
    /// Data file to read (defaults to $DATA_FILE, then data.json)
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Only show events in this state
    #[arg(long, value_enum)]
    status: Option<StatusFilter>,

    /// Hide events that already started
    #[arg(long)]
    upcoming: bool,
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let path = args
        .data_file
        .or_else(|| std::env::var("DATA_FILE").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data.json"));

    let raw = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let events: Vec<Event> =
        serde_json::from_slice(&raw).with_context(|| format!("parsing {}", path.display()))?;

    let now = Utc::now();
    let shown: Vec<&Event> = events
        .iter()
        .filter(|e| args.status.map_or(true, |s| e.status().as_str() == s.as_str()))
        .filter(|e| !args.upcoming || e.scheduled_at() >= now)
        .collect();

    for event in &shown {
        println!(
            "{:<14} {}  {:<8} {:>3} interested  {}{}",
            event.id(),
            event.scheduled_at().format("%Y-%m-%d %H:%M"),
            event.status().as_str(),
            event.subscribers().len(),
            event.title,
            if event.requires_support() { "  [support]" } else { "" }
        );
    }
    println!("\n{} of {} events shown ({})", shown.len(), events.len(), path.display());

    let problems = slots::audit(&events);
    if !problems.is_empty() {
        eprintln!("\n⚠️  {} invariant violation(s):", problems.len());
        for problem in &problems {
            eprintln!("  - {}", problem);
        }
        std::process::exit(1);
    }

    Ok(())
}
