mod agenda;
mod replay;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Counselor portfolio tools: agenda rendering and chat notification replay.
#[derive(Parser, Debug)]
#[command(name = "conseiller", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bucket dated items into a day-by-day morning/afternoon agenda.
    Agenda {
        /// JSON array of `{id, label, date}` items with RFC 3339 dates.
        #[arg(long)]
        items: PathBuf,

        /// First day of the period (YYYY-MM-DD).
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the period, inclusive (YYYY-MM-DD).
        #[arg(long)]
        end: NaiveDate,

        /// UTC offset of the agenda, in hours.
        #[arg(long, env = "CONSEILLER_UTC_OFFSET", default_value_t = 1, allow_hyphen_values = true)]
        utc_offset: i32,

        /// Fail on items dated outside the period instead of adding days.
        #[arg(long)]
        strict: bool,

        /// Print the agenda as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Replay chat snapshots through the notification service.
    Replay(replay::ReplayArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("conseiller v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Agenda {
            items,
            start,
            end,
            utc_offset,
            strict,
            json,
        } => agenda::run(&items, start, end, utc_offset, strict, json),
        Command::Replay(args) => replay::run(args).await,
    }
}
