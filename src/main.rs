use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use campus_rankings::config::{Config, DEFAULT_LOG_FILTER};
use campus_rankings::models::{Event, Host};
use campus_rankings::reservation::{self, Viewer};
use campus_rankings::schedule::{split_by_time, EventPhase};
use campus_rankings::{db, import, rankings, report, scoring};

#[derive(Parser)]
#[command(name = "campus-rankings")]
#[command(about = "Event, host and college rankings for campus parties", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Board {
    Colleges,
    Hosts,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo hosts, events and ratings
    Seed,
    /// Import ratings from a CSV file
    ImportRatings {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List events split into upcoming, live and past
    Events {
        /// Reference time (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Print a leaderboard
    Rankings {
        #[arg(long, value_enum, default_value_t = Board::Colleges)]
        kind: Board,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Reserve a seat at an event on behalf of a user
    Reserve {
        #[arg(long)]
        event: Uuid,
        #[arg(long)]
        user: Uuid,
    },
    /// Score CSV exports without a database
    ScoreCsv {
        #[arg(long)]
        hosts: PathBuf,
        #[arg(long)]
        events: PathBuf,
        #[arg(long)]
        ratings: PathBuf,
        #[arg(long, value_enum, default_value_t = Board::Colleges)]
        kind: Board,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let config = Config::load()?;
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")
}

fn print_board(
    events: &[Event],
    hosts: &[Host],
    kind: Board,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let hosts = scoring::hosts_with_scores(events, hosts);

    match kind {
        Board::Colleges => {
            let rows = rankings::college_leaderboard(events, &hosts, Utc::now());
            if json {
                println!("{}", serde_json::to_string_pretty(&rows[..rows.len().min(limit)])?);
                return Ok(());
            }
            if rows.is_empty() {
                println!("No colleges with hosts yet.");
            }
            for (i, row) in rows.iter().take(limit).enumerate() {
                println!(
                    "{} {} score {:.0} ({} events, {} rated past events)",
                    rankings::medal(i),
                    row.college,
                    row.score,
                    row.events,
                    row.rated_past_events
                );
            }
        }
        Board::Hosts => {
            let rows = rankings::host_leaderboard(events, &hosts);
            if json {
                println!("{}", serde_json::to_string_pretty(&rows[..rows.len().min(limit)])?);
                return Ok(());
            }
            if rows.is_empty() {
                println!("No hosts yet.");
            }
            for (i, row) in rows.iter().take(limit).enumerate() {
                println!(
                    "{} {} ({}) score {:.0}: {} hosted, {} rated",
                    rankings::medal(i),
                    row.host_name,
                    row.college,
                    row.score,
                    row.events,
                    row.rated_events
                );
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&connect().await?).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&connect().await?).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportRatings { csv } => {
            let inserted = db::import_ratings_csv(&connect().await?, &csv).await?;
            println!("Inserted {inserted} ratings from {}.", csv.display());
        }
        Commands::Events { at } => {
            let now = at.unwrap_or_else(Utc::now);
            let events = db::fetch_events(&connect().await?).await?;
            let split = split_by_time(&events, now);

            for (phase, bucket) in [
                (EventPhase::Future, &split.future),
                (EventPhase::Ongoing, &split.ongoing),
                (EventPhase::Past, &split.past),
            ] {
                println!("{} ({})", phase.label(), bucket.len());
                for event in bucket {
                    println!(
                        "- {} [{} to {}] {}",
                        event.title,
                        event.start_at.format("%Y-%m-%d %H:%M"),
                        event.end_at.format("%H:%M"),
                        reservation::reserved_label(
                            event.reservation_mode,
                            event.reserved_count,
                            event.capacity
                        )
                    );
                }
            }
        }
        Commands::Rankings { kind, limit, json } => {
            let pool = connect().await?;
            let events = db::fetch_events(&pool).await?;
            let hosts = db::fetch_hosts(&pool).await?;
            print_board(&events, &hosts, kind, limit, json)?;
        }
        Commands::Report { out } => {
            let pool = connect().await?;
            let events = db::fetch_events(&pool).await?;
            let hosts = db::fetch_hosts(&pool).await?;
            let report = report::build_report(&events, &hosts, Utc::now());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Reserve { event, user } => {
            let pool = connect().await?;
            let mut record = db::fetch_event(&pool, event)
                .await?
                .with_context(|| format!("event {event} not found"))?;
            let profile = db::fetch_host(&pool, user).await?;
            if profile.is_none() {
                warn!(%user, "no profile found, treating as unverified");
            }
            let viewer = Viewer {
                user_id: user,
                verified: profile.is_some_and(|p| p.verified),
            };

            let previous = record.reserved_count;
            let reserved = reservation::reserve(&viewer, &mut record, Utc::now())?;
            if !db::store_reserved_count(&pool, event, previous, reserved).await? {
                anyhow::bail!("event {event} changed while reserving, try again");
            }
            info!(%event, %user, reserved, "reservation stored");
            println!(
                "Reserved. {}",
                reservation::reserved_label(record.reservation_mode, reserved, record.capacity)
            );
        }
        Commands::ScoreCsv {
            hosts,
            events,
            ratings,
            kind,
            limit,
            json,
        } => {
            let (hosts, events) = import::load_csv(&hosts, &events, &ratings)?;
            print_board(&events, &hosts, kind, limit, json)?;
        }
    }

    Ok(())
}
