mod classify;
mod config;
mod db;
mod extract;
mod fetch;
mod models;
mod pipeline;
mod salary;
mod store;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use classify::{classify, validate_job_url};
use config::Config;
use db::{SheetDb, Table};
use fetch::PageFetcher;
use models::{JobRecord, Platform, SheetRow, COLUMNS};
use pipeline::{JobInput, Pipeline, PipelineConfig};
use store::{PersistError, RecordGateway, TabularStore};

#[derive(Parser)]
#[command(name = "jobclip")]
#[command(about = "Clip job postings into a tracking sheet")]
struct Cli {
    /// Path to the sheet database (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Use the generic parser for every site
    #[arg(long, global = true)]
    legacy_parser: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Fetch a job posting and save it
    Add {
        /// Job posting URL
        url: String,

        /// Parse this saved HTML instead of fetching the URL
        #[arg(long)]
        html_file: Option<PathBuf>,

        /// Move the most recent row to trash and save in its place
        #[arg(short, long)]
        replace: bool,

        /// Status to save with (defaults to config)
        #[arg(short, long)]
        status: Option<String>,

        /// Notes to add to the row
        #[arg(short, long)]
        notes: Option<String>,

        /// Show the parsed row without saving
        #[arg(long)]
        dry_run: bool,

        /// Print the parsed record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Save a job from copied page text (Handshake and other login-only sites)
    Paste {
        /// Job posting URL, if known
        #[arg(short, long)]
        url: Option<String>,

        /// Read text from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Move the most recent row to trash and save in its place
        #[arg(short, long)]
        replace: bool,

        /// Status to save with (defaults to config)
        #[arg(short, long)]
        status: Option<String>,

        /// Notes to add to the row
        #[arg(short, long)]
        notes: Option<String>,

        /// Show the parsed row without saving
        #[arg(long)]
        dry_run: bool,

        /// Print the parsed record as JSON
        #[arg(long)]
        json: bool,
    },

    /// List saved jobs, newest first
    List {
        /// Number of rows to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// List trashed jobs, newest first
    Trash {
        /// Number of rows to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Normalize a salary string
    Salary {
        /// e.g. "$25/hr" or "$120k-150k"
        text: String,
    },
}

/// Manual edits applied to a parsed record before saving.
struct Review {
    status: Option<String>,
    notes: Option<String>,
    replace: bool,
    dry_run: bool,
    json: bool,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobclip=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_db(cli_path: Option<PathBuf>, config: &Config) -> Result<SheetDb> {
    let path = cli_path.or_else(|| config.database_path.clone());
    SheetDb::open(path.as_deref())
}

fn print_record(record: &JobRecord) {
    println!("Position: {}", record.title);
    println!("Company:  {}", record.company);
    println!("Location: {}", record.location);
    println!("Salary:   {}", record.salary_normalized.display);
    println!("Job type: {}", record.job_type);
    println!("Remote:   {}", record.remote);
    println!("Status:   {}", record.status);
    println!("Source:   {}", record.platform);
    println!("Link:     {}", record.url);
    if !record.notes.is_empty() {
        println!("Notes:    {}", record.notes);
    }
}

fn record_json(record: &JobRecord) -> Result<String> {
    serde_json::to_string_pretty(record).context("Failed to serialize job record")
}

fn print_rows(rows: &[SheetRow], empty_message: &str) {
    if rows.is_empty() {
        println!("{}", empty_message);
        return;
    }
    println!(
        "{:<12} {:<20} {:<28} {:<18} {:<24} {:<12}",
        COLUMNS[0], COLUMNS[1], COLUMNS[3], COLUMNS[2], COLUMNS[5], COLUMNS[8]
    );
    println!("{}", "-".repeat(119));
    for row in rows {
        println!(
            "{:<12} {:<20} {:<28} {:<18} {:<24} {:<12}",
            row[0],
            truncate(&row[1], 18),
            truncate(&row[3], 26),
            truncate(&row[2], 16),
            truncate(&row[5], 22),
            truncate(&row[8], 12)
        );
    }
}

fn apply_review(record: &mut JobRecord, review: &Review) {
    if let Some(status) = review.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        record.status = status.to_string();
    }
    if let Some(notes) = review.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        record.notes = if record.notes.is_empty() {
            notes.to_string()
        } else {
            format!("{}; {}", notes, record.notes)
        };
    }
}

fn save(db: SheetDb, pipeline: &Pipeline, mut record: JobRecord, review: &Review) -> Result<()> {
    apply_review(&mut record, review);
    if review.json {
        println!("{}", record_json(&record)?);
    } else {
        print_record(&record);
    }

    if review.dry_run {
        if db.ensure_initialized().is_ok() {
            if let Some(position) = RecordGateway::new(db).find_by_url(&record.url)? {
                eprintln!("Already saved at {}.", position);
            }
        }
        eprintln!("(dry run, nothing saved)");
        return Ok(());
    }

    db.ensure_initialized()?;
    let mut gateway = RecordGateway::new(db);

    match pipeline.submit(&mut gateway, &record, review.replace) {
        Ok(position) => {
            if review.replace {
                eprintln!("Saved at {} (previous top row moved to trash).", position);
            } else {
                eprintln!("Saved at {}.", position);
            }
            eprintln!(
                "{} jobs, {} in trash.",
                gateway.store().row_count()?,
                gateway.store().archive_count()?
            );
            Ok(())
        }
        Err(PersistError::DuplicateUrl { url, position }) => Err(anyhow!(
            "{} is already saved at {}. Use --replace to overwrite the most recent row.",
            url,
            position
        )),
        Err(e) => Err(e).context("Failed to save job"),
    }
}

fn read_pasted_text(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read job text from stdin")?;
            Ok(text)
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::load()?;

    let mut pipeline_config = PipelineConfig::from(&config);
    if cli.legacy_parser {
        pipeline_config.platform_parsers = false;
    }
    let pipeline = Pipeline::new(pipeline_config);

    match cli.command {
        Commands::Init => {
            let db = open_db(cli.db, &config)?;
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Add {
            url,
            html_file,
            replace,
            status,
            notes,
            dry_run,
            json,
        } => {
            let parsed = validate_job_url(&url).map_err(|e| anyhow!(e))?;
            let url = parsed.to_string();

            let input = match html_file {
                Some(path) => {
                    let markup = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    JobInput::Page { markup, url }
                }
                None => {
                    if classify(Some(url.as_str())) == Platform::Handshake {
                        return Err(anyhow!(
                            "Handshake postings need a login. Copy the page text and run: jobclip paste --url {}",
                            url
                        ));
                    }
                    let fetcher = PageFetcher::new(
                        &config.user_agent,
                        Duration::from_secs(config.fetch_timeout_secs),
                    )?;
                    let page = fetcher.fetch(&url)?;
                    JobInput::Page {
                        markup: page.markup,
                        url: page.final_url,
                    }
                }
            };

            let record = pipeline.build(&input);
            let db = open_db(cli.db, &config)?;
            let review = Review {
                status,
                notes,
                replace,
                dry_run,
                json,
            };
            save(db, &pipeline, record, &review)?;
        }

        Commands::Paste {
            url,
            file,
            replace,
            status,
            notes,
            dry_run,
            json,
        } => {
            let url = match url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
                Some(u) => Some(validate_job_url(u).map_err(|e| anyhow!(e))?.to_string()),
                None => None,
            };
            let text = read_pasted_text(file.as_ref())?;
            if text.trim().is_empty() {
                return Err(anyhow!("No job text provided"));
            }

            let record = pipeline.build(&JobInput::Pasted { text, url });
            let db = open_db(cli.db, &config)?;
            let review = Review {
                status,
                notes,
                replace,
                dry_run,
                json,
            };
            save(db, &pipeline, record, &review)?;
        }

        Commands::List { limit } => {
            let db = open_db(cli.db, &config)?;
            db.ensure_initialized()?;
            let rows = db.list_rows(Table::Jobs, limit)?;
            print_rows(&rows, "No jobs saved yet.");
        }

        Commands::Trash { limit } => {
            let db = open_db(cli.db, &config)?;
            db.ensure_initialized()?;
            let rows = db.list_rows(Table::Trash, limit)?;
            print_rows(&rows, "Trash is empty.");
        }

        Commands::Salary { text } => {
            let normalized = salary::normalize(&text);
            match normalized.annual_amount {
                Some(annual) => {
                    println!("{}", normalized.display);
                    println!("Annual: {}", salary::format_money(annual, 0));
                }
                None => println!("Not recognized: {}", normalized.display),
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
