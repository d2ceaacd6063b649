mod error;
mod monitor;
mod notify;
mod parser;
mod settings;
mod source;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use tracing::info;

use notify::{LogNotifier, Notifier, SlackNotifier};
use settings::{Settings, SlackSettings, TrackedCourse};
use source::{FileSource, PageSource, SpiderSource};

#[derive(Parser)]
#[command(name = "enroll_monitor", about = "Watch a class planner page and ping Slack when seats open")]
struct Cli {
    /// Settings file (TOML); skipped if missing
    #[arg(long, global = true, default_value = "monitor.toml")]
    config: PathBuf,

    /// Course to track as LABEL=CODE, replaces the configured list (repeatable)
    #[arg(long = "course", value_name = "LABEL=CODE", global = true)]
    courses: Vec<TrackedCourse>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the enrollment page and notify when a tracked course has seats
    Watch {
        /// Read page text from this file on every poll instead of rendering the URL
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Seconds between polls
        #[arg(short, long)]
        interval: Option<u64>,
        /// Log notifications instead of posting to Slack
        #[arg(long)]
        dry_run: bool,
    },
    /// Evaluate tracked courses against saved page snapshots
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Print reports as JSON
        #[arg(long)]
        json: bool,
        /// Print the evidence excerpt under each result
        #[arg(long)]
        evidence: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.config)?;

    match cli.command {
        Commands::Watch {
            snapshot,
            interval,
            dry_run,
        } => {
            settings.apply_overrides(interval, cli.courses)?;

            let source: Box<dyn PageSource> = match snapshot {
                Some(path) => Box::new(FileSource::new(path)),
                None => Box::new(SpiderSource::from_env(&settings.url)?),
            };
            let notifier: Box<dyn Notifier> = if dry_run {
                Box::new(LogNotifier)
            } else {
                Box::new(SlackNotifier::new(SlackSettings::from_env()?)?)
            };

            info!("Watching {}", source.name());
            monitor::run(
                source.as_ref(),
                notifier.as_ref(),
                &settings.courses,
                Duration::from_secs(settings.interval),
            )
            .await
        }
        Commands::Check {
            files,
            json,
            evidence,
        } => {
            settings.apply_overrides(None, cli.courses)?;

            let reports: Vec<_> = files
                .par_iter()
                .map(|f| monitor::check_file(f, &settings.courses))
                .collect();

            let mut failures = 0usize;
            let mut ok = Vec::new();
            for report in reports {
                match report {
                    Ok(r) => ok.push(r),
                    Err(e) => {
                        eprintln!("{:#}", e);
                        failures += 1;
                    }
                }
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&ok)?);
            } else {
                for report in &ok {
                    for r in &report.results {
                        println!("{}: {}", report.file.display(), r.label);
                        if evidence && !r.availability.evidence.is_empty() {
                            for line in r.availability.evidence.lines() {
                                println!("    {}", line);
                            }
                        }
                    }
                }
            }

            if failures > 0 {
                bail!("{} of {} snapshots could not be read", failures, files.len());
            }
            Ok(())
        }
    }
}
