use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::notify::Notifier;
use crate::parser::{self, Availability};
use crate::settings::TrackedCourse;
use crate::source::PageSource;

/// What one poll produced.
pub struct PollSummary {
    pub results: Vec<Availability>,
    pub notified: usize,
    pub failed: usize,
}

#[derive(Serialize)]
pub struct CourseReport {
    pub label: String,
    #[serde(flatten)]
    pub availability: Availability,
}

/// Results for one saved page snapshot, as printed by `check --json`.
#[derive(Serialize)]
pub struct SnapshotReport {
    pub file: PathBuf,
    pub checked_at: DateTime<Local>,
    pub results: Vec<CourseReport>,
}

/// Evaluate every tracked course against one snapshot, in list order.
pub fn evaluate(page_text: &str, courses: &[TrackedCourse]) -> Vec<Availability> {
    courses
        .iter()
        .map(|c| parser::get_course_availability(page_text, &c.label, &c.code))
        .collect()
}

pub fn notification_message(availability: &Availability) -> String {
    format!("*{}*", availability)
}

/// Fetch one snapshot, evaluate it, and notify for available courses.
pub async fn poll_once(
    source: &dyn PageSource,
    notifier: &dyn Notifier,
    courses: &[TrackedCourse],
) -> Result<PollSummary> {
    let text = source
        .fetch_text()
        .await
        .with_context(|| format!("Failed to fetch page from {}", source.name()))?;

    let results = evaluate(&text, courses);
    let mut notified = 0usize;
    let mut failed = 0usize;

    for availability in &results {
        info!(course = %availability.course, "{}", availability);
        debug!(course = %availability.course, evidence = %availability.evidence);

        if !availability.is_notifiable() {
            continue;
        }
        info!("Posting {}", availability);
        if notifier.send(&notification_message(availability)).await {
            notified += 1;
        } else {
            warn!("Notification for {} was not delivered", availability.course);
            failed += 1;
        }
    }

    Ok(PollSummary {
        results,
        notified,
        failed,
    })
}

/// Poll forever at `interval` until `shutdown` resolves.
///
/// A failed fetch skips that poll; the loop keeps going.
pub async fn run_until(
    source: &dyn PageSource,
    notifier: &dyn Notifier,
    courses: &[TrackedCourse],
    interval: Duration,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    tokio::pin!(shutdown);
    let names: Vec<String> = courses.iter().map(ToString::to_string).collect();
    info!(
        "Starting monitor loop (refresh every {}s, courses={:?})",
        interval.as_secs(),
        names
    );

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Stopped by user");
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {}
        }

        match poll_once(source, notifier, courses).await {
            Ok(summary) => debug!(
                courses = summary.results.len(),
                notified = summary.notified,
                failed = summary.failed,
                "Poll complete"
            ),
            Err(e) => warn!("Poll skipped: {:#}", e),
        }
    }
}

pub async fn run(
    source: &dyn PageSource,
    notifier: &dyn Notifier,
    courses: &[TrackedCourse],
    interval: Duration,
) -> Result<()> {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    run_until(source, notifier, courses, interval, ctrl_c).await
}

/// Evaluate the tracked courses against a saved snapshot file.
pub fn check_file(path: &Path, courses: &[TrackedCourse]) -> Result<SnapshotReport> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {:?}", path))?;
    let results = evaluate(&text, courses)
        .into_iter()
        .map(|availability| CourseReport {
            label: availability.summary(),
            availability,
        })
        .collect();

    Ok(SnapshotReport {
        file: path.to_path_buf(),
        checked_at: Local::now(),
        results,
    })
}
