pub mod blocks;
pub mod sections;
pub mod status;

use std::fmt;

use serde::Serialize;
use tracing::{trace, warn};

use crate::error::ExtractError;
use blocks::{split_class_blocks, CoursePattern};
use sections::{extract_rows, SectionRow};
use status::{classify, StatusVerdict};

/// Length (in chars) of the evidence excerpt kept from the first matching block.
pub const EVIDENCE_CHARS: usize = 600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Code absent from the page, or no block lists it on its code line.
    NotFound,
    /// The course block exists but has no lecture/lab rows.
    NoParsableRows,
    Status(StatusVerdict),
    Error { message: String },
}

/// Result of one course lookup against one page snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub course: String,
    pub code: String,
    pub outcome: Outcome,
    pub evidence: String,
}

impl Availability {
    pub fn summary(&self) -> String {
        self.to_string()
    }

    /// Only open seats or a waitlist are worth a ping.
    pub fn is_notifiable(&self) -> bool {
        matches!(
            self.outcome,
            Outcome::Status(StatusVerdict::Open(_) | StatusVerdict::Waitlist(_))
        )
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = &self.course;
        match &self.outcome {
            Outcome::NotFound | Outcome::NoParsableRows => write!(f, "[{} - NOT FOUND]", label),
            Outcome::Status(StatusVerdict::Closed) => write!(f, "[{} - CLOSED]", label),
            Outcome::Status(StatusVerdict::Open(n)) => write!(f, "[{} - {} SEATS OPEN]", label, n),
            Outcome::Status(StatusVerdict::Waitlist(n)) => {
                write!(f, "[{} - {} WAITLIST SEATS]", label, n)
            }
            Outcome::Error { .. } => write!(f, "[{} - ERROR]", label),
        }
    }
}

/// Three-stage pipeline: page text → class blocks → section rows → verdict.
///
/// Never fails: parser errors come back as `Outcome::Error` with the error
/// description as evidence.
pub fn get_course_availability(page_text: &str, label: &str, code: &str) -> Availability {
    let (outcome, evidence) = match lookup(page_text, code) {
        Ok(found) => found,
        Err(e) => {
            warn!(course = label, error = %e, "Extract availability failed");
            let message = e.to_string();
            (Outcome::Error { message: message.clone() }, message)
        }
    };

    Availability {
        course: label.to_string(),
        code: code.to_string(),
        outcome,
        evidence,
    }
}

fn lookup(page_text: &str, code: &str) -> Result<(Outcome, String), ExtractError> {
    if !page_text.contains(code) {
        return Ok((Outcome::NotFound, String::new()));
    }

    let pattern = CoursePattern::new(code)?;
    let matching: Vec<&str> = split_class_blocks(page_text)
        .into_iter()
        .filter(|block| pattern.matches(block))
        .collect();

    let Some(first) = matching.first() else {
        return Ok((Outcome::NotFound, String::new()));
    };
    let evidence = excerpt(first, EVIDENCE_CHARS);

    let rows: Vec<SectionRow> = matching.iter().flat_map(|b| extract_rows(b)).collect();
    if rows.is_empty() {
        return Ok((Outcome::NoParsableRows, evidence));
    }
    for row in &rows {
        trace!(code, kind = ?row.kind, row = %row.text);
    }

    let verdict = classify(&rows);
    Ok((Outcome::Status(verdict), evidence))
}

fn excerpt(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
