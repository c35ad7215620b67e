//! Per-record outcomes, run counters, and the finished run report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{Action, InputRecord};

/// Severity of a record's primary outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Warning,
    Error,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::Warning => "warning",
            OutcomeStatus::Error => "error",
        }
    }
}

/// The result of processing one record (or one listed account for Report).
///
/// `error_detail` is set only for [`OutcomeStatus::Error`]; use the
/// constructors to keep that true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingOutcome {
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub department: String,
    pub action: Action,
    pub status: OutcomeStatus,
    pub error_detail: Option<String>,
    /// Advisory text: sub-step warnings, no-op explanations.
    pub note: Option<String>,
    /// Initial password, Create only.
    pub generated_password: Option<String>,
    pub home_directory_path: Option<String>,
}

impl ProcessingOutcome {
    fn base(record: &InputRecord, action: Action, status: OutcomeStatus) -> Self {
        Self {
            username: record.username.clone(),
            display_name: record.display_name(),
            email: record.email.clone(),
            department: record.department.clone(),
            action,
            status,
            error_detail: None,
            note: None,
            generated_password: None,
            home_directory_path: None,
        }
    }

    pub fn success(record: &InputRecord, action: Action) -> Self {
        Self::base(record, action, OutcomeStatus::Success)
    }

    pub fn warning(record: &InputRecord, action: Action, note: impl Into<String>) -> Self {
        let mut outcome = Self::base(record, action, OutcomeStatus::Warning);
        outcome.note = Some(note.into());
        outcome
    }

    pub fn error(record: &InputRecord, action: Action, detail: impl Into<String>) -> Self {
        let mut outcome = Self::base(record, action, OutcomeStatus::Error);
        outcome.error_detail = Some(detail.into());
        outcome
    }

    /// Append a line of advisory text, keeping earlier notes.
    pub fn push_note(&mut self, note: impl AsRef<str>) {
        match self.note {
            Some(ref mut existing) => {
                existing.push_str("; ");
                existing.push_str(note.as_ref());
            }
            None => self.note = Some(note.as_ref().to_string()),
        }
    }
}

/// Running totals for a run. Warnings never count toward success or failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub success_count: u64,
    pub failure_count: u64,
    pub warning_count: u64,
}

/// Everything a finished run hands to reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub action: Action,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub counters: RunCounters,
    pub outcomes: Vec<ProcessingOutcome>,
}

impl RunReport {
    /// A run succeeds when no record failed.
    pub fn is_success(&self) -> bool {
        self.counters.failure_count == 0
    }

    /// Outcomes with status Error, in input order.
    pub fn failures(&self) -> impl Iterator<Item = &ProcessingOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Error)
    }
}
