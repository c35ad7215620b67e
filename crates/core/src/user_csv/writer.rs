//! Report writer: one CSV row per outcome, or the whole run as JSON.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::ReportFormat;
use crate::error::{OnboardError, Result};
use crate::models::{ProcessingOutcome, RunReport};

/// Column names of [`ReportRow`], in serialization order.
const REPORT_COLUMNS: [&str; 10] = [
    "username",
    "displayName",
    "email",
    "department",
    "action",
    "status",
    "errorDetail",
    "note",
    "generatedPassword",
    "homeDirectory",
];

/// Flat CSV row for a single outcome.
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    username: &'a str,
    #[serde(rename = "displayName")]
    display_name: &'a str,
    email: &'a str,
    department: &'a str,
    action: &'a str,
    status: &'a str,
    #[serde(rename = "errorDetail")]
    error_detail: &'a str,
    note: &'a str,
    #[serde(rename = "generatedPassword")]
    generated_password: &'a str,
    #[serde(rename = "homeDirectory")]
    home_directory: &'a str,
}

impl<'a> ReportRow<'a> {
    fn from_outcome(outcome: &'a ProcessingOutcome, include_passwords: bool) -> Self {
        Self {
            username: &outcome.username,
            display_name: &outcome.display_name,
            email: &outcome.email,
            department: &outcome.department,
            action: outcome.action.as_str(),
            status: outcome.status.as_str(),
            error_detail: outcome.error_detail.as_deref().unwrap_or(""),
            note: outcome.note.as_deref().unwrap_or(""),
            generated_password: if include_passwords {
                outcome.generated_password.as_deref().unwrap_or("")
            } else {
                ""
            },
            home_directory: outcome.home_directory_path.as_deref().unwrap_or(""),
        }
    }
}

/// File name for a report: `onboard-<action>-<YYYYmmdd-HHMMSS>-<run>.<ext>`,
/// where `<run>` is the first eight alphanumerics of the run id.
pub fn report_file_name(report: &RunReport, format: ReportFormat) -> String {
    let run: String = report
        .run_id
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(8)
        .collect();
    format!(
        "onboard-{}-{}-{run}.{}",
        report.action,
        report.started_at.format("%Y%m%d-%H%M%S"),
        format.extension()
    )
}

/// Write the report artifact into `dir`, creating it if needed.
///
/// Generated passwords are blanked unless `include_passwords` is set.
pub fn write_report(
    report: &RunReport,
    dir: &Path,
    format: ReportFormat,
    include_passwords: bool,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(report, format));

    match format {
        ReportFormat::Csv => write_csv(&path, report, include_passwords)?,
        ReportFormat::Json => write_json(&path, report, include_passwords)?,
    }

    Ok(path)
}

fn write_csv(path: &Path, report: &RunReport, include_passwords: bool) -> Result<()> {
    let mut wtr =
        csv::Writer::from_path(path).map_err(|e| OnboardError::Io(std::io::Error::other(e)))?;

    // serialize() only emits the header together with the first row
    if report.outcomes.is_empty() {
        wtr.write_record(REPORT_COLUMNS).map_err(|e| {
            OnboardError::Serialization(format!("CSV write error in {}: {e}", path.display()))
        })?;
    }

    for outcome in &report.outcomes {
        wtr.serialize(ReportRow::from_outcome(outcome, include_passwords))
            .map_err(|e| {
                OnboardError::Serialization(format!(
                    "CSV write error in {}: {e}",
                    path.display()
                ))
            })?;
    }

    wtr.flush()?;
    Ok(())
}

fn write_json(path: &Path, report: &RunReport, include_passwords: bool) -> Result<()> {
    let body = if include_passwords {
        serde_json::to_vec_pretty(report)
    } else {
        let mut redacted = report.clone();
        for outcome in &mut redacted.outcomes {
            outcome.generated_password = None;
        }
        serde_json::to_vec_pretty(&redacted)
    }
    .map_err(|e| OnboardError::Serialization(format!("failed to serialize report: {e}")))?;

    std::fs::write(path, body)?;
    Ok(())
}
