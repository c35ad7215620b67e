//! Record validation: a fatal schema check and non-fatal row-level data
//! quality scanning.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::warn;

use crate::error::{OnboardError, Result};
use crate::models::{Action, RecordBatch, RecordField};

/// Advisory findings for a batch that passed the schema check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// One entry per flagged row.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Validate a batch for the given action.
///
/// Fails with [`OnboardError::EmptyInput`] when there are no records and with
/// [`OnboardError::Schema`] naming every required column the header lacks.
/// Row-level findings are warnings and never fail validation: a blank
/// username, any blank required cell on Create, an email that is not
/// `local@domain.tld`, and a username already used earlier in the batch.
pub fn validate(batch: &RecordBatch, action: Action) -> Result<ValidationReport> {
    if batch.is_empty() {
        return Err(OnboardError::EmptyInput);
    }

    let missing: Vec<String> = action
        .required_fields()
        .iter()
        .filter(|field| !batch.columns.contains(field))
        .map(|field| field.column_name().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(OnboardError::Schema { missing });
    }

    let mut report = ValidationReport::default();
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    for record in &batch.records {
        let mut issues = Vec::new();
        let username = record.username.trim();

        for &field in action.required_fields() {
            let blank = record.get(field).trim().is_empty();
            if blank && (field == RecordField::Username || action == Action::Create) {
                issues.push(format!("{} is blank", field.column_name()));
            }
        }

        let email = record.email.trim();
        if !email.is_empty() && !looks_like_email(email) {
            issues.push(format!("email {email:?} is malformed"));
        }

        if !username.is_empty() {
            match first_seen.entry(username.to_lowercase()) {
                Entry::Occupied(seen) => {
                    issues.push(format!("duplicate username (first seen on line {})", seen.get()));
                }
                Entry::Vacant(slot) => {
                    slot.insert(record.line_number);
                }
            }
        }

        if issues.is_empty() {
            continue;
        }

        let label = if username.is_empty() {
            format!("line {}", record.line_number)
        } else {
            format!("line {} ({})", record.line_number, record.username)
        };
        let message = format!("{label}: {}", issues.join(", "));
        warn!(line = record.line_number, "{message}");
        report.warnings.push(message);
    }

    Ok(report)
}

/// One `@`, a non-empty local part, a dotted domain, no whitespace.
fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InputRecord;
    use std::collections::BTreeSet;

    fn record(line: usize, username: &str, email: &str) -> InputRecord {
        InputRecord {
            line_number: line,
            first_name: "First".into(),
            last_name: "Last".into(),
            username: username.into(),
            department: "IT".into(),
            job_title: "Dev".into(),
            email: email.into(),
        }
    }

    fn batch_with(columns: &[RecordField], records: Vec<InputRecord>) -> RecordBatch {
        RecordBatch::new(columns.iter().copied().collect::<BTreeSet<_>>(), records)
    }

    #[test]
    fn empty_batch_is_fatal() {
        let batch = batch_with(&RecordField::ALL, vec![]);
        for action in [Action::Create, Action::Modify, Action::Delete, Action::Report] {
            assert!(matches!(
                validate(&batch, action),
                Err(OnboardError::EmptyInput)
            ));
        }
    }

    #[test]
    fn full_schema_passes_every_action() {
        let batch = batch_with(&RecordField::ALL, vec![record(2, "jdoe", "j@x.local")]);
        for action in [Action::Create, Action::Modify, Action::Delete, Action::Report] {
            let report = validate(&batch, action).unwrap();
            assert!(report.is_clean());
        }
    }

    #[test]
    fn schema_error_names_exactly_the_missing_columns() {
        let batch = batch_with(
            &[RecordField::Username, RecordField::FirstName, RecordField::LastName],
            vec![record(2, "jdoe", "")],
        );
        match validate(&batch, Action::Create) {
            Err(OnboardError::Schema { missing }) => {
                assert_eq!(missing, vec!["department", "jobTitle", "email"]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn modify_requires_profile_columns() {
        let batch = batch_with(
            &[RecordField::Username, RecordField::Email],
            vec![record(2, "jdoe", "j@x.local")],
        );
        match validate(&batch, Action::Modify) {
            Err(OnboardError::Schema { missing }) => {
                assert_eq!(
                    missing,
                    vec!["firstName", "lastName", "department", "jobTitle"]
                );
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn delete_needs_only_username() {
        let batch = batch_with(&[RecordField::Username], vec![record(2, "jdoe", "")]);
        assert!(validate(&batch, Action::Delete).is_ok());

        let batch = batch_with(&[RecordField::Email], vec![record(2, "jdoe", "")]);
        match validate(&batch, Action::Delete) {
            Err(OnboardError::Schema { missing }) => assert_eq!(missing, vec!["username"]),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn blank_username_is_a_warning_for_every_action() {
        let batch = batch_with(
            &RecordField::ALL,
            vec![record(2, "jdoe", "j@x.local"), record(3, "", "x@x.local")],
        );
        for action in [Action::Create, Action::Modify, Action::Delete] {
            let report = validate(&batch, action).unwrap();
            assert_eq!(report.warning_count(), 1);
            assert_eq!(report.warnings[0], "line 3: username is blank");
        }
    }

    #[test]
    fn blank_email_is_flagged_only_on_create() {
        let batch = batch_with(&RecordField::ALL, vec![record(2, "jdoe", "")]);

        let report = validate(&batch, Action::Create).unwrap();
        assert_eq!(report.warnings, vec!["line 2 (jdoe): email is blank"]);

        let report = validate(&batch, Action::Modify).unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn row_with_two_issues_counts_once() {
        let batch = batch_with(&RecordField::ALL, vec![record(4, "", "")]);
        let report = validate(&batch, Action::Create).unwrap();
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.warnings[0], "line 4: username is blank, email is blank");
    }

    #[test]
    fn blank_cells_are_flagged_only_on_create() {
        let mut rec = record(2, "jdoe", "j@x.local");
        rec.department = String::new();
        rec.job_title = " ".into();
        let batch = batch_with(&RecordField::ALL, vec![rec]);

        let report = validate(&batch, Action::Create).unwrap();
        assert_eq!(
            report.warnings,
            vec!["line 2 (jdoe): department is blank, jobTitle is blank"]
        );
        assert!(validate(&batch, Action::Modify).unwrap().is_clean());
    }

    #[test]
    fn duplicate_username_is_a_warning() {
        let batch = batch_with(
            &RecordField::ALL,
            vec![
                record(2, "jdoe", "j@x.local"),
                record(3, "asmith", "a@x.local"),
                record(4, "JDoe", "jd@x.local"),
            ],
        );
        for action in [Action::Create, Action::Modify, Action::Delete] {
            let report = validate(&batch, action).unwrap();
            assert_eq!(
                report.warnings,
                vec!["line 4 (JDoe): duplicate username (first seen on line 2)"]
            );
        }
    }

    #[test]
    fn malformed_email_is_a_warning() {
        let batch = batch_with(
            &RecordField::ALL,
            vec![
                record(2, "a", "john.doe@x.local"),
                record(3, "b", "john.doe"),
                record(4, "c", "john@doe"),
                record(5, "d", "john doe@x.local"),
                record(6, "e", "@x.local"),
                record(7, "f", "a@b@x.local"),
            ],
        );
        let report = validate(&batch, Action::Modify).unwrap();
        let lines: Vec<&str> = report
            .warnings
            .iter()
            .map(|w| w.split(':').next().unwrap())
            .collect();
        assert_eq!(
            lines,
            ["line 3 (b)", "line 4 (c)", "line 5 (d)", "line 6 (e)", "line 7 (f)"]
        );
        assert_eq!(report.warnings[0], r#"line 3 (b): email "john.doe" is malformed"#);
    }

    #[test]
    fn email_shape() {
        assert!(looks_like_email("john.doe@corp.example.com"));
        assert!(!looks_like_email("john.doe@corp."));
        assert!(!looks_like_email("john.doe@.com"));
    }
}
