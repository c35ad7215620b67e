//! Input records and the action selected for a run.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OnboardError;

/// A column of the input table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordField {
    FirstName,
    LastName,
    Username,
    Department,
    JobTitle,
    Email,
}

impl RecordField {
    /// Every known column, in canonical order.
    pub const ALL: [RecordField; 6] = [
        RecordField::FirstName,
        RecordField::LastName,
        RecordField::Username,
        RecordField::Department,
        RecordField::JobTitle,
        RecordField::Email,
    ];

    /// The header name used in input files and reports.
    pub fn column_name(self) -> &'static str {
        match self {
            RecordField::FirstName => "firstName",
            RecordField::LastName => "lastName",
            RecordField::Username => "username",
            RecordField::Department => "department",
            RecordField::JobTitle => "jobTitle",
            RecordField::Email => "email",
        }
    }

    /// Match a header cell against the known columns, ignoring case and
    /// surrounding whitespace.
    pub fn from_column(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.column_name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// One row of the input table. Values are trimmed when read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    /// 1-based line in the source file (header = 1, first data row = 2).
    pub line_number: usize,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub department: String,
    pub job_title: String,
    pub email: String,
}

impl InputRecord {
    /// Value of a single column.
    pub fn get(&self, field: RecordField) -> &str {
        match field {
            RecordField::FirstName => &self.first_name,
            RecordField::LastName => &self.last_name,
            RecordField::Username => &self.username,
            RecordField::Department => &self.department,
            RecordField::JobTitle => &self.job_title,
            RecordField::Email => &self.email,
        }
    }

    /// Set a single column, trimming the value.
    pub fn set(&mut self, field: RecordField, value: &str) {
        let value = value.trim().to_string();
        match field {
            RecordField::FirstName => self.first_name = value,
            RecordField::LastName => self.last_name = value,
            RecordField::Username => self.username = value,
            RecordField::Department => self.department = value,
            RecordField::JobTitle => self.job_title = value,
            RecordField::Email => self.email = value,
        }
    }

    /// Trimmed first and last name joined by a single space.
    pub fn display_name(&self) -> String {
        [self.first_name.trim(), self.last_name.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The records read from one input file together with the columns its
/// header actually named.
#[derive(Debug, Clone, Default)]
pub struct RecordBatch {
    pub columns: BTreeSet<RecordField>,
    pub records: Vec<InputRecord>,
}

impl RecordBatch {
    pub fn new(columns: BTreeSet<RecordField>, records: Vec<InputRecord>) -> Self {
        Self { columns, records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// What a run does with its records. Selected once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Modify,
    Delete,
    Report,
}

impl Action {
    /// Columns that must be present in the input header for this action.
    pub fn required_fields(self) -> &'static [RecordField] {
        match self {
            Action::Create | Action::Modify => &RecordField::ALL,
            Action::Delete | Action::Report => &[RecordField::Username],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Modify => "modify",
            Action::Delete => "delete",
            Action::Report => "report",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = OnboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Action::Create),
            "modify" => Ok(Action::Modify),
            "delete" => Ok(Action::Delete),
            "report" => Ok(Action::Report),
            _ => Err(OnboardError::UnknownAction(s.to_string())),
        }
    }
}
