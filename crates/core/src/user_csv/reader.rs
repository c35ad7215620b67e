//! User CSV reader: loads an input file into a [`RecordBatch`].

use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;

use crate::error::{OnboardError, Result};
use crate::models::{InputRecord, RecordBatch, RecordField};

/// UTF-8 BOM bytes.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Read user records from a CSV file.
///
/// Header names are matched case-insensitively in any order and unknown
/// columns are ignored. A missing or unreadable file is an I/O error.
pub fn read_records(path: &Path) -> Result<RecordBatch> {
    if !path.is_file() {
        return Err(OnboardError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input file not found: {}", path.display()),
        )));
    }

    let data = std::fs::read(path)?;
    let batch = parse_records(&data, &path.display().to_string())?;
    debug!(
        path = %path.display(),
        records = batch.len(),
        columns = batch.columns.len(),
        "read input file"
    );
    Ok(batch)
}

/// Parse user records from raw CSV bytes. `source` names the input in errors.
pub fn parse_records(data: &[u8], source: &str) -> Result<RecordBatch> {
    let data = strip_utf8_bom(data);

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers = rdr
        .headers()
        .map_err(|e| OnboardError::Serialization(format!("CSV header error in {source}: {e}")))?
        .clone();

    let mapping: Vec<Option<RecordField>> =
        headers.iter().map(RecordField::from_column).collect();
    let columns: BTreeSet<RecordField> = mapping.iter().flatten().copied().collect();

    let mut records = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let row = result.map_err(|e| {
            OnboardError::Serialization(format!("CSV parse error in {source}: {e}"))
        })?;

        let line_number = row
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);
        let mut record = InputRecord {
            line_number,
            ..Default::default()
        };
        for (cell, field) in row.iter().zip(mapping.iter()) {
            if let Some(field) = field {
                record.set(*field, cell);
            }
        }
        records.push(record);
    }

    Ok(RecordBatch::new(columns, records))
}

/// Strip UTF-8 BOM from the beginning of data if present.
fn strip_utf8_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}
