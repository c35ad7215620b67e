//! CSV input of user records and CSV/JSON output of run reports.

pub mod reader;
pub mod writer;

pub use reader::{parse_records, read_records};
pub use writer::{report_file_name, write_report};
