//! Data model shared by the reader, the pipeline, and reporting.

pub mod outcome;
pub mod policy;
pub mod record;

pub use outcome::{OutcomeStatus, ProcessingOutcome, RunCounters, RunReport};
pub use policy::DepartmentGroupPolicy;
pub use record::{Action, InputRecord, RecordBatch, RecordField};
