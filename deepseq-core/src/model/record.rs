use serde::{Deserialize, Serialize};

pub mod library;
pub mod sample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    #[serde(rename = "L")]
    Library,
    #[serde(rename = "S")]
    Sample,
}

impl RecordType {
    #[must_use]
    pub fn code(self) -> char {
        match self {
            Self::Library => 'L',
            Self::Sample => 'S',
        }
    }

    /// The name a human reads, as in "Library does not exist."
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Library => "Library",
            Self::Sample => "Sample",
        }
    }
}

/// Assigns the barcode of a record whose payload didn't carry one: the two-digit year, the
/// record type code and the zero-padded id, e.g. `25L000042`.
#[must_use]
pub fn assign_barcode(record_type: RecordType, year: i32, id: i32) -> String {
    format!("{:02}{}{id:06}", year.rem_euclid(100), record_type.code())
}

/// What the record endpoints hand back for every persisted row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub pk: i32,
    pub record_type: RecordType,
    pub name: String,
    pub barcode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl ToString, message: impl ToString) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn from_report(report: &garde::Report) -> Vec<Self> {
        report
            .iter()
            .map(|(path, error)| Self::new(path, error.message()))
            .collect()
    }

    #[must_use]
    pub fn from_deserialization(err: &serde_json::Error) -> Self {
        Self::new("", err)
    }
}

/// A payload that couldn't be persisted, identified by its position in the submitted batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejected {
    pub index: usize,
    pub errors: Vec<FieldError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Complete,
    Partial,
    Failed,
}

/// The result of reconciling a batch of record payloads. Every payload is either accepted
/// (and persisted) or rejected with its errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome<T> {
    pub accepted: Vec<T>,
    pub rejected: Vec<Rejected>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            accepted: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    /// An empty batch is a failure.
    #[must_use]
    pub fn status(&self) -> BatchStatus {
        match (self.accepted.is_empty(), self.rejected.is_empty()) {
            (true, _) => BatchStatus::Failed,
            (false, true) => BatchStatus::Complete,
            (false, false) => BatchStatus::Partial,
        }
    }

    pub fn reject(&mut self, index: usize, errors: Vec<FieldError>) {
        self.rejected.push(Rejected { index, errors });
    }
}
