use chrono::NaiveDateTime;
use garde::Validate;
use serde::{Deserialize, Serialize};

#[cfg(feature = "backend")]
use {deepseq_schema::request, diesel::prelude::*};

use super::{Endpoint, record::RecordType};

/// The status every request starts in.
pub const NEW_STATUS: i32 = 0;

pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// A request's name is derived from its id once the id exists, which makes it unique
/// without a separate sequence.
#[must_use]
pub fn request_name(id: i32) -> String {
    format!("Request{id}")
}

#[must_use]
pub fn format_date(date: &NaiveDateTime) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(
    feature = "backend",
    derive(Queryable, Selectable, Identifiable),
    diesel(table_name = request, check_for_backend(diesel::sqlite::Sqlite))
)]
pub struct Request {
    pub id: i32,
    pub name: String,
    pub status: i32,
    pub researcher_id: i32,
    pub description: String,
    pub date_created: NaiveDateTime,
    pub deep_seq_request_id: Option<i32>,
}

impl Endpoint for Request {
    fn endpoint() -> String {
        "/requests".to_string()
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "backend", derive(Insertable), diesel(table_name = request))]
pub struct NewRequest {
    pub name: String,
    pub status: i32,
    pub researcher_id: i32,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(
    feature = "backend",
    derive(Identifiable, AsChangeset),
    diesel(table_name = request)
)]
pub struct RequestUpdate {
    pub id: i32,
    pub name: Option<String>,
    pub status: Option<i32>,
    pub description: Option<String>,
    pub deep_seq_request_id: Option<i32>,
}

impl RequestUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(
            self,
            Self {
                name: None,
                status: None,
                description: None,
                deep_seq_request_id: None,
                ..
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveMode {
    Add,
    Edit,
}

/// The form submitted to create or edit a request. `libraries` and `samples` are
/// JSON-encoded lists of record ids.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaveRequestForm {
    #[garde(skip)]
    pub mode: SaveMode,
    #[garde(skip)]
    pub request_id: Option<String>,
    #[garde(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[garde(length(min = 1))]
    pub description: String,
    #[garde(range(min = 0))]
    pub status: Option<i32>,
    #[garde(skip)]
    #[serde(default = "empty_id_list")]
    pub libraries: String,
    #[garde(skip)]
    #[serde(default = "empty_id_list")]
    pub samples: String,
}

fn empty_id_list() -> String {
    "[]".to_string()
}

impl SaveRequestForm {
    /// # Errors
    /// Fails when `libraries` isn't a JSON list of integers.
    pub fn library_ids(&self) -> Result<Vec<i32>, serde_json::Error> {
        serde_json::from_str(&self.libraries)
    }

    /// # Errors
    /// Fails when `samples` isn't a JSON list of integers.
    pub fn sample_ids(&self) -> Result<Vec<i32>, serde_json::Error> {
        serde_json::from_str(&self.samples)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestIdForm {
    pub request_id: Option<String>,
}

/// One row of the request list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSummary {
    pub request_id: i32,
    pub status: i32,
    pub name: String,
    pub date_created: String,
    pub description: String,
    pub researcher_id: i32,
    pub researcher: String,
    pub deep_seq_request_name: String,
    pub deep_seq_request_path: String,
    pub sum_seq_depth: i64,
}

/// Newest first.
pub fn order_request_list(summaries: &mut [RequestSummary]) {
    summaries.sort_by(|a, b| b.request_id.cmp(&a.request_id));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordId {
    #[serde(rename = "libraryId")]
    Library(i32),
    #[serde(rename = "sampleId")]
    Sample(i32),
}

impl RecordId {
    #[must_use]
    pub fn record_type(self) -> RecordType {
        match self {
            Self::Library(_) => RecordType::Library,
            Self::Sample(_) => RecordType::Sample,
        }
    }
}

/// A library or sample attached to a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestItem {
    pub name: String,
    pub record_type: RecordType,
    #[serde(flatten)]
    pub id: RecordId,
    pub barcode: String,
}

impl RequestItem {
    #[must_use]
    pub fn new(id: RecordId, name: String, barcode: String) -> Self {
        Self {
            name,
            record_type: id.record_type(),
            id,
            barcode,
        }
    }
}

pub fn order_by_barcode(items: &mut [RequestItem]) {
    items.sort_by(|a, b| a.barcode.cmp(&b.barcode));
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UploadedFile {
    pub name: String,
    pub path: String,
}
