use chrono::NaiveDateTime;
use garde::Validate;
use serde::{Deserialize, Serialize};

#[cfg(feature = "backend")]
use {deepseq_schema::library, diesel::prelude::*};

use super::{RecordSummary, RecordType};
use crate::model::Endpoint;

#[derive(Debug, Clone, Deserialize, Validate)]
#[cfg_attr(feature = "backend", derive(Insertable), diesel(table_name = library))]
pub struct NewLibrary {
    #[garde(length(min = 1, max = 200))]
    pub name: String,
    #[garde(length(min = 1, max = 50))]
    pub barcode: Option<String>,
    #[garde(skip)]
    pub library_protocol_id: i32,
    #[garde(skip)]
    pub library_type_id: i32,
    #[garde(skip)]
    pub organism_id: i32,
    #[garde(skip)]
    pub read_length_id: i32,
    #[garde(skip)]
    pub index_type_id: Option<i32>,
    #[garde(pattern(r"^[ACGTN]+$"))]
    pub index_i7: Option<String>,
    #[garde(pattern(r"^[ACGTN]+$"))]
    pub index_i5: Option<String>,
    #[garde(range(min = 0.0))]
    pub concentration: Option<f64>,
    #[garde(skip)]
    pub concentration_method_id: Option<i32>,
    #[garde(range(min = 0))]
    pub mean_fragment_size: Option<i32>,
    #[garde(range(min = 0.0))]
    pub qpcr_result: Option<f64>,
    #[garde(range(min = 0.0))]
    pub starting_amount: Option<f64>,
    #[garde(range(min = 0))]
    pub pcr_cycles: Option<i32>,
    #[garde(range(min = 0.0))]
    pub nm: Option<f64>,
    #[garde(range(min = 1))]
    pub sequencing_depth: i32,
    #[garde(length(max = 2000))]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(
    feature = "backend",
    derive(Queryable, Selectable),
    diesel(table_name = library, check_for_backend(diesel::sqlite::Sqlite))
)]
pub struct Library {
    #[serde(rename = "pk")]
    pub id: i32,
    pub name: String,
    pub barcode: String,
    pub library_protocol_id: i32,
    pub library_type_id: i32,
    pub organism_id: i32,
    pub read_length_id: i32,
    pub index_type_id: Option<i32>,
    pub index_i7: Option<String>,
    pub index_i5: Option<String>,
    pub concentration: Option<f64>,
    pub concentration_method_id: Option<i32>,
    pub mean_fragment_size: Option<i32>,
    pub qpcr_result: Option<f64>,
    pub starting_amount: Option<f64>,
    pub pcr_cycles: Option<i32>,
    pub nm: Option<f64>,
    pub sequencing_depth: i32,
    pub comments: Option<String>,
    pub is_in_request: bool,
    pub date_created: NaiveDateTime,
}

impl Library {
    #[must_use]
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            pk: self.id,
            record_type: RecordType::Library,
            name: self.name.clone(),
            barcode: self.barcode.clone(),
        }
    }
}

impl Endpoint for Library {
    fn endpoint() -> String {
        "/libraries".to_string()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[cfg_attr(
    feature = "backend",
    derive(Identifiable, AsChangeset),
    diesel(table_name = library)
)]
pub struct LibraryUpdate {
    #[garde(skip)]
    #[serde(rename = "pk")]
    pub id: i32,
    #[garde(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[garde(length(min = 1, max = 50))]
    pub barcode: Option<String>,
    #[garde(skip)]
    pub library_protocol_id: Option<i32>,
    #[garde(skip)]
    pub library_type_id: Option<i32>,
    #[garde(skip)]
    pub organism_id: Option<i32>,
    #[garde(skip)]
    pub read_length_id: Option<i32>,
    #[garde(skip)]
    pub index_type_id: Option<i32>,
    #[garde(pattern(r"^[ACGTN]+$"))]
    pub index_i7: Option<String>,
    #[garde(pattern(r"^[ACGTN]+$"))]
    pub index_i5: Option<String>,
    #[garde(range(min = 0.0))]
    pub concentration: Option<f64>,
    #[garde(skip)]
    pub concentration_method_id: Option<i32>,
    #[garde(range(min = 0))]
    pub mean_fragment_size: Option<i32>,
    #[garde(range(min = 0.0))]
    pub qpcr_result: Option<f64>,
    #[garde(range(min = 0.0))]
    pub starting_amount: Option<f64>,
    #[garde(range(min = 0))]
    pub pcr_cycles: Option<i32>,
    #[garde(range(min = 0.0))]
    pub nm: Option<f64>,
    #[garde(range(min = 1))]
    pub sequencing_depth: Option<i32>,
    #[garde(length(max = 2000))]
    pub comments: Option<String>,
}

impl LibraryUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.barcode.is_none()
            && self.library_protocol_id.is_none()
            && self.library_type_id.is_none()
            && self.organism_id.is_none()
            && self.read_length_id.is_none()
            && self.index_type_id.is_none()
            && self.index_i7.is_none()
            && self.index_i5.is_none()
            && self.concentration.is_none()
            && self.concentration_method_id.is_none()
            && self.mean_fragment_size.is_none()
            && self.qpcr_result.is_none()
            && self.starting_amount.is_none()
            && self.pcr_cycles.is_none()
            && self.nm.is_none()
            && self.sequencing_depth.is_none()
            && self.comments.is_none()
    }
}
