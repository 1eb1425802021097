use chrono::NaiveDateTime;
use garde::Validate;
use serde::{Deserialize, Serialize};

#[cfg(feature = "backend")]
use {deepseq_schema::sample, diesel::prelude::*};

use super::{RecordSummary, RecordType};
use crate::model::{Endpoint, catalog::NucleicAcidType};

#[derive(Debug, Clone, Deserialize, Validate)]
#[cfg_attr(feature = "backend", derive(Insertable), diesel(table_name = sample))]
pub struct NewSample {
    #[garde(length(min = 1, max = 200))]
    pub name: String,
    #[garde(length(min = 1, max = 50))]
    #[serde(default)]
    pub barcode: Option<String>,
    #[garde(skip)]
    pub nucleic_acid_type: NucleicAcidType,
    #[garde(skip)]
    pub organism_id: i32,
    #[garde(skip)]
    pub read_length_id: i32,
    #[garde(range(min = 0.0))]
    #[serde(default)]
    pub concentration: Option<f64>,
    #[garde(skip)]
    #[serde(default)]
    pub concentration_method_id: Option<i32>,
    #[garde(range(min = 1))]
    pub sequencing_depth: i32,
    #[garde(length(max = 2000))]
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(
    feature = "backend",
    derive(Queryable, Selectable),
    diesel(table_name = sample, check_for_backend(diesel::sqlite::Sqlite))
)]
pub struct Sample {
    #[serde(rename = "pk")]
    pub id: i32,
    pub name: String,
    pub barcode: String,
    pub nucleic_acid_type: NucleicAcidType,
    pub organism_id: i32,
    pub read_length_id: i32,
    pub concentration: Option<f64>,
    pub concentration_method_id: Option<i32>,
    pub sequencing_depth: i32,
    pub comments: Option<String>,
    pub is_in_request: bool,
    pub date_created: NaiveDateTime,
}

impl Sample {
    #[must_use]
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            pk: self.id,
            record_type: RecordType::Sample,
            name: self.name.clone(),
            barcode: self.barcode.clone(),
        }
    }
}

impl Endpoint for Sample {
    fn endpoint() -> String {
        "/samples".to_string()
    }
}

/// Changes to an existing sample. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[cfg_attr(
    feature = "backend",
    derive(Identifiable, AsChangeset),
    diesel(table_name = sample)
)]
pub struct SampleUpdate {
    #[garde(skip)]
    #[serde(rename = "pk")]
    pub id: i32,
    #[garde(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[garde(length(min = 1, max = 50))]
    pub barcode: Option<String>,
    #[garde(skip)]
    pub nucleic_acid_type: Option<NucleicAcidType>,
    #[garde(skip)]
    pub organism_id: Option<i32>,
    #[garde(skip)]
    pub read_length_id: Option<i32>,
    #[garde(range(min = 0.0))]
    pub concentration: Option<f64>,
    #[garde(skip)]
    pub concentration_method_id: Option<i32>,
    #[garde(range(min = 1))]
    pub sequencing_depth: Option<i32>,
    #[garde(length(max = 2000))]
    pub comments: Option<String>,
}

impl SampleUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(
            self,
            Self {
                name: None,
                barcode: None,
                nucleic_acid_type: None,
                organism_id: None,
                read_length_id: None,
                concentration: None,
                concentration_method_id: None,
                sequencing_depth: None,
                comments: None,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use garde::Validate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::{NewSample, SampleUpdate};
    use crate::model::catalog::NucleicAcidType;

    #[test]
    fn minimal_payload() {
        let sample: NewSample = serde_json::from_value(json!({
            "name": "s1",
            "nucleic_acid_type": "DNA",
            "organism_id": 1,
            "read_length_id": 2,
            "sequencing_depth": 10
        }))
        .unwrap();

        sample.validate().unwrap();
        assert_eq!(sample.nucleic_acid_type, NucleicAcidType::Dna);
        assert_eq!(sample.barcode, None);
    }

    #[test]
    fn negative_concentration_is_invalid() {
        let sample: NewSample = serde_json::from_value(json!({
            "name": "s1",
            "nucleic_acid_type": "RNA",
            "organism_id": 1,
            "read_length_id": 2,
            "sequencing_depth": 10,
            "concentration": -1.5
        }))
        .unwrap();

        assert!(sample.validate().is_err());
    }

    #[test]
    fn update_uses_pk() {
        let update: SampleUpdate = serde_json::from_value(json!({"pk": 5})).unwrap();

        assert_eq!(update.id, 5);
        assert!(update.is_empty());

        let update: SampleUpdate =
            serde_json::from_value(json!({"pk": 5, "comments": "re-run"})).unwrap();
        assert!(!update.is_empty());
    }
}
