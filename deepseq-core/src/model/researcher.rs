use garde::Validate;
use serde::{Deserialize, Serialize};

#[cfg(feature = "backend")]
use {deepseq_schema::researcher, diesel::prelude::*};

use super::Endpoint;

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[cfg_attr(feature = "backend", derive(Insertable), diesel(table_name = researcher))]
pub struct NewResearcher {
    #[garde(length(min = 1, max = 200))]
    pub name: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(max = 100))]
    #[serde(default)]
    pub phone: String,
    #[garde(skip)]
    pub organization_id: Option<i32>,
    #[garde(skip)]
    pub pi_id: Option<i32>,
    #[garde(skip)]
    #[serde(default)]
    pub is_staff: bool,
    #[garde(skip)]
    #[serde(default)]
    #[cfg_attr(feature = "backend", diesel(skip_insertion))]
    pub cost_unit_ids: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(
    feature = "backend",
    derive(Queryable, Selectable),
    diesel(table_name = researcher, check_for_backend(diesel::sqlite::Sqlite))
)]
pub struct Researcher {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub organization_id: Option<i32>,
    pub pi_id: Option<i32>,
    pub is_staff: bool,
}

/// Changes a staff member makes to a researcher's profile. Absent fields are left alone;
/// `cost_unit_ids`, when given, replaces the researcher's cost units.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[cfg_attr(
    feature = "backend",
    derive(Identifiable, AsChangeset),
    diesel(table_name = researcher)
)]
pub struct ResearcherUpdate {
    #[garde(skip)]
    #[serde(skip)]
    pub id: i32,
    #[garde(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[garde(length(max = 100))]
    pub phone: Option<String>,
    #[garde(skip)]
    pub organization_id: Option<i32>,
    #[garde(skip)]
    pub pi_id: Option<i32>,
    #[garde(skip)]
    #[cfg_attr(feature = "backend", diesel(skip_update))]
    pub cost_unit_ids: Option<Vec<i32>>,
}

impl ResearcherUpdate {
    /// Whether there is nothing to change on the researcher row itself.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(
            self,
            Self {
                name: None,
                phone: None,
                organization_id: None,
                pi_id: None,
                ..
            }
        )
    }
}

impl Endpoint for Researcher {
    fn endpoint() -> String {
        "/researchers".to_string()
    }
}

/// A freshly created researcher. The API key is only ever shown here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResearcher {
    #[serde(flatten)]
    pub researcher: Researcher,
    pub api_key: String,
}

/// Who is performing an operation. Staff see and may change everything; everyone else only
/// sees their own requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub researcher_id: i32,
    pub is_staff: bool,
}

/// Everything the report needs to know about a request's owner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResearcherContact {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub organization: String,
    pub principal_investigator: String,
    pub cost_units: Vec<String>,
}

impl ResearcherContact {
    /// Sorted and comma-separated.
    #[must_use]
    pub fn cost_units_display(&self) -> String {
        let mut cost_units = self.cost_units.clone();
        cost_units.sort();

        cost_units.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use garde::Validate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::{NewResearcher, ResearcherContact, ResearcherUpdate};

    #[test]
    fn cost_units_are_sorted() {
        let contact = ResearcherContact {
            cost_units: vec!["CU-9".into(), "CU-1".into()],
            ..Default::default()
        };

        assert_eq!(contact.cost_units_display(), "CU-1, CU-9");
        assert_eq!(ResearcherContact::default().cost_units_display(), "");
    }

    #[test]
    fn email_is_validated() {
        let researcher: NewResearcher =
            serde_json::from_value(json!({"name": "Ada", "email": "not-an-email"})).unwrap();

        assert!(researcher.validate().is_err());
    }

    #[test]
    fn updates_ignore_ids_in_the_body() {
        let update: ResearcherUpdate =
            serde_json::from_value(json!({"id": 7, "phone": "555-0199"})).unwrap();

        assert_eq!(update.id, 0);
        assert_eq!(update.phone.as_deref(), Some("555-0199"));
        assert!(!update.is_empty());
        assert!(update.validate().is_ok());
    }

    #[test]
    fn cost_units_alone_leave_the_row_untouched() {
        let update: ResearcherUpdate =
            serde_json::from_value(json!({"cost_unit_ids": [1, 2]})).unwrap();

        assert!(update.is_empty());
        assert_eq!(update.cost_unit_ids, Some(vec![1, 2]));
    }

    #[test]
    fn blank_names_are_rejected() {
        let update: ResearcherUpdate = serde_json::from_value(json!({"name": ""})).unwrap();

        assert!(update.validate().is_err());
    }
}
