use garde::Validate;
use serde::{Deserialize, Serialize};

#[cfg(feature = "backend")]
use {deepseq_schema::pool, diesel::prelude::*};

use super::{Endpoint, record::RecordSummary};

#[derive(Debug, Clone, Deserialize, Validate)]
#[cfg_attr(feature = "backend", derive(Insertable), diesel(table_name = pool))]
pub struct NewPool {
    #[garde(length(min = 1, max = 100))]
    pub name: String,
    #[garde(skip)]
    #[serde(default)]
    #[cfg_attr(feature = "backend", diesel(skip_insertion))]
    pub library_ids: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(
    feature = "backend",
    derive(Queryable, Selectable),
    diesel(table_name = pool, check_for_backend(diesel::sqlite::Sqlite))
)]
pub struct PoolSummary {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    #[serde(flatten)]
    pub summary: PoolSummary,
    pub libraries: Vec<RecordSummary>,
}

impl Endpoint for Pool {
    fn endpoint() -> String {
        "/pools".to_string()
    }
}
