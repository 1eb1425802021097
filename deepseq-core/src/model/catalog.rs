use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[cfg(feature = "backend")]
use {deepseq_schema as schema, diesel::prelude::*, diesel::sqlite::Sqlite};

use super::Endpoint;

/// A row of one of the read-only reference tables that populate the record-entry
/// dropdowns.
pub trait CatalogEntry {
    fn name(&self) -> &str;

    fn is_fallback_option(&self) -> bool;
}

/// Sorts entries by name, except that fallback options ("Other", "Other - DNA Methods", ...)
/// always come last. Fallback options are themselves sorted by name.
pub fn order_for_dropdown<T: CatalogEntry>(entries: &mut [T]) {
    entries.sort_by(|a, b| {
        (a.is_fallback_option(), a.name()).cmp(&(b.is_fallback_option(), b.name()))
    });
}

/// A filter parsed from a raw query-string value. A value that can't be parsed never
/// matches anything, so the caller gets an empty list rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter<T> {
    All,
    Only(T),
    Unmatchable,
}

impl<T: FromStr> Filter<T> {
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::All;
        };

        raw.parse().map_or(Self::Unmatchable, Self::Only)
    }
}

/// Query parameters of a catalog list that can't be filtered.
#[derive(Debug, Default, Deserialize)]
pub struct Unfiltered {}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[cfg_attr(
    feature = "backend",
    derive(diesel::deserialize::FromSqlRow, diesel::expression::AsExpression),
    diesel(sql_type = diesel::sql_types::Text)
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum NucleicAcidType {
    Dna,
    Rna,
}

#[cfg(feature = "backend")]
impl diesel::deserialize::FromSql<diesel::sql_types::Text, Sqlite> for NucleicAcidType {
    fn from_sql(
        bytes: <Sqlite as diesel::backend::Backend>::RawValue<'_>,
    ) -> diesel::deserialize::Result<Self> {
        let raw = <String as diesel::deserialize::FromSql<diesel::sql_types::Text, Sqlite>>::from_sql(bytes)?;

        Ok(raw.parse()?)
    }
}

#[cfg(feature = "backend")]
impl diesel::serialize::ToSql<diesel::sql_types::Text, Sqlite> for NucleicAcidType {
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, Sqlite>,
    ) -> diesel::serialize::Result {
        let as_str: &'static str = self.into();

        <str as diesel::serialize::ToSql<diesel::sql_types::Text, Sqlite>>::to_sql(as_str, out)
    }
}

macro_rules! simple_catalog_entry {
    ($entry:ident, $table:ident, $endpoint:literal) => {
        #[derive(Debug, Clone, PartialEq, Serialize)]
        #[cfg_attr(
            feature = "backend",
            derive(Queryable, Selectable),
            diesel(table_name = schema::$table, check_for_backend(Sqlite))
        )]
        #[serde(rename_all = "camelCase")]
        pub struct $entry {
            pub id: i32,
            pub name: String,
            pub is_fallback_option: bool,
        }

        impl CatalogEntry for $entry {
            fn name(&self) -> &str {
                &self.name
            }

            fn is_fallback_option(&self) -> bool {
                self.is_fallback_option
            }
        }

        impl Endpoint for $entry {
            fn endpoint() -> String {
                $endpoint.to_string()
            }
        }
    };
}

simple_catalog_entry!(Organism, organism, "/organisms");
simple_catalog_entry!(ReadLength, read_length, "/read_lengths");
simple_catalog_entry!(ConcentrationMethod, concentration_method, "/concentration_methods");

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(
    feature = "backend",
    derive(Queryable, Selectable),
    diesel(table_name = schema::library_protocol, check_for_backend(Sqlite))
)]
#[serde(rename_all = "camelCase")]
pub struct LibraryProtocol {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub nucleic_acid_type: NucleicAcidType,
    pub provider: String,
    pub catalog: String,
    pub explanation: String,
    pub input_requirements: String,
    pub typical_application: String,
    pub comments: String,
    pub is_fallback_option: bool,
}

impl CatalogEntry for LibraryProtocol {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_fallback_option(&self) -> bool {
        self.is_fallback_option
    }
}

impl Endpoint for LibraryProtocol {
    fn endpoint() -> String {
        "/library_protocols".to_string()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LibraryProtocolQuery {
    #[serde(rename = "type")]
    pub nucleic_acid_type: Option<String>,
}

impl LibraryProtocolQuery {
    #[must_use]
    pub fn filter(&self) -> Filter<NucleicAcidType> {
        Filter::parse(self.nucleic_acid_type.as_deref())
    }
}

/// A library type, along with the ids of every protocol it can be prepared with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryType {
    pub id: i32,
    pub name: String,
    pub protocol: Vec<i32>,
    pub is_fallback_option: bool,
}

impl CatalogEntry for LibraryType {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_fallback_option(&self) -> bool {
        self.is_fallback_option
    }
}

impl Endpoint for LibraryType {
    fn endpoint() -> String {
        "/library_types".to_string()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LibraryTypeQuery {
    pub library_protocol_id: Option<String>,
}

impl LibraryTypeQuery {
    #[must_use]
    pub fn filter(&self) -> Filter<i32> {
        Filter::parse(self.library_protocol_id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(
    feature = "backend",
    derive(Queryable, Selectable),
    diesel(table_name = schema::index_type, check_for_backend(Sqlite))
)]
#[serde(into = "IndexTypeEntry")]
pub struct IndexType {
    pub id: i32,
    pub name: String,
    pub is_index_i7: bool,
    pub is_index_i5: bool,
    pub index_length: i32,
    pub is_fallback_option: bool,
}

impl IndexType {
    #[must_use]
    pub fn index_reads(&self) -> usize {
        usize::from(self.is_index_i7) + usize::from(self.is_index_i5)
    }

    #[must_use]
    pub fn is_dual(&self) -> bool {
        self.is_index_i7 && self.is_index_i5
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexTypeEntry {
    id: i32,
    name: String,
    index_reads: usize,
    is_dual: bool,
    index_length: i32,
    is_fallback_option: bool,
}

impl From<IndexType> for IndexTypeEntry {
    fn from(index_type: IndexType) -> Self {
        Self {
            index_reads: index_type.index_reads(),
            is_dual: index_type.is_dual(),
            id: index_type.id,
            name: index_type.name,
            index_length: index_type.index_length,
            is_fallback_option: index_type.is_fallback_option,
        }
    }
}

impl CatalogEntry for IndexType {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_fallback_option(&self) -> bool {
        self.is_fallback_option
    }
}

impl Endpoint for IndexType {
    fn endpoint() -> String {
        "/index_types".to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    I7,
    I5,
}

/// An I7 or I5 adapter index. Both kinds share a shape, so rows from either table load
/// into this type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "backend", derive(Queryable))]
pub struct Index {
    pub id: i32,
    pub index_id: String,
    pub sequence: String,
    pub index_type_id: i32,
}

impl Index {
    #[must_use]
    pub fn endpoint(kind: IndexKind) -> String {
        let suffix = match kind {
            IndexKind::I7 => "i7",
            IndexKind::I5 => "i5",
        };

        format!("{}/{suffix}", Self::all_endpoint())
    }

    #[must_use]
    pub fn all_endpoint() -> String {
        "/indices".to_string()
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.index_id, self.sequence)
    }
}

impl Serialize for Index {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct IndexEntry<'a> {
            id: i32,
            name: String,
            index: &'a str,
            index_id: &'a str,
            index_type: i32,
        }

        IndexEntry {
            id: self.id,
            name: self.display_name(),
            index: &self.sequence,
            index_id: &self.index_id,
            index_type: self.index_type_id,
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    pub index_type_id: Option<String>,
}

impl IndexQuery {
    #[must_use]
    pub fn filter(&self) -> Filter<i32> {
        Filter::parse(self.index_type_id.as_deref())
    }
}
