use deepseq_core::model::catalog::{
    CatalogEntry, ConcentrationMethod, Filter, Index, IndexKind, IndexQuery, IndexType,
    LibraryProtocol, LibraryProtocolQuery, LibraryType, LibraryTypeQuery, Organism, ReadLength,
    Unfiltered, order_for_dropdown,
};
use deepseq_schema::{
    index_i5, index_i7, index_type, library_protocol, library_type, library_type_protocol,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use itertools::Itertools;

use super::{DbConnection, FetchByQuery, error};

fn ordered<T: CatalogEntry>(mut entries: Vec<T>) -> Vec<T> {
    order_for_dropdown(&mut entries);
    entries
}

macro_rules! unfiltered_catalog_query {
    ($entry:ty, $table:ident) => {
        impl FetchByQuery for $entry {
            type QueryParams = Unfiltered;

            async fn fetch_by_query(
                _query: &Self::QueryParams,
                db_conn: &mut DbConnection,
            ) -> error::Result<Vec<Self>> {
                let entries = deepseq_schema::$table::table
                    .select(Self::as_select())
                    .load(db_conn)
                    .await?;

                Ok(ordered(entries))
            }
        }
    };
}

unfiltered_catalog_query!(Organism, organism);
unfiltered_catalog_query!(ReadLength, read_length);
unfiltered_catalog_query!(ConcentrationMethod, concentration_method);
unfiltered_catalog_query!(IndexType, index_type);

impl FetchByQuery for LibraryProtocol {
    type QueryParams = LibraryProtocolQuery;

    async fn fetch_by_query(
        query: &Self::QueryParams,
        db_conn: &mut DbConnection,
    ) -> error::Result<Vec<Self>> {
        let mut statement = library_protocol::table
            .select(Self::as_select())
            .into_boxed();

        match query.filter() {
            Filter::All => (),
            Filter::Only(nucleic_acid_type) => {
                statement =
                    statement.filter(library_protocol::nucleic_acid_type.eq(nucleic_acid_type));
            }
            Filter::Unmatchable => return Ok(Vec::new()),
        }

        Ok(ordered(statement.load(db_conn).await?))
    }
}

impl FetchByQuery for LibraryType {
    type QueryParams = LibraryTypeQuery;

    async fn fetch_by_query(
        query: &Self::QueryParams,
        db_conn: &mut DbConnection,
    ) -> error::Result<Vec<Self>> {
        let filter = query.filter();
        if filter == Filter::Unmatchable {
            return Ok(Vec::new());
        }

        let library_types: Vec<(i32, String, bool)> = library_type::table
            .select((
                library_type::id,
                library_type::name,
                library_type::is_fallback_option,
            ))
            .load(db_conn)
            .await?;

        let mut protocols = library_type_protocol::table
            .select((
                library_type_protocol::library_type_id,
                library_type_protocol::library_protocol_id,
            ))
            .order_by(library_type_protocol::library_protocol_id)
            .load::<(i32, i32)>(db_conn)
            .await?
            .into_iter()
            .into_group_map();

        let library_types = library_types
            .into_iter()
            .filter_map(|(id, name, is_fallback_option)| {
                let protocol = protocols.remove(&id).unwrap_or_default();

                // A filtered list only names the protocol that was asked for
                let protocol = match filter {
                    Filter::Only(protocol_id) if protocol.contains(&protocol_id) => {
                        vec![protocol_id]
                    }
                    Filter::Only(_) | Filter::Unmatchable => return None,
                    Filter::All => protocol,
                };

                Some(LibraryType {
                    id,
                    name,
                    protocol,
                    is_fallback_option,
                })
            })
            .collect();

        Ok(ordered(library_types))
    }
}

/// Which indices to list: both kinds, or one kind narrowed by index type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSelection {
    All,
    Kind(IndexKind, Filter<i32>),
}

impl IndexSelection {
    #[must_use]
    pub fn of_kind(kind: IndexKind, query: &IndexQuery) -> Self {
        Self::Kind(kind, query.filter())
    }
}

macro_rules! load_indices {
    ($table:ident, $filter:expr, $db_conn:expr) => {{
        let mut statement = $table::table
            .select((
                $table::id,
                $table::index_id,
                $table::sequence,
                $table::index_type_id,
            ))
            .order_by($table::index_id)
            .into_boxed();

        match $filter {
            Filter::All => (),
            Filter::Only(index_type_id) => {
                statement = statement.filter($table::index_type_id.eq(index_type_id));
            }
            Filter::Unmatchable => return Ok(Vec::new()),
        }

        statement.load::<Index>($db_conn).await?
    }};
}

impl FetchByQuery for Index {
    type QueryParams = IndexSelection;

    async fn fetch_by_query(
        query: &Self::QueryParams,
        db_conn: &mut DbConnection,
    ) -> error::Result<Vec<Self>> {
        let indices = match *query {
            IndexSelection::Kind(IndexKind::I7, filter) => {
                load_indices!(index_i7, filter, db_conn)
            }
            IndexSelection::Kind(IndexKind::I5, filter) => {
                load_indices!(index_i5, filter, db_conn)
            }
            IndexSelection::All => {
                let mut indices = load_indices!(index_i7, Filter::<i32>::All, &mut *db_conn);
                indices.extend(load_indices!(index_i5, Filter::<i32>::All, &mut *db_conn));
                indices.sort_by(|a, b| a.index_id.cmp(&b.index_id));

                indices
            }
        };

        Ok(indices)
    }
}

/// Looks up an index type by its unique name.
pub(super) async fn index_type_id(name: &str, db_conn: &mut DbConnection) -> error::Result<i32> {
    Ok(index_type::table
        .filter(index_type::name.eq(name))
        .select(index_type::id)
        .first(db_conn)
        .await?)
}
