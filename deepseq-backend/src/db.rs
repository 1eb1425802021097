use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub mod catalog;
pub mod error;
pub mod pool;
pub mod record;
pub mod request;
pub mod researcher;
pub mod seed_data;
#[cfg(test)]
pub(crate) mod test_util;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("../db/migrations");

pub type DbConnection = SyncConnectionWrapper<SqliteConnection>;

pub trait Write {
    type Returns;

    fn write(
        self,
        db_conn: &mut DbConnection,
    ) -> impl Future<Output = error::Result<Self::Returns>> + Send;
}

pub trait FetchById: Sized {
    type Id;

    fn fetch_by_id(
        id: &Self::Id,
        db_conn: &mut DbConnection,
    ) -> impl Future<Output = error::Result<Self>> + Send;
}

pub trait FetchByQuery: Sized {
    type QueryParams;

    fn fetch_by_query(
        query: &Self::QueryParams,
        db_conn: &mut DbConnection,
    ) -> impl Future<Output = error::Result<Vec<Self>>> + Send;
}

pub trait DeleteById {
    type Id;

    fn delete_by_id(
        id: &Self::Id,
        db_conn: &mut DbConnection,
    ) -> impl Future<Output = error::Result<()>> + Send;
}

/// Evaluates to a future resolving to whether `$table` has a row with primary key `$id`.
#[macro_export]
macro_rules! row_exists {
    ($table:ident, $id:expr, $db_conn:expr) => {{
        use diesel::QueryDsl as _;
        use diesel_async::RunQueryDsl as _;

        diesel::select(diesel::dsl::exists(
            deepseq_schema::$table::table.find($id),
        ))
        .get_result::<bool>($db_conn)
    }};
}

/// Fails with `ReferenceNotFound` unless every id in `$ids` is a row of `$referenced`.
#[macro_export]
macro_rules! ensure_references {
    ($entity:literal, $referenced:ident, $ids:expr, $db_conn:expr) => {{
        let mut result = Ok(());

        for id in $ids {
            if !$crate::row_exists!($referenced, *id, &mut *$db_conn).await? {
                result = Err($crate::db::error::Error::ReferenceNotFound {
                    entity: $entity.to_string(),
                    referenced_entity: stringify!($referenced).to_string(),
                    value: Some(id.to_string()),
                });
                break;
            }
        }

        result
    }};
}
