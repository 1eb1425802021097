use deepseq_core::model::{
    pool::{NewPool, Pool, PoolSummary},
    record::library::Library,
};
use deepseq_schema::{library, pool, pool_library};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::{DbConnection, FetchById, FetchByQuery, Write, error};
use crate::ensure_references;

impl Write for NewPool {
    type Returns = Pool;

    async fn write(self, db_conn: &mut DbConnection) -> error::Result<Self::Returns> {
        ensure_references!("pool", library, &self.library_ids, db_conn)?;

        let id: i32 = diesel::insert_into(pool::table)
            .values(&self)
            .returning(pool::id)
            .get_result(db_conn)
            .await?;

        for library_id in &self.library_ids {
            diesel::insert_into(pool_library::table)
                .values((
                    pool_library::pool_id.eq(id),
                    pool_library::library_id.eq(library_id),
                ))
                .on_conflict_do_nothing()
                .execute(db_conn)
                .await?;
        }

        Pool::fetch_by_id(&id, db_conn).await
    }
}

impl FetchById for Pool {
    type Id = i32;

    async fn fetch_by_id(id: &Self::Id, db_conn: &mut DbConnection) -> error::Result<Self> {
        let summary = pool::table
            .find(id)
            .select(PoolSummary::as_select())
            .first(db_conn)
            .await?;

        let libraries: Vec<Library> = pool_library::table
            .inner_join(library::table)
            .filter(pool_library::pool_id.eq(id))
            .select(Library::as_select())
            .order_by(library::barcode)
            .load(db_conn)
            .await?;

        Ok(Pool {
            summary,
            libraries: libraries.iter().map(Library::summary).collect(),
        })
    }
}

impl FetchByQuery for PoolSummary {
    type QueryParams = ();

    async fn fetch_by_query(
        _query: &Self::QueryParams,
        db_conn: &mut DbConnection,
    ) -> error::Result<Vec<Self>> {
        Ok(pool::table
            .select(Self::as_select())
            .order_by(pool::id.desc())
            .load(db_conn)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use deepseq_core::model::{
        pool::{NewPool, Pool, PoolSummary},
        record::library::NewLibrary,
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::db::{
        FetchById, FetchByQuery, Write,
        error::Error,
        record::reconcile,
        test_util::{Seeded, new_library_payload, seeded},
    };

    #[rstest]
    #[awt]
    #[tokio::test]
    async fn pools_hold_libraries(#[future] seeded: Seeded) {
        let Seeded {
            mut db_conn, refs, ..
        } = seeded;

        let libraries = reconcile::<NewLibrary>(
            (0..3).map(|i| new_library_payload(&refs, i)).collect(),
            &mut db_conn,
        )
        .await
        .unwrap()
        .accepted;

        let pool = NewPool {
            name: "lane 1".to_string(),
            library_ids: libraries.iter().map(|l| l.pk).collect(),
        }
        .write(&mut db_conn)
        .await
        .unwrap();

        assert_eq!(pool.summary.name, "lane 1");
        assert_eq!(pool.libraries, libraries);

        let fetched = Pool::fetch_by_id(&pool.summary.id, &mut db_conn)
            .await
            .unwrap();
        assert_eq!(fetched, pool);

        let listed = PoolSummary::fetch_by_query(&(), &mut db_conn).await.unwrap();
        assert_eq!(listed, [pool.summary]);
    }

    #[rstest]
    #[awt]
    #[tokio::test]
    async fn unknown_library(#[future] seeded: Seeded) {
        let Seeded { mut db_conn, .. } = seeded;

        let result = NewPool {
            name: "empty".to_string(),
            library_ids: vec![777],
        }
        .write(&mut db_conn)
        .await;

        assert!(matches!(result, Err(Error::ReferenceNotFound { .. })));
        assert_eq!(
            Pool::fetch_by_id(&1, &mut db_conn).await,
            Err(Error::RecordNotFound)
        );
    }
}
