use chrono::Datelike;
use deepseq_core::model::{
    record::{
        FieldError, RecordSummary, RecordType, assign_barcode,
        library::{Library, LibraryUpdate, NewLibrary},
    },
    researcher::Caller,
};
use deepseq_schema::{library, pool_library, request, request_library};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::{CheckReferences, Record};
use crate::{
    db::{DbConnection, DeleteById, FetchById, FetchByQuery, Write, error},
    row_exists,
};

impl Record for Library {
    const RECORD_TYPE: RecordType = RecordType::Library;

    fn summary(&self) -> RecordSummary {
        Library::summary(self)
    }
}

impl CheckReferences for NewLibrary {
    async fn check_references(
        &self,
        db_conn: &mut DbConnection,
    ) -> error::Result<Vec<FieldError>> {
        Ok(missing_references!(
            db_conn,
            [
                (
                    "library_protocol_id",
                    library_protocol,
                    Some(self.library_protocol_id)
                ),
                ("library_type_id", library_type, Some(self.library_type_id)),
                ("organism_id", organism, Some(self.organism_id)),
                ("read_length_id", read_length, Some(self.read_length_id)),
                ("index_type_id", index_type, self.index_type_id),
                (
                    "concentration_method_id",
                    concentration_method,
                    self.concentration_method_id
                ),
            ]
        ))
    }
}

impl CheckReferences for LibraryUpdate {
    async fn check_references(
        &self,
        db_conn: &mut DbConnection,
    ) -> error::Result<Vec<FieldError>> {
        if !row_exists!(library, self.id, &mut *db_conn).await? {
            return Ok(vec![FieldError::new("pk", "Library does not exist.")]);
        }

        Ok(missing_references!(
            db_conn,
            [
                ("library_protocol_id", library_protocol, self.library_protocol_id),
                ("library_type_id", library_type, self.library_type_id),
                ("organism_id", organism, self.organism_id),
                ("read_length_id", read_length, self.read_length_id),
                ("index_type_id", index_type, self.index_type_id),
                (
                    "concentration_method_id",
                    concentration_method,
                    self.concentration_method_id
                ),
            ]
        ))
    }
}

impl Write for NewLibrary {
    type Returns = Library;

    async fn write(self, db_conn: &mut DbConnection) -> error::Result<Self::Returns> {
        let inserted = diesel::insert_into(library::table)
            .values(&self)
            .returning(Library::as_returning())
            .get_result(db_conn)
            .await?;

        if self.barcode.is_some() {
            return Ok(inserted);
        }

        let barcode = assign_barcode(
            RecordType::Library,
            inserted.date_created.year(),
            inserted.id,
        );

        Ok(diesel::update(library::table.find(inserted.id))
            .set(library::barcode.eq(barcode))
            .returning(Library::as_returning())
            .get_result(db_conn)
            .await?)
    }
}

impl Write for LibraryUpdate {
    type Returns = Library;

    async fn write(self, db_conn: &mut DbConnection) -> error::Result<Self::Returns> {
        if !self.is_empty() {
            diesel::update(&self).set(&self).execute(db_conn).await?;
        }

        Library::fetch_by_id(&self.id, db_conn).await
    }
}

impl FetchById for Library {
    type Id = i32;

    async fn fetch_by_id(id: &Self::Id, db_conn: &mut DbConnection) -> error::Result<Self> {
        Ok(library::table
            .find(id)
            .select(Self::as_select())
            .first(db_conn)
            .await?)
    }
}

impl FetchByQuery for Library {
    type QueryParams = Caller;

    async fn fetch_by_query(
        caller: &Self::QueryParams,
        db_conn: &mut DbConnection,
    ) -> error::Result<Vec<Self>> {
        let mut statement = request_library::table
            .inner_join(request::table)
            .inner_join(library::table)
            .select(Self::as_select())
            .order_by((
                request::date_created.desc(),
                request::id.desc(),
                library::barcode.asc(),
            ))
            .into_boxed();

        if !caller.is_staff {
            statement = statement.filter(request::researcher_id.eq(caller.researcher_id));
        }

        Ok(statement.load(db_conn).await?)
    }
}

impl DeleteById for Library {
    type Id = i32;

    async fn delete_by_id(id: &Self::Id, db_conn: &mut DbConnection) -> error::Result<()> {
        diesel::delete(request_library::table.filter(request_library::library_id.eq(id)))
            .execute(db_conn)
            .await?;

        diesel::delete(pool_library::table.filter(pool_library::library_id.eq(id)))
            .execute(db_conn)
            .await?;

        let n_deleted = diesel::delete(library::table.find(id))
            .execute(db_conn)
            .await?;

        if n_deleted == 0 {
            return Err(error::Error::RecordNotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use deepseq_core::model::{
        pool::{NewPool, Pool},
        record::library::{Library, NewLibrary},
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::db::{
        DeleteById, FetchById, Write,
        error::Error,
        record::reconcile,
        test_util::{Seeded, new_library_payload, seeded},
    };

    #[rstest]
    #[awt]
    #[tokio::test]
    async fn delete_detaches_from_pools(#[future] seeded: Seeded) {
        let Seeded {
            mut db_conn, refs, ..
        } = seeded;

        let created = reconcile::<NewLibrary>(
            vec![new_library_payload(&refs, 0), new_library_payload(&refs, 1)],
            &mut db_conn,
        )
        .await
        .unwrap()
        .accepted;

        let pool = NewPool {
            name: "pool".to_string(),
            library_ids: created.iter().map(|l| l.pk).collect(),
        }
        .write(&mut db_conn)
        .await
        .unwrap();
        assert_eq!(pool.libraries.len(), 2);

        Library::delete_by_id(&created[0].pk, &mut db_conn)
            .await
            .unwrap();

        assert_eq!(
            Library::fetch_by_id(&created[0].pk, &mut db_conn).await,
            Err(Error::RecordNotFound)
        );

        let pool = Pool::fetch_by_id(&pool.summary.id, &mut db_conn)
            .await
            .unwrap();
        assert_eq!(pool.libraries.len(), 1);
        assert_eq!(pool.libraries[0].pk, created[1].pk);
    }
}
