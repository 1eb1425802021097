use chrono::Datelike;
use deepseq_core::model::{
    record::{
        FieldError, RecordSummary, RecordType, assign_barcode,
        sample::{NewSample, Sample, SampleUpdate},
    },
    researcher::Caller,
};
use deepseq_schema::{request, request_sample, sample};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::{CheckReferences, Record};
use crate::{
    db::{DbConnection, DeleteById, FetchById, FetchByQuery, Write, error},
    row_exists,
};

impl Record for Sample {
    const RECORD_TYPE: RecordType = RecordType::Sample;

    fn summary(&self) -> RecordSummary {
        Sample::summary(self)
    }
}

impl CheckReferences for NewSample {
    async fn check_references(
        &self,
        db_conn: &mut DbConnection,
    ) -> error::Result<Vec<FieldError>> {
        Ok(missing_references!(
            db_conn,
            [
                ("organism_id", organism, Some(self.organism_id)),
                ("read_length_id", read_length, Some(self.read_length_id)),
                (
                    "concentration_method_id",
                    concentration_method,
                    self.concentration_method_id
                ),
            ]
        ))
    }
}

impl CheckReferences for SampleUpdate {
    async fn check_references(
        &self,
        db_conn: &mut DbConnection,
    ) -> error::Result<Vec<FieldError>> {
        if !row_exists!(sample, self.id, &mut *db_conn).await? {
            return Ok(vec![FieldError::new("pk", "Sample does not exist.")]);
        }

        Ok(missing_references!(
            db_conn,
            [
                ("organism_id", organism, self.organism_id),
                ("read_length_id", read_length, self.read_length_id),
                (
                    "concentration_method_id",
                    concentration_method,
                    self.concentration_method_id
                ),
            ]
        ))
    }
}

impl Write for NewSample {
    type Returns = Sample;

    async fn write(self, db_conn: &mut DbConnection) -> error::Result<Self::Returns> {
        let inserted = diesel::insert_into(sample::table)
            .values(&self)
            .returning(Sample::as_returning())
            .get_result(db_conn)
            .await?;

        if self.barcode.is_some() {
            return Ok(inserted);
        }

        let barcode = assign_barcode(
            RecordType::Sample,
            inserted.date_created.year(),
            inserted.id,
        );

        Ok(diesel::update(sample::table.find(inserted.id))
            .set(sample::barcode.eq(barcode))
            .returning(Sample::as_returning())
            .get_result(db_conn)
            .await?)
    }
}

impl Write for SampleUpdate {
    type Returns = Sample;

    async fn write(self, db_conn: &mut DbConnection) -> error::Result<Self::Returns> {
        if !self.is_empty() {
            diesel::update(&self).set(&self).execute(db_conn).await?;
        }

        Sample::fetch_by_id(&self.id, db_conn).await
    }
}

impl FetchById for Sample {
    type Id = i32;

    async fn fetch_by_id(id: &Self::Id, db_conn: &mut DbConnection) -> error::Result<Self> {
        Ok(sample::table
            .find(id)
            .select(Self::as_select())
            .first(db_conn)
            .await?)
    }
}

impl FetchByQuery for Sample {
    type QueryParams = Caller;

    async fn fetch_by_query(
        caller: &Self::QueryParams,
        db_conn: &mut DbConnection,
    ) -> error::Result<Vec<Self>> {
        let mut statement = request_sample::table
            .inner_join(request::table)
            .inner_join(sample::table)
            .select(Self::as_select())
            .order_by((
                request::date_created.desc(),
                request::id.desc(),
                sample::barcode.asc(),
            ))
            .into_boxed();

        if !caller.is_staff {
            statement = statement.filter(request::researcher_id.eq(caller.researcher_id));
        }

        Ok(statement.load(db_conn).await?)
    }
}

impl DeleteById for Sample {
    type Id = i32;

    async fn delete_by_id(id: &Self::Id, db_conn: &mut DbConnection) -> error::Result<()> {
        diesel::delete(request_sample::table.filter(request_sample::sample_id.eq(id)))
            .execute(db_conn)
            .await?;

        let n_deleted = diesel::delete(sample::table.find(id))
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
    use deepseq_core::model::record::sample::{NewSample, Sample};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::db::{
        DeleteById, FetchById, FetchByQuery, Write,
        error::Error,
        record::reconcile,
        request::NewRequestWithRecords,
        test_util::{Seeded, new_sample_payload, seeded},
    };

    #[rstest]
    #[awt]
    #[tokio::test]
    async fn list_only_shows_samples_in_visible_requests(#[future] seeded: Seeded) {
        let Seeded {
            mut db_conn,
            refs,
            admin,
            researcher,
        } = seeded;

        let payloads = (0..3).map(|i| new_sample_payload(&refs, i)).collect();
        let created = reconcile::<NewSample>(payloads, &mut db_conn)
            .await
            .unwrap()
            .accepted;

        NewRequestWithRecords::new(&researcher, "mine", vec![], vec![created[0].pk])
            .write(&mut db_conn)
            .await
            .unwrap();
        NewRequestWithRecords::new(&admin, "theirs", vec![], vec![created[1].pk])
            .write(&mut db_conn)
            .await
            .unwrap();

        let own = Sample::fetch_by_query(&researcher, &mut db_conn)
            .await
            .unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].id, created[0].pk);
        assert!(own[0].is_in_request);

        let everything = Sample::fetch_by_query(&admin, &mut db_conn).await.unwrap();
        assert_eq!(everything.len(), 2);
        // newest request first
        assert_eq!(everything[0].id, created[1].pk);
    }

    #[rstest]
    #[awt]
    #[tokio::test]
    async fn delete(#[future] seeded: Seeded) {
        let Seeded {
            mut db_conn,
            refs,
            researcher,
            ..
        } = seeded;

        let created = reconcile::<NewSample>(vec![new_sample_payload(&refs, 0)], &mut db_conn)
            .await
            .unwrap()
            .accepted
            .remove(0);

        NewRequestWithRecords::new(&researcher, "r", vec![], vec![created.pk])
            .write(&mut db_conn)
            .await
            .unwrap();

        Sample::delete_by_id(&created.pk, &mut db_conn).await.unwrap();

        assert_eq!(
            Sample::fetch_by_id(&created.pk, &mut db_conn).await,
            Err(Error::RecordNotFound)
        );
        assert_eq!(
            Sample::delete_by_id(&created.pk, &mut db_conn).await,
            Err(Error::RecordNotFound)
        );
        assert!(
            Sample::fetch_by_query(&researcher, &mut db_conn)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
