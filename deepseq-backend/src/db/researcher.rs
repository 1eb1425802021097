use deepseq_core::model::researcher::{
    Caller, CreatedResearcher, NewResearcher, Researcher, ResearcherUpdate,
};
use deepseq_schema::{request, researcher, researcher_cost_unit};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::{DbConnection, DeleteById, FetchById, FetchByQuery, Write, error};
use crate::{ensure_references, row_exists, server::auth::ApiKey};

impl Write for NewResearcher {
    type Returns = CreatedResearcher;

    async fn write(self, db_conn: &mut DbConnection) -> error::Result<Self::Returns> {
        ensure_references!("researcher", cost_unit, &self.cost_unit_ids, db_conn)?;

        let api_key = ApiKey::new();
        let hashed = api_key.hash().map_err(error::Error::from_other_error)?;

        let id: i32 = diesel::insert_into(researcher::table)
            .values((
                &self,
                researcher::api_key_prefix.eq(&hashed.prefix),
                researcher::api_key_hash.eq(&hashed.hash),
            ))
            .returning(researcher::id)
            .get_result(db_conn)
            .await?;

        insert_cost_units(id, &self.cost_unit_ids, db_conn).await?;

        Ok(CreatedResearcher {
            researcher: Researcher::fetch_by_id(&id, db_conn).await?,
            api_key: api_key.to_string(),
        })
    }
}

async fn insert_cost_units(
    researcher_id: i32,
    cost_unit_ids: &[i32],
    db_conn: &mut DbConnection,
) -> error::Result<()> {
    for cost_unit_id in cost_unit_ids {
        diesel::insert_into(researcher_cost_unit::table)
            .values((
                researcher_cost_unit::researcher_id.eq(researcher_id),
                researcher_cost_unit::cost_unit_id.eq(cost_unit_id),
            ))
            .on_conflict_do_nothing()
            .execute(db_conn)
            .await?;
    }

    Ok(())
}

impl Write for ResearcherUpdate {
    type Returns = Researcher;

    async fn write(self, db_conn: &mut DbConnection) -> error::Result<Self::Returns> {
        let id = self.id;

        if !row_exists!(researcher, id, &mut *db_conn).await? {
            return Err(error::Error::RecordNotFound);
        }

        ensure_references!("researcher", organization, self.organization_id.as_ref(), db_conn)?;
        ensure_references!(
            "researcher",
            principal_investigator,
            self.pi_id.as_ref(),
            db_conn
        )?;

        if !self.is_empty() {
            diesel::update(&self).set(&self).execute(db_conn).await?;
        }

        if let Some(cost_unit_ids) = &self.cost_unit_ids {
            ensure_references!("researcher", cost_unit, cost_unit_ids, db_conn)?;

            diesel::delete(
                researcher_cost_unit::table.filter(researcher_cost_unit::researcher_id.eq(id)),
            )
            .execute(db_conn)
            .await?;

            insert_cost_units(id, cost_unit_ids, db_conn).await?;
        }

        Researcher::fetch_by_id(&id, db_conn).await
    }
}

/// Refuses to delete a researcher who still owns requests.
impl DeleteById for Researcher {
    type Id = i32;

    async fn delete_by_id(id: &Self::Id, db_conn: &mut DbConnection) -> error::Result<()> {
        let owns_requests: bool = diesel::select(diesel::dsl::exists(
            request::table.filter(request::researcher_id.eq(id)),
        ))
        .get_result(db_conn)
        .await?;

        if owns_requests {
            return Err(error::Error::StillReferenced {
                entity: "researcher".to_string(),
                referencing_entity: "request".to_string(),
            });
        }

        let n_deleted = diesel::delete(researcher::table.find(id))
            .execute(db_conn)
            .await?;

        if n_deleted == 0 {
            return Err(error::Error::RecordNotFound);
        }

        Ok(())
    }
}

impl FetchById for Researcher {
    type Id = i32;

    async fn fetch_by_id(id: &Self::Id, db_conn: &mut DbConnection) -> error::Result<Self> {
        Ok(researcher::table
            .find(id)
            .select(Self::as_select())
            .first(db_conn)
            .await?)
    }
}

/// Staff see every researcher, everyone else only themselves.
impl FetchByQuery for Researcher {
    type QueryParams = Caller;

    async fn fetch_by_query(
        caller: &Self::QueryParams,
        db_conn: &mut DbConnection,
    ) -> error::Result<Vec<Self>> {
        let mut statement = researcher::table
            .select(Self::as_select())
            .order_by(researcher::name)
            .into_boxed();

        if !caller.is_staff {
            statement = statement.filter(researcher::id.eq(caller.researcher_id));
        }

        Ok(statement.load(db_conn).await?)
    }
}

/// # Errors
/// `RecordNotFound` when no researcher holds this key.
pub async fn fetch_caller_by_api_key(
    api_key: &ApiKey,
    db_conn: &mut DbConnection,
) -> error::Result<Caller> {
    let Some(prefix) = api_key.prefix() else {
        return Err(error::Error::RecordNotFound);
    };

    let candidates: Vec<(i32, bool, String)> = researcher::table
        .filter(researcher::api_key_prefix.eq(prefix))
        .select((
            researcher::id,
            researcher::is_staff,
            researcher::api_key_hash.assume_not_null(),
        ))
        .load(db_conn)
        .await?;

    candidates
        .into_iter()
        .find(|(.., hash)| api_key.is_same_hash(hash))
        .map(|(researcher_id, is_staff, _)| Caller {
            researcher_id,
            is_staff,
        })
        .ok_or(error::Error::RecordNotFound)
}
