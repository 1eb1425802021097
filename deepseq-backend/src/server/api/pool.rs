use axum::extract::State;
use deepseq_core::model::pool::{NewPool, Pool, PoolSummary};
use diesel_async::{AsyncConnection, scoped_futures::ScopedFutureExt};

use super::{
    error::{Result, parse_id},
    handler::{Outcome, Path, ValidJson},
};
use crate::{
    db::{FetchById, FetchByQuery, Write},
    server::{AppState, auth::User},
};

pub(super) async fn create(
    _user: User,
    State(app_state): State<AppState>,
    ValidJson(pool): ValidJson<NewPool>,
) -> Result<Outcome<Pool>> {
    tracing::info!(name = %pool.name, library_ids = ?pool.library_ids, "creating pool");

    let mut db_conn = app_state.db_conn().await?;

    let pool = db_conn
        .transaction(|conn| async move { pool.write(conn).await }.scope_boxed())
        .await?;

    Ok(Outcome::created(pool))
}

pub(super) async fn list(
    _user: User,
    State(app_state): State<AppState>,
) -> Result<Outcome<Vec<PoolSummary>>> {
    let mut db_conn = app_state.db_conn().await?;

    let pools = db_conn
        .transaction(|conn| {
            async move { PoolSummary::fetch_by_query(&(), conn).await }.scope_boxed()
        })
        .await?;

    Ok(Outcome::ok(pools))
}

pub(super) async fn retrieve(
    _user: User,
    State(app_state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Outcome<Pool>> {
    let id = parse_id(Some(&raw_id))?;

    let mut db_conn = app_state.db_conn().await?;

    let pool = db_conn
        .transaction(|conn| async move { Pool::fetch_by_id(&id, conn).await }.scope_boxed())
        .await?;

    Ok(Outcome::ok(pool))
}
