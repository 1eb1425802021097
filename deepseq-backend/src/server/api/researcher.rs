use axum::extract::State;
use deepseq_core::model::researcher::{
    Caller, CreatedResearcher, NewResearcher, Researcher, ResearcherUpdate,
};
use diesel_async::{AsyncConnection, scoped_futures::ScopedFutureExt};

use super::{
    error::{Error, Result, parse_id},
    handler::{Outcome, Path, ValidJson},
};
use crate::{
    db::{DeleteById, FetchByQuery, Write},
    server::{AppState, auth::User},
};

/// Only staff may register researchers. The response is the only place the new API key
/// ever appears.
fn ensure_staff(caller: &Caller, action: &str) -> Result<()> {
    if caller.is_staff {
        Ok(())
    } else {
        Err(Error::forbidden(format!("only staff may {action} researchers")))
    }
}

pub(super) async fn create(
    User(caller): User,
    State(app_state): State<AppState>,
    ValidJson(researcher): ValidJson<NewResearcher>,
) -> Result<Outcome<CreatedResearcher>> {
    ensure_staff(&caller, "create")?;

    tracing::info!(
        email = %researcher.email,
        is_staff = researcher.is_staff,
        "creating researcher"
    );

    let mut db_conn = app_state.db_conn().await?;

    let created = db_conn
        .transaction(|conn| async move { researcher.write(conn).await }.scope_boxed())
        .await?;

    Ok(Outcome::created(created))
}

pub(super) async fn list(
    User(caller): User,
    State(app_state): State<AppState>,
) -> Result<Outcome<Vec<Researcher>>> {
    let mut db_conn = app_state.db_conn().await?;

    let researchers = db_conn
        .transaction(|conn| {
            async move { Researcher::fetch_by_query(&caller, conn).await }.scope_boxed()
        })
        .await?;

    Ok(Outcome::ok(researchers))
}

pub(super) async fn edit(
    User(caller): User,
    State(app_state): State<AppState>,
    Path(raw_id): Path<String>,
    ValidJson(mut update): ValidJson<ResearcherUpdate>,
) -> Result<Outcome<Researcher>> {
    ensure_staff(&caller, "edit")?;

    update.id = parse_id(Some(&raw_id))?;

    tracing::info!(researcher_id = update.id, "editing researcher");

    let mut db_conn = app_state.db_conn().await?;

    let researcher = db_conn
        .transaction(|conn| async move { update.write(conn).await }.scope_boxed())
        .await?;

    Ok(Outcome::ok(researcher))
}

pub(super) async fn delete(
    User(caller): User,
    State(app_state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Outcome<()>> {
    ensure_staff(&caller, "delete")?;

    let id = parse_id(Some(&raw_id))?;

    tracing::info!(researcher_id = id, "deleting researcher");

    let mut db_conn = app_state.db_conn().await?;

    db_conn
        .transaction(|conn| {
            async move { Researcher::delete_by_id(&id, conn).await }.scope_boxed()
        })
        .await?;

    Ok(Outcome::done())
}
