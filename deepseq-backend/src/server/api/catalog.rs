use std::fmt::Debug;

use axum::{Json, extract::State};
use deepseq_core::model::catalog::{Index, IndexKind, IndexQuery};
use diesel_async::{AsyncConnection, scoped_futures::ScopedFutureExt};
use serde::Serialize;

use super::{error::Result, handler::Query};
use crate::{
    db::{FetchByQuery, catalog::IndexSelection},
    server::{AppState, auth::User},
};

/// Lists a catalog table for a dropdown, fallback entries last.
pub(super) async fn list<Entry>(
    _user: User,
    State(app_state): State<AppState>,
    Query(query): Query<Entry::QueryParams>,
) -> Result<Json<Vec<Entry>>>
where
    Entry: FetchByQuery + Serialize + Send,
    Entry::QueryParams: Debug + Send + Sync,
{
    tracing::info!(?query, "listing {}", std::any::type_name::<Entry>());

    let mut db_conn = app_state.db_conn().await?;

    let entries = db_conn
        .transaction(|conn| async move { Entry::fetch_by_query(&query, conn).await }.scope_boxed())
        .await?;

    Ok(Json(entries))
}

async fn fetch_indices(app_state: &AppState, selection: IndexSelection) -> Result<Vec<Index>> {
    let mut db_conn = app_state.db_conn().await?;

    let indices = db_conn
        .transaction(|conn| {
            async move { Index::fetch_by_query(&selection, conn).await }.scope_boxed()
        })
        .await?;

    Ok(indices)
}

pub(super) async fn all_indices(
    _user: User,
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Index>>> {
    Ok(Json(fetch_indices(&app_state, IndexSelection::All).await?))
}

pub(super) async fn indices(
    kind: IndexKind,
    _user: User,
    State(app_state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> Result<Json<Vec<Index>>> {
    tracing::info!(?kind, ?query, "listing indices");

    let selection = IndexSelection::of_kind(kind, &query);

    Ok(Json(fetch_indices(&app_state, selection).await?))
}
