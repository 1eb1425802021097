use axum::{extract::State, http::StatusCode};
use deepseq_core::model::{
    record::{
        RecordSummary,
        library::{Library, LibraryUpdate, NewLibrary},
        sample::{NewSample, Sample, SampleUpdate},
    },
    researcher::Caller,
};
use diesel_async::{AsyncConnection, scoped_futures::ScopedFutureExt};
use garde::Validate;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::{
    error::{Error, Result, parse_id},
    handler::{Outcome, Path, ValidJson},
};
use crate::{
    db::{
        DeleteById, FetchById, FetchByQuery, Write,
        record::{CheckReferences, Record, reconcile},
    },
    server::{AppState, auth::User},
};

/// A record type exposed through the list/create/retrieve/edit/destroy endpoints.
pub(super) trait RecordResource:
    Record
    + FetchById<Id = i32>
    + FetchByQuery<QueryParams = Caller>
    + DeleteById<Id = i32>
    + Serialize
    + Send
    + 'static
{
    type New: DeserializeOwned
        + Validate<Context = ()>
        + CheckReferences
        + Write<Returns = Self>
        + Send;
    type Update: DeserializeOwned
        + Validate<Context = ()>
        + CheckReferences
        + Write<Returns = Self>
        + Send;
}

impl RecordResource for Sample {
    type New = NewSample;
    type Update = SampleUpdate;
}

impl RecordResource for Library {
    type New = NewLibrary;
    type Update = LibraryUpdate;
}

/// A batch of payloads. Each one is deserialized and validated on its own, so they stay
/// untyped here.
#[derive(Debug, Deserialize, Validate)]
pub(super) struct Batch {
    #[garde(skip)]
    data: Vec<Value>,
}

pub(super) async fn list<R: RecordResource>(
    User(caller): User,
    State(app_state): State<AppState>,
) -> Result<Outcome<Vec<R>>> {
    let mut db_conn = app_state.db_conn().await?;

    let records = db_conn
        .transaction(|conn| async move { R::fetch_by_query(&caller, conn).await }.scope_boxed())
        .await?;

    Ok(Outcome::ok(records))
}

pub(super) async fn create<R: RecordResource>(
    _user: User,
    State(app_state): State<AppState>,
    ValidJson(Batch { data }): ValidJson<Batch>,
) -> Result<Outcome<Vec<RecordSummary>>> {
    tracing::info!(
        n_payloads = data.len(),
        "creating {} records",
        R::RECORD_TYPE.display_name()
    );

    let mut db_conn = app_state.db_conn().await?;

    let batch = db_conn
        .transaction(|conn| async move { reconcile::<R::New>(data, conn).await }.scope_boxed())
        .await?;

    Ok(Outcome::from_batch(
        batch,
        StatusCode::CREATED,
        "Invalid payload. Some records cannot be added.",
    ))
}

pub(super) async fn edit<R: RecordResource>(
    _user: User,
    State(app_state): State<AppState>,
    ValidJson(Batch { data }): ValidJson<Batch>,
) -> Result<Outcome<Vec<RecordSummary>>> {
    tracing::info!(
        n_payloads = data.len(),
        "updating {} records",
        R::RECORD_TYPE.display_name()
    );

    let mut db_conn = app_state.db_conn().await?;

    let batch = db_conn
        .transaction(|conn| {
            async move { reconcile::<R::Update>(data, conn).await }.scope_boxed()
        })
        .await?;

    Ok(Outcome::from_batch(
        batch,
        StatusCode::OK,
        "Invalid payload. Some records cannot be updated.",
    ))
}

pub(super) async fn retrieve<R: RecordResource>(
    _user: User,
    State(app_state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Outcome<R>> {
    let id = parse_id(Some(&raw_id))?;

    let mut db_conn = app_state.db_conn().await?;

    let record = db_conn
        .transaction(|conn| async move { R::fetch_by_id(&id, conn).await }.scope_boxed())
        .await
        .map_err(|err| Error::from(err).naming(R::RECORD_TYPE))?;

    Ok(Outcome::ok(record))
}

pub(super) async fn destroy<R: RecordResource>(
    _user: User,
    State(app_state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Outcome<()>> {
    let id = parse_id(Some(&raw_id))?;

    tracing::info!(id, "deleting {}", R::RECORD_TYPE.display_name());

    let mut db_conn = app_state.db_conn().await?;

    db_conn
        .transaction(|conn| async move { R::delete_by_id(&id, conn).await }.scope_boxed())
        .await
        .map_err(|err| Error::from(err).naming(R::RECORD_TYPE))?;

    Ok(Outcome::done())
}
