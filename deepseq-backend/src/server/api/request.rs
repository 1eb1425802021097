use axum::{
    Form,
    extract::{
        Multipart, Query, State,
        multipart::MultipartRejection,
        rejection::{FormRejection, QueryRejection},
    },
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use camino::{Utf8Path, Utf8PathBuf};
use deepseq_core::model::{
    request::{
        Request, RequestIdForm, RequestItem, RequestSummary, RequestUpdate, SaveMode,
        SaveRequestForm, UploadedFile,
    },
    researcher::Caller,
};
use diesel_async::{AsyncConnection, scoped_futures::ScopedFutureExt};
use garde::Validate;
use uuid::Uuid;

use super::{
    error::{Error, Result, parse_id},
    handler::{Data, Lifecycle, NoBody},
};
use crate::{
    db::{
        DbConnection, DeleteById, FetchById, FetchByQuery, Write,
        request::{
            NewRequestWithRecords, RequestListQuery, RequestUpdateWithRecords,
            attach_deep_seq_request, fetch_report_data, fetch_request_items,
        },
    },
    report::{self, ReportData},
    server::{AppState, auth::User},
};

/// Where uploaded request forms are stored, relative to the media root.
const UPLOAD_DIR: &str = "deep_seq_requests";

/// Fetches a request the caller may act on: staff may act on any request, everyone else only
/// on their own.
async fn visible_request(
    caller: &Caller,
    request_id: i32,
    db_conn: &mut DbConnection,
) -> Result<Request> {
    let request = Request::fetch_by_id(&request_id, db_conn).await?;

    if !caller.is_staff && request.researcher_id != caller.researcher_id {
        return Err(Error::forbidden(format!(
            "request {request_id} belongs to another researcher"
        )));
    }

    Ok(request)
}

fn request_id(form: std::result::Result<RequestIdForm, Error>) -> Result<i32> {
    let RequestIdForm { request_id } = form?;

    parse_id(request_id.as_deref())
}

async fn list_requests(caller: Caller, app_state: &AppState) -> Result<Vec<RequestSummary>> {
    let query = RequestListQuery {
        caller,
        media_url: app_state.config().media_url(),
    };

    let mut db_conn = app_state.db_conn().await?;

    let summaries = db_conn
        .transaction(|conn| {
            async move { RequestSummary::fetch_by_query(&query, conn).await }.scope_boxed()
        })
        .await?;

    Ok(summaries)
}

pub(super) async fn list(
    User(caller): User,
    State(app_state): State<AppState>,
) -> Lifecycle<Data<Vec<RequestSummary>>> {
    let result = list_requests(caller, &app_state).await;

    Lifecycle::from(result.map(|data| Data { data }))
}

async fn save_request(caller: Caller, app_state: &AppState, form: SaveRequestForm) -> Result<()> {
    form.validate()?;

    let ids_error = |err: serde_json::Error| Error::SimpleData {
        reason: format!("record ids must be a JSON list of integers: {err}"),
    };
    let library_ids = form.library_ids().map_err(ids_error)?;
    let sample_ids = form.sample_ids().map_err(ids_error)?;

    let SaveRequestForm {
        mode,
        request_id,
        name,
        description,
        status,
        ..
    } = form;

    let mut db_conn = app_state.db_conn().await?;

    match mode {
        SaveMode::Add => {
            let new_request =
                NewRequestWithRecords::new(&caller, description, library_ids, sample_ids);

            let request = db_conn
                .transaction(|conn| async move { new_request.write(conn).await }.scope_boxed())
                .await?;

            tracing::info!(request_id = request.id, name = %request.name, "created request");
        }
        SaveMode::Edit => {
            let id = parse_id(request_id.as_deref())?;

            let update = RequestUpdateWithRecords {
                update: RequestUpdate {
                    id,
                    name,
                    status,
                    description: Some(description),
                    ..Default::default()
                },
                library_ids,
                sample_ids,
            };

            db_conn
                .transaction(|conn| {
                    async move {
                        visible_request(&caller, id, conn).await?;

                        update.write(conn).await.map_err(Error::from)
                    }
                    .scope_boxed()
                })
                .await?;

            tracing::info!(request_id = id, "edited request");
        }
    }

    Ok(())
}

pub(super) async fn save(
    User(caller): User,
    State(app_state): State<AppState>,
    form: std::result::Result<Form<SaveRequestForm>, FormRejection>,
) -> Lifecycle<NoBody> {
    let result = match form {
        Ok(Form(form)) => save_request(caller, &app_state, form).await,
        Err(rejection) => Err(Error::from(rejection)),
    };

    Lifecycle::from(result.map(|()| NoBody {}))
}

async fn delete_request(
    caller: Caller,
    app_state: &AppState,
    form: std::result::Result<Form<RequestIdForm>, FormRejection>,
) -> Result<()> {
    let id = request_id(form.map(|Form(form)| form).map_err(Error::from))?;

    let mut db_conn = app_state.db_conn().await?;

    db_conn
        .transaction(|conn| {
            async move {
                visible_request(&caller, id, conn).await?;

                Request::delete_by_id(&id, conn).await.map_err(Error::from)
            }
            .scope_boxed()
        })
        .await?;

    tracing::info!(request_id = id, "deleted request");

    Ok(())
}

pub(super) async fn delete(
    User(caller): User,
    State(app_state): State<AppState>,
    form: std::result::Result<Form<RequestIdForm>, FormRejection>,
) -> Lifecycle<NoBody> {
    let result = delete_request(caller, &app_state, form).await;

    Lifecycle::from(result.map(|()| NoBody {}))
}

async fn request_records(
    caller: Caller,
    app_state: &AppState,
    query: std::result::Result<Query<RequestIdForm>, QueryRejection>,
) -> Result<Vec<RequestItem>> {
    let id = request_id(query.map(|Query(query)| query).map_err(Error::from))?;

    let mut db_conn = app_state.db_conn().await?;

    let items = db_conn
        .transaction(|conn| {
            async move {
                visible_request(&caller, id, conn).await?;

                fetch_request_items(id, conn).await.map_err(Error::from)
            }
            .scope_boxed()
        })
        .await?;

    Ok(items)
}

pub(super) async fn records(
    User(caller): User,
    State(app_state): State<AppState>,
    query: std::result::Result<Query<RequestIdForm>, QueryRejection>,
) -> Lifecycle<Data<Vec<RequestItem>>> {
    let result = request_records(caller, &app_state, query).await;

    Lifecycle::from(result.map(|data| Data { data }))
}

/// Reduces a client-supplied filename to a safe final path component.
fn sanitize_filename(filename: &str) -> String {
    let base = Utf8Path::new(filename).file_name().unwrap_or_default();

    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let sanitized = sanitized.trim_start_matches('.');

    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized.to_string()
    }
}

struct Upload {
    request_id: Option<String>,
    file: Option<(String, Vec<u8>)>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload> {
    let mut upload = Upload {
        request_id: None,
        file: None,
    };

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);

        match name.as_deref() {
            Some("request_id") => upload.request_id = Some(field.text().await?),
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let contents = field.bytes().await?;

                upload.file = Some((filename, contents.to_vec()));
            }
            _ => (),
        }
    }

    Ok(upload)
}

/// Removes a stored form whose database row was rolled back.
async fn discard_upload(path: &Utf8Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::info!(%path, "removed orphaned request form"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => (),
        Err(err) => tracing::warn!(%path, error = %err, "failed to remove orphaned request form"),
    }
}

async fn store_upload(
    caller: Caller,
    app_state: &AppState,
    multipart: Multipart,
) -> Result<UploadedFile> {
    let Upload { request_id, file } = read_upload(multipart).await?;

    let Some((filename, contents)) = file else {
        return Ok(UploadedFile::default());
    };

    let id = parse_id(request_id.as_deref())?;

    let stored_name = format!("{}_{}", Uuid::now_v7(), sanitize_filename(&filename));
    let relative_path = Utf8PathBuf::from(UPLOAD_DIR).join(&stored_name);
    let upload_dir = app_state.config().media_root().join(UPLOAD_DIR);
    let absolute_path = upload_dir.join(&stored_name);

    let mut db_conn = app_state.db_conn().await?;

    let name = filename.clone();
    let file = relative_path.to_string();
    let target = absolute_path.clone();
    let stored = db_conn
        .transaction(|conn| {
            async move {
                visible_request(&caller, id, conn).await?;

                tokio::fs::create_dir_all(&upload_dir).await?;
                tokio::fs::write(&target, contents).await?;

                attach_deep_seq_request(id, &name, &file, conn)
                    .await
                    .map_err(Error::from)
            }
            .scope_boxed()
        })
        .await;

    if let Err(err) = stored {
        discard_upload(&absolute_path).await;

        return Err(err);
    }

    tracing::info!(request_id = id, path = %relative_path, "stored request form");

    Ok(UploadedFile {
        name: filename,
        path: format!("{}{relative_path}", app_state.config().media_url()),
    })
}

pub(super) async fn upload(
    User(caller): User,
    State(app_state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Lifecycle<UploadedFile> {
    let result = match multipart {
        Ok(multipart) => store_upload(caller, &app_state, multipart).await,
        Err(rejection) => Err(Error::from(rejection)),
    };

    Lifecycle::from(result)
}

async fn report_data(
    caller: Caller,
    app_state: &AppState,
    query: std::result::Result<Query<RequestIdForm>, QueryRejection>,
) -> Result<ReportData> {
    let id = request_id(query.map(|Query(query)| query).map_err(Error::from))?;

    let mut db_conn = app_state.db_conn().await?;

    let data = db_conn
        .transaction(|conn| {
            async move {
                visible_request(&caller, id, conn).await?;

                fetch_report_data(id, conn).await.map_err(Error::from)
            }
            .scope_boxed()
        })
        .await?;

    Ok(data)
}

/// Always answers with a PDF. When the request's data can't be gathered the document is
/// empty and carries no filename.
pub(super) async fn pdf(
    User(caller): User,
    State(app_state): State<AppState>,
    query: std::result::Result<Query<RequestIdForm>, QueryRejection>,
) -> Response {
    let (title, filename, pages) = match report_data(caller, &app_state, query).await {
        Ok(data) => {
            let today = chrono::Local::now().date_naive();

            (data.request_name.clone(), Some(data.filename()), data.layout(today))
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to gather report data");

            (String::new(), None, report::empty_layout())
        }
    };

    let bytes = match report::pdf::render(&title, &pages) {
        Ok(bytes) => bytes,
        Err(err) => {
            return Error::Report {
                message: err.to_string(),
            }
            .into_response();
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );

    if let Some(disposition) = filename
        .and_then(|f| HeaderValue::from_str(&format!("inline; filename=\"{f}\"")).ok())
    {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }

    (headers, bytes).into_response()
}
