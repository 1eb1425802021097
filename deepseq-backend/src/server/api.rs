use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    routing::{get, patch, post},
};
use deepseq_core::model::{
    Endpoint,
    catalog::{
        ConcentrationMethod, Index, IndexKind, IndexQuery, IndexType, LibraryProtocol,
        LibraryType, Organism, ReadLength,
    },
    pool::Pool,
    record::{library::Library, sample::Sample},
    request::Request,
    researcher::Researcher,
};

use super::{AppState, auth::User};
use handler::Query;

mod catalog;
mod error;
mod handler;
mod pool;
mod record;
mod request;
mod researcher;

/// Registers the list, create, retrieve, batch edit and delete endpoints of a record type.
fn record_routes<R>(router: Router<AppState>) -> Router<AppState>
where
    R: record::RecordResource + Endpoint,
{
    let base = R::endpoint();

    router
        .route(&base, get(record::list::<R>).post(record::create::<R>))
        .route(&format!("{base}/edit"), post(record::edit::<R>))
        .route(
            &format!("{base}/{{id}}"),
            get(record::retrieve::<R>).delete(record::destroy::<R>),
        )
}

/// `max_upload_bytes` lifts the default body limit on the request-form upload only.
pub(super) fn router(max_upload_bytes: usize) -> Router<AppState> {
    let requests = Request::endpoint();

    let router = Router::new()
        .route(&Organism::endpoint(), get(catalog::list::<Organism>))
        .route(&ReadLength::endpoint(), get(catalog::list::<ReadLength>))
        .route(
            &ConcentrationMethod::endpoint(),
            get(catalog::list::<ConcentrationMethod>),
        )
        .route(&IndexType::endpoint(), get(catalog::list::<IndexType>))
        .route(
            &LibraryProtocol::endpoint(),
            get(catalog::list::<LibraryProtocol>),
        )
        .route(&LibraryType::endpoint(), get(catalog::list::<LibraryType>))
        .route(&Index::all_endpoint(), get(catalog::all_indices))
        .route(
            &Index::endpoint(IndexKind::I7),
            get(
                |user: User, state: State<AppState>, query: Query<IndexQuery>| {
                    catalog::indices(IndexKind::I7, user, state, query)
                },
            ),
        )
        .route(
            &Index::endpoint(IndexKind::I5),
            get(
                |user: User, state: State<AppState>, query: Query<IndexQuery>| {
                    catalog::indices(IndexKind::I5, user, state, query)
                },
            ),
        )
        .route(&requests, get(request::list))
        .route(&format!("{requests}/save"), post(request::save))
        .route(&format!("{requests}/delete"), post(request::delete))
        .route(&format!("{requests}/records"), get(request::records))
        .route(
            &format!("{requests}/upload"),
            post(request::upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(&format!("{requests}/pdf"), get(request::pdf))
        .route(&Pool::endpoint(), get(pool::list).post(pool::create))
        .route(&format!("{}/{{id}}", Pool::endpoint()), get(pool::retrieve))
        .route(
            &Researcher::endpoint(),
            get(researcher::list).post(researcher::create),
        )
        .route(
            &format!("{}/{{id}}", Researcher::endpoint()),
            patch(researcher::edit).delete(researcher::delete),
        );

    let router = record_routes::<Sample>(router);

    record_routes::<Library>(router)
}
