use std::collections::HashMap;

use deepseq_core::model::{
    record::{library::Library, sample::Sample},
    request::{
        NEW_STATUS, NewRequest, RecordId, Request, RequestItem, RequestSummary, RequestUpdate,
        format_date, order_by_barcode, order_request_list, request_name,
    },
    researcher::{Caller, ResearcherContact},
};
use deepseq_schema::{
    cost_unit, file_deep_seq_request, library, organization, principal_investigator, request,
    request_library, request_sample, researcher, researcher_cost_unit, sample,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use itertools::Itertools;

use super::{DbConnection, DeleteById, FetchById, FetchByQuery, Write, error};
use crate::{ensure_references, report::ReportData};

/// A new request owned by the caller, together with the records it starts out with.
#[derive(Debug, Clone)]
pub struct NewRequestWithRecords {
    researcher_id: i32,
    description: String,
    library_ids: Vec<i32>,
    sample_ids: Vec<i32>,
}

impl NewRequestWithRecords {
    #[must_use]
    pub fn new(
        caller: &Caller,
        description: impl ToString,
        library_ids: Vec<i32>,
        sample_ids: Vec<i32>,
    ) -> Self {
        Self {
            researcher_id: caller.researcher_id,
            description: description.to_string(),
            library_ids,
            sample_ids,
        }
    }
}

impl Write for NewRequestWithRecords {
    type Returns = Request;

    async fn write(self, db_conn: &mut DbConnection) -> error::Result<Self::Returns> {
        let Self {
            researcher_id,
            description,
            library_ids,
            sample_ids,
        } = self;

        let new_request = NewRequest {
            name: String::new(),
            status: NEW_STATUS,
            researcher_id,
            description,
        };

        let id = diesel::insert_into(request::table)
            .values(new_request)
            .returning(request::id)
            .get_result(db_conn)
            .await?;

        diesel::update(request::table.find(id))
            .set(request::name.eq(request_name(id)))
            .execute(db_conn)
            .await?;

        attach_records(id, &library_ids, &sample_ids, db_conn).await?;

        Request::fetch_by_id(&id, db_conn).await
    }
}

/// Changes to an existing request. Records are only ever added to a request here, never
/// removed.
#[derive(Debug, Clone, Default)]
pub struct RequestUpdateWithRecords {
    pub update: RequestUpdate,
    pub library_ids: Vec<i32>,
    pub sample_ids: Vec<i32>,
}

impl Write for RequestUpdateWithRecords {
    type Returns = Request;

    async fn write(self, db_conn: &mut DbConnection) -> error::Result<Self::Returns> {
        let Self {
            update,
            library_ids,
            sample_ids,
        } = self;

        let RequestUpdate { id, .. } = update;

        // fails with `RecordNotFound` before anything is touched
        Request::fetch_by_id(&id, db_conn).await?;

        if !update.is_empty() {
            diesel::update(&update)
                .set(&update)
                .execute(db_conn)
                .await?;
        }

        attach_records(id, &library_ids, &sample_ids, db_conn).await?;

        Request::fetch_by_id(&id, db_conn).await
    }
}

async fn attach_records(
    request_id: i32,
    library_ids: &[i32],
    sample_ids: &[i32],
    db_conn: &mut DbConnection,
) -> error::Result<()> {
    ensure_references!("request", library, library_ids, db_conn)?;
    ensure_references!("request", sample, sample_ids, db_conn)?;

    for library_id in library_ids {
        diesel::insert_into(request_library::table)
            .values((
                request_library::request_id.eq(request_id),
                request_library::library_id.eq(library_id),
            ))
            .on_conflict_do_nothing()
            .execute(db_conn)
            .await?;
    }

    for sample_id in sample_ids {
        diesel::insert_into(request_sample::table)
            .values((
                request_sample::request_id.eq(request_id),
                request_sample::sample_id.eq(sample_id),
            ))
            .on_conflict_do_nothing()
            .execute(db_conn)
            .await?;
    }

    diesel::update(library::table.filter(library::id.eq_any(library_ids)))
        .set(library::is_in_request.eq(true))
        .execute(db_conn)
        .await?;

    diesel::update(sample::table.filter(sample::id.eq_any(sample_ids)))
        .set(sample::is_in_request.eq(true))
        .execute(db_conn)
        .await?;

    Ok(())
}

impl FetchById for Request {
    type Id = i32;

    async fn fetch_by_id(id: &Self::Id, db_conn: &mut DbConnection) -> error::Result<Self> {
        Ok(request::table
            .find(id)
            .select(Self::as_select())
            .first(db_conn)
            .await?)
    }
}

/// Deleting a request deletes every library and sample attached to it, not just the
/// association.
impl DeleteById for Request {
    type Id = i32;

    async fn delete_by_id(id: &Self::Id, db_conn: &mut DbConnection) -> error::Result<()> {
        let request = Request::fetch_by_id(id, db_conn).await?;

        let library_ids: Vec<i32> = request_library::table
            .filter(request_library::request_id.eq(request.id))
            .select(request_library::library_id)
            .load(db_conn)
            .await?;

        let sample_ids: Vec<i32> = request_sample::table
            .filter(request_sample::request_id.eq(request.id))
            .select(request_sample::sample_id)
            .load(db_conn)
            .await?;

        for library_id in &library_ids {
            Library::delete_by_id(library_id, db_conn).await?;
        }

        for sample_id in &sample_ids {
            Sample::delete_by_id(sample_id, db_conn).await?;
        }

        diesel::delete(request::table.find(request.id))
            .execute(db_conn)
            .await?;

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RequestListQuery {
    pub caller: Caller,
    pub media_url: String,
}

impl FetchByQuery for RequestSummary {
    type QueryParams = RequestListQuery;

    async fn fetch_by_query(
        query: &Self::QueryParams,
        db_conn: &mut DbConnection,
    ) -> error::Result<Vec<Self>> {
        let RequestListQuery { caller, media_url } = query;

        let mut statement = request::table
            .inner_join(researcher::table)
            .left_join(file_deep_seq_request::table)
            .select((
                Request::as_select(),
                researcher::name,
                (file_deep_seq_request::name, file_deep_seq_request::file).nullable(),
            ))
            .into_boxed();

        if !caller.is_staff {
            statement = statement.filter(request::researcher_id.eq(caller.researcher_id));
        }

        let rows: Vec<(Request, String, Option<(String, String)>)> =
            statement.load(db_conn).await?;

        let request_ids: Vec<i32> = rows.iter().map(|(request, ..)| request.id).collect();

        let library_depths: Vec<(i32, i32)> = request_library::table
            .inner_join(library::table)
            .filter(request_library::request_id.eq_any(&request_ids))
            .select((request_library::request_id, library::sequencing_depth))
            .load(db_conn)
            .await?;

        let sample_depths: Vec<(i32, i32)> = request_sample::table
            .inner_join(sample::table)
            .filter(request_sample::request_id.eq_any(&request_ids))
            .select((request_sample::request_id, sample::sequencing_depth))
            .load(db_conn)
            .await?;

        let mut sequencing_depths: HashMap<i32, i64> = library_depths
            .into_iter()
            .chain(sample_depths)
            .map(|(request_id, depth)| (request_id, i64::from(depth)))
            .into_grouping_map()
            .sum();

        let mut summaries: Vec<_> = rows
            .into_iter()
            .map(|(request, researcher, file)| {
                let (deep_seq_request_name, deep_seq_request_path) = file
                    .map(|(name, file)| (name, format!("{media_url}{file}")))
                    .unwrap_or_default();

                RequestSummary {
                    sum_seq_depth: sequencing_depths.remove(&request.id).unwrap_or_default(),
                    request_id: request.id,
                    status: request.status,
                    name: request.name,
                    date_created: format_date(&request.date_created),
                    description: request.description,
                    researcher_id: request.researcher_id,
                    researcher,
                    deep_seq_request_name,
                    deep_seq_request_path,
                }
            })
            .collect();

        order_request_list(&mut summaries);

        Ok(summaries)
    }
}

/// The libraries and samples attached to a request, ordered by barcode.
///
/// # Errors
/// `RecordNotFound` if the request doesn't exist.
pub async fn fetch_request_items(
    request_id: i32,
    db_conn: &mut DbConnection,
) -> error::Result<Vec<RequestItem>> {
    let request = Request::fetch_by_id(&request_id, db_conn).await?;

    let libraries: Vec<(i32, String, String)> = request_library::table
        .inner_join(library::table)
        .filter(request_library::request_id.eq(request.id))
        .select((library::id, library::name, library::barcode))
        .load(db_conn)
        .await?;

    let samples: Vec<(i32, String, String)> = request_sample::table
        .inner_join(sample::table)
        .filter(request_sample::request_id.eq(request.id))
        .select((sample::id, sample::name, sample::barcode))
        .load(db_conn)
        .await?;

    let libraries = libraries
        .into_iter()
        .map(|(id, name, barcode)| RequestItem::new(RecordId::Library(id), name, barcode));
    let samples = samples
        .into_iter()
        .map(|(id, name, barcode)| RequestItem::new(RecordId::Sample(id), name, barcode));

    let mut items: Vec<_> = libraries.chain(samples).collect();
    order_by_barcode(&mut items);

    Ok(items)
}

#[derive(Insertable)]
#[diesel(table_name = file_deep_seq_request)]
struct NewDeepSeqRequestFile<'a> {
    name: &'a str,
    file: &'a str,
}

/// Records an uploaded request form and makes it the request's current one. `file` is the
/// stored path relative to the media root.
///
/// # Errors
/// `RecordNotFound` if the request doesn't exist.
pub async fn attach_deep_seq_request(
    request_id: i32,
    name: &str,
    file: &str,
    db_conn: &mut DbConnection,
) -> error::Result<()> {
    let file_id: i32 = diesel::insert_into(file_deep_seq_request::table)
        .values(NewDeepSeqRequestFile { name, file })
        .returning(file_deep_seq_request::id)
        .get_result(db_conn)
        .await?;

    let update = RequestUpdate {
        id: request_id,
        deep_seq_request_id: Some(file_id),
        ..Default::default()
    };

    let n_updated = diesel::update(&update)
        .set(&update)
        .execute(db_conn)
        .await?;

    if n_updated == 0 {
        return Err(error::Error::RecordNotFound);
    }

    Ok(())
}

/// Gathers everything printed on a request's report.
///
/// # Errors
/// `RecordNotFound` if the request doesn't exist.
pub async fn fetch_report_data(
    request_id: i32,
    db_conn: &mut DbConnection,
) -> error::Result<ReportData> {
    let request = Request::fetch_by_id(&request_id, db_conn).await?;

    let (name, phone, email, organization, principal_investigator): (
        String,
        String,
        String,
        Option<String>,
        Option<String>,
    ) = researcher::table
        .left_join(organization::table)
        .left_join(principal_investigator::table)
        .filter(researcher::id.eq(request.researcher_id))
        .select((
            researcher::name,
            researcher::phone,
            researcher::email,
            organization::name.nullable(),
            principal_investigator::name.nullable(),
        ))
        .first(db_conn)
        .await?;

    let cost_units = researcher_cost_unit::table
        .inner_join(cost_unit::table)
        .filter(researcher_cost_unit::researcher_id.eq(request.researcher_id))
        .select(cost_unit::name)
        .load(db_conn)
        .await?;

    let items = fetch_request_items(request.id, db_conn).await?;

    Ok(ReportData {
        request_name: request.name,
        description: request.description,
        contact: ResearcherContact {
            name,
            phone,
            email,
            organization: organization.unwrap_or_default(),
            principal_investigator: principal_investigator.unwrap_or_default(),
            cost_units,
        },
        items,
    })
}
