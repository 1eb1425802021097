use anyhow::Context;
use deepseq_core::model::{catalog::NucleicAcidType, researcher::NewResearcher};
use deepseq_schema::{
    concentration_method, cost_unit, index_i5, index_i7, index_type, library_protocol,
    library_type, library_type_protocol, organism, organization, principal_investigator,
    read_length, researcher,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use garde::Validate;
use serde::Deserialize;

use super::{DbConnection, Write, catalog::index_type_id};
use crate::server::auth::ApiKey;

#[derive(Deserialize, Debug, Clone)]
pub struct NamedEntry {
    name: String,
    #[serde(default)]
    is_fallback_option: bool,
}

#[derive(Deserialize, Insertable, Debug, Clone)]
#[diesel(table_name = library_protocol)]
pub struct SeedLibraryProtocol {
    name: String,
    #[serde(rename = "type")]
    nucleic_acid_type: NucleicAcidType,
    #[serde(default)]
    provider: String,
    #[serde(default)]
    catalog: String,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    input_requirements: String,
    #[serde(default)]
    typical_application: String,
    #[serde(default)]
    comments: String,
    #[serde(default)]
    is_fallback_option: bool,
}

/// A library type and the names of the protocols it can be prepared with.
#[derive(Deserialize, Debug, Clone)]
pub struct SeedLibraryType {
    name: String,
    #[serde(default)]
    protocols: Vec<String>,
    #[serde(default)]
    is_fallback_option: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SeedIndex {
    index_id: String,
    sequence: String,
}

#[derive(Deserialize, Insertable, Debug, Clone)]
#[diesel(table_name = index_type)]
pub struct SeedIndexType {
    name: String,
    #[serde(default)]
    is_index_i7: bool,
    #[serde(default)]
    is_index_i5: bool,
    index_length: i32,
    #[serde(default)]
    is_fallback_option: bool,
    #[serde(default)]
    #[diesel(skip_insertion)]
    i7: Vec<SeedIndex>,
    #[serde(default)]
    #[diesel(skip_insertion)]
    i5: Vec<SeedIndex>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SeedAdmin {
    name: String,
    email: String,
    #[serde(default)]
    phone: String,
    organization: Option<String>,
}

/// Reference data the application can't run without. Writing it is idempotent: anything
/// already present (matched by name) is left alone.
#[derive(Deserialize, Debug, Clone)]
pub struct SeedData {
    #[serde(default)]
    organizations: Vec<String>,
    #[serde(default)]
    principal_investigators: Vec<String>,
    #[serde(default)]
    cost_units: Vec<String>,
    app_admin: Option<SeedAdmin>,
    #[serde(default)]
    organisms: Vec<NamedEntry>,
    #[serde(default)]
    read_lengths: Vec<NamedEntry>,
    #[serde(default)]
    concentration_methods: Vec<NamedEntry>,
    #[serde(default)]
    library_protocols: Vec<SeedLibraryProtocol>,
    #[serde(default)]
    library_types: Vec<SeedLibraryType>,
    #[serde(default)]
    index_types: Vec<SeedIndexType>,
}

macro_rules! insert_names {
    ($table:ident, $names:expr, $db_conn:expr) => {
        for name in $names {
            diesel::insert_or_ignore_into($table::table)
                .values($table::name.eq(name))
                .execute(&mut *$db_conn)
                .await?;
        }
    };
}

macro_rules! insert_named_entries {
    ($table:ident, $entries:expr, $db_conn:expr) => {
        for NamedEntry {
            name,
            is_fallback_option,
        } in $entries
        {
            diesel::insert_or_ignore_into($table::table)
                .values((
                    $table::name.eq(name),
                    $table::is_fallback_option.eq(is_fallback_option),
                ))
                .execute(&mut *$db_conn)
                .await?;
        }
    };
}

macro_rules! insert_indices {
    ($table:ident, $index_type_id:expr, $indices:expr, $db_conn:expr) => {
        for SeedIndex { index_id, sequence } in $indices {
            diesel::insert_or_ignore_into($table::table)
                .values((
                    $table::index_id.eq(index_id),
                    $table::sequence.eq(sequence),
                    $table::index_type_id.eq($index_type_id),
                ))
                .execute(&mut *$db_conn)
                .await?;
        }
    };
}

impl SeedData {
    /// # Errors
    /// Fails on database errors, or when an entry refers by name to something that doesn't
    /// exist.
    pub async fn write(self, db_conn: &mut DbConnection) -> anyhow::Result<()> {
        let Self {
            organizations,
            principal_investigators,
            cost_units,
            app_admin,
            organisms,
            read_lengths,
            concentration_methods,
            library_protocols,
            library_types,
            index_types,
        } = self;

        insert_names!(organization, organizations, db_conn);
        insert_names!(principal_investigator, principal_investigators, db_conn);
        insert_names!(cost_unit, cost_units, db_conn);

        insert_named_entries!(organism, organisms, db_conn);
        insert_named_entries!(read_length, read_lengths, db_conn);
        insert_named_entries!(concentration_method, concentration_methods, db_conn);

        for protocol in &library_protocols {
            diesel::insert_or_ignore_into(library_protocol::table)
                .values(protocol)
                .execute(db_conn)
                .await?;
        }

        write_library_types(library_types, db_conn)
            .await
            .context("failed to insert library types")?;

        for index_type in index_types {
            diesel::insert_or_ignore_into(index_type::table)
                .values(&index_type)
                .execute(db_conn)
                .await?;

            let id = index_type_id(&index_type.name, db_conn).await?;

            insert_indices!(index_i7, id, index_type.i7, db_conn);
            insert_indices!(index_i5, id, index_type.i5, db_conn);
        }

        if let Some(app_admin) = app_admin {
            write_app_admin(app_admin, db_conn)
                .await
                .context("failed to create app admin")?;
        }

        Ok(())
    }
}

async fn write_library_types(
    library_types: Vec<SeedLibraryType>,
    db_conn: &mut DbConnection,
) -> anyhow::Result<()> {
    for SeedLibraryType {
        name,
        protocols,
        is_fallback_option,
    } in library_types
    {
        diesel::insert_or_ignore_into(library_type::table)
            .values((
                library_type::name.eq(&name),
                library_type::is_fallback_option.eq(is_fallback_option),
            ))
            .execute(db_conn)
            .await?;

        let library_type_id: i32 = library_type::table
            .filter(library_type::name.eq(&name))
            .select(library_type::id)
            .first(db_conn)
            .await?;

        for protocol in protocols {
            let library_protocol_id: i32 = library_protocol::table
                .filter(library_protocol::name.eq(&protocol))
                .select(library_protocol::id)
                .first(db_conn)
                .await
                .context(format!("library type {name} refers to unknown protocol {protocol}"))?;

            diesel::insert_or_ignore_into(library_type_protocol::table)
                .values((
                    library_type_protocol::library_type_id.eq(library_type_id),
                    library_type_protocol::library_protocol_id.eq(library_protocol_id),
                ))
                .execute(db_conn)
                .await?;
        }
    }

    Ok(())
}

async fn write_app_admin(admin: SeedAdmin, db_conn: &mut DbConnection) -> anyhow::Result<()> {
    let SeedAdmin {
        name,
        email,
        phone,
        organization,
    } = admin;

    let exists: bool = diesel::select(diesel::dsl::exists(
        researcher::table.filter(researcher::email.eq(&email)),
    ))
    .get_result(db_conn)
    .await?;

    if exists {
        return Ok(());
    }

    let organization_id = match organization {
        Some(organization) => Some(
            organization::table
                .filter(organization::name.eq(&organization))
                .select(organization::id)
                .first(db_conn)
                .await
                .context(format!("app admin refers to unknown organization {organization}"))?,
        ),
        None => None,
    };

    let admin = NewResearcher {
        name,
        email,
        phone,
        organization_id,
        pi_id: None,
        is_staff: true,
        cost_unit_ids: Vec::new(),
    };
    admin.validate()?;

    let created = admin.write(db_conn).await?;

    let api_key = ApiKey::from(created.api_key.as_str());
    tracing::info!(
        researcher_id = created.researcher.id,
        ?api_key,
        "created app admin"
    );

    // Shown once, and kept out of the persistent logs
    println!("app admin API key: {api_key}");

    Ok(())
}
