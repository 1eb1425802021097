use deepseq_core::model::researcher::{Caller, NewResearcher};
use deepseq_schema::{
    concentration_method, cost_unit, index_type, library_protocol, library_type, organism,
    read_length, researcher,
};
use diesel::{Connection, SqliteConnection, connection::SimpleConnection, prelude::*};
use diesel_async::{RunQueryDsl, sync_connection_wrapper::SyncConnectionWrapper};
use diesel_migrations::MigrationHarness;
use rstest::fixture;
use serde_json::{Value, json};

use super::{DbConnection, MIGRATIONS, Write, seed_data::SeedData};

pub const SEED_DATA: &str = include_str!("../../../db/seed_data.json");

const ADMIN_EMAIL: &str = "deepseq-admin@example.com";

/// Ids of catalog entries that new records can point at.
#[derive(Debug, Clone, Copy)]
pub struct CatalogRefs {
    pub organism_id: i32,
    pub read_length_id: i32,
    pub concentration_method_id: i32,
    pub library_protocol_id: i32,
    pub library_type_id: i32,
    pub index_type_id: i32,
}

pub struct Seeded {
    pub db_conn: DbConnection,
    pub refs: CatalogRefs,
    pub admin: Caller,
    pub researcher: Caller,
}

macro_rules! id_by_name {
    ($table:ident, $name:expr, $db_conn:expr) => {
        $table::table
            .filter($table::name.eq($name))
            .select($table::id)
            .first::<i32>(&mut $db_conn)
            .await
            .unwrap()
    };
}

fn migrated_connection() -> SqliteConnection {
    let mut db_conn = SqliteConnection::establish(":memory:").unwrap();

    db_conn.batch_execute("PRAGMA foreign_keys = ON").unwrap();
    db_conn.run_pending_migrations(MIGRATIONS).unwrap();

    db_conn
}

/// A fresh in-memory database holding the shipped seed data and one researcher without
/// staff rights.
#[fixture]
pub async fn seeded() -> Seeded {
    let mut db_conn = SyncConnectionWrapper::new(migrated_connection());

    let seed_data: SeedData = serde_json::from_str(SEED_DATA).unwrap();
    seed_data.write(&mut db_conn).await.unwrap();

    let refs = CatalogRefs {
        organism_id: id_by_name!(organism, "Human", db_conn),
        read_length_id: id_by_name!(read_length, "2x75", db_conn),
        concentration_method_id: id_by_name!(concentration_method, "Fluorometry", db_conn),
        library_protocol_id: id_by_name!(library_protocol, "NEBNext Ultra II DNA", db_conn),
        library_type_id: id_by_name!(library_type, "ChIP-Seq", db_conn),
        index_type_id: id_by_name!(index_type, "TruSeq Dual", db_conn),
    };

    let admin_id = researcher::table
        .filter(researcher::email.eq(ADMIN_EMAIL))
        .select(researcher::id)
        .first(&mut db_conn)
        .await
        .unwrap();

    let cost_unit_id = id_by_name!(cost_unit, "CU-1001", db_conn);

    let created = NewResearcher {
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: "+1 555 0100".to_string(),
        organization_id: None,
        pi_id: None,
        is_staff: false,
        cost_unit_ids: vec![cost_unit_id],
    }
    .write(&mut db_conn)
    .await
    .unwrap();

    Seeded {
        db_conn,
        refs,
        admin: Caller {
            researcher_id: admin_id,
            is_staff: true,
        },
        researcher: Caller {
            researcher_id: created.researcher.id,
            is_staff: false,
        },
    }
}

/// A valid sample payload without a barcode, so one gets assigned.
pub fn new_sample_payload(refs: &CatalogRefs, i: usize) -> Value {
    json!({
        "name": format!("sample{i}"),
        "nucleic_acid_type": "RNA",
        "organism_id": refs.organism_id,
        "read_length_id": refs.read_length_id,
        "concentration": 12.5,
        "concentration_method_id": refs.concentration_method_id,
        "sequencing_depth": 10
    })
}

/// A valid library payload without a barcode, so one gets assigned.
pub fn new_library_payload(refs: &CatalogRefs, i: usize) -> Value {
    json!({
        "name": format!("library{i}"),
        "library_protocol_id": refs.library_protocol_id,
        "library_type_id": refs.library_type_id,
        "organism_id": refs.organism_id,
        "read_length_id": refs.read_length_id,
        "index_type_id": refs.index_type_id,
        "index_i7": "ATTACTCG",
        "index_i5": "TATAGCCT",
        "mean_fragment_size": 350,
        "sequencing_depth": 20
    })
}
