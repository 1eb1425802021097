use deepseq_core::model::record::{BatchOutcome, FieldError, RecordSummary, RecordType};
use garde::Validate;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{DbConnection, Write, error};

/// Collects a `FieldError` for every present id that has no row in its table.
macro_rules! missing_references {
    ($db_conn:expr, [$(($field:literal, $table:ident, $id:expr)),* $(,)?]) => {{
        let mut errors = Vec::new();
        $(
            if let Some(id) = $id {
                if !$crate::row_exists!($table, id, &mut *$db_conn).await? {
                    let table = stringify!($table).replace('_', " ");
                    errors.push(FieldError::new($field, format!("{table} {id} does not exist")));
                }
            }
        )*
        errors
    }};
}

pub mod library;
pub mod sample;

/// A sample or a library as stored.
pub trait Record {
    const RECORD_TYPE: RecordType;

    fn summary(&self) -> RecordSummary;
}

/// Foreign keys are checked per payload so that one bad reference rejects one row instead
/// of failing the whole batch.
pub trait CheckReferences {
    fn check_references(
        &self,
        db_conn: &mut DbConnection,
    ) -> impl Future<Output = error::Result<Vec<FieldError>>> + Send;
}

/// Deserializes, validates and reference-checks every payload on its own, then persists the
/// ones that passed. Payloads that fail at any stage are recorded as rejected along with
/// their position in the batch.
///
/// # Errors
/// Only errors that aren't attributable to a single payload (connection loss, for example)
/// fail the whole batch.
pub async fn reconcile<Payload>(
    payloads: Vec<Value>,
    db_conn: &mut DbConnection,
) -> error::Result<BatchOutcome<RecordSummary>>
where
    Payload: DeserializeOwned + Validate<Context = ()> + CheckReferences + Write + Send,
    Payload::Returns: Record,
{
    let mut outcome = BatchOutcome::default();
    let mut valid = Vec::with_capacity(payloads.len());

    for (index, payload) in payloads.into_iter().enumerate() {
        let payload: Payload = match serde_json::from_value(payload) {
            Ok(payload) => payload,
            Err(err) => {
                outcome.reject(index, vec![FieldError::from_deserialization(&err)]);
                continue;
            }
        };

        if let Err(report) = payload.validate() {
            outcome.reject(index, FieldError::from_report(&report));
            continue;
        }

        let missing = payload.check_references(db_conn).await?;
        if !missing.is_empty() {
            outcome.reject(index, missing);
            continue;
        }

        valid.push((index, payload));
    }

    for (index, payload) in valid {
        match payload.write(db_conn).await {
            Ok(record) => outcome.accepted.push(record.summary()),
            Err(
                err @ (error::Error::DuplicateRecord { .. }
                | error::Error::ReferenceNotFound { .. }),
            ) => {
                outcome.reject(index, vec![FieldError::new("", err)]);
            }
            Err(err) => return Err(err),
        }
    }

    for rejected in &outcome.rejected {
        tracing::debug!(
            index = rejected.index,
            errors = ?rejected.errors,
            "rejected {} payload",
            <Payload::Returns as Record>::RECORD_TYPE.display_name()
        );
    }

    Ok(outcome)
}
