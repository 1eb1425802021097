use diesel::result::DatabaseErrorInformation;
use diesel_async::pooled_connection::deadpool;
use regex::Regex;
use serde::Serialize;

#[derive(thiserror::Error, Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Error {
    #[error("{entity} with this {} already exists", field.clone().unwrap_or_else(|| "value".to_string()))]
    DuplicateRecord {
        entity: String,
        field: Option<String>,
    },
    #[error("{entity} references {referenced_entity} {} which does not exist", value.clone().unwrap_or_default())]
    ReferenceNotFound {
        entity: String,
        referenced_entity: String,
        value: Option<String>,
    },
    #[error("{entity} cannot be deleted while it still has {referencing_entity} records")]
    StillReferenced {
        entity: String,
        referencing_entity: String,
    },
    #[error("record not found")]
    RecordNotFound,
    #[error("{message}")]
    Other { message: String },
}

impl Error {
    pub(crate) fn from_other_error(err: impl std::fmt::Debug) -> Self {
        Self::Other {
            message: format!("{err:?}"),
        }
    }
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::Error::{DatabaseError, NotFound};
        match err {
            DatabaseError(kind, info) => Self::from((kind, info)),
            NotFound => Self::RecordNotFound,
            _ => Self::from_other_error(err),
        }
    }
}

impl From<deadpool::PoolError> for Error {
    fn from(err: deadpool::PoolError) -> Self {
        Self::from_other_error(err)
    }
}

impl From<diesel::ConnectionError> for Error {
    fn from(err: diesel::ConnectionError) -> Self {
        Self::from_other_error(err)
    }
}

impl
    From<(
        diesel::result::DatabaseErrorKind,
        Box<dyn DatabaseErrorInformation + Send + Sync>,
    )> for Error
{
    fn from(
        (kind, info): (
            diesel::result::DatabaseErrorKind,
            Box<dyn DatabaseErrorInformation + Send + Sync>,
        ),
    ) -> Self {
        use diesel::result::DatabaseErrorKind::{ForeignKeyViolation, UniqueViolation};

        // SQLite reports neither table nor details, only a message such as
        // "UNIQUE constraint failed: organism.name"
        let message = info.message();

        match kind {
            UniqueViolation => {
                let (entity, field) = unique_violation_columns(message).unwrap_or_default();

                Self::DuplicateRecord {
                    entity,
                    field: (!field.is_empty()).then_some(field),
                }
            }
            ForeignKeyViolation => Self::ReferenceNotFound {
                entity: info.table_name().unwrap_or_default().to_string(),
                referenced_entity: String::new(),
                value: None,
            },
            _ => Self::from_other_error(diesel::result::Error::DatabaseError(kind, info)),
        }
    }
}

fn unique_violation_columns(message: &str) -> Option<(String, String)> {
    let regex = Regex::new(r"UNIQUE constraint failed: (\w+)\.(\w+)").ok()?;
    let captures = regex.captures(message)?;

    Some((captures[1].to_string(), captures[2].to_string()))
}

pub type Result<T> = std::result::Result<T, Error>;
