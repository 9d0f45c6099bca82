//! Database error types.

use derive_more::{Display, Error};
use diesel::result::DatabaseErrorKind;

/// Error returned by catalog persistence operations.
///
/// The taxonomy keeps constraint violations, missing rows, and transport
/// failures distinct so callers can react to each without parsing messages.
#[derive(Debug, Clone, Display, Error, PartialEq, Eq)]
pub enum DbError {
    /// A write violated a database constraint.
    ///
    /// For foreign keys, `constraint` is the deterministic name from
    /// [`crate::fk_constraint_name`], so the offending (table, column,
    /// referenced table) triple can be read straight out of the error.
    #[display("constraint violation: {constraint}")]
    ConstraintViolation {
        /// Name of the violated constraint.
        constraint: String,
    },

    /// An update or delete targeted a row that does not exist.
    ///
    /// Fetch-by-id of a missing row is `Ok(None)`, not this error.
    #[display("no row in '{table}' with key {key}")]
    NotFound {
        /// Table the missing row belongs to.
        table: &'static str,
        /// Primary key that was targeted, rendered as text so composite
        /// keys (the association table) fit too.
        key: String,
    },

    /// Connecting to the store failed. Propagated untouched, never retried.
    #[display("connection failure: {message}")]
    Connection {
        /// Underlying connection error message.
        message: String,
    },

    /// Any other error reported by the store.
    #[display("database error: {message}")]
    Query {
        /// Underlying error message.
        message: String,
    },
}

impl DbError {
    /// Constraint violation carrying the violated constraint's name.
    pub fn constraint(name: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            constraint: name.into(),
        }
    }

    /// Missing-row error for an update or delete against `table`.
    pub fn not_found(table: &'static str, id: i32) -> Self {
        Self::NotFound {
            table,
            key: id.to_string(),
        }
    }
}

impl From<diesel::result::Error> for DbError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation | DatabaseErrorKind::UniqueViolation,
                info,
            ) => {
                // SQLite reports no constraint name; the repository refines
                // this with the deterministic name where it can.
                let constraint = info
                    .constraint_name()
                    .unwrap_or_else(|| info.message())
                    .to_string();
                Self::ConstraintViolation { constraint }
            }
            other => Self::Query {
                message: other.to_string(),
            },
        }
    }
}

impl From<diesel::ConnectionError> for DbError {
    fn from(err: diesel::ConnectionError) -> Self {
        Self::Connection {
            message: err.to_string(),
        }
    }
}
