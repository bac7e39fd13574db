//! Shared Diesel error mapping for the graph store and account repository.
//!
//! Both adapters report the same two failure classes: the database could not
//! be reached (`connection`) or a statement failed (`query`). Messages are
//! kept generic; the underlying Diesel error is logged at `debug`.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Map pool errors into a port-specific connection error constructor.
pub(crate) fn map_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    connection(message)
}

/// Map Diesel errors into query or connection constructors.
///
/// `operation` names the failing statement in the returned message.
pub(crate) fn map_diesel_error<E, Q, C>(
    error: &DieselError,
    operation: &str,
    query: Q,
    connection: C,
) -> E
where
    Q: FnOnce(String) -> E,
    C: FnOnce(String) -> E,
{
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), operation, "diesel operation failed");
        }
        _ => debug!(%error, operation, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
        | DieselError::BrokenTransactionManager => {
            connection(format!("{operation}: database connection error"))
        }
        DieselError::NotFound => query(format!("{operation}: record not found")),
        _ => query(format!("{operation}: database error")),
    }
}

/// Whether the error is a unique constraint violation on `constraint`.
pub(crate) fn is_unique_violation(error: &DieselError, constraint: &str) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
            if info.constraint_name() == Some(constraint)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug, PartialEq, Eq)]
    enum Mapped {
        Query(String),
        Connection(String),
    }

    fn map(error: &DieselError) -> Mapped {
        map_diesel_error(error, "apply batch", Mapped::Query, Mapped::Connection)
    }

    #[rstest]
    fn closed_connections_map_to_connection_errors() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection,
            Box::new("server closed the connection".to_owned()),
        );
        assert_eq!(
            map(&error),
            Mapped::Connection("apply batch: database connection error".to_owned())
        );
    }

    #[rstest]
    #[case(DieselError::NotFound, "apply batch: record not found")]
    #[case(DieselError::RollbackTransaction, "apply batch: database error")]
    fn other_failures_map_to_query_errors(#[case] error: DieselError, #[case] expected: &str) {
        assert_eq!(map(&error), Mapped::Query(expected.to_owned()));
    }

    #[rstest]
    fn pool_errors_keep_their_message() {
        let mapped = map_pool_error(PoolError::checkout("timed out"), Mapped::Connection);
        assert_eq!(mapped, Mapped::Connection("timed out".to_owned()));
    }

    #[rstest]
    fn unique_violation_requires_a_database_error() {
        assert!(!is_unique_violation(&DieselError::NotFound, "users_user_name_key"));
    }
}
