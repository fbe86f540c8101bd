use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("No database connection available: {0}")]
    PoolError(#[from] deadpool_postgres::PoolError),

    #[error("{}", describe_pg_error(.0))]
    PostgresError(#[from] tokio_postgres::Error),

    #[error("Failed to build the connection pool: {0}")]
    BuildError(#[from] deadpool_postgres::BuildError),

    #[error("Migration {name} failed: {}", describe_pg_error(.source))]
    MigrationError {
        name: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid database URL: {0}")]
    InvalidConnectionString(String),

    #[error("Invalid value in {table}.{column}: {message}")]
    InvalidRow {
        table: &'static str,
        column: &'static str,
        message: String,
    },
}

/// One-line rendering of a server error, naming the table, column and
/// constraint involved so a rejected row can be traced to its writer.
fn describe_pg_error(e: &tokio_postgres::Error) -> String {
    let Some(db_err) = e.as_db_error() else {
        return format!("PostgreSQL error: {}", e);
    };

    let mut parts = vec![format!(
        "PostgreSQL error [{}]: {}",
        db_err.code().code(),
        db_err.message()
    )];
    match (db_err.table(), db_err.column()) {
        (Some(table), Some(column)) => parts.push(format!("at {}.{}", table, column)),
        (Some(table), None) => parts.push(format!("in {}", table)),
        _ => {}
    }
    if let Some(constraint) = db_err.constraint() {
        parts.push(format!("constraint {}", constraint));
    }
    if let Some(detail) = db_err.detail() {
        parts.push(detail.to_string());
    }
    parts.join("; ")
}
