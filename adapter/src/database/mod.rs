use shared::{
    config::DatabaseConfig,
    error::{AppError, AppResult},
};
use sqlx::{postgres::PgConnectOptions, PgPool};

pub mod model;

// PostgreSQL の SQLSTATE
const EXCLUSION_VIOLATION: &str = "23P01";
const SERIALIZATION_FAILURE: &str = "40001";

fn make_pg_connect_options(cfg: &DatabaseConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.username)
        .password(&cfg.password)
        .database(&cfg.database)
}

#[derive(Clone)]
pub struct ConnectionPool(PgPool);

impl ConnectionPool {
    pub fn new(pool: PgPool) -> Self {
        Self(pool)
    }

    pub fn inner_ref(&self) -> &PgPool {
        &self.0
    }

    pub async fn begin(&self) -> AppResult<sqlx::Transaction<'_, sqlx::Postgres>> {
        self.0.begin().await.map_err(AppError::TransactionError)
    }

    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations")
            .run(self.inner_ref())
            .await
            .map_err(|e| AppError::SpecificOperationError(e.into()))
    }
}

pub fn connect_database_with(cfg: &DatabaseConfig) -> ConnectionPool {
    ConnectionPool(PgPool::connect_lazy_with(make_pg_connect_options(cfg)))
}

/// Maps a failed write onto the reservation error taxonomy.
/// The exclusion constraint on `reservations` fires when a concurrent commit
/// slipped an overlapping interval in after our conflict check.
pub(crate) fn map_write_error(err: sqlx::Error, overlap_message: impl FnOnce() -> String) -> AppError {
    let code = err
        .as_database_error()
        .and_then(|e| e.code())
        .map(|c| c.into_owned());
    classify(code.as_deref(), err, overlap_message)
}

fn classify(
    code: Option<&str>,
    err: sqlx::Error,
    overlap_message: impl FnOnce() -> String,
) -> AppError {
    match code {
        Some(EXCLUSION_VIOLATION) => AppError::Overlap(overlap_message()),
        Some(SERIALIZATION_FAILURE) => AppError::ConcurrencyConflict(
            "the reservation was modified concurrently; retry the request".into(),
        ),
        _ => AppError::SpecificOperationError(err),
    }
}
