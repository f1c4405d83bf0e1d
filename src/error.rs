use thiserror::Error;

pub type DashboardResult<T> = Result<T, DashboardError>;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid month: {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("{0}")]
    Other(String),
}

impl DashboardError {
    pub fn other(message: impl Into<String>) -> Self {
        DashboardError::Other(message.into())
    }
}
