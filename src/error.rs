use thiserror::Error;

/// Errors surfaced by the dashboard core.
///
/// Per-row and per-cell normalization never produces one of these; bad
/// values degrade to `None`/`0.0` instead.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Source '{name}' could not be read: {reason}")]
    SourceUnreadable { name: String, reason: String },

    #[error("No valid spreadsheet files were found in {location}")]
    NoDataAvailable { location: String },

    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("User '{0}' already exists")]
    DuplicateUser(String),

    #[error("User '{0}' does not exist")]
    UnknownUser(String),

    #[error("User '{0}' cannot delete their own account")]
    CannotDeleteSelf(String),

    #[error("Invalid username or password")]
    AuthenticationFailed,

    #[error("User '{0}' is not allowed to perform this action")]
    NotAuthorized(String),

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Username must not be empty")]
    EmptyUsername,

    #[error("Unknown permission '{0}'")]
    UnknownPermission(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DashboardResult<T> = Result<T, DashboardError>;
