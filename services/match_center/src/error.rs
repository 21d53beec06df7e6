#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Fixture {0} not found")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CSV parse error: {0}")]
    CsvParse(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("No live match in progress")]
    NoActiveSession,
    #[error("Fixture {0} is not upcoming")]
    NotUpcoming(String),
    #[error("Player {0} is not in the squad")]
    UnknownPlayer(String),
    #[error("Provide either a player or a shirt number, not both")]
    ConflictingAttribution,
    #[error("{0}")]
    MismatchedAttribution(String),
    #[error("Invalid score: {0}")]
    InvalidScore(String),
    #[error("Unknown squad: {0}")]
    UnknownSquad(String),
    #[error("Match has already been finalized")]
    Finalized,
    #[error("Fixture {0} is being tracked live")]
    FixtureLive(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MatchError {
    /// Whether the same request can succeed later without changing it.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MatchError::Store(StoreError::Database(_)) | MatchError::Store(StoreError::Unavailable(_))
        )
    }
}
