#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid {0} id")]
    InvalidKey(&'static str),

    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Blob(#[from] opendal::Error),
}

/// Decode an external id string into a store key.
pub fn parse_id(kind: &'static str, raw: &str) -> Result<uuid::Uuid, BillingError> {
    raw.trim()
        .parse()
        .map_err(|_| BillingError::InvalidKey(kind))
}
