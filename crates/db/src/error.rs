use storefront_core::EntityKind;

/// PostgreSQL SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Errors raised by a [`DocumentStore`](crate::store::DocumentStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A second live document would share a natural key (or id).
    #[error("{kind} already exists with key '{key}'")]
    AlreadyExists { kind: EntityKind, key: String },

    /// The composite key of a link record is already present.
    #[error("Link already exists: {0}")]
    DuplicateLink(String),

    #[error("{kind} with id {id} not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Whether the error only reports state that is already in place.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. } | Self::DuplicateLink(_))
    }
}

/// True when `err` is a PostgreSQL unique constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_already_exists() {
        let err = StoreError::AlreadyExists {
            kind: EntityKind::Region,
            key: "Pakistan".into(),
        };
        assert!(err.is_already_exists());
        assert!(StoreError::DuplicateLink("a <-> b".into()).is_already_exists());
        assert!(!StoreError::Malformed("x".into()).is_already_exists());
    }

    #[test]
    fn row_not_found_is_not_a_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn display_includes_kind_and_key() {
        let err = StoreError::AlreadyExists {
            kind: EntityKind::SalesChannel,
            key: "Default Sales Channel".into(),
        };
        assert_eq!(
            err.to_string(),
            "sales_channel already exists with key 'Default Sales Channel'"
        );
    }
}
