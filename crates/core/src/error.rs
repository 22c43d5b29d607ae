/// Domain-level error shared by every storefront crate.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Entity already exists: {entity} with key {key}")]
    AlreadyExists { entity: &'static str, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl CoreError {
    /// Shorthand for [`CoreError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Whether this error only reports state that is already in place.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_found() {
        let err = CoreError::not_found("region", "reg_1");
        assert_eq!(err.to_string(), "Entity not found: region with id reg_1");
    }

    #[test]
    fn already_exists_is_distinguished() {
        let err = CoreError::AlreadyExists {
            entity: "sales_channel",
            key: "Default Sales Channel".into(),
        };
        assert!(err.is_already_exists());
        assert!(!CoreError::Conflict("pk".into()).is_already_exists());
    }
}
