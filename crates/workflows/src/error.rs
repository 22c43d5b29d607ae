use storefront_core::CoreError;
use storefront_db::StoreError;

/// Failure of a workflow run.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The input did not pass its `validator` rules.
    #[error("Invalid input for {workflow}: {errors}")]
    InvalidInput {
        workflow: &'static str,
        errors: validator::ValidationErrors,
    },

    /// A domain rule rejected the input (not found, conflict, ...).
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl WorkflowError {
    /// Whether the failure only reports that the target state already
    /// exists. Re-running a provisioning script hits this case.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::Core(e) => e.is_already_exists(),
            Self::Store(e) => e.is_already_exists(),
            Self::InvalidInput { .. } => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Core(CoreError::NotFound { .. }) | Self::Store(StoreError::NotFound { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use storefront_core::EntityKind;

    use super::*;

    #[test]
    fn store_duplicates_are_already_exists() {
        let err = WorkflowError::from(StoreError::AlreadyExists {
            kind: EntityKind::Region,
            key: "Pakistan".into(),
        });
        assert!(err.is_already_exists());
        assert!(!err.is_not_found());
    }

    #[test]
    fn conflicts_are_not_already_exists() {
        let err = WorkflowError::from(CoreError::Conflict("pk".into()));
        assert!(!err.is_already_exists());
        assert_eq!(err.to_string(), "Conflict: pk");
    }

    #[test]
    fn not_found_from_either_layer() {
        assert!(WorkflowError::from(CoreError::not_found("service_zone", "serzo_1")).is_not_found());
        assert!(WorkflowError::from(StoreError::NotFound {
            kind: EntityKind::Store,
            id: "store_1".into(),
        })
        .is_not_found());
    }
}
