use storefront_db::StoreError;

/// Failures that abort a script.
///
/// Workflow failures never surface here: scripts log them and carry on.
/// Only reader and store failures, which leave the script unable to tell
/// what state it is in, are returned.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Unknown script '{0}'")]
    UnknownScript(String),
}

pub type ScriptResult<T> = Result<T, ScriptError>;
