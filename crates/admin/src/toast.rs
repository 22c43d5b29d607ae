use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastVariant {
    Success,
    Error,
}

/// A transient notification shown after a widget action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub variant: ToastVariant,
    pub title: String,
    pub description: String,
}

impl Toast {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Error,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.variant == ToastVariant::Error
    }
}
