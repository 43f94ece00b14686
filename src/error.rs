use thiserror::Error;

/// Main error type for the storyframe library
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Encoding failed: {0}")]
    Encoding(#[from] EncodeError),

    #[error("Partial render: {rendered} of {expected} frames materialized")]
    PartialRender { expected: u64, rendered: u64 },

    #[error("Export already in progress for project '{0}'")]
    Busy(String),

    #[error("Export cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Audio error: {0}")]
    Audio(#[from] hound::Error),
}

/// Failures reported by the video encoding collaborator
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("encoder not installed")]
    NotInstalled,

    #[error("encoder exited with status {status}: {diagnostic}")]
    Failed { status: i32, diagnostic: String },

    #[error("encoder timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("encoder IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::InputValidation(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    /// Name of the error class reported to callers in failure responses
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InputValidation(_) => "InputValidationError",
            Self::NotFound(_) => "NotFoundError",
            Self::Encoding(_) => "EncodingError",
            Self::PartialRender { .. } => "PartialRenderError",
            Self::Busy(_) => "ExportBusyError",
            Self::Cancelled => "CancelledError",
            Self::Io(_) | Self::Image(_) | Self::Json(_) | Self::Audio(_) => "InternalError",
        }
    }

    /// Short reason recorded on a failed export job
    pub fn failure_reason(&self) -> String {
        match self {
            Self::Encoding(EncodeError::NotInstalled) => "encoder not installed".to_string(),
            Self::Encoding(EncodeError::Failed { diagnostic, .. }) => diagnostic.clone(),
            Self::Encoding(EncodeError::Timeout { secs }) => format!("encoder timeout ({secs}s)"),
            Self::PartialRender { .. } => "partial render".to_string(),
            Self::Cancelled => "cancelled".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::not_found("x").kind(), "NotFoundError");
        assert_eq!(Error::validation("x").kind(), "InputValidationError");
        assert_eq!(
            Error::from(EncodeError::NotInstalled).kind(),
            "EncodingError"
        );
        assert_eq!(
            Error::PartialRender {
                expected: 10,
                rendered: 9
            }
            .kind(),
            "PartialRenderError"
        );
    }

    #[test]
    fn test_failure_reasons() {
        assert_eq!(
            Error::from(EncodeError::NotInstalled).failure_reason(),
            "encoder not installed"
        );
        let err = Error::from(EncodeError::Failed {
            status: 1,
            diagnostic: "Invalid data found when processing input".into(),
        });
        assert_eq!(
            err.failure_reason(),
            "Invalid data found when processing input"
        );
        assert_eq!(
            Error::PartialRender {
                expected: 3,
                rendered: 1
            }
            .failure_reason(),
            "partial render"
        );
    }
}
