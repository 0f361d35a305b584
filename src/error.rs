//! Error types for the chapter pipeline

/// Result type for pipeline and state operations
pub type Result<T> = std::result::Result<T, ChapterError>;

/// Failures that reach the caller of the pipeline.
///
/// The merge engine itself never fails; these come from collaborators and
/// persistence.
#[derive(thiserror::Error, Debug)]
pub enum ChapterError {
    #[error("Skip segment fetch failed for {video_id}: {message}")]
    Fetch { video_id: String, message: String },

    #[error("Metadata unavailable for {video_id}: {message}")]
    Metadata { video_id: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ChapterError {
    pub fn fetch(video_id: &str, message: impl ToString) -> Self {
        Self::Fetch {
            video_id: video_id.to_string(),
            message: message.to_string(),
        }
    }

    pub fn metadata(video_id: &str, message: impl ToString) -> Self {
        Self::Metadata {
            video_id: video_id.to_string(),
            message: message.to_string(),
        }
    }

    /// Collaborator failures that leave persisted chapters untouched
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Metadata { .. })
    }
}
