/// Convenience result type used across countframe.
pub type CountframeResult<T> = Result<T, CountframeError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Cancellation is deliberately absent: a cancelled export is reported through
/// [`crate::ExportOutcome::Cancelled`], not as an error.
#[derive(thiserror::Error, Debug)]
pub enum CountframeError {
    /// Invalid or unsupported job configuration. Raised before any frame is generated.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The rendering surface is unavailable or was lost mid-job.
    #[error("render error: {0}")]
    Render(String),

    /// The video encoder rejected its start or failed while encoding.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CountframeError {
    /// Build a [`CountframeError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`CountframeError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`CountframeError::Encoding`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Build a [`CountframeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
