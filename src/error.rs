//! Error type shared by every studio operation.

use std::time::Duration;

use crate::gemini::{RetryError, Transient, UpstreamError, UpstreamErrorKind};

/// Hint shown when no credential could complete a call.
pub const MISSING_CREDENTIAL_HINT: &str = "no valid credential; supply one";

/// Errors that can occur during studio operations.
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("{label} failed after {attempts} attempts: {last}")]
    RetryExhausted {
        label: String,
        attempts: u32,
        #[source]
        last: Box<StudioError>,
    },

    /// Rotation found no credential or every candidate failed.
    #[error("{hint}")]
    CredentialExhausted {
        /// User-facing, actionable message.
        hint: String,
        /// Number of candidates that were tried.
        tried: usize,
        /// The last failure was an explicit key rejection.
        rejected: bool,
        #[source]
        last: Option<Box<StudioError>>,
    },

    /// An image or speech call produced no payload (e.g. safety filter).
    #[error("No payload returned: {0}")]
    EmptyGeneration(String),

    #[error("No audio data")]
    NoAudioData,

    /// The video job reported an embedded failure.
    #[error("Video generation failed: {0}")]
    JobFailed(String),

    #[error("Video download failed with status {status}")]
    VideoDownloadFailed { status: u16 },

    #[error("Video generation did not finish within {0:?}")]
    PollTimeout(Duration),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Empty prompt")]
    EmptyPrompt,

    #[error("Invalid media: {0}")]
    InvalidMedia(String),

    #[error("Audio encoding failed: {0}")]
    Audio(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StudioError {
    /// The provider explicitly refused the key.
    pub fn is_rejected_credential(&self) -> bool {
        match self {
            StudioError::Upstream(e) => e.kind == UpstreamErrorKind::RejectedCredential,
            StudioError::RetryExhausted { last, .. } => last.is_rejected_credential(),
            _ => false,
        }
    }

    /// The upstream error underneath, if any.
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            StudioError::Upstream(e) => Some(e),
            StudioError::RetryExhausted { last, .. } => last.upstream(),
            StudioError::CredentialExhausted { last, .. } => {
                last.as_deref().and_then(StudioError::upstream)
            }
            _ => None,
        }
    }
}

impl Transient for StudioError {
    fn is_transient(&self) -> bool {
        matches!(self, StudioError::Upstream(e) if e.is_transient())
    }
}

impl From<RetryError<StudioError>> for StudioError {
    fn from(error: RetryError<StudioError>) -> Self {
        match error {
            RetryError::Exhausted {
                label,
                attempts,
                last,
            } => StudioError::RetryExhausted {
                label,
                attempts,
                last: Box::new(last),
            },
            RetryError::Fatal(e) => e,
        }
    }
}
