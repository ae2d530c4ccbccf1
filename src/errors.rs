/*!
 * Error types for the subburn application.
 *
 * This module contains custom error types for the different layers of the
 * pipeline, using the thiserror crate for ergonomic error definitions:
 * - `ProviderError`: failures talking to external collaborators
 * - `MediaError`: failures of the ffmpeg/ffprobe toolchain
 * - `AdmissionError`: size/duration ceilings
 * - `JobError`: the terminal, job-scoped taxonomy surfaced to the user
 */

use thiserror::Error;

/// Errors that can occur when calling a collaborator (speech, translation, delivery)
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The call did not complete within its time budget
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::RequestFailed(format!("timed out: {}", error))
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised by the external media toolchain
#[derive(Error, Debug)]
pub enum MediaError {
    /// ffmpeg or ffprobe is not installed
    #[error("{0} was not found on PATH")]
    ToolMissing(&'static str),

    /// The process could not be started
    #[error("failed to start {tool}: {message}")]
    Spawn { tool: &'static str, message: String },

    /// The process exceeded its time budget
    #[error("{tool} timed out after {secs} seconds")]
    Timeout { tool: &'static str, secs: u64 },

    /// The process exited unsuccessfully
    #[error("{tool} failed: {stderr}")]
    Failed { tool: &'static str, stderr: String },

    /// Probe output could not be understood
    #[error("invalid media: {0}")]
    InvalidMedia(String),

    /// Filesystem error around a media artifact
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Size and duration ceilings enforced before expensive work starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdmissionError {
    #[error("video is {size_bytes} bytes, limit is {limit_bytes} bytes")]
    TooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("video is {duration_secs:.1} seconds long, limit is {limit_secs} seconds")]
    TooLong { duration_secs: f64, limit_secs: u64 },
}

/// Coarse classification of a job failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobErrorKind {
    Admission,
    Extraction,
    Transcription,
    Translation,
    Encode,
    Delivery,
    Cancelled,
    Unexpected,
}

/// Terminal, job-scoped failure. None of these ever crash the host process.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("admission rejected: {0}")]
    Admission(#[from] AdmissionError),

    #[error("audio extraction failed: {0}")]
    Extraction(String),

    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("translation failed: {0}")]
    Translation(String),

    #[error("encoding failed: {0}")]
    Encode(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("job was cancelled")]
    Cancelled,

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl JobError {
    pub fn kind(&self) -> JobErrorKind {
        match self {
            Self::Admission(_) => JobErrorKind::Admission,
            Self::Extraction(_) => JobErrorKind::Extraction,
            Self::Transcription(_) => JobErrorKind::Transcription,
            Self::Translation(_) => JobErrorKind::Translation,
            Self::Encode(_) => JobErrorKind::Encode,
            Self::Delivery(_) => JobErrorKind::Delivery,
            Self::Cancelled => JobErrorKind::Cancelled,
            Self::Unexpected(_) => JobErrorKind::Unexpected,
        }
    }

    /// One line suitable for showing to the person who submitted the video
    pub fn user_message(&self) -> String {
        match self {
            Self::Admission(AdmissionError::TooLarge { limit_bytes, .. }) => format!(
                "❌ The video is too large! Maximum {}MB",
                limit_bytes / (1024 * 1024)
            ),
            Self::Admission(AdmissionError::TooLong { limit_secs, .. }) => {
                if limit_secs % 60 == 0 {
                    format!("❌ The video is too long! Maximum {} minutes", limit_secs / 60)
                } else {
                    format!("❌ The video is too long! Maximum {} seconds", limit_secs)
                }
            }
            Self::Extraction(_) => "❌ Could not read the audio of this video".to_string(),
            Self::Transcription(reason) => format!("❌ {}", reason),
            Self::Translation(reason) => format!("❌ {}", reason),
            Self::Encode(_) => "❌ Failed to render the subtitled video".to_string(),
            Self::Delivery(_) => "❌ Failed to send the subtitled video".to_string(),
            Self::Cancelled => "🛑 Processing was cancelled".to_string(),
            Self::Unexpected(message) => format!("❌ Error: {}", message),
        }
    }
}
