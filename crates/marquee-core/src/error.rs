//! Error types for Marquee Core

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for catalog and playback operations
pub type Result<T> = std::result::Result<T, Error>;

/// Media error codes surfaced by the playback element and format plugins.
///
/// Codes 1-4 follow the native media element numbering; 99 is reserved for
/// DRM failures raised by content-protection plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaErrorCode {
    Aborted,
    Network,
    Decode,
    SrcNotSupported,
    Drm,
}

impl MediaErrorCode {
    /// Numeric code as exposed by the native element
    pub fn as_u16(&self) -> u16 {
        match self {
            MediaErrorCode::Aborted => 1,
            MediaErrorCode::Network => 2,
            MediaErrorCode::Decode => 3,
            MediaErrorCode::SrcNotSupported => 4,
            MediaErrorCode::Drm => 99,
        }
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1 => Some(MediaErrorCode::Aborted),
            2 => Some(MediaErrorCode::Network),
            3 => Some(MediaErrorCode::Decode),
            4 => Some(MediaErrorCode::SrcNotSupported),
            99 => Some(MediaErrorCode::Drm),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            MediaErrorCode::Aborted => "MEDIA_ERR_ABORTED",
            MediaErrorCode::Network => "MEDIA_ERR_NETWORK",
            MediaErrorCode::Decode => "MEDIA_ERR_DECODE",
            MediaErrorCode::SrcNotSupported => "MEDIA_ERR_SRC_NOT_SUPPORTED",
            MediaErrorCode::Drm => "MEDIA_ERR_DRM",
        }
    }
}

impl fmt::Display for MediaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Catalog and playback error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Descriptor / validation errors
    #[error("Invalid descriptor type: expected {expected}, found {found}")]
    InvalidType { expected: String, found: String },

    #[error("Representation has no src")]
    MissingSrc,

    #[error("Variant has no playable representations")]
    EmptyRepresentations,

    #[error("Media item has no playable variants")]
    EmptyVariants,

    #[error("Stream not found: {src}")]
    StreamNotFound { src: String },

    #[error("Stream not playable: {src}")]
    StreamNotPlayable { src: String },

    #[error("Descriptor request failed with HTTP {status}: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to parse descriptor: {0}")]
    DescriptorParse(String),

    #[error("No playable media in descriptor")]
    NoMedia,

    // Playback errors
    #[error("Playback error {code}: {message}")]
    Media { code: MediaErrorCode, message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Playback not allowed without user interaction")]
    PlayNotAllowed,

    #[error("Plugin error ({plugin}): {message}")]
    Plugin { plugin: String, message: String },

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Connection timeout")]
    ConnectionTimeout,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Error::ConnectionTimeout;
        }
        match (err.status(), err.url()) {
            (Some(status), Some(url)) => Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            },
            _ => Error::Network(err.to_string()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::DescriptorParse(err.to_string())
    }
}

impl Error {
    /// Create a playback error
    pub fn media(code: MediaErrorCode, message: impl Into<String>) -> Self {
        Error::Media {
            code,
            message: message.into(),
        }
    }

    /// Create a DRM error
    pub fn drm(msg: impl Into<String>) -> Self {
        Error::media(MediaErrorCode::Drm, msg)
    }

    pub(crate) fn invalid_type(expected: &str, found: &serde_json::Value) -> Self {
        Error::InvalidType {
            expected: expected.to_string(),
            found: json_type_name(found).to_string(),
        }
    }

    /// Returns true if this error was produced by cancelling a task
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Returns true for descriptor/validation errors raised while parsing
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidType { .. }
                | Error::MissingSrc
                | Error::EmptyRepresentations
                | Error::EmptyVariants
                | Error::StreamNotFound { .. }
                | Error::StreamNotPlayable { .. }
                | Error::HttpStatus { .. }
                | Error::DescriptorParse(_)
                | Error::NoMedia
        )
    }

    /// Returns the media error code for playback errors
    pub fn media_code(&self) -> Option<MediaErrorCode> {
        match self {
            Error::Media { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Network(_)
                | Error::ConnectionTimeout
                | Error::Media {
                    code: MediaErrorCode::Network,
                    ..
                }
        ) || matches!(self, Error::HttpStatus { status, .. } if *status >= 500)
    }

    /// Returns the stable error code published with `data/error` and `media/error`
    pub fn error_code(&self) -> String {
        let code = match self {
            Error::InvalidType { .. } => "INVALID_TYPE",
            Error::MissingSrc => "MISSING_SRC",
            Error::EmptyRepresentations => "EMPTY_REPRESENTATIONS",
            Error::EmptyVariants => "EMPTY_VARIANTS",
            Error::StreamNotFound { .. } => "STREAM_NOT_FOUND",
            Error::StreamNotPlayable { .. } => "STREAM_NOT_PLAYABLE",
            Error::HttpStatus { status, .. } => return format!("HTTP_{}", status),
            Error::DescriptorParse(_) => "DESCRIPTOR_PARSE",
            Error::NoMedia => "NO_MEDIA",
            Error::Media { code, .. } => code.as_str(),
            Error::Cancelled => "CANCELLED",
            Error::PlayNotAllowed => "PLAY_NOT_ALLOWED",
            Error::Plugin { .. } => "PLUGIN",
            Error::Network(_) => "NETWORK",
            Error::ConnectionTimeout => "TIMEOUT",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Internal(_) => "INTERNAL",
            Error::Io(_) => "IO",
        };
        code.to_string()
    }
}

pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
