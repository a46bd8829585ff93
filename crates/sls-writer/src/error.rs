// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// Why the SLS writer refused to start.
///
/// All of these collapse into [`SlsError::Disabled`]; callers are expected to fall back
/// to a local sink rather than distinguish between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisabledReason {
    /// No configuration section was supplied at all.
    MissingSection,
    /// `disabled = true`.
    ExplicitlyDisabled,
    /// A required field is absent or blank.
    MissingField(&'static str),
}

impl fmt::Display for DisabledReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSection => write!(f, "no configuration section"),
            Self::ExplicitlyDisabled => write!(f, "disabled by configuration"),
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
        }
    }
}

/// Construction-time errors.
#[derive(Debug, thiserror::Error)]
pub enum SlsError {
    #[error("SLS logging is disabled: {0}")]
    Disabled(DisabledReason),

    #[error("Invalid SLS configuration: {0}")]
    InvalidConfig(String),
}

impl SlsError {
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled(_))
    }
}

/// A single failed `PutLogs` attempt.
///
/// Never returned to the producer; the putter logs it and moves on.
#[derive(Debug, thiserror::Error)]
pub enum PutLogsError {
    #[error("put logs failed [{status}] {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("put logs failed [X]: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("put logs failed, payload could not be compressed: {0}")]
    Compression(#[from] CompressionError),
}

#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("LZ4 compression failed: {0}")]
    Compress(#[from] lz4_flex::block::CompressError),

    #[error("LZ4 decompression failed: {0}")]
    Decompress(#[from] lz4_flex::block::DecompressError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_display() {
        let error = SlsError::Disabled(DisabledReason::MissingField("project"));
        assert_eq!(
            error.to_string(),
            "SLS logging is disabled: missing required field `project`"
        );
        assert!(error.is_disabled());
    }

    #[test]
    fn test_invalid_config_is_not_disabled() {
        let error = SlsError::InvalidConfig("bad value".to_string());
        assert!(!error.is_disabled());
        assert_eq!(error.to_string(), "Invalid SLS configuration: bad value");
    }

    #[test]
    fn test_status_error_display() {
        let error = PutLogsError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "put logs failed [500 Internal Server Error] boom"
        );
    }
}
