// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Unified error types for the bcachefs exporter.
//!
//! Errors fall into two families:
//!
//! - **absent input**: an optional file or directory could not be read. Callers
//!   treat this as "field not present" rather than as a failed poll.
//! - **malformed input**: the text was read but does not match any accepted
//!   layout, or a number/unit could not be decoded. This aborts the parse of the
//!   whole report so that half-filled snapshots never reach the exposition layer.
//!
//! # Example
//!
//! ```rust
//! use bcachefs_exporter::parsing::units::decode_size;
//! use bcachefs_exporter::Error;
//!
//! let err = decode_size("1", "XiB").unwrap_err();
//! assert!(matches!(err, Error::UnitUnknown(_)));
//! assert!(err.is_malformed());
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for exporter operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An expected file or directory does not exist or could not be read.
    ///
    /// Any I/O failure on an optional path is reported this way; permission
    /// problems are not distinguished from missing files.
    #[error("input not available: {path}: {source}")]
    AbsentInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The text does not match any accepted shape of the section being parsed.
    #[error("unexpected format in {context}: '{line}'")]
    UnexpectedFormat { context: &'static str, line: String },

    /// A size or time unit suffix is not in any known unit table.
    #[error("unknown unit '{0}'")]
    UnitUnknown(String),

    /// A glued size token such as `24.9KiB` has no leading numeric part.
    #[error("malformed size token '{0}'")]
    MalformedSizeToken(String),

    /// A numeric literal could not be parsed.
    #[error("invalid number '{literal}': {reason}")]
    InvalidNumber { literal: String, reason: String },

    /// Parsing a specific file failed; wraps the underlying error.
    #[error("failed to parse '{file}': {source}")]
    File {
        file: String,
        #[source]
        source: Box<Error>,
    },

    /// The usage report command could not be executed or exited non-zero.
    #[error("command '{command}' failed (code: {code:?}): {stderr}")]
    Command {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The command succeeded but its stdout is not valid UTF-8.
    #[error("output of '{command}' is not UTF-8: {source}")]
    NotUtf8 {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// A poll did not complete within the configured timeout.
    #[error("poll timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Command-line options failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Any other I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for [`Error::UnexpectedFormat`].
    pub fn format(context: &'static str, line: impl Into<String>) -> Self {
        Error::UnexpectedFormat {
            context,
            line: line.into(),
        }
    }

    pub fn invalid_number(literal: &str, reason: impl ToString) -> Self {
        Error::InvalidNumber {
            literal: literal.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Wrap this error with the name of the file being parsed.
    pub fn in_file(self, file: impl Into<String>) -> Self {
        Error::File {
            file: file.into(),
            source: Box::new(self),
        }
    }

    /// True when the error means "optional input not present".
    pub fn is_absent(&self) -> bool {
        match self {
            Error::AbsentInput { .. } => true,
            Error::File { source, .. } => source.is_absent(),
            _ => false,
        }
    }

    /// True for the malformed-input family: format, unit, number and encoding errors.
    pub fn is_malformed(&self) -> bool {
        match self {
            Error::UnexpectedFormat { .. }
            | Error::UnitUnknown(_)
            | Error::MalformedSizeToken(_)
            | Error::InvalidNumber { .. }
            | Error::NotUtf8 { .. } => true,
            Error::File { source, .. } => source.is_malformed(),
            _ => false,
        }
    }
}

/// A specialized Result type for exporter operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::format("btree usage", "extents");
        assert_eq!(
            err.to_string(),
            "unexpected format in btree usage: 'extents'"
        );

        let err = Error::UnitUnknown("XiB".to_string());
        assert_eq!(err.to_string(), "unknown unit 'XiB'");

        let err = Error::MalformedSizeToken("KiB".to_string());
        assert_eq!(err.to_string(), "malformed size token 'KiB'");
    }

    #[test]
    fn test_error_classification() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let absent = Error::AbsentInput {
            path: PathBuf::from("/sys/fs/bcachefs/x/btree_cache_size"),
            source: io_err,
        };
        assert!(absent.is_absent());
        assert!(!absent.is_malformed());

        let wrapped = Error::UnitUnknown("q".to_string()).in_file("io_done");
        assert!(wrapped.is_malformed());
        assert!(!wrapped.is_absent());
        assert_eq!(
            wrapped.to_string(),
            "failed to parse 'io_done': unknown unit 'q'"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_absent());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
