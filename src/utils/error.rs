//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.
//!
//! The aggregation tree itself never fails; every error here belongs to an
//! event source or an output sink.

use thiserror::Error;

/// Errors that can occur while decoding an RDB dump
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error while reading dump: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected end of input while reading {0}")]
    UnexpectedEof(&'static str),

    #[error("Invalid RDB header: {0}")]
    InvalidHeader(String),

    #[error("Unsupported RDB value type: {0}")]
    UnsupportedType(u8),

    #[error("Unsupported RDB opcode: {0:#04x}")]
    UnsupportedOpcode(u8),

    #[error("Corrupt encoding: {0}")]
    Corrupt(String),
}

/// Errors that can occur while reading JSON-lines events
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error while reading events: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid event on line {line}: {source}")]
    InvalidLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that can occur during flamegraph generation
#[derive(Error, Debug)]
pub enum FlamegraphError {
    #[error("Empty stack data")]
    EmptyStacks,

    #[error("Failed to render flamegraph: {0}")]
    Render(String),

    #[error("Rendered SVG is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
