//! Crate-wide error type.
//!
//! Every fallible operation in the library returns [`Result`].  Nothing here
//! is retried: callers log the error and keep the last good pose on screen.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // -----------------------------------------------------------------
    // Command input
    // -----------------------------------------------------------------
    /// User text that should have been a finite float.
    #[error("invalid number for `{field}`: {input:?}")]
    InvalidNumber { field: &'static str, input: String },

    /// User text that should have been a boolean flag.
    #[error("invalid flag for `{field}`: {input:?} (expected true/false)")]
    InvalidFlag { field: &'static str, input: String },

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("command `{command}` is missing argument `{argument}`")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("command `{command}` takes at most {max} arguments, got {got}")]
    TooManyArguments {
        command: &'static str,
        max: usize,
        got: usize,
    },

    // -----------------------------------------------------------------
    // Snapshots / wire frames
    // -----------------------------------------------------------------
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("snapshot field `{0}` is not finite")]
    NonFinite(&'static str),

    #[error("gripper space must be >= 0, got {0}")]
    NegativeSpace(f32),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("json error: {0}")]
    Decode(#[from] serde_json::Error),

    // -----------------------------------------------------------------
    // Transport / config
    // -----------------------------------------------------------------
    #[error("transport is not connected")]
    NotConnected,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
