//! Error types for response decoding, command sending and action validation

use thiserror::Error;

use crate::io::IoError;

/// Errors that can occur when decoding a receiver response line
///
/// A decode error means the line matched a known prefix but its body did not
/// have the shape the protocol promises. The controller reports it and moves
/// on to the next line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Body is not the fixed length this response kind requires
    #[error("{prefix}: expected {expected} characters, got {actual}")]
    WrongLength {
        prefix: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Body is shorter than the minimum length for this response kind
    #[error("{prefix}: expected at least {expected} characters, got {actual}")]
    TooShort {
        prefix: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A field that must be decimal digits was not
    #[error("{prefix}: invalid number {value:?}")]
    InvalidNumber { prefix: &'static str, value: String },

    /// A field that must be hexadecimal digits was not
    #[error("{prefix}: invalid hex {value:?}")]
    InvalidHex { prefix: &'static str, value: String },

    /// Body had an unexpected layout (missing quote, bad class letter, ...)
    #[error("{prefix}: malformed body {body:?}")]
    Malformed { prefix: &'static str, body: String },
}

/// Errors raised by the command sender
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SendError {
    /// The session has no open connection
    #[error("not connected")]
    NotConnected,

    /// Command text was empty after terminator normalisation
    #[error("empty command")]
    Empty,

    /// Socket not ready for writing; the command was not sent
    #[error("socket not ready")]
    WouldBlock,

    /// The write failed
    #[error("write failed: {0}")]
    Io(IoError),
}

/// Validation errors for host actions
///
/// Raised synchronously before any command is queued. Every variant names
/// the offending field so the host can show it next to the input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("volume: {value} dB is outside {min}..={max} dB")]
    VolumeOutOfRange { value: f64, min: f64, max: f64 },

    #[error("volume: {value} dB is not a multiple of {step} dB")]
    VolumeStep { value: f64, step: f64 },

    #[error("source: {code:02} is not supported by the {model}")]
    UnsupportedSource { code: u8, model: &'static str },

    #[error("source: {code:02} is not a known input source")]
    UnknownSource { code: u8 },

    #[error("frequency: {value} {unit} is outside {min}..={max} {unit}")]
    FrequencyOutOfRange {
        value: f64,
        min: f64,
        max: f64,
        unit: &'static str,
    },

    #[error("frequency: {value} {unit} is not on the {step} {unit} raster")]
    FrequencyStep {
        value: f64,
        step: f64,
        unit: &'static str,
    },

    #[error("band: {0:?} is not AM or FM")]
    UnknownBand(String),

    #[error("listening mode: {0:04} is not a known listening mode")]
    UnknownListeningMode(u16),

    #[error("listening mode: {code:04} is not supported by the {model}")]
    UnsupportedListeningMode { code: u16, model: &'static str },

    #[error("button: {button:?} is not available for the current source ({family})")]
    InvalidButton { button: String, family: &'static str },

    #[error("mcacc memory: {0} is outside 1..=6")]
    McaccOutOfRange(u8),

    #[error("level: {0}% is outside 0..=100")]
    LevelOutOfRange(u8),

    #[error("command: {0}")]
    InvalidCommand(String),

    #[error("unknown receiver {0:?}")]
    UnknownReceiver(String),

    #[error("unknown virtual level controller {0:?}")]
    UnknownVirtualLevel(String),

    #[error("unknown action {0:?}")]
    UnknownAction(String),

    #[error("{action}: missing or invalid parameter {param:?}")]
    BadParameter { action: &'static str, param: String },
}
