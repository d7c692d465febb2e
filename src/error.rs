//! Error types for pattern files and MIDI devices

use thiserror::Error;

/// Persisted pattern data could not be turned into a grid.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("expected {expected} cells, found {found}")]
    WrongLength { expected: usize, found: usize },

    #[error("malformed pattern data: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The MIDI output or the playback service refused an operation.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("failed to create MIDI output: {0}")]
    Init(#[from] midir::InitError),

    #[error("MIDI output port not found: {0}")]
    PortNotFound(String),

    #[error("failed to connect to MIDI port: {0}")]
    Connect(String),

    #[error("failed to send MIDI message: {0}")]
    Send(#[from] midir::SendError),

    #[error("no MIDI output is open")]
    NotOpen,

    #[error("no sequence has been set")]
    NoSequence,

    #[error("failed to spawn playback thread: {0}")]
    Thread(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
