use thiserror::Error;

use crate::player::PlaybackState;

/// Errors raised by the playback pipeline.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlayerError {
    /// The video reference could not be opened, resolved or demuxed.
    #[error("source error: {0}")]
    Source(String),
    /// The operation is not allowed in the current playback state.
    #[error("{op} not allowed while {state:?}")]
    InvalidState {
        op: &'static str,
        state: PlaybackState,
    },
    /// Shader compilation or surface binding failed.
    #[error("render setup failed: {0}")]
    RenderSetup(String),
    /// The decoder reported a failure while running.
    #[error("decoder error: {0}")]
    Decoder(String),
    /// The decoder has been released and can no longer be used.
    #[error("decoder released")]
    Released,
}

impl PlayerError {
    pub fn source(msg: impl Into<String>) -> Self {
        PlayerError::Source(msg.into())
    }

    pub fn decoder(msg: impl Into<String>) -> Self {
        PlayerError::Decoder(msg.into())
    }

    /// Errors that the public transport surface swallows instead of reporting.
    pub fn is_ignorable(&self) -> bool {
        matches!(self, PlayerError::InvalidState { .. })
    }
}
