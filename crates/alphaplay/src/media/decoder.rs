use crossbeam_channel::{Receiver, Sender};

use super::source::ResolvedSource;
use super::types::{DecoderCapabilities, DecoderEvent, SeekMode, VideoMeta};
use crate::error::PlayerError;

/// Transport surface of the platform media pipeline.
///
/// Implementations decode on their own threads and report asynchronous
/// outcomes as [`DecoderEvent`]s on the sender handed to them at
/// construction. Every call here must return promptly.
pub trait Decoder: Send {
    fn capabilities(&self) -> DecoderCapabilities;

    /// Open the source. Does not start decoding.
    fn set_source(&mut self, source: ResolvedSource) -> Result<(), PlayerError>;

    /// Extract stream metadata for the current source.
    fn probe(&mut self) -> Result<VideoMeta, PlayerError>;

    /// Begin asynchronous preparation. Emits exactly one `Prepared` or `Error`.
    fn prepare_async(&mut self) -> Result<(), PlayerError>;

    fn start(&mut self) -> Result<(), PlayerError>;
    fn pause(&mut self) -> Result<(), PlayerError>;
    fn stop(&mut self) -> Result<(), PlayerError>;
    fn seek(&mut self, position_ms: u64, mode: SeekMode) -> Result<(), PlayerError>;

    /// Current playback position. Never blocks on decode work.
    fn position_ms(&self) -> Result<u64, PlayerError>;

    /// Built-in end-of-stream looping.
    fn set_looping(&mut self, looping: bool);

    /// Drop the source and return to the unconfigured state.
    fn reset(&mut self);

    /// Free all resources. Safe to call more than once.
    fn release(&mut self);
}

/// Channel pair connecting a decoder to the player that consumes its events.
pub fn decoder_channel() -> (Sender<DecoderEvent>, Receiver<DecoderEvent>) {
    crossbeam_channel::unbounded()
}

/// Seek call shape, chosen once from the decoder's capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDispatch {
    /// Forward the requested mode.
    ModeAware,
    /// The decoder only seeks to sync frames; the mode is dropped.
    SyncOnly,
}

impl SeekDispatch {
    pub fn resolve(caps: DecoderCapabilities) -> Self {
        if caps.mode_aware_seek {
            SeekDispatch::ModeAware
        } else {
            SeekDispatch::SyncOnly
        }
    }

    pub fn seek(
        self,
        decoder: &mut dyn Decoder,
        position_ms: u64,
        mode: SeekMode,
    ) -> Result<(), PlayerError> {
        match self {
            SeekDispatch::ModeAware => decoder.seek(position_ms, mode),
            SeekDispatch::SyncOnly => decoder.seek(position_ms, SeekMode::ClosestSync),
        }
    }
}
