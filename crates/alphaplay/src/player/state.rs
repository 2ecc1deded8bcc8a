/// Playback lifecycle. Starts at `NotPrepared`; `Released` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    NotPrepared,
    Prepared,
    Started,
    Paused,
    Stopped,
    Released,
}

impl PlaybackState {
    /// States in which the decoder holds a prepared stream.
    pub fn is_prepared(self) -> bool {
        matches!(
            self,
            PlaybackState::Prepared | PlaybackState::Started | PlaybackState::Paused
        )
    }

    /// States from which the prepare protocol may run.
    pub fn can_prepare(self) -> bool {
        matches!(self, PlaybackState::NotPrepared | PlaybackState::Stopped)
    }
}
