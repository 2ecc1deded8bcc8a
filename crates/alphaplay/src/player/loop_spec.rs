use crate::media::SeekMode;

/// Manual loop points layered over the playback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopSpec {
    pub start_ms: Option<u64>,
    pub end_ms: Option<u64>,
    pub seek_mode: SeekMode,
}

impl LoopSpec {
    /// Build from property values where any negative bound means unset.
    pub fn from_raw(start_ms: i64, end_ms: i64, seek_mode: SeekMode) -> Self {
        Self {
            start_ms: u64::try_from(start_ms).ok(),
            end_ms: u64::try_from(end_ms).ok(),
            seek_mode,
        }
    }

    /// Built-in end-of-stream looping is off whenever a bound is set.
    pub fn disables_platform_loop(&self) -> bool {
        self.start_ms.is_some() || self.end_ms.is_some()
    }

    /// Where to restart on end-of-stream when only the start bound is set.
    pub fn restart_on_completion(&self) -> Option<u64> {
        match (self.start_ms, self.end_ms) {
            (Some(start), None) => Some(start),
            _ => None,
        }
    }

    /// `(start, end)` for watcher-driven segment looping. An empty or
    /// inverted segment is ignored.
    pub fn segment(&self) -> Option<(u64, u64)> {
        match (self.start_ms, self.end_ms) {
            (Some(start), Some(end)) if start < end => Some((start, end)),
            _ => None,
        }
    }
}
