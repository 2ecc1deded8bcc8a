use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

/// A decoded frame ready for GPU upload.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub data: Vec<u8>, // RGBA8
    pub width: u32,
    pub height: u32,
    /// Presentation time of this frame in milliseconds.
    pub pts_ms: u64,
}

impl DecodedFrame {
    /// RGBA pixel at (x, y), or None when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        self.data
            .get(idx..idx + 4)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }
}

/// Stream metadata extracted from the source before playback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMeta {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration_ms: u64,
}

/// Where a seek is allowed to land relative to the requested time.
///
/// Numeric codes follow the platform `SEEK_*` constants so host bridges can
/// forward them unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekMode {
    /// Nearest sync frame at or before the target.
    PreviousSync,
    /// Nearest sync frame at or after the target.
    NextSync,
    /// Nearest sync frame in either direction.
    #[default]
    ClosestSync,
    /// Nearest frame in either direction, not necessarily a sync frame.
    Closest,
    /// The exact requested time.
    Exact,
}

impl SeekMode {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(SeekMode::PreviousSync),
            1 => Some(SeekMode::NextSync),
            2 => Some(SeekMode::ClosestSync),
            3 => Some(SeekMode::Closest),
            4 => Some(SeekMode::Exact),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            SeekMode::PreviousSync => 0,
            SeekMode::NextSync => 1,
            SeekMode::ClosestSync => 2,
            SeekMode::Closest => 3,
            SeekMode::Exact => 4,
        }
    }

    /// Whether the seek must land on a decoded frame rather than a keyframe.
    pub fn is_frame_accurate(self) -> bool {
        matches!(self, SeekMode::Closest | SeekMode::Exact)
    }
}

/// Tagged events a decoder delivers to the owning player's queue.
#[derive(Debug, Clone, PartialEq)]
pub enum DecoderEvent {
    /// `prepare_async` finished; transport commands are now effective.
    Prepared,
    /// Natural end of stream (not emitted for built-in loop iterations).
    Completed,
    /// Asynchronous failure inside the decoder.
    Error(String),
    /// A seek finished; carries the position actually reached.
    SeekComplete { position_ms: u64 },
    /// The decoded frame size changed.
    VideoSizeChanged { width: u32, height: u32 },
}

/// What the decoder implementation supports, resolved once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderCapabilities {
    /// Seeks honor a [`SeekMode`]; otherwise every seek lands on a sync frame.
    pub mode_aware_seek: bool,
}

/// Single-slot handoff of the most recent decoded frame from the decode
/// thread to the renderer. Older frames are overwritten, never queued.
#[derive(Clone, Default)]
pub struct FrameSlot {
    inner: Arc<Mutex<Option<DecodedFrame>>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<DecodedFrame>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn publish(&self, frame: DecodedFrame) {
        *self.lock() = Some(frame);
    }

    /// Take the pending frame, leaving the slot empty.
    pub fn take(&self) -> Option<DecodedFrame> {
        self.lock().take()
    }

    pub fn has_frame(&self) -> bool {
        self.lock().is_some()
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }
}
