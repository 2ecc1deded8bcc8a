//! Scripted decoder for driving the player deterministically in tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crossbeam_channel::Sender;

use super::decoder::Decoder;
use super::source::ResolvedSource;
use super::types::{DecoderCapabilities, DecoderEvent, SeekMode, VideoMeta};
use crate::error::PlayerError;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetSource,
    Probe,
    PrepareAsync,
    Start,
    Pause,
    Stop,
    Seek(u64, SeekMode),
    SetLooping(bool),
    Reset,
    Release,
}

struct MockState {
    calls: Vec<Call>,
    positions: VecDeque<u64>,
    position: u64,
    position_fails: bool,
    fail_source: bool,
    meta: Option<VideoMeta>,
    looping: bool,
    /// Seeks wait for [`MockHandle::land_seek`] instead of landing at once.
    deferred_seeks: bool,
    pending_seeks: VecDeque<u64>,
}

pub struct MockDecoder {
    state: Arc<Mutex<MockState>>,
    events: Sender<DecoderEvent>,
    caps: DecoderCapabilities,
}

/// Test-side view of a [`MockDecoder`] owned by the player.
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
    events: Sender<DecoderEvent>,
}

impl MockDecoder {
    pub fn new(events: Sender<DecoderEvent>) -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(MockState {
            calls: Vec::new(),
            positions: VecDeque::new(),
            position: 0,
            position_fails: false,
            fail_source: false,
            meta: Some(VideoMeta {
                width: 640,
                height: 480,
                fps: 30.0,
                duration_ms: 10_000,
            }),
            looping: false,
            deferred_seeks: false,
            pending_seeks: VecDeque::new(),
        }));
        let handle = MockHandle {
            state: state.clone(),
            events: events.clone(),
        };
        let decoder = Self {
            state,
            events,
            caps: DecoderCapabilities {
                mode_aware_seek: true,
            },
        };
        (decoder, handle)
    }

    pub fn without_mode_aware_seek(mut self) -> Self {
        self.caps.mode_aware_seek = false;
        self
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl Decoder for MockDecoder {
    fn capabilities(&self) -> DecoderCapabilities {
        self.caps
    }

    fn set_source(&mut self, _source: ResolvedSource) -> Result<(), PlayerError> {
        self.record(Call::SetSource);
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.fail_source) {
            return Err(PlayerError::source("unsupported container"));
        }
        Ok(())
    }

    fn probe(&mut self) -> Result<VideoMeta, PlayerError> {
        self.record(Call::Probe);
        self.state
            .lock()
            .unwrap()
            .meta
            .ok_or_else(|| PlayerError::source("no video stream"))
    }

    fn prepare_async(&mut self) -> Result<(), PlayerError> {
        self.record(Call::PrepareAsync);
        Ok(())
    }

    fn start(&mut self) -> Result<(), PlayerError> {
        self.record(Call::Start);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        self.record(Call::Pause);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PlayerError> {
        self.record(Call::Stop);
        Ok(())
    }

    fn seek(&mut self, position_ms: u64, mode: SeekMode) -> Result<(), PlayerError> {
        self.record(Call::Seek(position_ms, mode));
        let mut state = self.state.lock().unwrap();
        if state.deferred_seeks {
            state.pending_seeks.push_back(position_ms);
            return Ok(());
        }
        state.position = position_ms;
        let _ = self.events.send(DecoderEvent::SeekComplete { position_ms });
        Ok(())
    }

    fn position_ms(&self) -> Result<u64, PlayerError> {
        let mut state = self.state.lock().unwrap();
        if state.position_fails {
            return Err(PlayerError::Released);
        }
        if let Some(next) = state.positions.pop_front() {
            state.position = next;
        }
        Ok(state.position)
    }

    fn set_looping(&mut self, looping: bool) {
        self.record(Call::SetLooping(looping));
        self.state.lock().unwrap().looping = looping;
    }

    fn reset(&mut self) {
        self.record(Call::Reset);
    }

    fn release(&mut self) {
        self.record(Call::Release);
    }
}

impl MockHandle {
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn seeks(&self) -> Vec<(u64, SeekMode)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Seek(ms, mode) => Some((ms, mode)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Positions returned by successive `position_ms` reads.
    pub fn script_positions(&self, positions: &[u64]) {
        self.state
            .lock()
            .unwrap()
            .positions
            .extend(positions.iter().copied());
    }

    pub fn set_position_fails(&self, fails: bool) {
        self.state.lock().unwrap().position_fails = fails;
    }

    pub fn fail_next_source(&self) {
        self.state.lock().unwrap().fail_source = true;
    }

    pub fn set_meta(&self, meta: Option<VideoMeta>) {
        self.state.lock().unwrap().meta = meta;
    }

    pub fn looping(&self) -> bool {
        self.state.lock().unwrap().looping
    }

    /// Hold seeks until [`land_seek`](Self::land_seek), leaving the
    /// reported position where it was.
    pub fn defer_seeks(&self) {
        self.state.lock().unwrap().deferred_seeks = true;
    }

    /// Complete the oldest deferred seek.
    pub fn land_seek(&self) {
        let mut state = self.state.lock().unwrap();
        let position_ms = state.pending_seeks.pop_front().unwrap();
        state.position = position_ms;
        self.events
            .send(DecoderEvent::SeekComplete { position_ms })
            .unwrap();
    }

    pub fn emit(&self, event: DecoderEvent) {
        self.events.send(event).unwrap();
    }
}
