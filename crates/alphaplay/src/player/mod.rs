pub mod loop_spec;
pub mod state;
pub mod watcher;

use std::time::Instant;

use crossbeam_channel::Receiver;

pub use loop_spec::LoopSpec;
pub use state::PlaybackState;
pub use watcher::{PositionWatcher, WATCH_PERIOD};

use crate::config::PlayerConfig;
use crate::error::PlayerError;
use crate::media::{Decoder, DecoderEvent, ResolvedSource, SeekDispatch, SeekMode, VideoMeta};

/// Host-facing playback notifications. All methods default to no-ops.
pub trait PlaybackListener {
    /// Playback entered `Started` from a fresh preparation.
    fn on_video_started(&mut self) {}
    /// Natural end of stream that did not loop.
    fn on_video_ended(&mut self) {}
    fn on_error(&mut self, _error: &PlayerError) {}
    fn on_seek_complete(&mut self, _position_ms: u64) {}
}

/// Playback state machine.
///
/// Coordinates decoder transport with surface readiness and the host's
/// pause/resume lifecycle, and layers loop points on top. Decoder callbacks
/// arrive as [`DecoderEvent`]s and are consumed by [`update`](Self::update)
/// on the owning thread, so transitions never run concurrently.
pub struct AlphaVideoPlayer {
    /// `None` once released.
    decoder: Option<Box<dyn Decoder>>,
    events: Receiver<DecoderEvent>,
    seek_dispatch: SeekDispatch,
    state: PlaybackState,
    loop_spec: LoopSpec,
    looping: bool,
    auto_play_after_resume: bool,
    listener: Option<Box<dyn PlaybackListener>>,
    watcher: PositionWatcher,
    meta: Option<VideoMeta>,

    surface_ready: bool,
    source_set: bool,
    /// A start request waiting for surface + source.
    pending_start: bool,
    /// `prepare_async` issued, `Prepared` not yet received.
    preparing: bool,
    start_on_prepared: bool,
    /// Host is backgrounded.
    suspended: bool,
    /// Prepared while suspended; start on resume.
    start_deferred: bool,
    play_after_resume: bool,
    /// Watcher loop seek issued and not yet landed.
    loop_seek_in_flight: bool,
}

impl AlphaVideoPlayer {
    pub fn new(
        decoder: Box<dyn Decoder>,
        events: Receiver<DecoderEvent>,
        config: &PlayerConfig,
    ) -> Self {
        let seek_dispatch = SeekDispatch::resolve(decoder.capabilities());
        let mut player = Self {
            decoder: Some(decoder),
            events,
            seek_dispatch,
            state: PlaybackState::NotPrepared,
            loop_spec: config.loop_spec(),
            looping: config.looping,
            auto_play_after_resume: config.auto_play_after_resume,
            listener: None,
            watcher: PositionWatcher::default(),
            meta: None,
            surface_ready: false,
            source_set: false,
            pending_start: false,
            preparing: false,
            start_on_prepared: false,
            suspended: false,
            start_deferred: false,
            play_after_resume: false,
            loop_seek_in_flight: false,
        };
        player.apply_looping();
        player
    }

    pub fn set_listener(&mut self, listener: Box<dyn PlaybackListener>) {
        self.listener = Some(listener);
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Started
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state == PlaybackState::Stopped
    }

    pub fn is_released(&self) -> bool {
        self.state == PlaybackState::Released
    }

    pub fn loop_spec(&self) -> LoopSpec {
        self.loop_spec
    }

    /// Metadata probed for the current source, updated by size changes.
    pub fn meta(&self) -> Option<VideoMeta> {
        self.meta
    }

    /// When the position watcher next wants [`update`](Self::update) called.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.watcher.deadline()
    }

    // -- source ---------------------------------------------------------

    /// Reset, open `source`, probe metadata and register a start intent.
    ///
    /// A source failure is logged and returned; the player stays
    /// `NotPrepared` and usable for another attempt. A probe failure only
    /// loses the metadata.
    pub fn set_source(
        &mut self,
        source: ResolvedSource,
    ) -> Result<Option<VideoMeta>, PlayerError> {
        if self.state == PlaybackState::Released {
            return Err(PlayerError::Released);
        }
        self.reset();

        let decoder = self.decoder.as_deref_mut().ok_or(PlayerError::Released)?;
        if let Err(e) = decoder.set_source(source) {
            log::error!("Failed to set video source: {e}");
            return Err(e);
        }
        self.meta = match decoder.probe() {
            Ok(meta) => {
                log::info!(
                    "Video source set: {}x{} @ {:.2} fps, {} ms",
                    meta.width,
                    meta.height,
                    meta.fps,
                    meta.duration_ms
                );
                Some(meta)
            }
            Err(e) => {
                log::warn!("Metadata probe failed, keeping default geometry: {e}");
                None
            }
        };
        self.source_set = true;
        self.pending_start = true;
        self.try_prepare();
        Ok(self.meta)
    }

    // -- surface --------------------------------------------------------

    /// The renderer is bound to a surface; deferred starts may proceed.
    pub fn on_surface_prepared(&mut self) {
        if self.state == PlaybackState::Released {
            return;
        }
        self.surface_ready = true;
        self.try_prepare();
    }

    pub fn on_surface_lost(&mut self) {
        self.surface_ready = false;
    }

    pub fn surface_ready(&self) -> bool {
        self.surface_ready
    }

    /// Apply a buffered start intent once surface and source are both there.
    fn try_prepare(&mut self) {
        if !(self.pending_start && self.surface_ready && self.source_set) {
            return;
        }
        if self.preparing || !self.state.can_prepare() {
            return;
        }
        self.pending_start = false;
        let result = self.prepare();
        self.settle("prepare", result);
    }

    fn prepare(&mut self) -> Result<(), PlayerError> {
        let decoder = self.decoder.as_deref_mut().ok_or(PlayerError::Released)?;
        decoder.prepare_async()?;
        self.preparing = true;
        self.start_on_prepared = true;
        log::debug!("Preparing from {:?}", self.state);
        Ok(())
    }

    // -- transport ------------------------------------------------------

    /// Start or resume playback. Before surface and source are ready the
    /// request is buffered and applied once both are.
    pub fn start(&mut self) {
        let result = self.try_start();
        self.settle("start", result);
    }

    fn try_start(&mut self) -> Result<(), PlayerError> {
        match self.state {
            PlaybackState::Prepared => {
                self.decoder_mut()?.start()?;
                self.enter_started(Instant::now());
                log::info!("Playback started");
                self.notify(|l| l.on_video_started());
                Ok(())
            }
            PlaybackState::Paused => {
                self.decoder_mut()?.start()?;
                self.enter_started(Instant::now());
                log::debug!("Playback resumed");
                Ok(())
            }
            PlaybackState::NotPrepared | PlaybackState::Stopped => {
                if self.preparing {
                    self.start_on_prepared = true;
                } else {
                    self.pending_start = true;
                    self.try_prepare();
                }
                Ok(())
            }
            PlaybackState::Started => Ok(()),
            PlaybackState::Released => Err(self.invalid("start")),
        }
    }

    pub fn pause(&mut self) {
        let result = self.try_pause();
        self.settle("pause", result);
    }

    fn try_pause(&mut self) -> Result<(), PlayerError> {
        if self.state != PlaybackState::Started {
            return Err(self.invalid("pause"));
        }
        self.decoder_mut()?.pause()?;
        self.state = PlaybackState::Paused;
        self.watcher.disarm();
        Ok(())
    }

    pub fn stop(&mut self) {
        let result = self.try_stop();
        self.settle("stop", result);
    }

    fn try_stop(&mut self) -> Result<(), PlayerError> {
        if !matches!(self.state, PlaybackState::Started | PlaybackState::Paused) {
            return Err(self.invalid("stop"));
        }
        self.decoder_mut()?.stop()?;
        self.state = PlaybackState::Stopped;
        self.watcher.disarm();
        Ok(())
    }

    /// Back to `NotPrepared` with no source. Valid in any state but
    /// `Released`.
    pub fn reset(&mut self) {
        if self.state == PlaybackState::Released {
            log::debug!("{}", self.invalid("reset"));
            return;
        }
        if let Some(decoder) = self.decoder.as_deref_mut() {
            decoder.reset();
        }
        self.state = PlaybackState::NotPrepared;
        self.watcher.disarm();
        self.source_set = false;
        self.pending_start = false;
        self.preparing = false;
        self.start_on_prepared = false;
        self.start_deferred = false;
        self.loop_seek_in_flight = false;
        self.meta = None;
        // Events from the previous source are stale
        while self.events.try_recv().is_ok() {}
    }

    /// Free the decoder. Terminal; calling it again has no further effect.
    pub fn release(&mut self) {
        self.watcher.disarm();
        if let Some(mut decoder) = self.decoder.take() {
            decoder.release();
            log::info!("Player released");
        }
        self.state = PlaybackState::Released;
        self.pending_start = false;
        self.preparing = false;
        self.start_on_prepared = false;
        self.start_deferred = false;
        self.play_after_resume = false;
    }

    /// Seek using the configured loop seek mode.
    pub fn seek_to(&mut self, position_ms: u64) {
        let result = self.try_seek(position_ms);
        self.settle("seek", result);
    }

    fn try_seek(&mut self, position_ms: u64) -> Result<(), PlayerError> {
        if !self.state.is_prepared() {
            return Err(self.invalid("seek"));
        }
        let mode = self.loop_spec.seek_mode;
        let dispatch = self.seek_dispatch;
        dispatch.seek(self.decoder_mut()?, position_ms, mode)
    }

    pub fn position_ms(&self) -> Result<u64, PlayerError> {
        self.decoder
            .as_deref()
            .ok_or(PlayerError::Released)?
            .position_ms()
    }

    // -- properties -----------------------------------------------------

    pub fn set_loop_start_ms(&mut self, start_ms: i64) {
        self.loop_spec.start_ms = u64::try_from(start_ms).ok();
        self.apply_looping();
    }

    pub fn set_loop_end_ms(&mut self, end_ms: i64) {
        self.loop_spec.end_ms = u64::try_from(end_ms).ok();
        self.apply_looping();
    }

    pub fn set_loop_seek_mode(&mut self, mode: SeekMode) {
        self.loop_spec.seek_mode = mode;
    }

    /// Built-in looping when no loop bound is set.
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
        self.apply_looping();
    }

    pub fn set_auto_play_after_resume(&mut self, enabled: bool) {
        self.auto_play_after_resume = enabled;
    }

    fn apply_looping(&mut self) {
        if let (None, Some(start), Some(end)) =
            (self.loop_spec.segment(), self.loop_spec.start_ms, self.loop_spec.end_ms)
        {
            log::warn!("Ignoring empty loop segment {start}..{end} ms");
        }
        let platform = self.looping && !self.loop_spec.disables_platform_loop();
        if let Some(decoder) = self.decoder.as_deref_mut() {
            decoder.set_looping(platform);
        }
    }

    // -- host lifecycle -------------------------------------------------

    pub fn on_pause(&mut self) {
        self.suspended = true;
        self.watcher.disarm();
        if self.state == PlaybackState::Started && self.auto_play_after_resume {
            self.play_after_resume = true;
        }
        if self.state == PlaybackState::Started {
            self.pause();
        }
    }

    pub fn on_resume(&mut self) {
        self.suspended = false;
        if self.start_deferred {
            self.start_deferred = false;
            self.start();
        } else if self.auto_play_after_resume && self.play_after_resume {
            self.play_after_resume = false;
            self.start();
        }
    }

    pub fn on_detach(&mut self) {
        self.release();
    }

    /// A render setup failure ends the current playback attempt. The player
    /// itself stays usable.
    pub fn fail_playback(&mut self, error: PlayerError) {
        log::error!("{error}");
        self.pending_start = false;
        self.start_on_prepared = false;
        self.start_deferred = false;
        if matches!(self.state, PlaybackState::Started | PlaybackState::Paused) {
            self.stop();
        }
        self.notify(|l| l.on_error(&error));
    }

    // -- event pump -----------------------------------------------------

    /// Drain decoder events, then run the position watcher if it is due.
    pub fn update(&mut self, now: Instant) {
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event, now);
        }
        if self.watcher.poll_due(now) {
            self.watch_tick(now);
        }
    }

    fn handle_event(&mut self, event: DecoderEvent, now: Instant) {
        match event {
            DecoderEvent::Prepared => self.on_prepared(now),
            DecoderEvent::Completed => self.on_completed(now),
            DecoderEvent::Error(msg) => {
                // The decoder stops streaming on error; leave Started with it
                self.preparing = false;
                self.fail_playback(PlayerError::Decoder(msg));
            }
            DecoderEvent::SeekComplete { position_ms } => {
                self.loop_seek_in_flight = false;
                self.notify(|l| l.on_seek_complete(position_ms));
            }
            DecoderEvent::VideoSizeChanged { width, height } => {
                if let Some(meta) = self.meta.as_mut() {
                    meta.width = width;
                    meta.height = height;
                } else {
                    self.meta = Some(VideoMeta {
                        width,
                        height,
                        fps: 0.0,
                        duration_ms: 0,
                    });
                }
            }
        }
    }

    fn on_prepared(&mut self, now: Instant) {
        if !self.preparing {
            log::debug!("Ignoring stale Prepared event");
            return;
        }
        self.preparing = false;
        self.state = PlaybackState::Prepared;
        log::info!("Decoder prepared");
        if !std::mem::take(&mut self.start_on_prepared) {
            return;
        }
        if self.suspended {
            self.start_deferred = true;
            return;
        }
        let result = self.decoder_mut().and_then(|d| d.start());
        match result {
            Ok(()) => {
                self.enter_started(now);
                log::info!("Playback started");
                self.notify(|l| l.on_video_started());
            }
            Err(e) => self.settle("start", Err(e)),
        }
    }

    fn on_completed(&mut self, now: Instant) {
        if self.state != PlaybackState::Started {
            log::debug!("Ignoring completion while {:?}", self.state);
            return;
        }
        if let Some(start) = self.loop_spec.restart_on_completion() {
            let mode = self.loop_spec.seek_mode;
            let dispatch = self.seek_dispatch;
            let result = self.decoder_mut().and_then(|d| {
                dispatch.seek(d, start, mode)?;
                d.start()
            });
            match result {
                Ok(()) => {
                    log::debug!("End of stream, restarting at {start} ms");
                    self.watcher.arm(now);
                    return;
                }
                Err(e) => log::warn!("Loop restart failed: {e}"),
            }
        }
        self.state = PlaybackState::Paused;
        self.watcher.disarm();
        log::info!("Playback ended");
        self.notify(|l| l.on_video_ended());
    }

    fn watch_tick(&mut self, now: Instant) {
        if self.state != PlaybackState::Started {
            return;
        }
        let position = match self.position_ms() {
            Ok(position) => position,
            Err(e) => {
                log::warn!("Position watcher stopped: {e}");
                return;
            }
        };
        let Some((start, end)) = self.loop_spec.segment() else {
            self.watcher.arm(now);
            return;
        };
        if position < end {
            self.loop_seek_in_flight = false;
        } else if self.loop_seek_in_flight {
            log::debug!("Loop seek to {start} ms still pending at {position} ms");
        } else {
            let mode = self.loop_spec.seek_mode;
            let dispatch = self.seek_dispatch;
            let result = self
                .decoder_mut()
                .and_then(|d| dispatch.seek(d, start, mode));
            if let Err(e) = result {
                log::warn!("Position watcher stopped: loop seek failed: {e}");
                return;
            }
            self.loop_seek_in_flight = true;
            log::debug!("Loop end {end} ms reached at {position} ms, seeking to {start} ms");
        }
        self.watcher.arm(now);
    }

    // -- helpers --------------------------------------------------------

    fn enter_started(&mut self, now: Instant) {
        self.state = PlaybackState::Started;
        self.loop_seek_in_flight = false;
        self.watcher.arm(now);
    }

    fn decoder_mut(&mut self) -> Result<&mut dyn Decoder, PlayerError> {
        match self.decoder.as_deref_mut() {
            Some(decoder) => Ok(decoder),
            None => Err(PlayerError::Released),
        }
    }

    fn invalid(&self, op: &'static str) -> PlayerError {
        PlayerError::InvalidState {
            op,
            state: self.state,
        }
    }

    fn notify(&mut self, f: impl FnOnce(&mut dyn PlaybackListener)) {
        if let Some(listener) = self.listener.as_deref_mut() {
            f(listener);
        }
    }

    /// Public transport calls swallow invalid-state errors and report the rest.
    fn settle(&mut self, op: &'static str, result: Result<(), PlayerError>) {
        match result {
            Ok(()) => {}
            Err(e) if e.is_ignorable() => log::debug!("Ignored: {e}"),
            Err(e) => {
                log::error!("{op} failed: {e}");
                self.notify(|l| l.on_error(&e));
            }
        }
    }
}

impl Drop for AlphaVideoPlayer {
    fn drop(&mut self) {
        self.release();
    }
}
