use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Receiver;
use wgpu::{CommandEncoder, Device, Queue, TextureView};

use crate::config::{Argb, PackLayout, PlayerConfig};
use crate::error::PlayerError;
use crate::layout::VideoGeometry;
use crate::media::{
    ByteRange, Decoder, DecoderEvent, FfmpegDecoder, FrameSlot, MediaDataSource, SeekMode,
    SourceResolver, VideoMeta, VideoSource, decoder_channel,
};
use crate::player::{AlphaVideoPlayer, PlaybackListener, PlaybackState};
use crate::render::{AlphaRenderer, RenderConfigCell, SurfaceTarget};
use crate::shader::ShaderWatcher;
use crate::shader::hot_reload::read_shader;

/// The alpha video component: property surface, source setters, transport
/// and lifecycle hooks for the host, plus the per-frame draw entry point.
pub struct AlphaVideoView {
    config: PlayerConfig,
    player: AlphaVideoPlayer,
    resolver: SourceResolver,
    render_config: Arc<RenderConfigCell>,
    renderer: Option<AlphaRenderer>,
    target: Option<SurfaceTarget>,
    /// Config generation whose shader failed to bind; retried once it changes.
    failed_generation: Option<u64>,
    frames: FrameSlot,
    geometry: VideoGeometry,
    geometry_source: Option<VideoMeta>,
    shader_watcher: Option<ShaderWatcher>,
}

impl AlphaVideoView {
    /// Component backed by the ffmpeg decoder.
    pub fn new(config: PlayerConfig, resolver: SourceResolver) -> Self {
        let (tx, rx) = decoder_channel();
        let frames = FrameSlot::new();
        let decoder = FfmpegDecoder::new(tx, frames.clone());
        Self::with_decoder(config, resolver, Box::new(decoder), rx, frames)
    }

    /// Component backed by any [`Decoder`]. `events` and `frames` must be the
    /// channel and slot the decoder was built with.
    pub fn with_decoder(
        mut config: PlayerConfig,
        resolver: SourceResolver,
        decoder: Box<dyn Decoder>,
        events: Receiver<DecoderEvent>,
        frames: FrameSlot,
    ) -> Self {
        let shader_watcher = config.custom_shader_path.clone().and_then(|path| {
            match read_shader(&path) {
                Ok(source) => config.custom_shader = Some(source),
                Err(e) => log::warn!("Custom shader not loaded: {e:#}"),
            }
            ShaderWatcher::new(&path)
                .map_err(|e| log::warn!("Shader hot reload disabled: {e:#}"))
                .ok()
        });
        let player = AlphaVideoPlayer::new(decoder, events, &config);
        let render_config = Arc::new(RenderConfigCell::new(config.render_config()));
        Self {
            config,
            player,
            resolver,
            render_config,
            renderer: None,
            target: None,
            failed_generation: None,
            frames,
            geometry: VideoGeometry::default(),
            geometry_source: None,
            shader_watcher,
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn resolver_mut(&mut self) -> &mut SourceResolver {
        &mut self.resolver
    }

    pub fn set_listener(&mut self, listener: Box<dyn PlaybackListener>) {
        self.player.set_listener(listener);
    }

    // -- properties -----------------------------------------------------

    pub fn set_accuracy(&mut self, accuracy: f32) {
        self.config.accuracy = accuracy;
        self.publish_render_config();
    }

    pub fn set_alpha_color(&mut self, color: Option<Argb>) {
        self.config.alpha_color = color;
        self.publish_render_config();
    }

    pub fn set_packed(&mut self, packed: bool) {
        self.config.packed = packed;
        self.publish_render_config();
        self.refresh_geometry();
    }

    pub fn set_pack_layout(&mut self, layout: PackLayout) {
        self.config.pack_layout = layout;
        self.publish_render_config();
        self.refresh_geometry();
    }

    pub fn set_key_softness(&mut self, softness: f32) {
        self.config.key_softness = softness;
        self.publish_render_config();
    }

    /// Replace the built-in shaders with a WGSL fragment shader, or return
    /// to them with `None`.
    pub fn set_custom_shader(&mut self, source: Option<String>) {
        self.config.custom_shader = source;
        self.publish_render_config();
    }

    /// Load a custom shader from `path` and keep it in sync with the file.
    pub fn set_custom_shader_path(&mut self, path: Option<PathBuf>) {
        self.shader_watcher = None;
        self.config.custom_shader_path = path.clone();
        let Some(path) = path else {
            self.set_custom_shader(None);
            return;
        };
        match read_shader(&path) {
            Ok(source) => self.set_custom_shader(Some(source)),
            Err(e) => log::warn!("Custom shader not loaded: {e:#}"),
        }
        match ShaderWatcher::new(&path) {
            Ok(watcher) => self.shader_watcher = Some(watcher),
            Err(e) => log::warn!("Shader hot reload disabled: {e:#}"),
        }
    }

    pub fn set_loop_start_ms(&mut self, start_ms: i64) {
        self.config.loop_start_ms = start_ms;
        self.player.set_loop_start_ms(start_ms);
    }

    pub fn set_loop_end_ms(&mut self, end_ms: i64) {
        self.config.loop_end_ms = end_ms;
        self.player.set_loop_end_ms(end_ms);
    }

    pub fn set_loop_seek_mode(&mut self, mode: SeekMode) {
        self.config.loop_seek_mode = mode;
        self.player.set_loop_seek_mode(mode);
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.config.looping = looping;
        self.player.set_looping(looping);
    }

    pub fn set_auto_play_after_resume(&mut self, enabled: bool) {
        self.config.auto_play_after_resume = enabled;
        self.player.set_auto_play_after_resume(enabled);
    }

    fn publish_render_config(&mut self) {
        let next = self.config.render_config();
        let generation = self.render_config.update(|c| *c = next);
        log::debug!("Render config published (generation {generation})");
    }

    // -- sources --------------------------------------------------------

    pub fn set_video_from_assets(&mut self, name: &str) -> Result<(), PlayerError> {
        self.set_video(&VideoSource::Asset(name.to_string()))
    }

    pub fn set_video_from_assets_packed(
        &mut self,
        name: &str,
        packed: bool,
    ) -> Result<(), PlayerError> {
        self.set_packed(packed);
        self.set_video_from_assets(name)
    }

    pub fn set_video_by_url(&mut self, url: &str) -> Result<(), PlayerError> {
        self.set_video(&VideoSource::Url(url.to_string()))
    }

    pub fn set_video_from_resource_id(&mut self, id: u32) -> Result<(), PlayerError> {
        self.set_video(&VideoSource::Resource(id))
    }

    pub fn set_video_from_file(
        &mut self,
        path: impl Into<PathBuf>,
        range: Option<ByteRange>,
    ) -> Result<(), PlayerError> {
        self.set_video(&VideoSource::File {
            path: path.into(),
            range,
        })
    }

    pub fn set_video_from_descriptor(
        &mut self,
        fd: i32,
        range: Option<ByteRange>,
    ) -> Result<(), PlayerError> {
        self.set_video(&VideoSource::Descriptor { fd, range })
    }

    pub fn set_video_from_data_source(
        &mut self,
        source: Arc<dyn MediaDataSource>,
    ) -> Result<(), PlayerError> {
        self.set_video(&VideoSource::DataSource(source))
    }

    /// Reset, then point the component at `source`. Failures are logged and
    /// returned; the component stays usable.
    pub fn set_video(&mut self, source: &VideoSource) -> Result<(), PlayerError> {
        self.frames.clear();
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.clear_frame();
        }
        let resolved = match self.resolver.resolve(source) {
            Ok(resolved) => resolved,
            Err(e) => {
                log::error!("Cannot open {source:?}: {e}");
                self.player.reset();
                self.refresh_geometry();
                return Err(e);
            }
        };
        log::info!("Setting video source {source:?}");
        let result = self.player.set_source(resolved);
        self.refresh_geometry();
        result.map(|_| ())
    }

    // -- transport ------------------------------------------------------

    pub fn start(&mut self) {
        self.player.start();
    }

    pub fn pause(&mut self) {
        self.player.pause();
    }

    pub fn stop(&mut self) {
        self.player.stop();
    }

    pub fn reset(&mut self) {
        self.player.reset();
        self.frames.clear();
        self.refresh_geometry();
    }

    pub fn release(&mut self) {
        self.player.release();
        self.shader_watcher = None;
        self.renderer = None;
    }

    pub fn seek_to(&mut self, position_ms: u64) {
        self.player.seek_to(position_ms);
    }

    pub fn position_ms(&self) -> Result<u64, PlayerError> {
        self.player.position_ms()
    }

    pub fn state(&self) -> PlaybackState {
        self.player.state()
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    pub fn is_paused(&self) -> bool {
        self.player.is_paused()
    }

    pub fn is_stopped(&self) -> bool {
        self.player.is_stopped()
    }

    pub fn is_released(&self) -> bool {
        self.player.is_released()
    }

    // -- host lifecycle -------------------------------------------------

    pub fn on_pause(&mut self) {
        self.player.on_pause();
    }

    pub fn on_resume(&mut self) {
        self.player.on_resume();
    }

    /// The host removed the component; tear everything down.
    pub fn on_detach(&mut self) {
        self.player.on_detach();
        self.shader_watcher = None;
        self.renderer = None;
        self.target = None;
    }

    // -- layout ---------------------------------------------------------

    pub fn geometry(&self) -> VideoGeometry {
        self.geometry
    }

    /// Size to occupy inside an `avail_w` x `avail_h` layout box.
    pub fn measure(&self, avail_w: u32, avail_h: u32) -> (u32, u32) {
        self.geometry.measure(avail_w, avail_h)
    }

    fn refresh_geometry(&mut self) {
        let meta = self.player.meta();
        self.geometry_source = meta;
        self.geometry = match meta {
            Some(meta) => VideoGeometry::from_natural(
                meta.width,
                meta.height,
                self.config.packed.then_some(self.config.pack_layout),
            ),
            None => VideoGeometry::default(),
        };
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.set_geometry(self.geometry);
        }
    }

    // -- surface and frame pump -----------------------------------------

    /// The host bound a drawable surface. Playback waiting on it may start.
    pub fn on_surface_prepared(&mut self, device: &Device, target: SurfaceTarget) {
        if self.player.is_released() {
            return;
        }
        self.target = Some(target);
        self.renderer = None;
        self.failed_generation = None;
        self.bind_renderer(device);
    }

    pub fn on_surface_resized(&mut self, width: u32, height: u32) {
        if let Some(target) = self.target.as_mut() {
            target.width = width;
            target.height = height;
        }
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(width, height);
        }
    }

    pub fn on_surface_destroyed(&mut self) {
        self.renderer = None;
        self.target = None;
        self.player.on_surface_lost();
    }

    fn bind_renderer(&mut self, device: &Device) {
        let Some(target) = self.target else { return };
        match AlphaRenderer::new(device, target, self.render_config.clone()) {
            Ok(mut renderer) => {
                renderer.set_geometry(self.geometry);
                self.renderer = Some(renderer);
                self.failed_generation = None;
                self.player.on_surface_prepared();
            }
            Err(e) => {
                self.failed_generation = Some(self.render_config.generation());
                self.player.fail_playback(e);
            }
        }
    }

    /// Pump decoder events, the position watcher and shader hot reload.
    /// Call once per host loop iteration.
    pub fn update(&mut self, now: Instant) {
        if let Some(changed) = self.shader_watcher.as_ref().and_then(ShaderWatcher::poll) {
            match changed {
                Ok(source) => self.set_custom_shader(Some(source)),
                Err(e) => log::warn!("Shader reload skipped: {e:#}"),
            }
        }
        self.player.update(now);
        if self.player.meta() != self.geometry_source {
            self.refresh_geometry();
        }
    }

    /// When [`update`](Self::update) next needs to run for loop timing.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.player.next_deadline()
    }

    /// Record one frame into `encoder` targeting `target_view`. Returns
    /// whether a video frame was drawn. Without a bound surface nothing is
    /// touched.
    pub fn draw(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        target_view: &TextureView,
    ) -> bool {
        if self.renderer.is_none()
            && self.target.is_some()
            && self.failed_generation != Some(self.render_config.generation())
        {
            self.bind_renderer(device);
        }
        let Some(renderer) = self.renderer.as_mut() else {
            return false;
        };

        // A failed rebuild keeps drawing with the previous pipeline
        let refreshed = renderer.refresh(device);
        if let Some(frame) = self.frames.take() {
            renderer.upload_frame(device, queue, &frame);
        }
        let drew = renderer.render(queue, encoder, target_view);
        if let Err(e) = refreshed {
            self.player.fail_playback(e);
        }
        drew
    }
}
