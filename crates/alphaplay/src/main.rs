use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use alphaplay::gpu::GpuContext;
use alphaplay::media::SourceResolver;
use alphaplay::{AlphaVideoView, Argb, PlaybackListener, PlayerConfig, PlayerError};

const USAGE: &str = "usage: alphaplay <video> [--config <file.json>] [--packed] [--key <#RRGGBB>] \
[--accuracy <0..1>] [--loop-start <ms>] [--loop-end <ms>] [--shader <file.wgsl>]";

/// Largest window the video is fitted into on startup.
const MAX_WINDOW: (u32, u32) = (1280, 720);

#[derive(Debug, Default, PartialEq)]
struct Args {
    video: PathBuf,
    config: Option<PathBuf>,
    packed: bool,
    key: Option<Argb>,
    accuracy: Option<f32>,
    loop_start_ms: Option<i64>,
    loop_end_ms: Option<i64>,
    shader: Option<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut video = None;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().with_context(|| format!("{flag} needs a value"));
        match arg.as_str() {
            "--config" => parsed.config = Some(value("--config")?.into()),
            "--packed" => parsed.packed = true,
            "--key" => {
                let raw = value("--key")?;
                parsed.key = Some(raw.parse().map_err(anyhow::Error::msg)?);
            }
            "--accuracy" => parsed.accuracy = Some(value("--accuracy")?.parse()?),
            "--loop-start" => parsed.loop_start_ms = Some(value("--loop-start")?.parse()?),
            "--loop-end" => parsed.loop_end_ms = Some(value("--loop-end")?.parse()?),
            "--shader" => parsed.shader = Some(value("--shader")?.into()),
            flag if flag.starts_with("--") => bail!("unknown option {flag}\n{USAGE}"),
            _ if video.is_none() => video = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument {arg}\n{USAGE}"),
        }
    }
    parsed.video = video.context(USAGE)?;
    Ok(parsed)
}

impl Args {
    fn player_config(&self) -> PlayerConfig {
        let mut config = match &self.config {
            Some(path) => PlayerConfig::load(path),
            None => PlayerConfig::load(&PlayerConfig::config_path()),
        };
        config.packed |= self.packed;
        if let Some(key) = self.key {
            config.alpha_color = Some(key);
        }
        if let Some(accuracy) = self.accuracy {
            config.accuracy = accuracy;
        }
        if let Some(start) = self.loop_start_ms {
            config.loop_start_ms = start;
        }
        if let Some(end) = self.loop_end_ms {
            config.loop_end_ms = end;
        }
        if self.shader.is_some() {
            config.custom_shader_path = self.shader.clone();
        }
        config
    }
}

struct LogListener;

impl PlaybackListener for LogListener {
    fn on_video_started(&mut self) {
        log::info!("Video started");
    }

    fn on_video_ended(&mut self) {
        log::info!("Video ended");
    }

    fn on_error(&mut self, error: &PlayerError) {
        log::error!("Playback error: {error}");
    }
}

struct AlphaPlayApp {
    view: AlphaVideoView,
    gpu: Option<GpuContext>,
    window: Option<Arc<Window>>,
}

impl AlphaPlayApp {
    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let Some(gpu) = self.gpu.as_ref() else {
            return Ok(());
        };
        let output = gpu.surface.get_current_texture()?;
        let frame_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("alphaplay-frame"),
            });
        self.view
            .draw(&gpu.device, &gpu.queue, &mut encoder, &frame_view);
        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(width, height);
            let target = gpu.surface_target();
            self.view.on_surface_resized(target.width, target.height);
        }
    }
}

impl ApplicationHandler for AlphaPlayApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.view.measure(MAX_WINDOW.0, MAX_WINDOW.1);
        let attrs = WindowAttributes::default()
            .with_title("alphaplay")
            .with_transparent(true)
            .with_decorations(false)
            .with_inner_size(winit::dpi::PhysicalSize::new(width.max(1), height.max(1)));

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        match GpuContext::new(window) {
            Ok(gpu) => {
                self.view
                    .on_surface_prepared(&gpu.device, gpu.surface_target());
                self.gpu = Some(gpu);
            }
            Err(e) => {
                log::error!("Failed to initialize GPU: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.view.on_detach();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::Focused(false) | WindowEvent::Occluded(true) => self.view.on_pause(),
            WindowEvent::Focused(true) | WindowEvent::Occluded(false) => self.view.on_resume(),
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                // Undecorated window: drag anywhere to move
                if let Some(window) = &self.window {
                    let _ = window.drag_window();
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match key {
                KeyCode::Escape => {
                    self.view.on_detach();
                    event_loop.exit();
                }
                KeyCode::Space => {
                    if self.view.is_playing() {
                        self.view.pause();
                    } else {
                        self.view.start();
                    }
                }
                KeyCode::Home => self.view.seek_to(0),
                _ => {}
            },
            WindowEvent::RedrawRequested => {
                self.view.update(Instant::now());

                match self.render() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        if let Some(gpu) = self.gpu.as_ref() {
                            let (w, h) = (gpu.surface_config.width, gpu.surface_config.height);
                            self.resize(w, h);
                        }
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of GPU memory");
                        self.view.on_detach();
                        event_loop.exit();
                    }
                    Err(e) => {
                        log::warn!("Surface error: {e}");
                    }
                }

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let config = args.player_config();

    let mut view = AlphaVideoView::new(config, SourceResolver::default());
    view.set_listener(Box::new(LogListener));
    if !alphaplay::media::ffmpeg::ffmpeg_available() {
        log::warn!("ffmpeg/ffprobe not found on PATH; playback will fail");
    }
    view.set_video_from_file(&args.video, None)
        .with_context(|| format!("opening {}", args.video.display()))?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(winit::event_loop::ControlFlow::Poll);

    let mut app = AlphaPlayApp {
        view,
        gpu: None,
        window: None,
    };
    event_loop.run_app(&mut app)?;

    Ok(())
}
