//! Streaming decoder backed by ffmpeg/ffprobe subprocesses.
//!
//! - `ffprobe` extracts metadata (dimensions, fps, duration) synchronously
//! - `ffmpeg -f rawvideo -pix_fmt rgba` streams frames on a decode thread, paced by
//!   the stream frame rate; only the newest frame is kept (see [`FrameSlot`])
//! - seeks respawn ffmpeg at the target with input-side `-ss`; sync seek modes
//!   add `-noaccurate_seek` so the output starts on a keyframe. `NextSync` first
//!   asks ffprobe for the keyframe at or after the target

use std::io::{Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use super::decoder::Decoder;
use super::source::{MediaDataSource, ResolvedSource};
use super::types::{
    DecodedFrame, DecoderCapabilities, DecoderEvent, FrameSlot, SeekMode, VideoMeta,
};
use crate::error::PlayerError;

/// Chunk size used when feeding an in-memory source into ffmpeg's stdin.
const FEED_CHUNK: usize = 64 * 1024;

/// Check if ffmpeg/ffprobe are available on the system. Cached per process.
pub fn ffmpeg_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        Command::new("ffprobe")
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    })
}

/// Probe video metadata using ffprobe.
pub fn probe_video(source: &ResolvedSource) -> Result<VideoMeta, PlayerError> {
    let mut cmd = Command::new("ffprobe");
    cmd.args([
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_streams",
        "-show_format",
    ]);
    let feed = match source {
        ResolvedSource::Location(loc) => {
            cmd.arg(loc).stdin(Stdio::null());
            None
        }
        ResolvedSource::Stream(src) => {
            cmd.arg("pipe:0").stdin(Stdio::piped());
            Some(src.clone())
        }
    };
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| PlayerError::source(format!("ffprobe failed to execute: {e}")))?;

    let feeder = match (feed, child.stdin.take()) {
        (Some(src), Some(stdin)) => Some(spawn_feeder(src, stdin)),
        _ => None,
    };

    let output = child
        .wait_with_output()
        .map_err(|e| PlayerError::source(format!("ffprobe failed: {e}")))?;
    if let Some(handle) = feeder {
        let _ = handle.join();
    }

    if !output.status.success() {
        return Err(PlayerError::source("ffprobe returned non-zero exit code"));
    }

    parse_probe_json(&output.stdout)
}

/// Seconds of stream scanned when looking for the next keyframe.
const KEYFRAME_WINDOW_SECS: u32 = 10;

/// Time of the first keyframe at or after `target_ms`. Only file and URL
/// sources can be probed this way; streamed sources return `None`.
fn next_keyframe_ms(source: &ResolvedSource, target_ms: u64) -> Option<u64> {
    let ResolvedSource::Location(loc) = source else {
        return None;
    };
    let interval = format!(
        "{:.3}%+{KEYFRAME_WINDOW_SECS}",
        target_ms as f64 / 1000.0
    );
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-select_streams",
            "v:0",
            "-skip_frame",
            "nokey",
            "-show_entries",
            "frame=pts_time",
            "-of",
            "csv=p=0",
            "-read_intervals",
            &interval,
        ])
        .arg(loc)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    parse_next_keyframe(&String::from_utf8_lossy(&output.stdout), target_ms)
}

/// Pick the first keyframe time at or after `target_ms` from ffprobe's
/// one-timestamp-per-line csv output.
fn parse_next_keyframe(csv: &str, target_ms: u64) -> Option<u64> {
    csv.lines()
        .filter_map(|line| line.trim().trim_end_matches(',').parse::<f64>().ok())
        .map(|secs| (secs * 1000.0).round().max(0.0) as u64)
        .filter(|&ms| ms >= target_ms)
        .min()
}

/// Extract [`VideoMeta`] from `ffprobe -print_format json` output.
pub fn parse_probe_json(json: &[u8]) -> Result<VideoMeta, PlayerError> {
    let json: serde_json::Value = serde_json::from_slice(json)
        .map_err(|e| PlayerError::source(format!("Failed to parse ffprobe JSON: {e}")))?;

    let streams = json["streams"]
        .as_array()
        .ok_or_else(|| PlayerError::source("No streams in ffprobe output"))?;

    let video_stream = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"))
        .ok_or_else(|| PlayerError::source("No video stream found"))?;

    let width = video_stream["width"]
        .as_u64()
        .ok_or_else(|| PlayerError::source("Missing width"))? as u32;
    let height = video_stream["height"]
        .as_u64()
        .ok_or_else(|| PlayerError::source("Missing height"))? as u32;
    if width == 0 || height == 0 {
        return Err(PlayerError::source("Video stream has zero size"));
    }

    let fps = parse_frame_rate(video_stream["r_frame_rate"].as_str().unwrap_or("30/1"));

    let duration_secs = json["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| {
            video_stream["duration"]
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
        })
        .unwrap_or(0.0);

    Ok(VideoMeta {
        width,
        height,
        fps,
        duration_ms: (duration_secs * 1000.0).round().max(0.0) as u64,
    })
}

fn parse_frame_rate(rate: &str) -> f64 {
    let fps = if let Some((num, den)) = rate.split_once('/') {
        let n: f64 = num.parse().unwrap_or(30.0);
        let d: f64 = den.parse().unwrap_or(1.0);
        if d > 0.0 { n / d } else { 30.0 }
    } else {
        rate.parse().unwrap_or(30.0)
    };
    if fps.is_finite() && fps > 0.0 { fps } else { 30.0 }
}

/// Copy a data source into a child's stdin until EOF or the pipe closes.
fn spawn_feeder(src: Arc<dyn MediaDataSource>, mut stdin: ChildStdin) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = vec![0u8; FEED_CHUNK];
        let mut pos = 0u64;
        loop {
            match src.read_at(pos, &mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    // ffmpeg closes the pipe when killed or once it has enough input
                    if stdin.write_all(&buf[..n]).is_err() {
                        break;
                    }
                    pos += n as u64;
                }
                Err(e) => {
                    log::warn!("Data source read failed at {pos}: {e}");
                    break;
                }
            }
        }
    })
}

/// One running `ffmpeg` child producing raw RGBA frames from `start_ms`.
struct StreamProcess {
    child: Child,
    stdout: ChildStdout,
    feeder: Option<JoinHandle<()>>,
    width: u32,
    height: u32,
    fps: f64,
    start_ms: u64,
    frames_read: u64,
}

impl StreamProcess {
    fn spawn(
        source: &ResolvedSource,
        meta: &VideoMeta,
        start_ms: u64,
        accurate: bool,
    ) -> Result<Self, PlayerError> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "quiet"]);
        if start_ms > 0 {
            if !accurate {
                cmd.arg("-noaccurate_seek");
            }
            cmd.args(["-ss", &format!("{:.3}", start_ms as f64 / 1000.0)]);
        }
        let feed = match source {
            ResolvedSource::Location(loc) => {
                cmd.arg("-i").arg(loc).stdin(Stdio::null());
                None
            }
            ResolvedSource::Stream(src) => {
                cmd.args(["-i", "pipe:0"]).stdin(Stdio::piped());
                Some(src.clone())
            }
        };
        cmd.args([
            "-an",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", meta.width, meta.height),
            "pipe:1",
        ]);

        let mut child = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlayerError::decoder(format!("Failed to spawn ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PlayerError::decoder("ffmpeg: no stdout pipe"))?;
        let feeder = match (feed, child.stdin.take()) {
            (Some(src), Some(stdin)) => Some(spawn_feeder(src, stdin)),
            _ => None,
        };

        Ok(Self {
            child,
            stdout,
            feeder,
            width: meta.width,
            height: meta.height,
            fps: meta.fps,
            start_ms,
            frames_read: 0,
        })
    }

    fn pts_of(&self, index: u64) -> u64 {
        self.start_ms + (index as f64 * 1000.0 / self.fps).round() as u64
    }

    /// Presentation time of the frame the next `read_frame` will return.
    fn next_pts(&self) -> u64 {
        self.pts_of(self.frames_read)
    }

    /// Read the next frame, or None at end of stream.
    fn read_frame(&mut self) -> Option<DecodedFrame> {
        let mut data = vec![0u8; (self.width as usize) * (self.height as usize) * 4];
        self.stdout.read_exact(&mut data).ok()?;
        let pts_ms = self.next_pts();
        self.frames_read += 1;
        Some(DecodedFrame {
            data,
            width: self.width,
            height: self.height,
            pts_ms,
        })
    }
}

impl Drop for StreamProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(handle) = self.feeder.take() {
            let _ = handle.join();
        }
    }
}

enum WorkerCommand {
    Play,
    Pause,
    Seek { position_ms: u64, mode: SeekMode },
    Shutdown,
}

/// State shared between the decoder facade and its decode thread.
#[derive(Clone)]
struct Shared {
    events: Sender<DecoderEvent>,
    frames: FrameSlot,
    position_ms: Arc<AtomicU64>,
    looping: Arc<AtomicBool>,
}

struct DecodeWorker {
    source: ResolvedSource,
    meta: VideoMeta,
    shared: Shared,
    process: Option<StreamProcess>,
    playing: bool,
    at_end: bool,
    /// Wall clock instant and stream position playback was (re)anchored at.
    anchor: Option<(Instant, u64)>,
}

impl DecodeWorker {
    fn run(mut self, commands: Receiver<WorkerCommand>) {
        if let Err(e) = self.open_at(0, true) {
            let _ = self.shared.events.send(DecoderEvent::Error(e.to_string()));
            return;
        }
        let _ = self.shared.events.send(DecoderEvent::Prepared);
        let _ = self.shared.events.send(DecoderEvent::VideoSizeChanged {
            width: self.meta.width,
            height: self.meta.height,
        });

        loop {
            let command = if self.playing {
                match commands.recv_timeout(self.time_until_next_frame()) {
                    Ok(cmd) => Some(cmd),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            } else {
                match commands.recv() {
                    Ok(cmd) => Some(cmd),
                    Err(_) => return,
                }
            };

            match command {
                Some(WorkerCommand::Play) => self.play(),
                Some(WorkerCommand::Pause) => {
                    self.playing = false;
                    self.anchor = None;
                }
                Some(WorkerCommand::Seek { position_ms, mode }) => self.seek(position_ms, mode),
                Some(WorkerCommand::Shutdown) => return,
                None => self.advance(),
            }
        }
    }

    /// Spawn ffmpeg at `start_ms` and show its first frame.
    fn open_at(&mut self, start_ms: u64, accurate: bool) -> Result<(), PlayerError> {
        self.process = None;
        let mut process = StreamProcess::spawn(&self.source, &self.meta, start_ms, accurate)?;
        let first = process
            .read_frame()
            .ok_or_else(|| PlayerError::decoder("ffmpeg decoded zero frames"))?;
        self.shared.position_ms.store(first.pts_ms, Ordering::Relaxed);
        self.shared.frames.publish(first);
        self.process = Some(process);
        self.at_end = false;
        Ok(())
    }

    fn play(&mut self) {
        if self.at_end {
            if let Err(e) = self.open_at(0, true) {
                let _ = self.shared.events.send(DecoderEvent::Error(e.to_string()));
                return;
            }
        }
        self.playing = true;
        self.anchor = Some((
            Instant::now(),
            self.shared.position_ms.load(Ordering::Relaxed),
        ));
    }

    fn seek(&mut self, position_ms: u64, mode: SeekMode) {
        let target = clamp_to_duration(position_ms, &self.meta);
        let (start_ms, accurate) = match mode {
            SeekMode::NextSync => (
                next_keyframe_ms(&self.source, target).unwrap_or(target),
                false,
            ),
            mode => (target, mode.is_frame_accurate()),
        };
        match self.open_at(start_ms, accurate) {
            Ok(()) => {
                if self.playing {
                    self.anchor = Some((
                        Instant::now(),
                        self.shared.position_ms.load(Ordering::Relaxed),
                    ));
                }
                let _ = self.shared.events.send(DecoderEvent::SeekComplete {
                    position_ms: self.shared.position_ms.load(Ordering::Relaxed),
                });
            }
            Err(e) => {
                self.playing = false;
                let _ = self.shared.events.send(DecoderEvent::Error(e.to_string()));
            }
        }
    }

    fn time_until_next_frame(&self) -> Duration {
        let (Some(process), Some((instant, base_ms))) = (&self.process, self.anchor) else {
            return Duration::ZERO;
        };
        let due = instant + Duration::from_millis(process.next_pts().saturating_sub(base_ms));
        due.saturating_duration_since(Instant::now())
    }

    fn advance(&mut self) {
        let Some(process) = self.process.as_mut() else {
            self.playing = false;
            return;
        };
        match process.read_frame() {
            Some(frame) => {
                self.shared.position_ms.store(frame.pts_ms, Ordering::Relaxed);
                self.shared.frames.publish(frame);
            }
            None => self.end_of_stream(),
        }
    }

    fn end_of_stream(&mut self) {
        if self.shared.looping.load(Ordering::Relaxed) {
            match self.open_at(0, true) {
                Ok(()) => self.anchor = Some((Instant::now(), 0)),
                Err(e) => {
                    self.playing = false;
                    let _ = self.shared.events.send(DecoderEvent::Error(e.to_string()));
                }
            }
            return;
        }
        self.playing = false;
        self.at_end = true;
        self.anchor = None;
        self.process = None;
        let _ = self.shared.events.send(DecoderEvent::Completed);
    }
}

struct WorkerHandle {
    commands: Sender<WorkerCommand>,
    thread: JoinHandle<()>,
}

fn clamp_to_duration(position_ms: u64, meta: &VideoMeta) -> u64 {
    if meta.duration_ms > 0 {
        position_ms.min(meta.duration_ms)
    } else {
        position_ms
    }
}

/// [`Decoder`] that streams frames from an `ffmpeg` child process.
pub struct FfmpegDecoder {
    shared: Shared,
    source: Option<ResolvedSource>,
    meta: Option<VideoMeta>,
    worker: Option<WorkerHandle>,
    released: bool,
}

impl FfmpegDecoder {
    pub fn new(events: Sender<DecoderEvent>, frames: FrameSlot) -> Self {
        Self {
            shared: Shared {
                events,
                frames,
                position_ms: Arc::new(AtomicU64::new(0)),
                looping: Arc::new(AtomicBool::new(false)),
            },
            source: None,
            meta: None,
            worker: None,
            released: false,
        }
    }

    fn ensure_alive(&self) -> Result<(), PlayerError> {
        if self.released {
            Err(PlayerError::Released)
        } else {
            Ok(())
        }
    }

    fn send(&self, command: WorkerCommand) -> Result<(), PlayerError> {
        self.ensure_alive()?;
        let worker = self
            .worker
            .as_ref()
            .ok_or_else(|| PlayerError::decoder("decoder is not prepared"))?;
        worker
            .commands
            .send(command)
            .map_err(|_| PlayerError::decoder("decode thread exited"))
    }

    fn shutdown_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.commands.send(WorkerCommand::Shutdown);
            let _ = worker.thread.join();
        }
    }
}

impl Decoder for FfmpegDecoder {
    fn capabilities(&self) -> DecoderCapabilities {
        DecoderCapabilities {
            mode_aware_seek: true,
        }
    }

    fn set_source(&mut self, source: ResolvedSource) -> Result<(), PlayerError> {
        self.ensure_alive()?;
        if !ffmpeg_available() {
            return Err(PlayerError::source("ffmpeg/ffprobe not found on PATH"));
        }
        self.shutdown_worker();
        self.meta = None;
        self.source = Some(source);
        Ok(())
    }

    fn probe(&mut self) -> Result<VideoMeta, PlayerError> {
        self.ensure_alive()?;
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| PlayerError::source("no source set"))?;
        let meta = probe_video(source)?;
        log::info!(
            "Probed video: {}x{} @ {:.2} fps, {} ms",
            meta.width,
            meta.height,
            meta.fps,
            meta.duration_ms
        );
        self.meta = Some(meta);
        Ok(meta)
    }

    fn prepare_async(&mut self) -> Result<(), PlayerError> {
        self.ensure_alive()?;
        let source = self
            .source
            .clone()
            .ok_or_else(|| PlayerError::source("no source set"))?;
        let meta = match self.meta {
            Some(meta) => meta,
            None => self.probe()?,
        };
        self.shutdown_worker();
        self.shared.position_ms.store(0, Ordering::Relaxed);

        let (tx, rx) = crossbeam_channel::unbounded();
        let worker = DecodeWorker {
            source,
            meta,
            shared: self.shared.clone(),
            process: None,
            playing: false,
            at_end: false,
            anchor: None,
        };
        let thread = thread::Builder::new()
            .name("alphaplay-decode".into())
            .spawn(move || worker.run(rx))
            .map_err(|e| PlayerError::decoder(format!("Failed to spawn decode thread: {e}")))?;
        self.worker = Some(WorkerHandle {
            commands: tx,
            thread,
        });
        Ok(())
    }

    fn start(&mut self) -> Result<(), PlayerError> {
        self.send(WorkerCommand::Play)
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        self.send(WorkerCommand::Pause)
    }

    fn stop(&mut self) -> Result<(), PlayerError> {
        self.ensure_alive()?;
        self.shutdown_worker();
        self.shared.position_ms.store(0, Ordering::Relaxed);
        Ok(())
    }

    /// Queue the seek and report the target as the position right away, so
    /// readers polling before the respawn finishes see where playback is
    /// headed rather than where it was.
    fn seek(&mut self, position_ms: u64, mode: SeekMode) -> Result<(), PlayerError> {
        self.send(WorkerCommand::Seek { position_ms, mode })?;
        if let Some(meta) = &self.meta {
            let target = clamp_to_duration(position_ms, meta);
            self.shared.position_ms.store(target, Ordering::Relaxed);
        }
        Ok(())
    }

    fn position_ms(&self) -> Result<u64, PlayerError> {
        self.ensure_alive()?;
        Ok(self.shared.position_ms.load(Ordering::Relaxed))
    }

    fn set_looping(&mut self, looping: bool) {
        self.shared.looping.store(looping, Ordering::Relaxed);
    }

    fn reset(&mut self) {
        self.shutdown_worker();
        self.source = None;
        self.meta = None;
        self.shared.position_ms.store(0, Ordering::Relaxed);
        self.shared.frames.clear();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.reset();
        self.released = true;
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        self.shutdown_worker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::decoder::decoder_channel;

    #[test]
    fn frame_rate_parsing() {
        assert!((parse_frame_rate("30000/1001") - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("25") - 25.0).abs() < 1e-9);
        assert!((parse_frame_rate("24/0") - 30.0).abs() < 1e-9);
        assert!((parse_frame_rate("garbage") - 30.0).abs() < 1e-9);
        assert!((parse_frame_rate("0/1") - 30.0).abs() < 1e-9);
    }

    #[test]
    fn probe_json_picks_video_stream() {
        let json = br#"{
            "streams": [
                {"codec_type": "audio", "sample_rate": "48000"},
                {"codec_type": "video", "width": 720, "height": 2560, "r_frame_rate": "30/1"}
            ],
            "format": {"duration": "4.250000"}
        }"#;
        let meta = parse_probe_json(json).unwrap();
        assert_eq!(meta.width, 720);
        assert_eq!(meta.height, 2560);
        assert!((meta.fps - 30.0).abs() < 1e-9);
        assert_eq!(meta.duration_ms, 4250);
    }

    #[test]
    fn probe_json_without_video_is_source_error() {
        let json = br#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        assert!(matches!(
            parse_probe_json(json),
            Err(PlayerError::Source(_))
        ));
        assert!(parse_probe_json(b"not json").is_err());
    }

    #[test]
    fn probe_json_falls_back_to_stream_duration() {
        let json = br#"{
            "streams": [{"codec_type": "video", "width": 4, "height": 2, "duration": "1.5"}],
            "format": {}
        }"#;
        assert_eq!(parse_probe_json(json).unwrap().duration_ms, 1500);
    }

    #[test]
    fn transport_before_prepare_is_rejected() {
        let (tx, _rx) = decoder_channel();
        let mut decoder = FfmpegDecoder::new(tx, FrameSlot::new());
        assert!(matches!(decoder.start(), Err(PlayerError::Decoder(_))));
        assert!(decoder.prepare_async().is_err());
        assert_eq!(decoder.position_ms().unwrap(), 0);
    }

    #[test]
    fn next_keyframe_is_at_or_after_target() {
        let csv = "0.000000\n2.002000\n4.004000,\n\n6.006000\n";
        assert_eq!(parse_next_keyframe(csv, 2002), Some(2002));
        assert_eq!(parse_next_keyframe(csv, 2100), Some(4004));
        assert_eq!(parse_next_keyframe(csv, 0), Some(0));
        assert_eq!(parse_next_keyframe(csv, 7000), None);
        assert_eq!(parse_next_keyframe("N/A\n", 0), None);
    }

    #[test]
    fn streamed_source_has_no_keyframe_lookup() {
        let bytes = crate::media::BytesSource::new(vec![0u8; 4]);
        let source = ResolvedSource::Stream(Arc::new(bytes));
        assert_eq!(next_keyframe_ms(&source, 1000), None);
    }

    #[test]
    fn seek_reports_target_before_worker_lands() {
        let (tx, _rx) = decoder_channel();
        let mut decoder = FfmpegDecoder::new(tx, FrameSlot::new());
        decoder.meta = Some(VideoMeta {
            width: 4,
            height: 2,
            fps: 10.0,
            duration_ms: 4000,
        });
        decoder.shared.position_ms.store(5200, Ordering::Relaxed);
        // Idle worker: the command is queued but never executed
        let (commands, pending) = crossbeam_channel::unbounded();
        decoder.worker = Some(WorkerHandle {
            commands,
            thread: thread::spawn(|| {}),
        });

        decoder.seek(100, SeekMode::ClosestSync).unwrap();
        assert_eq!(decoder.position_ms().unwrap(), 100);
        decoder.seek(9000, SeekMode::NextSync).unwrap();
        assert_eq!(decoder.position_ms().unwrap(), 4000);

        let queued: Vec<_> = pending.try_iter().collect();
        assert!(matches!(
            queued.as_slice(),
            [
                WorkerCommand::Seek {
                    position_ms: 100,
                    mode: SeekMode::ClosestSync
                },
                WorkerCommand::Seek {
                    position_ms: 9000,
                    mode: SeekMode::NextSync
                },
            ]
        ));
    }

    #[test]
    fn release_is_idempotent_and_tombstones() {
        let (tx, _rx) = decoder_channel();
        let mut decoder = FfmpegDecoder::new(tx, FrameSlot::new());
        decoder.release();
        decoder.release();
        assert_eq!(decoder.position_ms(), Err(PlayerError::Released));
        assert_eq!(
            decoder.seek(10, SeekMode::Exact),
            Err(PlayerError::Released)
        );
    }
}
