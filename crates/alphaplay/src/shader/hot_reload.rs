use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use notify_debouncer_mini::{DebouncedEventKind, Debouncer, new_debouncer};

const DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches one custom shader file and yields its new source after edits.
///
/// The parent directory is watched rather than the file itself so editors
/// that save by rename are still picked up.
pub struct ShaderWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    receiver: Receiver<()>,
    path: PathBuf,
}

impl ShaderWatcher {
    pub fn new(path: &Path) -> Result<Self> {
        let path = path
            .canonicalize()
            .with_context(|| format!("shader file {}", path.display()))?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .context("shader file has no parent directory")?;
        let (tx, rx): (Sender<()>, Receiver<()>) = crossbeam_channel::unbounded();

        let target = path.clone();
        let mut debouncer = new_debouncer(
            DEBOUNCE,
            move |res: Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>| {
                match res {
                    Ok(events) => {
                        let touched = events.iter().any(|event| {
                            event.kind == DebouncedEventKind::Any
                                && same_file(&event.path, &target)
                        });
                        if touched {
                            let _ = tx.send(());
                        }
                    }
                    Err(e) => log::warn!("Shader watcher error: {e}"),
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(&dir, notify::RecursiveMode::NonRecursive)?;
        log::info!("Watching {} for shader changes", path.display());

        Ok(Self {
            _debouncer: debouncer,
            receiver: rx,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drain pending change events. Returns the file's current source when it
    /// changed since the last call.
    pub fn poll(&self) -> Option<Result<String>> {
        let mut changed = false;
        while self.receiver.try_recv().is_ok() {
            changed = true;
        }
        if !changed {
            return None;
        }
        log::info!("Shader changed: {}", self.path.display());
        Some(read_shader(&self.path))
    }
}

/// Read a WGSL fragment shader from disk.
pub fn read_shader(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading shader {}", path.display()))
}

fn same_file(event_path: &Path, target: &Path) -> bool {
    event_path == target
        || event_path
            .canonicalize()
            .is_ok_and(|p| p == target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ShaderWatcher::new(&dir.path().join("nope.wgsl")).is_err());
    }

    #[test]
    fn no_change_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.wgsl");
        std::fs::write(&path, "// v1").unwrap();
        let watcher = ShaderWatcher::new(&path).unwrap();
        assert!(watcher.poll().is_none());
    }

    #[test]
    fn edit_is_reported_with_new_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.wgsl");
        std::fs::write(&path, "// v1").unwrap();
        let watcher = ShaderWatcher::new(&path).unwrap();
        std::fs::write(&path, "// v2").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(source) = watcher.poll() {
                assert_eq!(source.unwrap(), "// v2");
                break;
            }
            assert!(Instant::now() < deadline, "no change event within 5s");
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    #[test]
    fn sibling_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.wgsl");
        std::fs::write(&path, "// v1").unwrap();
        let watcher = ShaderWatcher::new(&path).unwrap();
        std::fs::write(dir.path().join("other.wgsl"), "// other").unwrap();
        std::thread::sleep(Duration::from_millis(400));
        assert!(watcher.poll().is_none());
    }
}
