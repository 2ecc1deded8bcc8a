use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::error::PlayerError;

/// Random-access byte source for videos held in memory or produced by the host.
pub trait MediaDataSource: Send + Sync {
    /// Read up to `buf.len()` bytes at `position`. Returns 0 at end of data.
    fn read_at(&self, position: u64, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Total size in bytes, if known.
    fn size(&self) -> Option<u64>;
}

/// A data source over an owned byte buffer.
pub struct BytesSource {
    bytes: Arc<[u8]>,
}

impl BytesSource {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl MediaDataSource for BytesSource {
    fn read_at(&self, position: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        let Ok(start) = usize::try_from(position) else {
            return Ok(0);
        };
        if start >= self.bytes.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.bytes.len() - start);
        buf[..n].copy_from_slice(&self.bytes[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> Option<u64> {
        Some(self.bytes.len() as u64)
    }
}

/// A contiguous region of a file holding the video container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

/// Every way the host can point the component at a video.
#[derive(Clone)]
pub enum VideoSource {
    /// Path relative to the bundled asset root.
    Asset(String),
    /// Remote or `file://` URL.
    Url(String),
    /// Raw resource identifier registered with the resolver.
    Resource(u32),
    /// A file on disk, optionally restricted to a byte range.
    File {
        path: PathBuf,
        range: Option<ByteRange>,
    },
    /// An already-open file descriptor, optionally restricted to a byte range.
    Descriptor { fd: i32, range: Option<ByteRange> },
    /// Opaque in-memory data source.
    DataSource(Arc<dyn MediaDataSource>),
}

impl fmt::Debug for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoSource::Asset(name) => write!(f, "Asset({name})"),
            VideoSource::Url(url) => write!(f, "Url({url})"),
            VideoSource::Resource(id) => write!(f, "Resource({id})"),
            VideoSource::File { path, range } => {
                write!(f, "File({}, {range:?})", path.display())
            }
            VideoSource::Descriptor { fd, range } => write!(f, "Descriptor({fd}, {range:?})"),
            VideoSource::DataSource(src) => write!(f, "DataSource({:?} bytes)", src.size()),
        }
    }
}

/// A source reduced to something a demuxer can open.
#[derive(Clone)]
pub enum ResolvedSource {
    /// A path, URL or protocol string accepted as an input location.
    Location(String),
    /// Bytes pulled sequentially from a data source.
    Stream(Arc<dyn MediaDataSource>),
}

impl fmt::Debug for ResolvedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedSource::Location(loc) => write!(f, "Location({loc})"),
            ResolvedSource::Stream(src) => write!(f, "Stream({:?} bytes)", src.size()),
        }
    }
}

/// Resolves asset names, resource ids and descriptors into openable inputs.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    asset_root: PathBuf,
    resources: HashMap<u32, PathBuf>,
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::new(default_asset_root())
    }
}

/// `assets/` next to the executable, falling back to the working directory.
pub fn default_asset_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("assets")))
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(|| PathBuf::from("assets"))
}

impl SourceResolver {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
            resources: HashMap::new(),
        }
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    /// Make a raw resource id resolvable.
    pub fn register_resource(&mut self, id: u32, path: impl Into<PathBuf>) {
        self.resources.insert(id, path.into());
    }

    pub fn resolve(&self, source: &VideoSource) -> Result<ResolvedSource, PlayerError> {
        match source {
            VideoSource::Asset(name) => {
                let path = self.asset_path(name)?;
                Ok(ResolvedSource::Location(path_location(&path, None)))
            }
            VideoSource::Url(url) => resolve_url(url),
            VideoSource::Resource(id) => {
                let path = self
                    .resources
                    .get(id)
                    .ok_or_else(|| PlayerError::source(format!("unknown resource id {id}")))?;
                require_file(path)?;
                Ok(ResolvedSource::Location(path_location(path, None)))
            }
            VideoSource::File { path, range } => {
                require_file(path)?;
                validate_range(*range)?;
                Ok(ResolvedSource::Location(path_location(path, *range)))
            }
            VideoSource::Descriptor { fd, range } => {
                validate_range(*range)?;
                let path = descriptor_path(*fd)?;
                Ok(ResolvedSource::Location(path_location(&path, *range)))
            }
            VideoSource::DataSource(src) => {
                if src.size() == Some(0) {
                    return Err(PlayerError::source("data source is empty"));
                }
                Ok(ResolvedSource::Stream(src.clone()))
            }
        }
    }

    fn asset_path(&self, name: &str) -> Result<PathBuf, PlayerError> {
        let relative = Path::new(name);
        if name.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(PlayerError::source(format!("invalid asset name '{name}'")));
        }
        let path = self.asset_root.join(relative);
        require_file(&path)?;
        Ok(path)
    }
}

fn resolve_url(url: &str) -> Result<ResolvedSource, PlayerError> {
    let Some((scheme, rest)) = url.split_once("://") else {
        return Err(PlayerError::source(format!("not a URL: '{url}'")));
    };
    if rest.is_empty() {
        return Err(PlayerError::source(format!("URL has no target: '{url}'")));
    }
    match scheme.to_ascii_lowercase().as_str() {
        "file" => {
            let path = PathBuf::from(rest);
            require_file(&path)?;
            Ok(ResolvedSource::Location(path_location(&path, None)))
        }
        "http" | "https" | "rtsp" | "rtmp" => Ok(ResolvedSource::Location(url.to_string())),
        other => Err(PlayerError::source(format!("unsupported URL scheme '{other}'"))),
    }
}

fn require_file(path: &Path) -> Result<(), PlayerError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PlayerError::source(format!(
            "cannot open {}",
            path.display()
        )))
    }
}

fn validate_range(range: Option<ByteRange>) -> Result<(), PlayerError> {
    match range {
        Some(r) if r.length == 0 => Err(PlayerError::source("byte range is empty")),
        Some(r) if r.offset.checked_add(r.length).is_none() => {
            Err(PlayerError::source("byte range overflows"))
        }
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn descriptor_path(fd: i32) -> Result<PathBuf, PlayerError> {
    if fd < 0 {
        return Err(PlayerError::source(format!("invalid file descriptor {fd}")));
    }
    Ok(PathBuf::from(format!("/dev/fd/{fd}")))
}

#[cfg(not(unix))]
fn descriptor_path(fd: i32) -> Result<PathBuf, PlayerError> {
    Err(PlayerError::source(format!(
        "file descriptor sources are not supported on this platform (fd {fd})"
    )))
}

/// Input location for a path, using the `subfile` protocol for byte ranges.
fn path_location(path: &Path, range: Option<ByteRange>) -> String {
    match range {
        Some(r) => format!(
            "subfile,,start,{},end,{},,:{}",
            r.offset,
            r.offset + r.length,
            path.display()
        ),
        None => path.display().to_string(),
    }
}
