//! Chroma-key and packed-alpha video playback onto a transparent GPU surface.
//!
//! [`AlphaVideoView`] is the component a host embeds: it owns the playback
//! state machine, the decoder and the alpha renderer, and exposes the
//! property, source, transport and lifecycle surface.

pub mod config;
pub mod error;
pub mod gpu;
pub mod layout;
pub mod media;
pub mod player;
pub mod render;
pub mod shader;
pub mod view;

pub use config::{Argb, PackLayout, PlayerConfig};
pub use error::PlayerError;
pub use layout::VideoGeometry;
pub use media::{SeekMode, VideoSource};
pub use player::{AlphaVideoPlayer, PlaybackListener, PlaybackState};
pub use render::{AlphaRenderer, RenderConfig, SurfaceTarget};
pub use view::AlphaVideoView;
