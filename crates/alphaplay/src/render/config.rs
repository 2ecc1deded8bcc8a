use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::{Argb, PackLayout};

/// Key color used when none is configured.
pub const DEFAULT_KEY_COLOR: Argb = Argb::from_rgb(0, 255, 0);

/// Renderer-side configuration. Published as immutable snapshots; the draw
/// path never sees a half-applied update.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub packed: bool,
    pub pack_layout: PackLayout,
    pub alpha_color: Option<Argb>,
    /// Normalized key distance at or below which a pixel is transparent.
    pub accuracy: f32,
    pub softness: f32,
    /// Supersedes the built-in shaders when set.
    pub custom_shader: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            packed: false,
            pack_layout: PackLayout::TopBottom,
            alpha_color: None,
            accuracy: 0.95,
            softness: 0.05,
            custom_shader: None,
        }
    }
}

/// The alpha-detection mode a config resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaMode {
    Custom,
    Packed(PackLayout),
    KeyColor,
}

impl RenderConfig {
    pub fn mode(&self) -> AlphaMode {
        if self.custom_shader.is_some() {
            AlphaMode::Custom
        } else if self.packed {
            AlphaMode::Packed(self.pack_layout)
        } else {
            AlphaMode::KeyColor
        }
    }

    pub fn key_color(&self) -> Argb {
        self.alpha_color.unwrap_or(DEFAULT_KEY_COLOR)
    }

    /// `accuracy` clamped to `[0, 1]`; NaN counts as 0.
    pub fn threshold(&self) -> f32 {
        sanitize_unit(self.accuracy)
    }

    pub fn softness(&self) -> f32 {
        sanitize_unit(self.softness)
    }
}

fn sanitize_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

struct Published {
    generation: u64,
    config: Arc<RenderConfig>,
}

/// Single-writer cell publishing [`RenderConfig`] snapshots to the draw path.
pub struct RenderConfigCell {
    current: Mutex<Published>,
}

impl RenderConfigCell {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            current: Mutex::new(Published {
                generation: 0,
                config: Arc::new(config),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Published> {
        match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Current generation and config. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> (u64, Arc<RenderConfig>) {
        let published = self.lock();
        (published.generation, published.config.clone())
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Copy the current config, apply `f`, publish the result. Returns the
    /// new generation, or the old one when `f` changed nothing.
    pub fn update(&self, f: impl FnOnce(&mut RenderConfig)) -> u64 {
        let mut published = self.lock();
        let mut next = (*published.config).clone();
        f(&mut next);
        if next != *published.config {
            published.generation += 1;
            published.config = Arc::new(next);
        }
        published.generation
    }
}
