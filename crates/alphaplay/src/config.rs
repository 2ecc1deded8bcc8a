use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::media::SeekMode;
use crate::player::LoopSpec;
use crate::render::RenderConfig;

/// A 32-bit color stored as `0xAARRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Argb(pub u32);

impl Argb {
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Argb(0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(self) -> u8 {
        self.0 as u8
    }

    /// Normalized `[r, g, b, a]` for shader uniforms.
    pub fn to_rgba_f32(self) -> [f32; 4] {
        [
            self.red() as f32 / 255.0,
            self.green() as f32 / 255.0,
            self.blue() as f32 / 255.0,
            self.alpha() as f32 / 255.0,
        ]
    }
}

impl FromStr for Argb {
    type Err = String;

    /// Accepts `#RRGGBB` (opaque) or `#AARRGGBB`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let value =
            u32::from_str_radix(hex, 16).map_err(|e| format!("invalid color '{s}': {e}"))?;
        match hex.len() {
            6 => Ok(Argb(0xFF00_0000 | value)),
            8 => Ok(Argb(value)),
            _ => Err(format!("invalid color '{s}': expected #RRGGBB or #AARRGGBB")),
        }
    }
}

impl fmt::Display for Argb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08X}", self.0)
    }
}

impl TryFrom<String> for Argb {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Argb> for String {
    fn from(c: Argb) -> Self {
        c.to_string()
    }
}

/// Which half of a packed frame carries the alpha mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackLayout {
    /// Color in the top half, alpha in the bottom half.
    #[default]
    TopBottom,
    /// Color in the left half, alpha in the right half.
    SideBySide,
}

impl PackLayout {
    pub fn as_u32(self) -> u32 {
        match self {
            PackLayout::TopBottom => 0,
            PackLayout::SideBySide => 1,
        }
    }
}

/// Property surface of the component. Every field can also be changed at
/// runtime through the matching setter on [`crate::AlphaVideoView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Key-color match threshold in `[0, 1]`.
    #[serde(default = "default_accuracy")]
    pub accuracy: f32,
    /// Color treated as transparent in key mode.
    #[serde(default)]
    pub alpha_color: Option<Argb>,
    #[serde(default)]
    pub packed: bool,
    #[serde(default)]
    pub pack_layout: PackLayout,
    /// Width of the alpha ramp above the key threshold.
    #[serde(default = "default_key_softness")]
    pub key_softness: f32,
    /// -1 means unset.
    #[serde(default = "default_unset")]
    pub loop_start_ms: i64,
    /// -1 means unset.
    #[serde(default = "default_unset")]
    pub loop_end_ms: i64,
    #[serde(default)]
    pub loop_seek_mode: SeekMode,
    /// Inline WGSL fragment source replacing the built-in shaders.
    #[serde(default)]
    pub custom_shader: Option<String>,
    /// File holding a custom WGSL fragment shader, watched for changes.
    #[serde(default)]
    pub custom_shader_path: Option<PathBuf>,
    #[serde(default)]
    pub auto_play_after_resume: bool,
    /// Loop the whole stream when no loop bound is set.
    #[serde(default = "default_true")]
    pub looping: bool,
}

fn default_version() -> u32 { 1 }
fn default_accuracy() -> f32 { 0.95 }
fn default_key_softness() -> f32 { 0.05 }
fn default_unset() -> i64 { -1 }
fn default_true() -> bool { true }

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            accuracy: 0.95,
            alpha_color: None,
            packed: false,
            pack_layout: PackLayout::TopBottom,
            key_softness: 0.05,
            loop_start_ms: -1,
            loop_end_ms: -1,
            loop_seek_mode: SeekMode::ClosestSync,
            custom_shader: None,
            custom_shader_path: None,
            auto_play_after_resume: false,
            looping: true,
        }
    }
}

impl PlayerConfig {
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("alphaplay").join("player.json")
    }

    /// Load from `path`, falling back to defaults on any failure.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded player config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse player config: {e}");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No player config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// The renderer's view of these properties.
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            packed: self.packed,
            pack_layout: self.pack_layout,
            alpha_color: self.alpha_color,
            accuracy: self.accuracy,
            softness: self.key_softness,
            custom_shader: self.custom_shader.clone(),
        }
    }

    /// The state machine's view of these properties.
    pub fn loop_spec(&self) -> LoopSpec {
        LoopSpec::from_raw(self.loop_start_ms, self.loop_end_ms, self.loop_seek_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_property_surface() {
        let c = PlayerConfig::default();
        assert!((c.accuracy - 0.95).abs() < 1e-6);
        assert_eq!(c.alpha_color, None);
        assert!(!c.packed);
        assert_eq!(c.loop_start_ms, -1);
        assert_eq!(c.loop_end_ms, -1);
        assert_eq!(c.loop_seek_mode, SeekMode::ClosestSync);
        assert_eq!(c.custom_shader, None);
        assert!(!c.auto_play_after_resume);
        assert!(c.looping);
    }

    #[test]
    fn argb_parse_and_display() {
        let green: Argb = "#00FF00".parse().unwrap();
        assert_eq!(green, Argb::from_rgb(0, 255, 0));
        assert_eq!(green.alpha(), 255);
        let translucent: Argb = "#8000FF00".parse().unwrap();
        assert_eq!(translucent.alpha(), 0x80);
        assert_eq!(translucent.to_string(), "#8000FF00");
        assert!("#12345".parse::<Argb>().is_err());
        assert!("#GGGGGG".parse::<Argb>().is_err());
    }

    #[test]
    fn argb_normalizes_channels() {
        let c = Argb::from_rgb(255, 0, 51);
        let [r, g, b, a] = c.to_rgba_f32();
        assert!((r - 1.0).abs() < 1e-6);
        assert!(g.abs() < 1e-6);
        assert!((b - 0.2).abs() < 1e-6);
        assert!((a - 1.0).abs() < 1e-6);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r##"{"packed": true, "alpha_color": "#00FF00", "loop_start_ms": 2000}"##;
        let c: PlayerConfig = serde_json::from_str(json).unwrap();
        assert!(c.packed);
        assert_eq!(c.alpha_color, Some(Argb::from_rgb(0, 255, 0)));
        assert_eq!(c.loop_start_ms, 2000);
        assert_eq!(c.loop_end_ms, -1);
        assert!((c.accuracy - 0.95).abs() < 1e-6);
        assert_eq!(c.pack_layout, PackLayout::TopBottom);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("player.json");
        let config = PlayerConfig {
            accuracy: 0.3,
            pack_layout: PackLayout::SideBySide,
            loop_seek_mode: SeekMode::Exact,
            ..PlayerConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(PlayerConfig::load(&path), config);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(PlayerConfig::load(&path), PlayerConfig::default());
        assert_eq!(
            PlayerConfig::load(&dir.path().join("missing.json")),
            PlayerConfig::default()
        );
    }

    #[test]
    fn derived_views() {
        let config = PlayerConfig {
            loop_start_ms: 2000,
            loop_end_ms: 5000,
            packed: true,
            ..PlayerConfig::default()
        };
        let spec = config.loop_spec();
        assert_eq!(spec.start_ms, Some(2000));
        assert_eq!(spec.end_ms, Some(5000));
        assert!(config.render_config().packed);
    }
}
