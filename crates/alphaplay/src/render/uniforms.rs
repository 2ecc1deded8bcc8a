use bytemuck::{Pod, Zeroable};

use super::config::RenderConfig;

/// Uniforms for the alpha shaders (64 bytes).
/// Must be kept in sync with the WGSL `AlphaUniforms` struct.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct AlphaUniforms {
    pub key_color: [f32; 4],
    // 16 bytes
    pub scale: [f32; 2],
    pub offset: [f32; 2],
    // 32 bytes
    pub threshold: f32,
    pub softness: f32,
    pub pack_layout: u32,
    pub premultiply: u32,
    // 48 bytes
    pub srgb_target: u32,
    pub time: f32,
    pub _pad: [f32; 2],
}

/// Properties of the surface the renderer draws into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetInfo {
    pub premultiplied: bool,
    pub srgb: bool,
}

impl AlphaUniforms {
    pub fn new(
        config: &RenderConfig,
        letterbox: ([f32; 2], [f32; 2]),
        target: TargetInfo,
        time: f32,
    ) -> Self {
        let (scale, offset) = letterbox;
        Self {
            key_color: config.key_color().to_rgba_f32(),
            scale,
            offset,
            threshold: config.threshold(),
            softness: config.softness(),
            pack_layout: config.pack_layout.as_u32(),
            premultiply: u32::from(target.premultiplied),
            srgb_target: u32::from(target.srgb),
            time,
            _pad: [0.0; 2],
        }
    }
}
