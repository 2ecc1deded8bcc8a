//! Test oracle: the alpha math of the built-in shaders, run on the CPU.
//!
//! The coefficients are checked against the constants parsed out of
//! `assets/shaders/alpha_common.wgsl`, so the threshold semantics pinned here
//! are the ones the GPU runs.

use super::config::{AlphaMode, RenderConfig};
use crate::config::PackLayout;
use crate::error::PlayerError;
use crate::media::DecodedFrame;

/// Luma weight in the key distance; chroma differences dominate so shadows
/// on the key backdrop still key out.
const LUMA_WEIGHT: f32 = 0.25;
/// Upper bound of the weighted distance, used to normalize into `[0, 1]`.
const MAX_DISTANCE: f32 = 1.5;
const LUMA: [f32; 3] = [0.299, 0.587, 0.114];
const CB_COEFF: [f32; 3] = [-0.168_736, -0.331_264, 0.5];
const CR_COEFF: [f32; 3] = [0.5, -0.418_688, -0.081_312];

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Full-range BT.601 YCbCr with chroma centered on 0.5.
pub fn rgb_to_ycbcr(c: [f32; 3]) -> [f32; 3] {
    [dot(c, LUMA), 0.5 + dot(c, CB_COEFF), 0.5 + dot(c, CR_COEFF)]
}

/// Normalized perceptual distance between a pixel and the key color.
pub fn key_distance(rgb: [f32; 3], key: [f32; 3]) -> f32 {
    let a = rgb_to_ycbcr(rgb);
    let b = rgb_to_ycbcr(key);
    let dy = a[0] - b[0];
    let dcb = a[1] - b[1];
    let dcr = a[2] - b[2];
    let d = (LUMA_WEIGHT * dy * dy + dcb * dcb + dcr * dcr).sqrt() / MAX_DISTANCE;
    if d.is_nan() { 1.0 } else { d.clamp(0.0, 1.0) }
}

/// Alpha for a key distance: 0 at or below `threshold`, then a linear ramp
/// of width `softness` up to opaque.
pub fn key_alpha(distance: f32, threshold: f32, softness: f32) -> f32 {
    if distance <= threshold {
        return 0.0;
    }
    ((distance - threshold) / softness.max(1e-6)).clamp(0.0, 1.0)
}

fn to_unit(p: [u8; 4]) -> [f32; 3] {
    [
        f32::from(p[0]) / 255.0,
        f32::from(p[1]) / 255.0,
        f32::from(p[2]) / 255.0,
    ]
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Composite a decoded frame into straight-alpha RGBA the way the GPU path
/// does, using nearest sampling. Custom shaders only run on the GPU.
pub fn composite_frame(
    frame: &DecodedFrame,
    config: &RenderConfig,
) -> Result<DecodedFrame, PlayerError> {
    match config.mode() {
        AlphaMode::Custom => Err(PlayerError::RenderSetup(
            "custom shaders have no software path".into(),
        )),
        AlphaMode::KeyColor => Ok(composite_key(frame, config)),
        AlphaMode::Packed(layout) => Ok(composite_packed(frame, layout)),
    }
}

fn composite_key(frame: &DecodedFrame, config: &RenderConfig) -> DecodedFrame {
    let [kr, kg, kb, _] = config.key_color().to_rgba_f32();
    let threshold = config.threshold();
    let softness = config.softness();
    let mut data = Vec::with_capacity(frame.data.len());
    for px in frame.data.chunks_exact(4) {
        let p = [px[0], px[1], px[2], px[3]];
        let alpha = key_alpha(key_distance(to_unit(p), [kr, kg, kb]), threshold, softness);
        data.extend_from_slice(&[p[0], p[1], p[2], to_byte(alpha)]);
    }
    DecodedFrame {
        data,
        width: frame.width,
        height: frame.height,
        pts_ms: frame.pts_ms,
    }
}

fn composite_packed(frame: &DecodedFrame, layout: PackLayout) -> DecodedFrame {
    let (width, height) = match layout {
        PackLayout::TopBottom => (frame.width, frame.height / 2),
        PackLayout::SideBySide => (frame.width / 2, frame.height),
    };
    let mut data = Vec::with_capacity((width as usize) * (height as usize) * 4);
    for y in 0..height {
        for x in 0..width {
            let (ax, ay) = match layout {
                PackLayout::TopBottom => (x, y + height),
                PackLayout::SideBySide => (x + width, y),
            };
            let color = frame.pixel(x, y).unwrap_or([0; 4]);
            let mask = frame.pixel(ax, ay).unwrap_or([0; 4]);
            let m = to_unit(mask);
            let alpha = dot(m, LUMA);
            data.extend_from_slice(&[color[0], color[1], color[2], to_byte(alpha)]);
        }
    }
    DecodedFrame {
        data,
        width,
        height,
        pts_ms: frame.pts_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Argb;

    fn frame_of(pixels: &[[u8; 4]], width: u32, height: u32) -> DecodedFrame {
        DecodedFrame {
            data: pixels.iter().flatten().copied().collect(),
            width,
            height,
            pts_ms: 0,
        }
    }

    fn key_config(accuracy: f32) -> RenderConfig {
        RenderConfig {
            alpha_color: Some(Argb::from_rgb(0, 255, 0)),
            accuracy,
            ..RenderConfig::default()
        }
    }

    fn alphas(frame: &DecodedFrame) -> Vec<u8> {
        frame.data.chunks_exact(4).map(|p| p[3]).collect()
    }

    fn wgsl_floats(module: &naga::Module, handle: naga::Handle<naga::Expression>) -> Vec<f32> {
        match &module.global_expressions[handle] {
            naga::Expression::Literal(naga::Literal::F32(v)) => vec![*v],
            naga::Expression::Literal(naga::Literal::AbstractFloat(v)) => vec![*v as f32],
            naga::Expression::Unary {
                op: naga::UnaryOperator::Negate,
                expr,
            } => wgsl_floats(module, *expr).into_iter().map(|v| -v).collect(),
            naga::Expression::Compose { components, .. } => components
                .iter()
                .flat_map(|&c| wgsl_floats(module, c))
                .collect(),
            other => panic!("unexpected constant expression {other:?}"),
        }
    }

    fn wgsl_const(module: &naga::Module, name: &str) -> Vec<f32> {
        let (_, constant) = module
            .constants
            .iter()
            .find(|(_, c)| c.name.as_deref() == Some(name))
            .unwrap_or_else(|| panic!("alpha_common.wgsl has no const {name}"));
        wgsl_floats(module, constant.init)
    }

    #[test]
    fn coefficients_match_shader() {
        let module = naga::front::wgsl::parse_str(crate::render::shaders::ALPHA_COMMON).unwrap();
        assert_eq!(wgsl_const(&module, "LUMA"), LUMA.to_vec());
        assert_eq!(wgsl_const(&module, "CB_COEFF"), CB_COEFF.to_vec());
        assert_eq!(wgsl_const(&module, "CR_COEFF"), CR_COEFF.to_vec());
        assert_eq!(wgsl_const(&module, "LUMA_WEIGHT"), vec![LUMA_WEIGHT]);
        assert_eq!(wgsl_const(&module, "MAX_DISTANCE"), vec![MAX_DISTANCE]);
    }

    #[test]
    fn identical_colors_have_zero_distance() {
        assert_eq!(key_distance([0.2, 0.7, 0.1], [0.2, 0.7, 0.1]), 0.0);
    }

    #[test]
    fn distance_is_normalized() {
        let extremes = [
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [0.0, 1.0, 1.0],
            [1.0, 1.0, 0.0],
        ];
        for a in extremes {
            for b in extremes {
                let d = key_distance(a, b);
                assert!((0.0..=1.0).contains(&d), "{a:?} vs {b:?} -> {d}");
            }
        }
    }

    #[test]
    fn alpha_ramp() {
        assert_eq!(key_alpha(0.1, 0.2, 0.1), 0.0);
        assert_eq!(key_alpha(0.2, 0.2, 0.1), 0.0);
        assert!((key_alpha(0.25, 0.2, 0.1) - 0.5).abs() < 1e-5);
        assert_eq!(key_alpha(0.9, 0.2, 0.1), 1.0);
        // Zero softness is a hard edge
        assert_eq!(key_alpha(0.2001, 0.2, 0.0), 1.0);
    }

    #[test]
    fn accuracy_zero_keys_only_exact_matches() {
        let frame = frame_of(
            &[[0, 255, 0, 255], [1, 255, 0, 255], [0, 254, 0, 255], [255, 0, 255, 255]],
            4,
            1,
        );
        let out = composite_frame(&frame, &key_config(0.0)).unwrap();
        let a = alphas(&out);
        assert_eq!(a[0], 0, "exact key color is fully transparent");
        assert!(a[1] > 0 && a[2] > 0, "near misses are not fully transparent");
        assert_eq!(a[3], 255);
    }

    #[test]
    fn accuracy_one_keys_everything() {
        let frame = frame_of(
            &[[0, 0, 0, 255], [255, 255, 255, 255], [255, 0, 255, 255], [12, 34, 56, 255]],
            2,
            2,
        );
        let out = composite_frame(&frame, &key_config(1.0)).unwrap();
        assert!(alphas(&out).iter().all(|&a| a == 0));
    }

    #[test]
    fn color_channels_pass_through() {
        let frame = frame_of(&[[200, 10, 30, 255]], 1, 1);
        let out = composite_frame(&frame, &key_config(0.1)).unwrap();
        assert_eq!(&out.data[..3], &[200, 10, 30]);
    }

    #[test]
    fn packed_top_bottom_uses_bottom_half_as_alpha() {
        // 2x2 frame: row 0 color, row 1 mask
        let frame = frame_of(
            &[[255, 0, 0, 255], [0, 0, 255, 255], [255, 255, 255, 255], [0, 0, 0, 255]],
            2,
            2,
        );
        let config = RenderConfig {
            packed: true,
            ..RenderConfig::default()
        };
        let out = composite_frame(&frame, &config).unwrap();
        assert_eq!((out.width, out.height), (2, 1));
        assert_eq!(out.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(out.pixel(1, 0), Some([0, 0, 255, 0]));
    }

    #[test]
    fn packed_side_by_side_uses_right_half_as_alpha() {
        let frame = frame_of(
            &[[10, 20, 30, 255], [128, 128, 128, 255]],
            2,
            1,
        );
        let config = RenderConfig {
            packed: true,
            pack_layout: PackLayout::SideBySide,
            ..RenderConfig::default()
        };
        let out = composite_frame(&frame, &config).unwrap();
        assert_eq!((out.width, out.height), (1, 1));
        assert_eq!(out.pixel(0, 0), Some([10, 20, 30, 128]));
    }

    #[test]
    fn custom_shader_has_no_software_path() {
        let config = RenderConfig {
            custom_shader: Some(String::new()),
            ..RenderConfig::default()
        };
        let frame = frame_of(&[[0, 0, 0, 255]], 1, 1);
        assert!(matches!(
            composite_frame(&frame, &config),
            Err(PlayerError::RenderSetup(_))
        ));
    }
}
