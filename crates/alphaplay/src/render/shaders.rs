use super::config::{AlphaMode, RenderConfig};
use crate::gpu::fullscreen_quad::FULLSCREEN_TRIANGLE_VS_WITH_UV;

/// Uniform block, bindings and helpers every alpha fragment shader sees.
pub const ALPHA_COMMON: &str = include_str!("../../../../assets/shaders/alpha_common.wgsl");
const ALPHA_KEY_FS: &str = include_str!("../../../../assets/shaders/alpha_key.wgsl");
const ALPHA_PACKED_FS: &str = include_str!("../../../../assets/shaders/alpha_packed.wgsl");

/// Which fragment shader a render config selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderChoice<'a> {
    KeyColor,
    Packed,
    Custom(&'a str),
}

impl<'a> ShaderChoice<'a> {
    pub fn for_config(config: &'a RenderConfig) -> Self {
        match (config.mode(), config.custom_shader.as_deref()) {
            (AlphaMode::Custom, Some(source)) => ShaderChoice::Custom(source),
            (AlphaMode::Packed(_), _) => ShaderChoice::Packed,
            _ => ShaderChoice::KeyColor,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ShaderChoice::KeyColor => "alpha-key",
            ShaderChoice::Packed => "alpha-packed",
            ShaderChoice::Custom(_) => "alpha-custom",
        }
    }

    pub fn fragment(&self) -> &'a str {
        match self {
            ShaderChoice::KeyColor => ALPHA_KEY_FS,
            ShaderChoice::Packed => ALPHA_PACKED_FS,
            ShaderChoice::Custom(source) => source,
        }
    }

    /// Complete WGSL module: vertex stage, shared block, fragment stage.
    pub fn compose(&self) -> String {
        format!(
            "{}\n{}\n{}",
            FULLSCREEN_TRIANGLE_VS_WITH_UV,
            ALPHA_COMMON,
            self.fragment()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(source: &str) -> Result<(), String> {
        let module =
            naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| format!("{e:?}"))?;
        Ok(())
    }

    #[test]
    fn builtin_shaders_validate() {
        for choice in [ShaderChoice::KeyColor, ShaderChoice::Packed] {
            if let Err(e) = validate(&choice.compose()) {
                panic!("{} failed validation:\n{e}", choice.label());
            }
        }
    }

    #[test]
    fn bundled_custom_shader_validates() {
        let source = include_str!("../../../../assets/shaders/custom/soft_key.wgsl");
        validate(&ShaderChoice::Custom(source).compose()).unwrap();
    }

    #[test]
    fn broken_custom_shader_is_rejected() {
        let choice = ShaderChoice::Custom("@fragment fn fs_main() -> @location(0) vec4f { return nope; }");
        assert!(validate(&choice.compose()).is_err());
    }

    #[test]
    fn selection_follows_mode() {
        let key = RenderConfig::default();
        assert_eq!(ShaderChoice::for_config(&key), ShaderChoice::KeyColor);

        let packed = RenderConfig {
            packed: true,
            ..RenderConfig::default()
        };
        assert_eq!(ShaderChoice::for_config(&packed), ShaderChoice::Packed);

        let custom = RenderConfig {
            packed: true,
            custom_shader: Some("custom".into()),
            ..RenderConfig::default()
        };
        assert_eq!(ShaderChoice::for_config(&custom), ShaderChoice::Custom("custom"));
    }

    #[test]
    fn composed_source_has_single_entry_points() {
        let src = ShaderChoice::KeyColor.compose();
        assert_eq!(src.matches("fn vs_main").count(), 1);
        assert_eq!(src.matches("fn fs_main").count(), 1);
    }
}
