/// Fullscreen triangle vertex shader that also outputs UVs.
/// Uses the vertex_index trick, so pipelines need no vertex buffer.
pub const FULLSCREEN_TRIANGLE_VS_WITH_UV: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4f,
    @location(0) uv: vec2f,
}

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> VertexOutput {
    let x = f32(i32(vi & 1u) * 4) - 1.0;
    let y = f32(i32(vi & 2u) * 2) - 1.0;
    var out: VertexOutput;
    out.position = vec4f(x, y, 0.0, 1.0);
    // Clip space to UV with Y flipped for texture sampling
    out.uv = vec2f((x + 1.0) * 0.5, (1.0 - y) * 0.5);
    return out;
}
"#;
