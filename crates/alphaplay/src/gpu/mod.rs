pub mod context;
pub mod fullscreen_quad;

pub use context::GpuContext;
