pub mod hot_reload;

pub use hot_reload::ShaderWatcher;
