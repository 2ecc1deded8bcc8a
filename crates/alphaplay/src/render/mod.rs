pub mod config;
#[cfg(test)]
mod keying;
pub mod pipeline;
pub mod shaders;
pub mod uniforms;

use std::sync::Arc;
use std::time::Instant;

use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindingResource, Buffer,
    CommandEncoder, Device, Queue, RenderPipeline, Sampler, Texture, TextureFormat, TextureView,
};

pub use config::{AlphaMode, DEFAULT_KEY_COLOR, RenderConfig, RenderConfigCell};
pub use shaders::ShaderChoice;
pub use uniforms::{AlphaUniforms, TargetInfo};

use crate::error::PlayerError;
use crate::layout::VideoGeometry;
use crate::media::DecodedFrame;

/// Surface the renderer is bound to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceTarget {
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub premultiplied: bool,
}

impl SurfaceTarget {
    fn info(&self) -> TargetInfo {
        TargetInfo {
            premultiplied: self.premultiplied,
            srgb: self.format.is_srgb(),
        }
    }
}

struct FrameTexture {
    texture: Texture,
    bind_group: BindGroup,
    width: u32,
    height: u32,
}

/// GPU side of the component: owns the frame texture and the alpha
/// pipeline, and draws the current frame with alpha onto a surface.
pub struct AlphaRenderer {
    config: Arc<RenderConfigCell>,
    applied_generation: u64,
    applied: Arc<RenderConfig>,
    target: SurfaceTarget,
    geometry: VideoGeometry,
    bind_group_layout: BindGroupLayout,
    pipeline: RenderPipeline,
    uniform_buffer: Buffer,
    sampler: Sampler,
    frame: Option<FrameTexture>,
    started: Instant,
}

impl AlphaRenderer {
    /// Bind to a surface. Fails with [`PlayerError::RenderSetup`] when the
    /// configured shader does not compile.
    pub fn new(
        device: &Device,
        target: SurfaceTarget,
        config: Arc<RenderConfigCell>,
    ) -> Result<Self, PlayerError> {
        let (generation, applied) = config.snapshot();
        let bind_group_layout = pipeline::create_bind_group_layout(device);
        let pipeline = pipeline::build_pipeline(
            device,
            target.format,
            &bind_group_layout,
            ShaderChoice::for_config(&applied),
        )?;

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("alpha-uniforms"),
            size: std::mem::size_of::<AlphaUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("alpha-frame-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        log::info!(
            "Alpha renderer bound: {}x{} {:?} ({})",
            target.width,
            target.height,
            target.format,
            ShaderChoice::for_config(&applied).label()
        );

        Ok(Self {
            config,
            applied_generation: generation,
            applied,
            target,
            geometry: VideoGeometry::default(),
            bind_group_layout,
            pipeline,
            uniform_buffer,
            sampler,
            frame: None,
            started: Instant::now(),
        })
    }

    pub fn target(&self) -> SurfaceTarget {
        self.target
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.target.width = width;
        self.target.height = height;
    }

    pub fn set_geometry(&mut self, geometry: VideoGeometry) {
        self.geometry = geometry;
    }

    pub fn has_frame(&self) -> bool {
        self.frame.is_some()
    }

    /// Drop the current frame; the next draw clears to transparent.
    pub fn clear_frame(&mut self) {
        self.frame = None;
    }

    /// Upload a decoded frame, recreating the texture when its size changes.
    pub fn upload_frame(&mut self, device: &Device, queue: &Queue, frame: &DecodedFrame) {
        if frame.width == 0 || frame.height == 0 {
            return;
        }
        let expected = (frame.width as usize) * (frame.height as usize) * 4;
        if frame.data.len() < expected {
            log::warn!(
                "Dropping short frame: {} bytes for {}x{}",
                frame.data.len(),
                frame.width,
                frame.height
            );
            return;
        }

        let size = wgpu::Extent3d {
            width: frame.width,
            height: frame.height,
            depth_or_array_layers: 1,
        };
        let stale = self
            .frame
            .as_ref()
            .is_none_or(|f| f.width != frame.width || f.height != frame.height);
        if stale {
            self.frame = Some(self.create_frame_texture(device, frame.width, frame.height));
        }
        let Some(target) = &self.frame else { return };

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &frame.data[..expected],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(frame.width * 4),
                rows_per_image: Some(frame.height),
            },
            size,
        );
    }

    fn create_frame_texture(&self, device: &Device, width: u32, height: u32) -> FrameTexture {
        // Plain Unorm: the shaders key against raw sRGB-encoded values
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("alpha-frame"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view: TextureView = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("alpha-frame-bg"),
            layout: &self.bind_group_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&self.sampler),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        });
        log::debug!("Frame texture allocated: {width}x{height}");
        FrameTexture {
            texture,
            bind_group,
            width,
            height,
        }
    }

    /// Pick up a newer config snapshot. A shader that fails to compile
    /// leaves the previous pipeline bound and is reported once.
    pub fn refresh(&mut self, device: &Device) -> Result<(), PlayerError> {
        let (generation, latest) = self.config.snapshot();
        if generation == self.applied_generation {
            return Ok(());
        }
        self.applied_generation = generation;
        let shader_changed = ShaderChoice::for_config(&latest)
            != ShaderChoice::for_config(&self.applied);
        self.applied = latest;
        if !shader_changed {
            return Ok(());
        }
        let choice = ShaderChoice::for_config(&self.applied);
        let pipeline =
            pipeline::build_pipeline(device, self.target.format, &self.bind_group_layout, choice)?;
        self.pipeline = pipeline;
        log::info!("Alpha pipeline rebuilt ({})", choice.label());
        Ok(())
    }

    /// Record the alpha pass into `encoder`. Returns `false` when no frame
    /// has been uploaded yet; the target is still cleared to transparent.
    pub fn render(
        &mut self,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        target_view: &TextureView,
    ) -> bool {
        let uniforms = AlphaUniforms::new(
            &self.applied,
            self.geometry.letterbox(self.target.width, self.target.height),
            self.target.info(),
            self.started.elapsed().as_secs_f32(),
        );
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("alpha-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        let drew = if let Some(frame) = &self.frame {
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &frame.bind_group, &[]);
            pass.draw(0..3, 0..1);
            true
        } else {
            false
        };
        drop(pass);
        drew
    }
}
