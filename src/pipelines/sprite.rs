//! Textured quad pipeline that draws the batches of a [`QuadBatcher`].
//!
//! Textures are uploaded on first use and cached by [`TextureId`] until the
//! last reference to them is dropped. Each distinct view rectangle of a frame
//! gets its own uniform bind group, so layers with different cameras can
//! share one render pass.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::{
    camera::{Rect, ortho_matrix},
    context::Context,
    data_structures::texture::{Texture, TextureCache, TextureId},
    render::{QuadBatcher, Vertex},
};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ViewUniform {
    view_proj: [[f32; 4]; 4],
}

impl ViewUniform {
    fn new(view: Rect) -> Self {
        Self {
            view_proj: ortho_matrix(view).into(),
        }
    }
}

struct GpuTexture {
    #[allow(unused)]
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

struct Draw {
    view: usize,
    texture: TextureId,
    vertices: Range<u32>,
}

/// GPU resources of one frame, created by [`SpritePipeline::prepare`].
#[derive(Default)]
pub struct PreparedFrame {
    vertex_buffer: Option<wgpu::Buffer>,
    views: Vec<wgpu::BindGroup>,
    draws: Vec<Draw>,
}

impl PreparedFrame {
    pub fn draw_calls(&self) -> usize {
        self.draws.len()
    }
}

pub struct SpritePipeline {
    pipeline: wgpu::RenderPipeline,
    view_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    textures: TextureCache<GpuTexture>,
}

impl SpritePipeline {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let view_layout = mk_view_bind_group_layout(device);
        let texture_layout = mk_texture_bind_group_layout(device);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sprite Render Pipeline Layout"),
            bind_group_layouts: &[&view_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sprite Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("sprite.wgsl").into()),
        });
        let pipeline = mk_render_pipeline(device, format, &layout, &shader);
        // Nearest filtering keeps neighbouring frames from bleeding into each other
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            pipeline,
            view_layout,
            texture_layout,
            sampler,
            textures: TextureCache::new(),
        }
    }

    /// Number of textures currently resident on the GPU.
    pub fn cached_textures(&self) -> usize {
        self.textures.len()
    }

    fn upload(&self, ctx: &Context, texture: &Texture) -> GpuTexture {
        // Quads address the sheet bottom-up (v = 1 is the top row).
        let rgba = image::imageops::flip_vertical(texture.pixels());
        let size = wgpu::Extent3d {
            width: texture.width(),
            height: texture.height(),
            depth_or_array_layers: 1,
        };
        let gpu_texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(texture.label()),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &gpu_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * texture.width()),
                rows_per_image: Some(texture.height()),
            },
            size,
        );
        let view = gpu_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
            label: Some("sprite_sheet_bind_group"),
        });
        log::debug!("uploaded texture `{}` to the GPU", texture.label());
        GpuTexture {
            texture: gpu_texture,
            bind_group,
        }
    }

    fn mk_view_bind_group(&self, device: &wgpu::Device, view: Rect) -> wgpu::BindGroup {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("View Buffer"),
            contents: bytemuck::cast_slice(&[ViewUniform::new(view)]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.view_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("view_bind_group"),
        })
    }

    /// Releases textures that were dropped, then uploads missing textures
    /// and the frame's vertices.
    ///
    /// Batches without a view are drawn in surface pixel coordinates.
    pub fn prepare(&mut self, ctx: &Context, batcher: &QuadBatcher) -> PreparedFrame {
        let evicted = self.textures.evict_dropped();
        if evicted > 0 {
            log::debug!("released {} dropped textures from the GPU", evicted);
        }
        for batch in batcher.batches() {
            if !self.textures.contains(batch.texture.id()) {
                let gpu_texture = self.upload(ctx, &batch.texture);
                self.textures.insert(&batch.texture, gpu_texture);
            }
        }
        if batcher.is_empty() {
            return PreparedFrame::default();
        }

        let vertex_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Sprite Vertex Buffer"),
                contents: bytemuck::cast_slice(batcher.vertices()),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let (width, height) = ctx.size();
        let screen = Rect::new(0.0, 0.0, width as f64, height as f64);
        let mut views = Vec::new();
        let mut draws = Vec::with_capacity(batcher.batches().len());
        let mut last_view = None;
        for batch in batcher.batches() {
            let view = batch.view.unwrap_or(screen);
            if last_view != Some(view) {
                views.push(self.mk_view_bind_group(&ctx.device, view));
                last_view = Some(view);
            }
            draws.push(Draw {
                view: views.len() - 1,
                texture: batch.texture.id(),
                vertices: batch.vertices.clone(),
            });
        }

        PreparedFrame {
            vertex_buffer: Some(vertex_buffer),
            views,
            draws,
        }
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, frame: &PreparedFrame) {
        let Some(vertex_buffer) = &frame.vertex_buffer else {
            return;
        };
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
        for draw in &frame.draws {
            let Some(texture) = self.textures.get(draw.texture) else {
                log::warn!("texture {:?} is not resident, skipping its batch", draw.texture);
                continue;
            };
            render_pass.set_bind_group(0, &frame.views[draw.view], &[]);
            render_pass.set_bind_group(1, &texture.bind_group, &[]);
            render_pass.draw(draw.vertices.clone(), 0..1);
        }
    }
}

fn mk_view_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("view_bind_group_layout"),
    })
}

fn mk_texture_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("sprite_texture_bind_group_layout"),
    })
}

fn mk_render_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    render_pipeline_layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Sprite Render Pipeline"),
        layout: Some(render_pipeline_layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex::desc()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // the y-down projection flips winding, painter's order needs no culling
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        // painter's algorithm, no depth buffer
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}
