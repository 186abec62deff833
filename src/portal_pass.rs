//! Stencil-aware mesh rendering.
//!
//! [`PortalPass`] draws a [`Context`]'s draw list into the surface with a
//! combined depth/stencil attachment. Each draw may use a different stencil
//! configuration, so pipelines are created on demand and cached by
//! [`PipelineKey`]; the stencil reference itself is dynamic and set per draw.
//!
//! # Architecture
//!
//! The pass uses three bind groups:
//! - **Group 0**: Camera uniforms (view-projection matrix, time)
//! - **Group 1**: Model uniforms at a dynamic offset (model matrix, color, shading params)
//! - **Group 2**: Texture and sampler
//!
//! GPU meshes and textures are uploaded lazily from the context's CPU
//! registries the first time they are drawn.

use std::collections::HashMap;

use crate::color::Color;
use crate::context::{Context, DrawItem};
use crate::ecs::{MeshId, TextureId};
use crate::gpu::GpuContext;
use crate::material::{DepthMode, Material, Shading, Side};
use crate::mesh::{Mesh, Vertex3d};
use crate::stencil::StencilFace;
use crate::texture::Texture;

/// Depth plus the 8-bit stencil the portals are composed in.
pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Dynamic uniform offsets must be multiples of this.
const MODEL_SLOT: u64 = 256;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniforms {
    view_proj: [[f32; 4]; 4],
    time: f32,
    _pad: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ModelUniforms {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    /// x: screen pattern, y: textured flag.
    params: [f32; 4],
}

/// Everything that has to be baked into a render pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub screen: bool,
    pub depth: DepthMode,
    pub side: Side,
    pub stencil: StencilFace,
    pub transparent: bool,
}

impl PipelineKey {
    pub fn new(material: &Material, stencil: StencilFace) -> Self {
        Self {
            screen: matches!(material.shading, Shading::Screen(_)),
            depth: material.depth,
            side: material.side,
            stencil: stencil.without_reference(),
            transparent: material.transparent,
        }
    }

    fn depth_state(&self) -> (bool, wgpu::CompareFunction) {
        match self.depth {
            DepthMode::Opaque => (true, wgpu::CompareFunction::Less),
            DepthMode::TestOnly => (false, wgpu::CompareFunction::Less),
            DepthMode::Ignore => (false, wgpu::CompareFunction::Always),
        }
    }
}

pub struct PortalPass {
    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    model_layout: wgpu::BindGroupLayout,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_capacity: u64,
    texture_layout: wgpu::BindGroupLayout,
    default_texture: wgpu::BindGroup,
    textures: HashMap<TextureId, wgpu::BindGroup>,
    meshes: HashMap<MeshId, Mesh>,
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
    /// Background behind everything.
    pub clear_color: Color,
}

impl PortalPass {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Portal Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/portal.wgsl").into()),
        });

        // Camera uniform buffer (group 0)
        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        // Model uniforms (group 1), one 256-byte slot per draw
        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Model Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ModelUniforms>() as u64
                    ),
                },
                count: None,
            }],
        });
        let model_capacity = 64;
        let (model_buffer, model_bind_group) =
            Self::create_model_buffer(device, &model_layout, model_capacity);

        // Texture bind group layout (group 2)
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
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
        });

        // 1x1 white for untextured materials
        let white = Texture::from_rgba(gpu, &[255, 255, 255, 255], 1, 1, "Default White Texture");
        let default_texture = Self::texture_bind_group(device, &texture_layout, &white);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Portal Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &model_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let depth_view = Self::create_depth_view(gpu);

        Self {
            shader,
            pipeline_layout,
            pipelines: HashMap::new(),
            camera_buffer,
            camera_bind_group,
            model_layout,
            model_buffer,
            model_bind_group,
            model_capacity,
            texture_layout,
            default_texture,
            textures: HashMap::new(),
            meshes: HashMap::new(),
            depth_view,
            depth_size: (gpu.width(), gpu.height()),
            clear_color: Color::BLACK,
        }
    }

    fn create_model_buffer(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        slots: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Uniforms"),
            size: slots * MODEL_SLOT,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniforms>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn texture_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        texture: &Texture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Portal Texture Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }

    fn create_depth_view(gpu: &GpuContext) -> wgpu::TextureView {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Stencil Texture"),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_STENCIL_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Recreate the depth/stencil buffer if the surface size changed.
    pub fn ensure_depth_size(&mut self, gpu: &GpuContext) {
        if self.depth_size != (gpu.width(), gpu.height()) {
            self.depth_view = Self::create_depth_view(gpu);
            self.depth_size = (gpu.width(), gpu.height());
        }
    }

    fn create_pipeline(&self, gpu: &GpuContext, key: &PipelineKey) -> wgpu::RenderPipeline {
        let (depth_write_enabled, depth_compare) = key.depth_state();
        let label = format!("Portal Pipeline {key:?}");
        tracing::debug!(?key, "creating pipeline");

        gpu.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs"),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some(if key.screen { "fs_screen" } else { "fs_basic" }),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(if key.transparent {
                        wgpu::BlendState::ALPHA_BLENDING
                    } else {
                        wgpu::BlendState::REPLACE
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: match key.side {
                    Side::Front => Some(wgpu::Face::Back),
                    Side::Double => None,
                },
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_STENCIL_FORMAT,
                depth_write_enabled,
                depth_compare,
                stencil: key.stencil.pipeline_state(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    /// Upload whatever this frame needs that the GPU has not seen yet.
    fn prepare<A: Clone>(&mut self, gpu: &GpuContext, ctx: &Context<A>, items: &[DrawItem]) {
        for item in items {
            if !self.meshes.contains_key(&item.mesh)
                && let Some(geometry) = ctx.geometries.get(item.mesh)
            {
                let mesh = Mesh::from_geometry(gpu, geometry, &format!("Mesh {}", item.mesh.0));
                self.meshes.insert(item.mesh, mesh);
            }

            let Some(material) = ctx.materials.get(item.material) else {
                continue;
            };
            if let Some(id) = material.texture
                && !self.textures.contains_key(&id)
                && let Some(data) = ctx.textures.get(id)
            {
                let texture = Texture::from_data(gpu, data);
                let bind_group =
                    Self::texture_bind_group(&gpu.device, &self.texture_layout, &texture);
                self.textures.insert(id, bind_group);
            }

            let key = PipelineKey::new(material, item.stencil);
            if !self.pipelines.contains_key(&key) {
                let pipeline = self.create_pipeline(gpu, &key);
                self.pipelines.insert(key, pipeline);
            }
        }

        let needed = items.len().max(1) as u64;
        if needed > self.model_capacity {
            let slots = needed.next_power_of_two();
            let (buffer, bind_group) =
                Self::create_model_buffer(&gpu.device, &self.model_layout, slots);
            self.model_buffer = buffer;
            self.model_bind_group = bind_group;
            self.model_capacity = slots;
        }
    }

    /// Draw the context's render graph into `target`.
    pub fn render<A: Clone>(&mut self, gpu: &GpuContext, ctx: &Context<A>, target: &wgpu::TextureView) {
        self.ensure_depth_size(gpu);
        let items = ctx.draw_list();
        self.prepare(gpu, ctx, &items);

        let camera = CameraUniforms {
            view_proj: ctx.camera.view_projection().to_cols_array_2d(),
            time: ctx.time(),
            _pad: [0.0; 3],
        };
        gpu.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[camera]));

        let mut staging = vec![0u8; items.len() * MODEL_SLOT as usize];
        for (i, item) in items.iter().enumerate() {
            let Some(material) = ctx.materials.get(item.material) else {
                continue;
            };
            let pattern = match material.shading {
                Shading::Basic => 0.0,
                Shading::Screen(pattern) => pattern.index(),
            };
            let uniforms = ModelUniforms {
                model: item.model.to_cols_array_2d(),
                color: material.color.to_array(),
                params: [pattern, material.texture.map_or(0.0, |_| 1.0), 0.0, 0.0],
            };
            let start = i * MODEL_SLOT as usize;
            let bytes = bytemuck::bytes_of(&uniforms);
            staging[start..start + bytes.len()].copy_from_slice(bytes);
        }
        if !staging.is_empty() {
            gpu.queue.write_buffer(&self.model_buffer, 0, &staging);
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Portal Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Portal Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color.to_wgpu()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_bind_group(0, &self.camera_bind_group, &[]);

            for (i, item) in items.iter().enumerate() {
                let Some(material) = ctx.materials.get(item.material) else {
                    continue;
                };
                let Some(mesh) = self.meshes.get(&item.mesh) else {
                    continue;
                };
                let Some(pipeline) = self.pipelines.get(&PipelineKey::new(material, item.stencil))
                else {
                    continue;
                };
                let texture = material
                    .texture
                    .and_then(|id| self.textures.get(&id))
                    .unwrap_or(&self.default_texture);

                pass.set_pipeline(pipeline);
                pass.set_stencil_reference(item.stencil.reference);
                pass.set_bind_group(1, &self.model_bind_group, &[(i as u64 * MODEL_SLOT) as u32]);
                pass.set_bind_group(2, texture, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
    }
}
