//! Geometry, GPU meshes and spatial transforms.
//!
//! Geometry lives in two forms:
//!
//! - [`Geometry`]: CPU-side vertices and indices. Scenes build these without
//!   a GPU, which keeps scene construction testable headless.
//! - [`Mesh`]: the same data uploaded to vertex and index buffers. The
//!   renderer creates these lazily the first time a geometry is drawn.
//!
//! [`Transform`] places an entity in space with a fluent builder:
//!
//! ```
//! use portalfolio::{Transform, Vec3};
//!
//! let transform = Transform::new()
//!     .position(Vec3::new(0.0, 0.0, -2.5))
//!     .uniform_scale(1.15);
//! ```
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//! | uv        | Float32x2 | 24     | 2               |

use crate::ecs::MeshId;
use crate::gpu::GpuContext;
use glam::{Mat4, Quat, Vec3};

/// A vertex with position, normal, and texture coordinates (32 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    /// Position in model space.
    pub position: [f32; 3],
    /// Surface normal.
    pub normal: [f32; 3],
    /// Texture coordinates in [0, 1].
    pub uv: [f32; 2],
}

impl Vertex3d {
    /// The wgpu vertex buffer layout for [`Vertex3d`].
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// CPU-side triangle geometry.
///
/// All primitives use counter-clockwise winding for front faces.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Box centred on the origin with the given full dimensions.
    ///
    /// Each face has its own four vertices so normals and UVs stay flat.
    pub fn cuboid(size: Vec3) -> Self {
        let h = size * 0.5;
        let (x, y, z) = (h.x, h.y, h.z);
        #[rustfmt::skip]
        let vertices = vec![
            // Front face (Z+)
            Vertex3d::new([-x, -y,  z], [ 0.0,  0.0,  1.0], [0.0, 1.0]),
            Vertex3d::new([ x, -y,  z], [ 0.0,  0.0,  1.0], [1.0, 1.0]),
            Vertex3d::new([ x,  y,  z], [ 0.0,  0.0,  1.0], [1.0, 0.0]),
            Vertex3d::new([-x,  y,  z], [ 0.0,  0.0,  1.0], [0.0, 0.0]),
            // Back face (Z-)
            Vertex3d::new([ x, -y, -z], [ 0.0,  0.0, -1.0], [0.0, 1.0]),
            Vertex3d::new([-x, -y, -z], [ 0.0,  0.0, -1.0], [1.0, 1.0]),
            Vertex3d::new([-x,  y, -z], [ 0.0,  0.0, -1.0], [1.0, 0.0]),
            Vertex3d::new([ x,  y, -z], [ 0.0,  0.0, -1.0], [0.0, 0.0]),
            // Top face (Y+)
            Vertex3d::new([-x,  y,  z], [ 0.0,  1.0,  0.0], [0.0, 1.0]),
            Vertex3d::new([ x,  y,  z], [ 0.0,  1.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([ x,  y, -z], [ 0.0,  1.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([-x,  y, -z], [ 0.0,  1.0,  0.0], [0.0, 0.0]),
            // Bottom face (Y-)
            Vertex3d::new([-x, -y, -z], [ 0.0, -1.0,  0.0], [0.0, 1.0]),
            Vertex3d::new([ x, -y, -z], [ 0.0, -1.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([ x, -y,  z], [ 0.0, -1.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([-x, -y,  z], [ 0.0, -1.0,  0.0], [0.0, 0.0]),
            // Right face (X+)
            Vertex3d::new([ x, -y,  z], [ 1.0,  0.0,  0.0], [0.0, 1.0]),
            Vertex3d::new([ x, -y, -z], [ 1.0,  0.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([ x,  y, -z], [ 1.0,  0.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([ x,  y,  z], [ 1.0,  0.0,  0.0], [0.0, 0.0]),
            // Left face (X-)
            Vertex3d::new([-x, -y, -z], [-1.0,  0.0,  0.0], [0.0, 1.0]),
            Vertex3d::new([-x, -y,  z], [-1.0,  0.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([-x,  y,  z], [-1.0,  0.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([-x,  y, -z], [-1.0,  0.0,  0.0], [0.0, 0.0]),
        ];

        #[rustfmt::skip]
        let indices: Vec<u32> = vec![
            0,  1,  2,  2,  3,  0,  // front
            4,  5,  6,  6,  7,  4,  // back
            8,  9,  10, 10, 11, 8,  // top
            12, 13, 14, 14, 15, 12, // bottom
            16, 17, 18, 18, 19, 16, // right
            20, 21, 22, 22, 23, 20, // left
        ];

        Self::new(vertices, indices)
    }

    /// Unit cube spanning -0.5..0.5 on every axis.
    pub fn cube() -> Self {
        Self::cuboid(Vec3::ONE)
    }

    /// Rectangle in the XY plane facing +Z. UV (0, 0) is the top-left corner.
    pub fn plane(width: f32, height: f32) -> Self {
        let (x, y) = (width * 0.5, height * 0.5);
        let n = [0.0, 0.0, 1.0];
        let vertices = vec![
            Vertex3d::new([-x, -y, 0.0], n, [0.0, 1.0]),
            Vertex3d::new([x, -y, 0.0], n, [1.0, 1.0]),
            Vertex3d::new([x, y, 0.0], n, [1.0, 0.0]),
            Vertex3d::new([-x, y, 0.0], n, [0.0, 0.0]),
        ];
        Self::new(vertices, vec![0, 1, 2, 2, 3, 0])
    }

    /// Axis-aligned bounds as `(min, max)`. Empty geometry reports the origin.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut iter = self.vertices.iter().map(|v| Vec3::from(v.position));
        let Some(first) = iter.next() else {
            return (Vec3::ZERO, Vec3::ZERO);
        };
        iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)))
    }
}

/// Registry of CPU geometry, addressed by [`MeshId`].
#[derive(Debug, Default)]
pub struct Geometries {
    list: Vec<Geometry>,
}

impl Geometries {
    pub fn add(&mut self, geometry: Geometry) -> MeshId {
        self.list.push(geometry);
        MeshId(self.list.len() - 1)
    }

    pub fn get(&self, id: MeshId) -> Option<&Geometry> {
        self.list.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// GPU-resident geometry with vertex and index buffers.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
}

impl Mesh {
    /// Upload geometry to the GPU.
    pub fn from_geometry(gpu: &GpuContext, geometry: &Geometry, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Vertex Buffer")),
                contents: bytemuck::cast_slice(&geometry.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Index Buffer")),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: geometry.indices.len() as u32,
        }
    }
}

/// Position, rotation, and scale of an entity.
///
/// Converted to a matrix in Scale → Rotate → Translate order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Translation relative to the parent (or world).
    pub position: Vec3,
    /// Rotation as a unit quaternion.
    pub rotation: Quat,
    /// Scale factors for each axis.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}
