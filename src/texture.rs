use std::path::Path;

use crate::ecs::TextureId;
use crate::gpu::GpuContext;

/// Decoded RGBA8 pixels, ready for upload.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    /// True when this stands in for an asset that failed to load.
    pub placeholder: bool,
}

impl TextureData {
    pub fn from_rgba(label: impl Into<String>, width: u32, height: u32, rgba: Vec<u8>) -> Self {
        debug_assert_eq!(rgba.len(), (width * height * 4) as usize);
        Self {
            label: label.into(),
            width,
            height,
            rgba,
            placeholder: false,
        }
    }

    /// Decode an image file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, image::ImageError> {
        let path = path.as_ref();
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::from_rgba(path.display().to_string(), width, height, img.into_raw()))
    }

    /// Decode an image file, or fall back to a visible placeholder.
    pub fn load_or_placeholder(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "image failed to load, using placeholder");
                Self::placeholder(path.display().to_string())
            }
        }
    }

    /// 2x2 grey checker.
    pub fn placeholder(label: impl Into<String>) -> Self {
        const LIGHT: [u8; 4] = [160, 160, 160, 255];
        const DARK: [u8; 4] = [96, 96, 96, 255];
        let rgba = [LIGHT, DARK, DARK, LIGHT].concat();
        Self {
            placeholder: true,
            ..Self::from_rgba(label, 2, 2, rgba)
        }
    }

    /// Single transparent pixel, used for empty text.
    pub fn blank(label: impl Into<String>) -> Self {
        Self::from_rgba(label, 1, 1, vec![0; 4])
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Registry of CPU textures, addressed by [`TextureId`].
#[derive(Debug, Default)]
pub struct Textures {
    list: Vec<TextureData>,
}

impl Textures {
    pub fn add(&mut self, data: TextureData) -> TextureId {
        self.list.push(data);
        TextureId(self.list.len() - 1)
    }

    pub fn get(&self, id: TextureId) -> Option<&TextureData> {
        self.list.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// A GPU texture that can be bound to shaders.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Create a texture from raw RGBA data.
    pub fn from_rgba(gpu: &GpuContext, data: &[u8], width: u32, height: u32, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Text and photos both want smooth sampling
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    pub fn from_data(gpu: &GpuContext, data: &TextureData) -> Self {
        Self::from_rgba(gpu, &data.rgba, data.width, data.height, &data.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_degrades_to_placeholder() {
        let data = TextureData::load_or_placeholder("definitely/not/here.png");
        assert!(data.placeholder);
        assert_eq!((data.width, data.height), (2, 2));
        assert_eq!(data.rgba.len(), 16);
        assert_eq!(data.label, "definitely/not/here.png");
    }

    #[test]
    fn registry_round_trip() {
        let mut textures = Textures::default();
        let id = textures.add(TextureData::blank("empty"));
        assert_eq!(textures.get(id).map(|t| t.aspect()), Some(1.0));
        assert!(textures.get(TextureId(7)).is_none());
    }
}
