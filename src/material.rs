//! Material descriptions.
//!
//! A [`Material`] is plain data: how a surface is shaded, how it interacts
//! with depth, and which portal (if any) it writes or reads through its
//! [`StencilMode`]. The renderer turns these into pipelines; the gate state
//! is never stored here, it is resolved from the portal each frame.

use crate::color::Color;
use crate::ecs::{MaterialId, TextureId};
use crate::portal::{PortalId, StencilMode};

/// Animated screen-space gradients. Colors are keyed on the fragment's
/// position on screen, not on the mesh UVs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScreenPattern {
    /// Blue-white field with a slow sine wobble.
    Ripple,
    /// Red channel saturated, green/blue follow the screen position.
    Blush,
    /// Green channel saturated, red/blue follow the screen position.
    Mint,
}

impl ScreenPattern {
    pub(crate) fn index(self) -> f32 {
        match self {
            ScreenPattern::Ripple => 0.0,
            ScreenPattern::Blush => 1.0,
            ScreenPattern::Mint => 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Shading {
    /// Flat color times texture.
    #[default]
    Basic,
    Screen(ScreenPattern),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DepthMode {
    /// Test and write depth.
    #[default]
    Opaque,
    /// Test depth without writing it.
    TestOnly,
    /// Ignore depth entirely; draw order decides what is on top.
    Ignore,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Side {
    #[default]
    Front,
    Double,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Material {
    pub color: Color,
    pub texture: Option<TextureId>,
    pub shading: Shading,
    pub depth: DepthMode,
    pub side: Side,
    pub stencil: StencilMode,
    /// Alpha blended instead of replaced.
    pub transparent: bool,
}

impl Material {
    pub fn basic(color: Color) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    /// Silhouette that stamps `portal`'s reference into the stencil buffer.
    ///
    /// Leaves depth untouched so content behind the silhouette still draws.
    pub fn portal_writer(portal: PortalId) -> Self {
        Self {
            depth: DepthMode::TestOnly,
            side: Side::Double,
            stencil: StencilMode::Writer(portal),
            ..Default::default()
        }
    }

    /// Content visible only through `portal` while its gate is closed.
    pub fn portal_reader(portal: PortalId) -> Self {
        Self {
            depth: DepthMode::Ignore,
            side: Side::Double,
            stencil: StencilMode::Reader(portal),
            transparent: true,
            ..Default::default()
        }
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn shading(mut self, shading: Shading) -> Self {
        self.shading = shading;
        self
    }

    pub fn depth(mut self, depth: DepthMode) -> Self {
        self.depth = depth;
        self
    }

    pub fn double_sided(mut self) -> Self {
        self.side = Side::Double;
        self
    }

    pub fn transparent(mut self) -> Self {
        self.transparent = true;
        self
    }
}

/// Registry of materials, addressed by [`MaterialId`].
#[derive(Debug, Default)]
pub struct Materials {
    list: Vec<Material>,
}

impl Materials {
    pub fn add(&mut self, material: Material) -> MaterialId {
        self.list.push(material);
        MaterialId(self.list.len() - 1)
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.list.get(id.0)
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.list.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_ignores_depth_and_blends() {
        let reader = Material::portal_reader(PortalId(3)).color(Color::hex(0x00ffff));
        assert_eq!(reader.depth, DepthMode::Ignore);
        assert_eq!(reader.stencil, StencilMode::Reader(PortalId(3)));
        assert!(reader.transparent);
        assert_eq!(reader.side, Side::Double);
    }

    #[test]
    fn writer_keeps_depth_buffer_clean() {
        let writer = Material::portal_writer(PortalId(0)).shading(Shading::Screen(ScreenPattern::Mint));
        assert_eq!(writer.depth, DepthMode::TestOnly);
        assert_eq!(writer.stencil, StencilMode::Writer(PortalId(0)));
        assert_eq!(writer.shading, Shading::Screen(ScreenPattern::Mint));
    }

    #[test]
    fn registry_hands_out_stable_ids() {
        let mut materials = Materials::default();
        let a = materials.add(Material::basic(Color::WHITE));
        let b = materials.add(Material::basic(Color::BLACK));
        assert_ne!(a, b);
        if let Some(m) = materials.get_mut(a) {
            m.color = Color::BLACK;
        }
        assert_eq!(materials.get(a).map(|m| m.color), Some(Color::BLACK));
        assert_eq!(materials.len(), 2);
    }
}
