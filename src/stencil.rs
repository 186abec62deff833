//! Stencil layer allocation and per-draw stencil state.
//!
//! The stencil buffer is 8 bits wide. Bit 0 is the *composition bit*: every
//! portal writer sets it on the pixels its silhouette covers. The bits above it
//! select a *layer*, one per portal, so a pixel covered by portal `L` holds the
//! reference `(L << 1) | 1`.
//!
//! ```text
//!   bit   7   6   5   4   3   2   1   0
//!       [ unused  ][   layer bits   ][C]
//! ```
//!
//! Readers compare against the full `layer | composition` mask; nested writers
//! compare against the composition bit only, so they can draw wherever *some*
//! portal already opened the buffer.
//!
//! [`StencilAllocator`] hands out disjoint [`StencilLayer`]s and fails with
//! [`StencilError::Exhausted`] instead of wrapping around.

use thiserror::Error;

/// Width of the stencil attachment in bits.
pub const STENCIL_BITS: u32 = 8;

/// Bit written by every portal silhouette.
pub const COMPOSITION_BIT: u32 = 0x01;

/// Layer bits used when nothing else is configured (15 portals).
pub const DEFAULT_LAYER_BITS: u32 = 4;

/// Errors raised while configuring stencil layers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StencilError {
    /// More portals were requested than the layer bits can address.
    #[error("stencil layers exhausted: {layer_bits} layer bits address at most {capacity} portals")]
    Exhausted { capacity: u32, layer_bits: u32 },
    /// The layer bits plus the composition bit do not fit in the buffer.
    #[error("{layer_bits} layer bits plus the composition bit do not fit in an 8-bit stencil buffer")]
    InvalidBits { layer_bits: u32 },
}

/// A disjoint slice of the stencil buffer owned by one portal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StencilLayer {
    index: u32,
    layer_mask: u32,
}

impl StencilLayer {
    /// 1-based layer number. Layer 0 is the untouched buffer.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Value written by the portal and compared by its readers.
    pub fn reference(&self) -> u32 {
        (self.index << 1) | COMPOSITION_BIT
    }

    /// Bits that select the layer.
    pub fn layer_mask(&self) -> u32 {
        self.layer_mask
    }

    /// Layer bits plus the composition bit.
    pub fn full_mask(&self) -> u32 {
        self.layer_mask | COMPOSITION_BIT
    }
}

/// Hands out stencil layers until the configured bits run out.
#[derive(Debug, Clone)]
pub struct StencilAllocator {
    layer_bits: u32,
    next: u32,
}

impl StencilAllocator {
    pub fn new(layer_bits: u32) -> Result<Self, StencilError> {
        if layer_bits == 0 || layer_bits + 1 > STENCIL_BITS {
            return Err(StencilError::InvalidBits { layer_bits });
        }
        Ok(Self {
            layer_bits,
            next: 1,
        })
    }

    /// Maximum number of portals this allocator can serve.
    pub fn capacity(&self) -> u32 {
        (1 << self.layer_bits) - 1
    }

    pub fn allocated(&self) -> u32 {
        self.next - 1
    }

    pub fn allocate(&mut self) -> Result<StencilLayer, StencilError> {
        if self.next > self.capacity() {
            return Err(StencilError::Exhausted {
                capacity: self.capacity(),
                layer_bits: self.layer_bits,
            });
        }
        let layer = StencilLayer {
            index: self.next,
            layer_mask: ((1 << self.layer_bits) - 1) << 1,
        };
        self.next += 1;
        Ok(layer)
    }
}

impl Default for StencilAllocator {
    fn default() -> Self {
        Self {
            layer_bits: DEFAULT_LAYER_BITS,
            next: 1,
        }
    }
}

// ============================================================================
// Per-draw stencil state
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StencilCompare {
    Always,
    Equal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Replace,
}

impl From<StencilCompare> for wgpu::CompareFunction {
    fn from(compare: StencilCompare) -> Self {
        match compare {
            StencilCompare::Always => wgpu::CompareFunction::Always,
            StencilCompare::Equal => wgpu::CompareFunction::Equal,
        }
    }
}

impl From<StencilOp> for wgpu::StencilOperation {
    fn from(op: StencilOp) -> Self {
        match op {
            StencilOp::Keep => wgpu::StencilOperation::Keep,
            StencilOp::Replace => wgpu::StencilOperation::Replace,
        }
    }
}

/// Fully resolved stencil behaviour of one draw.
///
/// The reference is set dynamically on the render pass; the rest is baked
/// into the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StencilFace {
    pub compare: StencilCompare,
    pub pass_op: StencilOp,
    pub reference: u32,
    pub read_mask: u32,
    pub write_mask: u32,
}

impl StencilFace {
    /// Ignores and preserves the buffer.
    pub const DISABLED: StencilFace = StencilFace {
        compare: StencilCompare::Always,
        pass_op: StencilOp::Keep,
        reference: 0,
        read_mask: 0,
        write_mask: 0,
    };

    pub(crate) fn pipeline_state(&self) -> wgpu::StencilState {
        let face = wgpu::StencilFaceState {
            compare: self.compare.into(),
            fail_op: wgpu::StencilOperation::Keep,
            depth_fail_op: wgpu::StencilOperation::Keep,
            pass_op: self.pass_op.into(),
        };
        wgpu::StencilState {
            front: face,
            back: face,
            read_mask: self.read_mask,
            write_mask: self.write_mask,
        }
    }

    /// Same state without the dynamic reference, for pipeline caching.
    pub(crate) fn without_reference(self) -> Self {
        Self {
            reference: 0,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layers_match_composition_scheme() {
        let mut alloc = StencilAllocator::default();
        let first = alloc.allocate().unwrap();
        assert_eq!(first.reference(), 0b0000_0011);
        assert_eq!(first.layer_mask(), 0x1e);
        assert_eq!(first.full_mask(), 0x1f);

        let second = alloc.allocate().unwrap();
        assert_eq!(second.reference(), 0b0000_0101);
        assert_ne!(first.reference() & first.layer_mask(), second.reference() & second.layer_mask());
    }

    #[test]
    fn references_stay_disjoint_until_exhausted() {
        let mut alloc = StencilAllocator::new(2).unwrap();
        assert_eq!(alloc.capacity(), 3);

        let refs: Vec<u32> = (0..3).map(|_| alloc.allocate().unwrap().reference()).collect();
        assert_eq!(refs, vec![3, 5, 7]);

        let err = alloc.allocate().unwrap_err();
        assert_eq!(
            err,
            StencilError::Exhausted {
                capacity: 3,
                layer_bits: 2
            }
        );
        assert!(err.to_string().contains("at most 3 portals"));
        assert_eq!(alloc.allocated(), 3);
    }

    #[test]
    fn every_reference_fits_the_buffer() {
        let mut alloc = StencilAllocator::new(7).unwrap();
        let mut last = 0;
        while let Ok(layer) = alloc.allocate() {
            assert!(layer.reference() < (1 << STENCIL_BITS));
            last = layer.reference();
        }
        assert_eq!(last, 0xff);
    }

    #[test]
    fn rejects_layer_bits_that_do_not_fit() {
        assert_eq!(
            StencilAllocator::new(8).unwrap_err(),
            StencilError::InvalidBits { layer_bits: 8 }
        );
        assert!(StencilAllocator::new(0).is_err());
    }
}
