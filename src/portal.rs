//! Portals: stencil layers with a transition state.
//!
//! A portal owns one [`StencilLayer`]. Materials refer to a portal through a
//! [`StencilMode`] instead of carrying stencil numbers themselves; the actual
//! compare/op pair for each draw is resolved here from the portal's current
//! [`PortalState`]. Flipping the gate is therefore a single state change.
//!
//! | State      | Gate   | Reader compare | Writer          |
//! |------------|--------|----------------|-----------------|
//! | `Idle`     | closed | `Equal`        | `Always/Replace`|
//! | `Entering` | closed | `Equal`        | `Always/Replace`|
//! | `Entered`  | open   | `Always`       | `Always/Keep`   |
//! | `Exiting`  | open   | `Always`       | `Always/Keep`   |

use hecs::Entity;

use crate::stencil::{COMPOSITION_BIT, StencilCompare, StencilFace, StencilLayer, StencilOp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortalId(pub(crate) usize);

/// Where a portal is in its enter/exit cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PortalState {
    /// Viewed from outside.
    #[default]
    Idle,
    /// Camera moving in; the old content is still interactive.
    Entering,
    /// Camera settled inside; the portal content owns input.
    Entered,
    /// Camera moving back out.
    Exiting,
}

impl PortalState {
    /// Whether the portal's content draws unmasked.
    pub fn gate_open(self) -> bool {
        matches!(self, PortalState::Entered | PortalState::Exiting)
    }

    pub fn is_transitioning(self) -> bool {
        matches!(self, PortalState::Entering | PortalState::Exiting)
    }
}

/// How a material participates in stencil masking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StencilMode {
    /// No stencil interaction.
    #[default]
    None,
    /// Draws the portal silhouette into the buffer.
    Writer(PortalId),
    /// Draws only inside the portal silhouette while its gate is closed.
    Reader(PortalId),
}

#[derive(Debug)]
pub struct Portal {
    layer: StencilLayer,
    parent: Option<PortalId>,
    state: PortalState,
    saved_interactables: Option<Vec<Entity>>,
}

impl Portal {
    pub fn layer(&self) -> StencilLayer {
        self.layer
    }

    pub fn parent(&self) -> Option<PortalId> {
        self.parent
    }

    pub fn state(&self) -> PortalState {
        self.state
    }
}

/// Registry of every portal in the process.
#[derive(Debug, Default)]
pub struct Portals {
    portals: Vec<Portal>,
}

impl Portals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layer: StencilLayer, parent: Option<PortalId>) -> PortalId {
        let id = PortalId(self.portals.len());
        self.portals.push(Portal {
            layer,
            parent,
            state: PortalState::Idle,
            saved_interactables: None,
        });
        id
    }

    pub fn get(&self, id: PortalId) -> Option<&Portal> {
        self.portals.get(id.0)
    }

    /// State of `id`, `Idle` for unknown ids.
    pub fn state(&self, id: PortalId) -> PortalState {
        self.get(id).map(Portal::state).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.portals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.portals.is_empty()
    }

    /// True while any portal's camera transition is still running.
    pub fn any_transitioning(&self) -> bool {
        self.portals.iter().any(|p| p.state.is_transitioning())
    }

    pub(crate) fn set_state(&mut self, id: PortalId, state: PortalState) {
        if let Some(portal) = self.portals.get_mut(id.0) {
            tracing::debug!(portal = id.0, from = ?portal.state, to = ?state, "portal state");
            portal.state = state;
        }
    }

    pub(crate) fn save_interactables(&mut self, id: PortalId, set: Vec<Entity>) {
        if let Some(portal) = self.portals.get_mut(id.0) {
            portal.saved_interactables = Some(set);
        }
    }

    pub(crate) fn take_interactables(&mut self, id: PortalId) -> Option<Vec<Entity>> {
        self.portals
            .get_mut(id.0)
            .and_then(|p| p.saved_interactables.take())
    }

    fn gate_open(&self, id: PortalId) -> bool {
        self.state(id).gate_open()
    }

    /// Number of closed portals strictly above `id`.
    fn closed_ancestors(&self, id: PortalId) -> u8 {
        let mut count = 0;
        let mut cursor = self.get(id).and_then(Portal::parent);
        // Parents are always inserted before children, so this terminates.
        while let Some(parent) = cursor {
            if !self.gate_open(parent) {
                count += 1;
            }
            cursor = self.get(parent).and_then(Portal::parent);
        }
        count
    }

    /// Stencil compare/op for a material in the current portal states.
    pub fn resolve(&self, mode: StencilMode) -> StencilFace {
        match mode {
            StencilMode::None => StencilFace::DISABLED,
            StencilMode::Reader(id) => {
                let Some(portal) = self.get(id) else {
                    return StencilFace::DISABLED;
                };
                if portal.state.gate_open() {
                    StencilFace {
                        compare: StencilCompare::Always,
                        pass_op: StencilOp::Keep,
                        reference: portal.layer.reference(),
                        read_mask: 0,
                        write_mask: 0,
                    }
                } else {
                    StencilFace {
                        compare: StencilCompare::Equal,
                        pass_op: StencilOp::Keep,
                        reference: portal.layer.reference(),
                        read_mask: portal.layer.full_mask(),
                        write_mask: 0,
                    }
                }
            }
            StencilMode::Writer(id) => {
                let Some(portal) = self.get(id) else {
                    return StencilFace::DISABLED;
                };
                let layer = portal.layer;
                if portal.state.gate_open() {
                    return StencilFace {
                        compare: StencilCompare::Always,
                        pass_op: StencilOp::Keep,
                        reference: layer.reference(),
                        read_mask: 0,
                        write_mask: 0,
                    };
                }
                let nested = portal.parent.is_some_and(|p| !self.gate_open(p));
                StencilFace {
                    compare: if nested {
                        StencilCompare::Equal
                    } else {
                        StencilCompare::Always
                    },
                    pass_op: StencilOp::Replace,
                    reference: layer.reference(),
                    read_mask: if nested { COMPOSITION_BIT } else { 0 },
                    write_mask: layer.full_mask(),
                }
            }
        }
    }

    /// Draw bucket for a material. Lower buckets draw first.
    ///
    /// Writers land one bucket before the readers they gate; open gates fall
    /// back to the bucket of their enclosing portal.
    pub fn render_order(&self, mode: StencilMode) -> u8 {
        match mode {
            StencilMode::None => 0,
            StencilMode::Writer(id) => 2 * self.closed_ancestors(id),
            StencilMode::Reader(id) => {
                let base = 2 * self.closed_ancestors(id);
                if self.gate_open(id) { base } else { base + 1 }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencil::StencilAllocator;

    fn portals_with_child() -> (Portals, PortalId, PortalId) {
        let mut alloc = StencilAllocator::default();
        let mut portals = Portals::new();
        let outer = portals.insert(alloc.allocate().unwrap(), None);
        let inner = portals.insert(alloc.allocate().unwrap(), Some(outer));
        (portals, outer, inner)
    }

    #[test]
    fn reader_gate_follows_state() {
        let (mut portals, outer, _) = portals_with_child();
        let reader = StencilMode::Reader(outer);

        for (state, expected) in [
            (PortalState::Idle, StencilCompare::Equal),
            (PortalState::Entering, StencilCompare::Equal),
            (PortalState::Entered, StencilCompare::Always),
        ] {
            portals.set_state(outer, state);
            let face = portals.resolve(reader);
            assert_eq!(face.compare, expected, "{state:?}");
            assert_eq!(face.pass_op, StencilOp::Keep);
            assert_eq!(face.write_mask, 0);
        }
    }

    #[test]
    fn writer_and_reader_agree_on_reference() {
        let (portals, outer, _) = portals_with_child();
        let writer = portals.resolve(StencilMode::Writer(outer));
        let reader = portals.resolve(StencilMode::Reader(outer));
        assert_eq!(writer.compare, StencilCompare::Always);
        assert_eq!(writer.pass_op, StencilOp::Replace);
        assert_eq!(writer.reference, reader.reference);
        assert_eq!(reader.read_mask, 0x1f);
    }

    #[test]
    fn open_writer_stops_writing() {
        let (mut portals, outer, _) = portals_with_child();
        portals.set_state(outer, PortalState::Entered);
        let face = portals.resolve(StencilMode::Writer(outer));
        assert_eq!(face.compare, StencilCompare::Always);
        assert_eq!(face.pass_op, StencilOp::Keep);
        assert_eq!(face.write_mask, 0);
    }

    #[test]
    fn nested_writer_gated_by_composition_bit() {
        let (mut portals, outer, inner) = portals_with_child();
        let face = portals.resolve(StencilMode::Writer(inner));
        assert_eq!(face.compare, StencilCompare::Equal);
        assert_eq!(face.read_mask, COMPOSITION_BIT);
        assert_eq!(face.pass_op, StencilOp::Replace);

        portals.set_state(outer, PortalState::Entered);
        let face = portals.resolve(StencilMode::Writer(inner));
        assert_eq!(face.compare, StencilCompare::Always);
        assert_eq!(face.pass_op, StencilOp::Replace);
    }

    #[test]
    fn render_order_puts_writers_before_readers() {
        let (mut portals, outer, inner) = portals_with_child();
        assert_eq!(portals.render_order(StencilMode::Writer(outer)), 0);
        assert_eq!(portals.render_order(StencilMode::Reader(outer)), 1);
        assert_eq!(portals.render_order(StencilMode::Writer(inner)), 2);
        assert_eq!(portals.render_order(StencilMode::Reader(inner)), 3);

        portals.set_state(outer, PortalState::Entered);
        assert_eq!(portals.render_order(StencilMode::Reader(outer)), 0);
        assert_eq!(portals.render_order(StencilMode::Writer(inner)), 0);
        assert_eq!(portals.render_order(StencilMode::Reader(inner)), 1);
    }

    #[test]
    fn transitioning_is_tracked_across_portals() {
        let (mut portals, outer, inner) = portals_with_child();
        assert!(!portals.any_transitioning());
        portals.set_state(inner, PortalState::Exiting);
        assert!(portals.any_transitioning());
        assert!(portals.state(inner).gate_open());
        portals.set_state(inner, PortalState::Idle);
        portals.set_state(outer, PortalState::Entered);
        assert!(!portals.any_transitioning());
    }
}
