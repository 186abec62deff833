//! Pointer-to-object dispatch.
//!
//! The [`Interacter`] knows nothing about scenes. It owns:
//!
//! - the active *interactable set*: the only entities pointer rays test
//! - a registry mapping entities to their [`Handlers`]
//! - the currently hovered entity (a plain id, it never keeps anything alive)
//! - the *escape stack*: actions that back out of the most recently entered view
//!
//! Handlers are data (`A` is usually an action enum), so dispatch returns
//! [`Interaction`]s for the caller to execute instead of calling into
//! scene code.

use std::collections::HashMap;

use glam::Vec2;
use hecs::{Entity, World};

use crate::picking::{Ray, RayHit, raycast};

/// Per-entity reactions to pointer input.
#[derive(Clone, Debug, PartialEq)]
pub struct Handlers<A> {
    pub on_click: Option<A>,
    pub on_hover: Option<A>,
    pub on_dehover: Option<A>,
}

impl<A> Default for Handlers<A> {
    fn default() -> Self {
        Self {
            on_click: None,
            on_hover: None,
            on_dehover: None,
        }
    }
}

impl<A> Handlers<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn click(mut self, action: A) -> Self {
        self.on_click = Some(action);
        self
    }

    pub fn hover(mut self, action: A) -> Self {
        self.on_hover = Some(action);
        self
    }

    pub fn dehover(mut self, action: A) -> Self {
        self.on_dehover = Some(action);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.on_click.is_none() && self.on_hover.is_none() && self.on_dehover.is_none()
    }
}

/// A handler that fired, with the entity it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub enum Interaction<A> {
    Click { action: A, hit: RayHit },
    Hover { action: A, hit: RayHit },
    Dehover { action: A, entity: Entity },
}

impl<A> Interaction<A> {
    pub fn action(&self) -> &A {
        match self {
            Interaction::Click { action, .. }
            | Interaction::Hover { action, .. }
            | Interaction::Dehover { action, .. } => action,
        }
    }

    pub fn entity(&self) -> Entity {
        match self {
            Interaction::Click { hit, .. } | Interaction::Hover { hit, .. } => hit.entity,
            Interaction::Dehover { entity, .. } => *entity,
        }
    }

    pub fn into_parts(self) -> (A, Entity) {
        match self {
            Interaction::Click { action, hit } | Interaction::Hover { action, hit } => {
                (action, hit.entity)
            }
            Interaction::Dehover { action, entity } => (action, entity),
        }
    }
}

pub struct Interacter<A> {
    ndc: Vec2,
    hovered: Option<Entity>,
    interactables: Vec<Entity>,
    handlers: HashMap<Entity, Handlers<A>>,
    escape: Vec<A>,
}

impl<A> Default for Interacter<A> {
    fn default() -> Self {
        Self {
            ndc: Vec2::ZERO,
            hovered: None,
            interactables: Vec::new(),
            handlers: HashMap::new(),
            escape: Vec::new(),
        }
    }
}

impl<A: Clone> Interacter<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity: Entity, handlers: Handlers<A>) {
        if handlers.is_empty() {
            self.handlers.remove(&entity);
        } else {
            self.handlers.insert(entity, handlers);
        }
    }

    pub fn handlers(&self, entity: Entity) -> Option<&Handlers<A>> {
        self.handlers.get(&entity)
    }

    /// Replace the interactable set wholesale, returning the previous one.
    pub fn set_interactables(&mut self, set: Vec<Entity>) -> Vec<Entity> {
        std::mem::replace(&mut self.interactables, set)
    }

    pub fn interactables(&self) -> &[Entity] {
        &self.interactables
    }

    pub fn hovered(&self) -> Option<Entity> {
        self.hovered
    }

    /// Last pointer position in normalized device coordinates.
    pub fn ndc(&self) -> Vec2 {
        self.ndc
    }

    /// Update hover state for a pointer at `ndc`, casting `ray`.
    ///
    /// Emits at most a dehover of the previous entity followed by a hover of
    /// the new one. Moving within the same entity emits nothing.
    pub fn on_pointer_move(&mut self, ndc: Vec2, ray: &Ray, world: &World) -> Vec<Interaction<A>> {
        self.ndc = ndc;
        let hit = raycast(world, ray, &self.interactables);
        let next = hit.map(|h| h.entity);
        if next == self.hovered {
            return Vec::new();
        }

        let mut fired = Vec::with_capacity(2);
        if let Some(previous) = self.hovered.take()
            && let Some(action) = self.handlers.get(&previous).and_then(|h| h.on_dehover.clone())
        {
            fired.push(Interaction::Dehover {
                action,
                entity: previous,
            });
        }

        self.hovered = next;
        if let Some(hit) = hit
            && let Some(action) = self.handlers.get(&hit.entity).and_then(|h| h.on_hover.clone())
        {
            fired.push(Interaction::Hover { action, hit });
        }
        fired
    }

    /// Click the nearest interactable under the pointer, if it has a click handler.
    pub fn on_pointer_down(&mut self, ndc: Vec2, ray: &Ray, world: &World) -> Option<Interaction<A>> {
        self.ndc = ndc;
        let hit = raycast(world, ray, &self.interactables)?;
        let action = self.handlers.get(&hit.entity)?.on_click.clone()?;
        Some(Interaction::Click { action, hit })
    }

    pub fn push_escape(&mut self, action: A) {
        self.escape.push(action);
    }

    /// Pop the most recent escape action.
    pub fn on_cancel(&mut self) -> Option<A> {
        self.escape.pop()
    }

    pub fn escape_depth(&self) -> usize {
        self.escape.len()
    }
}
