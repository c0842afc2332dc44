//! The actor surface the collision core consumes: geometry, velocity,
//! collision policy, kill state and an event-publishing capability.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec2;
use rustc_hash::FxHashMap;

use crate::api::Collidable;
use crate::bounds::BoundingBox;
use crate::error::Result;
use crate::narrowphase::Shape;
use crate::sat::SatPolygon;
use crate::types::*;

/// Channel name of collision events.
pub const COLLISION_EVENT: &str = "collision";

pub type EventHandler = Box<dyn FnMut(&CollisionEvent)>;
pub type GroupHandler = Box<dyn FnMut(ActorId)>;

static NEXT_ACTOR_ID: AtomicU64 = AtomicU64::new(0);

fn next_actor_id() -> ActorId {
    ActorId(NEXT_ACTOR_ID.fetch_add(1, Ordering::Relaxed))
}

/// String-keyed event channels with boxed handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: FxHashMap<String, Vec<EventHandler>>,
}

impl EventDispatcher {
    pub fn on(&mut self, name: &str, handler: impl FnMut(&CollisionEvent) + 'static) {
        self.handlers.entry(name.to_owned()).or_default().push(Box::new(handler));
    }

    /// Drop every handler of a channel.
    pub fn off(&mut self, name: &str) {
        self.handlers.remove(name);
    }

    pub fn emit(&mut self, name: &str, event: &CollisionEvent) {
        if let Some(list) = self.handlers.get_mut(name) {
            for handler in list.iter_mut() {
                handler(event);
            }
        }
    }

    pub fn handler_count(&self, name: &str) -> usize {
        self.handlers.get(name).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut channels: Vec<(&str, usize)> = self.handlers.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        channels.sort_unstable();
        f.debug_struct("EventDispatcher").field("channels", &channels).finish()
    }
}

/// Collision geometry of an actor.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ActorShape {
    /// Axis-aligned box from position, size, scale and anchor.
    #[default]
    Box,
    /// Convex polygon in local space, relative to the actor position and
    /// rotated by the actor rotation.
    Polygon(SatPolygon),
}

pub struct Actor {
    id: ActorId,
    pub pos: Vec2,
    pub width: f32,
    pub height: f32,
    pub scale: Vec2,
    /// Fraction of the size the position refers to; `(0, 0)` is the top-left corner.
    pub anchor: Vec2,
    /// Radians. Only polygon shapes rotate; boxes stay axis-aligned.
    pub rotation: f32,
    pub vel: Vec2,
    pub collision_type: CollisionType,
    pub mask: LayerMask,
    shape: ActorShape,
    collision_groups: Vec<String>,
    killed: bool,
    events: EventDispatcher,
    group_handlers: FxHashMap<String, Vec<GroupHandler>>,
    tick_events: Vec<CollisionEvent>,
}

impl Actor {
    /// Box actor with its top-left corner at `(x, y)`, `Active` by default.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            id: next_actor_id(),
            pos: Vec2::new(x, y),
            width,
            height,
            scale: Vec2::ONE,
            anchor: Vec2::ZERO,
            rotation: 0.0,
            vel: Vec2::ZERO,
            collision_type: CollisionType::default(),
            mask: LayerMask::default(),
            shape: ActorShape::Box,
            collision_groups: Vec::new(),
            killed: false,
            events: EventDispatcher::default(),
            group_handlers: FxHashMap::default(),
            tick_events: Vec::new(),
        }
    }

    pub fn with_collision_type(mut self, collision_type: CollisionType) -> Self {
        self.collision_type = collision_type;
        self
    }

    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.vel = vel;
        self
    }

    pub fn with_mask(mut self, mask: LayerMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_anchor(mut self, anchor: Vec2) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    /// Switch to a convex polygon collider given in local space.
    pub fn with_polygon(mut self, points: Vec<Vec2>) -> Result<Self> {
        self.shape = ActorShape::Polygon(SatPolygon::new(points)?);
        Ok(self)
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn shape(&self) -> &ActorShape {
        &self.shape
    }

    /// World-space axis-aligned bounds.
    pub fn bounds(&self) -> BoundingBox {
        match &self.shape {
            ActorShape::Box => {
                let w = self.width * self.scale.x;
                let h = self.height * self.scale.y;
                let left = self.pos.x - w * self.anchor.x;
                let top = self.pos.y - h * self.anchor.y;
                BoundingBox::new(left, top, left + w, top + h)
            }
            ActorShape::Polygon(_) => self.collider().bounds(),
        }
    }

    /// World-space collision shape.
    pub fn collider(&self) -> Shape {
        match &self.shape {
            ActorShape::Box => Shape::Aabb(self.bounds()),
            ActorShape::Polygon(local) => {
                let world = local.translate(self.pos);
                if self.rotation == 0.0 {
                    Shape::Polygon(world)
                } else {
                    Shape::Polygon(world.rotate(self.rotation, self.pos))
                }
            }
        }
    }

    /// Translation that moves `self` out of `other`, if they overlap.
    pub fn collides(&self, other: &Actor) -> Option<Vec2> {
        self.collider().collides_with(&other.collider())
    }

    pub fn contains(&self, p: Vec2) -> bool {
        self.collider().contains(p)
    }

    pub fn kill(&mut self) {
        self.killed = true;
    }

    pub fn is_killed(&self) -> bool {
        self.killed
    }

    /// Alive and not opted out of collisions.
    pub fn can_collide(&self) -> bool {
        !self.killed && self.collision_type != CollisionType::PreventCollision
    }

    /// Eligible to be paired with `other` at all.
    pub fn can_collide_with(&self, other: &Actor) -> bool {
        self.id != other.id && self.can_collide() && other.can_collide() && self.mask.mutual(other.mask)
    }

    // --- Events ------------------------------------------------------------

    pub fn on_collision(&mut self, handler: impl FnMut(&CollisionEvent) + 'static) {
        self.events.on(COLLISION_EVENT, handler);
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventDispatcher {
        &mut self.events
    }

    /// Publish on a channel. Collision events are also kept for polling
    /// until [`Actor::clear_collision_events`].
    pub fn emit(&mut self, name: &str, event: &CollisionEvent) {
        if name == COLLISION_EVENT {
            self.tick_events.push(*event);
        }
        self.events.emit(name, event);
    }

    /// Collision events received since the last clear (the current tick in a world).
    pub fn collision_events(&self) -> &[CollisionEvent] {
        &self.tick_events
    }

    pub fn clear_collision_events(&mut self) {
        self.tick_events.clear();
    }

    // --- Collision groups ----------------------------------------------------

    pub fn add_collision_group(&mut self, name: &str) {
        if !self.in_collision_group(name) {
            self.collision_groups.push(name.to_owned());
        }
    }

    pub fn remove_collision_group(&mut self, name: &str) {
        self.collision_groups.retain(|g| g != name);
    }

    pub fn collision_groups(&self) -> &[String] {
        &self.collision_groups
    }

    pub fn in_collision_group(&self, name: &str) -> bool {
        self.collision_groups.iter().any(|g| g == name)
    }

    /// Called with the other actor's id whenever this actor collides with a
    /// member of `group`.
    pub fn on_collides_with_group(&mut self, group: &str, handler: impl FnMut(ActorId) + 'static) {
        self.group_handlers.entry(group.to_owned()).or_default().push(Box::new(handler));
    }

    pub fn remove_group_handlers(&mut self, group: &str) {
        self.group_handlers.remove(group);
    }

    pub(crate) fn notify_groups(&mut self, other: ActorId, other_groups: &[String]) {
        for group in other_groups {
            if let Some(list) = self.group_handlers.get_mut(group) {
                for handler in list.iter_mut() {
                    handler(other);
                }
            }
        }
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.id)
            .field("pos", &self.pos)
            .field("size", &(self.width, self.height))
            .field("vel", &self.vel)
            .field("collision_type", &self.collision_type)
            .field("killed", &self.killed)
            .finish_non_exhaustive()
    }
}
