use glam::Vec2;

use crate::actor::Actor;
use crate::algebra::{Projection, Ray};
use crate::bounds::BoundingBox;
use crate::narrowphase::Shape;
use crate::pair::CollisionPair;
use crate::types::*;

/// Shape-agnostic narrow-phase surface shared by boxes and polygons.
pub trait Collidable {
    /// Minimum translation vector that moves `self` out of `other`, if they overlap.
    fn collides_with(&self, other: &Shape) -> Option<Vec2>;

    /// Whether the point lies inside the shape.
    fn contains_point(&self, p: Vec2) -> bool;

    /// Axis-aligned bounds of the shape.
    fn bounds(&self) -> BoundingBox;

    /// Candidate separating axes.
    fn axes(&self) -> Vec<Vec2>;

    /// Interval covered by the shape on `axis`.
    fn project(&self, axis: Vec2) -> Projection;
}

/// Public contract of a collision resolution strategy.
///
/// Actors are referenced by id, never owned. A tick is `update` followed by
/// `evaluate`; detection of every pair completes before any pair is resolved.
pub trait CollisionResolver {
    /// Start tracking an actor.
    fn register(&mut self, actor: &Actor);

    /// Stop tracking an actor. Unknown actors are ignored.
    fn remove(&mut self, actor: &Actor);

    /// Push the latest actor bounds into the broad phase. Returns how many
    /// actors had to be re-placed.
    fn update(&mut self, actors: &[Actor]) -> usize;

    /// Find every colliding pair, deduplicated, without touching the actors.
    fn detect(&self, actors: &[Actor]) -> Vec<CollisionPair>;

    /// Detect, then resolve every pair in order. Returns the resolved pairs.
    fn evaluate(&mut self, actors: &mut [Actor]) -> Vec<CollisionPair> {
        let pairs = self.detect(actors);
        CollisionPair::resolve_all(&pairs, actors, self.cancel_active_velocity());
        pairs
    }

    /// Whether `Active` actors lose their velocity along the correction axis.
    fn cancel_active_velocity(&self) -> bool {
        true
    }

    /// Closest actor hit by the ray within `max`, with the hit distance.
    fn ray_cast(&self, ray: &Ray, max: f32, actors: &[Actor]) -> Option<(ActorId, f32)>;

    /// Broad-phase candidates for `area`. May contain false positives.
    fn candidates(&self, area: &BoundingBox, actors: &[Actor]) -> Vec<ActorId>;

    /// `(live nodes, height)` of the broad-phase structure, zero when there is none.
    fn broadphase_stats(&self) -> (usize, i32) {
        (0, 0)
    }

    /// Forget every tracked actor.
    fn clear(&mut self);

    fn strategy(&self) -> CollisionStrategy;
}
