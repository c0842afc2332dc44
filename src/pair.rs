use glam::Vec2;

use crate::actor::{Actor, COLLISION_EVENT};
use crate::types::*;

/// Two colliding actors found in one tick, with the translation that moves
/// `left` out of `right`. Equality ignores which actor is on which side.
#[derive(Copy, Clone, Debug)]
pub struct CollisionPair {
    pub left: ActorId,
    pub right: ActorId,
    /// Position of `left` in the actor slice the pair was detected on.
    pub left_index: usize,
    pub right_index: usize,
    pub intersect: Vec2,
    /// Face of `left` that was hit.
    pub side: Side,
}

impl PartialEq for CollisionPair {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for CollisionPair {}

impl CollisionPair {
    pub fn new(left: &Actor, left_index: usize, right: &Actor, right_index: usize, intersect: Vec2) -> Self {
        Self {
            left: left.id(),
            right: right.id(),
            left_index,
            right_index,
            intersect,
            side: Side::from_intersect(intersect),
        }
    }

    /// Narrow-phase test of `actors[i]` against `actors[j]`.
    pub fn detect(actors: &[Actor], i: usize, j: usize) -> Option<Self> {
        let (left, right) = (&actors[i], &actors[j]);
        let intersect = left.collides(right)?;
        Some(Self::new(left, i, right, j, intersect))
    }

    /// Order-independent identity of the pair.
    pub fn key(&self) -> (ActorId, ActorId) {
        if self.left <= self.right { (self.left, self.right) } else { (self.right, self.left) }
    }

    /// Publish events and apply corrections, cancelling `Active` velocities.
    pub fn evaluate(&self, actors: &mut [Actor]) {
        self.evaluate_with(actors, true);
    }

    pub fn evaluate_with(&self, actors: &mut [Actor], cancel_active_velocity: bool) {
        let (left, right) = pair_mut(actors, self.left_index, self.right_index);
        debug_assert_eq!(left.id(), self.left, "pair indices are stale");
        debug_assert_eq!(right.id(), self.right, "pair indices are stale");

        left.emit(
            COLLISION_EVENT,
            &CollisionEvent {
                actor: left.id(),
                other: right.id(),
                side: self.side,
                intersection: self.intersect,
            },
        );
        right.emit(
            COLLISION_EVENT,
            &CollisionEvent {
                actor: right.id(),
                other: left.id(),
                side: self.side.opposite(),
                intersection: -self.intersect,
            },
        );

        left.notify_groups(right.id(), right.collision_groups());
        right.notify_groups(left.id(), left.collision_groups());

        correct(left, right, self.side, self.intersect, cancel_active_velocity);
        correct(right, left, self.side.opposite(), -self.intersect, cancel_active_velocity);
    }

    /// Resolve already detected pairs in order.
    pub fn resolve_all(pairs: &[CollisionPair], actors: &mut [Actor], cancel_active_velocity: bool) {
        for pair in pairs {
            pair.evaluate_with(actors, cancel_active_velocity);
        }
    }
}

fn pair_mut(actors: &mut [Actor], i: usize, j: usize) -> (&mut Actor, &mut Actor) {
    assert_ne!(i, j, "an actor cannot pair with itself");
    if i < j {
        let (head, tail) = actors.split_at_mut(j);
        (&mut head[i], &mut tail[0])
    } else {
        let (head, tail) = actors.split_at_mut(i);
        (&mut tail[0], &mut head[j])
    }
}

/// Push `actor` out of `other` if its type allows it.
fn correct(actor: &mut Actor, other: &Actor, side: Side, intersect: Vec2, cancel_velocity: bool) {
    if !actor.collision_type.is_movable() || other.collision_type == CollisionType::Passive {
        return;
    }
    actor.pos += intersect;

    if actor.collision_type == CollisionType::Elastic {
        match side {
            Side::Left => actor.vel.x = actor.vel.x.abs(),
            Side::Right => actor.vel.x = -actor.vel.x.abs(),
            Side::Top => actor.vel.y = actor.vel.y.abs(),
            Side::Bottom => actor.vel.y = -actor.vel.y.abs(),
            Side::None => {}
        }
    } else if cancel_velocity {
        if intersect.x != 0.0 {
            actor.vel.x = cancel_axis(actor.vel.x, other.vel.x);
        }
        if intersect.y != 0.0 {
            actor.vel.y = cancel_axis(actor.vel.y, other.vel.y);
        }
    }
}

/// Same direction keeps the slower speed, opposing directions stop.
fn cancel_axis(mine: f32, theirs: f32) -> f32 {
    if mine <= 0.0 && theirs <= 0.0 {
        mine.max(theirs)
    } else if mine >= 0.0 && theirs >= 0.0 {
        mine.min(theirs)
    } else {
        0.0
    }
}
