//! Broad-phase strategies behind [`CollisionResolver`].

use log::trace;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::actor::Actor;
use crate::algebra::Ray;
use crate::api::CollisionResolver;
use crate::bounds::BoundingBox;
use crate::pair::CollisionPair;
use crate::tree::DynamicTree;
use crate::types::*;

/// Build the resolver selected by `cfg.strategy`.
pub fn resolver_for(cfg: &WorldConfig) -> Box<dyn CollisionResolver> {
    match cfg.strategy {
        CollisionStrategy::Naive => Box::new(NaiveCollisionResolver::new(cfg)),
        CollisionStrategy::DynamicAabbTree => Box::new(DynamicTreeCollisionResolver::new(cfg)),
    }
}

fn push_unique(pairs: &mut Vec<CollisionPair>, seen: &mut FxHashSet<(ActorId, ActorId)>, pair: CollisionPair) {
    if seen.insert(pair.key()) {
        trace!("pair {:?} <-> {:?} side {:?}", pair.left, pair.right, pair.side);
        pairs.push(pair);
    }
}

/// Pairwise O(n²) tests, no persistent state.
#[derive(Debug)]
pub struct NaiveCollisionResolver {
    cancel_active_velocity: bool,
}

impl Default for NaiveCollisionResolver {
    fn default() -> Self {
        Self::new(&WorldConfig::default())
    }
}

impl NaiveCollisionResolver {
    pub fn new(cfg: &WorldConfig) -> Self {
        Self {
            cancel_active_velocity: cfg.cancel_active_velocity,
        }
    }
}

impl CollisionResolver for NaiveCollisionResolver {
    fn register(&mut self, _actor: &Actor) {}

    fn remove(&mut self, _actor: &Actor) {}

    fn update(&mut self, _actors: &[Actor]) -> usize {
        0
    }

    fn detect(&self, actors: &[Actor]) -> Vec<CollisionPair> {
        let mut pairs = Vec::new();
        let mut seen = FxHashSet::default();
        for i in 0..actors.len() {
            if !actors[i].can_collide() {
                continue;
            }
            for j in 0..actors.len() {
                if !actors[i].can_collide_with(&actors[j]) {
                    continue;
                }
                if let Some(pair) = CollisionPair::detect(actors, i, j) {
                    push_unique(&mut pairs, &mut seen, pair);
                }
            }
        }
        pairs
    }

    fn cancel_active_velocity(&self) -> bool {
        self.cancel_active_velocity
    }

    fn ray_cast(&self, ray: &Ray, max: f32, actors: &[Actor]) -> Option<(ActorId, f32)> {
        actors
            .iter()
            .filter(|a| a.can_collide())
            .filter_map(|a| a.collider().ray_cast(ray, max).map(|t| (a.id(), t)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    fn candidates(&self, _area: &BoundingBox, actors: &[Actor]) -> Vec<ActorId> {
        actors.iter().filter(|a| !a.is_killed()).map(Actor::id).collect()
    }

    fn clear(&mut self) {}

    fn strategy(&self) -> CollisionStrategy {
        CollisionStrategy::Naive
    }
}

/// Dynamic AABB tree broad phase with fattened, lazily re-inserted leaves.
pub struct DynamicTreeCollisionResolver {
    tree: DynamicTree,
    cancel_active_velocity: bool,
}

impl Default for DynamicTreeCollisionResolver {
    fn default() -> Self {
        Self::new(&WorldConfig::default())
    }
}

impl DynamicTreeCollisionResolver {
    pub fn new(cfg: &WorldConfig) -> Self {
        Self {
            tree: DynamicTree::new(cfg),
            cancel_active_velocity: cfg.cancel_active_velocity,
        }
    }

    pub fn tree(&self) -> &DynamicTree {
        &self.tree
    }
}

fn index_by_id(actors: &[Actor]) -> FxHashMap<ActorId, usize> {
    actors.iter().enumerate().map(|(i, a)| (a.id(), i)).collect()
}

impl CollisionResolver for DynamicTreeCollisionResolver {
    fn register(&mut self, actor: &Actor) {
        self.tree.register_actor(actor);
    }

    fn remove(&mut self, actor: &Actor) {
        self.tree.remove_actor(actor);
    }

    fn update(&mut self, actors: &[Actor]) -> usize {
        actors.iter().filter(|a| self.tree.update_actor(a)).count()
    }

    fn detect(&self, actors: &[Actor]) -> Vec<CollisionPair> {
        let index = index_by_id(actors);
        let mut pairs = Vec::new();
        let mut seen = FxHashSet::default();
        for (i, actor) in actors.iter().enumerate() {
            if !actor.can_collide() {
                continue;
            }
            self.tree.query(actor, |other| {
                // Leaves can outlive the actor slice they were registered from
                let Some(&j) = index.get(&other) else {
                    return false;
                };
                if actor.can_collide_with(&actors[j]) {
                    if let Some(pair) = CollisionPair::detect(actors, i, j) {
                        push_unique(&mut pairs, &mut seen, pair);
                    }
                }
                false
            });
        }
        pairs
    }

    fn cancel_active_velocity(&self) -> bool {
        self.cancel_active_velocity
    }

    fn ray_cast(&self, ray: &Ray, max: f32, actors: &[Actor]) -> Option<(ActorId, f32)> {
        let index = index_by_id(actors);
        self.tree.ray_cast(ray, max, |id, _entry| {
            let actor = &actors[*index.get(&id)?];
            if !actor.can_collide() {
                return None;
            }
            actor.collider().ray_cast(ray, max)
        })
    }

    fn candidates(&self, area: &BoundingBox, _actors: &[Actor]) -> Vec<ActorId> {
        let mut found = Vec::new();
        self.tree.query_bounds(area, |id| {
            found.push(id);
            false
        });
        found
    }

    fn broadphase_stats(&self) -> (usize, i32) {
        (self.tree.node_count(), self.tree.height())
    }

    fn clear(&mut self) {
        self.tree.clear();
    }

    fn strategy(&self) -> CollisionStrategy {
        CollisionStrategy::DynamicAabbTree
    }
}
