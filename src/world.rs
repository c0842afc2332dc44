use glam::Vec2;
use log::{debug, warn};
use rustc_hash::FxHashSet;

use std::time::Instant;

use crate::actor::Actor;
use crate::algebra::Ray;
use crate::api::CollisionResolver;
use crate::bounds::BoundingBox;
use crate::pair::CollisionPair;
use crate::resolver::resolver_for;
use crate::types::*;

/// Owns the actors of a scene and drives one collision pass per tick.
pub struct CollisionWorld {
    pub cfg: WorldConfig,
    pub frame_counter: u32,

    actors: Vec<Actor>,
    resolver: Box<dyn CollisionResolver>,

    // Stats of the last tick
    last_reinserted: usize,
    last_pairs: usize,
    last_timing: Option<WorldTiming>,
}

impl CollisionWorld {
    pub fn new(cfg: WorldConfig) -> Self {
        let resolver = resolver_for(&cfg);
        Self {
            cfg,
            frame_counter: 0,
            actors: Vec::new(),
            resolver,
            last_reinserted: 0,
            last_pairs: 0,
            last_timing: None,
        }
    }

    /// Take ownership of an actor and register it with the broad phase.
    pub fn add(&mut self, actor: Actor) -> ActorId {
        let id = actor.id();
        self.resolver.register(&actor);
        debug!("world: added {:?} at {:?}", id, actor.pos);
        self.actors.push(actor);
        id
    }

    pub fn remove(&mut self, id: ActorId) -> Option<Actor> {
        let Some(i) = self.index_of(id) else {
            warn!("world: remove of unknown actor {:?}", id);
            return None;
        };
        let actor = self.actors.remove(i);
        self.resolver.remove(&actor);
        debug!("world: removed {:?}", id);
        Some(actor)
    }

    fn index_of(&self, id: ActorId) -> Option<usize> {
        self.actors.iter().position(|a| a.id() == id)
    }

    pub fn get(&self, id: ActorId) -> Option<&Actor> {
        self.actors.iter().find(|a| a.id() == id)
    }

    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.iter_mut().find(|a| a.id() == id)
    }

    /// Actors in insertion order.
    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn actors_mut(&mut self) -> &mut [Actor] {
        &mut self.actors
    }

    /// Mark an actor dead. It stops colliding at once and is dropped at the
    /// end of the next tick.
    pub fn kill(&mut self, id: ActorId) -> bool {
        match self.get_mut(id) {
            Some(actor) => {
                actor.kill();
                true
            }
            None => {
                warn!("world: kill of unknown actor {:?}", id);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn strategy(&self) -> CollisionStrategy {
        self.resolver.strategy()
    }

    /// Swap the broad phase; every live actor is registered with the new one.
    pub fn set_strategy(&mut self, strategy: CollisionStrategy) {
        if strategy == self.resolver.strategy() {
            return;
        }
        self.cfg.strategy = strategy;
        self.resolver = resolver_for(&self.cfg);
        for actor in self.actors.iter().filter(|a| !a.is_killed()) {
            self.resolver.register(actor);
        }
        debug!("world: switched to {:?} with {} actors", strategy, self.actors.len());
    }

    /// Integrate velocities over `dt`, then run a collision pass.
    pub fn step(&mut self, dt: f32) -> Vec<CollisionPair> {
        for actor in self.actors.iter_mut().filter(|a| !a.is_killed()) {
            actor.pos += actor.vel * dt;
        }
        self.collide()
    }

    /// One collision pass: refresh the broad phase, detect every pair, then
    /// resolve them in order. Killed actors are dropped afterwards.
    pub fn collide(&mut self) -> Vec<CollisionPair> {
        let timing = self.cfg.enable_timing;
        let t_all = if timing { Some(Instant::now()) } else { None };
        self.frame_counter = self.frame_counter.wrapping_add(1);

        for actor in &mut self.actors {
            actor.clear_collision_events();
        }

        let t0 = if timing { Some(Instant::now()) } else { None };
        self.last_reinserted = self.resolver.update(&self.actors);
        let update_ms = t0.map(|t| t.elapsed().as_secs_f64() * 1000.0).unwrap_or(0.0);

        let t1 = if timing { Some(Instant::now()) } else { None };
        let pairs = self.resolver.detect(&self.actors);
        let detect_ms = t1.map(|t| t.elapsed().as_secs_f64() * 1000.0).unwrap_or(0.0);

        let t2 = if timing { Some(Instant::now()) } else { None };
        CollisionPair::resolve_all(&pairs, &mut self.actors, self.resolver.cancel_active_velocity());
        let resolve_ms = t2.map(|t| t.elapsed().as_secs_f64() * 1000.0).unwrap_or(0.0);

        self.prune_killed();
        self.last_pairs = pairs.len();

        self.last_timing = t_all.map(|t| WorldTiming {
            collide_ms: t.elapsed().as_secs_f64() * 1000.0,
            update_ms,
            detect_ms,
            resolve_ms,
            pairs_resolved: pairs.len(),
        });
        pairs
    }

    fn prune_killed(&mut self) {
        if !self.actors.iter().any(Actor::is_killed) {
            return;
        }
        let resolver = &mut self.resolver;
        self.actors.retain(|a| {
            if a.is_killed() {
                resolver.remove(a);
                debug!("world: dropped killed {:?}", a.id());
                false
            } else {
                true
            }
        });
    }

    /// Catch the broad phase up with moves made outside `collide`.
    fn refresh(&mut self) {
        self.resolver.update(&self.actors);
    }

    /// Live actors whose shape contains `p`.
    pub fn query_point(&mut self, p: Vec2) -> Vec<ActorId> {
        self.refresh();
        let area = BoundingBox::new(p.x, p.y, p.x, p.y).fatten(1.0);
        self.filter_candidates(&area, |a| a.contains(p))
    }

    /// Live actors whose bounds overlap `area`.
    pub fn query_area(&mut self, area: &BoundingBox) -> Vec<ActorId> {
        self.refresh();
        self.filter_candidates(area, |a| a.bounds().overlaps(area))
    }

    fn filter_candidates(&self, area: &BoundingBox, keep: impl Fn(&Actor) -> bool) -> Vec<ActorId> {
        let candidates: FxHashSet<ActorId> = self.resolver.candidates(area, &self.actors).into_iter().collect();
        self.actors
            .iter()
            .filter(|a| !a.is_killed() && candidates.contains(&a.id()) && keep(a))
            .map(Actor::id)
            .collect()
    }

    /// Closest collidable actor hit by the ray within `max`.
    pub fn raycast(&mut self, ray: &Ray, max: f32) -> Option<(ActorId, f32)> {
        self.refresh();
        self.resolver.ray_cast(ray, max, &self.actors)
    }

    /// Return debug/perf stats for the last tick.
    pub fn debug_stats(&self) -> WorldStats {
        let (tree_nodes, tree_height) = self.resolver.broadphase_stats();
        WorldStats {
            actors: self.actors.len(),
            tree_nodes,
            tree_height,
            reinserted: self.last_reinserted,
            pairs: self.last_pairs,
        }
    }

    /// Return timing breakdown for the last `collide` run.
    pub fn timing(&self) -> Option<WorldTiming> {
        self.last_timing
    }
}

impl Default for CollisionWorld {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> WorldConfig {
        WorldConfig {
            strategy: CollisionStrategy::DynamicAabbTree,
            initial_margin: 2.0,
            bounds_padding: 5.0,
            velocity_multiplier: 2.0,
            cancel_active_velocity: true,
            enable_timing: false,
        }
    }

    #[test]
    fn test_add_get_remove() {
        let mut w = CollisionWorld::new(cfg());
        let a = w.add(Actor::new(0.0, 0.0, 10.0, 10.0));
        let b = w.add(Actor::new(50.0, 0.0, 10.0, 10.0));
        assert_eq!(w.len(), 2);
        assert_eq!(w.get(b).map(|x| x.pos), Some(Vec2::new(50.0, 0.0)));
        w.get_mut(a).unwrap().vel = Vec2::X;

        let removed = w.remove(a).unwrap();
        assert_eq!(removed.vel, Vec2::X);
        assert!(w.remove(a).is_none());
        assert_eq!(w.debug_stats().tree_nodes, 1);
    }

    #[test]
    fn test_collide_resolves_and_reports() {
        let mut w = CollisionWorld::new(cfg());
        let a = w.add(Actor::new(0.0, 0.0, 10.0, 10.0));
        let b = w.add(Actor::new(5.0, 0.0, 10.0, 10.0));
        let pairs = w.collide();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].intersect.x.abs(), 5.0);
        assert_eq!(w.get(a).unwrap().collision_events().len(), 1);
        assert_eq!(w.get(b).unwrap().collision_events().len(), 1);
        assert!(!w.get(a).unwrap().bounds().overlaps(&w.get(b).unwrap().bounds()));

        // Already separated: the next pass is quiet and clears the logs
        assert!(w.collide().is_empty());
        assert!(w.get(a).unwrap().collision_events().is_empty());

        let stats = w.debug_stats();
        assert_eq!(stats.actors, 2);
        assert_eq!(stats.pairs, 0);
        assert_eq!(stats.tree_nodes, 3);
    }

    #[test]
    fn test_step_integrates_velocity() {
        let mut w = CollisionWorld::new(cfg());
        let a = w.add(Actor::new(0.0, 0.0, 10.0, 10.0).with_velocity(Vec2::new(10.0, 0.0)));
        let wall = w.add(Actor::new(30.0, -20.0, 10.0, 50.0).with_collision_type(CollisionType::Fixed));
        for _ in 0..3 {
            w.step(1.0);
        }
        let actor = w.get(a).unwrap();
        assert_eq!(actor.pos.x, 20.0);
        assert_eq!(actor.vel.x, 0.0);
        assert_eq!(w.get(wall).unwrap().pos, Vec2::new(30.0, -20.0));
    }

    #[test]
    fn test_killed_actors_stop_colliding_and_are_dropped() {
        let mut w = CollisionWorld::new(cfg());
        let a = w.add(Actor::new(0.0, 0.0, 10.0, 10.0));
        let b = w.add(Actor::new(5.0, 0.0, 10.0, 10.0));
        assert!(w.kill(b));
        assert!(w.collide().is_empty());
        assert!(w.get(b).is_none());
        assert_eq!(w.len(), 1);
        assert_eq!(w.debug_stats().tree_nodes, 1);
        assert!(!w.kill(b));
        assert_eq!(w.get(a).unwrap().pos, Vec2::ZERO);
    }

    #[test]
    fn test_set_strategy_reregisters() {
        let mut w = CollisionWorld::new(WorldConfig { strategy: CollisionStrategy::Naive, ..cfg() });
        w.add(Actor::new(0.0, 0.0, 10.0, 10.0));
        w.add(Actor::new(5.0, 0.0, 10.0, 10.0).with_collision_type(CollisionType::Fixed));
        assert_eq!(w.debug_stats().tree_nodes, 0);

        w.set_strategy(CollisionStrategy::DynamicAabbTree);
        assert_eq!(w.strategy(), CollisionStrategy::DynamicAabbTree);
        assert_eq!(w.debug_stats().tree_nodes, 3);
        assert_eq!(w.collide().len(), 1);
    }

    #[test]
    fn test_queries_see_actors_moved_between_ticks() {
        for strategy in [CollisionStrategy::Naive, CollisionStrategy::DynamicAabbTree] {
            let mut w = CollisionWorld::new(WorldConfig { strategy, ..cfg() });
            let a = w.add(Actor::new(0.0, 0.0, 10.0, 10.0));
            w.get_mut(a).unwrap().pos = Vec2::new(500.0, 0.0);

            assert_eq!(w.query_point(Vec2::new(505.0, 5.0)), vec![a], "{strategy:?}");
            assert!(w.query_point(Vec2::new(5.0, 5.0)).is_empty(), "{strategy:?}");
            assert_eq!(w.query_area(&BoundingBox::new(490.0, 0.0, 520.0, 10.0)), vec![a]);
            assert_eq!(w.raycast(&Ray::new(Vec2::new(400.0, 5.0), Vec2::X), 200.0), Some((a, 100.0)));

            w.actors_mut()[0].pos = Vec2::new(0.0, 300.0);
            assert_eq!(w.query_point(Vec2::new(5.0, 305.0)), vec![a], "{strategy:?}");
        }
    }

    #[test]
    fn test_queries_see_resolution_pushes() {
        for strategy in [CollisionStrategy::Naive, CollisionStrategy::DynamicAabbTree] {
            let mut w = CollisionWorld::new(WorldConfig { strategy, ..cfg() });
            let a = w.add(Actor::new(0.0, 0.0, 10.0, 10.0));
            w.add(Actor::new(1.0, 0.0, 10.0, 10.0).with_collision_type(CollisionType::Fixed));
            assert_eq!(w.collide().len(), 1);
            assert_eq!(w.get(a).unwrap().pos, Vec2::new(-9.0, 0.0));
            assert_eq!(w.query_point(Vec2::new(-8.0, 5.0)), vec![a], "{strategy:?}");
        }
    }

    #[test]
    fn test_queries() {
        for strategy in [CollisionStrategy::Naive, CollisionStrategy::DynamicAabbTree] {
            let mut w = CollisionWorld::new(WorldConfig { strategy, ..cfg() });
            let a = w.add(Actor::new(0.0, 0.0, 10.0, 10.0));
            let b = w.add(Actor::new(40.0, 0.0, 10.0, 10.0));

            assert_eq!(w.query_point(Vec2::new(5.0, 5.0)), vec![a]);
            assert_eq!(w.query_point(Vec2::new(10.0, 10.0)), vec![a]);
            assert!(w.query_point(Vec2::new(25.0, 5.0)).is_empty());
            assert_eq!(w.query_area(&BoundingBox::new(-5.0, -5.0, 100.0, 5.0)), vec![a, b]);

            let hit = w.raycast(&Ray::new(Vec2::new(20.0, 5.0), Vec2::X), 100.0).unwrap();
            assert_eq!(hit, (b, 20.0));
            assert!(w.raycast(&Ray::new(Vec2::new(20.0, 5.0), Vec2::Y), 100.0).is_none());
        }
    }

    #[test]
    fn test_timing_recorded_when_enabled() {
        let mut w = CollisionWorld::new(cfg());
        w.add(Actor::new(0.0, 0.0, 1.0, 1.0));
        w.collide();
        assert!(w.timing().is_none());

        let mut w = CollisionWorld::new(WorldConfig { enable_timing: true, ..cfg() });
        w.add(Actor::new(0.0, 0.0, 1.0, 1.0));
        w.add(Actor::new(0.5, 0.0, 1.0, 1.0));
        w.collide();
        let t = w.timing().unwrap();
        assert_eq!(t.pairs_resolved, 1);
        assert!(t.collide_ms >= t.resolve_ms);
    }
}
