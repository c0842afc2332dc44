use clonk::*;
use glam::Vec2;
use std::time::Instant;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let n = 2_000usize;
    let frames = 60;
    let mut rng = fastrand::Rng::with_seed(1);

    for strategy in [CollisionStrategy::DynamicAabbTree, CollisionStrategy::Naive] {
        let mut world = CollisionWorld::new(WorldConfig {
            strategy,
            enable_timing: true,
            ..Default::default()
        });
        for _ in 0..n {
            let x = rng.f32() * 2000.0;
            let y = rng.f32() * 2000.0;
            let vel = Vec2::new(rng.f32() * 40.0 - 20.0, rng.f32() * 40.0 - 20.0);
            world.add(Actor::new(x, y, 8.0, 8.0).with_velocity(vel));
        }

        let t0 = Instant::now();
        let mut pairs = 0usize;
        let mut collide_ms = 0.0;
        for _ in 0..frames {
            pairs += world.step(1.0 / 60.0).len();
            collide_ms += world.timing().map_or(0.0, |t| t.collide_ms);
        }
        let total = t0.elapsed().as_secs_f64() * 1000.0;
        let stats = world.debug_stats();
        println!(
            "{:?}: actors={} frames={} total={:.2}ms avg_collide={:.3}ms pairs={} nodes={} height={} reinserted(last)={}",
            strategy,
            stats.actors,
            frames,
            total,
            collide_ms / frames as f64,
            pairs,
            stats.tree_nodes,
            stats.tree_height,
            stats.reinserted
        );
    }
}
