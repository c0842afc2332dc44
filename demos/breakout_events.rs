use std::cell::RefCell;
use std::rc::Rc;

use clonk::*;
use glam::Vec2;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut world = CollisionWorld::new(WorldConfig {
        enable_timing: true,
        ..Default::default()
    });

    let mut ball = Actor::new(40.0, 80.0, 8.0, 8.0)
        .with_collision_type(CollisionType::Elastic)
        .with_velocity(Vec2::new(120.0, -90.0));
    let bounces = Rc::new(RefCell::new(0u32));
    let counter = bounces.clone();
    ball.on_collision(move |ev| {
        *counter.borrow_mut() += 1;
        println!("ball hit {:?} on {:?} (mtv {:?})", ev.other, ev.side, ev.intersection);
    });
    let ball = world.add(ball);

    // Walls
    for (x, y, w, h) in [(0.0, -10.0, 200.0, 10.0), (-10.0, 0.0, 10.0, 150.0), (200.0, 0.0, 10.0, 150.0)] {
        let mut wall = Actor::new(x, y, w, h).with_collision_type(CollisionType::Fixed);
        wall.add_collision_group("wall");
        world.add(wall);
    }

    // Bricks die on first contact
    let mut bricks = Vec::new();
    for row in 0..3 {
        for col in 0..8 {
            let mut brick = Actor::new(10.0 + col as f32 * 23.0, 10.0 + row as f32 * 12.0, 20.0, 8.0)
                .with_collision_type(CollisionType::Fixed);
            brick.add_collision_group("brick");
            bricks.push(world.add(brick));
        }
    }

    let dt = 1.0 / 60.0;
    for frame in 0..240 {
        world.step(dt);
        let hit: Vec<ActorId> = bricks
            .iter()
            .copied()
            .filter(|id| world.get(*id).is_some_and(|b| !b.collision_events().is_empty()))
            .collect();
        for id in hit {
            world.kill(id);
            println!("frame {frame}: brick {:?} destroyed", id);
        }
    }

    let remaining = bricks.iter().filter(|id| world.get(**id).is_some()).count();
    println!("bounces={} bricks left={}", bounces.borrow(), remaining);
    if let Some(b) = world.get(ball) {
        println!("ball at ({:.1}, {:.1}) vel ({:.1}, {:.1})", b.pos.x, b.pos.y, b.vel.x, b.vel.y);
    }
    if let Some(t) = world.timing() {
        println!(
            "timing: collide={:.3}ms update={:.3}ms detect={:.3}ms resolve={:.3}ms",
            t.collide_ms, t.update_ms, t.detect_ms, t.resolve_ms
        );
    }
    println!("{:?}", world.debug_stats());
}
