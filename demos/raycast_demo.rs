use clonk::*;
use glam::Vec2;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut world = CollisionWorld::default();
    let crate_box = world.add(Actor::new(20.0, -5.0, 10.0, 10.0).with_collision_type(CollisionType::Fixed));
    let diamond = Actor::new(50.0, 0.0, 0.0, 0.0)
        .with_polygon(vec![
            Vec2::new(0.0, -6.0),
            Vec2::new(6.0, 0.0),
            Vec2::new(0.0, 6.0),
            Vec2::new(-6.0, 0.0),
        ])
        .map(|a| a.with_collision_type(CollisionType::Fixed));
    let diamond = match diamond {
        Ok(actor) => world.add(actor),
        Err(e) => {
            eprintln!("bad polygon: {e}");
            return;
        }
    };
    println!("crate={:?} diamond={:?}", crate_box, diamond);

    for (origin, dir) in [
        (Vec2::ZERO, Vec2::X),
        (Vec2::new(35.0, 0.0), Vec2::X),
        (Vec2::new(35.0, 20.0), Vec2::Y),
    ] {
        let ray = Ray::new(origin, dir);
        match world.raycast(&ray, 100.0) {
            Some((id, t)) => {
                let p = ray.point_at(t);
                println!("ray from {origin:?} hit {id:?} t={t:.3} at ({:.2},{:.2})", p.x, p.y);
            }
            None => println!("ray from {origin:?} missed"),
        }
    }
}
