use glam::Vec2;

use crate::algebra::{Projection, Ray};
use crate::api::Collidable;
use crate::bounds::BoundingBox;
use crate::sat::SatPolygon;

/// Result of a ray test against a single shape.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayHit {
    /// Distance along the (unit) ray direction; 0 when the origin starts inside.
    pub toi: f32,
    /// Normal of the entered face (zero when the origin starts inside).
    pub normal: Vec2,
    pub contact: Vec2,
}

/// Collision shapes an actor can present to the narrow phase.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Aabb(BoundingBox),
    Polygon(SatPolygon),
}

impl Shape {
    /// Minimum translation vector moving `self` out of `other`.
    pub fn collides(&self, other: &Shape) -> Option<Vec2> {
        match self {
            Shape::Aabb(b) => b.collides_with(other),
            Shape::Polygon(poly) => poly.collides_with(other),
        }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        match self {
            Shape::Aabb(b) => b.contains_point(p),
            Shape::Polygon(poly) => poly.contains(p),
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        match self {
            Shape::Aabb(b) => *b,
            Shape::Polygon(poly) => poly.bounds(),
        }
    }

    /// Distance along `ray` to the first face hit, up to `max`.
    pub fn ray_cast(&self, ray: &Ray, max: f32) -> Option<f32> {
        match self {
            Shape::Aabb(b) => b.ray_cast(ray, max),
            Shape::Polygon(poly) => Narrowphase::ray_polygon(ray, poly).filter(|t| *t <= max),
        }
    }
}

impl Collidable for Shape {
    fn collides_with(&self, other: &Shape) -> Option<Vec2> {
        self.collides(other)
    }

    fn contains_point(&self, p: Vec2) -> bool {
        self.contains(p)
    }

    fn bounds(&self) -> BoundingBox {
        Shape::bounds(self)
    }

    fn axes(&self) -> Vec<Vec2> {
        match self {
            Shape::Aabb(b) => b.axes(),
            Shape::Polygon(poly) => poly.axes(),
        }
    }

    fn project(&self, axis: Vec2) -> Projection {
        match self {
            Shape::Aabb(b) => b.project(axis),
            Shape::Polygon(poly) => poly.project(axis),
        }
    }
}

/// Ray primitive tests.
pub struct Narrowphase;

impl Narrowphase {
    /// Slab method with normal tracking; returns earliest t >= 0.
    pub fn ray_aabb(origin: Vec2, dir: Vec2, aabb_min: Vec2, aabb_max: Vec2) -> Option<RayHit> {
        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;
        let mut n_enter = Vec2::ZERO;

        for axis in 0..2 {
            let (o, d, lo, hi) = (origin[axis], dir[axis], aabb_min[axis], aabb_max[axis]);
            if d.abs() < f32::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t1 = (lo - o) * inv;
            let mut t2 = (hi - o) * inv;
            let mut n = -1.0;
            if t1 > t2 {
                core::mem::swap(&mut t1, &mut t2);
                n = 1.0;
            }
            if t1 > tmin {
                tmin = t1;
                n_enter = Vec2::ZERO;
                n_enter[axis] = n;
            }
            if t2 < tmax {
                tmax = t2;
            }
            if tmin > tmax {
                return None;
            }
        }

        // Box entirely behind the origin
        if tmax < 0.0 {
            return None;
        }
        // If origin inside, tmin < 0; treat as immediate hit
        let toi = if tmin < 0.0 { 0.0 } else { tmin };
        let contact = origin + dir * toi;
        let normal = if tmin < 0.0 { Vec2::ZERO } else { n_enter };
        Some(RayHit {
            toi,
            normal,
            contact,
        })
    }

    /// Closest side crossing of a convex polygon; 0 when the origin is inside.
    pub fn ray_polygon(ray: &Ray, poly: &SatPolygon) -> Option<f32> {
        if poly.contains(ray.pos) {
            return Some(0.0);
        }
        poly.sides()
            .iter()
            .filter_map(|side| ray.intersect(side))
            .min_by(f32::total_cmp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x: f32, y: f32, s: f32) -> BoundingBox {
        BoundingBox::from_min_size(x, y, s, s)
    }

    #[test]
    fn test_ray_aabb_hit() {
        let hit = Narrowphase::ray_aabb(
            Vec2::new(-5.0, 0.0),
            Vec2::X,
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, 1.0),
        )
        .unwrap();
        assert_relative_eq!(hit.toi, 4.0);
        assert!((hit.normal.x + 1.0).abs() < 1e-5);
        assert!(hit.contact.x <= -1.0 + 1e-5);
    }

    #[test]
    fn test_ray_aabb_parallel_miss_and_behind() {
        let min = Vec2::new(-1.0, -1.0);
        let max = Vec2::new(1.0, 1.0);
        assert!(Narrowphase::ray_aabb(Vec2::new(-5.0, 2.0), Vec2::X, min, max).is_none());
        assert!(Narrowphase::ray_aabb(Vec2::new(5.0, 0.0), Vec2::X, min, max).is_none());
    }

    #[test]
    fn test_ray_aabb_origin_inside() {
        let hit = Narrowphase::ray_aabb(Vec2::ZERO, Vec2::Y, Vec2::splat(-1.0), Vec2::splat(1.0)).unwrap();
        assert_eq!(hit.toi, 0.0);
        assert_eq!(hit.normal, Vec2::ZERO);
    }

    #[test]
    fn test_ray_polygon_closest_side() {
        let poly = square(2.0, -1.0, 2.0).to_polygon();
        let t = Narrowphase::ray_polygon(&Ray::new(Vec2::ZERO, Vec2::X), &poly).unwrap();
        assert_relative_eq!(t, 2.0, epsilon = 1e-5);
        assert!(Narrowphase::ray_polygon(&Ray::new(Vec2::ZERO, Vec2::NEG_X), &poly).is_none());
    }

    #[test]
    fn test_shape_dispatch_agrees_on_boxes() {
        let a = square(0.0, 0.0, 10.0);
        let b = square(5.0, 0.0, 10.0);
        let aabb = Shape::Aabb(a).collides(&Shape::Aabb(b)).unwrap();
        let mixed = Shape::Aabb(a).collides(&Shape::Polygon(b.to_polygon())).unwrap();
        assert_eq!(aabb, Vec2::new(-5.0, 0.0));
        assert_relative_eq!(mixed.x, -5.0, epsilon = 1e-5);
        assert_relative_eq!(mixed.y, 0.0, epsilon = 1e-5);
        let flipped = Shape::Polygon(b.to_polygon()).collides(&Shape::Aabb(a)).unwrap();
        assert_relative_eq!(flipped.x, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_collides_with_accepts_either_shape() {
        let a = square(0.0, 0.0, 10.0);
        let b = square(5.0, 0.0, 10.0);
        let poly_b = b.to_polygon();

        assert_eq!(a.collides_with(&Shape::Aabb(b)), Some(Vec2::new(-5.0, 0.0)));
        let v = a.collides_with(&Shape::Polygon(poly_b.clone())).unwrap();
        assert_relative_eq!(v.x, -5.0, epsilon = 1e-5);
        assert_relative_eq!(v.y, 0.0, epsilon = 1e-5);

        let v = poly_b.collides_with(&Shape::Aabb(a)).unwrap();
        assert_relative_eq!(v.x, 5.0, epsilon = 1e-5);
        let v = poly_b.collides_with(&Shape::Polygon(a.to_polygon())).unwrap();
        assert_relative_eq!(v.x, 5.0, epsilon = 1e-5);

        let far = square(50.0, 50.0, 4.0);
        assert!(a.collides_with(&Shape::Aabb(far)).is_none());
        assert!(poly_b.collides_with(&Shape::Aabb(far)).is_none());
        assert!(poly_b.collides_with(&Shape::Polygon(far.to_polygon())).is_none());
    }

    #[test]
    fn test_shape_collides_matches_variant_impls() {
        let diamond = SatPolygon::new(vec![
            Vec2::new(5.0, 0.0),
            Vec2::new(10.0, 5.0),
            Vec2::new(5.0, 10.0),
            Vec2::new(0.0, 5.0),
        ])
        .unwrap();
        let b = square(8.0, 3.0, 4.0);
        let shapes = [Shape::Polygon(diamond.clone()), Shape::Aabb(b)];
        for s in &shapes {
            for o in &shapes {
                assert_eq!(s.collides(o), s.collides_with(o));
            }
        }
        let v = diamond.collides_with(&Shape::Aabb(b)).unwrap();
        let w = b.collides_with(&Shape::Polygon(diamond)).unwrap();
        assert_relative_eq!(v.length(), w.length(), epsilon = 1e-4);
        assert!(v.dot(w) < 0.0);
    }

    #[test]
    fn test_shape_contains_and_bounds() {
        let poly = Shape::Polygon(square(0.0, 0.0, 4.0).to_polygon());
        assert!(poly.contains(Vec2::new(1.0, 1.5)));
        assert!(!poly.contains(Vec2::new(5.0, 1.5)));
        assert_eq!(poly.bounds(), square(0.0, 0.0, 4.0));
        assert_eq!(Collidable::axes(&poly).len(), 4);
    }
}
