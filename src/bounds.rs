use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::algebra::{Projection, Ray};
use crate::api::Collidable;
use crate::narrowphase::{Narrowphase, Shape};
use crate::sat::SatPolygon;

/// Axis-aligned box. `left <= right` and `top <= bottom` are expected but not enforced.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Box from its top-left corner and size.
    pub fn from_min_size(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Smallest box around a set of points; `None` for an empty set.
    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        let first = points.first()?;
        let mut bb = Self::new(first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            bb.left = bb.left.min(p.x);
            bb.top = bb.top.min(p.y);
            bb.right = bb.right.max(p.x);
            bb.bottom = bb.bottom.max(p.y);
        }
        Some(bb)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Cost heuristic of the dynamic tree; cheaper than area and serves the same purpose.
    pub fn perimeter(&self) -> f32 {
        2.0 * (self.width() + self.height())
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.left, self.top)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.right, self.bottom)
    }

    pub fn center(&self) -> Vec2 {
        (self.min() + self.max()) * 0.5
    }

    /// Corners, clockwise from the top-left.
    pub fn points(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.left, self.top),
            Vec2::new(self.right, self.top),
            Vec2::new(self.right, self.bottom),
            Vec2::new(self.left, self.bottom),
        ]
    }

    pub fn to_polygon(&self) -> SatPolygon {
        SatPolygon::from_box(self)
    }

    /// Union of both boxes.
    pub fn combine(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    /// Inclusive on every edge.
    pub fn contains_point(&self, p: Vec2) -> bool {
        self.left <= p.x && self.top <= p.y && self.bottom >= p.y && self.right >= p.x
    }

    /// `other` lies strictly inside `self`.
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        self.left < other.left
            && self.top < other.top
            && other.bottom < self.bottom
            && other.right < self.right
    }

    /// Boolean form of [`BoundingBox::collides`]; touching boxes do not overlap.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        let total = self.combine(other);
        total.width() < self.width() + other.width() && total.height() < self.height() + other.height()
    }

    /// Grown by `margin` on all four sides.
    pub fn fatten(&self, margin: f32) -> BoundingBox {
        BoundingBox::new(
            self.left - margin,
            self.top - margin,
            self.right + margin,
            self.bottom + margin,
        )
    }

    /// Stretched towards the direction of `v` on each axis.
    pub fn expand_by_velocity(&self, v: Vec2) -> BoundingBox {
        let mut b = *self;
        if v.x < 0.0 {
            b.left += v.x;
        } else {
            b.right += v.x;
        }
        if v.y < 0.0 {
            b.top += v.y;
        } else {
            b.bottom += v.y;
        }
        b
    }

    pub fn translate(&self, v: Vec2) -> BoundingBox {
        BoundingBox::new(self.left + v.x, self.top + v.y, self.right + v.x, self.bottom + v.y)
    }

    /// Minimum translation vector that moves `self` out of `other`, or `None`
    /// when they do not overlap. Only the axis of least penetration is set.
    pub fn collides(&self, other: &BoundingBox) -> Option<Vec2> {
        if !self.overlaps(other) {
            return None;
        }

        let overlap_x = if self.right >= other.left && self.right <= other.right {
            other.left - self.right
        } else {
            other.right - self.left
        };

        let overlap_y = if self.top <= other.bottom && self.top >= other.top {
            other.bottom - self.top
        } else {
            other.top - self.bottom
        };

        if overlap_x.abs() < overlap_y.abs() {
            Some(Vec2::new(overlap_x, 0.0))
        } else {
            Some(Vec2::new(0.0, overlap_y))
        }
    }

    /// Entry time of the ray into the box (0 when it starts inside), up to `max`.
    pub fn ray_cast(&self, ray: &Ray, max: f32) -> Option<f32> {
        let hit = Narrowphase::ray_aabb(ray.pos, ray.dir, self.min(), self.max())?;
        (hit.toi <= max).then_some(hit.toi)
    }
}

impl Collidable for BoundingBox {
    fn collides_with(&self, other: &Shape) -> Option<Vec2> {
        match other {
            Shape::Aabb(b) => self.collides(b),
            Shape::Polygon(poly) => self.to_polygon().collides(poly),
        }
    }

    fn contains_point(&self, p: Vec2) -> bool {
        BoundingBox::contains_point(self, p)
    }

    fn bounds(&self) -> BoundingBox {
        *self
    }

    fn axes(&self) -> Vec<Vec2> {
        vec![Vec2::X, Vec2::Y]
    }

    fn project(&self, axis: Vec2) -> Projection {
        self.to_polygon().project(axis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bb(x: f32, y: f32, w: f32, h: f32) -> BoundingBox {
        BoundingBox::from_min_size(x, y, w, h)
    }

    #[test]
    fn test_dimensions_and_perimeter() {
        let b = bb(1.0, 2.0, 10.0, 5.0);
        assert_eq!(b.width(), 10.0);
        assert_eq!(b.height(), 5.0);
        assert_eq!(b.perimeter(), 30.0);
        assert_eq!(b.center(), Vec2::new(6.0, 4.5));
    }

    #[test]
    fn test_combine_is_union() {
        let c = bb(0.0, 0.0, 2.0, 2.0).combine(&bb(5.0, -3.0, 1.0, 1.0));
        assert_eq!(c, BoundingBox::new(0.0, -3.0, 6.0, 2.0));
    }

    #[test]
    fn test_contains_point_is_inclusive() {
        let b = bb(0.0, 0.0, 10.0, 10.0);
        assert!(b.contains_point(Vec2::new(0.0, 0.0)));
        assert!(b.contains_point(Vec2::new(10.0, 10.0)));
        assert!(b.contains_point(Vec2::new(5.0, 5.0)));
        assert!(!b.contains_point(Vec2::new(10.1, 5.0)));
    }

    #[test]
    fn test_contains_box_is_strict() {
        let outer = bb(0.0, 0.0, 10.0, 10.0);
        assert!(outer.contains_box(&bb(1.0, 1.0, 2.0, 2.0)));
        // Shares the left edge
        assert!(!outer.contains_box(&bb(0.0, 1.0, 2.0, 2.0)));
        assert!(!outer.contains_box(&outer));
    }

    #[test]
    fn test_collides_resolves_along_least_penetration() {
        let a = bb(0.0, 0.0, 10.0, 10.0);
        let b = bb(5.0, 0.0, 10.0, 10.0);
        assert_eq!(a.collides(&b), Some(Vec2::new(-5.0, 0.0)));
        assert_eq!(b.collides(&a), Some(Vec2::new(5.0, 0.0)));

        let below = bb(1.0, 8.0, 8.0, 10.0);
        assert_eq!(a.collides(&below), Some(Vec2::new(0.0, -2.0)));
        assert_eq!(below.collides(&a), Some(Vec2::new(0.0, 2.0)));
    }

    #[test]
    fn test_collides_translation_leaves_boxes_touching() {
        let a = bb(0.0, 0.0, 10.0, 10.0);
        let b = bb(7.0, 3.0, 10.0, 10.0);
        let v = a.collides(&b).unwrap();
        assert!(v.x == 0.0 || v.y == 0.0);
        let moved = a.translate(v);
        assert!(moved.collides(&b).is_none());
        assert!(moved.right == b.left || moved.bottom == b.top || moved.left == b.right || moved.top == b.bottom);
    }

    #[test]
    fn test_separated_and_touching_boxes_do_not_collide() {
        let a = bb(0.0, 0.0, 10.0, 10.0);
        assert!(a.collides(&bb(11.0, 0.0, 5.0, 5.0)).is_none());
        assert!(a.collides(&bb(0.0, 20.0, 5.0, 5.0)).is_none());
        assert!(a.collides(&bb(10.0, 0.0, 5.0, 5.0)).is_none());
    }

    #[test]
    fn test_fatten_and_velocity_expansion() {
        let b = bb(0.0, 0.0, 10.0, 10.0).fatten(5.0);
        assert_eq!(b, BoundingBox::new(-5.0, -5.0, 15.0, 15.0));
        let e = b.expand_by_velocity(Vec2::new(-4.0, 6.0));
        assert_eq!(e, BoundingBox::new(-9.0, -5.0, 15.0, 21.0));
    }

    #[test]
    fn test_ray_cast_entry_time() {
        let b = bb(4.0, -1.0, 2.0, 2.0);
        let ray = Ray::new(Vec2::ZERO, Vec2::X);
        assert_relative_eq!(b.ray_cast(&ray, 100.0).unwrap(), 4.0);
        assert!(b.ray_cast(&ray, 3.0).is_none());
        let up = Ray::new(Vec2::ZERO, Vec2::Y);
        assert!(b.ray_cast(&up, 100.0).is_none());
    }

    #[test]
    fn test_from_points() {
        let pts = [Vec2::new(1.0, 5.0), Vec2::new(-2.0, 3.0), Vec2::new(4.0, -1.0)];
        assert_eq!(BoundingBox::from_points(&pts), Some(BoundingBox::new(-2.0, -1.0, 4.0, 5.0)));
        assert!(BoundingBox::from_points(&[]).is_none());
    }
}
