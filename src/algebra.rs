//! 2D algebra on top of `glam::Vec2`: the helpers the geometry tests need plus
//! the `Ray`, `Line` and `Projection` primitives.

use glam::Vec2;

/// Direction returned when normalizing a zero-length vector.
pub const DEFAULT_DIRECTION: Vec2 = Vec2::new(0.0, 1.0);

/// Engine-flavoured vector operations that glam does not provide as-is.
pub trait VecExt {
    /// Unit vector, or [`DEFAULT_DIRECTION`] for a zero-length input.
    fn normalize_or_default(self) -> Vec2;
    /// `(y, -x)`.
    fn perpendicular(self) -> Vec2;
    /// Unit perpendicular.
    fn normal(self) -> Vec2;
    /// Scalar 2D cross product.
    fn cross(self, other: Vec2) -> f32;
    /// Rotate by `angle` radians around `anchor`.
    fn rotate_about(self, angle: f32, anchor: Vec2) -> Vec2;
}

impl VecExt for Vec2 {
    fn normalize_or_default(self) -> Vec2 {
        let d = self.length();
        if d > 0.0 && d.is_finite() {
            self / d
        } else {
            DEFAULT_DIRECTION
        }
    }

    fn perpendicular(self) -> Vec2 {
        Vec2::new(self.y, -self.x)
    }

    fn normal(self) -> Vec2 {
        self.perpendicular().normalize_or_default()
    }

    fn cross(self, other: Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    fn rotate_about(self, angle: f32, anchor: Vec2) -> Vec2 {
        let (sin, cos) = angle.sin_cos();
        let d = self - anchor;
        Vec2::new(cos * d.x - sin * d.y, sin * d.x + cos * d.y) + anchor
    }
}

/// A 2D ray with a unit direction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    pub pos: Vec2,
    pub dir: Vec2,
}

impl Ray {
    pub fn new(pos: Vec2, dir: Vec2) -> Self {
        Self {
            pos,
            dir: dir.normalize_or_default(),
        }
    }

    /// Intersection time with a line segment, `None` when parallel or missing.
    pub fn intersect(&self, line: &Line) -> Option<f32> {
        let numerator = line.begin - self.pos;
        let slope = line.slope_vector();
        let divisor = self.dir.cross(slope);
        // Parallel (or collinear): never counted as a crossing
        if divisor == 0.0 {
            return None;
        }
        let t = numerator.cross(slope) / divisor;
        if t < 0.0 {
            return None;
        }
        let u = numerator.cross(self.dir) / divisor / line.length();
        if (0.0..=1.0).contains(&u) { Some(t) } else { None }
    }

    pub fn point_at(&self, t: f32) -> Vec2 {
        self.pos + self.dir * t
    }
}

/// A 2D line segment.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Line {
    pub begin: Vec2,
    pub end: Vec2,
}

impl Line {
    pub fn new(begin: Vec2, end: Vec2) -> Self {
        Self { begin, end }
    }

    /// Direction of the segment with length 1.
    pub fn slope_vector(&self) -> Vec2 {
        self.edge().normalize_or_default()
    }

    /// The segment as a vector from `begin` to `end`.
    pub fn edge(&self) -> Vec2 {
        self.end - self.begin
    }

    pub fn length(&self) -> f32 {
        self.begin.distance(self.end)
    }

    pub fn normal(&self) -> Vec2 {
        self.edge().normal()
    }

    pub fn midpoint(&self) -> Vec2 {
        (self.begin + self.end) * 0.5
    }

    pub fn flip(&self) -> Line {
        Line::new(self.end, self.begin)
    }

    /// Perpendicular distance from the infinite line through the segment.
    pub fn distance_to_point(&self, p: Vec2) -> f32 {
        let l = self.length();
        if l == 0.0 {
            return self.begin.distance(p);
        }
        let d = self.edge();
        (d.y * p.x - d.x * p.y + self.end.x * self.begin.y - self.end.y * self.begin.x).abs() / l
    }
}

/// A 1D interval on an axis, used by the separating axis test.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Projection {
    pub min: f32,
    pub max: f32,
}

impl Projection {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn overlaps(&self, other: &Projection) -> bool {
        self.max > other.min && other.max > self.min
    }

    /// Overlap length measured from the closer edge; 0 when disjoint or touching.
    pub fn overlap(&self, other: &Projection) -> f32 {
        if !self.overlaps(other) {
            return 0.0;
        }
        if self.max > other.max {
            other.max - self.min
        } else {
            self.max - other.min
        }
    }
}
