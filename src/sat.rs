//! Convex polygon collision primitive using the separating axis theorem.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::algebra::{Line, Projection, Ray, VecExt};
use crate::api::Collidable;
use crate::bounds::BoundingBox;
use crate::error::{ClonkError, Result};
use crate::narrowphase::Shape;

/// Ordered vertex list of a convex polygon. Sides and axes are derived per call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec2>", into = "Vec<Vec2>")]
pub struct SatPolygon {
    points: Vec<Vec2>,
}

impl SatPolygon {
    /// Needs at least three points. Convexity and winding are not checked.
    pub fn new(points: Vec<Vec2>) -> Result<Self> {
        if points.len() < 3 {
            return Err(ClonkError::DegeneratePolygon {
                points: points.len(),
            });
        }
        Ok(Self { points })
    }

    pub(crate) fn from_box(bb: &BoundingBox) -> Self {
        Self {
            points: bb.points().to_vec(),
        }
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Edge `i` runs from point `i` back to point `i - 1`.
    pub fn sides(&self) -> Vec<Line> {
        let len = self.points.len();
        (0..len)
            .map(|i| Line::new(self.points[i], self.points[(i + len - 1) % len]))
            .collect()
    }

    /// Normals of every edge; the candidate separating axes.
    pub fn axes(&self) -> Vec<Vec2> {
        let len = self.points.len();
        (0..len)
            .map(|i| (self.points[i] - self.points[(i + 1) % len]).normal())
            .collect()
    }

    pub fn project(&self, axis: Vec2) -> Projection {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for p in &self.points {
            let s = p.dot(axis);
            min = min.min(s);
            max = max.max(s);
        }
        Projection::new(min, max)
    }

    /// Vertex average.
    pub fn center(&self) -> Vec2 {
        self.points.iter().copied().sum::<Vec2>() / self.points.len() as f32
    }

    pub fn bounds(&self) -> BoundingBox {
        // Constructor guarantees at least three points
        BoundingBox::from_points(&self.points).unwrap_or_default()
    }

    pub fn width(&self) -> f32 {
        self.bounds().width()
    }

    pub fn height(&self) -> f32 {
        self.bounds().height()
    }

    pub fn translate(&self, v: Vec2) -> SatPolygon {
        Self {
            points: self.points.iter().map(|p| *p + v).collect(),
        }
    }

    pub fn rotate(&self, angle: f32, anchor: Vec2) -> SatPolygon {
        Self {
            points: self.points.iter().map(|p| p.rotate_about(angle, anchor)).collect(),
        }
    }

    /// Separating axis test. Returns the minimum translation vector moving
    /// `self` out of `other`, or `None` if any axis separates them. A zero
    /// overlap on an axis (edges touching) counts as separated.
    pub fn collides(&self, other: &SatPolygon) -> Option<Vec2> {
        let mut min_overlap = f32::MAX;
        let mut min_axis: Option<Vec2> = None;

        for axis in self.axes().into_iter().chain(other.axes()) {
            let overlap = self.project(axis).overlap(&other.project(axis));
            if overlap <= 0.0 {
                return None;
            }
            if overlap < min_overlap {
                min_overlap = overlap;
                min_axis = Some(axis);
            }
        }

        let mtv = min_axis?.normalize_or_default() * min_overlap;
        // Point away from `other`
        if mtv.dot(other.center() - self.center()) > 0.0 {
            Some(-mtv)
        } else {
            Some(mtv)
        }
    }

    /// Point in polygon by casting a ray towards +X and counting crossings.
    pub fn contains(&self, p: Vec2) -> bool {
        let ray = Ray::new(p, Vec2::X);
        let crossings = self
            .sides()
            .iter()
            .filter(|side| ray.intersect(side).is_some())
            .count();
        crossings % 2 == 1
    }
}

impl TryFrom<Vec<Vec2>> for SatPolygon {
    type Error = ClonkError;

    fn try_from(points: Vec<Vec2>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<SatPolygon> for Vec<Vec2> {
    fn from(poly: SatPolygon) -> Self {
        poly.points
    }
}

impl Collidable for SatPolygon {
    fn collides_with(&self, other: &Shape) -> Option<Vec2> {
        match other {
            Shape::Aabb(b) => self.collides(&b.to_polygon()),
            Shape::Polygon(poly) => self.collides(poly),
        }
    }

    fn contains_point(&self, p: Vec2) -> bool {
        self.contains(p)
    }

    fn bounds(&self) -> BoundingBox {
        SatPolygon::bounds(self)
    }

    fn axes(&self) -> Vec<Vec2> {
        SatPolygon::axes(self)
    }

    fn project(&self, axis: Vec2) -> Projection {
        SatPolygon::project(self, axis)
    }
}
