use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{ClonkError, Result};

/// Stable actor identity used as the key in trees, pairs and events.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u64);

/// Bitmask-based filtering.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMask {
    /// Layer(s) this actor belongs to.
    pub layer: u32,
    /// Layers this actor wants to collide with.
    pub collides_with: u32,
    /// Extra mask to exclude (applied after `collides_with`).
    pub exclude: u32,
}

impl Default for LayerMask {
    /// Everything collides with everything.
    fn default() -> Self {
        Self::ALL
    }
}

impl LayerMask {
    pub const ALL: LayerMask = LayerMask {
        layer: u32::MAX,
        collides_with: u32::MAX,
        exclude: 0,
    };

    /// Convenience constructor.
    pub fn simple(layer: u32, collides_with: u32) -> Self {
        Self {
            layer,
            collides_with,
            exclude: 0,
        }
    }

    /// A may hit B iff `(A.collides_with & B.layer) != 0` AND `(A.exclude & B.layer) == 0`.
    pub fn allows(self, other: LayerMask) -> bool {
        let hit = (self.collides_with & other.layer) != 0;
        let blocked = (self.exclude & other.layer) != 0;
        hit && !blocked
    }

    /// Both sides must allow each other.
    pub fn mutual(self, other: LayerMask) -> bool {
        self.allows(other) && other.allows(self)
    }
}

/// Face of an actor involved in a collision.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[default]
    None,
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    /// `None↔None`, `Top↔Bottom`, `Left↔Right`.
    pub fn opposite(self) -> Side {
        match self {
            Side::None => Side::None,
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Side of the moving actor that touched, given the displacement that
    /// separates it. The dominant axis wins; ties go vertical.
    pub fn from_intersect(intersect: Vec2) -> Side {
        if intersect == Vec2::ZERO {
            return Side::None;
        }
        if intersect.x.abs() > intersect.y.abs() {
            if intersect.x < 0.0 { Side::Right } else { Side::Left }
        } else if intersect.y < 0.0 {
            Side::Bottom
        } else {
            Side::Top
        }
    }
}

/// Per-actor policy for taking part in collisions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionType {
    /// Never collides and never raises events.
    PreventCollision,
    /// Raises events; neither moves nor is moved.
    Passive,
    /// Raises events and is pushed out of non-passive actors.
    #[default]
    Active,
    /// Like `Active`, plus a naive velocity reflection on contact.
    Elastic,
    /// Raises events; never moved by anyone.
    Fixed,
}

impl CollisionType {
    /// Whether positional correction may be applied to an actor of this type.
    pub fn is_movable(self) -> bool {
        matches!(self, CollisionType::Active | CollisionType::Elastic)
    }
}

/// Payload published on the `"collision"` channel of an actor.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CollisionEvent {
    /// The actor the event was published on.
    pub actor: ActorId,
    /// The actor it collided with.
    pub other: ActorId,
    /// Face of `actor` that was hit.
    pub side: Side,
    /// Translation that separates `actor` from `other`.
    pub intersection: Vec2,
}

/// Broad-phase strategy used by a [`crate::CollisionWorld`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionStrategy {
    /// O(n²) pairwise tests, no persistent structure.
    Naive,
    /// Dynamic AABB tree broad phase.
    #[default]
    DynamicAabbTree,
}

/// World-level configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub strategy: CollisionStrategy,
    /// Margin added on every side of a leaf when an actor is first registered.
    pub initial_margin: f32,
    /// Margin added on every side when a leaf is re-inserted after moving.
    pub bounds_padding: f32,
    /// Velocity factor used to stretch re-inserted leaves along the motion.
    pub velocity_multiplier: f32,
    /// Cancel the velocity of `Active` actors along the axis of correction.
    pub cancel_active_velocity: bool,
    /// Enable internal timing instrumentation (adds small overhead when true).
    pub enable_timing: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            strategy: CollisionStrategy::DynamicAabbTree,
            initial_margin: 2.0,
            bounds_padding: 5.0,
            velocity_multiplier: 2.0,
            cancel_active_velocity: true,
            enable_timing: false,
        }
    }
}

impl WorldConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: WorldConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let margins = [
            ("initial_margin", self.initial_margin),
            ("bounds_padding", self.bounds_padding),
            ("velocity_multiplier", self.velocity_multiplier),
        ];
        for (name, value) in margins {
            if !value.is_finite() || value < 0.0 {
                return Err(ClonkError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Debug/performance statistics for the last tick.
#[derive(Copy, Clone, Debug, Default)]
pub struct WorldStats {
    pub actors: usize,
    /// Live nodes in the broad-phase tree (0 for the naive strategy).
    pub tree_nodes: usize,
    pub tree_height: i32,
    /// Actors re-inserted by the last `update`.
    pub reinserted: usize,
    /// Pairs resolved by the last tick.
    pub pairs: usize,
}

/// Timing breakdown for the last completed tick.
#[derive(Copy, Clone, Debug, Default)]
pub struct WorldTiming {
    pub collide_ms: f64,
    pub update_ms: f64,
    pub detect_ms: f64,
    pub resolve_ms: f64,

    pub pairs_resolved: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_side_is_involution() {
        for s in [Side::None, Side::Top, Side::Bottom, Side::Left, Side::Right] {
            assert_eq!(s.opposite().opposite(), s);
        }
        assert_eq!(Side::Left.opposite(), Side::Right);
        assert_eq!(Side::Top.opposite(), Side::Bottom);
    }

    #[test]
    fn test_side_from_intersect() {
        assert_eq!(Side::from_intersect(Vec2::new(-5.0, 0.0)), Side::Right);
        assert_eq!(Side::from_intersect(Vec2::new(5.0, 0.0)), Side::Left);
        assert_eq!(Side::from_intersect(Vec2::new(0.0, -1.0)), Side::Bottom);
        assert_eq!(Side::from_intersect(Vec2::new(0.0, 1.0)), Side::Top);
        assert_eq!(Side::from_intersect(Vec2::ZERO), Side::None);
    }

    #[test]
    fn test_mask_mutual_consent() {
        let a = LayerMask { layer: 1, collides_with: 2, exclude: 0 };
        let b = LayerMask { layer: 2, collides_with: 0, exclude: 0 };
        assert!(a.allows(b));
        assert!(!a.mutual(b));
        assert!(LayerMask::default().mutual(LayerMask::ALL));
    }

    #[test]
    fn test_config_from_json_fills_defaults() {
        let cfg = WorldConfig::from_json(r#"{ "strategy": "Naive", "bounds_padding": 8.0 }"#).unwrap();
        assert_eq!(cfg.strategy, CollisionStrategy::Naive);
        assert_eq!(cfg.bounds_padding, 8.0);
        assert_eq!(cfg.initial_margin, 2.0);
        assert!(cfg.cancel_active_velocity);
    }

    #[test]
    fn test_config_rejects_bad_input() {
        let err = WorldConfig::from_json(r#"{ "initial_margin": -1.0 }"#).unwrap_err();
        assert!(matches!(err, ClonkError::InvalidConfig(_)));
        let err = WorldConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ClonkError::ConfigParse(_)));
    }

    #[test]
    fn test_only_active_and_elastic_move() {
        assert!(CollisionType::Active.is_movable());
        assert!(CollisionType::Elastic.is_movable());
        assert!(!CollisionType::Fixed.is_movable());
        assert!(!CollisionType::Passive.is_movable());
        assert!(!CollisionType::PreventCollision.is_movable());
    }
}
