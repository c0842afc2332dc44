//! clonk: 2D actor collision core (dynamic AABB tree broad phase, box and SAT
//! narrow phase, positional resolution with collision events)

pub mod types;
pub mod error;
pub mod algebra;
pub mod api;
pub mod bounds;
pub mod sat;
pub mod narrowphase;
pub mod actor;
pub mod tree;
pub mod pair;
pub mod resolver;
pub mod world;

pub use crate::types::*;
pub use crate::api::*;
pub use crate::error::{ClonkError, Result};
pub use crate::algebra::{Line, Projection, Ray, VecExt};
pub use crate::bounds::BoundingBox;
pub use crate::sat::SatPolygon;
pub use crate::narrowphase::{Narrowphase, RayHit, Shape};
pub use crate::actor::{Actor, ActorShape, EventDispatcher, COLLISION_EVENT};
pub use crate::tree::{DynamicTree, NodeId, TreeNode};
pub use crate::pair::CollisionPair;
pub use crate::resolver::{resolver_for, DynamicTreeCollisionResolver, NaiveCollisionResolver};
pub use crate::world::CollisionWorld;
