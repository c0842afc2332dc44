//! Dynamic AABB tree broad phase.
//!
//! Leaves hold fattened actor bounds, internal nodes the union of their two
//! children. Insertion picks a sibling with a perimeter cost heuristic and
//! every ancestor is rebalanced with a single AVL rotation on the way up.
//! Nodes live in an arena indexed by [`NodeId`]; freed slots are recycled.

use log::trace;
use rustc_hash::FxHashMap;

use crate::actor::Actor;
use crate::algebra::Ray;
use crate::bounds::BoundingBox;
use crate::types::{ActorId, WorldConfig};

/// Index of a node slot in the tree arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

#[derive(Clone, Debug)]
pub struct TreeNode {
    pub parent: Option<NodeId>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub bounds: BoundingBox,
    /// 0 for leaves.
    pub height: i32,
    /// Set on leaves only.
    pub actor: Option<ActorId>,
}

impl TreeNode {
    fn leaf(actor: ActorId, bounds: BoundingBox) -> Self {
        Self {
            parent: None,
            left: None,
            right: None,
            bounds,
            height: 0,
            actor: Some(actor),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

pub struct DynamicTree {
    nodes: Vec<Option<TreeNode>>,
    free: Vec<u32>,
    root: Option<NodeId>,
    leaves: FxHashMap<ActorId, NodeId>,
    initial_margin: f32,
    bounds_padding: f32,
    velocity_multiplier: f32,
}

impl Default for DynamicTree {
    fn default() -> Self {
        Self::new(&WorldConfig::default())
    }
}

impl DynamicTree {
    pub fn new(cfg: &WorldConfig) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            leaves: FxHashMap::default(),
            initial_margin: cfg.initial_margin,
            bounds_padding: cfg.bounds_padding,
            velocity_multiplier: cfg.velocity_multiplier,
        }
    }

    // --- Arena -------------------------------------------------------------

    fn alloc(&mut self, node: TreeNode) -> NodeId {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot as usize] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId((self.nodes.len() - 1) as u32)
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id.0 as usize] = None;
        self.free.push(id.0);
    }

    fn n(&self, id: NodeId) -> &TreeNode {
        match self.nodes.get(id.0 as usize) {
            Some(Some(node)) => node,
            _ => panic!("dynamic tree: dangling node {:?}", id),
        }
    }

    fn n_mut(&mut self, id: NodeId) -> &mut TreeNode {
        match self.nodes.get_mut(id.0 as usize) {
            Some(Some(node)) => node,
            _ => panic!("dynamic tree: dangling node {:?}", id),
        }
    }

    fn children(&self, id: NodeId) -> (NodeId, NodeId) {
        let node = self.n(id);
        match (node.left, node.right) {
            (Some(l), Some(r)) => (l, r),
            _ => panic!("dynamic tree: internal node {:?} is missing a child", id),
        }
    }

    /// Point `parent`'s link at `old` to `new`, or make `new` the root.
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: NodeId) {
        let Some(p) = parent else {
            self.root = Some(new);
            return;
        };
        let node = self.n_mut(p);
        if node.left == Some(old) {
            node.left = Some(new);
        } else if node.right == Some(old) {
            node.right = Some(new);
        } else {
            panic!("dynamic tree: {:?} is not a child of {:?}", old, p);
        }
    }

    fn refit(&mut self, id: NodeId) {
        let (l, r) = self.children(id);
        let height = 1 + self.n(l).height.max(self.n(r).height);
        let bounds = self.n(l).bounds.combine(&self.n(r).bounds);
        let node = self.n_mut(id);
        node.height = height;
        node.bounds = bounds;
    }

    // --- Accessors -----------------------------------------------------------

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// Every live node, leaves and internal.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|n| (NodeId(i as u32), n)))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Number of tracked actors.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Height of the root; 0 for an empty tree or a single leaf.
    pub fn height(&self) -> i32 {
        self.root.map_or(0, |r| self.n(r).height)
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.leaves.contains_key(&id)
    }

    /// Stored (fattened) bounds of an actor's leaf.
    pub fn leaf_bounds(&self, id: ActorId) -> Option<BoundingBox> {
        self.leaves.get(&id).map(|leaf| self.n(*leaf).bounds)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.leaves.clear();
        self.root = None;
    }

    // --- Structure -----------------------------------------------------------

    /// Link a detached leaf into the tree.
    pub fn insert(&mut self, leaf: NodeId) {
        let Some(root) = self.root else {
            self.root = Some(leaf);
            self.n_mut(leaf).parent = None;
            return;
        };

        let leaf_bounds = self.n(leaf).bounds;

        // Find the best sibling
        let mut current = root;
        while !self.n(current).is_leaf() {
            let (left, right) = self.children(current);
            let bounds = self.n(current).bounds;

            let area = bounds.perimeter();
            let combined_area = bounds.combine(&leaf_bounds).perimeter();
            let cost = 2.0 * combined_area;
            let inheritance = 2.0 * (combined_area - area);

            let left_cost = self.descend_cost(left, &leaf_bounds, inheritance);
            let right_cost = self.descend_cost(right, &leaf_bounds, inheritance);

            if cost < left_cost && cost < right_cost {
                break;
            }
            current = if left_cost < right_cost { left } else { right };
        }

        let sibling = current;
        let old_parent = self.n(sibling).parent;
        let new_parent = self.alloc(TreeNode {
            parent: old_parent,
            left: Some(sibling),
            right: Some(leaf),
            bounds: leaf_bounds.combine(&self.n(sibling).bounds),
            height: self.n(sibling).height + 1,
            actor: None,
        });
        self.replace_child(old_parent, sibling, new_parent);
        self.n_mut(sibling).parent = Some(new_parent);
        self.n_mut(leaf).parent = Some(new_parent);

        self.rebalance_from(Some(new_parent));
    }

    fn descend_cost(&self, child: NodeId, leaf_bounds: &BoundingBox, inheritance: f32) -> f32 {
        let node = self.n(child);
        let combined = leaf_bounds.combine(&node.bounds).perimeter();
        if node.is_leaf() {
            combined + inheritance
        } else {
            (combined - node.bounds.perimeter()) + inheritance
        }
    }

    fn rebalance_from(&mut self, start: Option<NodeId>) {
        let mut current = start;
        while let Some(id) = current {
            let id = self.balance(id);
            self.refit(id);
            current = self.n(id).parent;
        }
    }

    /// Unlink a leaf. The leaf slot itself stays allocated.
    pub fn remove(&mut self, leaf: NodeId) {
        if self.root == Some(leaf) {
            self.root = None;
            return;
        }

        let parent = self
            .n(leaf)
            .parent
            .unwrap_or_else(|| panic!("dynamic tree: leaf {:?} has no parent", leaf));
        let grandparent = self.n(parent).parent;
        let (l, r) = self.children(parent);
        let sibling = if l == leaf { r } else { l };

        self.replace_child(grandparent, parent, sibling);
        self.n_mut(sibling).parent = grandparent;
        self.release(parent);
        self.n_mut(leaf).parent = None;

        self.rebalance_from(grandparent);
    }

    /// Single AVL rotation around `a`. Returns the root of the rotated subtree.
    pub fn balance(&mut self, a: NodeId) -> NodeId {
        let node = self.n(a);
        if node.is_leaf() || node.height < 2 {
            return a;
        }

        let (b, c) = self.children(a);
        let balance = self.n(c).height - self.n(b).height;

        if balance > 1 {
            let (f, g) = self.children(c);
            let a_parent = self.n(a).parent;

            self.n_mut(c).left = Some(a);
            self.n_mut(c).parent = a_parent;
            self.n_mut(a).parent = Some(c);
            self.replace_child(a_parent, a, c);

            let (keep, give) = if self.n(f).height > self.n(g).height { (f, g) } else { (g, f) };
            self.n_mut(c).right = Some(keep);
            self.n_mut(a).right = Some(give);
            self.n_mut(give).parent = Some(a);

            self.refit(a);
            self.refit(c);
            return c;
        }

        if balance < -1 {
            let (d, e) = self.children(b);
            let a_parent = self.n(a).parent;

            self.n_mut(b).left = Some(a);
            self.n_mut(b).parent = a_parent;
            self.n_mut(a).parent = Some(b);
            self.replace_child(a_parent, a, b);

            let (keep, give) = if self.n(d).height > self.n(e).height { (d, e) } else { (e, d) };
            self.n_mut(b).right = Some(keep);
            self.n_mut(a).left = Some(give);
            self.n_mut(give).parent = Some(a);

            self.refit(a);
            self.refit(b);
            return b;
        }

        a
    }

    // --- Actors --------------------------------------------------------------

    /// Track an actor with a leaf fattened by the initial margin. An actor
    /// that is already tracked gets a fresh leaf.
    pub fn register_actor(&mut self, actor: &Actor) {
        self.remove_actor_id(actor.id());
        let bounds = actor.bounds().fatten(self.initial_margin);
        let leaf = self.alloc(TreeNode::leaf(actor.id(), bounds));
        self.insert(leaf);
        self.leaves.insert(actor.id(), leaf);
    }

    /// Re-place the actor's leaf if it escaped its fattened bounds.
    /// Returns whether a re-insertion happened.
    pub fn update_actor(&mut self, actor: &Actor) -> bool {
        let Some(&leaf) = self.leaves.get(&actor.id()) else {
            return false;
        };
        let bounds = actor.bounds();
        if self.n(leaf).bounds.contains_box(&bounds) {
            return false;
        }

        self.remove(leaf);
        let fat = bounds
            .fatten(self.bounds_padding)
            .expand_by_velocity(actor.vel * self.velocity_multiplier);
        self.n_mut(leaf).bounds = fat;
        self.insert(leaf);
        trace!("tree: reinserted {:?} with {:?}", actor.id(), fat);
        true
    }

    pub fn remove_actor(&mut self, actor: &Actor) -> bool {
        self.remove_actor_id(actor.id())
    }

    pub fn remove_actor_id(&mut self, id: ActorId) -> bool {
        let Some(leaf) = self.leaves.remove(&id) else {
            return false;
        };
        self.remove(leaf);
        self.release(leaf);
        true
    }

    // --- Queries -------------------------------------------------------------

    /// Visit every other actor whose leaf overlaps the actor's bounds. The
    /// callback returns `true` to stop the traversal.
    pub fn query(&self, actor: &Actor, callback: impl FnMut(ActorId) -> bool) {
        self.walk_overlaps(&actor.bounds(), Some(actor.id()), callback);
    }

    /// Like [`DynamicTree::query`] against an arbitrary box.
    pub fn query_bounds(&self, bounds: &BoundingBox, callback: impl FnMut(ActorId) -> bool) {
        self.walk_overlaps(bounds, None, callback);
    }

    fn walk_overlaps(&self, bounds: &BoundingBox, skip: Option<ActorId>, mut callback: impl FnMut(ActorId) -> bool) {
        let Some(root) = self.root else {
            return;
        };
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.n(id);
            if !node.bounds.overlaps(bounds) {
                continue;
            }
            match node.actor {
                Some(actor) => {
                    if Some(actor) != skip && callback(actor) {
                        return;
                    }
                }
                None => {
                    stack.extend(node.right);
                    stack.extend(node.left);
                }
            }
        }
    }

    /// Closest leaf along the ray within `max`. `filter` receives each leaf
    /// whose box the ray enters (with the entry time) and returns the precise
    /// hit time, or `None` to skip it.
    pub fn ray_cast(
        &self,
        ray: &Ray,
        max: f32,
        mut filter: impl FnMut(ActorId, f32) -> Option<f32>,
    ) -> Option<(ActorId, f32)> {
        let root = self.root?;
        let mut best: Option<(ActorId, f32)> = None;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.n(id);
            let limit = best.map_or(max, |(_, t)| t);
            let Some(entry) = node.bounds.ray_cast(ray, limit) else {
                continue;
            };
            match node.actor {
                Some(actor) => {
                    if let Some(t) = filter(actor, entry) {
                        if t <= max && best.is_none_or(|(_, b)| t < b) {
                            best = Some((actor, t));
                        }
                    }
                }
                None => {
                    stack.extend(node.right);
                    stack.extend(node.left);
                }
            }
        }
        best
    }

    // --- Diagnostics ---------------------------------------------------------

    /// Walk the whole tree and panic on the first broken structural invariant.
    pub fn validate(&self) {
        let Some(root) = self.root else {
            assert!(self.leaves.is_empty(), "empty tree still maps {} actors", self.leaves.len());
            assert_eq!(self.node_count(), 0, "empty tree still holds nodes");
            return;
        };
        assert_eq!(self.n(root).parent, None, "root has a parent");

        let mut leaf_count = 0;
        let mut reached = 0;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            reached += 1;
            let node = self.n(id);
            if node.is_leaf() {
                leaf_count += 1;
                assert_eq!(node.height, 0, "leaf {:?} has height {}", id, node.height);
                let actor = node
                    .actor
                    .unwrap_or_else(|| panic!("leaf {:?} carries no actor", id));
                assert_eq!(self.leaves.get(&actor), Some(&id), "leaf map out of sync for {:?}", actor);
                continue;
            }

            assert!(node.actor.is_none(), "internal node {:?} carries an actor", id);
            let (l, r) = self.children(id);
            for child in [l, r] {
                let c = self.n(child);
                assert_eq!(c.parent, Some(id), "{:?} does not point back to {:?}", child, id);
                assert_eq!(
                    node.bounds.combine(&c.bounds),
                    node.bounds,
                    "{:?} does not enclose {:?}",
                    id,
                    child
                );
                stack.push(child);
            }
            let expected = 1 + self.n(l).height.max(self.n(r).height);
            assert_eq!(node.height, expected, "stale height on {:?}", id);
        }

        assert_eq!(leaf_count, self.leaves.len(), "leaf count differs from actor map");
        assert_eq!(reached, self.node_count(), "unreachable nodes in the arena");
    }
}
