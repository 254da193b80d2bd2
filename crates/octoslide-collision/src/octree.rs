//! Fixed-depth octree over collision objects.
//!
//! The tree is fully subdivided at construction and never rebalanced. Nodes
//! live in a flat arena addressed by [`NodeId`], which lets dynamic objects
//! keep plain leaf handles for removal.
//!
//! An object is referenced by every leaf its bounds overlap, so queries
//! deduplicate through the per-object epoch stamp kept in the object store.

use octoslide_core::constants::OCTANTS;
use octoslide_core::{Aabb, Error, Result};

use crate::config::MAX_DEPTH;
use crate::object::{Collider, CollisionObject, ObjectId, ObjectStore};

/// Handle to a node in an [`Octree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Node payload: either eight children or a list of object references.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Internal node with children in [`Aabb::subdivide`] order.
    Branch([NodeId; OCTANTS]),
    /// Leaf holding object references.
    Leaf(Vec<ObjectId>),
}

/// A node in the octree.
#[derive(Clone, Debug)]
pub struct OctreeNode {
    bounds: Aabb,
    kind: NodeKind,
}

impl OctreeNode {
    /// Region covered by this node.
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Node payload.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Check if the node is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// Objects stored in this node if it is a leaf.
    pub fn as_leaf(&self) -> Option<&[ObjectId]> {
        match &self.kind {
            NodeKind::Leaf(objects) => Some(objects),
            NodeKind::Branch(_) => None,
        }
    }
}

/// Fixed-depth spatial partition.
#[derive(Clone, Debug)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    depth: u32,
}

impl Octree {
    /// Build a tree over `bounds` with `depth` levels of subdivision.
    ///
    /// Depth 0 is a single leaf; depth `n` has `8^n` leaves. Fails above
    /// [`MAX_DEPTH`].
    pub fn new(bounds: Aabb, depth: u32) -> Result<Self> {
        if depth > MAX_DEPTH {
            return Err(Error::InvalidConfig(format!(
                "depth {depth} exceeds maximum {MAX_DEPTH}"
            )));
        }
        let node_count = (0..=depth).map(|level| OCTANTS.pow(level)).sum();
        let mut nodes = Vec::with_capacity(node_count);
        Self::build(&mut nodes, bounds, depth);
        Ok(Self { nodes, depth })
    }

    fn build(nodes: &mut Vec<OctreeNode>, bounds: Aabb, level: u32) -> NodeId {
        let id = NodeId(nodes.len() as u32);
        nodes.push(OctreeNode {
            bounds,
            kind: NodeKind::Leaf(Vec::new()),
        });
        if level > 0 {
            let children = bounds
                .subdivide()
                .map(|child| Self::build(nodes, child, level - 1));
            nodes[id.index()].kind = NodeKind::Branch(children);
        }
        id
    }

    /// Root node handle.
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Subdivision depth.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Region covered by the root.
    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.nodes[0].bounds
    }

    /// Get a node by handle.
    pub fn node(&self, id: NodeId) -> Option<&OctreeNode> {
        self.nodes.get(id.index())
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// Total object references across all leaves.
    pub fn reference_count(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(OctreeNode::as_leaf)
            .map(<[ObjectId]>::len)
            .sum()
    }

    /// Add `id` to every leaf its bounds overlap, notifying the object of each.
    pub fn insert(&mut self, id: ObjectId, object: &mut CollisionObject) {
        self.insert_at(self.root(), id, object);
    }

    fn insert_at(&mut self, node: NodeId, id: ObjectId, object: &mut CollisionObject) {
        let entry = &mut self.nodes[node.index()];
        if !entry.bounds.overlaps(object.shape.bounds()) {
            return;
        }
        match &mut entry.kind {
            NodeKind::Leaf(objects) => {
                objects.push(id);
                object.shape.on_inserted(node);
            }
            NodeKind::Branch(children) => {
                let children = *children;
                for child in children {
                    self.insert_at(child, id, object);
                }
            }
        }
    }

    /// Remove `id` from a single leaf. Returns whether it was present.
    pub fn remove_from_leaf(&mut self, leaf: NodeId, id: ObjectId) -> bool {
        let Some(NodeKind::Leaf(objects)) = self.nodes.get_mut(leaf.index()).map(|n| &mut n.kind)
        else {
            return false;
        };
        match objects.iter().position(|&o| o == id) {
            Some(pos) => {
                objects.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    /// Remove `id` from every leaf overlapping `bounds`. Returns the number of
    /// references removed.
    pub fn remove(&mut self, id: ObjectId, bounds: &Aabb) -> usize {
        let mut leaves = Vec::new();
        self.collect_leaves(self.root(), bounds, &mut leaves);
        leaves
            .into_iter()
            .filter(|&leaf| self.remove_from_leaf(leaf, id))
            .count()
    }

    fn collect_leaves(&self, node: NodeId, region: &Aabb, out: &mut Vec<NodeId>) {
        let entry = &self.nodes[node.index()];
        if !entry.bounds.overlaps(region) {
            return;
        }
        match &entry.kind {
            NodeKind::Leaf(_) => out.push(node),
            NodeKind::Branch(children) => {
                for &child in children {
                    self.collect_leaves(child, region, out);
                }
            }
        }
    }

    /// Append every object overlapping `region` that has not yet been
    /// reported under `epoch`, stamping each as it is reported.
    pub(crate) fn query(
        &self,
        region: &Aabb,
        epoch: u64,
        objects: &mut ObjectStore,
        out: &mut Vec<ObjectId>,
    ) {
        self.query_at(self.root(), region, epoch, objects, out);
    }

    fn query_at(
        &self,
        node: NodeId,
        region: &Aabb,
        epoch: u64,
        objects: &mut ObjectStore,
        out: &mut Vec<ObjectId>,
    ) {
        let entry = &self.nodes[node.index()];
        if !entry.bounds.overlaps(region) {
            return;
        }
        match &entry.kind {
            NodeKind::Leaf(ids) => {
                out.extend(ids.iter().copied().filter(|&id| objects.claim(id, region, epoch)));
            }
            NodeKind::Branch(children) => {
                for &child in children {
                    self.query_at(child, region, epoch, objects, out);
                }
            }
        }
    }
}
