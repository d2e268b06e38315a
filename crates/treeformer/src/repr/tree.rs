//! Arena tree of predicate nodes.
//!
//! Nodes live in a flat `Vec` and refer to each other by [`NodeId`]. Children
//! are owned by the arena; parent links are plain back-references used only
//! to reconstruct root-to-node paths. Every child id is greater than its
//! parent's id, so the arena order is a topological order.

use std::collections::BTreeMap;

use super::{NodeId, Predicate, PredicateKind, TraceStep};
use crate::data::State;

/// Token id -> probability for one branch of one node.
pub type ClassProbs = BTreeMap<u16, f64>;

/// Static lookback baseline value meaning "not statically known".
pub const UNKNOWN_LOOKBACK: i32 = -1;

#[inline]
fn slot(branch: bool) -> usize {
    branch as usize
}

// ============================================================================
// Node
// ============================================================================

/// One decision node.
#[derive(Clone, Debug)]
pub struct Node {
    predicate: Predicate,
    /// Index 0 = false branch, 1 = true branch.
    children: [Option<NodeId>; 2],
    parent: Option<TraceStep>,
    class_probs: [ClassProbs; 2],
}

impl Node {
    fn new(predicate: Predicate, parent: Option<TraceStep>) -> Self {
        Self {
            predicate,
            children: [None, None],
            parent,
            class_probs: [ClassProbs::new(), ClassProbs::new()],
        }
    }

    #[inline]
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    #[inline]
    pub fn child(&self, branch: bool) -> Option<NodeId> {
        self.children[slot(branch)]
    }

    /// Parent id and the parent's branch leading here.
    #[inline]
    pub fn parent(&self) -> Option<TraceStep> {
        self.parent
    }

    #[inline]
    pub fn class_probs(&self, branch: bool) -> &ClassProbs {
        &self.class_probs[slot(branch)]
    }
}

// ============================================================================
// TreeValidationError
// ============================================================================

/// Structural validation errors for [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeValidationError {
    /// Tree has no nodes.
    EmptyTree,
    /// The root has a parent link.
    RootHasParent,
    /// A child link points outside the arena.
    ChildOutOfBounds {
        node: NodeId,
        branch: bool,
        child: NodeId,
        n_nodes: usize,
    },
    /// A child id is not greater than its parent's id.
    ChildBeforeParent { node: NodeId, child: NodeId },
    /// A child's parent link does not point back at the linking slot.
    ParentMismatch { node: NodeId, child: NodeId },
    /// A non-root node is not linked from its recorded parent.
    Orphan { node: NodeId },
}

impl std::fmt::Display for TreeValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTree => write!(f, "tree has no nodes"),
            Self::RootHasParent => write!(f, "root node has a parent link"),
            Self::ChildOutOfBounds {
                node,
                branch,
                child,
                n_nodes,
            } => write!(
                f,
                "node {node} branch {branch} links child {child} outside {n_nodes} nodes"
            ),
            Self::ChildBeforeParent { node, child } => {
                write!(f, "node {node} links child {child} with a smaller id")
            }
            Self::ParentMismatch { node, child } => {
                write!(f, "child {child} of node {node} has a mismatched parent link")
            }
            Self::Orphan { node } => write!(f, "node {node} is not linked from its parent"),
        }
    }
}

impl std::error::Error for TreeValidationError {}

// ============================================================================
// Tree
// ============================================================================

/// Result of walking a state down a tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Evaluation<'a> {
    /// Last node visited.
    pub node: NodeId,
    /// Branch taken at that node; it has no child.
    pub branch: bool,
    /// State after every predicate on the path was applied.
    pub state: State<'a>,
}

/// A decision tree stored as an arena of [`Node`]s.
#[derive(Clone, Debug)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Create a single-node tree.
    pub fn new(root: Predicate) -> Self {
        Self {
            nodes: vec![Node::new(root, None)],
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        0
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Link a new node as `parent`'s child on `branch`.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the slot is already occupied.
    pub fn add_child(&mut self, parent: NodeId, branch: bool, predicate: Predicate) -> NodeId {
        debug_assert!(self.node(parent).child(branch).is_none(), "child slot occupied");
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node::new(predicate, Some((parent, branch))));
        self.nodes[parent as usize].children[slot(branch)] = Some(id);
        id
    }

    pub fn set_class_probs(&mut self, node: NodeId, branch: bool, probs: ClassProbs) {
        self.nodes[node as usize].class_probs[slot(branch)] = probs;
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Walk `state` from the root until the taken branch has no child.
    pub fn evaluate<'a>(&self, mut state: State<'a>) -> Evaluation<'a> {
        let mut node = self.root();
        loop {
            let (branch, next) = self.node(node).predicate.evaluate(state);
            state = next;
            match self.node(node).child(branch) {
                Some(child) => node = child,
                None => return Evaluation { node, branch, state },
            }
        }
    }

    /// Class distribution for `state`.
    ///
    /// Uses the taken branch's table at the terminal node. If that table is
    /// empty (the branch was never visited during estimation), falls back to
    /// the deepest ancestor whose on-path branch table is non-empty.
    pub fn predict(&self, state: State<'_>) -> Option<&ClassProbs> {
        let eval = self.evaluate(state);
        let mut step = Some((eval.node, eval.branch));
        while let Some((node, branch)) = step {
            let probs = self.node(node).class_probs(branch);
            if !probs.is_empty() {
                return Some(probs);
            }
            step = self.node(node).parent;
        }
        None
    }

    /// Ancestors of `node` with the branch taken at each, root first.
    ///
    /// Does not include `node` itself.
    pub fn path_to(&self, node: NodeId) -> Vec<TraceStep> {
        let mut path = Vec::new();
        let mut cur = self.node(node).parent;
        while let Some(step) = cur {
            path.push(step);
            cur = self.node(step.0).parent;
        }
        path.reverse();
        path
    }

    /// Apply `trace` to `state`.
    ///
    /// Returns the updated state if every predicate on the trace takes the
    /// recorded branch, `None` otherwise.
    pub fn follow<'a>(&self, trace: &[TraceStep], mut state: State<'a>) -> Option<State<'a>> {
        for &(node, branch) in trace {
            let (taken, next) = self.node(node).predicate.evaluate(state);
            if taken != branch {
                return None;
            }
            state = next;
        }
        Some(state)
    }

    /// Cursor value every state following `trace` is guaranteed to carry.
    ///
    /// Starts at 0. A true absolute step sets it, a true relative step adds to
    /// it, false steps leave it. Any dynamic predicate on the trace makes it
    /// [`UNKNOWN_LOOKBACK`].
    pub fn static_lookback(&self, trace: &[TraceStep]) -> i32 {
        let mut baseline = 0i32;
        for &(node, branch) in trace {
            let predicate = self.node(node).predicate;
            match predicate.kind() {
                PredicateKind::Dynamic => return UNKNOWN_LOOKBACK,
                _ if !branch => {}
                PredicateKind::Absolute => baseline = predicate.lookback(),
                PredicateKind::Relative => baseline += predicate.lookback(),
            }
        }
        baseline
    }

    /// Depth of `node`; the root has depth 0.
    pub fn depth_of(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut cur = self.node(node).parent;
        while let Some((parent, _)) = cur {
            depth += 1;
            cur = self.node(parent).parent;
        }
        depth
    }

    /// Depth of the deepest node.
    pub fn depth(&self) -> usize {
        // Parents precede children, so one forward pass suffices.
        let mut depths = vec![0usize; self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some((parent, _)) = node.parent {
                depths[i] = depths[parent as usize] + 1;
            }
        }
        depths.into_iter().max().unwrap_or(0)
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Check the arena invariants.
    pub fn validate(&self) -> Result<(), TreeValidationError> {
        let n_nodes = self.nodes.len();
        if n_nodes == 0 {
            return Err(TreeValidationError::EmptyTree);
        }
        if self.nodes[0].parent.is_some() {
            return Err(TreeValidationError::RootHasParent);
        }

        for (i, node) in self.nodes.iter().enumerate() {
            let id = i as NodeId;
            for branch in [false, true] {
                let Some(child) = node.child(branch) else {
                    continue;
                };
                if child as usize >= n_nodes {
                    return Err(TreeValidationError::ChildOutOfBounds {
                        node: id,
                        branch,
                        child,
                        n_nodes,
                    });
                }
                if child <= id {
                    return Err(TreeValidationError::ChildBeforeParent { node: id, child });
                }
                if self.nodes[child as usize].parent != Some((id, branch)) {
                    return Err(TreeValidationError::ParentMismatch { node: id, child });
                }
            }
            if i > 0 {
                let linked = node
                    .parent
                    .filter(|&(p, b)| (p as usize) < n_nodes && self.node(p).child(b) == Some(id));
                if linked.is_none() {
                    return Err(TreeValidationError::Orphan { node: id });
                }
            }
        }
        Ok(())
    }
}

/// Structural equality: predicates and child shape, never ids or tables.
impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self.root(), other.root())];
        while let Some((a, b)) = stack.pop() {
            let (na, nb) = (self.node(a), other.node(b));
            if na.predicate != nb.predicate {
                return false;
            }
            for branch in [false, true] {
                match (na.child(branch), nb.child(branch)) {
                    (None, None) => {}
                    (Some(ca), Some(cb)) => stack.push((ca, cb)),
                    _ => return false,
                }
            }
        }
        true
    }
}
