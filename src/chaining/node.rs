//! Search-tree arena.
//!
//! Nodes live in a `Vec` and refer to their parent by index, so the tree is
//! dropped wholesale with the search.

use std::ops::{Index, IndexMut};
use std::sync::Arc;

use crate::logic::{Action, PartialMapping, Placeholder, Rule, Variable};
use crate::state::{mapping_sort_key, State};

/// Sort key of a [`PartialAction`].
pub type SortKey = (String, Vec<Placeholder>, Vec<(Placeholder, Variable)>);

/// A rule together with a (possibly partial) assignment of its placeholders.
#[derive(Debug, Clone)]
pub struct PartialAction {
    pub rule: Arc<Rule>,
    pub mapping: PartialMapping,
}

impl PartialAction {
    pub fn new(rule: Arc<Rule>, mapping: PartialMapping) -> Self {
        Self { rule, mapping }
    }

    /// Deterministic order: rule name, then unbound placeholders, then the
    /// bound pairs.
    pub fn sort_key(&self) -> SortKey {
        let (absent, present) = mapping_sort_key(&self.mapping);
        (self.rule.name.clone(), absent, present)
    }
}

/// The not-yet-tried tail of a list of sibling assignments.
///
/// Child `i` of a node may only backtrack into siblings after `i`, so every
/// unordered pair of siblings is combined once.
#[derive(Debug, Clone)]
pub struct BacktrackSlice {
    partials: Arc<[PartialAction]>,
    start: usize,
}

impl BacktrackSlice {
    pub fn new(partials: Arc<[PartialAction]>, start: usize) -> Self {
        Self { partials, start }
    }

    pub fn len(&self) -> usize {
        self.partials.len().saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartialAction> {
        self.partials.iter().skip(self.start)
    }

    /// The slice past the `j`-th remaining element.
    pub fn after(&self, j: usize) -> Self {
        Self::new(self.partials.clone(), self.start + j + 1)
    }
}

/// Index of a node in a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A node of the search tree.
#[derive(Debug, Clone)]
pub struct ChainNode {
    pub parent: Option<NodeId>,
    /// Dropped once the node has been expanded and reported.
    pub state: Option<State>,
    /// The action leading here from the parent; `None` at the root.
    pub action: Option<Action>,
    /// Remaining assignments per earlier depth, for parallel subquests.
    pub backtracks: Vec<BacktrackSlice>,
    pub depth: usize,
    pub breadth: usize,
}

impl ChainNode {
    pub fn root(state: State) -> Self {
        Self {
            parent: None,
            state: Some(state),
            action: None,
            backtracks: Vec::new(),
            depth: 0,
            breadth: 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<ChainNode>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: ChainNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `id` and its ancestors, nearest first, up to and including the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &ChainNode)> {
        std::iter::successors(Some(id), |&id| self[id].parent).map(|id| (id, &self[id]))
    }
}

impl Index<NodeId> for NodeArena {
    type Output = ChainNode;

    fn index(&self, id: NodeId) -> &ChainNode {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut ChainNode {
        &mut self.nodes[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial(name: &str) -> PartialAction {
        let rule = Rule::parse(&format!("{name} :: a(foo) -> b(foo)")).unwrap();
        PartialAction::new(Arc::new(rule), PartialMapping::new())
    }

    #[test]
    fn backtrack_slices_skip_consumed_siblings() {
        let partials: Arc<[PartialAction]> = vec![partial("x"), partial("y"), partial("z")].into();
        let slice = BacktrackSlice::new(partials, 1);
        assert_eq!(slice.len(), 2);
        let names: Vec<&str> = slice.iter().map(|p| p.rule.name.as_str()).collect();
        assert_eq!(names, vec!["y", "z"]);

        let rest = slice.after(0);
        assert_eq!(rest.iter().next().map(|p| p.rule.name.as_str()), Some("z"));
        assert!(slice.after(1).is_empty());
    }

    #[test]
    fn ancestors_walk_to_root() {
        let mut arena = NodeArena::new();
        let root = arena.push(ChainNode::root(State::default()));
        let mut child = ChainNode::root(State::default());
        child.parent = Some(root);
        child.depth = 1;
        let child = arena.push(child);

        let depths: Vec<usize> = arena.ancestors(child).map(|(_, n)| n.depth).collect();
        assert_eq!(depths, vec![1, 0]);
        assert_eq!(arena.len(), 2);
    }
}
