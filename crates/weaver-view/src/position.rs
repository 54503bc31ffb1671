//! Positions: immutable addresses into a [`ViewTree`].

use std::cmp::Ordering;

use crate::error::ViewError;
use crate::node::{Item, NodeId, ViewTree};
use crate::tree_walker::{TreeWalker, WalkerOptions, WalkerValue};

/// Relation between two positions in document order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionRelation {
    Before,
    After,
    Same,
    /// The positions live in different trees.
    Different,
}

/// Where to put a position relative to an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Place {
    /// Inside the item at the given offset. For a text proxy the offset is
    /// relative to the proxy start.
    Offset(usize),
    /// Inside the item after its last child or character.
    End,
    Before,
    After,
}

/// A point between two children of an element or fragment, or between two
/// characters of a text node.
///
/// Positions are plain values and never change. They become stale when the
/// tree around them changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    parent: NodeId,
    offset: usize,
}

impl Position {
    pub fn new(parent: NodeId, offset: usize) -> Self {
        Self { parent, offset }
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Create a position relative to `item`.
    pub fn at(tree: &ViewTree, item: impl Into<Item>, place: Place) -> Result<Self, ViewError> {
        let item = item.into();
        match place {
            Place::Before => Self::before(tree, item),
            Place::After => Self::after(tree, item),
            Place::End => Ok(match item {
                Item::Node(node) => Self::new(node, tree.max_offset(node)),
                Item::TextProxy(proxy) => {
                    Self::new(proxy.text, proxy.offset_in_text + proxy.length)
                }
            }),
            Place::Offset(offset) => Ok(match item {
                Item::Node(node) => Self::new(node, offset),
                Item::TextProxy(proxy) => Self::new(proxy.text, proxy.offset_in_text + offset),
            }),
        }
    }

    /// Position right before `item`.
    pub fn before(tree: &ViewTree, item: impl Into<Item>) -> Result<Self, ViewError> {
        match item.into() {
            Item::TextProxy(proxy) => Ok(Self::new(proxy.text, proxy.offset_in_text)),
            Item::Node(node) => {
                Self::before_node(tree, node).ok_or(ViewError::InvalidPosition { node })
            }
        }
    }

    /// Position right after `item`.
    pub fn after(tree: &ViewTree, item: impl Into<Item>) -> Result<Self, ViewError> {
        match item.into() {
            Item::TextProxy(proxy) => Ok(Self::new(
                proxy.text,
                proxy.offset_in_text + proxy.length,
            )),
            Item::Node(node) => {
                Self::after_node(tree, node).ok_or(ViewError::InvalidPosition { node })
            }
        }
    }

    pub(crate) fn before_node(tree: &ViewTree, node: NodeId) -> Option<Self> {
        let parent = tree.parent(node)?;
        Some(Self::new(parent, tree.index(node)?))
    }

    pub(crate) fn after_node(tree: &ViewTree, node: NodeId) -> Option<Self> {
        let parent = tree.parent(node)?;
        Some(Self::new(parent, tree.index(node)? + 1))
    }

    /// Child right after the position. `None` inside text.
    pub fn node_after(&self, tree: &ViewTree) -> Option<NodeId> {
        tree.child(self.parent, self.offset)
    }

    /// Child right before the position. `None` inside text.
    pub fn node_before(&self, tree: &ViewTree) -> Option<NodeId> {
        self.offset
            .checked_sub(1)
            .and_then(|index| tree.child(self.parent, index))
    }

    pub fn is_at_start(&self) -> bool {
        self.offset == 0
    }

    pub fn is_at_end(&self, tree: &ViewTree) -> bool {
        self.offset == tree.max_offset(self.parent)
    }

    pub fn root(&self, tree: &ViewTree) -> NodeId {
        tree.root(self.parent)
    }

    /// Closest editable element containing the position.
    pub fn editable_element(&self, tree: &ViewTree) -> Option<NodeId> {
        let mut current = Some(self.parent);
        while let Some(node) = current {
            if tree.element_kind(node) == Some(crate::node::ElementKind::Editable) {
                return Some(node);
            }
            current = tree.parent(node);
        }
        None
    }

    /// New position with the offset moved by `delta`, clamped at zero.
    pub fn get_shifted_by(&self, delta: isize) -> Self {
        Self::new(self.parent, self.offset.saturating_add_signed(delta))
    }

    /// Index path from the root: the parent's path followed by the offset.
    fn path(&self, tree: &ViewTree) -> Vec<usize> {
        let mut path = tree.path(self.parent);
        path.push(self.offset);
        path
    }

    pub fn compare_with(&self, tree: &ViewTree, other: &Position) -> PositionRelation {
        if self == other {
            return PositionRelation::Same;
        }
        if self.root(tree) != other.root(tree) {
            return PositionRelation::Different;
        }

        let this_path = self.path(tree);
        let other_path = other.path(tree);
        // Slice ordering is lexicographic with a proper prefix ordered first.
        match this_path.cmp(&other_path) {
            Ordering::Less => PositionRelation::Before,
            Ordering::Greater => PositionRelation::After,
            Ordering::Equal => PositionRelation::Same,
        }
    }

    pub fn is_before(&self, tree: &ViewTree, other: &Position) -> bool {
        self.compare_with(tree, other) == PositionRelation::Before
    }

    pub fn is_after(&self, tree: &ViewTree, other: &Position) -> bool {
        self.compare_with(tree, other) == PositionRelation::After
    }

    pub fn is_equal(&self, other: &Position) -> bool {
        self == other
    }

    /// Deepest node containing both positions.
    pub fn get_common_ancestor(&self, tree: &ViewTree, other: &Position) -> Option<NodeId> {
        let mut this_chain = tree.ancestors(self.parent);
        this_chain.push(self.parent);
        let mut other_chain = tree.ancestors(other.parent);
        other_chain.push(other.parent);

        this_chain
            .iter()
            .zip(other_chain.iter())
            .take_while(|(a, b)| a == b)
            .last()
            .map(|(a, _)| *a)
    }

    /// True if nothing but element boundaries lies between the two positions.
    ///
    /// `<p>foo[</p><p>]bar</p>` touch; positions separated by text or by an
    /// empty, UI or raw element do not.
    pub fn is_touching(&self, tree: &ViewTree, other: &Position) -> bool {
        let (mut left, right) = match self.compare_with(tree, other) {
            PositionRelation::Same => return true,
            PositionRelation::Before => (*self, *other),
            PositionRelation::After => (*other, *self),
            PositionRelation::Different => return false,
        };

        loop {
            if left == right {
                return true;
            }
            if left.is_at_end(tree) {
                match Self::after_node(tree, left.parent) {
                    Some(next) => left = next,
                    None => return false,
                }
                continue;
            }
            if tree.is_text(left.parent) {
                return false;
            }
            let Some(node) = left.node_after(tree) else {
                return false;
            };
            match tree.element_kind(node) {
                Some(kind) if kind.is_host() || kind == crate::node::ElementKind::Empty => {
                    return false;
                }
                _ => left = Self::new(node, 0),
            }
        }
    }

    /// A tree walker starting at this position.
    pub fn get_walker<'t>(&self, tree: &'t ViewTree, options: WalkerOptions) -> TreeWalker<'t> {
        TreeWalker::starting_at(tree, *self, options)
    }

    /// Walk from this position while `skip` accepts the values and return
    /// where the walker stopped.
    pub fn get_last_matching_position(
        &self,
        tree: &ViewTree,
        skip: impl FnMut(&WalkerValue) -> bool,
        options: WalkerOptions,
    ) -> Position {
        let mut walker = self.get_walker(tree, options);
        walker.skip_matching(skip);
        walker.position()
    }
}
