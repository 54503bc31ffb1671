//! Ranges: ordered pairs of positions with containment and iteration.

use crate::error::ViewError;
use crate::node::{Item, NodeId, ViewTree};
use crate::position::Position;
use crate::tree_walker::{Direction, TreeWalker, WalkerOptions, WalkerValue};

/// Span between two positions in the same tree.
///
/// `start` is expected to come before `end` but this is not enforced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Range {
    start: Position,
    end: Position,
}

/// Wrappers that enlarging and trimming pass over.
fn enlarge_trim_skip(tree: &ViewTree, value: &WalkerValue) -> bool {
    value
        .item
        .as_node()
        .is_some_and(|node| tree.is_attribute_element(node) || tree.is_ui_element(node))
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Range with both ends at `position`.
    pub fn collapsed(position: Position) -> Self {
        Self::new(position, position)
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// True when both ends share a parent.
    pub fn is_flat(&self) -> bool {
        self.start.parent() == self.end.parent()
    }

    pub fn root(&self, tree: &ViewTree) -> NodeId {
        self.start.root(tree)
    }

    pub fn is_equal(&self, other: &Range) -> bool {
        self == other
    }

    // === Constructors ===

    /// Range spanning the whole content of `node`.
    pub fn create_in(tree: &ViewTree, node: NodeId) -> Self {
        Self::new(Position::new(node, 0), Position::new(node, tree.max_offset(node)))
    }

    /// Range spanning exactly `item`.
    pub fn create_on(tree: &ViewTree, item: impl Into<Item>) -> Result<Self, ViewError> {
        let item = item.into();
        let size = match item {
            Item::TextProxy(proxy) => proxy.length,
            Item::Node(_) => 1,
        };
        Ok(Self::from_position_and_shift(
            Position::before(tree, item)?,
            size as isize,
        ))
    }

    /// Range from `position` to `position` shifted by `shift` (either way).
    pub fn from_position_and_shift(position: Position, shift: isize) -> Self {
        let end = position.get_shifted_by(shift);
        if shift > 0 {
            Self::new(position, end)
        } else {
            Self::new(end, position)
        }
    }

    pub fn from_parents_and_offsets(
        start_parent: NodeId,
        start_offset: usize,
        end_parent: NodeId,
        end_offset: usize,
    ) -> Self {
        Self::new(
            Position::new(start_parent, start_offset),
            Position::new(end_parent, end_offset),
        )
    }

    // === Boundary adjustment ===

    /// Grow the range over adjacent attribute and UI elements.
    ///
    /// `<p>ab<b>{c</b>d</p>` becomes `<p>ab[<b>c</b>d</p>`.
    pub fn get_enlarged(&self, tree: &ViewTree) -> Range {
        let mut start = self.start.get_last_matching_position(
            tree,
            |value| enlarge_trim_skip(tree, value),
            WalkerOptions::backward(),
        );
        let mut end = self.end.get_last_matching_position(
            tree,
            |value| enlarge_trim_skip(tree, value),
            WalkerOptions::default(),
        );

        if tree.is_text(start.parent()) && start.is_at_start() {
            start = Position::before_node(tree, start.parent()).unwrap_or(start);
        }
        if tree.is_text(end.parent()) && end.is_at_end(tree) {
            end = Position::after_node(tree, end.parent()).unwrap_or(end);
        }
        Range::new(start, end)
    }

    /// Shrink the range over adjacent attribute and UI elements.
    ///
    /// If nothing but such wrappers is inside, the result collapses at the
    /// point the forward scan from `start` stopped at.
    pub fn get_trimmed(&self, tree: &ViewTree) -> Range {
        let mut start = self.start.get_last_matching_position(
            tree,
            |value| enlarge_trim_skip(tree, value),
            WalkerOptions::default(),
        );
        if start.is_after(tree, &self.end) || start == self.end {
            return Range::collapsed(start);
        }

        let mut end = self.end.get_last_matching_position(
            tree,
            |value| enlarge_trim_skip(tree, value),
            WalkerOptions::backward(),
        );

        // The walker stops next to text nodes; move the ends inside them.
        if let Some(after) = start.node_after(tree)
            && tree.is_text(after)
        {
            start = Position::new(after, 0);
        }
        if let Some(before) = end.node_before(tree)
            && tree.is_text(before)
        {
            end = Position::new(before, tree.max_offset(before));
        }
        Range::new(start, end)
    }

    // === Algebra ===

    /// Strict containment: positions equal to either end are outside.
    pub fn contains_position(&self, tree: &ViewTree, position: &Position) -> bool {
        position.is_after(tree, &self.start) && position.is_before(tree, &self.end)
    }

    /// Whether `other` lies inside this range. With `loose`, shared ends count
    /// as inside; a collapsed `other` is always checked strictly.
    pub fn contains_range(&self, tree: &ViewTree, other: &Range, loose: bool) -> bool {
        let loose = loose && !other.is_collapsed();
        let contains_start =
            self.contains_position(tree, &other.start) || (loose && self.start == other.start);
        let contains_end =
            self.contains_position(tree, &other.end) || (loose && self.end == other.end);
        contains_start && contains_end
    }

    pub fn is_intersecting(&self, tree: &ViewTree, other: &Range) -> bool {
        self.start.is_before(tree, &other.end) && self.end.is_after(tree, &other.start)
    }

    /// Parts of this range not covered by `other`.
    pub fn get_difference(&self, tree: &ViewTree, other: &Range) -> Vec<Range> {
        if !self.is_intersecting(tree, other) {
            return vec![*self];
        }
        let mut ranges = Vec::with_capacity(2);
        if self.contains_position(tree, &other.start) {
            ranges.push(Range::new(self.start, other.start));
        }
        if self.contains_position(tree, &other.end) {
            ranges.push(Range::new(other.end, self.end));
        }
        ranges
    }

    pub fn get_intersection(&self, tree: &ViewTree, other: &Range) -> Option<Range> {
        if !self.is_intersecting(tree, other) {
            return None;
        }
        let start = if self.contains_position(tree, &other.start) {
            other.start
        } else {
            self.start
        };
        let end = if self.contains_position(tree, &other.end) {
            other.end
        } else {
            self.end
        };
        Some(Range::new(start, end))
    }

    pub fn get_common_ancestor(&self, tree: &ViewTree) -> Option<NodeId> {
        self.start.get_common_ancestor(tree, &self.end)
    }

    /// The one element this range spans exactly, if any.
    ///
    /// A start at the end of a text node counts as before that text's next
    /// sibling, and an end at the start of a text node as after its previous
    /// sibling.
    pub fn get_contained_element(&self, tree: &ViewTree) -> Option<NodeId> {
        if self.is_collapsed() {
            return None;
        }

        let mut node_after_start = self.start.node_after(tree);
        let mut node_before_end = self.end.node_before(tree);

        if tree.is_text(self.start.parent())
            && self.start.is_at_end(tree)
            && let Some(next) = tree.next_sibling(self.start.parent())
        {
            node_after_start = Some(next);
        }
        if tree.is_text(self.end.parent())
            && self.end.is_at_start()
            && let Some(previous) = tree.previous_sibling(self.end.parent())
        {
            node_before_end = Some(previous);
        }

        match (node_after_start, node_before_end) {
            (Some(a), Some(b)) if a == b && tree.is_element(a) => Some(a),
            _ => None,
        }
    }

    // === Iteration ===

    /// Walker bounded by this range. `options.boundaries` is replaced.
    pub fn get_walker<'t>(&self, tree: &'t ViewTree, mut options: WalkerOptions) -> TreeWalker<'t> {
        options.boundaries = Some(*self);
        let start = options.start_position.unwrap_or(match options.direction {
            Direction::Forward => self.start,
            Direction::Backward => self.end,
        });
        TreeWalker::starting_at(tree, start, options)
    }

    /// Forward walk over the range without element-end events.
    pub fn iter<'t>(&self, tree: &'t ViewTree) -> TreeWalker<'t> {
        self.get_walker(
            tree,
            WalkerOptions {
                ignore_element_end: true,
                ..Default::default()
            },
        )
    }

    /// Items inside the range. Element ends are always skipped.
    pub fn get_items<'t>(
        &self,
        tree: &'t ViewTree,
        options: WalkerOptions,
    ) -> impl Iterator<Item = Item> + 't {
        self.get_walker(
            tree,
            WalkerOptions {
                ignore_element_end: true,
                ..options
            },
        )
        .map(|value| value.item)
    }

    /// Every position the walker passes through, starting with its first.
    pub fn get_positions<'t>(
        &self,
        tree: &'t ViewTree,
        options: WalkerOptions,
    ) -> impl Iterator<Item = Position> + 't {
        let walker = self.get_walker(tree, options);
        let first = walker.position();
        std::iter::once(first).chain(walker.map(|value| value.next_position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ElementKind, TextProxy};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_trimmed_collapses_on_empty_wrappers() {
        // <p>[<b></b><i></i>]</p>
        let mut tree = ViewTree::new();
        let p = tree.create_container_element("p");
        let b = tree.create_attribute_element("b");
        let i = tree.create_attribute_element("i");
        tree.insert_children(p, 0, [b, i]);

        let trimmed = Range::create_in(&tree, p).get_trimmed(&tree);
        assert_eq!(trimmed, Range::collapsed(Position::new(p, 2)));
    }

    #[test]
    fn test_enlarged_and_trimmed_over_wrappers() {
        // <p>ab<b>c</b>d</p>, range inside "c"
        let mut tree = ViewTree::new();
        let p = tree.create_container_element("p");
        let ab = tree.create_text("ab");
        let b = tree.create_attribute_element("b");
        let c = tree.create_text("c");
        let d = tree.create_text("d");
        tree.insert_children(p, 0, [ab, b, d]);
        tree.append_child(b, c);

        let range = Range::create_in(&tree, c);
        let enlarged = range.get_enlarged(&tree);
        // Walking out stops at the text nodes around <b>.
        assert_eq!(enlarged, Range::create_on(&tree, b).unwrap());
        assert!(enlarged.contains_range(&tree, &range, true));

        let trimmed = enlarged.get_trimmed(&tree);
        assert_eq!(trimmed, range);
        assert_eq!(trimmed.start(), Position::new(c, 0));
        assert_ne!(trimmed.start(), Position::new(ab, 2));
    }

    #[test]
    fn test_contains_range_strict_and_loose() {
        let mut tree = ViewTree::new();
        let p = tree.create_container_element("p");
        let text = tree.create_text("abcdef");
        tree.append_child(p, text);

        let range = Range::from_parents_and_offsets(text, 1, text, 4);
        assert!(!range.contains_range(&tree, &range, false));
        assert!(range.contains_range(&tree, &range, true));

        let collapsed = Range::collapsed(Position::new(text, 1));
        assert!(!range.contains_range(&tree, &collapsed, true));
    }

    #[test]
    fn test_difference_and_intersection() {
        let mut tree = ViewTree::new();
        let p = tree.create_container_element("p");
        let text = tree.create_text("abcdefgh");
        tree.append_child(p, text);

        let outer = Range::from_parents_and_offsets(text, 1, text, 7);
        let inner = Range::from_parents_and_offsets(text, 3, text, 5);
        assert_eq!(
            outer.get_difference(&tree, &inner),
            vec![
                Range::from_parents_and_offsets(text, 1, text, 3),
                Range::from_parents_and_offsets(text, 5, text, 7),
            ]
        );
        assert_eq!(inner.get_difference(&tree, &outer), vec![]);

        let right = Range::from_parents_and_offsets(text, 6, text, 8);
        assert_eq!(
            outer.get_intersection(&tree, &right),
            Some(Range::from_parents_and_offsets(text, 6, text, 7))
        );

        let touching = Range::from_parents_and_offsets(text, 7, text, 8);
        assert!(!outer.is_intersecting(&tree, &touching));
        assert_eq!(outer.get_intersection(&tree, &touching), None);
        assert_eq!(outer.get_difference(&tree, &touching), vec![outer]);
    }

    #[test]
    fn test_contained_element_across_text_edges() {
        // <p>foo{<img>}bar</p>
        let mut tree = ViewTree::new();
        let p = tree.create_container_element("p");
        let foo = tree.create_text("foo");
        let img = tree.create_element(ElementKind::Empty, "img");
        let bar = tree.create_text("bar");
        tree.insert_children(p, 0, [foo, img, bar]);

        let range = Range::new(Position::new(foo, 3), Position::new(bar, 0));
        assert_eq!(range.get_contained_element(&tree), Some(img));

        let partial = Range::new(Position::new(foo, 2), Position::new(bar, 0));
        assert_eq!(partial.get_contained_element(&tree), None);
        assert_eq!(Range::collapsed(Position::new(p, 1)).get_contained_element(&tree), None);
    }

    #[test]
    fn test_create_on_text_proxy_uses_length() {
        let mut tree = ViewTree::new();
        let p = tree.create_container_element("p");
        let text = tree.create_text("abcdef");
        tree.append_child(p, text);

        let range = Range::create_on(&tree, TextProxy::new(text, 2, 3)).unwrap();
        assert_eq!(range, Range::from_parents_and_offsets(text, 2, text, 5));
        assert_eq!(
            Range::from_position_and_shift(Position::new(text, 4), -2),
            Range::from_parents_and_offsets(text, 2, text, 4)
        );
        assert_eq!(
            Range::create_on(&tree, p),
            Err(ViewError::InvalidPosition { node: p })
        );
    }

    #[test]
    fn test_get_positions_starts_at_walker_position() {
        let mut tree = ViewTree::new();
        let p = tree.create_container_element("p");
        let text = tree.create_text("ab");
        tree.append_child(p, text);

        let positions: Vec<_> = Range::create_in(&tree, p)
            .get_positions(
                &tree,
                WalkerOptions {
                    single_characters: true,
                    ..Default::default()
                },
            )
            .collect();
        assert_eq!(
            positions,
            vec![Position::new(p, 0), Position::new(text, 1), Position::new(p, 1)]
        );
    }
}
