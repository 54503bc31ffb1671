//! View selection: a set of non-intersecting ranges with a direction.

use std::fmt;

use crate::error::ViewError;
use crate::node::{Item, NodeId, ViewTree};
use crate::position::{Place, Position, PositionRelation};
use crate::range::Range;

/// Where to select relative to a node passed to [`Selection::set_to`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionPlace {
    /// The whole content of the node.
    In,
    /// The node itself.
    On,
    /// Collapsed inside the node at an offset.
    Offset(usize),
    /// Collapsed at the end of the node.
    End,
    /// Collapsed before the node.
    Before,
    /// Collapsed after the node.
    After,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionOptions {
    pub backward: bool,
    pub fake: bool,
    /// Label announced instead of the content of a fake selection.
    pub label: Option<String>,
}

impl SelectionOptions {
    pub fn backward() -> Self {
        Self {
            backward: true,
            ..Default::default()
        }
    }

    pub fn fake(label: impl Into<String>) -> Self {
        Self {
            fake: true,
            label: Some(label.into()),
            ..Default::default()
        }
    }
}

/// Everything a selection can be set to.
#[derive(Clone, Debug)]
pub enum Selectable<'a> {
    /// Clears the selection.
    None,
    Selection(&'a Selection),
    Range(Range),
    Position(Position),
    Item {
        item: Item,
        place: Option<SelectionPlace>,
    },
    Ranges(Vec<Range>),
}

impl From<Range> for Selectable<'_> {
    fn from(range: Range) -> Self {
        Selectable::Range(range)
    }
}

impl From<Position> for Selectable<'_> {
    fn from(position: Position) -> Self {
        Selectable::Position(position)
    }
}

impl<'a> From<&'a Selection> for Selectable<'a> {
    fn from(selection: &'a Selection) -> Self {
        Selectable::Selection(selection)
    }
}

impl From<Vec<Range>> for Selectable<'_> {
    fn from(ranges: Vec<Range>) -> Self {
        Selectable::Ranges(ranges)
    }
}

impl From<(NodeId, SelectionPlace)> for Selectable<'_> {
    fn from((node, place): (NodeId, SelectionPlace)) -> Self {
        Selectable::Item {
            item: Item::Node(node),
            place: Some(place),
        }
    }
}

type ChangeListener = Box<dyn FnMut(&Selection)>;

/// Ordered, mutually non-intersecting ranges plus direction and fake state.
#[derive(Default)]
pub struct Selection {
    ranges: Vec<Range>,
    last_range_backward: bool,
    is_fake: bool,
    fake_selection_label: String,
    listeners: Vec<ChangeListener>,
}

impl Clone for Selection {
    /// Clones ranges and state; change listeners stay with the original.
    fn clone(&self) -> Self {
        Self {
            ranges: self.ranges.clone(),
            last_range_backward: self.last_range_backward,
            is_fake: self.is_fake,
            fake_selection_label: self.fake_selection_label.clone(),
            listeners: Vec::new(),
        }
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("ranges", &self.ranges)
            .field("last_range_backward", &self.last_range_backward)
            .field("is_fake", &self.is_fake)
            .field("fake_selection_label", &self.fake_selection_label)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl PartialEq for Selection {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal(other)
    }
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// A selection set to `selectable`.
    pub fn from_selectable<'a>(
        tree: &ViewTree,
        selectable: impl Into<Selectable<'a>>,
        options: SelectionOptions,
    ) -> Result<Self, ViewError> {
        let mut selection = Self::new();
        selection.set_to(tree, selectable, options)?;
        Ok(selection)
    }

    /// Register a callback run after every change.
    pub fn on_change(&mut self, listener: impl FnMut(&Selection) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn fire_change(&mut self) {
        tracing::trace!(
            ranges = self.ranges.len(),
            backward = self.last_range_backward,
            fake = self.is_fake,
            "selection: change"
        );
        let mut listeners = std::mem::take(&mut self.listeners);
        for listener in listeners.iter_mut() {
            listener(self);
        }
        self.listeners = listeners;
    }

    // === State ===

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_fake(&self) -> bool {
        self.is_fake
    }

    pub fn fake_selection_label(&self) -> &str {
        &self.fake_selection_label
    }

    /// Start of the selection in the user's direction.
    pub fn anchor(&self) -> Option<Position> {
        let range = self.ranges.last()?;
        Some(if self.last_range_backward {
            range.end()
        } else {
            range.start()
        })
    }

    /// End of the selection in the user's direction.
    pub fn focus(&self) -> Option<Position> {
        let range = self.ranges.last()?;
        Some(if self.last_range_backward {
            range.start()
        } else {
            range.end()
        })
    }

    /// One collapsed range.
    pub fn is_collapsed(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0].is_collapsed()
    }

    pub fn is_backward(&self) -> bool {
        !self.is_collapsed() && self.last_range_backward
    }

    pub fn editable_element(&self, tree: &ViewTree) -> Option<NodeId> {
        self.anchor()?.editable_element(tree)
    }

    /// Range starting first in document order.
    pub fn get_first_range(&self, tree: &ViewTree) -> Option<Range> {
        self.ranges.iter().copied().reduce(|first, range| {
            if range.start().is_before(tree, &first.start()) {
                range
            } else {
                first
            }
        })
    }

    /// Range ending last in document order.
    pub fn get_last_range(&self, tree: &ViewTree) -> Option<Range> {
        self.ranges.iter().copied().reduce(|last, range| {
            if range.end().is_after(tree, &last.end()) {
                range
            } else {
                last
            }
        })
    }

    pub fn get_first_position(&self, tree: &ViewTree) -> Option<Position> {
        self.get_first_range(tree).map(|range| range.start())
    }

    pub fn get_last_position(&self, tree: &ViewTree) -> Option<Position> {
        self.get_last_range(tree).map(|range| range.end())
    }

    /// The element selected by the only range, if it spans exactly one.
    pub fn get_selected_element(&self, tree: &ViewTree) -> Option<NodeId> {
        if self.ranges.len() != 1 {
            return None;
        }
        self.ranges[0].get_contained_element(tree)
    }

    /// Same fake state, same ranges, same anchor and focus.
    pub fn is_equal(&self, other: &Selection) -> bool {
        if self.is_fake != other.is_fake {
            return false;
        }
        if self.is_fake && self.fake_selection_label != other.fake_selection_label {
            return false;
        }
        if self.ranges.len() != other.ranges.len() {
            return false;
        }
        if self.ranges.is_empty() {
            return true;
        }
        if self.anchor() != other.anchor() || self.focus() != other.focus() {
            return false;
        }
        self.ranges
            .iter()
            .all(|range| other.ranges.iter().any(|o| range.is_equal(o)))
    }

    /// Equal after trimming every range, with the same direction.
    pub fn is_similar(&self, tree: &ViewTree, other: &Selection) -> bool {
        if self.is_backward() != other.is_backward() {
            return false;
        }
        if self.ranges.len() != other.ranges.len() {
            return false;
        }
        let other_trimmed: Vec<Range> = other
            .ranges
            .iter()
            .map(|range| range.get_trimmed(tree))
            .collect();
        self.ranges.iter().all(|range| {
            let trimmed = range.get_trimmed(tree);
            other_trimmed.iter().any(|o| trimmed.is_equal(o))
        })
    }

    // === Mutation ===

    /// Replace all ranges and the fake state.
    ///
    /// Nothing changes when an error is returned.
    pub fn set_to<'a>(
        &mut self,
        tree: &ViewTree,
        selectable: impl Into<Selectable<'a>>,
        options: SelectionOptions,
    ) -> Result<(), ViewError> {
        let (ranges, backward, fake, label) = match selectable.into() {
            Selectable::None => (Vec::new(), false, options.fake, options.label),
            Selectable::Selection(other) => (
                other.ranges.clone(),
                other.is_backward(),
                other.is_fake,
                Some(other.fake_selection_label.clone()),
            ),
            Selectable::Range(range) => (vec![range], options.backward, options.fake, options.label),
            Selectable::Position(position) => {
                (vec![Range::collapsed(position)], false, options.fake, options.label)
            }
            Selectable::Item { item, place } => {
                let node = item.as_node().ok_or(ViewError::NotSelectable)?;
                let place = place.ok_or(ViewError::MissingSecondArgument)?;
                let range = match place {
                    SelectionPlace::In => Range::create_in(tree, node),
                    SelectionPlace::On => Range::create_on(tree, node)?,
                    SelectionPlace::Offset(offset) => {
                        Range::collapsed(Position::at(tree, node, Place::Offset(offset))?)
                    }
                    SelectionPlace::End => Range::collapsed(Position::at(tree, node, Place::End)?),
                    SelectionPlace::Before => Range::collapsed(Position::before(tree, node)?),
                    SelectionPlace::After => Range::collapsed(Position::after(tree, node)?),
                };
                (vec![range], options.backward, options.fake, options.label)
            }
            Selectable::Ranges(ranges) => (ranges, options.backward, options.fake, options.label),
        };

        check_disjoint(tree, &ranges, &[])?;

        self.ranges = ranges;
        self.last_range_backward = backward;
        self.is_fake = fake;
        self.fake_selection_label = if fake { label.unwrap_or_default() } else { String::new() };
        self.fire_change();
        Ok(())
    }

    /// Add one more range, which becomes the anchor/focus range.
    pub fn add_range(&mut self, tree: &ViewTree, range: Range, backward: bool) -> Result<(), ViewError> {
        check_disjoint(tree, &[range], &self.ranges)?;
        self.ranges.push(range);
        self.last_range_backward = backward;
        self.fire_change();
        Ok(())
    }

    /// Move the focus, keeping the anchor. The last range is replaced and
    /// its direction follows the new focus.
    pub fn set_focus(&mut self, tree: &ViewTree, new_focus: Position) -> Result<(), ViewError> {
        let (Some(anchor), Some(focus)) = (self.anchor(), self.focus()) else {
            return Err(ViewError::NoRanges);
        };
        if new_focus.compare_with(tree, &focus) == PositionRelation::Same {
            return Ok(());
        }

        let (range, backward) = if new_focus.compare_with(tree, &anchor) == PositionRelation::Before {
            (Range::new(new_focus, anchor), true)
        } else {
            (Range::new(anchor, new_focus), false)
        };
        let kept = &self.ranges[..self.ranges.len() - 1];
        check_disjoint(tree, &[range], kept)?;

        self.ranges.pop();
        self.ranges.push(range);
        self.last_range_backward = backward;
        self.fire_change();
        Ok(())
    }

    /// [`Selection::set_focus`] with the focus given relative to an item.
    pub fn set_focus_at(
        &mut self,
        tree: &ViewTree,
        item: impl Into<Item>,
        place: Place,
    ) -> Result<(), ViewError> {
        if self.ranges.is_empty() {
            return Err(ViewError::NoRanges);
        }
        let position = Position::at(tree, item, place)?;
        self.set_focus(tree, position)
    }
}

/// Fail if any of `ranges` intersects another one or one of `stored`.
fn check_disjoint(tree: &ViewTree, ranges: &[Range], stored: &[Range]) -> Result<(), ViewError> {
    for (index, range) in ranges.iter().enumerate() {
        let intersects = stored
            .iter()
            .chain(&ranges[..index])
            .any(|other| range.is_intersecting(tree, other));
        if intersects {
            tracing::warn!(?range, "selection: range intersects a stored range");
            return Err(ViewError::RangeIntersects);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::node::{ElementKind, TextProxy};

    fn paragraph(text: &str) -> (ViewTree, NodeId, NodeId) {
        let mut tree = ViewTree::new();
        let p = tree.create_element(ElementKind::Editable, "p");
        let t = tree.create_text(text);
        tree.append_child(p, t);
        (tree, p, t)
    }

    #[test]
    fn test_backward_flag_follows_last_set_to() {
        let (tree, _p, t) = paragraph("foobar");
        let range = Range::from_parents_and_offsets(t, 1, t, 4);
        let mut selection = Selection::new();

        selection.set_to(&tree, range, SelectionOptions::backward()).unwrap();
        assert!(selection.is_backward());
        assert_eq!(selection.anchor(), Some(Position::new(t, 4)));
        assert_eq!(selection.focus(), Some(Position::new(t, 1)));

        selection.set_to(&tree, range, SelectionOptions::default()).unwrap();
        assert!(!selection.is_backward());
        assert_eq!(selection.anchor(), Some(Position::new(t, 1)));
    }

    #[test]
    fn test_collapsed_is_never_backward() {
        let (tree, _p, t) = paragraph("foo");
        let selection = Selection::from_selectable(
            &tree,
            Range::collapsed(Position::new(t, 1)),
            SelectionOptions::backward(),
        )
        .unwrap();
        assert!(selection.is_collapsed());
        assert!(!selection.is_backward());
    }

    #[test]
    fn test_intersecting_ranges_rejected_atomically() {
        let (tree, _p, t) = paragraph("abcdefgh");
        let mut selection = Selection::from_selectable(
            &tree,
            Range::from_parents_and_offsets(t, 0, t, 1),
            SelectionOptions::default(),
        )
        .unwrap();

        let result = selection.set_to(
            &tree,
            vec![
                Range::from_parents_and_offsets(t, 1, t, 4),
                Range::from_parents_and_offsets(t, 3, t, 6),
            ],
            SelectionOptions::default(),
        );
        assert_eq!(result, Err(ViewError::RangeIntersects));
        assert_eq!(selection.ranges(), &[Range::from_parents_and_offsets(t, 0, t, 1)]);

        // Touching ranges do not intersect.
        selection
            .add_range(&tree, Range::from_parents_and_offsets(t, 1, t, 2), false)
            .unwrap();
        assert_eq!(selection.range_count(), 2);
    }

    #[test]
    fn test_set_to_item_errors() {
        let (tree, p, t) = paragraph("abc");
        let mut selection = Selection::new();
        assert_eq!(
            selection.set_to(
                &tree,
                Selectable::Item { item: Item::Node(p), place: None },
                SelectionOptions::default()
            ),
            Err(ViewError::MissingSecondArgument)
        );
        assert_eq!(
            selection.set_to(
                &tree,
                Selectable::Item {
                    item: Item::TextProxy(TextProxy::new(t, 0, 1)),
                    place: Some(SelectionPlace::In)
                },
                SelectionOptions::default()
            ),
            Err(ViewError::NotSelectable)
        );
        selection
            .set_to(&tree, (p, SelectionPlace::In), SelectionOptions::default())
            .unwrap();
        assert_eq!(selection.get_first_range(&tree), Some(Range::create_in(&tree, p)));
    }

    #[test]
    fn test_set_focus_flips_direction() {
        let (tree, _p, t) = paragraph("abcdef");
        let mut selection = Selection::new();
        assert_eq!(
            selection.set_focus(&tree, Position::new(t, 1)),
            Err(ViewError::NoRanges)
        );

        selection
            .set_to(&tree, Position::new(t, 3), SelectionOptions::default())
            .unwrap();
        selection.set_focus(&tree, Position::new(t, 1)).unwrap();
        assert!(selection.is_backward());
        assert_eq!(selection.anchor(), Some(Position::new(t, 3)));
        assert_eq!(selection.get_first_range(&tree), Some(Range::from_parents_and_offsets(t, 1, t, 3)));

        selection.set_focus_at(&tree, t, Place::Offset(5)).unwrap();
        assert!(!selection.is_backward());
        assert_eq!(selection.focus(), Some(Position::new(t, 5)));
    }

    #[test]
    fn test_fake_state_and_equality() {
        let (tree, _p, t) = paragraph("abc");
        let range = Range::from_parents_and_offsets(t, 0, t, 2);
        let fake = Selection::from_selectable(&tree, range, SelectionOptions::fake("widget")).unwrap();
        let plain = Selection::from_selectable(&tree, range, SelectionOptions::default()).unwrap();

        assert!(fake.is_fake());
        assert_eq!(fake.fake_selection_label(), "widget");
        assert_ne!(fake, plain);

        let copy = Selection::from_selectable(&tree, &fake, SelectionOptions::default()).unwrap();
        assert_eq!(copy, fake);
        assert!(copy.is_similar(&tree, &fake));
    }

    #[test]
    fn test_change_fires_once_per_set() {
        let (tree, _p, t) = paragraph("abc");
        let fired = Rc::new(Cell::new(0));
        let mut selection = Selection::new();
        let counter = fired.clone();
        selection.on_change(move |_| counter.set(counter.get() + 1));

        selection
            .set_to(
                &tree,
                vec![
                    Range::from_parents_and_offsets(t, 0, t, 1),
                    Range::from_parents_and_offsets(t, 2, t, 3),
                ],
                SelectionOptions::default(),
            )
            .unwrap();
        assert_eq!(fired.get(), 1);

        let _ = selection.set_to(
            &tree,
            vec![
                Range::from_parents_and_offsets(t, 0, t, 2),
                Range::from_parents_and_offsets(t, 1, t, 3),
            ],
            SelectionOptions::default(),
        );
        assert_eq!(fired.get(), 1);
    }
}
