//! Error types for view tree addressing.
//!
//! Only programmer errors live here. Queries that merely cannot be resolved
//! against the current tree (different roots, non-overlapping ranges, content
//! not rendered yet) return `None` or an empty collection instead.

use miette::Diagnostic;
use thiserror::Error;

use crate::node::NodeId;

/// Errors raised when constructing positions, walkers or selections.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[non_exhaustive]
pub enum ViewError {
    /// A position was requested relative to a node that has no parent.
    #[error("cannot create a position before or after a root node ({node:?})")]
    #[diagnostic(code(weaver_view::position::before_root))]
    InvalidPosition { node: NodeId },

    /// A tree walker needs either boundaries or a start position.
    #[error("tree walker needs boundaries or a start position")]
    #[diagnostic(code(weaver_view::tree_walker::no_start_position))]
    NoStartPosition,

    /// Walker direction was neither `forward` nor `backward`.
    #[error("unknown tree walker direction: {0}")]
    #[diagnostic(code(weaver_view::tree_walker::unknown_direction))]
    UnknownDirection(String),

    /// `Selection::set_focus` was called on a selection without ranges.
    #[error("cannot set selection focus if there are no ranges in selection")]
    #[diagnostic(code(weaver_view::selection::set_focus_no_ranges))]
    NoRanges,

    /// The value passed to `Selection::set_to` is not a node, range, position or selection.
    #[error("cannot set selection to the given value")]
    #[diagnostic(code(weaver_view::selection::not_selectable))]
    NotSelectable,

    /// A node was passed to `Selection::set_to` without an offset or place.
    #[error("selection set to a node requires an offset or place")]
    #[diagnostic(code(weaver_view::selection::missing_second_argument))]
    MissingSecondArgument,

    /// An added range intersects a range already stored in the selection.
    #[error("trying to add a range that intersects with another range in the selection")]
    #[diagnostic(code(weaver_view::selection::range_intersects))]
    RangeIntersects,
}
