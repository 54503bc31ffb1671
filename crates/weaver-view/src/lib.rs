//! weaver-view: the editor's view tree and the machinery to address it.
//!
//! This crate provides:
//! - `ViewTree` - arena of elements, text nodes and document fragments
//! - `Position` / `Range` - totally ordered addresses and spans
//! - `TreeWalker` - resumable forward/backward cursor over a tree region
//! - `Selection` - non-intersecting ranges with direction and fake mode
//! - `Matcher` - element patterns, `markup` - test/debug text form

pub mod error;
pub mod markup;
pub mod matcher;
pub mod node;
pub mod position;
pub mod range;
pub mod selection;
pub mod tree_walker;

pub use error::ViewError;
pub use matcher::{Matcher, MatcherPattern, Pattern, PatternValue};
pub use node::{
    Element, ElementKind, Item, ItemKind, NodeData, NodeId, TextProxy, ViewTree, char_len,
    char_slice,
};
pub use position::{Place, Position, PositionRelation};
pub use range::Range;
pub use selection::{Selectable, Selection, SelectionOptions, SelectionPlace};
pub use smol_str::SmolStr;
pub use tree_walker::{Direction, TreeWalker, WalkerOptions, WalkerValue, WalkerValueType};
