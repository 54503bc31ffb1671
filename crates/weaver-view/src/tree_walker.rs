//! Resumable cursor over a region of the view tree.
//!
//! The walker yields one [`WalkerValue`] per step: entering an element,
//! leaving it, or passing over (part of) a text node. Forward and backward
//! walking are separate routines that mirror each other step for step.

use std::str::FromStr;

use crate::error::ViewError;
use crate::node::{char_len, Item, NodeId, TextProxy, ViewTree};
use crate::position::Position;
use crate::range::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl FromStr for Direction {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(Direction::Forward),
            "backward" => Ok(Direction::Backward),
            other => Err(ViewError::UnknownDirection(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkerValueType {
    ElementStart,
    ElementEnd,
    Text,
}

/// A single step of a [`TreeWalker`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WalkerValue {
    pub kind: WalkerValueType,
    pub item: Item,
    /// Position before the step (in walking direction).
    pub previous_position: Position,
    /// Position after the step (in walking direction).
    pub next_position: Position,
    /// Characters for text, 1 for element starts, `None` for element ends.
    pub length: Option<usize>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalkerOptions {
    pub boundaries: Option<Range>,
    pub start_position: Option<Position>,
    pub direction: Direction,
    pub single_characters: bool,
    pub shallow: bool,
    pub ignore_element_end: bool,
}

impl WalkerOptions {
    pub fn backward() -> Self {
        Self {
            direction: Direction::Backward,
            ..Default::default()
        }
    }

    pub fn with_boundaries(mut self, boundaries: Range) -> Self {
        self.boundaries = Some(boundaries);
        self
    }
}

pub struct TreeWalker<'t> {
    tree: &'t ViewTree,
    direction: Direction,
    boundaries: Option<Range>,
    position: Position,
    single_characters: bool,
    shallow: bool,
    ignore_element_end: bool,
    boundary_start_parent: Option<NodeId>,
    boundary_end_parent: Option<NodeId>,
}

impl<'t> TreeWalker<'t> {
    /// Create a walker. Without a start position it starts at the boundary
    /// edge matching its direction.
    pub fn new(tree: &'t ViewTree, options: WalkerOptions) -> Result<Self, ViewError> {
        let position = match (options.start_position, options.boundaries) {
            (Some(position), _) => position,
            (None, Some(boundaries)) => match options.direction {
                Direction::Forward => boundaries.start(),
                Direction::Backward => boundaries.end(),
            },
            (None, None) => return Err(ViewError::NoStartPosition),
        };
        Ok(Self::starting_at(tree, position, options))
    }

    pub(crate) fn starting_at(tree: &'t ViewTree, position: Position, options: WalkerOptions) -> Self {
        Self {
            tree,
            direction: options.direction,
            boundaries: options.boundaries,
            position,
            single_characters: options.single_characters,
            shallow: options.shallow,
            ignore_element_end: options.ignore_element_end,
            boundary_start_parent: options.boundaries.map(|b| b.start().parent()),
            boundary_end_parent: options.boundaries.map(|b| b.end().parent()),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn boundaries(&self) -> Option<Range> {
        self.boundaries
    }

    /// Move the walker to `position` without yielding anything.
    pub fn jump_to(&mut self, position: Position) {
        self.position = position;
    }

    /// Step while `predicate` accepts values. The first rejected step is
    /// undone, so the walker rests just before it.
    pub fn skip_matching(&mut self, mut predicate: impl FnMut(&WalkerValue) -> bool) {
        loop {
            let previous = self.position;
            match self.next() {
                None => return,
                Some(value) if predicate(&value) => {}
                Some(_) => {
                    self.position = previous;
                    return;
                }
            }
        }
    }

    fn at_boundary_end(&self, position: Position) -> bool {
        self.boundaries.is_some_and(|b| b.end() == position)
    }

    fn at_boundary_start(&self, position: Position) -> bool {
        self.boundaries.is_some_and(|b| b.start() == position)
    }

    fn step_forward(&mut self) -> Option<WalkerValue> {
        let tree = self.tree;
        loop {
            let previous_position = self.position;
            let parent = self.position.parent();
            let offset = self.position.offset();

            // End of the root.
            if tree.parent(parent).is_none() && offset == tree.max_offset(parent) {
                return None;
            }
            if let Some(boundaries) = self.boundaries
                && Some(parent) == self.boundary_end_parent
                && offset == boundaries.end().offset()
            {
                return None;
            }

            if let Some(data) = tree.text_data(parent) {
                let data_length = char_len(data);
                if offset >= data_length {
                    self.position = Position::after_node(tree, parent)?;
                    continue;
                }
                let text_length = if self.single_characters {
                    1
                } else {
                    let end_offset = match self.boundaries {
                        Some(b) if Some(parent) == self.boundary_end_parent => b.end().offset(),
                        _ => data_length,
                    };
                    end_offset.saturating_sub(offset)
                };
                let proxy = TextProxy::new(parent, offset, text_length);
                self.position = Position::new(parent, offset + text_length);
                return Some(self.format_return_value(
                    WalkerValueType::Text,
                    proxy.into(),
                    previous_position,
                    self.position,
                    Some(text_length),
                ));
            }

            match tree.child(parent, offset) {
                Some(node) if !tree.is_text(node) => {
                    if !self.shallow {
                        self.position = Position::new(node, 0);
                    } else {
                        if let Some(boundaries) = self.boundaries
                            && boundaries.end().is_before(tree, &self.position)
                        {
                            return None;
                        }
                        self.position = Position::new(parent, offset + 1);
                    }
                    return Some(self.format_return_value(
                        WalkerValueType::ElementStart,
                        Item::Node(node),
                        previous_position,
                        self.position,
                        Some(1),
                    ));
                }
                Some(text) => {
                    if self.single_characters {
                        self.position = Position::new(text, 0);
                        continue;
                    }
                    let data_length = tree.max_offset(text);
                    let (item, length) = match self.boundaries {
                        Some(b) if Some(text) == self.boundary_end_parent => {
                            let length = b.end().offset();
                            self.position = Position::new(text, length);
                            (Item::TextProxy(TextProxy::new(text, 0, length)), length)
                        }
                        _ => {
                            self.position = Position::new(parent, offset + 1);
                            (Item::Node(text), data_length)
                        }
                    };
                    return Some(self.format_return_value(
                        WalkerValueType::Text,
                        item,
                        previous_position,
                        self.position,
                        Some(length),
                    ));
                }
                None => {
                    // End of the current parent: step out of it.
                    self.position = Position::after_node(tree, parent)?;
                    if self.ignore_element_end {
                        continue;
                    }
                    return Some(self.format_return_value(
                        WalkerValueType::ElementEnd,
                        Item::Node(parent),
                        previous_position,
                        self.position,
                        None,
                    ));
                }
            }
        }
    }

    fn step_backward(&mut self) -> Option<WalkerValue> {
        let tree = self.tree;
        loop {
            let previous_position = self.position;
            let parent = self.position.parent();
            let offset = self.position.offset();

            // Start of the root.
            if tree.parent(parent).is_none() && offset == 0 {
                return None;
            }
            if let Some(boundaries) = self.boundaries
                && Some(parent) == self.boundary_start_parent
                && offset == boundaries.start().offset()
            {
                return None;
            }

            if tree.is_text(parent) {
                if offset == 0 {
                    self.position = Position::before_node(tree, parent)?;
                    continue;
                }
                let text_length = if self.single_characters {
                    1
                } else {
                    let start_offset = match self.boundaries {
                        Some(b) if Some(parent) == self.boundary_start_parent => {
                            b.start().offset()
                        }
                        _ => 0,
                    };
                    offset.saturating_sub(start_offset)
                };
                let new_offset = offset - text_length;
                let proxy = TextProxy::new(parent, new_offset, text_length);
                self.position = Position::new(parent, new_offset);
                return Some(self.format_return_value(
                    WalkerValueType::Text,
                    proxy.into(),
                    previous_position,
                    self.position,
                    Some(text_length),
                ));
            }

            let node_before = offset.checked_sub(1).and_then(|i| tree.child(parent, i));
            match node_before {
                Some(node) if !tree.is_text(node) => {
                    if !self.shallow {
                        self.position = Position::new(node, tree.child_count(node));
                        if self.ignore_element_end {
                            continue;
                        }
                        return Some(self.format_return_value(
                            WalkerValueType::ElementEnd,
                            Item::Node(node),
                            previous_position,
                            self.position,
                            None,
                        ));
                    }
                    self.position = Position::new(parent, offset - 1);
                    return Some(self.format_return_value(
                        WalkerValueType::ElementStart,
                        Item::Node(node),
                        previous_position,
                        self.position,
                        Some(1),
                    ));
                }
                Some(text) => {
                    let data_length = tree.max_offset(text);
                    if self.single_characters {
                        self.position = Position::new(text, data_length);
                        continue;
                    }
                    let (item, length) = match self.boundaries {
                        Some(b) if Some(text) == self.boundary_start_parent => {
                            let start = b.start().offset();
                            let length = data_length.saturating_sub(start);
                            self.position = Position::new(text, start);
                            (Item::TextProxy(TextProxy::new(text, start, length)), length)
                        }
                        _ => {
                            self.position = Position::new(parent, offset - 1);
                            (Item::Node(text), data_length)
                        }
                    };
                    return Some(self.format_return_value(
                        WalkerValueType::Text,
                        item,
                        previous_position,
                        self.position,
                        Some(length),
                    ));
                }
                None => {
                    // Start of the current parent: step out of it.
                    self.position = Position::before_node(tree, parent)?;
                    return Some(self.format_return_value(
                        WalkerValueType::ElementStart,
                        Item::Node(parent),
                        previous_position,
                        self.position,
                        Some(1),
                    ));
                }
            }
        }
    }

    /// Move positions that sit on the edge of a text node to just outside it.
    ///
    /// Only the side of the proxy that touches the text edge is normalized,
    /// and the walker's own position is left alone when it rests on the
    /// boundary so the stop check still fires.
    fn format_return_value(
        &mut self,
        kind: WalkerValueType,
        item: Item,
        mut previous_position: Position,
        mut next_position: Position,
        length: Option<usize>,
    ) -> WalkerValue {
        if let Item::TextProxy(proxy) = item {
            let tree = self.tree;
            let text = proxy.text;

            if proxy.offset_in_text + proxy.length == tree.max_offset(text)
                && let Some(after) = Position::after_node(tree, text)
            {
                match self.direction {
                    Direction::Forward => {
                        if !self.at_boundary_end(self.position) {
                            next_position = after;
                            self.position = after;
                        }
                    }
                    Direction::Backward => previous_position = after,
                }
            }

            if proxy.offset_in_text == 0
                && let Some(before) = Position::before_node(tree, text)
            {
                match self.direction {
                    Direction::Backward => {
                        if !self.at_boundary_start(self.position) {
                            next_position = before;
                            self.position = before;
                        }
                    }
                    Direction::Forward => previous_position = before,
                }
            }
        }

        WalkerValue {
            kind,
            item,
            previous_position,
            next_position,
            length,
        }
    }
}

impl Iterator for TreeWalker<'_> {
    type Item = WalkerValue;

    fn next(&mut self) -> Option<WalkerValue> {
        match self.direction {
            Direction::Forward => self.step_forward(),
            Direction::Backward => self.step_backward(),
        }
    }
}
