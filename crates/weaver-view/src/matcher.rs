//! Element patterns used to classify view elements (raw content, inline objects).

use std::fmt;
use std::rc::Rc;

use regex::Regex;
use smol_str::SmolStr;

use crate::node::{Element, NodeId, ViewTree};

/// How a single name or value is matched.
#[derive(Clone, Debug)]
pub enum PatternValue {
    /// Anything, as long as it is present.
    Any,
    Exact(SmolStr),
    Regex(Regex),
}

impl PatternValue {
    pub fn is_match(&self, value: &str) -> bool {
        match self {
            PatternValue::Any => true,
            PatternValue::Exact(expected) => expected == value,
            PatternValue::Regex(regex) => regex.is_match(value),
        }
    }
}

impl From<&str> for PatternValue {
    fn from(value: &str) -> Self {
        PatternValue::Exact(value.into())
    }
}

impl From<Regex> for PatternValue {
    fn from(regex: Regex) -> Self {
        PatternValue::Regex(regex)
    }
}

/// Structured description of the elements to match. Every given part must match.
#[derive(Clone, Debug, Default)]
pub struct MatcherPattern {
    pub name: Option<PatternValue>,
    pub attributes: Vec<(SmolStr, PatternValue)>,
    pub classes: Vec<PatternValue>,
    pub styles: Vec<(SmolStr, PatternValue)>,
}

impl MatcherPattern {
    pub fn name(name: impl Into<PatternValue>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<SmolStr>, value: impl Into<PatternValue>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_class(mut self, class: impl Into<PatternValue>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_style(mut self, property: impl Into<SmolStr>, value: impl Into<PatternValue>) -> Self {
        self.styles.push((property.into(), value.into()));
        self
    }

    fn matches(&self, element: &Element) -> bool {
        if let Some(name) = &self.name
            && !name.is_match(element.name())
        {
            return false;
        }

        let attributes_match = self.attributes.iter().all(|(key, pattern)| {
            element
                .attribute(key)
                .is_some_and(|value| pattern.is_match(value))
        });
        let classes_match = self
            .classes
            .iter()
            .all(|pattern| element.classes().any(|class| pattern.is_match(class)));
        let styles = element.styles();
        let styles_match = self.styles.iter().all(|(property, pattern)| {
            styles
                .iter()
                .any(|(p, value)| *p == property.as_str() && pattern.is_match(value))
        });

        attributes_match && classes_match && styles_match
    }
}

pub type MatchCallback = Rc<dyn Fn(&ViewTree, NodeId) -> bool>;

#[derive(Clone)]
pub enum Pattern {
    Structured(MatcherPattern),
    Callback(MatchCallback),
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Structured(pattern) => f.debug_tuple("Structured").field(pattern).finish(),
            Pattern::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl From<MatcherPattern> for Pattern {
    fn from(pattern: MatcherPattern) -> Self {
        Pattern::Structured(pattern)
    }
}

/// A set of patterns; an element matches when any of them does.
#[derive(Clone, Debug, Default)]
pub struct Matcher {
    patterns: Vec<Pattern>,
}

impl Matcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pattern: impl Into<Pattern>) {
        self.patterns.push(pattern.into());
    }

    pub fn add_callback(&mut self, callback: impl Fn(&ViewTree, NodeId) -> bool + 'static) {
        self.patterns.push(Pattern::Callback(Rc::new(callback)));
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True if `node` is an element matched by at least one pattern.
    pub fn matches(&self, tree: &ViewTree, node: NodeId) -> bool {
        let Some(element) = tree.element(node) else {
            return false;
        };
        self.patterns.iter().any(|pattern| match pattern {
            Pattern::Structured(structured) => structured.matches(element),
            Pattern::Callback(callback) => callback(tree, node),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ElementKind;

    #[test]
    fn test_structured_patterns() {
        let mut tree = ViewTree::new();
        let div = tree.create_element_with_attributes(
            ElementKind::Generic,
            "div",
            [("class", "raw-html embed"), ("data-id", "42"), ("style", "color: red")],
        );
        let span = tree.create_element(ElementKind::Generic, "span");

        let mut matcher = Matcher::new();
        assert!(!matcher.matches(&tree, div));

        matcher.add(MatcherPattern::name("div").with_class("embed"));
        assert!(matcher.matches(&tree, div));
        assert!(!matcher.matches(&tree, span));

        let mut by_attribute = Matcher::new();
        by_attribute.add(
            MatcherPattern::default()
                .with_attribute("data-id", Regex::new(r"^\d+$").unwrap())
                .with_style("color", "red"),
        );
        assert!(by_attribute.matches(&tree, div));

        let mut missing = Matcher::new();
        missing.add(MatcherPattern::default().with_attribute("data-missing", PatternValue::Any));
        assert!(!missing.matches(&tree, div));
    }

    #[test]
    fn test_callback_pattern_and_text_nodes() {
        let mut tree = ViewTree::new();
        let text = tree.create_text("x");
        let video = tree.create_element(ElementKind::Generic, "video");

        let mut matcher = Matcher::new();
        matcher.add_callback(|tree, node| tree.name(node).is_some_and(|n| n.starts_with('v')));
        assert!(matcher.matches(&tree, video));
        assert!(!matcher.matches(&tree, text));
    }
}
