//! Attribute and element filtering for the editing pipeline.
//!
//! While editing, script-capable attributes are renamed so the browser does
//! not act on them, and `<script>`/`<style>` become inert spans. The data
//! pipeline renders everything verbatim.

use std::sync::LazyLock;

use regex::Regex;
use weaver_view::Element;

use super::DomConverter;
use crate::config::RenderingMode;
use crate::dom::{DomDocument, DomNodeId};
use crate::html;

/// Prefix given to attributes that must not take effect while editing.
pub const UNSAFE_ATTRIBUTE_NAME_PREFIX: &str = "data-ck-unsafe-attribute-";

/// Attribute recording the original name of a replaced unsafe element.
pub const UNSAFE_ELEMENT_REPLACEMENT_ATTRIBUTE: &str = "data-ck-unsafe-element";

static UNSAFE_SRCDOC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bon\S+\s*=|javascript:|<\s*/*script").unwrap());

static UNSAFE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(javascript:|data:(image/svg|text/x?html))").unwrap());

static ATTRIBUTE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}_:][\p{L}\p{N}_:.\-]*$").unwrap());

/// Whether `name` could be set on a DOM element without an error.
pub fn is_valid_attribute_name(name: &str) -> bool {
    ATTRIBUTE_NAME_RE.is_match(name)
}

impl DomConverter {
    /// Whether an attribute can be rendered as is on an element named
    /// `element_name`. Always true in the data pipeline.
    pub fn should_render_attribute(&self, key: &str, value: &str, element_name: &str) -> bool {
        if self.config.rendering_mode == RenderingMode::Data {
            return true;
        }

        let key = key.to_ascii_lowercase();
        if key.starts_with("on") {
            return false;
        }
        if key == "srcdoc" && UNSAFE_SRCDOC_RE.is_match(value) {
            return false;
        }
        if element_name == "img" && (key == "src" || key == "srcset") {
            return true;
        }
        if element_name == "source" && key == "srcset" {
            return true;
        }
        !UNSAFE_URL_RE.is_match(value)
    }

    /// Set an attribute on a DOM element, renaming it with
    /// [`UNSAFE_ATTRIBUTE_NAME_PREFIX`] when it must not be rendered.
    ///
    /// `related_view_element` may allow specific unsafe attributes.
    pub fn set_dom_element_attribute(
        &self,
        dom: &mut DomDocument,
        dom_element: DomNodeId,
        key: &str,
        value: &str,
        related_view_element: Option<&Element>,
    ) {
        let element_name = dom.local_name(dom_element).unwrap_or_default().to_string();
        let should_render = self.should_render_attribute(key, value, &element_name)
            || related_view_element.is_some_and(|element| element.should_render_unsafe_attribute(key));

        if !should_render {
            tracing::warn!(
                element = %element_name,
                attribute = %key,
                "set_dom_element_attribute: unsafe attribute value will not be rendered"
            );
        }

        if !is_valid_attribute_name(key) {
            tracing::warn!(
                element = %element_name,
                attribute = %key,
                "set_dom_element_attribute: invalid attribute name"
            );
            return;
        }

        let prefixed = format!("{UNSAFE_ATTRIBUTE_NAME_PREFIX}{key}");
        if dom.has_attribute(dom_element, key) && !should_render {
            dom.remove_attribute(dom_element, key);
        } else if dom.has_attribute(dom_element, &prefixed) && should_render {
            dom.remove_attribute(dom_element, &prefixed);
        }

        let name = if should_render { key } else { prefixed.as_str() };
        dom.set_attribute(dom_element, name, value);
    }

    /// Remove an attribute in both its plain and renamed form.
    pub fn remove_dom_element_attribute(&self, dom: &mut DomDocument, dom_element: DomNodeId, key: &str) {
        // The replacement marker is owned by the converter.
        if key == UNSAFE_ELEMENT_REPLACEMENT_ATTRIBUTE {
            return;
        }
        dom.remove_attribute(dom_element, key);
        dom.remove_attribute(dom_element, &format!("{UNSAFE_ATTRIBUTE_NAME_PREFIX}{key}"));
    }

    /// Replace the content of `dom_element` with parsed `html`, filtered the
    /// same way as converted view elements.
    pub fn set_content_of(&self, dom: &mut DomDocument, dom_element: DomNodeId, html: &str) {
        if self.config.rendering_mode == RenderingMode::Data {
            dom.set_inner_html(dom_element, html);
            return;
        }

        let fragment = html::parse_fragment(dom, html);
        let elements: Vec<DomNodeId> = dom
            .descendants(fragment)
            .into_iter()
            .filter(|node| dom.is_element(*node))
            .collect();

        for element in elements {
            for name in dom.attribute_names(element) {
                let value = dom.get_attribute(element, &name).unwrap_or_default().to_string();
                self.set_dom_element_attribute(dom, element, &name, &value, None);
            }

            let name = dom.local_name(element).unwrap_or_default().to_string();
            if self.should_rename_element(&name) {
                tracing::warn!(element = %name, "set_content_of: unsafe element replaced while editing");
                let replacement = self.create_replacement_dom_element(dom, &name, Some(element));
                dom.replace_with(element, replacement);
            }
        }

        dom.remove_children(dom_element);
        dom.append_child(dom_element, fragment);
    }

    pub(crate) fn should_rename_element(&self, name: &str) -> bool {
        self.config.rendering_mode == RenderingMode::Editing && self.config.is_unsafe_element(name)
    }

    /// `<span data-ck-unsafe-element="name">`, taking over the children and
    /// attributes of `original` when given.
    pub(crate) fn create_replacement_dom_element(
        &self,
        dom: &mut DomDocument,
        name: &str,
        original: Option<DomNodeId>,
    ) -> DomNodeId {
        let span = dom.create_element_with_attributes("span", [(UNSAFE_ELEMENT_REPLACEMENT_ATTRIBUTE, name)]);
        if let Some(original) = original {
            for child in dom.children(original).to_vec() {
                dom.append_child(span, child);
            }
            let attributes: Vec<(String, String)> = dom
                .attributes(original)
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            for (key, value) in attributes {
                dom.set_attribute(span, &key, &value);
            }
        }
        span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_names() {
        assert!(is_valid_attribute_name("data-foo"));
        assert!(is_valid_attribute_name("xlink:href"));
        assert!(!is_valid_attribute_name("1abc"));
        assert!(!is_valid_attribute_name("a\"b"));
        assert!(!is_valid_attribute_name(""));
    }

    #[test]
    fn test_should_render_attribute() {
        let converter = DomConverter::default();
        assert!(!converter.should_render_attribute("onClick", "x()", "p"));
        assert!(!converter.should_render_attribute("href", " JavaScript:alert(1)", "a"));
        assert!(!converter.should_render_attribute("src", "data:text/html,<b>", "iframe"));
        assert!(converter.should_render_attribute("src", "data:image/svg+xml,<svg>", "img"));
        assert!(!converter.should_render_attribute("srcdoc", "<script>x</script>", "iframe"));
        assert!(converter.should_render_attribute("href", "https://example.com", "a"));

        let data = DomConverter::new(crate::ConverterConfig::for_mode(RenderingMode::Data));
        assert!(data.should_render_attribute("onclick", "x()", "p"));
    }
}
