//! weaver-view-dom: rendering the view tree and reading it back.
//!
//! This crate provides:
//! - `DomDocument` - arena modelled on the browser DOM, with ranges and selections
//! - `html` - fragment parsing for `innerHTML`-style content
//! - `filler` - block and inline fillers
//! - `DomConverter` - view/DOM conversion, identity bindings, whitespace
//!   handling, attribute safety and position/selection translation
//! - `ConverterConfig` - rendering and filler modes plus element lists

pub mod config;
pub mod converter;
pub mod dom;
pub mod filler;
pub mod html;

pub use config::{BlockFillerMode, ConfigError, ConverterConfig, RenderingMode};
pub use converter::{
    COMMENT_ELEMENT_NAME, DomConverter, DomToViewOptions, RAW_CONTENT_PROPERTY, RawRenderer,
    TRANSPARENT_RENDERING_PROPERTY, UNSAFE_ATTRIBUTE_NAME_PREFIX,
    UNSAFE_ELEMENT_REPLACEMENT_ATTRIBUTE, UiRenderer, ViewToDomOptions,
};
pub use dom::{DomDocument, DomNodeData, DomNodeId, DomPoint, DomRange, DomSelection};

// Re-export the view crate for convenience
pub use weaver_view;
