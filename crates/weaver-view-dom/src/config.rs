//! Converter configuration.

use std::str::FromStr;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("unknown rendering mode `{0}`")]
    #[diagnostic(
        code(weaver_view_dom::config::rendering_mode),
        help("expected `editing` or `data`")
    )]
    UnknownRenderingMode(String),

    #[error("unknown block filler mode `{0}`")]
    #[diagnostic(
        code(weaver_view_dom::config::block_filler_mode),
        help("expected `br`, `nbsp` or `markedNbsp`")
    )]
    UnknownBlockFillerMode(String),
}

/// Whether the converter renders for live editing or for data output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderingMode {
    #[default]
    Editing,
    Data,
}

impl FromStr for RenderingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "editing" => Ok(Self::Editing),
            "data" => Ok(Self::Data),
            other => Err(ConfigError::UnknownRenderingMode(other.to_string())),
        }
    }
}

/// Shape of the filler placed inside empty blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockFillerMode {
    /// `<br data-cke-filler="true">`
    Br,
    /// A bare `&nbsp;` text node.
    Nbsp,
    /// `<span data-cke-filler="true">&nbsp;</span>`
    MarkedNbsp,
}

impl FromStr for BlockFillerMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "br" => Ok(Self::Br),
            "nbsp" => Ok(Self::Nbsp),
            "markedNbsp" => Ok(Self::MarkedNbsp),
            other => Err(ConfigError::UnknownBlockFillerMode(other.to_string())),
        }
    }
}

/// Configuration for [`DomConverter`](crate::DomConverter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConverterConfig {
    pub rendering_mode: RenderingMode,
    /// Explicit filler mode; when unset, `br` while editing and `nbsp` for data.
    pub block_filler_mode: Option<BlockFillerMode>,
    /// Elements that end inline runs for whitespace handling and host block fillers.
    pub block_elements: Vec<String>,
    /// Elements treated like a character of text by whitespace handling.
    pub inline_object_elements: Vec<String>,
    /// Elements whose text is never collapsed or padded.
    pub preformatted_elements: Vec<String>,
    /// Elements replaced with a neutral `<span>` in editing mode.
    pub unsafe_elements: Vec<String>,
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            rendering_mode: RenderingMode::Editing,
            block_filler_mode: None,
            block_elements: strings(&[
                "address", "article", "aside", "blockquote", "caption", "center", "dd",
                "details", "dir", "div", "dl", "dt", "fieldset", "figcaption", "figure",
                "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup",
                "legend", "li", "main", "menu", "nav", "ol", "p", "pre", "section",
                "summary", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
            ]),
            inline_object_elements: strings(&[
                "object", "iframe", "input", "button", "textarea", "select", "option",
                "video", "embed", "audio", "img", "canvas",
            ]),
            preformatted_elements: strings(&["pre", "textarea"]),
            unsafe_elements: strings(&["script", "style"]),
        }
    }
}

impl ConverterConfig {
    /// Default configuration for the given rendering mode.
    pub fn for_mode(rendering_mode: RenderingMode) -> Self {
        Self {
            rendering_mode,
            ..Self::default()
        }
    }

    /// The configured filler mode, or the default for the rendering mode.
    pub fn block_filler_mode(&self) -> BlockFillerMode {
        self.block_filler_mode.unwrap_or(match self.rendering_mode {
            RenderingMode::Editing => BlockFillerMode::Br,
            RenderingMode::Data => BlockFillerMode::Nbsp,
        })
    }

    pub fn is_block_element(&self, name: &str) -> bool {
        self.block_elements.iter().any(|block| block == name)
    }

    pub fn is_inline_object_element(&self, name: &str) -> bool {
        self.inline_object_elements.iter().any(|inline| inline == name)
    }

    pub fn is_preformatted_element(&self, name: &str) -> bool {
        self.preformatted_elements.iter().any(|pre| pre == name)
    }

    pub fn is_unsafe_element(&self, name: &str) -> bool {
        self.unsafe_elements.iter().any(|unsafe_name| unsafe_name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filler_mode_follows_rendering_mode() {
        assert_eq!(
            ConverterConfig::default().block_filler_mode(),
            BlockFillerMode::Br
        );
        assert_eq!(
            ConverterConfig::for_mode(RenderingMode::Data).block_filler_mode(),
            BlockFillerMode::Nbsp
        );
        let explicit = ConverterConfig {
            block_filler_mode: Some(BlockFillerMode::MarkedNbsp),
            ..ConverterConfig::for_mode(RenderingMode::Data)
        };
        assert_eq!(explicit.block_filler_mode(), BlockFillerMode::MarkedNbsp);
    }

    #[test]
    fn test_modes_from_str() {
        assert_eq!("data".parse::<RenderingMode>(), Ok(RenderingMode::Data));
        assert_eq!(
            "markedNbsp".parse::<BlockFillerMode>(),
            Ok(BlockFillerMode::MarkedNbsp)
        );
        assert_eq!(
            "loud".parse::<RenderingMode>(),
            Err(ConfigError::UnknownRenderingMode("loud".to_string()))
        );
    }
}
