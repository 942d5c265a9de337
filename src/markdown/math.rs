//! Math typesetting
//!
//! Inline (`$...$`) and display (`$$...$$`) math spans are handed to a
//! [`MathEngine`]. The engine is a pure function from TeX source to a markup
//! fragment; the exported document links the engine's stylesheet.

use crate::utils::html;

/// Whether a math span sits inside a line or on its own block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathDisplay {
    Inline,
    Block,
}

/// Markup produced by a math engine, inserted verbatim into the output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathMarkup(String);

impl MathMarkup {
    /// Wrap markup that is already safe to emit
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Turns TeX source into a typeset markup fragment
pub trait MathEngine: Send + Sync {
    /// Typeset one span. Must not fail: unsupported input is rendered as
    /// escaped source text.
    fn typeset(&self, tex: &str, display: MathDisplay) -> MathMarkup;
}

/// Default engine: emits the TeX source, escaped, inside the same
/// `math-inline` / `math-display` wrappers a browser-side typesetter
/// picks up.
#[derive(Debug, Clone, Copy, Default)]
pub struct TexMarkup;

impl MathEngine for TexMarkup {
    fn typeset(&self, tex: &str, display: MathDisplay) -> MathMarkup {
        let escaped = html::escape(tex.trim());
        match display {
            MathDisplay::Inline => MathMarkup::new(format!(
                "<span class=\"math math-inline\">\\({}\\)</span>",
                escaped
            )),
            MathDisplay::Block => MathMarkup::new(format!(
                "<div class=\"math math-display\">\\[{}\\]</div>",
                escaped
            )),
        }
    }
}
