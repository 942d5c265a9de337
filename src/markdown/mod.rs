//! Markdown module for Cheatsheet Composer
//!
//! Turns column text into styled content:
//! - Style map shared by preview and export
//! - Render pipeline (tables, strikethrough, autolinks, math)
//! - Print export of the whole column layout

pub mod autolink;
pub mod export;
pub mod math;
pub mod render;
pub mod style;

pub use export::{ExportDocument, ExportHandle, ExportSerializer};
pub use math::{MathDisplay, MathEngine, MathMarkup, TexMarkup};
pub use render::{Content, Element, Fragment, Node, RenderMode, RenderPipeline};
pub use style::{NodeKind, StyleMap};
