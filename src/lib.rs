//! Cheatsheet Composer
//!
//! Multi-column Markdown note composer with live preview and print export.

pub mod app;
pub mod config;
pub mod error;
pub mod markdown;
pub mod message;
pub mod state;
pub mod surface;
pub mod utils;
