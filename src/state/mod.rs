//! State management module for Cheatsheet Composer
//!
//! - `column_state`: ordered raw-text columns with memoized previews

mod column_state;

pub use column_state::*;
