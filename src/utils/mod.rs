//! Utilities module for Cheatsheet Composer
//!
//! Shared helper functions:
//! - HTML escaping and URL sanitizing for rendered markup
//! - Path utilities for loading column sources

/// HTML utilities
pub mod html {
    /// URL schemes that may appear in rendered `href`/`src` attributes
    const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

    /// Escape text for use inside element content or a quoted attribute
    pub fn escape(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#39;"),
                _ => out.push(c),
            }
        }
        out
    }

    /// Keep relative references and safe schemes; anything else
    /// (`javascript:`, `data:`, `vbscript:` ...) becomes an empty URL.
    pub fn sanitize_url(url: &str) -> String {
        let trimmed = url.trim();
        let scheme_end = trimmed.find(':');
        let first_delim = trimmed.find(['/', '?', '#']);

        match (scheme_end, first_delim) {
            // "a/b:c" or "#x:y": colon after a path delimiter is not a scheme
            (Some(colon), Some(delim)) if delim < colon => trimmed.to_string(),
            (Some(colon), _) => {
                let scheme = trimmed[..colon].to_ascii_lowercase();
                if SAFE_SCHEMES.contains(&scheme.as_str()) {
                    trimmed.to_string()
                } else {
                    String::new()
                }
            }
            (None, _) => trimmed.to_string(),
        }
    }
}

/// Path utilities
pub mod path {
    use std::path::Path;

    /// Check if path has a markdown extension
    pub fn is_markdown(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("md" | "markdown" | "mdown" | "mkd")
        )
    }

    /// Get the file name without extension
    pub fn file_stem(path: &Path) -> Option<String> {
        path.file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string())
    }
}
