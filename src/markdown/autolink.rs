//! Extended autolinks
//!
//! CommonMark only links `<https://...>`. The cheat-sheet grammar also links
//! bare `https://...`, `www....` and e-mail addresses found in plain text.

use regex::Regex;
use std::sync::OnceLock;

static AUTOLINK_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn pattern() -> Option<&'static Regex> {
    AUTOLINK_PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)\b(?:https?://|www\.)[^\s<]+|\b[a-z0-9._+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)+\b",
            )
            .ok()
        })
        .as_ref()
}

/// A piece of plain text after autolink detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Link { href: String, text: &'a str },
}

/// Split text into plain runs and detected links
pub fn split(text: &str) -> Vec<Segment<'_>> {
    let Some(re) = pattern() else {
        return vec![Segment::Text(text)];
    };

    let mut segments = Vec::new();
    let mut last = 0;
    for m in re.find_iter(text) {
        let raw = m.as_str();
        let linked = trim_trailing(raw);
        if linked.is_empty() || linked.eq_ignore_ascii_case("www.") {
            continue;
        }
        if m.start() > last {
            segments.push(Segment::Text(&text[last..m.start()]));
        }
        segments.push(Segment::Link {
            href: href_for(linked),
            text: linked,
        });
        last = m.start() + linked.len();
    }
    if last < text.len() {
        segments.push(Segment::Text(&text[last..]));
    }
    segments
}

fn href_for(linked: &str) -> String {
    let lower = linked.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        linked.to_string()
    } else if lower.starts_with("www.") {
        format!("http://{}", linked)
    } else {
        format!("mailto:{}", linked)
    }
}

/// Drop trailing punctuation and unbalanced closing parentheses
fn trim_trailing(candidate: &str) -> &str {
    let mut end = candidate.len();
    loop {
        let current = &candidate[..end];
        let Some(last) = current.chars().last() else {
            return current;
        };
        let drop = match last {
            '?' | '!' | '.' | ',' | ':' | ';' | '*' | '_' | '~' | '"' | '\'' => true,
            ')' => current.matches(')').count() > current.matches('(').count(),
            _ => false,
        };
        if !drop {
            return current;
        }
        end -= last.len_utf8();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(split("no links here"), vec![Segment::Text("no links here")]);
    }

    #[test]
    fn test_bare_url() {
        let segments = split("see https://example.com/a.");
        assert_eq!(
            segments,
            vec![
                Segment::Text("see "),
                Segment::Link {
                    href: "https://example.com/a".to_string(),
                    text: "https://example.com/a",
                },
                Segment::Text("."),
            ]
        );
    }

    #[test]
    fn test_www_and_email() {
        let segments = split("www.rust-lang.org or me@example.org");
        assert!(matches!(
            &segments[0],
            Segment::Link { href, .. } if href == "http://www.rust-lang.org"
        ));
        assert!(matches!(
            segments.last(),
            Some(Segment::Link { href, .. }) if href == "mailto:me@example.org"
        ));
    }

    #[test]
    fn test_balanced_parentheses_kept() {
        let segments = split("(https://en.wikipedia.org/wiki/Rust_(language))");
        assert!(segments.iter().any(|s| matches!(
            s,
            Segment::Link { text, .. } if *text == "https://en.wikipedia.org/wiki/Rust_(language)"
        )));
    }
}
