//! Style map for rendered Markdown
//!
//! Maps every structural node kind the renderer can produce to exactly one
//! presentation class. The table is built once and shared read-only by the
//! live preview and the export document, so both show the same styling.

use std::fmt;

/// Number of node kinds in the closed set
pub const KIND_COUNT: usize = 25;

/// Closed set of structural node kinds the renderer emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    Heading5,
    Heading6,
    Paragraph,
    UnorderedList,
    OrderedList,
    ListItem,
    Blockquote,
    Table,
    TableHead,
    TableBody,
    TableRow,
    TableHeaderCell,
    TableCell,
    Preformatted,
    InlineCode,
    Strikethrough,
    Emphasis,
    Strong,
    Rule,
    Link,
    Image,
}

impl NodeKind {
    /// Every kind, in declaration order
    pub const ALL: [NodeKind; KIND_COUNT] = [
        NodeKind::Heading1,
        NodeKind::Heading2,
        NodeKind::Heading3,
        NodeKind::Heading4,
        NodeKind::Heading5,
        NodeKind::Heading6,
        NodeKind::Paragraph,
        NodeKind::UnorderedList,
        NodeKind::OrderedList,
        NodeKind::ListItem,
        NodeKind::Blockquote,
        NodeKind::Table,
        NodeKind::TableHead,
        NodeKind::TableBody,
        NodeKind::TableRow,
        NodeKind::TableHeaderCell,
        NodeKind::TableCell,
        NodeKind::Preformatted,
        NodeKind::InlineCode,
        NodeKind::Strikethrough,
        NodeKind::Emphasis,
        NodeKind::Strong,
        NodeKind::Rule,
        NodeKind::Link,
        NodeKind::Image,
    ];

    /// Heading kind for a level in 1..=6; out-of-range levels clamp
    pub fn heading(level: u8) -> Self {
        match level {
            0 | 1 => NodeKind::Heading1,
            2 => NodeKind::Heading2,
            3 => NodeKind::Heading3,
            4 => NodeKind::Heading4,
            5 => NodeKind::Heading5,
            _ => NodeKind::Heading6,
        }
    }

    /// HTML element name used when the node is serialized
    pub fn tag_name(&self) -> &'static str {
        match self {
            NodeKind::Heading1 => "h1",
            NodeKind::Heading2 => "h2",
            NodeKind::Heading3 => "h3",
            NodeKind::Heading4 => "h4",
            NodeKind::Heading5 => "h5",
            NodeKind::Heading6 => "h6",
            NodeKind::Paragraph => "p",
            NodeKind::UnorderedList => "ul",
            NodeKind::OrderedList => "ol",
            NodeKind::ListItem => "li",
            NodeKind::Blockquote => "blockquote",
            NodeKind::Table => "table",
            NodeKind::TableHead => "thead",
            NodeKind::TableBody => "tbody",
            NodeKind::TableRow => "tr",
            NodeKind::TableHeaderCell => "th",
            NodeKind::TableCell => "td",
            NodeKind::Preformatted => "pre",
            NodeKind::InlineCode => "code",
            NodeKind::Strikethrough => "del",
            NodeKind::Emphasis => "em",
            NodeKind::Strong => "strong",
            NodeKind::Rule => "hr",
            NodeKind::Link => "a",
            NodeKind::Image => "img",
        }
    }

    /// Void elements have no children and no closing tag
    pub fn is_void(&self) -> bool {
        matches!(self, NodeKind::Rule | NodeKind::Image)
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}

/// Immutable node-kind → presentation-class table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleMap {
    classes: [&'static str; KIND_COUNT],
}

impl StyleMap {
    /// The fixed cheat-sheet style table
    pub fn new() -> Self {
        let mut classes = [""; KIND_COUNT];
        for kind in NodeKind::ALL {
            classes[kind.slot()] = default_class(kind);
        }
        Self { classes }
    }

    /// Presentation class for a node kind
    pub fn class_for(&self, kind: NodeKind) -> &'static str {
        self.classes[kind.slot()]
    }

    /// All (kind, class) pairs in declaration order
    pub fn entries(&self) -> impl Iterator<Item = (NodeKind, &'static str)> + '_ {
        NodeKind::ALL.iter().map(move |kind| (*kind, self.class_for(*kind)))
    }
}

impl Default for StyleMap {
    fn default() -> Self {
        Self::new()
    }
}

fn default_class(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Heading1 => "text-2xl",
        NodeKind::Heading2 => "text-xl",
        NodeKind::Heading3 => "text-lg",
        NodeKind::Heading4 => "text-base",
        NodeKind::Heading5 => "text-sm",
        NodeKind::Heading6 => "text-xs",
        NodeKind::Paragraph => "text-base",
        NodeKind::UnorderedList => "list-disc",
        NodeKind::OrderedList => "list-decimal",
        NodeKind::ListItem => "text-base",
        NodeKind::Blockquote => "border-l-4 border-gray-300 pl-4",
        NodeKind::Table => "table-auto border-collapse border border-gray-300",
        NodeKind::TableHead
        | NodeKind::TableBody
        | NodeKind::TableRow
        | NodeKind::TableHeaderCell
        | NodeKind::TableCell => "border border-gray-300",
        NodeKind::Preformatted => "bg-gray-100 p-2",
        NodeKind::InlineCode => "rounded-md bg-gray-100 p-0.5",
        NodeKind::Strikethrough => "line-through",
        NodeKind::Emphasis => "italic",
        NodeKind::Strong => "font-bold",
        NodeKind::Rule => "border-gray-300",
        NodeKind::Link => "text-blue-600",
        NodeKind::Image => "max-w-full",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_kind_has_a_class() {
        let map = StyleMap::new();
        for kind in NodeKind::ALL {
            assert!(!map.class_for(kind).is_empty(), "{kind} has no class");
        }
    }

    #[test]
    fn test_all_kinds_are_distinct() {
        let unique: HashSet<_> = NodeKind::ALL.iter().collect();
        assert_eq!(unique.len(), NodeKind::ALL.len());
        for (i, kind) in NodeKind::ALL.iter().enumerate() {
            assert_eq!(kind.slot(), i);
        }
    }

    #[test]
    fn test_heading_levels() {
        let map = StyleMap::new();
        assert_eq!(map.class_for(NodeKind::heading(1)), "text-2xl");
        assert_eq!(map.class_for(NodeKind::heading(6)), "text-xs");
        assert_eq!(NodeKind::heading(9), NodeKind::Heading6);
    }

    #[test]
    fn test_entries_cover_all_kinds() {
        let map = StyleMap::default();
        assert_eq!(map.entries().count(), NodeKind::ALL.len());
        assert_eq!(map, StyleMap::new());
    }
}
