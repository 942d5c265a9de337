//! Markdown render pipeline
//!
//! Parses one column's raw text with pulldown-cmark and builds a styled node
//! tree, attaching the [`StyleMap`] class to every structural node. The same
//! tree feeds both output modes: the live preview mounts the tree, the export
//! serializes it to standalone markup. Parsing never fails; spans the grammar
//! cannot make sense of come through as literal text.

use std::sync::Arc;

use pulldown_cmark::{
    Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TextMergeStream,
};

use super::autolink::{self, Segment};
use super::math::{MathDisplay, MathEngine, MathMarkup, TexMarkup};
use super::style::{NodeKind, StyleMap};
use crate::utils::html;

/// Output form requested from the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Node tree for the interactive preview
    LiveFragment,
    /// Self-contained markup string for the export document
    StaticMarkup,
}

/// Rendered content in the requested mode
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Fragment(Fragment),
    Markup(String),
}

impl Content {
    /// Markup form, serializing a fragment if needed
    pub fn into_markup(self) -> String {
        match self {
            Content::Fragment(fragment) => fragment.to_markup(),
            Content::Markup(markup) => markup,
        }
    }
}

/// A rendered node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Math {
        display: MathDisplay,
        tex: String,
        markup: MathMarkup,
    },
    LineBreak,
    /// Task-list marker
    Checkbox { checked: bool },
}

/// A styled structural node
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub kind: NodeKind,
    /// Class taken from the style map
    pub class: &'static str,
    /// Classes that depend on the content, e.g. a code block's language
    pub extra_classes: Vec<String>,
    pub attrs: Vec<(&'static str, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn new(kind: NodeKind, styles: &StyleMap) -> Self {
        Self {
            kind,
            class: styles.class_for(kind),
            extra_classes: Vec::new(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    fn with_attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Value of an attribute, if set
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Concatenated text of all descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        let tag = self.kind.tag_name();
        out.push('<');
        out.push_str(tag);
        out.push_str(" class=\"");
        out.push_str(self.class);
        for extra in &self.extra_classes {
            out.push(' ');
            out.push_str(&html::escape(extra));
        }
        out.push('"');
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&html::escape(value));
            out.push('"');
        }
        out.push('>');
        if self.kind.is_void() {
            return;
        }
        for child in &self.children {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
}

impl Node {
    fn write_html(&self, out: &mut String) {
        match self {
            Node::Element(element) => element.write_html(out),
            Node::Text(text) => out.push_str(&html::escape(text)),
            Node::Math { markup, .. } => out.push_str(markup.as_str()),
            Node::LineBreak => out.push_str("<br>"),
            Node::Checkbox { checked: true } => {
                out.push_str("<input type=\"checkbox\" checked disabled>")
            }
            Node::Checkbox { checked: false } => out.push_str("<input type=\"checkbox\" disabled>"),
        }
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Element(element) => collect_text(&element.children, out),
            Node::Text(text) => out.push_str(text),
            Node::Math { tex, .. } => out.push_str(tex),
            Node::LineBreak => out.push('\n'),
            Node::Checkbox { .. } => {}
        }
    }
}

/// Styled content of one column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub nodes: Vec<Node>,
}

impl Fragment {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Serialize to standalone markup
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.write_html(&mut out);
        }
        out
    }

    /// All elements of a kind, depth-first in document order
    pub fn find_all(&self, kind: NodeKind) -> Vec<&Element> {
        let mut found = Vec::new();
        find_in(&self.nodes, kind, &mut found);
        found
    }

    /// Every element in the fragment, depth-first in document order
    pub fn elements(&self) -> Vec<&Element> {
        let mut found = Vec::new();
        walk_elements(&self.nodes, &mut found);
        found
    }
}

fn find_in<'a>(nodes: &'a [Node], kind: NodeKind, found: &mut Vec<&'a Element>) {
    for node in nodes {
        if let Node::Element(element) = node {
            if element.kind == kind {
                found.push(element);
            }
            find_in(&element.children, kind, found);
        }
    }
}

fn walk_elements<'a>(nodes: &'a [Node], found: &mut Vec<&'a Element>) {
    for node in nodes {
        if let Node::Element(element) = node {
            found.push(element);
            walk_elements(&element.children, found);
        }
    }
}

/// Converts raw column text to styled content
#[derive(Clone)]
pub struct RenderPipeline {
    styles: Arc<StyleMap>,
    math: Arc<dyn MathEngine>,
    options: Options,
}

impl RenderPipeline {
    pub fn new(styles: Arc<StyleMap>) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_MATH);

        Self {
            styles,
            math: Arc::new(TexMarkup),
            options,
        }
    }

    /// Use a different math typesetter
    pub fn with_math_engine(mut self, engine: Arc<dyn MathEngine>) -> Self {
        self.math = engine;
        self
    }

    /// The style map this pipeline applies
    pub fn styles(&self) -> &StyleMap {
        &self.styles
    }

    /// Render raw text in the requested mode
    pub fn render(&self, raw_text: &str, mode: RenderMode) -> Content {
        let fragment = self.fragment(raw_text);
        match mode {
            RenderMode::LiveFragment => Content::Fragment(fragment),
            RenderMode::StaticMarkup => Content::Markup(fragment.to_markup()),
        }
    }

    /// Live preview tree
    pub fn fragment(&self, raw_text: &str) -> Fragment {
        // The parser splits text at unmatched delimiter runs (`_(`, `*`);
        // autolinking needs each run of plain text whole
        let events = TextMergeStream::new(Parser::new_ext(raw_text, self.options));
        let mut builder = TreeBuilder::new(&self.styles, self.math.as_ref());
        for event in events {
            builder.handle(event);
        }
        builder.finish()
    }

    /// Standalone markup
    pub fn markup(&self, raw_text: &str) -> String {
        self.render(raw_text, RenderMode::StaticMarkup).into_markup()
    }
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new(Arc::new(StyleMap::new()))
    }
}

impl std::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("styles", &self.styles)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// An open container while walking the event stream
#[derive(Debug)]
enum FrameKind {
    Element(Element),
    Table(Vec<Alignment>),
    TableHead,
    TableRow,
    TableCell { header: bool, alignment: Alignment },
    CodeBlock { language: Option<String> },
    Image { src: String, title: Option<String> },
    /// Tags without a style (footnotes, raw HTML blocks, ...): children
    /// are spliced into the parent
    Transparent,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    children: Vec<Node>,
}

/// State machine turning parser events into a node tree
struct TreeBuilder<'a> {
    styles: &'a StyleMap,
    math: &'a dyn MathEngine,
    root: Vec<Node>,
    stack: Vec<Frame>,
}

impl<'a> TreeBuilder<'a> {
    fn new(styles: &'a StyleMap, math: &'a dyn MathEngine) -> Self {
        Self {
            styles,
            math,
            root: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.end(),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                let element = self
                    .element(NodeKind::InlineCode)
                    .with_children(vec![Node::Text(code.to_string())]);
                self.push(Node::Element(element));
            }
            Event::InlineMath(tex) => self.math(&tex, MathDisplay::Inline),
            Event::DisplayMath(tex) => self.math(&tex, MathDisplay::Block),
            Event::Html(raw) | Event::InlineHtml(raw) => {
                // Untrusted input: raw HTML is shown, never interpreted
                self.push(Node::Text(raw.to_string()));
            }
            Event::FootnoteReference(label) => {
                self.push(Node::Text(format!("[^{}]", label)));
            }
            Event::SoftBreak => self.push(Node::Text("\n".to_string())),
            Event::HardBreak => self.push(Node::LineBreak),
            Event::Rule => {
                let rule = self.element(NodeKind::Rule);
                self.push(Node::Element(rule));
            }
            Event::TaskListMarker(checked) => self.push(Node::Checkbox { checked }),
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let kind = match tag {
            Tag::Paragraph => FrameKind::Element(self.element(NodeKind::Paragraph)),
            Tag::Heading { level, .. } => {
                FrameKind::Element(self.element(NodeKind::heading(heading_level(level))))
            }
            Tag::BlockQuote(_) => FrameKind::Element(self.element(NodeKind::Blockquote)),
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(|lang| lang.to_string()),
                    CodeBlockKind::Indented => None,
                };
                FrameKind::CodeBlock { language }
            }
            Tag::List(Some(start)) => {
                let mut list = self.element(NodeKind::OrderedList);
                if start != 1 {
                    list = list.with_attr("start", start.to_string());
                }
                FrameKind::Element(list)
            }
            Tag::List(None) => FrameKind::Element(self.element(NodeKind::UnorderedList)),
            Tag::Item => FrameKind::Element(self.element(NodeKind::ListItem)),
            Tag::Table(alignments) => FrameKind::Table(alignments),
            Tag::TableHead => FrameKind::TableHead,
            Tag::TableRow => FrameKind::TableRow,
            Tag::TableCell => {
                let header = matches!(
                    self.stack.last(),
                    Some(Frame { kind: FrameKind::TableHead, .. })
                );
                let column = self.stack.last().map_or(0, |row| row.children.len());
                FrameKind::TableCell {
                    header,
                    alignment: self.column_alignment(column),
                }
            }
            Tag::Emphasis => FrameKind::Element(self.element(NodeKind::Emphasis)),
            Tag::Strong => FrameKind::Element(self.element(NodeKind::Strong)),
            Tag::Strikethrough => FrameKind::Element(self.element(NodeKind::Strikethrough)),
            Tag::Link {
                dest_url, title, ..
            } => {
                let mut link = self
                    .element(NodeKind::Link)
                    .with_attr("href", html::sanitize_url(&dest_url));
                if !title.is_empty() {
                    link = link.with_attr("title", title.to_string());
                }
                FrameKind::Element(
                    link.with_attr("target", "_blank")
                        .with_attr("rel", "noopener noreferrer"),
                )
            }
            Tag::Image {
                dest_url, title, ..
            } => FrameKind::Image {
                src: html::sanitize_url(&dest_url),
                title: (!title.is_empty()).then(|| title.to_string()),
            },
            _ => FrameKind::Transparent,
        };
        self.stack.push(Frame {
            kind,
            children: Vec::new(),
        });
    }

    fn end(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame.kind {
            FrameKind::Element(element) => {
                self.push(Node::Element(element.with_children(frame.children)));
            }
            FrameKind::Table(_) => {
                let table = self.finish_table(frame.children);
                self.push(Node::Element(table));
            }
            FrameKind::TableHead => {
                let row = self.element(NodeKind::TableRow).with_children(frame.children);
                let head = self
                    .element(NodeKind::TableHead)
                    .with_children(vec![Node::Element(row)]);
                self.push(Node::Element(head));
            }
            FrameKind::TableRow => {
                let row = self.element(NodeKind::TableRow).with_children(frame.children);
                self.push(Node::Element(row));
            }
            FrameKind::TableCell { header, alignment } => {
                let kind = if header {
                    NodeKind::TableHeaderCell
                } else {
                    NodeKind::TableCell
                };
                let mut cell = self.element(kind).with_children(frame.children);
                if let Some(align) = alignment_style(alignment) {
                    cell = cell.with_attr("style", align);
                }
                self.push(Node::Element(cell));
            }
            FrameKind::CodeBlock { language } => {
                let mut source = String::new();
                collect_text(&frame.children, &mut source);
                let mut code = self
                    .element(NodeKind::InlineCode)
                    .with_children(vec![Node::Text(source)]);
                if let Some(lang) = language {
                    code.extra_classes.push(format!("language-{}", lang));
                }
                let pre = self
                    .element(NodeKind::Preformatted)
                    .with_children(vec![Node::Element(code)]);
                self.push(Node::Element(pre));
            }
            FrameKind::Image { src, title } => {
                let mut alt = String::new();
                collect_text(&frame.children, &mut alt);
                let mut image = self
                    .element(NodeKind::Image)
                    .with_attr("src", src)
                    .with_attr("alt", alt);
                if let Some(title) = title {
                    image = image.with_attr("title", title);
                }
                self.push(Node::Element(image));
            }
            FrameKind::Transparent => {
                for child in frame.children {
                    self.push(child);
                }
            }
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_literal_context() {
            self.push(Node::Text(text.to_string()));
            return;
        }
        for segment in autolink::split(text) {
            match segment {
                Segment::Text(plain) => self.push(Node::Text(plain.to_string())),
                Segment::Link { href, text } => {
                    let link = self
                        .element(NodeKind::Link)
                        .with_attr("href", html::sanitize_url(&href))
                        .with_attr("target", "_blank")
                        .with_attr("rel", "noopener noreferrer")
                        .with_children(vec![Node::Text(text.to_string())]);
                    self.push(Node::Element(link));
                }
            }
        }
    }

    fn math(&mut self, tex: &str, display: MathDisplay) {
        let markup = self.math.typeset(tex, display);
        self.push(Node::Math {
            display,
            tex: tex.to_string(),
            markup,
        });
    }

    /// Code, image alt text and existing links are never autolinked
    fn in_literal_context(&self) -> bool {
        self.stack.iter().any(|frame| match &frame.kind {
            FrameKind::CodeBlock { .. } | FrameKind::Image { .. } => true,
            FrameKind::Element(element) => element.kind == NodeKind::Link,
            _ => false,
        })
    }

    fn column_alignment(&self, column: usize) -> Alignment {
        self.stack
            .iter()
            .rev()
            .find_map(|frame| match &frame.kind {
                FrameKind::Table(alignments) => Some(alignments.get(column).cloned()),
                _ => None,
            })
            .flatten()
            .unwrap_or(Alignment::None)
    }

    fn finish_table(&self, children: Vec<Node>) -> Element {
        let mut table_children = Vec::new();
        let mut body_rows = Vec::new();
        for child in children {
            match child {
                Node::Element(row) if row.kind == NodeKind::TableRow => {
                    body_rows.push(Node::Element(row))
                }
                other => table_children.push(other),
            }
        }
        if !body_rows.is_empty() {
            let body = self.element(NodeKind::TableBody).with_children(body_rows);
            table_children.push(Node::Element(body));
        }
        self.element(NodeKind::Table).with_children(table_children)
    }

    fn element(&self, kind: NodeKind) -> Element {
        Element::new(kind, self.styles)
    }

    fn push(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }

    fn finish(mut self) -> Fragment {
        // The parser balances every tag; close anything left open regardless
        while !self.stack.is_empty() {
            self.end();
        }
        Fragment { nodes: self.root }
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn alignment_style(alignment: Alignment) -> Option<&'static str> {
    match alignment {
        Alignment::None => None,
        Alignment::Left => Some("text-align: left"),
        Alignment::Center => Some("text-align: center"),
        Alignment::Right => Some("text-align: right"),
    }
}
