//! Print export for the column layout
//!
//! Reassembles every column into one standalone HTML document:
//! - a head linking the math stylesheet and scripts, and embedding a
//!   stylesheet with a rule for every class the style map can emit
//! - a body laying the columns out side by side, in column order
//!
//! The document is materialized on an isolated surface. Printing waits for
//! the surface's load notification, and the surface is removed a short grace
//! delay after printing starts.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::render::RenderPipeline;
use super::style::{NodeKind, StyleMap};
use crate::config::{AssetRef, ExportConfig};
use crate::error::{ExportError, ExportResult};
use crate::surface::{LoadSignal, SurfaceHost, SurfaceId, SurfaceLease};
use crate::utils::html;

/// Class of the flex container holding all columns
pub const CONTAINER_CLASS: &str = "markdown-container";

/// Class of each column's container
pub const COLUMN_CLASS: &str = "markdown-column";

/// Typesets every math span once the auto-render script has loaded
pub const MATH_RENDER_CALL: &str = "renderMathInElement(document.body);";

/// Composite document built for one export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDocument {
    title: String,
    math_stylesheet: AssetRef,
    math_script: AssetRef,
    math_auto_render: AssetRef,
    stylesheet: String,
    columns: Vec<String>,
}

impl ExportDocument {
    /// Build from each column's static markup, in column order
    pub fn new(config: &ExportConfig, styles: &StyleMap, columns: Vec<String>) -> Self {
        Self {
            title: config.title.clone(),
            math_stylesheet: config.math_stylesheet.clone(),
            math_script: config.math_script.clone(),
            math_auto_render: config.math_auto_render.clone(),
            stylesheet: stylesheet(styles),
            columns,
        }
    }

    /// Static markup of every column, in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Embedded stylesheet
    pub fn stylesheet(&self) -> &str {
        &self.stylesheet
    }

    /// Serialize the complete document
    pub fn to_html(&self) -> String {
        let mut body = String::new();
        for column in &self.columns {
            let _ = write!(
                body,
                "\n        <div class=\"{}\">{}</div>",
                COLUMN_CLASS, column
            );
        }

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="generator" content="Cheatsheet Composer">
    <title>{}</title>
    {}
    {}
    {}
    <style>{}</style>
</head>
<body>
    <div class="{}">{}
    </div>
</body>
</html>"#,
            html::escape(&self.title),
            stylesheet_link(&self.math_stylesheet),
            script_tag(&self.math_script, None),
            script_tag(&self.math_auto_render, Some(MATH_RENDER_CALL)),
            self.stylesheet,
            CONTAINER_CLASS,
            body
        )
    }
}

fn integrity_attrs(asset: &AssetRef) -> String {
    match &asset.integrity {
        Some(integrity) => format!(
            r#" integrity="{}" crossorigin="anonymous""#,
            html::escape(integrity)
        ),
        None => String::new(),
    }
}

fn stylesheet_link(sheet: &AssetRef) -> String {
    format!(
        r#"<link rel="stylesheet" href="{}"{}>"#,
        html::escape(&sheet.href),
        integrity_attrs(sheet)
    )
}

/// Deferred scripts run before the window `load` event, so math is
/// typeset by the time a print-on-load handler fires
fn script_tag(script: &AssetRef, onload: Option<&str>) -> String {
    let onload = onload
        .map(|call| format!(r#" onload="{}""#, html::escape(call)))
        .unwrap_or_default();
    format!(
        r#"<script defer src="{}"{}{}></script>"#,
        html::escape(&script.href),
        integrity_attrs(script),
        onload
    )
}

/// CSS selector matching an element of `kind` styled with `class`
pub fn selector_for(kind: NodeKind, class: &str) -> String {
    let mut selector = kind.tag_name().to_string();
    for token in class.split_whitespace() {
        selector.push('.');
        for c in token.chars() {
            if !(c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                selector.push('\\');
            }
            selector.push(c);
        }
    }
    selector
}

/// Concrete visual rules for each node kind
fn declarations(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Heading1 => "font-size: 1.5rem; line-height: 2rem; font-weight: bold;",
        NodeKind::Heading2 => "font-size: 1.25rem; line-height: 1.75rem; font-weight: bold;",
        NodeKind::Heading3 => "font-size: 1.125rem; line-height: 1.75rem; font-weight: bold;",
        NodeKind::Heading4 => "font-size: 1rem; line-height: 1.5rem; font-weight: bold;",
        NodeKind::Heading5 => "font-size: 0.875rem; line-height: 1.25rem; font-weight: bold;",
        NodeKind::Heading6 => "font-size: 0.75rem; line-height: 1rem; font-weight: bold;",
        NodeKind::Paragraph | NodeKind::ListItem => "font-size: 16px; line-height: 1.5;",
        NodeKind::UnorderedList => "list-style-type: disc; margin-left: 2em;",
        NodeKind::OrderedList => "list-style-type: decimal; margin-left: 2em;",
        NodeKind::Blockquote => "border-left: 4px solid #d1d5db; padding-left: 1rem;",
        NodeKind::Table => "border-collapse: collapse; border: 1px solid #d1d5db; width: 100%;",
        NodeKind::TableHead | NodeKind::TableBody | NodeKind::TableRow => {
            "border: 1px solid #d1d5db;"
        }
        NodeKind::TableHeaderCell | NodeKind::TableCell => {
            "border: 1px solid #d1d5db; padding: 0.5rem; text-align: left;"
        }
        NodeKind::Preformatted => {
            "background-color: #f1f1f1; border-radius: 4px; padding: 0.5rem; overflow-x: auto;"
        }
        NodeKind::InlineCode => "background-color: #f1f1f1; border-radius: 4px; padding: 0.125rem;",
        NodeKind::Strikethrough => "text-decoration: line-through;",
        NodeKind::Emphasis => "font-style: italic;",
        NodeKind::Strong => "font-weight: bold;",
        NodeKind::Rule => "border: 0; border-top: 1px solid #d1d5db;",
        NodeKind::Link => "color: #3b82f6; text-decoration: none;",
        NodeKind::Image => "max-width: 100%;",
    }
}

/// Embedded stylesheet: page layout plus one rule per style-map entry
pub fn stylesheet(styles: &StyleMap) -> String {
    let mut css = format!(
        r#"
        body {{
            font-family: ui-sans-serif, system-ui, -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, "Noto Sans", sans-serif;
            margin: 0;
        }}
        .{container} {{
            display: flex;
            justify-content: space-between;
        }}
        .{column} {{
            flex: 1;
            min-width: 0;
            padding: 0 8px;
            overflow-wrap: anywhere;
            hyphens: auto;
        }}
        pre > code {{
            background: transparent;
            padding: 0;
        }}
        input[type="checkbox"] {{
            margin-right: 0.5em;
        }}
        @media print {{
            pre, blockquote, table {{
                page-break-inside: avoid;
            }}
            h1, h2, h3, h4, h5, h6 {{
                page-break-after: avoid;
            }}
        }}
"#,
        container = CONTAINER_CLASS,
        column = COLUMN_CLASS,
    );
    for (kind, class) in styles.entries() {
        let _ = writeln!(
            css,
            "        {} {{ {} }}",
            selector_for(kind, class),
            declarations(kind)
        );
    }
    css
}

/// Assembles the export document and drives printing
pub struct ExportSerializer {
    pipeline: RenderPipeline,
    host: Arc<dyn SurfaceHost>,
    config: ExportConfig,
}

impl ExportSerializer {
    pub fn new(pipeline: RenderPipeline, host: Arc<dyn SurfaceHost>, config: ExportConfig) -> Self {
        Self {
            pipeline,
            host,
            config,
        }
    }

    /// Render every column's raw text to static markup, in order
    pub fn build_document<S: AsRef<str>>(&self, columns: &[S]) -> ExportDocument {
        let markup = columns
            .iter()
            .map(|raw| self.pipeline.markup(raw.as_ref()))
            .collect();
        ExportDocument::new(&self.config, self.pipeline.styles(), markup)
    }

    /// Materialize the document on a new surface and print it once loaded.
    ///
    /// Returns as soon as the document is handed to the surface; printing
    /// and teardown continue on a spawned task, so this must be called from
    /// within a tokio runtime. Surface failures are returned here and leave
    /// no surface behind.
    pub fn export_to_print<S: AsRef<str>>(&self, columns: &[S]) -> ExportResult<ExportHandle> {
        let document = self.build_document(columns).to_html();

        let mut lease = SurfaceLease::acquire(self.host.clone())?;
        let load = lease.surface_mut().materialize(&document)?;
        let surface = lease.id();
        log::info!(
            "Exporting {} column(s) on surface {}",
            columns.len(),
            surface
        );

        let task = tokio::spawn(print_when_loaded(lease, load, self.config.teardown_grace()));
        Ok(ExportHandle { surface, task })
    }
}

async fn print_when_loaded(
    mut lease: SurfaceLease,
    load: LoadSignal,
    grace: Duration,
) -> ExportResult<()> {
    if load.await.is_err() {
        log::error!("Surface {} never finished loading", lease.id());
        lease.release();
        return Err(ExportError::LoadAborted);
    }

    let printed = lease.surface_mut().print();
    match &printed {
        Ok(()) => log::info!("Print dialog opened for surface {}", lease.id()),
        Err(e) => log::error!("Printing surface {} failed: {}", lease.id(), e),
    }

    tokio::time::sleep(grace).await;
    lease.release();
    printed.map_err(ExportError::from)
}

/// A running export
#[derive(Debug)]
pub struct ExportHandle {
    surface: SurfaceId,
    task: JoinHandle<ExportResult<()>>,
}

impl ExportHandle {
    /// Surface the document was materialized on
    pub fn surface_id(&self) -> SurfaceId {
        self.surface
    }

    /// Wait until the surface has been removed
    pub async fn finished(self) -> ExportResult<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(ExportError::Interrupted(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TEARDOWN_GRACE_MS;
    use crate::error::SurfaceError;
    use crate::surface::{MemorySurfaceHost, SurfaceEvent};

    const COLUMNS: [&str; 3] = ["# A", "**b**", "- c"];

    fn serializer(host: &MemorySurfaceHost) -> ExportSerializer {
        ExportSerializer::new(
            RenderPipeline::default(),
            Arc::new(host.clone()),
            ExportConfig::default(),
        )
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_document_columns_in_order() {
        let host = MemorySurfaceHost::new();
        let pipeline = RenderPipeline::default();
        let document = serializer(&host).build_document(&COLUMNS);
        let html = document.to_html();

        let mut last = 0;
        for raw in COLUMNS {
            let expected = format!(
                "<div class=\"{}\">{}</div>",
                COLUMN_CLASS,
                pipeline.fragment(raw).to_markup()
            );
            let at = html[last..].find(&expected).expect("column present in order");
            last += at + expected.len();
        }
        assert_eq!(html.matches("<div class=\"markdown-column\">").count(), 3);
        assert!(html.contains("<h1 class=\"text-2xl\">A</h1>"));
        assert!(html.contains("<strong class=\"font-bold\">b</strong>"));
        assert!(html.contains("<ul class=\"list-disc\"><li class=\"text-base\">c</li></ul>"));
    }

    #[test]
    fn test_head_links_math_stylesheet() {
        let host = MemorySurfaceHost::new();
        let html = serializer(&host).build_document(&[""]).to_html();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("katex.min.css"));
        assert!(html.contains("integrity=\"sha384-"));
        assert!(html.contains("<title>Cheat Sheet</title>"));
    }

    #[test]
    fn test_head_loads_math_typesetting_scripts() {
        let host = MemorySurfaceHost::new();
        let html = serializer(&host).build_document(&["$x^2$"]).to_html();
        let head = &html[..html.find("</head>").expect("head closes")];

        let script = head.find("katex.min.js").expect("katex script linked");
        let auto_render = head.find("auto-render.min.js").expect("auto-render linked");
        assert!(script < auto_render);
        assert_eq!(head.matches("<script defer src=").count(), 2);
        assert!(head.contains(r#"onload="renderMathInElement(document.body);""#));
        assert_eq!(head.matches("crossorigin=\"anonymous\"").count(), 3);
        assert!(html.contains(r"\(x^2\)"));
    }

    #[test]
    fn test_custom_math_assets_without_integrity() {
        let mut config = ExportConfig::default();
        config.math_script = AssetRef::new("/katex/katex.js", None);
        let document = ExportDocument::new(&config, &StyleMap::new(), vec![]);
        let html = document.to_html();
        assert!(html.contains(r#"<script defer src="/katex/katex.js"></script>"#));
    }

    #[test]
    fn test_stylesheet_covers_every_class() {
        let styles = StyleMap::new();
        let css = stylesheet(&styles);
        for (kind, class) in styles.entries() {
            assert!(css.contains(&selector_for(kind, class)), "no rule for {kind}");
        }
        assert!(css.contains("display: flex"));
    }

    #[test]
    fn test_selector_escapes_dots() {
        assert_eq!(
            selector_for(NodeKind::InlineCode, "rounded-md bg-gray-100 p-0.5"),
            "code.rounded-md.bg-gray-100.p-0\\.5"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_print_waits_for_load() {
        let host = MemorySurfaceHost::new().manual_loading();
        let handle = serializer(&host).export_to_print(&COLUMNS).expect("export starts");
        let id = handle.surface_id();

        settle().await;
        assert_eq!(
            host.events_for(id),
            vec![SurfaceEvent::Created(id), SurfaceEvent::Materialized(id)]
        );
        assert!(host.document(id).expect("document").contains("markdown-column"));

        assert!(host.finish_loading(id));
        handle.finished().await.expect("export finishes");
        assert_eq!(
            host.events_for(id),
            vec![
                SurfaceEvent::Created(id),
                SurfaceEvent::Materialized(id),
                SurfaceEvent::Loaded(id),
                SurfaceEvent::Printed(id),
                SurfaceEvent::Removed(id),
            ]
        );
        assert_eq!(host.attached(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_waits_for_grace_delay() {
        let host = MemorySurfaceHost::new();
        let start = tokio::time::Instant::now();
        let handle = serializer(&host).export_to_print(&COLUMNS).expect("export starts");
        let id = handle.surface_id();

        handle.finished().await.expect("export finishes");
        assert!(start.elapsed() >= Duration::from_millis(DEFAULT_TEARDOWN_GRACE_MS));
        assert_eq!(host.removal_count(id), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_exports_use_separate_surfaces() {
        let host = MemorySurfaceHost::new().manual_loading();
        let serializer = serializer(&host);
        let first = serializer.export_to_print(&COLUMNS).expect("first export");
        let second = serializer.export_to_print(&COLUMNS).expect("second export");
        let (a, b) = (first.surface_id(), second.surface_id());
        assert_ne!(a, b);
        assert_eq!(host.attached(), 2);

        settle().await;
        assert!(host.finish_loading(b));
        assert!(host.finish_loading(a));
        second.finished().await.expect("second finishes");
        first.finished().await.expect("first finishes");

        assert_eq!(host.removal_count(a), 1);
        assert_eq!(host.removal_count(b), 1);
        assert_eq!(host.attached(), 0);
    }

    #[tokio::test]
    async fn test_creation_failure_is_reported() {
        let host = MemorySurfaceHost::new().failing_creation();
        let err = serializer(&host).export_to_print(&COLUMNS).unwrap_err();
        assert!(matches!(
            err,
            ExportError::Surface(SurfaceError::CreateFailed(_))
        ));
        assert!(host.events().is_empty());
    }

    #[tokio::test]
    async fn test_missing_content_handle_removes_surface() {
        let host = MemorySurfaceHost::new().without_content();
        let err = serializer(&host).export_to_print(&COLUMNS).unwrap_err();
        assert!(matches!(
            err,
            ExportError::Surface(SurfaceError::ContentUnavailable)
        ));
        assert_eq!(host.attached(), 0);
        assert_eq!(host.events().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_load_never_prints() {
        let host = MemorySurfaceHost::new().manual_loading();
        let handle = serializer(&host).export_to_print(&COLUMNS).expect("export starts");
        let id = handle.surface_id();

        assert!(host.abandon_loading(id));
        let result = handle.finished().await;
        assert!(matches!(result, Err(ExportError::LoadAborted)));
        assert!(!host.events_for(id).contains(&SurfaceEvent::Printed(id)));
        assert_eq!(host.removal_count(id), 1);
    }
}
