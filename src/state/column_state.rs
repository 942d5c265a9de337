//! Column state management
//!
//! Holds the ordered raw-text buffers, one per column, and each column's
//! memoized preview. Editing a column invalidates only that column's preview.

use std::sync::Arc;

use crate::error::{ColumnError, ColumnResult};
use crate::markdown::{Fragment, RenderPipeline};

/// A single note pane
#[derive(Debug, Clone, Default)]
pub struct Column {
    /// Unrendered source, replaced wholesale on each edit
    raw_text: String,

    /// Preview derived from `raw_text`; `None` until rendered
    rendered: Option<Arc<Fragment>>,

    /// Number of times the preview was rendered
    render_count: u64,
}

impl Column {
    /// Create a column with some initial text
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            raw_text: text.into(),
            ..Self::default()
        }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Whether the preview must be re-derived before display
    pub fn is_stale(&self) -> bool {
        self.rendered.is_none()
    }

    pub fn render_count(&self) -> u64 {
        self.render_count
    }
}

/// Ordered collection of columns; never empty
#[derive(Debug, Clone)]
pub struct ColumnStore {
    columns: Vec<Column>,
}

impl ColumnStore {
    /// Create a store with `count` empty columns (at least one)
    pub fn new(count: usize) -> Self {
        let columns = (0..count.max(1)).map(|_| Column::default()).collect();
        Self { columns }
    }

    /// Create a store holding the given texts in order; an empty list
    /// yields a single empty column
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns: Vec<Column> = texts.into_iter().map(Column::with_text).collect();
        if columns.is_empty() {
            columns.push(Column::default());
        }
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column at `index`
    pub fn get(&self, index: usize) -> ColumnResult<&Column> {
        self.columns.get(index).ok_or(ColumnError::IndexOutOfRange {
            index,
            len: self.columns.len(),
        })
    }

    /// Iterate columns in display order
    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    /// Snapshot of every column's raw text, in display order
    pub fn raw_texts(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.raw_text.clone()).collect()
    }

    /// Replace the raw text of one column
    pub fn set_text(&mut self, index: usize, text: impl Into<String>) -> ColumnResult<()> {
        let len = self.columns.len();
        let column = self
            .columns
            .get_mut(index)
            .ok_or(ColumnError::IndexOutOfRange { index, len })?;
        column.raw_text = text.into();
        column.rendered = None;
        Ok(())
    }

    /// Append an empty column; returns its index
    pub fn add_column(&mut self) -> usize {
        self.columns.push(Column::default());
        self.columns.len() - 1
    }

    /// Remove the last column. Refused when only one column remains.
    pub fn remove_column(&mut self) -> ColumnResult<Column> {
        if self.columns.len() <= 1 {
            return Err(ColumnError::MinimumColumns);
        }
        self.columns.pop().ok_or(ColumnError::MinimumColumns)
    }

    /// Preview of one column, rendered only if its text changed since the
    /// last call
    pub fn preview(
        &mut self,
        index: usize,
        pipeline: &RenderPipeline,
    ) -> ColumnResult<Arc<Fragment>> {
        let len = self.columns.len();
        let column = self
            .columns
            .get_mut(index)
            .ok_or(ColumnError::IndexOutOfRange { index, len })?;

        if let Some(rendered) = &column.rendered {
            return Ok(rendered.clone());
        }
        let fragment = Arc::new(pipeline.fragment(&column.raw_text));
        column.rendered = Some(fragment.clone());
        column.render_count += 1;
        log::debug!(
            "Rendered column {} ({} bytes, render #{})",
            index,
            column.raw_text.len(),
            column.render_count
        );
        Ok(fragment)
    }

    /// Previews of all columns, re-rendering only stale ones
    pub fn previews(&mut self, pipeline: &RenderPipeline) -> Vec<Arc<Fragment>> {
        (0..self.columns.len())
            .filter_map(|index| self.preview(index, pipeline).ok())
            .collect()
    }
}

impl Default for ColumnStore {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::NodeKind;

    #[test]
    fn test_store_is_never_empty() {
        assert_eq!(ColumnStore::new(0).len(), 1);
        assert_eq!(ColumnStore::from_texts(Vec::<String>::new()).len(), 1);
        assert_eq!(ColumnStore::new(3).len(), 3);
        assert!(!ColumnStore::default().is_empty());
    }

    #[test]
    fn test_set_text_out_of_range() {
        let mut store = ColumnStore::new(2);
        assert_eq!(
            store.set_text(2, "x"),
            Err(ColumnError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(store.raw_texts(), vec![String::new(), String::new()]);
    }

    #[test]
    fn test_remove_last_column_is_refused() {
        let mut store = ColumnStore::from_texts(["keep me"]);
        assert_eq!(store.remove_column().unwrap_err(), ColumnError::MinimumColumns);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().raw_text(), "keep me");
    }

    #[test]
    fn test_add_then_remove_round_trip() {
        let mut store = ColumnStore::from_texts(["a", "b"]);
        let before = store.raw_texts();

        assert_eq!(store.add_column(), 2);
        assert_eq!(store.get(2).unwrap().raw_text(), "");
        let removed = store.remove_column().unwrap();
        assert_eq!(removed.raw_text(), "");

        assert_eq!(store.len(), 2);
        assert_eq!(store.raw_texts(), before);
    }

    #[test]
    fn test_remove_takes_the_last_column() {
        let mut store = ColumnStore::from_texts(["a", "b", "c"]);
        assert_eq!(store.remove_column().unwrap().raw_text(), "c");
        assert_eq!(store.raw_texts(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_editing_one_column_keeps_others_cached() {
        let pipeline = RenderPipeline::default();
        let mut store = ColumnStore::from_texts(["# A", "**b**"]);
        let a_before = store.preview(0, &pipeline).unwrap();
        let b_before = store.preview(1, &pipeline).unwrap();

        store.set_text(0, "# A2").unwrap();
        assert!(store.get(0).unwrap().is_stale());
        assert!(!store.get(1).unwrap().is_stale());

        let a_after = store.preview(0, &pipeline).unwrap();
        let b_after = store.preview(1, &pipeline).unwrap();
        assert!(!Arc::ptr_eq(&a_before, &a_after));
        assert!(Arc::ptr_eq(&b_before, &b_after));
        assert_eq!(store.get(0).unwrap().render_count(), 2);
        assert_eq!(store.get(1).unwrap().render_count(), 1);
        assert_eq!(a_after.find_all(NodeKind::Heading1)[0].text(), "A2");
    }

    #[test]
    fn test_preview_depends_only_on_latest_text() {
        let pipeline = RenderPipeline::default();
        let mut store = ColumnStore::new(2);
        for text in ["x", "*y*", "- z"] {
            store.set_text(0, text).unwrap();
            store.set_text(1, "# same").unwrap();
        }
        let edited = store.preview(1, &pipeline).unwrap();
        assert_eq!(*edited, pipeline.fragment("# same"));
        let other = store.preview(0, &pipeline).unwrap();
        assert_eq!(*other, pipeline.fragment("- z"));
    }

    #[test]
    fn test_scenario_three_columns() {
        let pipeline = RenderPipeline::default();
        let mut store = ColumnStore::new(3);
        store.set_text(0, "# A").unwrap();
        store.set_text(1, "**b**").unwrap();
        store.set_text(2, "- c").unwrap();
        let previews = store.previews(&pipeline);

        let heading = previews[0].find_all(NodeKind::Heading1);
        assert_eq!(heading[0].class, "text-2xl");
        assert_eq!(heading[0].text(), "A");

        let strong = previews[1].find_all(NodeKind::Strong);
        assert_eq!(strong[0].class, "font-bold");
        assert_eq!(strong[0].text(), "b");

        let list = previews[2].find_all(NodeKind::UnorderedList);
        assert_eq!(list[0].class, "list-disc");
        let items = previews[2].find_all(NodeKind::ListItem);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text(), "c");
    }
}
