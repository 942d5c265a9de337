//! Main application module
//!
//! `Composer` ties the column store, the render pipeline and the export
//! serializer together and routes user actions through [`Composer::update`].
//! Refused actions and failed exports end up as notifications for the user
//! instead of being dropped silently.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::Config;
use crate::error::{ColumnResult, ExportResult};
use crate::markdown::{ExportDocument, ExportSerializer, Fragment, RenderPipeline, StyleMap};
use crate::message::{ColumnMessage, ExportMessage, Message};
use crate::state::ColumnStore;
use crate::surface::{SurfaceHost, SurfaceId};

/// Severity of a user notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// A message to show the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Outcome of one export, reported by its watcher task
type ExportOutcome = (SurfaceId, ExportResult<()>);

/// The multi-column composer
pub struct Composer {
    store: ColumnStore,
    pipeline: RenderPipeline,
    serializer: ExportSerializer,
    /// Exports still printing or waiting for teardown
    exports: Vec<SurfaceId>,
    outcome_tx: UnboundedSender<ExportOutcome>,
    outcomes: UnboundedReceiver<ExportOutcome>,
    notifications: Vec<Notification>,
}

impl Composer {
    /// Composer with `config.columns.initial_count` empty columns
    pub fn new(config: &Config, host: Arc<dyn SurfaceHost>) -> Self {
        Self::with_store(ColumnStore::new(config.columns.initial_count), config, host)
    }

    /// Composer whose columns start with the given texts
    pub fn with_texts<I, S>(texts: I, config: &Config, host: Arc<dyn SurfaceHost>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_store(ColumnStore::from_texts(texts), config, host)
    }

    fn with_store(store: ColumnStore, config: &Config, host: Arc<dyn SurfaceHost>) -> Self {
        let pipeline = RenderPipeline::new(Arc::new(StyleMap::new()));
        let serializer = ExportSerializer::new(pipeline.clone(), host, config.export.clone());
        let (outcome_tx, outcomes) = mpsc::unbounded_channel();
        log::debug!("Composer started with {} column(s)", store.len());
        Self {
            store,
            pipeline,
            serializer,
            exports: Vec::new(),
            outcome_tx,
            outcomes,
            notifications: Vec::new(),
        }
    }

    pub fn store(&self) -> &ColumnStore {
        &self.store
    }

    /// Handle a message. Export requests spawn onto the current tokio runtime.
    ///
    /// Exports that finished since the last call are settled first.
    pub fn update(&mut self, message: Message) {
        self.settle_finished_exports();
        match message {
            Message::Column(message) => self.handle_column_message(message),
            Message::Export(message) => self.handle_export_message(message),
            Message::None => {}
        }
    }

    fn handle_column_message(&mut self, message: ColumnMessage) {
        let result = match message {
            ColumnMessage::Edited { index, text } => self.store.set_text(index, text),
            ColumnMessage::Add => {
                let index = self.store.add_column();
                log::debug!("Added column {}", index);
                Ok(())
            }
            ColumnMessage::Remove => self.store.remove_column().map(|_| ()),
        };

        if let Err(e) = result {
            log::warn!("Column operation refused: {}", e);
            self.notify(NotificationLevel::Warning, e.user_message());
        }
    }

    fn handle_export_message(&mut self, message: ExportMessage) {
        match message {
            ExportMessage::Requested => {
                let texts = self.store.raw_texts();
                match self.serializer.export_to_print(&texts) {
                    Ok(handle) => {
                        let surface = handle.surface_id();
                        let outcome_tx = self.outcome_tx.clone();
                        tokio::spawn(async move {
                            let result = handle.finished().await;
                            let _ = outcome_tx.send((surface, result));
                        });
                        self.exports.push(surface);
                    }
                    Err(e) => {
                        log::error!("Export failed: {}", e);
                        self.notify(NotificationLevel::Error, e.user_message());
                    }
                }
            }
            ExportMessage::Completed { surface, error } => {
                self.exports.retain(|pending| *pending != surface);
                match error {
                    Some(message) => self.notify(NotificationLevel::Error, message),
                    None => log::debug!("Export on surface {} completed", surface),
                }
            }
        }
    }

    /// Live preview of one column
    pub fn preview(&mut self, index: usize) -> ColumnResult<Arc<Fragment>> {
        self.store.preview(index, &self.pipeline)
    }

    /// Live previews of all columns, in order
    pub fn previews(&mut self) -> Vec<Arc<Fragment>> {
        self.store.previews(&self.pipeline)
    }

    /// The document an export would print right now
    pub fn export_document(&self) -> ExportDocument {
        self.serializer.build_document(&self.store.raw_texts())
    }

    /// Exports still printing or waiting for teardown
    pub fn pending_exports(&mut self) -> Vec<SurfaceId> {
        self.settle_finished_exports();
        self.exports.clone()
    }

    /// Wait until no export is pending. Returns the outcomes of exports that
    /// had not been settled yet; failures are queued as notifications.
    pub async fn wait_for_exports(&mut self) -> Vec<ExportResult<()>> {
        let mut results = self.settle_finished_exports();
        while !self.exports.is_empty() {
            let Some(outcome) = self.outcomes.recv().await else {
                break;
            };
            results.push(self.settle(outcome));
        }
        results
    }

    fn settle_finished_exports(&mut self) -> Vec<ExportResult<()>> {
        let mut results = Vec::new();
        while let Ok(outcome) = self.outcomes.try_recv() {
            results.push(self.settle(outcome));
        }
        results
    }

    fn settle(&mut self, (surface, result): ExportOutcome) -> ExportResult<()> {
        let error = result.as_ref().err().map(|e| e.user_message());
        self.handle_export_message(ExportMessage::Completed { surface, error });
        result
    }

    /// Drain notifications queued since the last call
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.notifications.push(Notification::new(level, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ColumnError, ExportError};
    use crate::markdown::NodeKind;
    use crate::surface::{MemorySurfaceHost, SurfaceEvent};

    fn composer_with(host: &MemorySurfaceHost) -> Composer {
        let mut config = Config::default();
        config.export.teardown_grace_ms = 10;
        Composer::new(&config, Arc::new(host.clone()))
    }

    #[test]
    fn test_starts_with_configured_columns() {
        let composer = composer_with(&MemorySurfaceHost::new());
        assert_eq!(composer.store().len(), 3);
    }

    #[test]
    fn test_edit_updates_only_target_preview() {
        let mut composer = composer_with(&MemorySurfaceHost::new());
        composer.update(ColumnMessage::Edited { index: 1, text: "# Hi".into() }.into());

        let preview = composer.preview(1).unwrap();
        assert_eq!(preview.find_all(NodeKind::Heading1)[0].text(), "Hi");
        assert!(composer.preview(0).unwrap().is_empty());
        assert!(composer.take_notifications().is_empty());
    }

    #[test]
    fn test_refused_column_operations_notify() {
        let mut composer = composer_with(&MemorySurfaceHost::new());
        composer.update(ColumnMessage::Remove.into());
        composer.update(ColumnMessage::Remove.into());
        composer.update(ColumnMessage::Remove.into());
        composer.update(ColumnMessage::Edited { index: 7, text: "x".into() }.into());

        assert_eq!(composer.store().len(), 1);
        let notifications = composer.take_notifications();
        assert_eq!(notifications.len(), 2);
        assert!(notifications
            .iter()
            .all(|n| n.level == NotificationLevel::Warning));
        assert_eq!(notifications[0].message, ColumnError::MinimumColumns.user_message());
    }

    #[test]
    fn test_add_column() {
        let mut composer = composer_with(&MemorySurfaceHost::new());
        composer.update(Message::Column(ColumnMessage::Add));
        assert_eq!(composer.store().len(), 4);
        composer.update(Message::None);
        assert_eq!(composer.previews().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_prints_every_column() {
        let host = MemorySurfaceHost::new();
        let mut composer = composer_with(&host);
        composer.update(ColumnMessage::Edited { index: 0, text: "# A".into() }.into());
        composer.update(ColumnMessage::Edited { index: 2, text: "- c".into() }.into());
        composer.update(ExportMessage::Requested.into());

        let pending = composer.pending_exports();
        assert_eq!(pending.len(), 1);
        let results = composer.wait_for_exports().await;
        assert!(results.iter().all(|r| r.is_ok()));
        assert!(composer.pending_exports().is_empty());
        assert!(composer.take_notifications().is_empty());

        let id = pending[0];
        let document = host.document(id).unwrap();
        assert!(document.contains("text-2xl"));
        assert!(document.contains("list-disc"));
        assert_eq!(host.removal_count(id), 1);
        assert!(host.events_for(id).contains(&SurfaceEvent::Printed(id)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_export_notifies_error() {
        let host = MemorySurfaceHost::new().failing_creation();
        let mut composer = composer_with(&host);
        composer.update(ExportMessage::Requested.into());

        assert!(composer.pending_exports().is_empty());
        let notifications = composer.take_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].level, NotificationLevel::Error);
        assert!(host.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_load_reports_on_completion() {
        let host = MemorySurfaceHost::new().manual_loading();
        let mut composer = composer_with(&host);
        composer.update(ExportMessage::Requested.into());

        let id = composer.pending_exports()[0];
        tokio::task::yield_now().await;
        assert!(host.abandon_loading(id));

        let results = composer.wait_for_exports().await;
        assert!(matches!(results[0], Err(ExportError::LoadAborted)));
        let notifications = composer.take_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].level, NotificationLevel::Error);
        assert_eq!(host.removal_count(id), 1);
        assert!(!host.events_for(id).contains(&SurfaceEvent::Printed(id)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_exports_settle_without_waiting() {
        let host = MemorySurfaceHost::new();
        let mut composer = composer_with(&host);
        composer.update(ExportMessage::Requested.into());
        composer.update(ExportMessage::Requested.into());
        assert_eq!(composer.pending_exports().len(), 2);

        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        composer.update(Message::None);
        assert!(composer.pending_exports().is_empty());
        assert!(composer.wait_for_exports().await.is_empty());
        assert!(composer.take_notifications().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_surfaces_on_next_update() {
        let host = MemorySurfaceHost::new().manual_loading();
        let mut composer = composer_with(&host);
        composer.update(ExportMessage::Requested.into());
        let id = composer.pending_exports()[0];

        assert!(host.abandon_loading(id));
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        composer.update(ColumnMessage::Add.into());

        assert!(composer.pending_exports().is_empty());
        let notifications = composer.take_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].level, NotificationLevel::Error);
        assert_eq!(host.removal_count(id), 1);
    }
}
