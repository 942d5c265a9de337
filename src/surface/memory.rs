//! In-process surface host
//!
//! Keeps documents in memory and records every lifecycle step, so callers
//! can check ordering (load before print, print before removal). Loading can
//! complete immediately or be held until [`MemorySurfaceHost::finish_loading`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;

use super::{LoadSignal, PrintSurface, SurfaceHost, SurfaceId};
use crate::error::SurfaceError;

/// A recorded lifecycle step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Created(SurfaceId),
    Materialized(SurfaceId),
    Loaded(SurfaceId),
    Printed(SurfaceId),
    Removed(SurfaceId),
}

impl SurfaceEvent {
    pub fn surface(&self) -> SurfaceId {
        match self {
            SurfaceEvent::Created(id)
            | SurfaceEvent::Materialized(id)
            | SurfaceEvent::Loaded(id)
            | SurfaceEvent::Printed(id)
            | SurfaceEvent::Removed(id) => *id,
        }
    }
}

#[derive(Debug, Default)]
struct HostState {
    events: Vec<SurfaceEvent>,
    documents: HashMap<SurfaceId, String>,
    attached: Vec<SurfaceId>,
    pending_loads: HashMap<SurfaceId, oneshot::Sender<()>>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<HostState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, HostState> {
        // A panic while recording cannot leave the state half-written
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Surface host backed by memory
#[derive(Debug, Clone, Default)]
pub struct MemorySurfaceHost {
    shared: Arc<Shared>,
    manual_load: bool,
    fail_create: bool,
    content_unavailable: bool,
}

impl MemorySurfaceHost {
    /// Host whose surfaces finish loading as soon as they are materialized
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every load until [`Self::finish_loading`] is called
    pub fn manual_loading(mut self) -> Self {
        self.manual_load = true;
        self
    }

    /// Refuse to create surfaces
    pub fn failing_creation(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Create surfaces whose content handle is missing
    pub fn without_content(mut self) -> Self {
        self.content_unavailable = true;
        self
    }

    /// Fire the load notification of a surface held by manual loading.
    /// Returns false if the surface has no pending load.
    pub fn finish_loading(&self, id: SurfaceId) -> bool {
        let mut state = self.shared.lock();
        match state.pending_loads.remove(&id) {
            Some(sender) => {
                state.events.push(SurfaceEvent::Loaded(id));
                sender.send(()).is_ok()
            }
            None => false,
        }
    }

    /// Drop a pending load without firing it
    pub fn abandon_loading(&self, id: SurfaceId) -> bool {
        self.shared.lock().pending_loads.remove(&id).is_some()
    }

    /// Surfaces still waiting for their load notification
    pub fn pending_loads(&self) -> Vec<SurfaceId> {
        self.shared.lock().pending_loads.keys().copied().collect()
    }

    /// Everything recorded so far, in order
    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.shared.lock().events.clone()
    }

    /// Events of one surface, in order
    pub fn events_for(&self, id: SurfaceId) -> Vec<SurfaceEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.surface() == id)
            .collect()
    }

    /// Document materialized on a surface
    pub fn document(&self, id: SurfaceId) -> Option<String> {
        self.shared.lock().documents.get(&id).cloned()
    }

    /// How many times a surface has been removed
    pub fn removal_count(&self, id: SurfaceId) -> usize {
        self.shared
            .lock()
            .events
            .iter()
            .filter(|event| **event == SurfaceEvent::Removed(id))
            .count()
    }
}

impl SurfaceHost for MemorySurfaceHost {
    fn create_surface(&self) -> Result<Box<dyn PrintSurface>, SurfaceError> {
        if self.fail_create {
            return Err(SurfaceError::CreateFailed("surface creation disabled".to_string()));
        }
        let id = SurfaceId::new();
        let mut state = self.shared.lock();
        state.events.push(SurfaceEvent::Created(id));
        state.attached.push(id);
        Ok(Box::new(MemorySurface {
            id,
            shared: self.shared.clone(),
            manual_load: self.manual_load,
            content_unavailable: self.content_unavailable,
        }))
    }

    fn remove_surface(&self, id: SurfaceId) {
        let mut state = self.shared.lock();
        state.attached.retain(|attached| *attached != id);
        state.pending_loads.remove(&id);
        state.events.push(SurfaceEvent::Removed(id));
    }

    fn attached(&self) -> usize {
        self.shared.lock().attached.len()
    }
}

struct MemorySurface {
    id: SurfaceId,
    shared: Arc<Shared>,
    manual_load: bool,
    content_unavailable: bool,
}

impl PrintSurface for MemorySurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn materialize(&mut self, document: &str) -> Result<LoadSignal, SurfaceError> {
        if self.content_unavailable {
            return Err(SurfaceError::ContentUnavailable);
        }
        let (sender, signal) = oneshot::channel();
        let mut state = self.shared.lock();
        state.documents.insert(self.id, document.to_string());
        state.events.push(SurfaceEvent::Materialized(self.id));
        if self.manual_load {
            state.pending_loads.insert(self.id, sender);
        } else {
            state.events.push(SurfaceEvent::Loaded(self.id));
            let _ = sender.send(());
        }
        Ok(signal)
    }

    fn print(&mut self) -> Result<(), SurfaceError> {
        self.shared.lock().events.push(SurfaceEvent::Printed(self.id));
        Ok(())
    }
}
