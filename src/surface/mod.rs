//! Isolated rendering surfaces
//!
//! An export materializes its document on a short-lived, off-screen surface,
//! waits for the surface to report that loading finished, prints, and then
//! hands the surface back to its host. Hosts decide what a surface is:
//! - `file`: an HTML file handed to the platform viewer for printing
//! - `memory`: an in-process surface that records its lifecycle

pub mod file;
pub mod memory;

use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::SurfaceError;

pub use file::FileSurfaceHost;
pub use memory::{MemorySurfaceHost, SurfaceEvent};

/// Unique identifier for a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(Uuid);

impl SurfaceId {
    /// Create a new unique surface ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One-shot "surface finished loading" notification
pub type LoadSignal = oneshot::Receiver<()>;

/// An off-screen surface able to show and print one document
pub trait PrintSurface: Send {
    fn id(&self) -> SurfaceId;

    /// Start loading `document`. Returns the notification that fires once
    /// the document is fully loaded.
    fn materialize(&mut self, document: &str) -> Result<LoadSignal, SurfaceError>;

    /// Open the print dialog for the loaded document
    fn print(&mut self) -> Result<(), SurfaceError>;
}

/// Creates surfaces and keeps them attached until they are removed
pub trait SurfaceHost: Send + Sync {
    fn create_surface(&self) -> Result<Box<dyn PrintSurface>, SurfaceError>;

    /// Detach and destroy a surface. Called exactly once per surface.
    fn remove_surface(&self, id: SurfaceId);

    /// Number of surfaces currently attached
    fn attached(&self) -> usize;
}

/// Owns a surface for the duration of one export and removes it from its
/// host exactly once, either through [`SurfaceLease::release`] or on drop.
pub struct SurfaceLease {
    id: SurfaceId,
    surface: Box<dyn PrintSurface>,
    host: Option<Arc<dyn SurfaceHost>>,
}

impl SurfaceLease {
    /// Create a fresh surface on `host`
    pub fn acquire(host: Arc<dyn SurfaceHost>) -> Result<Self, SurfaceError> {
        let surface = host.create_surface()?;
        let id = surface.id();
        log::debug!("Attached export surface {}", id);
        Ok(Self {
            id,
            surface,
            host: Some(host),
        })
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn surface_mut(&mut self) -> &mut dyn PrintSurface {
        self.surface.as_mut()
    }

    /// Remove the surface from its host now
    pub fn release(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if let Some(host) = self.host.take() {
            host.remove_surface(self.id);
            log::debug!("Removed export surface {}", self.id);
        }
    }
}

impl Drop for SurfaceLease {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for SurfaceLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceLease")
            .field("id", &self.id)
            .field("attached", &self.host.is_some())
            .finish()
    }
}
