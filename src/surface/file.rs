//! File-backed surface host
//!
//! Each surface is an HTML file in a private directory. The document counts
//! as loaded once it is fully written and flushed to disk; printing hands the
//! file to the platform viewer, which opens the print dialog as soon as the
//! page has loaded.
//!
//! The viewer reads the file on its own schedule, long after the export's
//! teardown grace has run out. Removing a surface whose file was handed to
//! the viewer therefore only detaches it; the file stays on disk until a
//! later sweep finds it older than the host's retention period.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;

use super::{LoadSignal, PrintSurface, SurfaceHost, SurfaceId};
use crate::config::Config;
use crate::error::SurfaceError;

/// Opens a materialized document in a viewer that can print it
pub type Launcher = Arc<dyn Fn(&Path) -> io::Result<()> + Send + Sync>;

/// How long a document handed to the viewer is kept before a sweep deletes it
pub const DEFAULT_VIEWER_RETENTION: Duration = Duration::from_secs(10 * 60);

/// Opens the print dialog once the page, including deferred scripts, loaded
pub const PRINT_ON_LOAD_SCRIPT: &str =
    "<script>window.addEventListener('load', () => window.print());</script>";

#[derive(Debug, Default)]
struct HostFiles {
    attached: HashSet<SurfaceId>,
    /// Surfaces whose file the viewer may still be reading
    handed_off: HashSet<SurfaceId>,
}

/// Surface host writing documents under a directory
pub struct FileSurfaceHost {
    dir: PathBuf,
    launcher: Launcher,
    retention: Duration,
    files: Arc<Mutex<HostFiles>>,
}

impl FileSurfaceHost {
    /// Host rooted at `dir`, printing through the platform viewer
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            launcher: Arc::new(|path: &Path| open::that(path)),
            retention: DEFAULT_VIEWER_RETENTION,
            files: Arc::new(Mutex::new(HostFiles::default())),
        }
    }

    /// Host in the application's cache directory
    pub fn in_cache_dir() -> Result<Self, SurfaceError> {
        let dir = Config::cache_dir()
            .map_err(|e| SurfaceError::CreateFailed(e.to_string()))?
            .join("surfaces");
        Ok(Self::new(dir))
    }

    /// Replace the viewer used for printing
    pub fn with_launcher(mut self, launcher: Launcher) -> Self {
        self.launcher = launcher;
        self
    }

    /// Keep handed-off documents for `retention` before sweeping them
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of a surface's document
    pub fn path_for(&self, id: SurfaceId) -> PathBuf {
        self.dir.join(format!("{}.html", id))
    }

    /// Delete documents older than the retention period that no attached
    /// surface owns. Returns the number of files removed.
    pub fn sweep(&self) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
            Err(e) => {
                log::warn!("Could not scan {}: {}", self.dir.display(), e);
                return 0;
            }
        };

        let owned: HashSet<PathBuf> = self
            .files()
            .attached
            .iter()
            .map(|id| self.path_for(*id))
            .collect();

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "html") || owned.contains(&path) {
                continue;
            }
            if !self.is_expired(&entry) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    log::debug!("Swept stale surface document {}", path.display());
                    removed += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Could not remove {}: {}", path.display(), e),
            }
        }
        removed
    }

    fn is_expired(&self, entry: &fs::DirEntry) -> bool {
        entry
            .metadata()
            .and_then(|metadata| metadata.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .map_or(false, |age| age >= self.retention)
    }

    fn files(&self) -> MutexGuard<'_, HostFiles> {
        lock_files(&self.files)
    }
}

fn lock_files(files: &Mutex<HostFiles>) -> MutexGuard<'_, HostFiles> {
    files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Insert the print-on-load handler before the closing body tag
fn with_print_on_load(document: &str) -> String {
    match document.rfind("</body>") {
        Some(at) => {
            let mut out = String::with_capacity(document.len() + PRINT_ON_LOAD_SCRIPT.len() + 1);
            out.push_str(&document[..at]);
            out.push_str(PRINT_ON_LOAD_SCRIPT);
            out.push('\n');
            out.push_str(&document[at..]);
            out
        }
        None => format!("{}{}", document, PRINT_ON_LOAD_SCRIPT),
    }
}

impl SurfaceHost for FileSurfaceHost {
    fn create_surface(&self) -> Result<Box<dyn PrintSurface>, SurfaceError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            SurfaceError::CreateFailed(format!("{}: {}", self.dir.display(), e))
        })?;
        self.sweep();

        let id = SurfaceId::new();
        self.files().attached.insert(id);
        Ok(Box::new(FileSurface {
            id,
            path: self.path_for(id),
            launcher: self.launcher.clone(),
            files: self.files.clone(),
            loaded: false,
        }))
    }

    fn remove_surface(&self, id: SurfaceId) {
        let handed_off = {
            let mut files = self.files();
            files.attached.remove(&id);
            files.handed_off.remove(&id)
        };
        let path = self.path_for(id);
        if handed_off {
            log::debug!("Leaving {} for the viewer", path.display());
            return;
        }
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove {}: {}", path.display(), e),
        }
    }

    fn attached(&self) -> usize {
        self.files().attached.len()
    }
}

struct FileSurface {
    id: SurfaceId,
    path: PathBuf,
    launcher: Launcher,
    files: Arc<Mutex<HostFiles>>,
    loaded: bool,
}

impl PrintSurface for FileSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn materialize(&mut self, document: &str) -> Result<LoadSignal, SurfaceError> {
        let (sender, signal) = oneshot::channel();
        let mut file = fs::File::create(&self.path)?;
        file.write_all(with_print_on_load(document).as_bytes())?;
        file.sync_all()?;
        self.loaded = true;
        let _ = sender.send(());
        Ok(signal)
    }

    fn print(&mut self) -> Result<(), SurfaceError> {
        if !self.loaded {
            return Err(SurfaceError::ContentUnavailable);
        }
        (self.launcher)(&self.path).map_err(|e| SurfaceError::PrintFailed(e.to_string()))?;
        lock_files(&self.files).handed_off.insert(self.id);
        Ok(())
    }
}
