use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::executor::ThreadPool;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::document::DrawingDocument;
use crate::error::{PersistenceError, PersistenceResult};
use crate::util::time;

/// Asynchronous load/save of the single persisted drawing.
///
/// Implementations must never run the I/O on the caller's thread and must not
/// let a load and a save overlap.
pub trait DocumentStore: Send + Sync {
    /// Resolves to an empty document when nothing has been saved yet.
    fn load(&self) -> BoxFuture<'static, PersistenceResult<DrawingDocument>>;

    /// Replaces whatever was saved before.
    fn save(&self, document: DrawingDocument) -> BoxFuture<'static, PersistenceResult<()>>;
}

/// The on-disk envelope around a drawing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedDocument {
    /// Version of the application that wrote the file
    pub version: String,
    /// Seconds since the UNIX epoch at save time
    pub saved_at: u64,
    pub document: DrawingDocument,
}

impl PersistedDocument {
    pub fn new(document: DrawingDocument) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            saved_at: time::timestamp_secs(),
            document,
        }
    }

    /// Unwraps the drawing, noting files written by another version.
    pub fn into_document(self) -> DrawingDocument {
        if self.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "Drawing was saved by version {} (current {})",
                self.version,
                env!("CARGO_PKG_VERSION")
            );
        }
        self.document
    }
}

/// Reads and writes the drawing at one fixed path on a dedicated worker thread.
#[derive(Debug)]
pub struct PersistenceGateway {
    path: PathBuf,
    pool: ThreadPool,
    io_lock: Arc<Mutex<()>>,
}

impl PersistenceGateway {
    pub fn new(path: impl Into<PathBuf>) -> PersistenceResult<Self> {
        // One worker keeps loads and saves in submission order
        let pool = ThreadPool::builder()
            .pool_size(1)
            .name_prefix("persistence-")
            .create()
            .map_err(PersistenceError::Worker)?;

        Ok(Self {
            path: path.into(),
            pool,
            io_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn run<T, F>(&self, job: F) -> BoxFuture<'static, PersistenceResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> PersistenceResult<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let path = self.path.clone();
        let io_lock = Arc::clone(&self.io_lock);

        self.pool.spawn_ok(async move {
            let result = {
                let _guard = io_lock.lock();
                job(&path)
            };
            // The receiver may be gone if the session was torn down
            let _ = tx.send(result);
        });

        rx.map(|reply| reply.unwrap_or_else(|canceled| Err(canceled.into())))
            .boxed()
    }
}

impl DocumentStore for PersistenceGateway {
    fn load(&self) -> BoxFuture<'static, PersistenceResult<DrawingDocument>> {
        self.run(|path| {
            read_document(path).inspect_err(|err| {
                log::error!("Could not load drawing: {}", err);
            })
        })
    }

    fn save(&self, document: DrawingDocument) -> BoxFuture<'static, PersistenceResult<()>> {
        self.run(move |path| {
            write_document(path, document).inspect_err(|err| {
                log::error!("Could not save drawing: {}", err);
            })
        })
    }
}

/// Blocking read. A missing file is an empty drawing.
pub fn read_document(path: &Path) -> PersistenceResult<DrawingDocument> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            log::debug!("No saved drawing at {}", path.display());
            return Ok(DrawingDocument::new());
        }
        Err(source) => {
            return Err(PersistenceError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let persisted: PersistedDocument =
        serde_json::from_slice(&bytes).map_err(PersistenceError::Decode)?;
    let document = persisted.into_document();
    log::debug!(
        "Loaded drawing with {} strokes from {}",
        document.len(),
        path.display()
    );
    Ok(document)
}

/// Blocking write through a sibling temporary file, renamed over `path`.
pub fn write_document(path: &Path, document: DrawingDocument) -> PersistenceResult<()> {
    let write_err = |source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };

    let stroke_count = document.len();
    let bytes = serde_json::to_vec(&PersistedDocument::new(document))
        .map_err(PersistenceError::Encode)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, bytes).map_err(write_err)?;
    fs::rename(&tmp_path, path).map_err(write_err)?;

    log::debug!("Saved drawing with {} strokes to {}", stroke_count, path.display());
    Ok(())
}
