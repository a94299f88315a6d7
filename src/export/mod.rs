mod library;
mod raster;

use std::sync::Arc;

use egui::Vec2;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::executor::ThreadPool;
use futures::future::BoxFuture;
use image::RgbaImage;

use crate::document::DrawingDocument;
use crate::error::ExportError;

pub use library::{DirectoryPhotoLibrary, PhotoLibrary, WriteCompletion, commit_to_photo_library};
pub use raster::{flatten_composited, flatten_strokes_only, flatten_strokes_stretched};

/// Which layers end up in the exported image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportLayers {
    /// The drawn strokes on a transparent background
    StrokesOnly,
    /// The strokes over the background snapshot
    Composited,
}

/// Everything needed to flatten one export, detached from the live session.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub layers: ExportLayers,
    pub document: DrawingDocument,
    pub background: Option<Arc<RgbaImage>>,
    /// Canvas size in logical points
    pub canvas_size: Vec2,
    pub pixels_per_point: f32,
}

impl ExportJob {
    /// Produces the image to hand to the library.
    ///
    /// When compositing, the canvas is stretched over the whole background, the
    /// same way the backdrop is stretched to fill the canvas on screen.
    pub fn flatten(&self) -> Result<RgbaImage, ExportError> {
        match self.layers {
            ExportLayers::StrokesOnly => Ok(flatten_strokes_only(
                &self.document,
                self.canvas_size,
                self.pixels_per_point,
            )),
            ExportLayers::Composited => {
                let background = self
                    .background
                    .as_deref()
                    .ok_or(ExportError::MissingBackground)?;
                let strokes = flatten_strokes_stretched(
                    &self.document,
                    self.canvas_size,
                    [background.width(), background.height()],
                );
                Ok(flatten_composited(background, &strokes))
            }
        }
    }
}

/// Flattens drawings and commits them to a photo library off the UI thread.
pub struct ExportCompositor {
    pool: ThreadPool,
    library: Arc<dyn PhotoLibrary>,
}

impl std::fmt::Debug for ExportCompositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportCompositor")
            .field("pool", &self.pool)
            .field("library", &"<dyn PhotoLibrary>")
            .finish()
    }
}

impl ExportCompositor {
    pub fn new(library: Arc<dyn PhotoLibrary>) -> Result<Self, ExportError> {
        let pool = ThreadPool::builder()
            .pool_size(1)
            .name_prefix("export-")
            .create()
            .map_err(ExportError::Worker)?;
        Ok(Self { pool, library })
    }

    /// Flattens `job` and writes the result to the library.
    pub fn export(&self, job: ExportJob) -> BoxFuture<'static, Result<(), ExportError>> {
        let (tx, rx) = oneshot::channel();
        let library = Arc::clone(&self.library);

        self.pool.spawn_ok(async move {
            let result = match job.flatten() {
                Ok(image) => {
                    log::debug!(
                        "Flattened {:?} export at {}x{}",
                        job.layers,
                        image.width(),
                        image.height()
                    );
                    commit_to_photo_library(library.as_ref(), image).await
                }
                Err(err) => Err(err),
            };
            if let Err(err) = &result {
                log::error!("Could not save image to album: {}", err);
            }
            let _ = tx.send(result);
        });

        rx.map(|reply| reply.unwrap_or_else(|canceled| Err(canceled.into())))
            .boxed()
    }
}
