use std::fs;
use std::path::{Path, PathBuf};

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::BoxFuture;
use image::RgbaImage;
use uuid::Uuid;

use crate::error::ExportError;

/// Called exactly once when the library has finished with an image.
pub type WriteCompletion = Box<dyn FnOnce(Result<(), ExportError>) + Send>;

/// A photo album that accepts one flattened image per call.
pub trait PhotoLibrary: Send + Sync {
    /// Starts writing `image` and reports the outcome through `on_complete`.
    /// Every successful call adds one asset.
    fn write_image(&self, image: RgbaImage, on_complete: WriteCompletion);
}

/// Hands `image` to `library` and resolves once the library reports back.
/// A single attempt; the library's error is returned as is.
pub fn commit_to_photo_library(
    library: &dyn PhotoLibrary,
    image: RgbaImage,
) -> BoxFuture<'static, Result<(), ExportError>> {
    let (tx, rx) = oneshot::channel();
    library.write_image(
        image,
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
    );
    rx.map(|reply| reply.unwrap_or_else(|canceled| Err(canceled.into())))
        .boxed()
}

/// Album backed by a directory of PNG files.
#[derive(Debug, Clone)]
pub struct DirectoryPhotoLibrary {
    dir: PathBuf,
}

impl DirectoryPhotoLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_png(dir: &Path, image: &RgbaImage) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.png", Uuid::new_v4()));
        image.save_with_format(&path, image::ImageFormat::Png)?;
        Ok(path)
    }
}

impl PhotoLibrary for DirectoryPhotoLibrary {
    fn write_image(&self, image: RgbaImage, on_complete: WriteCompletion) {
        let dir = self.dir.clone();
        let spawned = std::thread::Builder::new()
            .name("photo-library".to_owned())
            .spawn(move || {
                let result = Self::write_png(&dir, &image).map(|path| {
                    log::info!("Saved image to {}", path.display());
                });
                on_complete(result);
            });

        // Dropping the completion resolves the caller with `Interrupted`
        if let Err(err) = spawned {
            log::error!("Failed to start photo library writer: {}", err);
        }
    }
}
