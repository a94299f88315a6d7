use std::path::Path;

use image::{Rgba, RgbaImage};

/// The snapshot drawn behind the canvas and used for composited exports.
///
/// Decodes `path` when given; falls back to a generated backdrop of
/// `fallback_size` pixels when there is no path or it cannot be decoded.
pub fn load_backdrop(path: Option<&Path>, fallback_size: [u32; 2]) -> RgbaImage {
    if let Some(path) = path {
        match image::open(path) {
            Ok(img) => {
                log::debug!(
                    "Loaded backdrop {}: {}x{}",
                    path.display(),
                    img.width(),
                    img.height()
                );
                return img.to_rgba8();
            }
            Err(err) => {
                log::error!("Failed to decode backdrop {}: {}", path.display(), err);
            }
        }
    }
    generated_backdrop(fallback_size)
}

/// Soft vertical gradient with a faint grid, opaque everywhere.
pub fn generated_backdrop(size: [u32; 2]) -> RgbaImage {
    const GRID: u32 = 32;
    let [width, height] = [size[0].max(1), size[1].max(1)];

    RgbaImage::from_fn(width, height, |x, y| {
        let t = y as f32 / height as f32;
        let mix = |top: f32, bottom: f32| (top + (bottom - top) * t).round() as u8;
        let mut pixel = [mix(250.0, 222.0), mix(248.0, 232.0), mix(240.0, 246.0)];
        if x % GRID == 0 || y % GRID == 0 {
            for channel in &mut pixel {
                *channel = channel.saturating_sub(18);
            }
        }
        Rgba([pixel[0], pixel[1], pixel[2], 255])
    })
}
