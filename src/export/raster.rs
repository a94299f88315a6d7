use egui::{Pos2, Vec2, pos2, vec2};
use image::{Pixel, Rgba, RgbaImage};

use crate::document::DrawingDocument;
use crate::stroke::{Stroke, distance_to_segment};

/// Rasterizes the stroke layer alone onto a transparent image.
///
/// `canvas_size` is in logical points; the image is `canvas_size * pixels_per_point`
/// pixels, with stroke coordinates scaled the same way.
pub fn flatten_strokes_only(
    document: &DrawingDocument,
    canvas_size: Vec2,
    pixels_per_point: f32,
) -> RgbaImage {
    let width = (canvas_size.x * pixels_per_point).round().max(1.0) as u32;
    let height = (canvas_size.y * pixels_per_point).round().max(1.0) as u32;
    rasterize_layer(document, [width, height], Vec2::splat(pixels_per_point))
}

/// Rasterizes the stroke layer onto a transparent `size` image, stretching the
/// canvas to fill it the way the backdrop is stretched on screen.
///
/// Stroke positions follow each axis separately; thickness uses the geometric
/// mean of the two scales.
pub fn flatten_strokes_stretched(
    document: &DrawingDocument,
    canvas_size: Vec2,
    size: [u32; 2],
) -> RgbaImage {
    let [width, height] = [size[0].max(1), size[1].max(1)];
    let scale = if canvas_size.x > 0.0 && canvas_size.y > 0.0 {
        vec2(width as f32 / canvas_size.x, height as f32 / canvas_size.y)
    } else {
        Vec2::splat(1.0)
    };
    rasterize_layer(document, [width, height], scale)
}

fn rasterize_layer(document: &DrawingDocument, size: [u32; 2], scale: Vec2) -> RgbaImage {
    let mut layer = RgbaImage::new(size[0], size[1]);
    for stroke in document.strokes() {
        rasterize_stroke(&mut layer, stroke, scale);
    }
    layer
}

/// Draws `background`, then `strokes` over it from the same origin.
/// The result has the background's size.
pub fn flatten_composited(background: &RgbaImage, strokes: &RgbaImage) -> RgbaImage {
    let mut flattened = background.clone();
    image::imageops::overlay(&mut flattened, strokes, 0, 0);
    flattened
}

/// Pixel-space coverage for one stroke, limited to the stroke's bounding box.
struct CoverageMask {
    origin_x: u32,
    origin_y: u32,
    width: u32,
    height: u32,
    coverage: Vec<f32>,
}

impl CoverageMask {
    fn for_points(points: &[Pos2], radius: f32, image_width: u32, image_height: u32) -> Option<Self> {
        let (mut min, mut max) = (points[0], points[0]);
        for p in points {
            min = min.min(*p);
            max = max.max(*p);
        }
        let reach = radius + 1.0;
        let x0 = (min.x - reach).floor().max(0.0) as u32;
        let y0 = (min.y - reach).floor().max(0.0) as u32;
        let x1 = ((max.x + reach).ceil().max(0.0) as u32).min(image_width);
        let y1 = ((max.y + reach).ceil().max(0.0) as u32).min(image_height);

        if x0 >= x1 || y0 >= y1 {
            return None;
        }

        let (width, height) = (x1 - x0, y1 - y0);
        Some(Self {
            origin_x: x0,
            origin_y: y0,
            width,
            height,
            coverage: vec![0.0; (width * height) as usize],
        })
    }

    // Capsule from a to b with round ends, anti-aliased over one pixel
    fn add_segment(&mut self, a: Pos2, b: Pos2, radius: f32) {
        let reach = radius + 1.0;
        let left = (a.x.min(b.x) - reach).floor().max(self.origin_x as f32) as u32;
        let top = (a.y.min(b.y) - reach).floor().max(self.origin_y as f32) as u32;
        let right = ((a.x.max(b.x) + reach).ceil().max(0.0) as u32).min(self.origin_x + self.width);
        let bottom = ((a.y.max(b.y) + reach).ceil().max(0.0) as u32).min(self.origin_y + self.height);

        for y in top..bottom {
            for x in left..right {
                let center = pos2(x as f32 + 0.5, y as f32 + 0.5);
                let value = (radius + 0.5 - distance_to_segment(center, a, b)).clamp(0.0, 1.0);
                if value > 0.0 {
                    let index = ((y - self.origin_y) * self.width + (x - self.origin_x)) as usize;
                    let cell = &mut self.coverage[index];
                    *cell = cell.max(value);
                }
            }
        }
    }

    fn composite(&self, layer: &mut RgbaImage, color: [u8; 4]) {
        let [r, g, b, a] = color;
        for row in 0..self.height {
            for col in 0..self.width {
                let value = self.coverage[(row * self.width + col) as usize];
                if value <= 0.0 {
                    continue;
                }
                let alpha = (a as f32 * value).round() as u8;
                layer
                    .get_pixel_mut(self.origin_x + col, self.origin_y + row)
                    .blend(&Rgba([r, g, b, alpha]));
            }
        }
    }
}

fn rasterize_stroke(layer: &mut RgbaImage, stroke: &Stroke, scale: Vec2) {
    let points: Vec<Pos2> = stroke
        .points()
        .iter()
        .map(|p| pos2(p.x * scale.x, p.y * scale.y))
        .collect();
    if points.is_empty() {
        return;
    }

    let radius = (stroke.thickness() * (scale.x * scale.y).sqrt() * 0.5).max(0.5);
    let Some(mut mask) = CoverageMask::for_points(&points, radius, layer.width(), layer.height())
    else {
        return;
    };

    if points.len() == 1 {
        mask.add_segment(points[0], points[0], radius);
    } else {
        for pair in points.windows(2) {
            mask.add_segment(pair[0], pair[1], radius);
        }
    }

    mask.composite(layer, stroke.color().to_srgba_unmultiplied());
}
