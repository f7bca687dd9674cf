//! Flatten a freehand annotation layer onto a floor plan.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, Rgba32FImage, RgbImage, RgbaImage};

/// Composite `annotation` over `background` and drop the alpha channel.
///
/// The annotation is stretched to the background's exact size first, so a
/// drawing surface of any resolution can be used. Marks are blended with
/// source-over alpha compositing; fully transparent annotation pixels leave
/// the background untouched. The result is always opaque.
pub fn composite(background: &DynamicImage, annotation: &RgbaImage) -> RgbImage {
    let (width, height) = (background.width(), background.height());

    let resized;
    let layer = if annotation.dimensions() == (width, height) {
        annotation
    } else {
        resized = resize_premultiplied(annotation, width, height);
        &resized
    };

    let mut canvas = background.to_rgba8();
    imageops::overlay(&mut canvas, layer, 0, 0);

    DynamicImage::ImageRgba8(canvas).to_rgb8()
}

/// Resample in premultiplied alpha so transparent pixels, which are
/// stored as black, do not darken the edges of strokes.
fn resize_premultiplied(layer: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let premultiplied = Rgba32FImage::from_fn(layer.width(), layer.height(), |x, y| {
        let [r, g, b, a] = layer.get_pixel(x, y).0;
        let alpha = a as f32 / 255.0;
        Rgba([
            r as f32 / 255.0 * alpha,
            g as f32 / 255.0 * alpha,
            b as f32 / 255.0 * alpha,
            alpha,
        ])
    });

    let scaled = imageops::resize(&premultiplied, width, height, FilterType::CatmullRom);

    RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = scaled.get_pixel(x, y).0;
        let alpha = a.clamp(0.0, 1.0);
        if alpha <= f32::EPSILON {
            return Rgba([0, 0, 0, 0]);
        }
        let channel = |c: f32| ((c / alpha).clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba([channel(r), channel(g), channel(b), (alpha * 255.0).round() as u8])
    })
}
