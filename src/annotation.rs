//! Freehand drawing surface producing an RGBA annotation layer.

use image::{Rgba, RgbaImage};

pub const MIN_STROKE_WIDTH: u32 = 1;
pub const MAX_STROKE_WIDTH: u32 = 25;

/// Pen colors offered by the markup view, cycled with a key
pub const PALETTE: [(&str, [u8; 3]); 6] = [
    ("Schwarz", [0, 0, 0]),
    ("Rot", [220, 30, 30]),
    ("Blau", [30, 80, 220]),
    ("Grün", [20, 160, 60]),
    ("Orange", [255, 165, 0]),
    ("Magenta", [200, 0, 200]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brush {
    pub color: Rgba<u8>,
    pub width: u32,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            color: Rgba([0, 0, 0, 255]),
            width: MIN_STROKE_WIDTH,
        }
    }
}

impl Brush {
    pub fn new(color: Rgba<u8>, width: u32) -> Self {
        Self {
            color,
            width: width.clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH),
        }
    }

    pub fn wider(&mut self) {
        self.width = (self.width + 1).min(MAX_STROKE_WIDTH);
    }

    pub fn thinner(&mut self) {
        self.width = self.width.saturating_sub(1).max(MIN_STROKE_WIDTH);
    }
}

/// Parse `#rrggbb` (or `rrggbb`) into an opaque color.
pub fn parse_hex_color(hex: &str) -> Option<Rgba<u8>> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Rgba([channel(0)?, channel(2)?, channel(4)?, 255]))
}

/// A transparent layer that strokes are painted onto
#[derive(Debug, Clone)]
pub struct Canvas {
    layer: RgbaImage,
    strokes: usize,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            layer: RgbaImage::new(width.max(1), height.max(1)),
            strokes: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.layer.width()
    }

    pub fn height(&self) -> u32 {
        self.layer.height()
    }

    pub fn layer(&self) -> &RgbaImage {
        &self.layer
    }

    pub fn is_blank(&self) -> bool {
        self.strokes == 0
    }

    pub fn clear(&mut self) {
        self.layer = RgbaImage::new(self.layer.width(), self.layer.height());
        self.strokes = 0;
    }

    /// Start a new size, discarding the drawing when the size changes.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width.max(1), height.max(1)) != self.layer.dimensions() {
            *self = Self::new(width, height);
        }
    }

    /// Paint a line of brush dabs from `from` to `to` (inclusive).
    /// Points outside the canvas are clipped.
    pub fn stroke(&mut self, from: (i32, i32), to: (i32, i32), brush: &Brush) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.dab(x, y, brush);
            if (x, y) == to {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
        self.strokes += 1;
    }

    /// Paint a filled disc of the brush width centered on (cx, cy).
    fn dab(&mut self, cx: i32, cy: i32, brush: &Brush) {
        let width = brush.width.max(MIN_STROKE_WIDTH) as i32;
        // Odd widths are centered on the pixel, even widths lean up-left
        let lo = -(width / 2);
        let hi = lo + width - 1;
        let radius = width as f32 / 2.0;
        let center = if width % 2 == 0 { 0.5 } else { 0.0 };

        for oy in lo..=hi {
            for ox in lo..=hi {
                let (fx, fy) = (ox as f32 + center, oy as f32 + center);
                if fx * fx + fy * fy > radius * radius {
                    continue;
                }
                let (px, py) = (cx + ox, cy + oy);
                if px < 0 || py < 0 || px >= self.layer.width() as i32 || py >= self.layer.height() as i32 {
                    continue;
                }
                self.layer.put_pixel(px as u32, py as u32, brush.color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_canvas_is_transparent() {
        let canvas = Canvas::new(20, 10);
        assert!(canvas.is_blank());
        assert!(canvas.layer().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_stroke_paints_endpoints() {
        let mut canvas = Canvas::new(20, 20);
        let brush = Brush::default();
        canvas.stroke((2, 3), (15, 9), &brush);

        assert!(!canvas.is_blank());
        assert_eq!(canvas.layer().get_pixel(2, 3), &brush.color);
        assert_eq!(canvas.layer().get_pixel(15, 9), &brush.color);
        assert_eq!(canvas.layer().get_pixel(0, 19).0[3], 0);
    }

    #[test]
    fn test_single_point_stroke() {
        let mut canvas = Canvas::new(5, 5);
        canvas.stroke((2, 2), (2, 2), &Brush::default());

        let painted = canvas.layer().pixels().filter(|p| p.0[3] == 255).count();
        assert_eq!(painted, 1);
    }

    #[test]
    fn test_wide_brush_covers_neighbours() {
        let mut canvas = Canvas::new(21, 21);
        let brush = Brush::new(Rgba([255, 0, 0, 255]), 5);
        canvas.stroke((10, 10), (10, 10), &brush);

        assert_eq!(canvas.layer().get_pixel(12, 10), &brush.color);
        assert_eq!(canvas.layer().get_pixel(10, 8), &brush.color);
        assert_eq!(canvas.layer().get_pixel(13, 10).0[3], 0);
        // Disc, not square
        assert_eq!(canvas.layer().get_pixel(12, 12).0[3], 0);
    }

    #[test]
    fn test_stroke_is_clipped() {
        let mut canvas = Canvas::new(4, 4);
        canvas.stroke((-5, 1), (10, 1), &Brush::new(Rgba([0, 0, 0, 255]), 3));

        assert!((0..4).all(|x| canvas.layer().get_pixel(x, 1).0[3] == 255));
    }

    #[test]
    fn test_clear_and_resize() {
        let mut canvas = Canvas::new(8, 8);
        canvas.stroke((0, 0), (7, 7), &Brush::default());
        canvas.clear();
        assert!(canvas.is_blank());
        assert!(canvas.layer().pixels().all(|p| p.0[3] == 0));

        canvas.stroke((0, 0), (7, 7), &Brush::default());
        canvas.resize(8, 8);
        assert!(!canvas.is_blank());
        canvas.resize(16, 8);
        assert!(canvas.is_blank());
        assert_eq!(canvas.width(), 16);
    }

    #[test]
    fn test_brush_width_bounds() {
        let mut brush = Brush::new(Rgba([0, 0, 0, 255]), 40);
        assert_eq!(brush.width, MAX_STROKE_WIDTH);
        brush.wider();
        assert_eq!(brush.width, MAX_STROKE_WIDTH);

        let mut brush = Brush::default();
        brush.thinner();
        assert_eq!(brush.width, MIN_STROKE_WIDTH);
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#000000"), Some(Rgba([0, 0, 0, 255])));
        assert_eq!(parse_hex_color("ffa500"), Some(Rgba([255, 165, 0, 255])));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#gggggg"), None);
    }
}
