//! Plan markup view: the selected plan with a freehand layer drawn by mouse.

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};
use ratatui_image::{picker::Picker, protocol::StatefulProtocol, Resize, StatefulImage};

use mangel::annotation::{Brush, Canvas, PALETTE};
use mangel::compositor;
use mangel::PlanMarkup;

pub struct MarkupView {
    pub plan_name: String,
    plan: DynamicImage,
    /// Plan scaled to the canvas size
    preview: Option<DynamicImage>,
    protocol: Option<StatefulProtocol>,
    pub canvas: Canvas,
    pub brush: Brush,
    palette_index: Option<usize>,
    /// Screen area the canvas is shown in
    area: Rect,
    cell_size: (u16, u16),
    last_point: Option<(i32, i32)>,
}

impl MarkupView {
    pub fn new(plan_name: String, plan: DynamicImage, brush: Brush) -> Self {
        let palette_index = PALETTE
            .iter()
            .position(|(_, rgb)| [brush.color.0[0], brush.color.0[1], brush.color.0[2]] == *rgb);
        Self {
            plan_name,
            plan,
            preview: None,
            protocol: None,
            canvas: Canvas::new(1, 1),
            brush,
            palette_index,
            area: Rect::default(),
            cell_size: (1, 1),
            last_point: None,
        }
    }

    /// Size the canvas to the plan fitted into `area`. A changed size
    /// starts a fresh drawing.
    fn fit(&mut self, area: Rect, picker: &Picker) {
        let (cell_w, cell_h) = picker.font_size();
        let (cell_w, cell_h) = (cell_w.max(1), cell_h.max(1));
        let max_w = area.width as u32 * cell_w as u32;
        let max_h = area.height as u32 * cell_h as u32;
        let (width, height) = fit_size(self.plan.width(), self.plan.height(), max_w, max_h);

        self.area = area;
        self.cell_size = (cell_w, cell_h);

        let stale = self.preview.is_none()
            || (self.canvas.width(), self.canvas.height()) != (width, height);
        if stale {
            self.canvas.resize(width, height);
            self.preview = Some(self.plan.resize_exact(width, height, FilterType::Triangle));
            self.protocol = None;
        }
    }

    /// Map a terminal cell to the canvas pixel at its center
    fn cell_to_canvas(&self, column: u16, row: u16) -> Option<(i32, i32)> {
        if !self.area.contains(Position::new(column, row)) {
            return None;
        }
        let (cell_w, cell_h) = self.cell_size;
        let x = (column - self.area.x) as i32 * cell_w as i32 + cell_w as i32 / 2;
        let y = (row - self.area.y) as i32 * cell_h as i32 + cell_h as i32 / 2;
        Some((x, y))
    }

    pub fn pen_down(&mut self, column: u16, row: u16) {
        if let Some(point) = self.cell_to_canvas(column, row) {
            self.canvas.stroke(point, point, &self.brush);
            self.last_point = Some(point);
            self.protocol = None;
        }
    }

    pub fn pen_drag(&mut self, column: u16, row: u16) {
        let Some(point) = self.cell_to_canvas(column, row) else {
            self.last_point = None;
            return;
        };
        let from = self.last_point.unwrap_or(point);
        self.canvas.stroke(from, point, &self.brush);
        self.last_point = Some(point);
        self.protocol = None;
    }

    pub fn pen_up(&mut self) {
        self.last_point = None;
    }

    pub fn clear(&mut self) {
        self.canvas.clear();
        self.protocol = None;
    }

    pub fn next_color(&mut self) {
        let next = self.palette_index.map_or(0, |i| (i + 1) % PALETTE.len());
        let [r, g, b] = PALETTE[next].1;
        self.brush.color = image::Rgba([r, g, b, 255]);
        self.palette_index = Some(next);
    }

    pub fn color_name(&self) -> String {
        match self.palette_index {
            Some(i) => PALETTE[i].0.to_string(),
            None => {
                let [r, g, b, _] = self.brush.color.0;
                format!("#{:02x}{:02x}{:02x}", r, g, b)
            }
        }
    }

    pub fn to_markup(&self) -> PlanMarkup {
        PlanMarkup {
            plan: self.plan_name.clone(),
            annotation: self.canvas.layer().clone(),
        }
    }
}

/// Markup for a plan that was selected but never drawn on
pub fn blank_markup(plan_name: &str) -> PlanMarkup {
    PlanMarkup {
        plan: plan_name.to_string(),
        annotation: RgbaImage::new(1, 1),
    }
}

/// Largest size with the aspect ratio of `width`x`height` inside the bounds
pub fn fit_size(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 || max_width == 0 || max_height == 0 {
        return (1, 1);
    }
    let scale = (max_width as f64 / width as f64).min(max_height as f64 / height as f64);
    let fitted_w = ((width as f64 * scale).floor() as u32).clamp(1, max_width);
    let fitted_h = ((height as f64 * scale).floor() as u32).clamp(1, max_height);
    (fitted_w, fitted_h)
}

pub fn render(frame: &mut Frame, view: &mut MarkupView, picker: &mut Picker, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(format!(" Markierungen: {} ", view.plan_name))
        .title_style(Style::default().add_modifier(Modifier::BOLD));
    let inner = block.inner(chunks[0]);
    frame.render_widget(block, chunks[0]);

    view.fit(inner, picker);

    if view.protocol.is_none() {
        if let Some(preview) = &view.preview {
            let shown = compositor::composite(preview, view.canvas.layer());
            view.protocol = Some(picker.new_resize_protocol(DynamicImage::ImageRgb8(shown)));
        }
    }
    if let Some(protocol) = view.protocol.as_mut() {
        let image = StatefulImage::new(None).resize(Resize::Fit(None));
        frame.render_stateful_widget(image, inner, protocol);
    }

    let footer = Line::from(vec![
        Span::styled(
            format!(" Stift: {} px, {} ", view.brush.width, view.color_name()),
            Style::default().fg(Color::White).bg(Color::DarkGray),
        ),
        Span::styled(
            " Maus: zeichnen | +/-: Breite | f: Farbe | x: löschen | Esc: zurück ",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(footer), chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn view() -> MarkupView {
        let plan = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 100, Rgb([255, 255, 255])));
        let mut view = MarkupView::new("EG.png".to_string(), plan, Brush::default());
        view.area = Rect::new(10, 5, 20, 10);
        view.cell_size = (10, 20);
        view.canvas = Canvas::new(200, 100);
        view
    }

    #[test]
    fn test_fit_size_keeps_aspect() {
        assert_eq!(fit_size(200, 100, 100, 100), (100, 50));
        assert_eq!(fit_size(100, 400, 100, 100), (25, 100));
        assert_eq!(fit_size(10, 10, 40, 20), (20, 20));
        assert_eq!(fit_size(0, 10, 40, 20), (1, 1));
    }

    #[test]
    fn test_fit_sizes_canvas_to_plan() {
        let plan = DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 100, Rgb([255, 255, 255])));
        let mut view = MarkupView::new("EG.png".to_string(), plan, Brush::default());
        let picker = Picker::from_fontsize((10, 20));

        view.fit(Rect::new(0, 0, 20, 10), &picker);
        assert_eq!((view.canvas.width(), view.canvas.height()), (200, 50));

        view.pen_down(5, 1);
        view.fit(Rect::new(0, 0, 20, 10), &picker);
        assert!(!view.canvas.is_blank());

        view.fit(Rect::new(0, 0, 10, 10), &picker);
        assert_eq!((view.canvas.width(), view.canvas.height()), (100, 25));
        assert!(view.canvas.is_blank());
    }

    #[test]
    fn test_cell_mapping() {
        let view = view();
        assert_eq!(view.cell_to_canvas(10, 5), Some((5, 10)));
        assert_eq!(view.cell_to_canvas(12, 6), Some((25, 30)));
        assert_eq!(view.cell_to_canvas(9, 5), None);
        assert_eq!(view.cell_to_canvas(30, 5), None);
    }

    #[test]
    fn test_drag_draws_line() {
        let mut view = view();
        view.pen_down(10, 5);
        view.pen_drag(14, 5);
        view.pen_up();

        let layer = view.canvas.layer();
        assert_eq!(layer.get_pixel(5, 10).0[3], 255);
        assert_eq!(layer.get_pixel(25, 10).0[3], 255);
        assert_eq!(layer.get_pixel(45, 10).0[3], 255);
        assert_eq!(view.to_markup().plan, "EG.png");

        view.clear();
        assert!(view.canvas.is_blank());
    }

    #[test]
    fn test_color_cycle() {
        let mut view = view();
        assert_eq!(view.color_name(), "Schwarz");
        view.next_color();
        assert_eq!(view.color_name(), "Rot");
        for _ in 1..PALETTE.len() {
            view.next_color();
        }
        assert_eq!(view.color_name(), "Schwarz");
    }
}
