use ratatui::{prelude::*, widgets::Paragraph};

use crate::app::{App, StatusLevel};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(ref status) = app.status {
        let color = match status.level {
            StatusLevel::Info => Color::Yellow,
            StatusLevel::Success => Color::Green,
            StatusLevel::Warning => Color::LightYellow,
            StatusLevel::Error => Color::Red,
        };
        let line = Line::from(Span::styled(
            format!(" {} ", status.text),
            Style::default().fg(color).bg(Color::DarkGray),
        ));
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let mut spans = vec![Span::styled(
        format!(" {} ", app.backend_name),
        Style::default().fg(Color::White).bg(Color::DarkGray),
    )];

    match &app.project {
        Some(project) => spans.push(Span::styled(
            format!(" {}: {} Mängel, {} Pläne ", project.name(), app.table.len(), app.plans.len()),
            Style::default().fg(Color::Gray),
        )),
        None => spans.push(Span::styled(" kein Projekt gewählt ", Style::default().fg(Color::Gray))),
    }

    let help_text = " n:neu p:plan ^s:absenden ?:hilfe q:beenden ";
    let content_len: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    let help_len = help_text.chars().count();
    let available = area.width as usize;
    if available > content_len + help_len {
        spans.push(Span::raw(" ".repeat(available - content_len - help_len)));
    }

    spans.push(Span::styled(
        help_text,
        Style::default().fg(Color::White).bg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
