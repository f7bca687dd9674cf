pub mod dialogs;
pub mod form;
pub mod input;
pub mod markup;
mod records;
mod sidebar;
mod status_bar;

use ratatui::{
    prelude::*,
    widgets::Paragraph,
};

use crate::app::{App, AppMode};

pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    render_header(frame, main_chunks[0]);

    if app.mode == AppMode::Markup {
        if let Some(view) = app.markup.as_mut() {
            markup::render(frame, view, &mut app.picker, main_chunks[1]);
            status_bar::render(frame, app, main_chunks[2]);
            return;
        }
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(0)])
        .split(main_chunks[1]);

    let form_height = app.form.fields.len() as u16 + 2;
    let body = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(form_height), Constraint::Min(5)])
        .split(columns[1]);

    sidebar::render(frame, app, columns[0]);
    form::render(frame, app, body[0]);
    records::render(frame, app, body[1]);
    status_bar::render(frame, app, main_chunks[2]);

    match app.mode {
        AppMode::Help => dialogs::render_help(frame, area),
        AppMode::Prompt => {
            if let Some(ref dialog) = app.prompt {
                dialogs::render_prompt(frame, dialog, area);
            }
        }
        _ => {}
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            "Bau- und Wohnungsabnahmen",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Eingabemaske für Mängel des ausgewählten Projekts",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}
