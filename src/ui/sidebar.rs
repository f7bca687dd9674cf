use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState},
};

use crate::app::{App, Focus};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_projects(frame, app, chunks[0]);
    render_plans(frame, app, chunks[1]);
}

fn render_projects(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = if app.projects.is_empty() {
        vec![ListItem::new("(n: neues Projekt)").style(Style::default().fg(Color::DarkGray))]
    } else {
        app.projects
            .iter()
            .map(|name| {
                let open = app.project.as_ref().is_some_and(|p| p.name() == name);
                let style = if open {
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(format!("📁 {}", name)).style(style)
            })
            .collect()
    };

    let border_color = if app.focus == Focus::Projects {
        Color::Blue
    } else {
        Color::DarkGray
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(" Projekte "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !app.projects.is_empty() {
        state.select(Some(app.selected_project));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_plans(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .plans
        .iter()
        .map(|name| {
            let chosen = app.form.plan.as_deref() == Some(name.as_str());
            let style = if chosen {
                Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!("  {}", name)).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Pläne "),
    );
    frame.render_widget(list, area);
}
