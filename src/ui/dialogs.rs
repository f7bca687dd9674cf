use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::input::TextInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    NewProject,
    UploadPlan,
}

impl PromptKind {
    fn title(&self) -> &'static str {
        match self {
            PromptKind::NewProject => " Neues Projekt / Neue Abnahme erstellen ",
            PromptKind::UploadPlan => " Plan hochladen ",
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            PromptKind::NewProject => "Name des Projekts",
            PromptKind::UploadPlan => "Pfad zur Plandatei (jpg, jpeg, png)",
        }
    }
}

/// One-line input dialog
pub struct PromptDialog {
    pub kind: PromptKind,
    pub input: TextInput,
}

impl PromptDialog {
    pub fn new(kind: PromptKind) -> Self {
        Self {
            kind,
            input: TextInput::default(),
        }
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}

pub fn render_prompt(frame: &mut Frame, dialog: &PromptDialog, area: Rect) {
    let dialog_area = centered(area, 70, 7);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(dialog.kind.title())
        .title_style(Style::default().add_modifier(Modifier::BOLD));
    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(3), Constraint::Min(0)])
        .split(inner);

    frame.render_widget(
        Paragraph::new(dialog.kind.hint()).style(Style::default().fg(Color::DarkGray)),
        chunks[0],
    );

    let input = Paragraph::new(Line::from(dialog.input.spans(true))).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    frame.render_widget(input, chunks[1]);

    frame.render_widget(
        Paragraph::new("Enter: bestätigen | Esc: abbrechen").style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );
}

pub fn render_help(frame: &mut Frame, area: Rect) {
    let dialog_area = centered(area, 64, 30);
    frame.render_widget(Clear, dialog_area);

    let heading = |text: &'static str| {
        Line::from(Span::styled(
            text,
            Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan),
        ))
    };

    let help_text = vec![
        heading("Projekte"),
        Line::from(""),
        Line::from("  j / ↓, k / ↑   Projekt wählen"),
        Line::from("  n              Neues Projekt erstellen"),
        Line::from("  p              Plan hochladen"),
        Line::from("  Enter / Tab    Zur Eingabemaske"),
        Line::from("  r              Liste neu laden"),
        Line::from(""),
        heading("Eingabemaske"),
        Line::from(""),
        Line::from("  ↑ / ↓          Feld wechseln"),
        Line::from("  ← / →          Cursor bzw. Plan wählen"),
        Line::from("  Enter          Plan markieren / Absenden"),
        Line::from("  Ctrl+s         Absenden"),
        Line::from("  Tab            Zur Mängeltabelle"),
        Line::from("  Esc            Zurück zu den Projekten"),
        Line::from(""),
        heading("Markierungen"),
        Line::from(""),
        Line::from("  Maus ziehen    Zeichnen"),
        Line::from("  + / -          Stiftbreite"),
        Line::from("  f              Stiftfarbe wechseln"),
        Line::from("  x              Zeichnung löschen"),
        Line::from("  Esc / Enter    Zurück zur Eingabemaske"),
        Line::from(""),
        Line::from("  ?              Diese Hilfe    q / Ctrl+c   Beenden"),
        Line::from(""),
        Line::from(Span::styled("Beliebige Taste zum Schließen", Style::default().fg(Color::DarkGray))),
    ];

    let paragraph = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Hilfe ")
                .title_style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, dialog_area);
}
