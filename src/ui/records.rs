use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
};

use mangel::record::{Record, DATE_FORMAT};

use crate::app::{App, Focus};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Percentage(35)])
        .split(area);

    render_table(frame, app, chunks[0]);
    render_details(frame, app, chunks[1]);
}

fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    let title = match &app.project {
        Some(project) => format!(" Bestehende Mängel für Projekt: {} ", project.name()),
        None => " Bestehende Mängel ".to_string(),
    };

    let header = Row::new(
        ["ID", "Datum", "Unternehmer", "Gewerk", "Mangel", "Wohnung", "Zimmer", "Ort", "Fotos", "Plan", "Bis"]
            .into_iter()
            .map(|h| Cell::from(h).style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))),
    );

    let rows: Vec<Row> = app
        .table
        .records()
        .iter()
        .map(|record| {
            Row::new(vec![
                Cell::from(record.id.to_string()),
                Cell::from(record.capture_date.format(DATE_FORMAT).to_string()),
                Cell::from(record.contractor.as_str()),
                Cell::from(record.trade.as_str()),
                Cell::from(record.defect_name.as_str()),
                Cell::from(record.unit.as_str()),
                Cell::from(record.room.as_str()),
                Cell::from(record.location.as_str()),
                Cell::from(record.photo_filenames.len().to_string()),
                Cell::from(if record.plan_filename.is_empty() { "" } else { "✓" }),
                Cell::from(record.due_date.format(DATE_FORMAT).to_string()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Length(10),
        Constraint::Fill(2),
        Constraint::Fill(1),
        Constraint::Fill(2),
        Constraint::Length(8),
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Length(5),
        Constraint::Length(4),
        Constraint::Length(10),
    ];

    let border_color = if app.focus == Focus::Records {
        Color::Blue
    } else {
        Color::DarkGray
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(title),
        )
        .row_highlight_style(Style::default().bg(Color::DarkGray));

    let mut state = TableState::default();
    if app.focus == Focus::Records && !app.table.is_empty() {
        state.select(Some(app.selected_record));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

/// All columns of the selected record, one labelled line each.
fn render_details(frame: &mut Frame, app: &App, area: Rect) {
    let record = app.table.records().get(app.selected_record);
    let title = match record {
        Some(record) => format!(" Mangel {} ", record.id),
        None => " Details ".to_string(),
    };
    let lines = match record {
        Some(record) => detail_lines(record),
        None => vec![Line::from(Span::styled(
            "Keine Mängel erfasst",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let details = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(title),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(details, area);
}

fn detail_lines(record: &Record) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (header, value) in record.columns() {
        lines.push(Line::from(Span::styled(
            format!("{}:", header),
            Style::default().fg(Color::Cyan),
        )));
        if header == "Fotos" {
            lines.extend(record.photo_filenames.iter().map(|name| Line::from(format!("  {}", name))));
        } else {
            lines.extend(value.lines().map(|line| Line::from(format!("  {}", line))));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_detail_lines_show_every_column() {
        let record = Record {
            id: 1003,
            capture_date: NaiveDate::from_ymd_opt(2024, 5, 14).unwrap(),
            contractor: "Meier".to_string(),
            trade: "Maler".to_string(),
            defect_name: "Fleck".to_string(),
            description: "Fleck an der Decke\nnach Wasserschaden".to_string(),
            unit: "W3".to_string(),
            room: "Flur".to_string(),
            location: "Decke".to_string(),
            photo_filenames: vec!["1003-a.jpg".to_string(), "1003-b.jpg".to_string()],
            plan_filename: "1003-Plan.jpg".to_string(),
            remarks: "Nachbesserung angekündigt".to_string(),
            due_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        };

        let text: Vec<String> = detail_lines(&record).iter().map(line_text).collect();
        for header in mangel::record::COLUMNS {
            assert!(text.contains(&format!("{}:", header)), "missing {}", header);
        }
        assert!(text.contains(&"  nach Wasserschaden".to_string()));
        assert!(text.contains(&"  1003-b.jpg".to_string()));
        assert!(text.contains(&"  1003-Plan.jpg".to_string()));
        assert!(text.contains(&"  Nachbesserung angekündigt".to_string()));
    }
}
