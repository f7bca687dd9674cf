use chrono::NaiveDate;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState},
};
use std::path::Path;

use mangel::record::parse_date;
use mangel::{DefectForm, PhotoUpload};

use super::input::TextInput;
use crate::app::{App, Focus};

pub const DISPLAY_DATE_FORMAT: &str = "%d.%m.%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    CaptureDate,
    Contractor,
    Trade,
    DefectName,
    Description,
    Unit,
    Room,
    Location,
    Photo(usize),
    Plan,
    Remarks,
    DueDate,
    Submit,
}

impl Field {
    pub fn label(&self) -> String {
        match self {
            Field::CaptureDate => "Erfassungsdatum".to_string(),
            Field::Contractor => "Unternehmer".to_string(),
            Field::Trade => "Gewerk".to_string(),
            Field::DefectName => "Mangelname".to_string(),
            Field::Description => "Mangelbeschreibung".to_string(),
            Field::Unit => "Wohnung".to_string(),
            Field::Room => "Zimmer".to_string(),
            Field::Location => "Ort".to_string(),
            Field::Photo(slot) => format!("Foto {} (Pfad)", slot + 1),
            Field::Plan => "Plan".to_string(),
            Field::Remarks => "Bemerkung".to_string(),
            Field::DueDate => "Zu erledigen bis".to_string(),
            Field::Submit => String::new(),
        }
    }

    pub fn is_text(&self) -> bool {
        !matches!(self, Field::Plan | Field::Submit)
    }
}

/// Entry state of the defect form
pub struct FormState {
    pub fields: Vec<Field>,
    pub inputs: Vec<TextInput>,
    pub selected: usize,
    /// Plan chosen for markup, by filename
    pub plan: Option<String>,
}

impl FormState {
    pub fn new(today: NaiveDate, photo_slots: usize) -> Self {
        let mut fields = vec![
            Field::CaptureDate,
            Field::Contractor,
            Field::Trade,
            Field::DefectName,
            Field::Description,
            Field::Unit,
            Field::Room,
            Field::Location,
        ];
        fields.extend((0..photo_slots).map(Field::Photo));
        fields.extend([Field::Plan, Field::Remarks, Field::DueDate, Field::Submit]);

        let today = today.format(DISPLAY_DATE_FORMAT).to_string();
        let inputs = fields
            .iter()
            .map(|field| match field {
                Field::CaptureDate | Field::DueDate => TextInput::new(today.clone()),
                _ => TextInput::default(),
            })
            .collect();

        Self {
            fields,
            inputs,
            selected: 0,
            plan: None,
        }
    }

    pub fn current(&self) -> Field {
        self.fields[self.selected]
    }

    pub fn current_input(&mut self) -> Option<&mut TextInput> {
        if self.current().is_text() {
            self.inputs.get_mut(self.selected)
        } else {
            None
        }
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.fields.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn value(&self, field: Field) -> &str {
        self.fields
            .iter()
            .position(|f| *f == field)
            .map(|i| self.inputs[i].value())
            .unwrap_or("")
    }

    /// Step through `plans`, with "no plan" between the last and the first.
    pub fn cycle_plan(&mut self, plans: &[String], forward: bool) {
        if plans.is_empty() {
            self.plan = None;
            return;
        }
        let position = self
            .plan
            .as_ref()
            .and_then(|p| plans.iter().position(|name| name == p));
        let slots = plans.len() + 1;
        let current = position.map(|i| i + 1).unwrap_or(0);
        let next = if forward {
            (current + 1) % slots
        } else {
            (current + slots - 1) % slots
        };
        self.plan = next.checked_sub(1).map(|i| plans[i].clone());
    }

    fn date(&self, field: Field) -> Result<NaiveDate, String> {
        let raw = self.value(field);
        parse_date(raw).ok_or_else(|| format!("{}: ungültiges Datum '{}'", field.label(), raw.trim()))
    }

    /// Collect the entered values. Photo paths are read from disk here;
    /// markup is attached by the caller.
    pub fn to_defect_form(&self) -> Result<DefectForm, String> {
        let mut form = DefectForm::new(self.date(Field::CaptureDate)?);
        form.due_date = self.date(Field::DueDate)?;
        form.contractor = self.value(Field::Contractor).trim().to_string();
        form.trade = self.value(Field::Trade).trim().to_string();
        form.defect_name = self.value(Field::DefectName).trim().to_string();
        form.description = self.value(Field::Description).trim().to_string();
        form.unit = self.value(Field::Unit).trim().to_string();
        form.room = self.value(Field::Room).trim().to_string();
        form.location = self.value(Field::Location).trim().to_string();
        form.remarks = self.value(Field::Remarks).trim().to_string();

        for (field, input) in self.fields.iter().zip(&self.inputs) {
            if let Field::Photo(_) = field {
                if input.is_blank() {
                    continue;
                }
                let photo = read_photo(input.value().trim())
                    .map_err(|e| format!("{}: {}", field.label(), e))?;
                form.photos.push(photo);
            }
        }

        Ok(form)
    }
}

fn read_photo(path: &str) -> Result<PhotoUpload, String> {
    let path = expand_tilde(path);
    let bytes = std::fs::read(&path).map_err(|e| format!("{} ({})", path.display(), e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(PhotoUpload { name, bytes })
}

pub fn expand_tilde(path: &str) -> std::path::PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| Path::new(path).to_path_buf()),
        None => Path::new(path).to_path_buf(),
    }
}

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Form;
    let form = &app.form;
    let label_width = form
        .fields
        .iter()
        .map(|f| f.label().chars().count())
        .max()
        .unwrap_or(0);

    let items: Vec<ListItem> = form
        .fields
        .iter()
        .zip(&form.inputs)
        .enumerate()
        .map(|(i, (field, input))| {
            let is_current = focused && i == form.selected;
            let label = Span::styled(
                format!("{:<width$}  ", field.label(), width = label_width),
                Style::default().fg(Color::Cyan),
            );
            let line = match field {
                Field::Submit => Line::from(Span::styled(
                    "[ Absenden ]",
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                )),
                Field::Plan => {
                    let value = match &form.plan {
                        Some(name) if app.has_drawing() => format!("< {} > (markiert)", name),
                        Some(name) => format!("< {} >", name),
                        None if app.plans.is_empty() => "keine Pläne vorhanden".to_string(),
                        None => "< kein Plan >".to_string(),
                    };
                    Line::from(vec![label, Span::raw(value)])
                }
                _ => {
                    let mut spans = vec![label];
                    spans.extend(input.spans(is_current));
                    Line::from(spans)
                }
            };
            ListItem::new(line)
        })
        .collect();

    let title = match &app.project {
        Some(project) => match app.table.next_id(app.config.records.start_id) {
            Ok(id) => format!(" Neuer Mangel: {} (ID {}) ", project.name(), id),
            Err(_) => format!(" Neuer Mangel: {} (keine ID frei) ", project.name()),
        },
        None => " Neuer Mangel ".to_string(),
    };

    let border_color = if focused { Color::Blue } else { Color::DarkGray };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(title),
        )
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut state = ListState::default();
    if focused {
        state.select(Some(form.selected));
    }
    frame.render_stateful_widget(list, area, &mut state);
}
