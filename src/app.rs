use anyhow::Result;
use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::prelude::*;
use ratatui_image::picker::Picker;
use std::time::Duration;
use tracing::{info, warn};

use mangel::annotation::{parse_hex_color, Brush};
use mangel::config::{Config, ImageProtocol};
use mangel::{ProjectHandle, RecordTable, Submission};

use crate::ui;
use crate::ui::dialogs::{PromptDialog, PromptKind};
use crate::ui::form::{expand_tilde, Field, FormState};
use crate::ui::markup::{blank_markup, MarkupView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Projects,
    Form,
    Records,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Normal,
    Help,
    Prompt,
    Markup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

pub struct App {
    pub config: Config,
    submission: Submission,
    pub backend_name: &'static str,
    pub projects: Vec<String>,
    pub selected_project: usize,
    pub project: Option<ProjectHandle>,
    pub table: RecordTable,
    pub selected_record: usize,
    pub plans: Vec<String>,
    pub form: FormState,
    pub markup: Option<MarkupView>,
    pub picker: Picker,
    pub prompt: Option<PromptDialog>,
    pub focus: Focus,
    pub mode: AppMode,
    pub status: Option<StatusMessage>,
    pub should_quit: bool,
}

fn create_picker(protocol: ImageProtocol) -> Picker {
    let fallback = || Picker::from_fontsize((8, 16));
    match protocol {
        ImageProtocol::Halfblocks => fallback(),
        ImageProtocol::Auto => Picker::from_query_stdio().unwrap_or_else(|_| fallback()),
    }
}

impl App {
    pub fn new(config: Config, submission: Submission) -> Self {
        let backend_name = submission.store().backend().backend_name();
        let form = FormState::new(Local::now().date_naive(), config.media.photo_slots);
        let picker = create_picker(config.markup.protocol);

        let mut app = Self {
            config,
            submission,
            backend_name,
            projects: Vec::new(),
            selected_project: 0,
            project: None,
            table: RecordTable::default(),
            selected_record: 0,
            plans: Vec::new(),
            form,
            markup: None,
            picker,
            prompt: None,
            focus: Focus::Projects,
            mode: AppMode::Normal,
            status: None,
            should_quit: false,
        };
        app.refresh_projects();
        app
    }

    pub fn run(&mut self, terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
        while !self.should_quit {
            terminal.draw(|frame| ui::render(frame, self))?;

            if event::poll(Duration::from_millis(100))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
        }

        Ok(())
    }

    fn set_status(&mut self, level: StatusLevel, text: impl Into<String>) {
        let text = text.into();
        match level {
            StatusLevel::Error => warn!("{}", text),
            _ => info!("{}", text),
        }
        self.status = Some(StatusMessage { level, text });
    }

    pub fn has_drawing(&self) -> bool {
        match (&self.markup, &self.form.plan) {
            (Some(view), Some(plan)) => view.plan_name == *plan && !view.canvas.is_blank(),
            _ => false,
        }
    }

    fn refresh_projects(&mut self) {
        let current = self.project.as_ref().map(|p| p.name().to_string());
        match self.submission.store().list_projects() {
            Ok(projects) => self.projects = projects,
            Err(e) => {
                self.set_status(StatusLevel::Error, format!("Projekte konnten nicht geladen werden: {}", e));
                return;
            }
        }

        self.selected_project = current
            .and_then(|name| self.projects.iter().position(|p| *p == name))
            .unwrap_or(0);

        if !self.projects.is_empty() {
            self.open_selected_project();
        } else {
            self.project = None;
            self.table = RecordTable::default();
            self.plans.clear();
        }
    }

    fn open_selected_project(&mut self) {
        let Some(name) = self.projects.get(self.selected_project).cloned() else {
            return;
        };
        if self.project.as_ref().is_some_and(|p| p.name() == name) {
            return;
        }

        match self.submission.store().open_project(&name) {
            Ok(project) => {
                self.project = Some(project);
                self.form.plan = None;
                self.markup = None;
                self.reload_project();
            }
            Err(e) => self.set_status(StatusLevel::Error, e.to_string()),
        }
    }

    /// Re-read the open project's table and plan list.
    fn reload_project(&mut self) {
        let Some(project) = self.project.clone() else {
            return;
        };
        let store = self.submission.store().clone();

        match store.load_table(&project) {
            Ok(table) => self.table = table,
            Err(e) => {
                self.table = RecordTable::default();
                self.set_status(StatusLevel::Error, e.to_string());
            }
        }
        self.selected_record = self.table.len().saturating_sub(1);

        match store.list_plans(&project) {
            Ok(plans) => self.plans = plans,
            Err(e) => {
                self.plans.clear();
                self.set_status(StatusLevel::Error, e.to_string());
            }
        }
        if let Some(plan) = &self.form.plan {
            if !self.plans.contains(plan) {
                self.form.plan = None;
                self.markup = None;
            }
        }
    }

    fn create_project(&mut self, name: &str) {
        match self.submission.store().create_project(name) {
            Ok(project) => {
                let name = project.name().to_string();
                self.project = None;
                self.refresh_projects();
                if let Some(index) = self.projects.iter().position(|p| *p == name) {
                    self.selected_project = index;
                    self.open_selected_project();
                }
                self.set_status(StatusLevel::Success, format!("Neues Projekt '{}' wurde erstellt!", name));
            }
            Err(e) => self.set_status(
                StatusLevel::Error,
                format!("Fehler beim Erstellen des Projekts: {}", e),
            ),
        }
    }

    fn upload_plan(&mut self, path: &str) {
        let Some(project) = self.project.clone() else {
            self.set_status(StatusLevel::Warning, "Bitte zuerst ein Projekt auswählen");
            return;
        };

        let path = expand_tilde(path.trim());
        let filename = match path.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => {
                self.set_status(StatusLevel::Error, format!("Ungültiger Pfad: {}", path.display()));
                return;
            }
        };
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.set_status(StatusLevel::Error, format!("{}: {}", path.display(), e));
                return;
            }
        };

        match self.submission.store().upload_plan(&project, &filename, &bytes) {
            Ok(name) => {
                self.reload_project();
                self.set_status(StatusLevel::Success, format!("Plan '{}' erfolgreich hochgeladen!", name));
            }
            Err(e) => self.set_status(StatusLevel::Error, e.to_string()),
        }
    }

    fn enter_markup(&mut self) {
        let (Some(project), Some(plan)) = (self.project.clone(), self.form.plan.clone()) else {
            self.set_status(StatusLevel::Info, "Mit ← / → einen Plan auswählen");
            return;
        };

        if self.markup.as_ref().is_some_and(|view| view.plan_name == plan) {
            self.mode = AppMode::Markup;
            return;
        }

        match self.submission.media().load_plan(&project, &plan) {
            Ok(image) => {
                let color = parse_hex_color(&self.config.markup.stroke_color).unwrap_or(Brush::default().color);
                let brush = Brush::new(color, self.config.markup.stroke_width);
                self.markup = Some(MarkupView::new(plan, image, brush));
                self.mode = AppMode::Markup;
            }
            Err(e) => self.set_status(StatusLevel::Error, e.to_string()),
        }
    }

    fn submit(&mut self) {
        let Some(project) = self.project.clone() else {
            self.set_status(StatusLevel::Warning, "Bitte zuerst ein Projekt auswählen");
            return;
        };

        let mut form = match self.form.to_defect_form() {
            Ok(form) => form,
            Err(message) => {
                self.set_status(StatusLevel::Error, message);
                return;
            }
        };
        form.markup = self.form.plan.as_ref().map(|plan| match &self.markup {
            Some(view) if view.plan_name == *plan => view.to_markup(),
            _ => blank_markup(plan),
        });

        match self.submission.submit(&project, &form) {
            Ok(submitted) => {
                self.table = submitted.table;
                self.selected_record = self.table.len().saturating_sub(1);
                self.form = FormState::new(Local::now().date_naive(), self.config.media.photo_slots);
                self.markup = None;
                self.set_status(
                    StatusLevel::Success,
                    format!("Mangel erfolgreich hinzugefügt! ID: {}", submitted.record.id),
                );
            }
            Err(e) => self.set_status(StatusLevel::Error, e.to_string()),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.mode {
            AppMode::Help => self.mode = AppMode::Normal,
            AppMode::Prompt => self.handle_prompt_key(key),
            AppMode::Markup => self.handle_markup_key(key),
            AppMode::Normal => {
                self.status = None;
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
                    self.submit();
                    return;
                }
                match self.focus {
                    Focus::Projects => self.handle_projects_key(key),
                    Focus::Form => self.handle_form_key(key),
                    Focus::Records => self.handle_records_key(key),
                }
            }
        }
    }

    fn handle_projects_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.mode = AppMode::Help,
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected_project + 1 < self.projects.len() {
                    self.selected_project += 1;
                    self.open_selected_project();
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if self.selected_project > 0 {
                    self.selected_project -= 1;
                    self.open_selected_project();
                }
            }
            KeyCode::Char('n') => {
                self.prompt = Some(PromptDialog::new(PromptKind::NewProject));
                self.mode = AppMode::Prompt;
            }
            KeyCode::Char('p') => {
                if self.project.is_some() {
                    self.prompt = Some(PromptDialog::new(PromptKind::UploadPlan));
                    self.mode = AppMode::Prompt;
                } else {
                    self.set_status(StatusLevel::Warning, "Bitte zuerst ein Projekt auswählen");
                }
            }
            KeyCode::Char('r') => {
                self.refresh_projects();
                self.reload_project();
            }
            KeyCode::Enter | KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => self.focus = Focus::Form,
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::BackTab => {
                self.focus = Focus::Projects;
                return;
            }
            KeyCode::Tab => {
                self.focus = Focus::Records;
                return;
            }
            KeyCode::Up => {
                self.form.select_previous();
                return;
            }
            KeyCode::Down => {
                self.form.select_next();
                return;
            }
            _ => {}
        }

        match self.form.current() {
            Field::Submit => {
                if key.code == KeyCode::Enter {
                    self.submit();
                }
            }
            Field::Plan => match key.code {
                KeyCode::Left | KeyCode::Right => {
                    let plans = self.plans.clone();
                    self.form.cycle_plan(&plans, key.code == KeyCode::Right);
                }
                KeyCode::Enter => self.enter_markup(),
                _ => {}
            },
            _ => {
                if key.code == KeyCode::Enter {
                    self.form.select_next();
                    return;
                }
                if let Some(input) = self.form.current_input() {
                    match key.code {
                        KeyCode::Char(c) => input.handle_char(c),
                        KeyCode::Backspace => input.backspace(),
                        KeyCode::Delete => input.delete(),
                        KeyCode::Left => input.move_cursor_left(),
                        KeyCode::Right => input.move_cursor_right(),
                        KeyCode::Home => input.move_cursor_home(),
                        KeyCode::End => input.move_cursor_end(),
                        _ => {}
                    }
                }
            }
        }
    }

    fn handle_records_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.mode = AppMode::Help,
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected_record + 1 < self.table.len() {
                    self.selected_record += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_record = self.selected_record.saturating_sub(1);
            }
            KeyCode::Char('g') | KeyCode::Home => self.selected_record = 0,
            KeyCode::Char('G') | KeyCode::End => self.selected_record = self.table.len().saturating_sub(1),
            KeyCode::Tab => self.focus = Focus::Projects,
            KeyCode::Esc | KeyCode::BackTab => self.focus = Focus::Form,
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(dialog) = self.prompt.as_mut() else {
            self.mode = AppMode::Normal;
            return;
        };

        match key.code {
            KeyCode::Esc => {
                self.prompt = None;
                self.mode = AppMode::Normal;
            }
            KeyCode::Enter => {
                let kind = dialog.kind;
                let value = dialog.input.value().to_string();
                self.prompt = None;
                self.mode = AppMode::Normal;
                if value.trim().is_empty() {
                    return;
                }
                match kind {
                    PromptKind::NewProject => self.create_project(&value),
                    PromptKind::UploadPlan => self.upload_plan(&value),
                }
            }
            KeyCode::Char(c) => dialog.input.handle_char(c),
            KeyCode::Backspace => dialog.input.backspace(),
            KeyCode::Delete => dialog.input.delete(),
            KeyCode::Left => dialog.input.move_cursor_left(),
            KeyCode::Right => dialog.input.move_cursor_right(),
            KeyCode::Home => dialog.input.move_cursor_home(),
            KeyCode::End => dialog.input.move_cursor_end(),
            _ => {}
        }
    }

    fn handle_markup_key(&mut self, key: KeyEvent) {
        let Some(view) = self.markup.as_mut() else {
            self.mode = AppMode::Normal;
            return;
        };

        match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                view.pen_up();
                self.mode = AppMode::Normal;
                self.focus = Focus::Form;
            }
            KeyCode::Char('+') | KeyCode::Char('=') => view.brush.wider(),
            KeyCode::Char('-') => view.brush.thinner(),
            KeyCode::Char('f') => view.next_color(),
            KeyCode::Char('x') => view.clear(),
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.mode != AppMode::Markup {
            return;
        }
        let Some(view) = self.markup.as_mut() else {
            return;
        };

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => view.pen_down(mouse.column, mouse.row),
            MouseEventKind::Drag(MouseButton::Left) => view.pen_drag(mouse.column, mouse.row),
            MouseEventKind::Up(MouseButton::Left) => view.pen_up(),
            _ => {}
        }
    }
}
