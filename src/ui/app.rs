use std::collections::BTreeMap;
use std::mem;

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use tracing::warn;

use crate::agenda::{Agenda, UNKNOWN_NAME};
use crate::backend::Backend;
use crate::calendar::{CalendarCell, DAYS_PER_WEEK};
use crate::dates::{format_date, format_time};
use crate::error::ScheduleError;
use crate::models::{Agendamento, Id, Resource, ResourceKind};
use crate::query::AgendaFilter;

use super::forms::{
    AgendamentoField, AgendamentoForm, ConfirmAgendamentoDelete, ConfirmResourceDelete,
    ResourceForm,
};
use super::helpers::{centered_rect, key_hints, surface_error, truncate};
use super::screens::{move_index, CalendarScreen, ResourceScreen};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Header space for the active filter summary.
const HEADER_HEIGHT: u16 = 3;
const WEEKDAY_NAMES: [&str; DAYS_PER_WEEK] = ["Dom", "Seg", "Ter", "Qua", "Qui", "Sex", "Sáb"];

/// High-level navigation states.
enum Screen {
    List,
    Calendar(CalendarScreen),
    Resources(ResourceScreen),
}

/// Popups layered over the current screen.
enum Mode {
    Normal,
    AddingAgendamento(AgendamentoForm),
    EditingAgendamento { id: Id, form: AgendamentoForm },
    ConfirmAgendamentoDelete(ConfirmAgendamentoDelete),
    AddingResource(ResourceForm),
    EditingResource { id: Id, form: ResourceForm },
    ConfirmResourceDelete(ConfirmResourceDelete),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI. All reads and writes go
/// through `agenda`; `entries` and `registries` are refreshed copies used for
/// rendering.
pub struct App<B: Backend> {
    agenda: Agenda<B>,
    today: NaiveDate,
    filter: AgendaFilter,
    entries: Vec<Agendamento>,
    registries: BTreeMap<ResourceKind, Vec<Resource>>,
    selected: usize,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl<B: Backend> App<B> {
    pub fn new(agenda: Agenda<B>, today: NaiveDate) -> Result<Self> {
        let mut app = Self {
            agenda,
            today,
            filter: AgendaFilter::default(),
            entries: Vec::new(),
            registries: BTreeMap::new(),
            selected: 0,
            screen: Screen::List,
            mode: Mode::Normal,
            status: None,
        };
        app.reload_registries()?;
        app.reload_entries(None)?;
        Ok(app)
    }

    /// Route a key press. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::AddingAgendamento(form) => self.handle_agendamento_form(code, None, form)?,
            Mode::EditingAgendamento { id, form } => {
                self.handle_agendamento_form(code, Some(id), form)?
            }
            Mode::ConfirmAgendamentoDelete(confirm) => {
                self.handle_confirm_agendamento_delete(code, confirm)?
            }
            Mode::AddingResource(form) => self.handle_resource_form(code, None, form)?,
            Mode::EditingResource { id, form } => {
                self.handle_resource_form(code, Some(id), form)?
            }
            Mode::ConfirmResourceDelete(confirm) => {
                self.handle_confirm_resource_delete(code, confirm)?
            }
        };

        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        if code == KeyCode::Char('q') {
            *exit = true;
            return Ok(Mode::Normal);
        }
        match self.screen {
            Screen::List => self.handle_list_key(code),
            Screen::Calendar(_) => self.handle_calendar_key(code),
            Screen::Resources(_) => self.handle_resources_key(code),
        }
    }

    fn handle_list_key(&mut self, code: KeyCode) -> Result<Mode> {
        match code {
            KeyCode::Up => self.selected = move_index(self.selected, self.entries.len(), -1),
            KeyCode::Down => self.selected = move_index(self.selected, self.entries.len(), 1),
            KeyCode::PageUp => self.selected = move_index(self.selected, self.entries.len(), -10),
            KeyCode::PageDown => {
                self.selected = move_index(self.selected, self.entries.len(), 10)
            }
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = self.entries.len().saturating_sub(1),
            KeyCode::Char('+') => {
                self.clear_status();
                return Ok(Mode::AddingAgendamento(AgendamentoForm::new(None)));
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(agendamento) = self.entries.get(self.selected) {
                    let mode = Mode::EditingAgendamento {
                        id: agendamento.id,
                        form: AgendamentoForm::from_agendamento(agendamento),
                    };
                    self.clear_status();
                    return Ok(mode);
                }
                self.set_status("No agendamento selected to edit.", StatusKind::Error);
            }
            KeyCode::Char('-') => {
                if let Some(agendamento) = self.entries.get(self.selected) {
                    let confirm = ConfirmAgendamentoDelete {
                        id: agendamento.id,
                        summary: self.summary(agendamento)?,
                    };
                    self.clear_status();
                    return Ok(Mode::ConfirmAgendamentoDelete(confirm));
                }
                self.set_status("No agendamento selected to remove.", StatusKind::Error);
            }
            KeyCode::Char('v') => self.open_calendar(self.today.year(), self.today.month())?,
            KeyCode::Char('r') => self.open_resources(ResourceKind::Oficina)?,
            other => self.handle_filter_key(other)?,
        }
        Ok(Mode::Normal)
    }

    fn handle_calendar_key(&mut self, code: KeyCode) -> Result<Mode> {
        let Screen::Calendar(calendar) = &mut self.screen else {
            return Ok(Mode::Normal);
        };
        let days = match code {
            KeyCode::Left => -1,
            KeyCode::Right => 1,
            KeyCode::Up => -(DAYS_PER_WEEK as i64),
            KeyCode::Down => DAYS_PER_WEEK as i64,
            KeyCode::Char('[') | KeyCode::PageUp => {
                let (year, month) = calendar.grid.previous();
                self.open_calendar(year, month)?;
                return Ok(Mode::Normal);
            }
            KeyCode::Char(']') | KeyCode::PageDown => {
                let (year, month) = calendar.grid.next();
                self.open_calendar(year, month)?;
                return Ok(Mode::Normal);
            }
            KeyCode::Home => {
                self.open_calendar(self.today.year(), self.today.month())?;
                return Ok(Mode::Normal);
            }
            KeyCode::Char('+') => {
                let date = format_date(calendar.selected);
                self.clear_status();
                return Ok(Mode::AddingAgendamento(AgendamentoForm::new(Some(date))));
            }
            KeyCode::Enter => {
                let day = calendar.selected;
                self.screen = Screen::List;
                if let Some(idx) = self.entries.iter().position(|a| a.data >= day) {
                    self.selected = idx;
                }
                return Ok(Mode::Normal);
            }
            KeyCode::Esc | KeyCode::Char('v') => {
                self.screen = Screen::List;
                return Ok(Mode::Normal);
            }
            other => {
                self.handle_filter_key(other)?;
                return Ok(Mode::Normal);
            }
        };

        // Crossing a month boundary rebuilds the grid around the new day.
        if let Some((year, month)) = calendar.move_day(days) {
            let selected = calendar.selected;
            self.open_calendar(year, month)?;
            if let Screen::Calendar(calendar) = &mut self.screen {
                calendar.selected = selected;
            }
        }
        Ok(Mode::Normal)
    }

    fn handle_resources_key(&mut self, code: KeyCode) -> Result<Mode> {
        let Screen::Resources(resources) = &mut self.screen else {
            return Ok(Mode::Normal);
        };
        match code {
            KeyCode::Esc => self.screen = Screen::List,
            KeyCode::Up => resources.move_selection(-1),
            KeyCode::Down => resources.move_selection(1),
            KeyCode::Tab | KeyCode::Right => {
                let kind = resources.next_kind(1);
                self.open_resources(kind)?;
            }
            KeyCode::BackTab | KeyCode::Left => {
                let kind = resources.next_kind(-1);
                self.open_resources(kind)?;
            }
            KeyCode::Char('+') => {
                let kind = resources.kind;
                self.clear_status();
                return Ok(Mode::AddingResource(ResourceForm::new(kind)));
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(resource) = resources.current() {
                    let mode = Mode::EditingResource {
                        id: resource.id(),
                        form: ResourceForm::from_resource(resource),
                    };
                    self.clear_status();
                    return Ok(mode);
                }
                self.set_status("Nothing selected to edit.", StatusKind::Error);
            }
            KeyCode::Char('-') => {
                if let Some(resource) = resources.current() {
                    let confirm = ConfirmResourceDelete {
                        kind: resource.kind(),
                        id: resource.id(),
                        nome: resource.nome().to_string(),
                    };
                    self.clear_status();
                    return Ok(Mode::ConfirmResourceDelete(confirm));
                }
                self.set_status("Nothing selected to remove.", StatusKind::Error);
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    /// Filter shortcuts shared by the list and calendar screens.
    fn handle_filter_key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Char('p') => self.filter.periodo = self.filter.periodo.next(),
            KeyCode::Char('o') => self.cycle_filter(ResourceKind::Oficina),
            KeyCode::Char('d') => self.cycle_filter(ResourceKind::Educador),
            KeyCode::Char('t') => self.cycle_filter(ResourceKind::Turma),
            KeyCode::Char('c') => self.filter = AgendaFilter::default(),
            _ => return Ok(()),
        }
        self.refresh_views()
    }

    /// Step one resource filter through "all" and then every registry id.
    fn cycle_filter(&mut self, kind: ResourceKind) {
        let ids: Vec<Id> = self.registry(kind).iter().map(Resource::id).collect();
        let next = match self.filter.resource(kind) {
            None => ids.first().copied(),
            Some(current) => ids
                .iter()
                .position(|id| *id == current)
                .and_then(|idx| ids.get(idx + 1).copied()),
        };
        self.filter.set_resource(kind, next);
    }

    fn handle_agendamento_form(
        &mut self,
        code: KeyCode,
        id: Option<Id>,
        mut form: AgendamentoForm,
    ) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Left | KeyCode::Right => {
                if let Some(kind) = form.active.resource_kind() {
                    let ids: Vec<Id> = self.registry(kind).iter().map(Resource::id).collect();
                    let delta = if code == KeyCode::Left { -1 } else { 1 };
                    form.cycle_resource(&ids, delta);
                    form.error = None;
                }
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => {
                let saved = match id {
                    Some(id) => self.save_existing_agendamento(id, &form),
                    None => self.save_new_agendamentos(&form),
                };
                match saved {
                    Ok(()) => keep_open = false,
                    Err(err) => {
                        let message = surface_error(&err);
                        form.error = Some(message.clone());
                        self.set_status(message, StatusKind::Error);
                    }
                }
            }
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        Ok(match (keep_open, id) {
            (false, _) => Mode::Normal,
            (true, Some(id)) => Mode::EditingAgendamento { id, form },
            (true, None) => Mode::AddingAgendamento(form),
        })
    }

    fn handle_confirm_agendamento_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmAgendamentoDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.agenda.delete(confirm.id) {
                    Ok(()) => {
                        self.refresh_views()?;
                        self.set_status(format!("Removed {}.", confirm.summary), StatusKind::Info);
                        Ok(Mode::Normal)
                    }
                    Err(err) => {
                        self.set_status(surface_error(&err), StatusKind::Error);
                        Ok(Mode::ConfirmAgendamentoDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmAgendamentoDelete(confirm)),
        }
    }

    fn handle_resource_form(
        &mut self,
        code: KeyCode,
        id: Option<Id>,
        mut form: ResourceForm,
    ) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::Down => form.toggle_field(1),
            KeyCode::BackTab | KeyCode::Up => form.toggle_field(-1),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_resource(id, &form) {
                Ok(()) => keep_open = false,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        Ok(match (keep_open, id) {
            (false, _) => Mode::Normal,
            (true, Some(id)) => Mode::EditingResource { id, form },
            (true, None) => Mode::AddingResource(form),
        })
    }

    fn handle_confirm_resource_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmResourceDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.agenda.delete_resource(confirm.kind, confirm.id) {
                    Ok(()) => {
                        self.reload_registries()?;
                        self.refresh_views()?;
                        self.set_status(format!("Removed {}.", confirm.nome), StatusKind::Info);
                    }
                    // Refusals are final; the popup closes and the status explains why.
                    Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
                }
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::ConfirmResourceDelete(confirm)),
        }
    }

    // ---------------------------------------------------------------------
    // Drawing
    // ---------------------------------------------------------------------

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);
        match &self.screen {
            Screen::List => self.draw_list(frame, chunks[1]),
            Screen::Calendar(calendar) => self.draw_calendar(frame, chunks[1], calendar),
            Screen::Resources(resources) => self.draw_resources(frame, chunks[1], resources),
        }
        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::AddingAgendamento(form) => {
                self.draw_agendamento_form(frame, area, "Novo agendamento", form)
            }
            Mode::EditingAgendamento { form, .. } => {
                self.draw_agendamento_form(frame, area, "Editar agendamento", form)
            }
            Mode::ConfirmAgendamentoDelete(confirm) => draw_confirm(
                frame,
                area,
                vec![Line::from(format!("Remove {}?", confirm.summary))],
            ),
            Mode::AddingResource(form) => {
                let title = format!("Novo {}", form.kind.label());
                draw_resource_form(frame, area, &title, form)
            }
            Mode::EditingResource { form, .. } => {
                let title = format!("Editar {}", form.kind.label());
                draw_resource_form(frame, area, &title, form)
            }
            Mode::ConfirmResourceDelete(confirm) => draw_confirm(
                frame,
                area,
                vec![
                    Line::from(format!("Remove {} {}?", confirm.kind, confirm.nome)),
                    Line::from("Refused while any agendamento uses it."),
                ],
            ),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let title = match &self.screen {
            Screen::List => "Agendamentos".to_string(),
            Screen::Calendar(calendar) => calendar.grid.title(),
            Screen::Resources(resources) => resources.kind.plural().to_string(),
        };
        let block = Block::default().borders(Borders::ALL).title(title);

        let text = match &self.screen {
            Screen::Resources(_) => Line::from(format!("Hoje: {}", format_date(self.today))),
            _ => Line::from(self.filter_summary()),
        };
        frame.render_widget(Paragraph::new(text).block(block), area);
    }

    fn draw_list(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL);
        if self.entries.is_empty() {
            let empty = Paragraph::new("Nenhum agendamento encontrado.")
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(empty, area);
            return;
        }

        let items: Vec<ListItem> = self
            .entries
            .iter()
            .map(|agendamento| {
                let style = if agendamento.is_past(self.today) {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default()
                };
                let mut spans = vec![
                    Span::styled(
                        format!("{}  {}  ", format_date(agendamento.data), agendamento.time_range()),
                        style.add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!(
                            "{} · {} · {}",
                            self.name(ResourceKind::Oficina, agendamento.oficina_id),
                            self.name(ResourceKind::Educador, agendamento.educador_id),
                            self.name(ResourceKind::Turma, agendamento.turma_id),
                        ),
                        style,
                    ),
                ];
                if let Some(obs) = &agendamento.observacoes {
                    spans.push(Span::styled(
                        format!("  | {}", truncate(obs, 40)),
                        Style::default().fg(Color::Gray),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_calendar(&self, frame: &mut Frame, area: Rect, calendar: &CalendarScreen) {
        let rows = calendar.grid.cells.len() / DAYS_PER_WEEK;
        let mut constraints = vec![Constraint::Length(1)];
        constraints.extend((0..rows).map(|_| Constraint::Ratio(1, rows.max(1) as u32)));
        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let column_constraints = [Constraint::Ratio(1, DAYS_PER_WEEK as u32); DAYS_PER_WEEK];
        let header = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(column_constraints)
            .split(row_areas[0]);
        for (name, cell_area) in WEEKDAY_NAMES.iter().zip(header.iter()) {
            let label = Paragraph::new(*name)
                .alignment(Alignment::Center)
                .style(Style::default().add_modifier(Modifier::BOLD));
            frame.render_widget(label, *cell_area);
        }

        for (week, row_area) in calendar.grid.weeks().zip(row_areas.iter().skip(1)) {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(column_constraints)
                .split(*row_area);
            for (cell, cell_area) in week.iter().zip(columns.iter()) {
                self.draw_calendar_cell(frame, *cell_area, cell, calendar.selected);
            }
        }
    }

    fn draw_calendar_cell(&self, frame: &mut Frame, area: Rect, cell: &CalendarCell, selected: NaiveDate) {
        let CalendarCell::Day(day) = cell else {
            let blank = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray));
            frame.render_widget(blank, area);
            return;
        };

        let mut border = Style::default();
        if day.is_today {
            border = border.fg(Color::Magenta);
        }
        if day.date == selected {
            border = border.fg(Color::Yellow).add_modifier(Modifier::BOLD);
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(Line::from(day.day().to_string()).alignment(Alignment::Right));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let width = inner.width as usize;
        let capacity = inner.height as usize;
        let mut lines: Vec<Line> = day
            .agendamentos
            .iter()
            .map(|a| {
                let text = format!(
                    "{} {}",
                    format_time(a.hora_inicio),
                    self.name(ResourceKind::Oficina, a.oficina_id)
                );
                Line::from(Span::styled(
                    truncate(&text, width),
                    Style::default().fg(Color::Cyan),
                ))
            })
            .collect();
        if capacity > 0 && lines.len() > capacity {
            let hidden = lines.len() - (capacity - 1);
            lines.truncate(capacity - 1);
            lines.push(Line::from(format!("+{hidden}")));
        }
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn draw_resources(&self, frame: &mut Frame, area: Rect, resources: &ResourceScreen) {
        let tabs: Vec<Span> = ResourceKind::ALL
            .iter()
            .map(|kind| {
                let style = if *kind == resources.kind {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                };
                Span::styled(format!(" {} ", kind.plural()), style)
            })
            .collect();
        let block = Block::default()
            .borders(Borders::ALL)
            .title(Line::from(tabs));

        let items: Vec<ListItem> = resources
            .items
            .iter()
            .map(|resource| {
                let mut text = format!("#{:<4} {}", resource.id(), resource.nome());
                if let Resource::Educador(educador) = resource {
                    let contacts: Vec<&str> = [&educador.email, &educador.telefone]
                        .into_iter()
                        .flatten()
                        .map(String::as_str)
                        .collect();
                    if !contacts.is_empty() {
                        text.push_str(&format!("  ({})", contacts.join(", ")));
                    }
                }
                ListItem::new(text)
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        if !resources.items.is_empty() {
            state.select(Some(resources.selected));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph =
            Paragraph::new(vec![status_line, self.footer_instructions()]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        match (&self.screen, &self.mode) {
            (_, Mode::AddingAgendamento(_) | Mode::EditingAgendamento { .. }) => key_hints(&[
                ("Tab", "Next field"),
                ("←→", "Pick resource"),
                ("Enter", "Save"),
                ("Esc", "Cancel"),
            ]),
            (_, Mode::AddingResource(_) | Mode::EditingResource { .. }) => {
                key_hints(&[("Tab", "Next field"), ("Enter", "Save"), ("Esc", "Cancel")])
            }
            (_, Mode::ConfirmAgendamentoDelete(_) | Mode::ConfirmResourceDelete(_)) => {
                key_hints(&[("Y", "Confirm"), ("N", "Cancel")])
            }
            (Screen::List, Mode::Normal) => key_hints(&[
                ("+", "Add"),
                ("e", "Edit"),
                ("-", "Remove"),
                ("p", "Período"),
                ("o/d/t", "Filter"),
                ("c", "Clear"),
                ("v", "Calendar"),
                ("r", "Registries"),
                ("q", "Quit"),
            ]),
            (Screen::Calendar(_), Mode::Normal) => key_hints(&[
                ("←↑↓→", "Day"),
                ("[ ]", "Month"),
                ("Home", "Today"),
                ("+", "Add"),
                ("Enter", "Open list"),
                ("p/o/d/t", "Filter"),
                ("Esc", "Back"),
            ]),
            (Screen::Resources(_), Mode::Normal) => key_hints(&[
                ("Tab", "Switch"),
                ("+", "Add"),
                ("e", "Edit"),
                ("-", "Remove"),
                ("Esc", "Back"),
                ("q", "Quit"),
            ]),
        }
    }

    fn draw_agendamento_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &AgendamentoForm) {
        let popup_area = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = AgendamentoField::ORDER
            .into_iter()
        .map(|field| {
            let hint = field.resource_kind().and_then(|kind| {
                form.value(field)
                    .trim()
                    .parse::<Id>()
                    .ok()
                    .map(|id| self.name(kind, id).to_string())
            });
            form.build_line(field, hint.as_deref())
        })
        .collect();
        lines.push(Line::from(""));

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else if !form.editing {
            lines.push(Line::from(Span::styled(
                "One agendamento is created per date.",
                Style::default().fg(Color::Gray),
            )));
        }

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
    }

    // ---------------------------------------------------------------------
    // State changes
    // ---------------------------------------------------------------------

    fn save_new_agendamentos(&mut self, form: &AgendamentoForm) -> Result<(), ScheduleError> {
        let input = form.to_input();
        let base = input.parse_base()?;
        let dates = input.parse_dates()?;
        let ids = self.agenda.create(&base, &dates)?;
        self.set_status(
            format!("Added {} agendamento(s).", ids.len()),
            StatusKind::Info,
        );
        self.refresh_after_write(ids.first().copied());
        Ok(())
    }

    fn save_existing_agendamento(&mut self, id: Id, form: &AgendamentoForm) -> Result<(), ScheduleError> {
        let agendamento = form.to_input().parse_update(id)?;
        self.agenda.update(&agendamento)?;
        self.set_status("Agendamento updated.", StatusKind::Info);
        self.refresh_after_write(Some(id));
        Ok(())
    }

    fn save_resource(&mut self, id: Option<Id>, form: &ResourceForm) -> Result<(), ScheduleError> {
        let draft = form.parse()?;
        let nome = draft.nome().to_string();
        match id {
            Some(id) => {
                let resource = Resource::from_draft(id, draft);
                self.agenda.update_resource(&resource)?;
                self.set_status(format!("Updated {nome}."), StatusKind::Info);
            }
            None => {
                self.agenda.add_resource(draft)?;
                self.set_status(format!("Added {nome}."), StatusKind::Info);
            }
        }
        self.refresh_after_write(None);
        Ok(())
    }

    /// Reload the views once a write has been committed. A failure here is
    /// only reported: the write stands and the form must close, or a retry
    /// would store it twice.
    fn refresh_after_write(&mut self, focus_id: Option<Id>) {
        let refreshed = self
            .reload_registries()
            .and_then(|()| self.refresh_views());
        match refreshed {
            Ok(()) => {
                if focus_id.is_some() {
                    self.focus(focus_id);
                }
            }
            Err(err) => {
                warn!(error = %err, "saved, but the views could not be reloaded");
                self.set_status(
                    format!(
                        "Saved, but the view could not be reloaded: {}",
                        surface_error(&ScheduleError::Storage(err))
                    ),
                    StatusKind::Error,
                );
            }
        }
    }

    fn reload_registries(&mut self) -> Result<()> {
        for kind in ResourceKind::ALL {
            self.registries.insert(kind, self.agenda.resources(kind)?);
        }
        Ok(())
    }

    fn reload_entries(&mut self, focus_id: Option<Id>) -> Result<()> {
        self.entries = self.agenda.query(&self.filter, self.today)?;
        self.focus(focus_id);
        Ok(())
    }

    /// Re-derive whatever the current screen shows from the store.
    fn refresh_views(&mut self) -> Result<()> {
        let focus = self.entries.get(self.selected).map(|a| a.id);
        self.reload_entries(focus)?;
        match &self.screen {
            Screen::Calendar(calendar) => {
                let (year, month) = calendar.year_month();
                let selected = calendar.selected;
                self.open_calendar(year, month)?;
                if let Screen::Calendar(calendar) = &mut self.screen {
                    calendar.selected = selected;
                }
            }
            Screen::Resources(resources) => {
                let kind = resources.kind;
                let items = self.registry(kind).to_vec();
                if let Screen::Resources(resources) = &mut self.screen {
                    resources.set_items(items);
                }
            }
            Screen::List => {}
        }
        Ok(())
    }

    fn focus(&mut self, id: Option<Id>) {
        if let Some(idx) = id.and_then(|id| self.entries.iter().position(|a| a.id == id)) {
            self.selected = idx;
        } else {
            self.selected = move_index(self.selected, self.entries.len(), 0);
        }
    }

    fn open_calendar(&mut self, year: i32, month: u32) -> Result<()> {
        let grid = self.agenda.month(&self.filter, year, month, self.today)?;
        let selected = if (self.today.year(), self.today.month()) == (year, month) {
            self.today
        } else {
            grid.days().next().map(|day| day.date).unwrap_or(self.today)
        };
        self.screen = Screen::Calendar(CalendarScreen { grid, selected });
        Ok(())
    }

    fn open_resources(&mut self, kind: ResourceKind) -> Result<()> {
        self.reload_registries()?;
        let items = self.registry(kind).to_vec();
        self.screen = Screen::Resources(ResourceScreen::new(kind, items));
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------------

    fn registry(&self, kind: ResourceKind) -> &[Resource] {
        self.registries.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    fn name(&self, kind: ResourceKind, id: Id) -> &str {
        self.registry(kind)
            .iter()
            .find(|r| r.id() == id)
            .map(Resource::nome)
            .unwrap_or(UNKNOWN_NAME)
    }

    fn summary(&self, agendamento: &Agendamento) -> Result<String> {
        Ok(format!(
            "{} {} {}",
            self.agenda
                .display_name(ResourceKind::Oficina, agendamento.oficina_id)?,
            format_date(agendamento.data),
            format_time(agendamento.hora_inicio),
        ))
    }

    fn filter_summary(&self) -> String {
        let mut parts = vec![format!("Período: {}", self.filter.periodo)];
        for kind in ResourceKind::ALL {
            if let Some(id) = self.filter.resource(kind) {
                parts.push(format!("{}: {}", kind.label(), self.name(kind, id)));
            }
        }
        parts.push(format!("{} resultado(s)", self.entries.len()));
        parts.join("   ")
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }
}

fn draw_resource_form(frame: &mut Frame, area: Rect, title: &str, form: &ResourceForm) {
    let popup_area = centered_rect(60, 40, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default().title(title.to_string()).borders(Borders::ALL);
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    let mut lines: Vec<Line> = form.fields().iter().map(|f| form.build_line(*f)).collect();
    lines.push(Line::from(""));
    if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

    let row = form
        .fields()
        .iter()
        .position(|f| *f == form.active)
        .unwrap_or(0) as u16;
    let prefix = format!("{}: ", form.active.label()).chars().count() as u16;
    let value_len = form.value(form.active).chars().count() as u16;
    frame.set_cursor_position((inner.x + prefix + value_len, inner.y + row));
}

fn draw_confirm(frame: &mut Frame, area: Rect, mut lines: Vec<Line<'static>>) {
    let popup_area = centered_rect(60, 30, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title("Confirm Removal")
        .borders(Borders::ALL);
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press Y to confirm or N / Esc to cancel.",
        Style::default().fg(Color::Gray),
    )));

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agenda::Rules;
    use crate::backend::MemoryBackend;
    use crate::dates::parse_date;
    use crate::models::{AgendamentoDraft, ResourceDraft};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Memory store whose agendamento reads can be switched to fail.
    struct FlakyReads {
        inner: MemoryBackend,
        failing: Rc<Cell<bool>>,
    }

    impl Backend for FlakyReads {
        fn fetch_resources(&self, kind: ResourceKind) -> Result<Vec<Resource>> {
            self.inner.fetch_resources(kind)
        }

        fn fetch_resource(&self, kind: ResourceKind, id: Id) -> Result<Option<Resource>> {
            self.inner.fetch_resource(kind, id)
        }

        fn insert_resource(&mut self, draft: ResourceDraft) -> Result<Resource> {
            self.inner.insert_resource(draft)
        }

        fn update_resource(&mut self, resource: &Resource) -> Result<bool> {
            self.inner.update_resource(resource)
        }

        fn delete_resource(&mut self, kind: ResourceKind, id: Id) -> Result<bool> {
            self.inner.delete_resource(kind, id)
        }

        fn fetch_agendamentos(&self) -> Result<Vec<Agendamento>> {
            if self.failing.get() {
                anyhow::bail!("database is locked");
            }
            self.inner.fetch_agendamentos()
        }

        fn fetch_agendamento(&self, id: Id) -> Result<Option<Agendamento>> {
            self.inner.fetch_agendamento(id)
        }

        fn insert_agendamentos(
            &mut self,
            drafts: Vec<AgendamentoDraft>,
        ) -> Result<Vec<Agendamento>> {
            self.inner.insert_agendamentos(drafts)
        }

        fn update_agendamento(&mut self, agendamento: &Agendamento) -> Result<bool> {
            self.inner.update_agendamento(agendamento)
        }

        fn delete_agendamento(&mut self, id: Id) -> Result<bool> {
            self.inner.delete_agendamento(id)
        }
    }

    fn app() -> App<MemoryBackend> {
        app_with(MemoryBackend::new())
    }

    fn app_with<B: Backend>(backend: B) -> App<B> {
        let mut agenda = Agenda::new(backend, Rules::default());
        agenda
            .add_resource(ResourceDraft::Oficina { nome: "Teatro".into() })
            .unwrap();
        agenda
            .add_resource(ResourceDraft::Educador {
                nome: "Ana".into(),
                email: None,
                telefone: None,
            })
            .unwrap();
        agenda
            .add_resource(ResourceDraft::Turma { nome: "5A".into() })
            .unwrap();
        App::new(agenda, parse_date("2024-06-12").unwrap()).unwrap()
    }

    fn type_text<B: Backend>(app: &mut App<B>, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    #[test]
    fn adding_through_the_form_creates_one_record_per_date() {
        let mut app = app();
        app.handle_key(KeyCode::Char('+')).unwrap();
        for _ in 0..3 {
            app.handle_key(KeyCode::Right).unwrap();
            app.handle_key(KeyCode::Tab).unwrap();
        }
        type_text(&mut app, "2024-06-12,2024-06-19");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "09:00");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "10:00");
        app.handle_key(KeyCode::Enter).unwrap();

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.entries.len(), 2);
        assert_eq!(app.agenda.list_all().unwrap().len(), 2);
    }

    #[test]
    fn failed_reload_after_a_save_still_closes_the_form() {
        let failing = Rc::new(Cell::new(false));
        let mut app = app_with(FlakyReads {
            inner: MemoryBackend::new(),
            failing: Rc::clone(&failing),
        });
        app.handle_key(KeyCode::Char('+')).unwrap();
        for _ in 0..3 {
            app.handle_key(KeyCode::Right).unwrap();
            app.handle_key(KeyCode::Tab).unwrap();
        }
        type_text(&mut app, "2024-06-12");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "09:00");
        app.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut app, "10:00");

        failing.set(true);
        app.handle_key(KeyCode::Enter).unwrap();
        assert!(matches!(app.mode, Mode::Normal));
        assert!(matches!(
            app.status,
            Some(StatusMessage {
                kind: StatusKind::Error,
                ..
            })
        ));

        // Enter again is a plain list key now, not a second submit.
        app.handle_key(KeyCode::Enter).unwrap();
        failing.set(false);
        assert_eq!(app.agenda.list_all().unwrap().len(), 1);
    }

    #[test]
    fn invalid_form_stays_open_with_an_error() {
        let mut app = app();
        app.handle_key(KeyCode::Char('+')).unwrap();
        app.handle_key(KeyCode::Enter).unwrap();
        match &app.mode {
            Mode::AddingAgendamento(form) => assert!(form.error.is_some()),
            _ => panic!("form should still be open"),
        }
        assert!(app.agenda.list_all().unwrap().is_empty());
    }

    #[test]
    fn refused_resource_deletion_reports_in_status() {
        let mut app = app();
        let base = crate::input::AgendamentoInput {
            oficina_id: "1".into(),
            educador_id: "1".into(),
            turma_id: "1".into(),
            hora_inicio: "09:00".into(),
            hora_fim: "10:00".into(),
            ..Default::default()
        }
        .parse_base()
        .unwrap();
        app.agenda
            .create(&base, &[parse_date("2024-06-12").unwrap()])
            .unwrap();

        app.handle_key(KeyCode::Char('r')).unwrap();
        app.handle_key(KeyCode::Char('-')).unwrap();
        app.handle_key(KeyCode::Char('y')).unwrap();

        assert!(matches!(
            app.status,
            Some(StatusMessage {
                kind: StatusKind::Error,
                ..
            })
        ));
        assert!(app.agenda.exists(ResourceKind::Oficina, 1).unwrap());
    }

    #[test]
    fn filter_cycling_walks_ids_then_resets() {
        let mut app = app();
        app.handle_key(KeyCode::Char('o')).unwrap();
        assert_eq!(app.filter.oficina_id, Some(1));
        app.handle_key(KeyCode::Char('o')).unwrap();
        assert_eq!(app.filter.oficina_id, None);
        app.handle_key(KeyCode::Char('p')).unwrap();
        assert_eq!(app.filter.periodo, crate::query::Periodo::Futuro);
    }

    #[test]
    fn calendar_opens_on_current_month() {
        let mut app = app();
        app.handle_key(KeyCode::Char('v')).unwrap();
        match &app.screen {
            Screen::Calendar(calendar) => {
                assert_eq!(calendar.year_month(), (2024, 6));
                assert_eq!(calendar.selected, app.today);
            }
            _ => panic!("calendar should be open"),
        }
        app.handle_key(KeyCode::Char(']')).unwrap();
        match &app.screen {
            Screen::Calendar(calendar) => assert_eq!(calendar.year_month(), (2024, 7)),
            _ => panic!("calendar should be open"),
        }
    }
}
