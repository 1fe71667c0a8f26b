use std::mem;

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::error::ValidationError;
use crate::input::{AgendamentoInput, ResourceInput};
use crate::models::{Agendamento, Id, Resource, ResourceDraft, ResourceKind};

/// Fields of the agendamento form, in tab order.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub(crate) enum AgendamentoField {
    #[default]
    Oficina,
    Educador,
    Turma,
    Datas,
    HoraInicio,
    HoraFim,
    Observacoes,
}

impl AgendamentoField {
    pub(crate) const ORDER: [AgendamentoField; 7] = [
        AgendamentoField::Oficina,
        AgendamentoField::Educador,
        AgendamentoField::Turma,
        AgendamentoField::Datas,
        AgendamentoField::HoraInicio,
        AgendamentoField::HoraFim,
        AgendamentoField::Observacoes,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            AgendamentoField::Oficina => "Oficina",
            AgendamentoField::Educador => "Educador",
            AgendamentoField::Turma => "Turma",
            AgendamentoField::Datas => "Datas",
            AgendamentoField::HoraInicio => "Início",
            AgendamentoField::HoraFim => "Fim",
            AgendamentoField::Observacoes => "Observações",
        }
    }

    /// The registry a field points into, if any.
    pub(crate) fn resource_kind(self) -> Option<ResourceKind> {
        match self {
            AgendamentoField::Oficina => Some(ResourceKind::Oficina),
            AgendamentoField::Educador => Some(ResourceKind::Educador),
            AgendamentoField::Turma => Some(ResourceKind::Turma),
            _ => None,
        }
    }

    fn index(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    fn offset(self, delta: isize) -> Self {
        let len = Self::ORDER.len() as isize;
        let idx = (self.index() as isize + delta).rem_euclid(len);
        Self::ORDER[idx as usize]
    }
}

/// Editable state of the add/edit agendamento popup. Values stay raw text
/// until submit, when `input::AgendamentoInput` parses them.
#[derive(Default, Clone)]
pub(crate) struct AgendamentoForm {
    /// Every field except the dates; `input.datas` is only filled by
    /// `to_input`.
    pub(crate) input: AgendamentoInput,
    /// Comma separated when adding; a single date when editing.
    pub(crate) datas: String,
    pub(crate) active: AgendamentoField,
    pub(crate) error: Option<String>,
    pub(crate) editing: bool,
}

impl AgendamentoForm {
    /// Blank form, optionally seeded with a date (the calendar's selected day).
    pub(crate) fn new(date: Option<String>) -> Self {
        Self {
            datas: date.unwrap_or_default(),
            ..Self::default()
        }
    }

    pub(crate) fn from_agendamento(agendamento: &Agendamento) -> Self {
        let mut input = AgendamentoInput::from_agendamento(agendamento);
        let datas = mem::take(&mut input.datas).join(", ");
        Self {
            datas,
            input,
            active: AgendamentoField::Oficina,
            error: None,
            editing: true,
        }
    }

    pub(crate) fn next_field(&mut self) {
        self.active = self.active.offset(1);
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = self.active.offset(-1);
    }

    fn value_mut(&mut self, field: AgendamentoField) -> &mut String {
        match field {
            AgendamentoField::Oficina => &mut self.input.oficina_id,
            AgendamentoField::Educador => &mut self.input.educador_id,
            AgendamentoField::Turma => &mut self.input.turma_id,
            AgendamentoField::Datas => &mut self.datas,
            AgendamentoField::HoraInicio => &mut self.input.hora_inicio,
            AgendamentoField::HoraFim => &mut self.input.hora_fim,
            AgendamentoField::Observacoes => &mut self.input.observacoes,
        }
    }

    pub(crate) fn value(&self, field: AgendamentoField) -> &str {
        match field {
            AgendamentoField::Oficina => &self.input.oficina_id,
            AgendamentoField::Educador => &self.input.educador_id,
            AgendamentoField::Turma => &self.input.turma_id,
            AgendamentoField::Datas => &self.datas,
            AgendamentoField::HoraInicio => &self.input.hora_inicio,
            AgendamentoField::HoraFim => &self.input.hora_fim,
            AgendamentoField::Observacoes => &self.input.observacoes,
        }
    }

    /// Append a character to the active field, keeping only characters that
    /// can appear in it.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        let allowed = match self.active {
            AgendamentoField::Oficina | AgendamentoField::Educador | AgendamentoField::Turma => {
                ch.is_ascii_digit()
            }
            AgendamentoField::Datas => {
                ch.is_ascii_digit() || ch == '-' || ch == ',' || (ch == ' ' && !self.editing)
            }
            AgendamentoField::HoraInicio | AgendamentoField::HoraFim => {
                ch.is_ascii_digit() || ch == ':'
            }
            AgendamentoField::Observacoes => !ch.is_control(),
        };
        if allowed {
            self.value_mut(self.active).push(ch);
        }
        allowed
    }

    pub(crate) fn backspace(&mut self) {
        self.value_mut(self.active).pop();
    }

    /// Step the active resource field through the registry ids.
    pub(crate) fn cycle_resource(&mut self, ids: &[Id], delta: isize) {
        if ids.is_empty() || self.active.resource_kind().is_none() {
            return;
        }
        let current = self.value(self.active).trim().parse::<Id>().ok();
        let len = ids.len() as isize;
        let next = match current.and_then(|id| ids.iter().position(|i| *i == id)) {
            Some(idx) => (idx as isize + delta).rem_euclid(len) as usize,
            None if delta < 0 => ids.len() - 1,
            None => 0,
        };
        *self.value_mut(self.active) = ids[next].to_string();
    }

    /// The form as parser input, with the date list split into entries.
    pub(crate) fn to_input(&self) -> AgendamentoInput {
        let mut input = self.input.clone();
        input.set_dates_from_list(&self.datas);
        input
    }

    pub(crate) fn build_line(&self, field: AgendamentoField, hint: Option<&str>) -> Line<'static> {
        let value = self.value(field);
        let is_active = self.active == field;
        let display = if value.is_empty() {
            match field {
                AgendamentoField::Datas if !self.editing => "<AAAA-MM-DD, ...>".to_string(),
                AgendamentoField::Datas => "<AAAA-MM-DD>".to_string(),
                AgendamentoField::HoraInicio | AgendamentoField::HoraFim => "<HH:MM>".to_string(),
                AgendamentoField::Observacoes => "<optional>".to_string(),
                _ => "<required>".to_string(),
            }
        } else {
            value.to_string()
        };

        let mut spans = vec![
            Span::styled(format!("{}: ", field.label()), label_style(is_active)),
            Span::raw(display),
        ];
        if let Some(hint) = hint {
            spans.push(Span::styled(
                format!("  ({hint})"),
                Style::default().fg(Color::Gray),
            ));
        }
        Line::from(spans)
    }
}

/// Fields of the resource form.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub(crate) enum ResourceField {
    #[default]
    Nome,
    Email,
    Telefone,
}

impl ResourceField {
    pub(crate) fn label(self) -> &'static str {
        match self {
            ResourceField::Nome => "Nome",
            ResourceField::Email => "Email",
            ResourceField::Telefone => "Telefone",
        }
    }
}

/// Add/edit popup for oficinas, educadores and turmas. Contact fields only
/// show up for educadores.
#[derive(Clone)]
pub(crate) struct ResourceForm {
    pub(crate) kind: ResourceKind,
    pub(crate) input: ResourceInput,
    pub(crate) active: ResourceField,
    pub(crate) error: Option<String>,
}

impl ResourceForm {
    pub(crate) fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            input: ResourceInput::default(),
            active: ResourceField::Nome,
            error: None,
        }
    }

    pub(crate) fn from_resource(resource: &Resource) -> Self {
        Self {
            kind: resource.kind(),
            input: ResourceInput::from_draft(&resource.to_draft()),
            active: ResourceField::Nome,
            error: None,
        }
    }

    pub(crate) fn fields(&self) -> &'static [ResourceField] {
        match self.kind {
            ResourceKind::Educador => &[
                ResourceField::Nome,
                ResourceField::Email,
                ResourceField::Telefone,
            ],
            _ => &[ResourceField::Nome],
        }
    }

    pub(crate) fn toggle_field(&mut self, delta: isize) {
        let fields = self.fields();
        let idx = fields.iter().position(|f| *f == self.active).unwrap_or(0) as isize;
        let next = (idx + delta).rem_euclid(fields.len() as isize) as usize;
        self.active = fields[next];
    }

    fn value_mut(&mut self, field: ResourceField) -> &mut String {
        match field {
            ResourceField::Nome => &mut self.input.nome,
            ResourceField::Email => &mut self.input.email,
            ResourceField::Telefone => &mut self.input.telefone,
        }
    }

    pub(crate) fn value(&self, field: ResourceField) -> &str {
        match field {
            ResourceField::Nome => &self.input.nome,
            ResourceField::Email => &self.input.email,
            ResourceField::Telefone => &self.input.telefone,
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.value_mut(self.active).push(ch);
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.value_mut(self.active).pop();
    }

    pub(crate) fn parse(&self) -> Result<ResourceDraft, ValidationError> {
        self.input.parse(self.kind)
    }

    pub(crate) fn build_line(&self, field: ResourceField) -> Line<'static> {
        let value = self.value(field);
        let display = if !value.is_empty() {
            value.to_string()
        } else if field == ResourceField::Nome {
            "<required>".to_string()
        } else {
            "<optional>".to_string()
        };
        Line::from(vec![
            Span::styled(
                format!("{}: ", field.label()),
                label_style(self.active == field),
            ),
            Span::raw(display),
        ])
    }
}

/// Pending removal of an agendamento, described for the confirmation popup.
#[derive(Clone)]
pub(crate) struct ConfirmAgendamentoDelete {
    pub(crate) id: Id,
    pub(crate) summary: String,
}

#[derive(Clone)]
pub(crate) struct ConfirmResourceDelete {
    pub(crate) kind: ResourceKind,
    pub(crate) id: Id,
    pub(crate) nome: String,
}

fn label_style(is_active: bool) -> Style {
    if is_active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_only_in_id_fields() {
        let mut form = AgendamentoForm::new(None);
        assert!(form.push_char('4'));
        assert!(!form.push_char('x'));
        assert_eq!(form.value(AgendamentoField::Oficina), "4");
    }

    #[test]
    fn cycling_walks_registry_ids() {
        let mut form = AgendamentoForm::new(None);
        form.cycle_resource(&[3, 8, 11], 1);
        assert_eq!(form.input.oficina_id, "3");
        form.cycle_resource(&[3, 8, 11], 1);
        form.cycle_resource(&[3, 8, 11], 1);
        form.cycle_resource(&[3, 8, 11], 1);
        assert_eq!(form.input.oficina_id, "3");
        form.cycle_resource(&[3, 8, 11], -1);
        assert_eq!(form.input.oficina_id, "11");
    }

    #[test]
    fn tab_order_wraps() {
        let mut form = AgendamentoForm::new(None);
        form.previous_field();
        assert_eq!(form.active, AgendamentoField::Observacoes);
        form.next_field();
        assert_eq!(form.active, AgendamentoField::Oficina);
    }

    #[test]
    fn date_list_reaches_the_parser() {
        let mut form = AgendamentoForm::new(Some("2024-06-12".into()));
        form.datas.push_str(", 2024-06-19");
        assert_eq!(form.to_input().datas, vec!["2024-06-12", "2024-06-19"]);
    }

    #[test]
    fn editing_keeps_a_single_copy_of_the_date() {
        let record = Agendamento {
            id: 4,
            oficina_id: 1,
            educador_id: 2,
            turma_id: 3,
            data: crate::dates::parse_date("2024-06-12").unwrap(),
            hora_inicio: crate::dates::parse_time("09:00").unwrap(),
            hora_fim: crate::dates::parse_time("10:00").unwrap(),
            observacoes: None,
        };
        let mut form = AgendamentoForm::from_agendamento(&record);
        assert_eq!(form.datas, "2024-06-12");
        assert!(form.input.datas.is_empty());

        form.active = AgendamentoField::Datas;
        form.backspace();
        form.push_char('9');
        assert_eq!(form.to_input().datas, vec!["2024-06-19"]);
        assert_eq!(form.to_input().parse_update(4).unwrap().data.to_string(), "2024-06-19");
    }

    #[test]
    fn only_educadores_have_contact_fields() {
        let mut turma = ResourceForm::new(ResourceKind::Turma);
        turma.toggle_field(1);
        assert_eq!(turma.active, ResourceField::Nome);

        let mut educador = ResourceForm::new(ResourceKind::Educador);
        educador.toggle_field(1);
        assert_eq!(educador.active, ResourceField::Email);
        educador.toggle_field(-2);
        assert_eq!(educador.active, ResourceField::Telefone);
    }
}
