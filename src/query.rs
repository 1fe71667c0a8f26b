//! Filtered, time-ordered views over an agendamento snapshot.
//!
//! Filtering is a pure function of the snapshot, the filter and the
//! reference date: the input is never touched and every call allocates a new
//! vector.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::dates::{month_bounds, week_bounds};
use crate::error::ValidationError;
use crate::models::{Agendamento, Id, ResourceKind};

/// Named relative date ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Periodo {
    #[default]
    Todos,
    /// From today on.
    Futuro,
    /// Strictly before today.
    Passado,
    /// Sunday through Saturday of the current week.
    Semana,
    /// First through last day of the current month.
    Mes,
}

impl Periodo {
    pub const ALL: [Periodo; 5] = [
        Periodo::Todos,
        Periodo::Futuro,
        Periodo::Passado,
        Periodo::Semana,
        Periodo::Mes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Periodo::Todos => "todos",
            Periodo::Futuro => "futuro",
            Periodo::Passado => "passado",
            Periodo::Semana => "semana",
            Periodo::Mes => "mes",
        }
    }

    /// The following value in `ALL`, wrapping around. Drives filter cycling
    /// in the TUI.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Whether `date` falls inside the period as seen from `today`.
    pub fn contains(self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Periodo::Todos => true,
            Periodo::Futuro => date >= today,
            Periodo::Passado => date < today,
            Periodo::Semana => {
                week_bounds(today).is_some_and(|(start, end)| start <= date && date <= end)
            }
            Periodo::Mes => month_bounds(today.year(), today.month())
                .is_some_and(|(start, end)| start <= date && date <= end),
        }
    }
}

impl fmt::Display for Periodo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Periodo {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Periodo::Todos);
        }
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ValidationError::Malformed {
                field: "periodo",
                value: s.to_string(),
            })
    }
}

/// Independent, optional predicates combined with AND. `None` matches
/// everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgendaFilter {
    pub oficina_id: Option<Id>,
    pub educador_id: Option<Id>,
    pub turma_id: Option<Id>,
    pub periodo: Periodo,
}

impl AgendaFilter {
    pub fn resource(&self, kind: ResourceKind) -> Option<Id> {
        match kind {
            ResourceKind::Oficina => self.oficina_id,
            ResourceKind::Educador => self.educador_id,
            ResourceKind::Turma => self.turma_id,
        }
    }

    pub fn set_resource(&mut self, kind: ResourceKind, id: Option<Id>) {
        match kind {
            ResourceKind::Oficina => self.oficina_id = id,
            ResourceKind::Educador => self.educador_id = id,
            ResourceKind::Turma => self.turma_id = id,
        }
    }

    pub fn matches(&self, agendamento: &Agendamento, today: NaiveDate) -> bool {
        ResourceKind::ALL.into_iter().all(|kind| {
            self.resource(kind)
                .map_or(true, |id| kind.key_of(agendamento) == id)
        }) && self.periodo.contains(agendamento.data, today)
    }
}

/// Apply `filter` to `snapshot` and sort by `(data, hora_inicio)`. The sort
/// is stable, so records tied on both keys keep their snapshot order.
pub fn filter_agendamentos(
    snapshot: &[Agendamento],
    filter: &AgendaFilter,
    today: NaiveDate,
) -> Vec<Agendamento> {
    let mut selected: Vec<Agendamento> = snapshot
        .iter()
        .filter(|a| filter.matches(a, today))
        .cloned()
        .collect();
    sort_chronologically(&mut selected);
    selected
}

pub fn sort_chronologically(agendamentos: &mut [Agendamento]) {
    agendamentos.sort_by(|a, b| (a.data, a.hora_inicio).cmp(&(b.data, b.hora_inicio)));
}
