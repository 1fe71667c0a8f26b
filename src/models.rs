//! Domain models shared by the store, the storage backends and the TUI. These
//! types stay plain data holders: validation lives in `agenda`, parsing of raw
//! form text lives in `input`, and persistence lives behind `Backend`.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};

use crate::dates::format_time;

/// Identifier assigned by the backend when a record is created. Identifiers
/// are positive, unique within their collection and never reused.
pub type Id = i64;

/// The three registries an agendamento points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Oficina,
    Educador,
    Turma,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Oficina,
        ResourceKind::Educador,
        ResourceKind::Turma,
    ];

    /// Lower-case singular name, used in error messages and logs.
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Oficina => "oficina",
            ResourceKind::Educador => "educador",
            ResourceKind::Turma => "turma",
        }
    }

    /// Capitalized plural name, used for screen titles.
    pub fn plural(self) -> &'static str {
        match self {
            ResourceKind::Oficina => "Oficinas",
            ResourceKind::Educador => "Educadores",
            ResourceKind::Turma => "Turmas",
        }
    }

    /// The foreign key of this kind carried by an agendamento.
    pub fn key_of(self, agendamento: &Agendamento) -> Id {
        match self {
            ResourceKind::Oficina => agendamento.oficina_id,
            ResourceKind::Educador => agendamento.educador_id,
            ResourceKind::Turma => agendamento.turma_id,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A workshop or activity type that gets scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Oficina {
    pub id: Id,
    pub nome: String,
}

/// An educator. Contact fields are optional and stored as `None` when blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Educador {
    pub id: Id,
    pub nome: String,
    pub email: Option<String>,
    pub telefone: Option<String>,
}

/// A class group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turma {
    pub id: Id,
    pub nome: String,
}

/// Any registry record. Used wherever code handles the three registries
/// uniformly (integrity checks, the resources screen, backend plumbing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Oficina(Oficina),
    Educador(Educador),
    Turma(Turma),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Oficina(_) => ResourceKind::Oficina,
            Resource::Educador(_) => ResourceKind::Educador,
            Resource::Turma(_) => ResourceKind::Turma,
        }
    }

    pub fn id(&self) -> Id {
        match self {
            Resource::Oficina(o) => o.id,
            Resource::Educador(e) => e.id,
            Resource::Turma(t) => t.id,
        }
    }

    pub fn nome(&self) -> &str {
        match self {
            Resource::Oficina(o) => &o.nome,
            Resource::Educador(e) => &e.nome,
            Resource::Turma(t) => &t.nome,
        }
    }

    /// Rebuild the record with the given id, keeping every other field.
    pub(crate) fn from_draft(id: Id, draft: ResourceDraft) -> Self {
        match draft {
            ResourceDraft::Oficina { nome } => Resource::Oficina(Oficina { id, nome }),
            ResourceDraft::Educador {
                nome,
                email,
                telefone,
            } => Resource::Educador(Educador {
                id,
                nome,
                email,
                telefone,
            }),
            ResourceDraft::Turma { nome } => Resource::Turma(Turma { id, nome }),
        }
    }

    /// Strip the id back off, yielding the editable fields.
    pub fn to_draft(&self) -> ResourceDraft {
        match self {
            Resource::Oficina(o) => ResourceDraft::Oficina {
                nome: o.nome.clone(),
            },
            Resource::Educador(e) => ResourceDraft::Educador {
                nome: e.nome.clone(),
                email: e.email.clone(),
                telefone: e.telefone.clone(),
            },
            Resource::Turma(t) => ResourceDraft::Turma {
                nome: t.nome.clone(),
            },
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.nome())
    }
}

/// A registry record that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceDraft {
    Oficina {
        nome: String,
    },
    Educador {
        nome: String,
        email: Option<String>,
        telefone: Option<String>,
    },
    Turma {
        nome: String,
    },
}

impl ResourceDraft {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceDraft::Oficina { .. } => ResourceKind::Oficina,
            ResourceDraft::Educador { .. } => ResourceKind::Educador,
            ResourceDraft::Turma { .. } => ResourceKind::Turma,
        }
    }

    pub fn nome(&self) -> &str {
        match self {
            ResourceDraft::Oficina { nome }
            | ResourceDraft::Educador { nome, .. }
            | ResourceDraft::Turma { nome } => nome,
        }
    }
}

/// Everything an agendamento carries except its id and its date. Batch
/// creation stamps one record per date out of a single base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendamentoBase {
    pub oficina_id: Id,
    pub educador_id: Id,
    pub turma_id: Id,
    pub hora_inicio: NaiveTime,
    pub hora_fim: NaiveTime,
    pub observacoes: Option<String>,
}

/// A base bound to a date, ready to be handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendamentoDraft {
    pub base: AgendamentoBase,
    pub data: NaiveDate,
}

/// A scheduling record binding one oficina, one educador and one turma to a
/// date and time window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agendamento {
    pub id: Id,
    pub oficina_id: Id,
    pub educador_id: Id,
    pub turma_id: Id,
    pub data: NaiveDate,
    pub hora_inicio: NaiveTime,
    pub hora_fim: NaiveTime,
    pub observacoes: Option<String>,
}

impl Agendamento {
    pub fn from_draft(id: Id, draft: AgendamentoDraft) -> Self {
        let AgendamentoDraft { base, data } = draft;
        Self {
            id,
            oficina_id: base.oficina_id,
            educador_id: base.educador_id,
            turma_id: base.turma_id,
            data,
            hora_inicio: base.hora_inicio,
            hora_fim: base.hora_fim,
            observacoes: base.observacoes,
        }
    }

    pub fn base(&self) -> AgendamentoBase {
        AgendamentoBase {
            oficina_id: self.oficina_id,
            educador_id: self.educador_id,
            turma_id: self.turma_id,
            hora_inicio: self.hora_inicio,
            hora_fim: self.hora_fim,
            observacoes: self.observacoes.clone(),
        }
    }

    /// Same date and intersecting `[inicio, fim)` windows. Back-to-back
    /// sessions (one ends at 10:00, the next starts at 10:00) do not overlap.
    pub fn overlaps(&self, other: &Agendamento) -> bool {
        self.data == other.data
            && self.hora_inicio < other.hora_fim
            && other.hora_inicio < self.hora_fim
    }

    /// Dated strictly before `today`. Today's sessions are never past.
    pub fn is_past(&self, today: NaiveDate) -> bool {
        self.data < today
    }

    /// `HH:MM - HH:MM`, the form used by every list and calendar cell.
    pub fn time_range(&self) -> String {
        format!(
            "{} - {}",
            format_time(self.hora_inicio),
            format_time(self.hora_fim)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::{parse_date, parse_time};

    fn record(id: Id, data: &str, inicio: &str, fim: &str) -> Agendamento {
        Agendamento {
            id,
            oficina_id: 1,
            educador_id: 1,
            turma_id: 1,
            data: parse_date(data).unwrap(),
            hora_inicio: parse_time(inicio).unwrap(),
            hora_fim: parse_time(fim).unwrap(),
            observacoes: None,
        }
    }

    #[test]
    fn back_to_back_sessions_do_not_overlap() {
        let first = record(1, "2024-06-12", "09:00", "10:00");
        let second = record(2, "2024-06-12", "10:00", "11:00");
        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));
    }

    #[test]
    fn nested_window_overlaps_only_on_same_date() {
        let outer = record(1, "2024-06-12", "08:00", "12:00");
        let inner = record(2, "2024-06-12", "09:30", "10:00");
        let other_day = record(3, "2024-06-13", "09:30", "10:00");
        assert!(outer.overlaps(&inner));
        assert!(!outer.overlaps(&other_day));
    }

    #[test]
    fn key_of_picks_matching_foreign_key() {
        let mut ag = record(1, "2024-06-12", "09:00", "10:00");
        ag.oficina_id = 4;
        ag.educador_id = 5;
        ag.turma_id = 6;
        assert_eq!(ResourceKind::Oficina.key_of(&ag), 4);
        assert_eq!(ResourceKind::Educador.key_of(&ag), 5);
        assert_eq!(ResourceKind::Turma.key_of(&ag), 6);
    }

    #[test]
    fn resource_round_trips_through_draft() {
        let educador = Resource::Educador(Educador {
            id: 7,
            nome: "Ana".into(),
            email: Some("ana@example.org".into()),
            telefone: None,
        });
        let rebuilt = Resource::from_draft(7, educador.to_draft());
        assert_eq!(rebuilt, educador);
        assert_eq!(rebuilt.kind(), ResourceKind::Educador);
    }

    #[test]
    fn past_is_strictly_before_today() {
        let today = parse_date("2024-06-12").unwrap();
        assert!(record(1, "2024-06-11", "09:00", "10:00").is_past(today));
        assert!(!record(2, "2024-06-12", "09:00", "10:00").is_past(today));
    }
}
