//! Scheduling records for workshops: each agendamento binds an oficina, an
//! educador and a turma to a date and a time window.
//!
//! `Agenda` is the entry point. It validates every write against the
//! registries and the time rules before handing it to a `Backend`.
pub mod agenda;
pub mod backend;
pub mod calendar;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod input;
pub mod integrity;
pub mod logging;
pub mod models;
pub mod query;
pub mod ui;

pub use agenda::{Agenda, Rules};
pub use backend::{Backend, MemoryBackend};
pub use calendar::{month_grid, CalendarCell, DayCell, MonthGrid};
pub use config::Config;
pub use db::SqliteBackend;
pub use error::{ScheduleError, ValidationError};
pub use models::{
    Agendamento, AgendamentoBase, Educador, Id, Oficina, Resource, ResourceDraft, ResourceKind,
    Turma,
};
pub use query::{AgendaFilter, Periodo};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
