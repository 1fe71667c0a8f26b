//! Error taxonomy of the scheduling core. Every variant is recoverable: the
//! store reports it and leaves its state untouched.

use thiserror::Error;

use crate::models::{Id, ResourceKind};

/// Result alias for core operations.
pub type Result<T, E = ScheduleError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A foreign key does not resolve to an existing resource.
    #[error("{kind} {id} does not exist")]
    Referential { kind: ResourceKind, id: Id },

    /// A resource cannot be removed while agendamentos still point at it.
    #[error("{kind} {id} is still used by {references} agendamento(s)")]
    IntegrityViolation {
        kind: ResourceKind,
        id: Id,
        references: usize,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Id },

    /// Only raised when double-booking rejection is switched on.
    #[error("{kind} {id} is already booked at that time (agendamento {conflicting})")]
    DoubleBooking {
        kind: ResourceKind,
        id: Id,
        conflicting: Id,
    },

    /// The backend failed.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("at least one date is required")]
    NoDates,

    #[error("invalid {field}: {value:?}")]
    Malformed { field: &'static str, value: String },

    #[error("end time {fim} must be after start time {inicio}")]
    TimeOrder { inicio: String, fim: String },

    #[error("invalid month {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },
}

impl ScheduleError {
    /// Short classification used in log fields.
    pub fn category(&self) -> &'static str {
        match self {
            ScheduleError::Validation(_) => "validation",
            ScheduleError::Referential { .. } => "referential",
            ScheduleError::IntegrityViolation { .. } => "integrity",
            ScheduleError::NotFound { .. } => "not_found",
            ScheduleError::DoubleBooking { .. } => "double_booking",
            ScheduleError::Storage(_) => "storage",
        }
    }
}
