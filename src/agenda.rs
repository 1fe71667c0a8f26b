//! The scheduling record store.
//!
//! `Agenda` owns a [`Backend`] and is the only way the rest of the
//! application changes it. It validates every agendamento against the three
//! registries before writing, refuses resource deletions that would leave
//! dangling references, and hands out owned snapshots for the read-side
//! projections (`query`, `calendar`).
//!
//! Mutating methods take `&mut self`, so the check-then-write sequences
//! below cannot interleave with another writer of the same `Agenda`.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::calendar::{month_grid, MonthGrid};
use crate::dates::format_time;
use crate::error::{Result, ScheduleError, ValidationError};
use crate::integrity;
use crate::models::{
    Agendamento, AgendamentoBase, AgendamentoDraft, Id, Resource, ResourceDraft, ResourceKind,
};
use crate::query::{filter_agendamentos, AgendaFilter};

/// Optional validation rules layered on top of the mandatory checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Refuse an agendamento whose window overlaps another one on the same
    /// date for the same educador or the same turma.
    pub reject_double_booking: bool,
}

/// Placeholder shown when a foreign key no longer resolves.
pub const UNKNOWN_NAME: &str = "?";

pub struct Agenda<B: Backend> {
    backend: B,
    rules: Rules,
}

impl<B: Backend> Agenda<B> {
    pub fn new(backend: B, rules: Rules) -> Self {
        Self { backend, rules }
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    // ---------------------------------------------------------------------
    // Registries
    // ---------------------------------------------------------------------

    pub fn exists(&self, kind: ResourceKind, id: Id) -> Result<bool> {
        Ok(self.backend.resource_exists(kind, id)?)
    }

    pub fn resource(&self, kind: ResourceKind, id: Id) -> Result<Option<Resource>> {
        Ok(self.backend.fetch_resource(kind, id)?)
    }

    pub fn resources(&self, kind: ResourceKind) -> Result<Vec<Resource>> {
        Ok(self.backend.fetch_resources(kind)?)
    }

    /// Display name of a resource, or `?` when the id does not resolve.
    pub fn display_name(&self, kind: ResourceKind, id: Id) -> Result<String> {
        Ok(self
            .resource(kind, id)?
            .map(|r| r.nome().to_string())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string()))
    }

    pub fn add_resource(&mut self, draft: ResourceDraft) -> Result<Resource> {
        check_resource_draft(&draft)?;
        let resource = self.backend.insert_resource(draft)?;
        info!(kind = %resource.kind(), id = resource.id(), nome = resource.nome(), "resource created");
        Ok(resource)
    }

    pub fn update_resource(&mut self, resource: &Resource) -> Result<()> {
        check_resource_draft(&resource.to_draft())?;
        if !self.backend.update_resource(resource)? {
            return Err(ScheduleError::NotFound {
                entity: resource.kind().label(),
                id: resource.id(),
            });
        }
        info!(kind = %resource.kind(), id = resource.id(), "resource updated");
        Ok(())
    }

    /// True when no agendamento references the resource.
    pub fn can_delete(&self, kind: ResourceKind, id: Id) -> Result<bool> {
        Ok(integrity::can_delete(&self.list_all()?, kind, id))
    }

    /// Delete a resource unless an agendamento still references it. The
    /// resource and its referencing records are left untouched on refusal.
    pub fn delete_resource(&mut self, kind: ResourceKind, id: Id) -> Result<()> {
        let references = integrity::reference_count(&self.list_all()?, kind, id);
        if references > 0 {
            warn!(%kind, id, references, "refused to delete referenced resource");
            return Err(ScheduleError::IntegrityViolation {
                kind,
                id,
                references,
            });
        }
        if !self.backend.delete_resource(kind, id)? {
            return Err(ScheduleError::NotFound {
                entity: kind.label(),
                id,
            });
        }
        info!(%kind, id, "resource deleted");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Agendamentos
    // ---------------------------------------------------------------------

    /// Create one agendamento per date, all sharing `base`. Either every date
    /// yields a record or nothing is written. Returns the new ids in the order
    /// of `dates`.
    pub fn create(&mut self, base: &AgendamentoBase, dates: &[NaiveDate]) -> Result<Vec<Id>> {
        let drafts: Vec<AgendamentoDraft> = dates
            .iter()
            .map(|&data| AgendamentoDraft {
                base: base.clone(),
                data,
            })
            .collect();

        if let Err(err) = self.validate_create(base, &drafts) {
            debug!(category = err.category(), error = %err, "agendamento creation rejected");
            return Err(err);
        }

        let created = self.backend.insert_agendamentos(drafts)?;
        let ids: Vec<Id> = created.iter().map(|a| a.id).collect();
        info!(count = ids.len(), ?ids, "agendamentos created");
        Ok(ids)
    }

    /// Replace every field of an existing agendamento except its id. Nothing
    /// is written unless all checks pass.
    pub fn update(&mut self, agendamento: &Agendamento) -> Result<()> {
        if let Err(err) = self.validate_update(agendamento) {
            debug!(id = agendamento.id, category = err.category(), error = %err, "agendamento update rejected");
            return Err(err);
        }
        if !self.backend.update_agendamento(agendamento)? {
            return Err(not_found(agendamento.id));
        }
        info!(id = agendamento.id, "agendamento updated");
        Ok(())
    }

    /// Remove an agendamento. Unknown ids are ignored.
    pub fn delete(&mut self, id: Id) -> Result<()> {
        if self.backend.delete_agendamento(id)? {
            info!(id, "agendamento deleted");
        } else {
            debug!(id, "delete of unknown agendamento ignored");
        }
        Ok(())
    }

    pub fn get(&self, id: Id) -> Result<Option<Agendamento>> {
        Ok(self.backend.fetch_agendamento(id)?)
    }

    /// An owned copy of every agendamento. Changing it does not affect the
    /// store, and later writes to the store do not affect it.
    pub fn list_all(&self) -> Result<Vec<Agendamento>> {
        Ok(self.backend.fetch_agendamentos()?)
    }

    /// Filtered and chronologically sorted view of the current snapshot.
    pub fn query(&self, filter: &AgendaFilter, today: NaiveDate) -> Result<Vec<Agendamento>> {
        Ok(filter_agendamentos(&self.list_all()?, filter, today))
    }

    /// Month grid of the filtered view.
    pub fn month(
        &self,
        filter: &AgendaFilter,
        year: i32,
        month: u32,
        today: NaiveDate,
    ) -> Result<MonthGrid> {
        let filtered = self.query(filter, today)?;
        Ok(month_grid(&filtered, year, month, today)?)
    }

    // ---------------------------------------------------------------------
    // Validation: required fields, then time ordering, then foreign keys,
    // then the optional double-booking rule.
    // ---------------------------------------------------------------------

    fn validate_create(&self, base: &AgendamentoBase, drafts: &[AgendamentoDraft]) -> Result<()> {
        check_required(base)?;
        if drafts.is_empty() {
            return Err(ValidationError::NoDates.into());
        }
        check_time_order(base)?;
        self.check_references(base)?;

        if self.rules.reject_double_booking {
            let mut candidates: Vec<Agendamento> = Vec::with_capacity(drafts.len());
            let existing = self.list_all()?;
            for draft in drafts {
                // Id 0 is never allocated, so it cannot collide with a stored record.
                let candidate = Agendamento::from_draft(0, draft.clone());
                check_double_booking(&candidate, existing.iter().chain(candidates.iter()))?;
                candidates.push(candidate);
            }
        }
        Ok(())
    }

    fn validate_update(&self, agendamento: &Agendamento) -> Result<()> {
        let base = agendamento.base();
        check_required(&base)?;
        check_time_order(&base)?;
        if self.get(agendamento.id)?.is_none() {
            return Err(not_found(agendamento.id));
        }
        self.check_references(&base)?;

        if self.rules.reject_double_booking {
            let existing = self.list_all()?;
            check_double_booking(
                agendamento,
                existing.iter().filter(|a| a.id != agendamento.id),
            )?;
        }
        Ok(())
    }

    fn check_references(&self, base: &AgendamentoBase) -> Result<()> {
        let keys = [
            (ResourceKind::Oficina, base.oficina_id),
            (ResourceKind::Educador, base.educador_id),
            (ResourceKind::Turma, base.turma_id),
        ];
        for (kind, id) in keys {
            if !self.exists(kind, id)? {
                return Err(ScheduleError::Referential { kind, id });
            }
        }
        Ok(())
    }
}

fn not_found(id: Id) -> ScheduleError {
    ScheduleError::NotFound {
        entity: "agendamento",
        id,
    }
}

fn check_resource_draft(draft: &ResourceDraft) -> Result<(), ValidationError> {
    if draft.nome().trim().is_empty() {
        return Err(ValidationError::MissingField("nome"));
    }
    Ok(())
}

/// Ids are positive; anything else means the field was never filled in.
fn check_required(base: &AgendamentoBase) -> Result<(), ValidationError> {
    let keys = [
        ("oficina", base.oficina_id),
        ("educador", base.educador_id),
        ("turma", base.turma_id),
    ];
    match keys.iter().find(|(_, id)| *id <= 0) {
        Some(&(field, _)) => Err(ValidationError::MissingField(field)),
        None => Ok(()),
    }
}

fn check_time_order(base: &AgendamentoBase) -> Result<(), ValidationError> {
    if base.hora_inicio >= base.hora_fim {
        return Err(ValidationError::TimeOrder {
            inicio: format_time(base.hora_inicio),
            fim: format_time(base.hora_fim),
        });
    }
    Ok(())
}

fn check_double_booking<'a>(
    candidate: &Agendamento,
    others: impl IntoIterator<Item = &'a Agendamento>,
) -> Result<()> {
    for other in others {
        if !candidate.overlaps(other) {
            continue;
        }
        for kind in [ResourceKind::Educador, ResourceKind::Turma] {
            if kind.key_of(candidate) == kind.key_of(other) {
                return Err(ScheduleError::DoubleBooking {
                    kind,
                    id: kind.key_of(candidate),
                    conflicting: other.id,
                });
            }
        }
    }
    Ok(())
}
