//! The storage seam. The scheduling core never assumes where records live; it
//! talks to a `Backend`, which hands out owned copies on every read and
//! allocates identifiers on insert. `MemoryBackend` is the in-process
//! implementation; `db::SqliteBackend` persists to disk.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};

use crate::models::{
    Agendamento, AgendamentoDraft, Id, Resource, ResourceDraft, ResourceKind,
};

/// Storage operations required by [`crate::Agenda`]. Reads return owned
/// snapshots so callers can iterate while the store keeps changing.
pub trait Backend {
    /// Every resource of one kind, ordered by id.
    fn fetch_resources(&self, kind: ResourceKind) -> Result<Vec<Resource>>;

    fn fetch_resource(&self, kind: ResourceKind, id: Id) -> Result<Option<Resource>>;

    /// Store a new resource and return it with its freshly allocated id.
    fn insert_resource(&mut self, draft: ResourceDraft) -> Result<Resource>;

    /// Overwrite an existing resource. Returns `false` when the id is unknown.
    fn update_resource(&mut self, resource: &Resource) -> Result<bool>;

    /// Returns `false` when the id is unknown.
    fn delete_resource(&mut self, kind: ResourceKind, id: Id) -> Result<bool>;

    /// Every agendamento, ordered by id.
    fn fetch_agendamentos(&self) -> Result<Vec<Agendamento>>;

    fn fetch_agendamento(&self, id: Id) -> Result<Option<Agendamento>>;

    /// Store all drafts or none of them. Ids are returned in draft order.
    fn insert_agendamentos(&mut self, drafts: Vec<AgendamentoDraft>) -> Result<Vec<Agendamento>>;

    /// Returns `false` when the id is unknown.
    fn update_agendamento(&mut self, agendamento: &Agendamento) -> Result<bool>;

    /// Returns `false` when the id is unknown.
    fn delete_agendamento(&mut self, id: Id) -> Result<bool>;

    /// Whether a resource exists. Backends with an index may override this.
    fn resource_exists(&self, kind: ResourceKind, id: Id) -> Result<bool> {
        Ok(self.fetch_resource(kind, id)?.is_some())
    }
}

/// Keyed in-memory collections with one monotonically increasing counter per
/// collection, so a deleted id is never handed out again.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    resources: BTreeMap<(ResourceKind, Id), Resource>,
    agendamentos: BTreeMap<Id, Agendamento>,
    last_resource_ids: BTreeMap<ResourceKind, Id>,
    last_agendamento_id: Id,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_resource_id(&mut self, kind: ResourceKind) -> Id {
        let last = self.last_resource_ids.entry(kind).or_insert(0);
        *last += 1;
        *last
    }
}

impl Backend for MemoryBackend {
    fn fetch_resources(&self, kind: ResourceKind) -> Result<Vec<Resource>> {
        Ok(self
            .resources
            .range((kind, Id::MIN)..=(kind, Id::MAX))
            .map(|(_, resource)| resource.clone())
            .collect())
    }

    fn fetch_resource(&self, kind: ResourceKind, id: Id) -> Result<Option<Resource>> {
        Ok(self.resources.get(&(kind, id)).cloned())
    }

    fn insert_resource(&mut self, draft: ResourceDraft) -> Result<Resource> {
        let kind = draft.kind();
        let id = self.next_resource_id(kind);
        let resource = Resource::from_draft(id, draft);
        if self.resources.insert((kind, id), resource.clone()).is_some() {
            return Err(anyhow!("{kind} id {id} allocated twice"));
        }
        Ok(resource)
    }

    fn update_resource(&mut self, resource: &Resource) -> Result<bool> {
        match self.resources.get_mut(&(resource.kind(), resource.id())) {
            Some(slot) => {
                *slot = resource.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_resource(&mut self, kind: ResourceKind, id: Id) -> Result<bool> {
        Ok(self.resources.remove(&(kind, id)).is_some())
    }

    fn fetch_agendamentos(&self) -> Result<Vec<Agendamento>> {
        Ok(self.agendamentos.values().cloned().collect())
    }

    fn fetch_agendamento(&self, id: Id) -> Result<Option<Agendamento>> {
        Ok(self.agendamentos.get(&id).cloned())
    }

    fn insert_agendamentos(&mut self, drafts: Vec<AgendamentoDraft>) -> Result<Vec<Agendamento>> {
        let first = self.last_agendamento_id + 1;
        let created: Vec<Agendamento> = (first..)
            .zip(drafts)
            .map(|(id, draft)| Agendamento::from_draft(id, draft))
            .collect();
        if let Some(taken) = created.iter().find(|a| self.agendamentos.contains_key(&a.id)) {
            return Err(anyhow!("agendamento id {} allocated twice", taken.id));
        }

        if let Some(last) = created.last() {
            self.last_agendamento_id = last.id;
        }
        for agendamento in &created {
            self.agendamentos.insert(agendamento.id, agendamento.clone());
        }
        Ok(created)
    }

    fn update_agendamento(&mut self, agendamento: &Agendamento) -> Result<bool> {
        match self.agendamentos.get_mut(&agendamento.id) {
            Some(slot) => {
                *slot = agendamento.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_agendamento(&mut self, id: Id) -> Result<bool> {
        Ok(self.agendamentos.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgendamentoBase;
    use chrono::{NaiveDate, NaiveTime};

    #[test]
    fn ids_are_per_kind_and_never_reused() {
        let mut backend = MemoryBackend::new();
        let first = backend
            .insert_resource(ResourceDraft::Turma { nome: "A".into() })
            .unwrap();
        let oficina = backend
            .insert_resource(ResourceDraft::Oficina { nome: "Teatro".into() })
            .unwrap();
        assert_eq!((first.id(), oficina.id()), (1, 1));

        assert!(backend.delete_resource(ResourceKind::Turma, 1).unwrap());
        let second = backend
            .insert_resource(ResourceDraft::Turma { nome: "B".into() })
            .unwrap();
        assert_eq!(second.id(), 2);
        assert_eq!(backend.fetch_resources(ResourceKind::Turma).unwrap(), vec![second]);
    }

    fn draft(day: u32) -> AgendamentoDraft {
        AgendamentoDraft {
            base: AgendamentoBase {
                oficina_id: 1,
                educador_id: 1,
                turma_id: 1,
                hora_inicio: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                hora_fim: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                observacoes: None,
            },
            data: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
        }
    }

    #[test]
    fn id_collision_rejects_the_whole_batch() {
        let mut backend = MemoryBackend::new();
        backend.insert_agendamentos(vec![draft(12)]).unwrap();
        let before = backend.fetch_agendamentos().unwrap();

        // A rewound counter makes the first draft of the next batch collide.
        backend.last_agendamento_id = 0;
        assert!(backend
            .insert_agendamentos(vec![draft(13), draft(14)])
            .is_err());
        assert_eq!(backend.fetch_agendamentos().unwrap(), before);
        assert_eq!(backend.last_agendamento_id, 0);
    }

    #[test]
    fn unknown_ids_report_false() {
        let mut backend = MemoryBackend::new();
        assert!(!backend.delete_agendamento(3).unwrap());
        assert!(!backend.delete_resource(ResourceKind::Oficina, 3).unwrap());
        let ghost = Resource::from_draft(3, ResourceDraft::Oficina { nome: "x".into() });
        assert!(!backend.update_resource(&ghost).unwrap());
        assert!(!backend.resource_exists(ResourceKind::Oficina, 3).unwrap());
    }
}
