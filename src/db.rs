//! SQLite persistence split across logical submodules, plus the
//! `SqliteBackend` adapter that plugs it into the scheduling core.

mod agendamentos;
mod connection;
mod resources;

use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;

use crate::backend::Backend;
use crate::models::{Agendamento, AgendamentoDraft, Id, Resource, ResourceDraft, ResourceKind};

pub use agendamentos::{
    delete_agendamento, fetch_agendamento, fetch_agendamentos, insert_agendamentos,
    update_agendamento,
};
pub use connection::{ensure_schema, open_database, open_in_memory};
pub use resources::{
    create_resource, delete_resource, fetch_resource, fetch_resources, update_resource,
};

/// `Backend` implementation over a single SQLite connection.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: open_database(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: open_in_memory()?,
        })
    }
}

impl Backend for SqliteBackend {
    fn fetch_resources(&self, kind: ResourceKind) -> Result<Vec<Resource>> {
        fetch_resources(&self.conn, kind)
    }

    fn fetch_resource(&self, kind: ResourceKind, id: Id) -> Result<Option<Resource>> {
        fetch_resource(&self.conn, kind, id)
    }

    fn insert_resource(&mut self, draft: ResourceDraft) -> Result<Resource> {
        create_resource(&self.conn, draft)
    }

    fn update_resource(&mut self, resource: &Resource) -> Result<bool> {
        update_resource(&self.conn, resource)
    }

    fn delete_resource(&mut self, kind: ResourceKind, id: Id) -> Result<bool> {
        delete_resource(&self.conn, kind, id)
    }

    fn fetch_agendamentos(&self) -> Result<Vec<Agendamento>> {
        fetch_agendamentos(&self.conn)
    }

    fn fetch_agendamento(&self, id: Id) -> Result<Option<Agendamento>> {
        fetch_agendamento(&self.conn, id)
    }

    fn insert_agendamentos(&mut self, drafts: Vec<AgendamentoDraft>) -> Result<Vec<Agendamento>> {
        insert_agendamentos(&mut self.conn, drafts)
    }

    fn update_agendamento(&mut self, agendamento: &Agendamento) -> Result<bool> {
        update_agendamento(&self.conn, agendamento)
    }

    fn delete_agendamento(&mut self, id: Id) -> Result<bool> {
        delete_agendamento(&self.conn, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::{parse_date, parse_time};
    use crate::models::AgendamentoBase;

    fn seeded() -> (SqliteBackend, AgendamentoBase) {
        let mut backend = SqliteBackend::open_in_memory().unwrap();
        let oficina = backend
            .insert_resource(ResourceDraft::Oficina { nome: "Teatro".into() })
            .unwrap();
        let educador = backend
            .insert_resource(ResourceDraft::Educador {
                nome: "Ana".into(),
                email: None,
                telefone: Some("5555".into()),
            })
            .unwrap();
        let turma = backend
            .insert_resource(ResourceDraft::Turma { nome: "5A".into() })
            .unwrap();
        let base = AgendamentoBase {
            oficina_id: oficina.id(),
            educador_id: educador.id(),
            turma_id: turma.id(),
            hora_inicio: parse_time("09:00").unwrap(),
            hora_fim: parse_time("10:00").unwrap(),
            observacoes: Some("sala 2".into()),
        };
        (backend, base)
    }

    fn draft(base: &AgendamentoBase, data: &str) -> AgendamentoDraft {
        AgendamentoDraft {
            base: base.clone(),
            data: parse_date(data).unwrap(),
        }
    }

    #[test]
    fn agendamentos_survive_a_round_trip_through_sqlite() {
        let (mut backend, base) = seeded();
        let created = backend
            .insert_agendamentos(vec![draft(&base, "2024-06-12"), draft(&base, "2024-06-19")])
            .unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(backend.fetch_agendamentos().unwrap(), created);
        assert_eq!(
            backend.fetch_agendamento(created[1].id).unwrap().as_ref(),
            Some(&created[1])
        );
    }

    #[test]
    fn batch_insert_is_rolled_back_on_failure() {
        let (mut backend, base) = seeded();
        let mut dangling = base.clone();
        dangling.turma_id = 99;
        let result = backend.insert_agendamentos(vec![
            draft(&base, "2024-06-12"),
            draft(&dangling, "2024-06-19"),
        ]);
        assert!(result.is_err());
        assert!(backend.fetch_agendamentos().unwrap().is_empty());
    }

    #[test]
    fn storage_refuses_to_drop_a_referenced_resource() {
        let (mut backend, base) = seeded();
        backend
            .insert_agendamentos(vec![draft(&base, "2024-06-12")])
            .unwrap();
        assert!(backend
            .delete_resource(ResourceKind::Educador, base.educador_id)
            .is_err());
        assert!(backend
            .resource_exists(ResourceKind::Educador, base.educador_id)
            .unwrap());
    }

    #[test]
    fn educador_contact_fields_are_persisted() {
        let (backend, base) = seeded();
        let educador = backend
            .fetch_resource(ResourceKind::Educador, base.educador_id)
            .unwrap()
            .unwrap();
        match educador {
            Resource::Educador(e) => {
                assert_eq!(e.email, None);
                assert_eq!(e.telefone.as_deref(), Some("5555"));
            }
            other => panic!("unexpected resource {other:?}"),
        }
    }

    #[test]
    fn deleted_ids_are_not_reused() {
        let (mut backend, base) = seeded();
        let first = backend
            .insert_agendamentos(vec![draft(&base, "2024-06-12")])
            .unwrap();
        assert!(backend.delete_agendamento(first[0].id).unwrap());
        let second = backend
            .insert_agendamentos(vec![draft(&base, "2024-06-12")])
            .unwrap();
        assert!(second[0].id > first[0].id);
    }
}
