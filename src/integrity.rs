//! Referential integrity between the registries and the agendamentos.
//!
//! Deletion of a resource is refused while any agendamento references it;
//! nothing is ever cascaded. The check runs over a snapshot, so the caller
//! must hold exclusive access to the store between checking and deleting.
//! `Agenda` does this by taking `&mut self` for the whole sequence.

use crate::models::{Agendamento, Id, ResourceKind};

/// Number of agendamentos whose `kind` foreign key equals `id`.
pub fn reference_count(snapshot: &[Agendamento], kind: ResourceKind, id: Id) -> usize {
    snapshot.iter().filter(|a| kind.key_of(a) == id).count()
}

/// True when no agendamento references the resource.
pub fn can_delete(snapshot: &[Agendamento], kind: ResourceKind, id: Id) -> bool {
    !snapshot.iter().any(|a| kind.key_of(a) == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::{parse_date, parse_time};

    fn agendamento(id: Id, oficina_id: Id, educador_id: Id, turma_id: Id) -> Agendamento {
        Agendamento {
            id,
            oficina_id,
            educador_id,
            turma_id,
            data: parse_date("2024-06-12").unwrap(),
            hora_inicio: parse_time("09:00").unwrap(),
            hora_fim: parse_time("10:00").unwrap(),
            observacoes: None,
        }
    }

    #[test]
    fn ids_are_compared_within_their_own_kind() {
        let snapshot = vec![agendamento(1, 1, 2, 3)];
        assert!(!can_delete(&snapshot, ResourceKind::Educador, 2));
        assert!(can_delete(&snapshot, ResourceKind::Educador, 1));
        assert!(can_delete(&snapshot, ResourceKind::Turma, 2));
        assert!(!can_delete(&snapshot, ResourceKind::Turma, 3));
    }

    #[test]
    fn counts_every_reference() {
        let snapshot = vec![agendamento(1, 1, 2, 3), agendamento(2, 1, 5, 3)];
        assert_eq!(reference_count(&snapshot, ResourceKind::Oficina, 1), 2);
        assert_eq!(reference_count(&snapshot, ResourceKind::Educador, 5), 1);
        assert_eq!(reference_count(&[], ResourceKind::Oficina, 1), 0);
        assert!(can_delete(&[], ResourceKind::Oficina, 1));
    }
}
