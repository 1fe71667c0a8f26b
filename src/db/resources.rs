use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, Error as SqlError, ErrorCode, OptionalExtension, Row};

use crate::models::{Educador, Id, Oficina, Resource, ResourceDraft, ResourceKind, Turma};

fn table(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Oficina => "oficinas",
        ResourceKind::Educador => "educadores",
        ResourceKind::Turma => "turmas",
    }
}

fn columns(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Educador => "id, nome, email, telefone",
        ResourceKind::Oficina | ResourceKind::Turma => "id, nome",
    }
}

fn map_resource(kind: ResourceKind, row: &Row<'_>) -> rusqlite::Result<Resource> {
    let id = row.get(0)?;
    let nome = row.get(1)?;
    Ok(match kind {
        ResourceKind::Oficina => Resource::Oficina(Oficina { id, nome }),
        ResourceKind::Educador => Resource::Educador(Educador {
            id,
            nome,
            email: row.get(2)?,
            telefone: row.get(3)?,
        }),
        ResourceKind::Turma => Resource::Turma(Turma { id, nome }),
    })
}

/// Every resource of `kind`, in id order.
pub fn fetch_resources(conn: &Connection, kind: ResourceKind) -> Result<Vec<Resource>> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY id",
        columns(kind),
        table(kind)
    );
    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("failed to prepare {} query", table(kind)))?;

    let resources = stmt
        .query_map([], |row| map_resource(kind, row))
        .with_context(|| format!("failed to load {}", table(kind)))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to collect {}", table(kind)))?;

    Ok(resources)
}

pub fn fetch_resource(conn: &Connection, kind: ResourceKind, id: Id) -> Result<Option<Resource>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1",
        columns(kind),
        table(kind)
    );
    conn.query_row(&sql, [id], |row| map_resource(kind, row))
        .optional()
        .with_context(|| format!("failed to load {kind} {id}"))
}

/// Insert a new row and echo the hydrated resource back to the caller.
pub fn create_resource(conn: &Connection, draft: ResourceDraft) -> Result<Resource> {
    let kind = draft.kind();
    let inserted = match &draft {
        ResourceDraft::Educador {
            nome,
            email,
            telefone,
        } => conn.execute(
            "INSERT INTO educadores (nome, email, telefone) VALUES (?1, ?2, ?3)",
            params![nome, email, telefone],
        ),
        other => conn.execute(
            &format!("INSERT INTO {} (nome) VALUES (?1)", table(kind)),
            params![other.nome()],
        ),
    };
    inserted.with_context(|| format!("failed to insert {kind}"))?;

    let id = conn.last_insert_rowid();
    Ok(Resource::from_draft(id, draft))
}

/// Overwrite the editable columns. Returns `false` when no row matched.
pub fn update_resource(conn: &Connection, resource: &Resource) -> Result<bool> {
    let updated = match resource {
        Resource::Educador(e) => conn.execute(
            "UPDATE educadores SET nome = ?1, email = ?2, telefone = ?3 WHERE id = ?4",
            params![e.nome, e.email, e.telefone, e.id],
        ),
        other => conn.execute(
            &format!("UPDATE {} SET nome = ?1 WHERE id = ?2", table(other.kind())),
            params![other.nome(), other.id()],
        ),
    }
    .with_context(|| format!("failed to update {} {}", resource.kind(), resource.id()))?;

    Ok(updated > 0)
}

/// Remove a resource row. Returns `false` when no row matched.
pub fn delete_resource(conn: &Connection, kind: ResourceKind, id: Id) -> Result<bool> {
    let deleted = conn
        .execute(
            &format!("DELETE FROM {} WHERE id = ?1", table(kind)),
            params![id],
        )
        .map_err(|err| map_foreign_key_constraint(err, kind, id))
        .with_context(|| format!("failed to delete {kind} {id}"))?;

    Ok(deleted > 0)
}

/// Turn SQLite's foreign key refusal into a readable message. The store
/// checks references before deleting, so reaching this means another
/// connection added an agendamento in between.
fn map_foreign_key_constraint(err: SqlError, kind: ResourceKind, id: Id) -> anyhow::Error {
    if matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    ) {
        anyhow!("{kind} {id} is still referenced by an agendamento.")
    } else {
        err.into()
    }
}
