use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::dates::{format_date, format_time, parse_date, parse_time};
use crate::models::{Agendamento, AgendamentoDraft, Id};

const SELECT_COLUMNS: &str = "SELECT id, oficina_id, educador_id, turma_id, data, hora_inicio, hora_fim, observacoes
     FROM agendamentos";

/// Retrieve every agendamento in id order. Temporal ordering is the query
/// engine's job, so storage order stays the insertion order.
pub fn fetch_agendamentos(conn: &Connection) -> Result<Vec<Agendamento>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))
        .context("failed to prepare agendamento query")?;

    let agendamentos = stmt
        .query_map([], map_agendamento)
        .context("failed to load agendamentos")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect agendamentos")?;

    Ok(agendamentos)
}

pub fn fetch_agendamento(conn: &Connection, id: Id) -> Result<Option<Agendamento>> {
    conn.query_row(
        &format!("{SELECT_COLUMNS} WHERE id = ?1"),
        [id],
        map_agendamento,
    )
    .optional()
    .with_context(|| format!("failed to load agendamento {id}"))
}

/// Insert a batch inside one transaction so a failure halfway leaves no rows
/// behind.
pub fn insert_agendamentos(
    conn: &mut Connection,
    drafts: Vec<AgendamentoDraft>,
) -> Result<Vec<Agendamento>> {
    let tx = conn
        .transaction()
        .context("failed to start agendamento transaction")?;

    let mut created = Vec::with_capacity(drafts.len());
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO agendamentos
                    (oficina_id, educador_id, turma_id, data, hora_inicio, hora_fim, observacoes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .context("failed to prepare agendamento insert")?;

        for draft in drafts {
            stmt.execute(params![
                draft.base.oficina_id,
                draft.base.educador_id,
                draft.base.turma_id,
                format_date(draft.data),
                format_time(draft.base.hora_inicio),
                format_time(draft.base.hora_fim),
                draft.base.observacoes,
            ])
            .with_context(|| format!("failed to insert agendamento for {}", draft.data))?;
            created.push(Agendamento::from_draft(tx.last_insert_rowid(), draft));
        }
    }

    tx.commit().context("failed to commit agendamentos")?;
    Ok(created)
}

/// Overwrite every mutable column. Returns `false` when no row matched.
pub fn update_agendamento(conn: &Connection, agendamento: &Agendamento) -> Result<bool> {
    let updated = conn
        .execute(
            "UPDATE agendamentos
             SET oficina_id = ?1, educador_id = ?2, turma_id = ?3, data = ?4,
                 hora_inicio = ?5, hora_fim = ?6, observacoes = ?7
             WHERE id = ?8",
            params![
                agendamento.oficina_id,
                agendamento.educador_id,
                agendamento.turma_id,
                format_date(agendamento.data),
                format_time(agendamento.hora_inicio),
                format_time(agendamento.hora_fim),
                agendamento.observacoes,
                agendamento.id,
            ],
        )
        .with_context(|| format!("failed to update agendamento {}", agendamento.id))?;

    Ok(updated > 0)
}

/// Returns `false` when no row matched.
pub fn delete_agendamento(conn: &Connection, id: Id) -> Result<bool> {
    let deleted = conn
        .execute("DELETE FROM agendamentos WHERE id = ?1", params![id])
        .with_context(|| format!("failed to delete agendamento {id}"))?;

    Ok(deleted > 0)
}

fn map_agendamento(row: &Row<'_>) -> rusqlite::Result<Agendamento> {
    let data: String = row.get(4)?;
    let hora_inicio: String = row.get(5)?;
    let hora_fim: String = row.get(6)?;
    Ok(Agendamento {
        id: row.get(0)?,
        oficina_id: row.get(1)?,
        educador_id: row.get(2)?,
        turma_id: row.get(3)?,
        data: text_column(4, &data, parse_date)?,
        hora_inicio: text_column(5, &hora_inicio, parse_time)?,
        hora_fim: text_column(6, &hora_fim, parse_time)?,
        observacoes: row.get(7)?,
    })
}

/// Decode a date or time column, reporting bad text as a conversion failure.
fn text_column<T>(idx: usize, raw: &str, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    parse(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unexpected value {raw:?}").into(),
        )
    })
}
