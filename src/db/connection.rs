use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::debug;

/// Open (creating if needed) the SQLite database at `path`, run lazy
/// migrations, and return a live connection.
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database {}", path.display()))?;
    ensure_schema(&conn)?;
    debug!(path = %path.display(), "database ready");
    Ok(conn)
}

/// A throwaway database, used by tests.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// Create the registry and agendamento tables. `PRAGMA foreign_keys = ON`
/// makes SQLite refuse to drop a resource that an agendamento still points
/// at, backing up the check `Agenda` performs first. `AUTOINCREMENT` keeps
/// SQLite from handing out the id of a deleted row again.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS oficinas (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nome TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create oficinas table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS educadores (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nome TEXT NOT NULL,
            email TEXT,
            telefone TEXT
        )",
        [],
    )
    .context("failed to create educadores table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS turmas (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nome TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create turmas table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS agendamentos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            oficina_id INTEGER NOT NULL,
            educador_id INTEGER NOT NULL,
            turma_id INTEGER NOT NULL,
            data TEXT NOT NULL,
            hora_inicio TEXT NOT NULL,
            hora_fim TEXT NOT NULL,
            observacoes TEXT,
            CHECK (hora_inicio < hora_fim),
            FOREIGN KEY(oficina_id) REFERENCES oficinas(id) ON DELETE RESTRICT,
            FOREIGN KEY(educador_id) REFERENCES educadores(id) ON DELETE RESTRICT,
            FOREIGN KEY(turma_id) REFERENCES turmas(id) ON DELETE RESTRICT
        )",
        [],
    )
    .context("failed to create agendamentos table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS agendamentos_by_slot ON agendamentos (data, hora_inicio)",
        [],
    )
    .context("failed to create agendamentos index")?;

    Ok(())
}
