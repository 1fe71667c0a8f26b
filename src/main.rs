//! Binary entry point: load the config, bring up logging and the SQLite store,
//! then drive the Ratatui event loop until the user exits.
use std::env;

use agenda_oficinas::logging::init_logging;
use agenda_oficinas::{run_app, Agenda, App, Backend, Config, MemoryBackend, SqliteBackend};
use anyhow::{bail, Result};
use tracing::info;

const USAGE: &str = "usage: agenda-oficinas [--memory]";

/// `--memory` runs against a throwaway store; nothing is written to disk
/// except the log.
fn main() -> Result<()> {
    let mut in_memory = false;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--memory" => in_memory = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(());
            }
            other => bail!("unknown argument {other:?}\n{USAGE}"),
        }
    }

    let config = Config::load()?;
    init_logging(&config)?;

    if in_memory {
        info!("starting with an in-memory store");
        launch(MemoryBackend::new(), &config)
    } else {
        let path = config.database_path()?;
        info!(path = %path.display(), "starting");
        launch(SqliteBackend::open(&path)?, &config)
    }
}

fn launch<B: Backend>(backend: B, config: &Config) -> Result<()> {
    let agenda = Agenda::new(backend, config.rules);
    let today = chrono::Local::now().date_naive();
    let mut app = App::new(agenda, today)?;
    let result = run_app(&mut app);
    info!("exiting");
    result
}
