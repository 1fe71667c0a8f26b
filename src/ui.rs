//! Ratatui front-end: a chronological list, a month calendar, and registry
//! screens for oficinas, educadores and turmas.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
