use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::error::ScheduleError;

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Message shown in the footer for a failed operation. Storage errors carry a
/// context chain; the innermost cause is the most specific.
pub(crate) fn surface_error(err: &ScheduleError) -> String {
    match err {
        ScheduleError::Storage(inner) => inner
            .chain()
            .last()
            .map(|cause| cause.to_string())
            .unwrap_or_else(|| inner.to_string()),
        other => other.to_string(),
    }
}

/// Footer line of `[key] action` pairs.
pub(crate) fn key_hints(pairs: &[(&str, &str)]) -> Line<'static> {
    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let mut spans = Vec::with_capacity(pairs.len() * 2);
    for (key, action) in pairs {
        spans.push(Span::styled(format!("[{key}]"), key_style));
        spans.push(Span::raw(format!(" {action}   ")));
    }
    Line::from(spans)
}

/// Cut `text` to `width` characters, marking the cut with `…`.
pub(crate) fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(width - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn truncate_marks_the_cut() {
        assert_eq!(truncate("Teatro", 10), "Teatro");
        assert_eq!(truncate("Teatro de bonecos", 6), "Teatr…");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn storage_errors_show_their_root_cause() {
        let err: anyhow::Result<()> = Err(anyhow!("disk full"));
        let err = ScheduleError::Storage(err.context("failed to insert agendamento").unwrap_err());
        assert_eq!(surface_error(&err), "disk full");
    }
}
