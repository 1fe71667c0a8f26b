use chrono::{Datelike, Duration, NaiveDate};

use crate::calendar::MonthGrid;
use crate::models::{Resource, ResourceKind};

/// Clamp-and-move helper shared by the list-style screens.
pub(crate) fn move_index(selected: usize, len: usize, offset: isize) -> usize {
    if len == 0 {
        return 0;
    }
    let new = (selected as isize + offset).clamp(0, len as isize - 1);
    new as usize
}

/// Registry browser: one tab per resource kind.
pub(crate) struct ResourceScreen {
    pub(crate) kind: ResourceKind,
    pub(crate) items: Vec<Resource>,
    pub(crate) selected: usize,
}

impl ResourceScreen {
    pub(crate) fn new(kind: ResourceKind, items: Vec<Resource>) -> Self {
        Self {
            kind,
            items,
            selected: 0,
        }
    }

    pub(crate) fn current(&self) -> Option<&Resource> {
        self.items.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = move_index(self.selected, self.items.len(), offset);
    }

    pub(crate) fn set_items(&mut self, items: Vec<Resource>) {
        self.items = items;
        self.selected = move_index(self.selected, self.items.len(), 0);
    }

    /// Next tab, wrapping.
    pub(crate) fn next_kind(&self, delta: isize) -> ResourceKind {
        let all = ResourceKind::ALL;
        let idx = all.iter().position(|k| *k == self.kind).unwrap_or(0) as isize;
        all[(idx + delta).rem_euclid(all.len() as isize) as usize]
    }
}

/// Month grid plus the highlighted day.
pub(crate) struct CalendarScreen {
    pub(crate) grid: MonthGrid,
    pub(crate) selected: NaiveDate,
}

impl CalendarScreen {
    pub(crate) fn year_month(&self) -> (i32, u32) {
        (self.grid.year, self.grid.month)
    }

    /// Move the highlighted day by `days`. Returns the month the new day
    /// belongs to when it leaves the current grid.
    pub(crate) fn move_day(&mut self, days: i64) -> Option<(i32, u32)> {
        self.selected += Duration::days(days);
        let target = (self.selected.year(), self.selected.month());
        (target != self.year_month()).then_some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_index_clamps() {
        assert_eq!(move_index(0, 0, 3), 0);
        assert_eq!(move_index(1, 3, 5), 2);
        assert_eq!(move_index(1, 3, -5), 0);
    }
}
