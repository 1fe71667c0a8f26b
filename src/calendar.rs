//! Month grid projection for the calendar view.
//!
//! A grid is a flat run of cells, seven per week row, starting on Sunday:
//! blank cells before day 1, one cell per real day, then blank cells up to the
//! end of the last row. Each day cell carries the agendamentos dated that day
//! in the order they were given.

use chrono::{Datelike, NaiveDate};

use crate::dates::{month_bounds, month_name, shift_month};
use crate::error::ValidationError;
use crate::models::Agendamento;

pub const DAYS_PER_WEEK: usize = 7;

/// One real day of the month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    /// Presentation only.
    pub is_today: bool,
    pub agendamentos: Vec<Agendamento>,
}

impl DayCell {
    pub fn day(&self) -> u32 {
        self.date.day()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarCell {
    /// Padding belonging to the previous or next month.
    Blank,
    Day(DayCell),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub leading_blanks: usize,
    pub trailing_blanks: usize,
    pub cells: Vec<CalendarCell>,
}

impl MonthGrid {
    /// Rows of exactly seven cells.
    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarCell]> {
        self.cells.chunks(DAYS_PER_WEEK)
    }

    /// The cell for day-of-month `day`, if the month has one.
    pub fn day(&self, day: u32) -> Option<&DayCell> {
        let idx = self.leading_blanks + (day as usize).checked_sub(1)?;
        match self.cells.get(idx) {
            Some(CalendarCell::Day(cell)) => Some(cell),
            _ => None,
        }
    }

    pub fn days(&self) -> impl Iterator<Item = &DayCell> {
        self.cells.iter().filter_map(|cell| match cell {
            CalendarCell::Day(day) => Some(day),
            CalendarCell::Blank => None,
        })
    }

    /// `July 2024`.
    pub fn title(&self) -> String {
        format!("{} {}", month_name(self.month), self.year)
    }

    pub fn previous(&self) -> (i32, u32) {
        shift_month(self.year, self.month, -1)
    }

    pub fn next(&self) -> (i32, u32) {
        shift_month(self.year, self.month, 1)
    }
}

/// Bucket `agendamentos` into the grid for `year`/`month`. Records outside the
/// month are ignored; `today` only sets the `is_today` flag.
pub fn month_grid(
    agendamentos: &[Agendamento],
    year: i32,
    month: u32,
    today: NaiveDate,
) -> Result<MonthGrid, ValidationError> {
    let (first, last) =
        month_bounds(year, month).ok_or(ValidationError::InvalidMonth { year, month })?;

    let leading_blanks = first.weekday().num_days_from_sunday() as usize;
    let days_in_month = last.day() as usize;
    let used = leading_blanks + days_in_month;
    let trailing_blanks = (DAYS_PER_WEEK - used % DAYS_PER_WEEK) % DAYS_PER_WEEK;

    let mut days: Vec<DayCell> = first
        .iter_days()
        .take(days_in_month)
        .map(|date| DayCell {
            date,
            is_today: date == today,
            agendamentos: Vec::new(),
        })
        .collect();

    for agendamento in agendamentos {
        if agendamento.data < first || agendamento.data > last {
            continue;
        }
        let idx = agendamento.data.day0() as usize;
        days[idx].agendamentos.push(agendamento.clone());
    }

    let mut cells = Vec::with_capacity(used + trailing_blanks);
    cells.extend((0..leading_blanks).map(|_| CalendarCell::Blank));
    cells.extend(days.into_iter().map(CalendarCell::Day));
    cells.extend((0..trailing_blanks).map(|_| CalendarCell::Blank));

    Ok(MonthGrid {
        year,
        month,
        leading_blanks,
        trailing_blanks,
        cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::{parse_date, parse_time};
    use crate::models::Id;

    fn date(raw: &str) -> NaiveDate {
        parse_date(raw).unwrap()
    }

    fn on(id: Id, data: &str, inicio: &str) -> Agendamento {
        Agendamento {
            id,
            oficina_id: 1,
            educador_id: 1,
            turma_id: 1,
            data: date(data),
            hora_inicio: parse_time(inicio).unwrap(),
            hora_fim: parse_time("23:00").unwrap(),
            observacoes: None,
        }
    }

    #[test]
    fn july_2024_starts_on_monday() {
        let grid = month_grid(&[], 2024, 7, date("2024-07-01")).unwrap();
        assert_eq!(grid.leading_blanks, 1);
        assert_eq!(grid.cells.len() % DAYS_PER_WEEK, 0);
        assert_eq!(grid.cells.len(), 35);
        assert_eq!(grid.trailing_blanks, 35 - 1 - 31);
        assert_eq!(grid.cells[0], CalendarCell::Blank);
        assert_eq!(grid.weeks().count(), 5);
        assert!(grid.weeks().all(|row| row.len() == DAYS_PER_WEEK));
    }

    #[test]
    fn records_land_only_in_their_own_day() {
        let records = vec![
            on(1, "2024-07-15", "09:00"),
            on(2, "2024-07-16", "09:00"),
            on(3, "2024-07-15", "13:00"),
            on(4, "2024-08-15", "09:00"),
        ];
        let grid = month_grid(&records, 2024, 7, date("2024-07-20")).unwrap();

        let fifteenth: Vec<Id> = grid.day(15).unwrap().agendamentos.iter().map(|a| a.id).collect();
        assert_eq!(fifteenth, vec![1, 3]);
        for day in grid.days().filter(|d| d.day() != 15) {
            assert!(day.agendamentos.iter().all(|a| a.id != 1 && a.id != 3));
        }
        let total: usize = grid.days().map(|d| d.agendamentos.len()).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn only_today_is_flagged() {
        let grid = month_grid(&[], 2024, 7, date("2024-07-20")).unwrap();
        let flagged: Vec<u32> = grid.days().filter(|d| d.is_today).map(|d| d.day()).collect();
        assert_eq!(flagged, vec![20]);

        let other_month = month_grid(&[], 2024, 8, date("2024-07-20")).unwrap();
        assert!(other_month.days().all(|d| !d.is_today));
    }

    #[test]
    fn grid_is_recomputable() {
        let records = vec![on(1, "2024-02-29", "09:00")];
        let today = date("2024-02-01");
        let a = month_grid(&records, 2024, 2, today).unwrap();
        let b = month_grid(&records, 2024, 2, today).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.days().count(), 29);
        assert_eq!(a.day(29).unwrap().agendamentos.len(), 1);
        assert!(a.day(30).is_none());
    }

    #[test]
    fn month_starting_on_sunday_has_no_leading_blanks() {
        // September 2024 begins on a Sunday and has 30 days.
        let grid = month_grid(&[], 2024, 9, date("2024-09-01")).unwrap();
        assert_eq!(grid.leading_blanks, 0);
        assert_eq!(grid.trailing_blanks, 5);
        assert_eq!(grid.title(), "September 2024");
        assert_eq!(grid.previous(), (2024, 8));
        assert_eq!(grid.next(), (2024, 10));
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert_eq!(
            month_grid(&[], 2024, 13, date("2024-07-01")),
            Err(ValidationError::InvalidMonth {
                year: 2024,
                month: 13
            })
        );
    }
}
