use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of consecutive calendar days a window spans before the rest day is removed.
pub const WINDOW_SPAN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepSize {
    Day,
    Week,
}

impl StepSize {
    pub const fn days(self) -> u64 {
        match self {
            StepSize::Day => 1,
            StepSize::Week => 7,
        }
    }
}

/// Canonical `YYYY-MM-DD` key of a calendar day. Only ever used for grouping and lookup.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(String);

impl DayKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<NaiveDate> for DayKey {
    fn from(day: NaiveDate) -> Self {
        Self(day.format("%Y-%m-%d").to_string())
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes visible days and paging landings around a fixed rest weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    rest_day: Weekday,
}

impl Default for DateWindow {
    fn default() -> Self {
        Self::new(Weekday::Sun)
    }
}

impl DateWindow {
    pub const fn new(rest_day: Weekday) -> Self {
        Self { rest_day }
    }

    pub const fn rest_day(&self) -> Weekday {
        self.rest_day
    }

    pub fn is_rest_day(&self, day: NaiveDate) -> bool {
        day.weekday() == self.rest_day
    }

    /// Moves an anchor that sits on the rest day forward by one day.
    pub fn normalize(&self, anchor: NaiveDate) -> NaiveDate {
        if self.is_rest_day(anchor) {
            shift(anchor, Direction::Forward, 1)
        } else {
            anchor
        }
    }

    /// The days shown for `anchor`: a week starting at `anchor`, rest day omitted.
    pub fn window_from(&self, anchor: NaiveDate) -> Vec<NaiveDate> {
        anchor
            .iter_days()
            .take(WINDOW_SPAN)
            .filter(|day| !self.is_rest_day(*day))
            .collect()
    }

    /// Next anchor after paging by `step`. Never lands on the rest day: a landing
    /// on it is pushed one more day in the paging direction.
    pub fn advance(&self, anchor: NaiveDate, direction: Direction, step: StepSize) -> NaiveDate {
        let moved = shift(anchor, direction, step.days());
        if self.is_rest_day(moved) {
            shift(moved, direction, 1)
        } else {
            moved
        }
    }
}

// Out-of-range arithmetic leaves the day where it is.
fn shift(day: NaiveDate, direction: Direction, days: u64) -> NaiveDate {
    let delta = Days::new(days);
    match direction {
        Direction::Forward => day.checked_add_days(delta),
        Direction::Backward => day.checked_sub_days(delta),
    }
    .unwrap_or(day)
}
