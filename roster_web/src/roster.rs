use chrono::NaiveDate;
use serde::Deserialize;
use shared::calendar::{DateWindow, Direction, StepSize};
use shared::duties::api::DutyApiError;
use shared::duties::models::Duty;
use shared::grouping::{DutyIndex, group_by_day};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Which layout the roster renders. Chosen once per request and passed down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum DisplayMode {
    #[serde(rename = "day")]
    SingleDay,
    #[default]
    #[serde(rename = "week")]
    MultiDay,
}

impl DisplayMode {
    pub const fn step(self) -> StepSize {
        match self {
            DisplayMode::SingleDay => StepSize::Day,
            DisplayMode::MultiDay => StepSize::Week,
        }
    }

    pub const fn query_value(self) -> &'static str {
        match self {
            DisplayMode::SingleDay => "day",
            DisplayMode::MultiDay => "week",
        }
    }
}

/// Cool-down gate for paging. Requests inside the cool-down are dropped, never queued.
#[derive(Debug, Clone)]
pub struct PagingThrottle {
    cooldown: Duration,
    last_paged_at: Option<Instant>,
}

impl PagingThrottle {
    pub const fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_paged_at: None,
        }
    }

    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_paged_at
            && now.saturating_duration_since(last) < self.cooldown
        {
            return false;
        }
        self.last_paged_at = Some(now);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DutyLoad {
    Loading,
    Loaded(DutyIndex),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Moved(NaiveDate),
    Throttled,
    Loading,
}

/// Identifies one duty fetch. Results carrying an older ticket are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySlot {
    pub date: NaiveDate,
    /// `None` while duties are loading.
    pub duties: Option<Vec<Duty>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterSnapshot {
    pub mode: DisplayMode,
    pub anchor: NaiveDate,
    pub loading: bool,
    pub days: Vec<DaySlot>,
}

#[derive(Debug)]
pub struct RosterController {
    window: DateWindow,
    anchor: NaiveDate,
    duties: DutyLoad,
    throttle: PagingThrottle,
    generation: u64,
}

impl RosterController {
    pub fn new(window: DateWindow, cooldown: Duration, today: NaiveDate) -> Self {
        Self {
            window,
            anchor: window.normalize(today),
            duties: DutyLoad::Loading,
            throttle: PagingThrottle::new(cooldown),
            generation: 0,
        }
    }

    pub const fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    pub const fn is_loading(&self) -> bool {
        matches!(self.duties, DutyLoad::Loading)
    }

    pub const fn duties(&self) -> &DutyLoad {
        &self.duties
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.duties = DutyLoad::Loading;
        LoadTicket(self.generation)
    }

    /// Applies a complete fetch result. A failed fetch shows an empty roster.
    /// Returns false when the ticket was superseded by a later load.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<Vec<Duty>, DutyApiError>) -> bool {
        if ticket.0 != self.generation {
            info!(ticket = ticket.0, current = self.generation, "discarding superseded duty fetch");
            return false;
        }

        let index = match result {
            Ok(duties) => {
                let index = group_by_day(&duties);
                info!(duties = duties.len(), days = index.len(), "loaded duties");
                index
            }
            Err(e) => {
                warn!(error = ?e, "failed to fetch duties, showing empty roster");
                DutyIndex::default()
            }
        };
        self.duties = DutyLoad::Loaded(index);
        true
    }

    pub fn page(&mut self, direction: Direction, mode: DisplayMode, now: Instant) -> PageOutcome {
        if self.is_loading() {
            return PageOutcome::Loading;
        }
        if !self.throttle.try_acquire(now) {
            return PageOutcome::Throttled;
        }
        self.anchor = self.window.advance(self.anchor, direction, mode.step());
        PageOutcome::Moved(self.anchor)
    }

    pub fn visible_days(&self, mode: DisplayMode) -> Vec<NaiveDate> {
        match mode {
            DisplayMode::SingleDay => vec![self.anchor],
            DisplayMode::MultiDay => self.window.window_from(self.anchor),
        }
    }

    pub fn snapshot(&self, mode: DisplayMode) -> RosterSnapshot {
        let days = self
            .visible_days(mode)
            .into_iter()
            .map(|date| DaySlot {
                date,
                duties: match &self.duties {
                    DutyLoad::Loading => None,
                    DutyLoad::Loaded(index) => Some(index.for_date(date).to_vec()),
                },
            })
            .collect();

        RosterSnapshot {
            mode,
            anchor: self.anchor,
            loading: self.is_loading(),
            days,
        }
    }
}
