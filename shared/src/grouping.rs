use crate::calendar::DayKey;
use crate::duties::models::Duty;
use chrono::{NaiveDate, NaiveTime};
use std::collections::BTreeMap;

/// Sort key for a duty type's time label. `H:MM` and `HH:MM` labels are
/// zero-padded to `HH:MM`; anything else compares as written.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeLabel(String);

impl TimeLabel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TimeLabel {
    fn from(raw: &str) -> Self {
        let trimmed = raw.trim();
        match NaiveTime::parse_from_str(trimmed, "%H:%M") {
            Ok(time) => Self(time.format("%H:%M").to_string()),
            Err(_) => Self(trimmed.to_string()),
        }
    }
}

/// Duties bucketed per calendar day, each bucket ordered by time label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DutyIndex {
    buckets: BTreeMap<DayKey, Vec<Duty>>,
}

impl DutyIndex {
    /// Duties on `key`, or an empty slice when nothing is scheduled.
    pub fn day(&self, key: &DayKey) -> &[Duty] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn for_date(&self, date: NaiveDate) -> &[Duty] {
        self.day(&DayKey::from(date))
    }

    /// Number of days with at least one duty.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DayKey, &[Duty])> {
        self.buckets.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

pub fn group_by_day(duties: &[Duty]) -> DutyIndex {
    let mut buckets: BTreeMap<DayKey, Vec<Duty>> = BTreeMap::new();
    for duty in duties {
        buckets
            .entry(DayKey::from(duty.date))
            .or_default()
            .push(duty.clone());
    }

    // Stable: equal labels keep their input order.
    for bucket in buckets.values_mut() {
        bucket.sort_by_cached_key(|duty| TimeLabel::from(duty.duty_type.time.as_str()));
    }

    DutyIndex { buckets }
}
