//! Single-slot, date-keyed cache.
//!
//! Each indicator and the aggregator own one `DateSlot` per cached value.
//! The slot holds the value for the most recent date only: storing a value for
//! another date overwrites it. There is no eviction and no TTL.

use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct DateSlot<T> {
    entry: Option<(NaiveDate, T)>,
}

impl<T> Default for DateSlot<T> {
    fn default() -> Self {
        Self { entry: None }
    }
}

impl<T> DateSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value, only if it was stored for exactly `date`.
    pub fn get(&self, date: NaiveDate) -> Option<&T> {
        match &self.entry {
            Some((stored, value)) if *stored == date => Some(value),
            _ => None,
        }
    }

    /// Overwrite the slot and return a reference to the stored value.
    pub fn store(&mut self, date: NaiveDate, value: T) -> &T {
        &self.entry.insert((date, value)).1
    }

    /// Last stored entry regardless of date.
    pub fn latest(&self) -> Option<(NaiveDate, &T)> {
        self.entry.as_ref().map(|(date, value)| (*date, value))
    }
}
