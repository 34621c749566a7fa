// Synthetic month-to-date AQI history used to backfill report charts
use chrono::{Datelike, NaiveDate, Weekday};
use rand::Rng;
use serde::Serialize;

pub const HISTORY_FLOOR: i32 = 15;
pub const HISTORY_CEILING: i32 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub index: u16,
}

/// Produce a day-by-day index history from the 1st of `today`'s month up to
/// and including `today`.
///
/// The entry for `today` is exactly `today_index`; earlier days are a
/// correlated random walk drawn from `rng`. Seed the generator to get a
/// reproducible history.
pub fn generate<R: Rng>(today_index: u16, today: NaiveDate, rng: R) -> MonthlyHistory<R> {
    MonthlyHistory::new(today_index, today, rng)
}

/// Lazy iterator behind [`generate`].
#[derive(Debug)]
pub struct MonthlyHistory<R> {
    next: Option<NaiveDate>,
    today: NaiveDate,
    today_index: u16,
    previous: Option<i32>,
    rng: R,
}

impl<R: Rng> MonthlyHistory<R> {
    fn new(today_index: u16, today: NaiveDate, rng: R) -> Self {
        let first = today.with_day(1).unwrap_or(today);
        Self {
            next: Some(first),
            today,
            today_index,
            previous: None,
            rng,
        }
    }

    fn synthesize(&mut self, date: NaiveDate) -> i32 {
        let baseline: i32 = match self.previous {
            None => self.rng.gen_range(40..=120),
            Some(previous) => previous + self.rng.gen_range(-20..=20),
        };

        // Winter (Nov-Feb) runs higher, summer (May-Aug) lower
        let seasonal: i32 = match date.month() {
            11 | 12 | 1 | 2 => self.rng.gen_range(10..=25),
            5..=8 => self.rng.gen_range(-15..=5),
            _ => 0,
        };

        let weekly: i32 = match date.weekday() {
            Weekday::Sat | Weekday::Sun => -self.rng.gen_range(0..=8),
            _ => self.rng.gen_range(0..=10),
        };

        (baseline + seasonal + weekly).clamp(HISTORY_FLOOR, HISTORY_CEILING)
    }
}

impl<R: Rng> Iterator for MonthlyHistory<R> {
    type Item = HistoryEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let date = self.next?;
        if date > self.today {
            self.next = None;
            return None;
        }

        let index = if date == self.today {
            self.today_index
        } else {
            // Clamped to 15..=250 so the cast cannot truncate
            self.synthesize(date) as u16
        };

        self.previous = Some(i32::from(index));
        self.next = date.succ_opt().filter(|d| *d <= self.today);

        Some(HistoryEntry { date, index })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .next
            .map(|d| (self.today - d).num_days() + 1)
            .unwrap_or(0)
            .max(0) as usize;
        (remaining, Some(remaining))
    }
}

impl<R: Rng> ExactSizeIterator for MonthlyHistory<R> {}
