//! In-memory draw schedule, indexed by second-resolution time of day.
use std::collections::HashMap;

use drawctl_config::ScheduleEntry;
use time::Time;

/// Read-only after construction; share it by reference.
#[derive(Debug, Clone, Default)]
pub struct ScheduleTable {
    entries: Vec<ScheduleEntry>,
    by_time: HashMap<Time, f64>,
}

/// Summary figures for `check-schedule` style reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleSummary {
    pub entries: usize,
    pub distinct_times: usize,
    /// Sum of the volumes that can actually fire (effective, positive).
    pub total_volume: f64,
    pub first: Option<Time>,
    pub last: Option<Time>,
}

impl ScheduleTable {
    /// Entries sharing a time of day resolve to the one that appears last.
    pub fn new(entries: Vec<ScheduleEntry>) -> Self {
        let mut by_time = HashMap::with_capacity(entries.len());
        for e in &entries {
            by_time.insert(truncate(e.time_of_day), e.target_volume);
        }
        Self { entries, by_time }
    }

    /// Target volume scheduled at exactly `t` (sub-second part ignored), or 0.
    pub fn lookup(&self, t: Time) -> f64 {
        self.by_time.get(&truncate(t)).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn summary(&self) -> ScheduleSummary {
        let total_volume = self
            .by_time
            .values()
            .filter(|v| **v > 0.0)
            .sum::<f64>();
        ScheduleSummary {
            entries: self.entries.len(),
            distinct_times: self.by_time.len(),
            total_volume,
            first: self.by_time.keys().min().copied(),
            last: self.by_time.keys().max().copied(),
        }
    }
}

fn truncate(t: Time) -> Time {
    t.replace_nanosecond(0).unwrap_or(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use time::macros::time;

    fn entry(t: Time, v: f64) -> ScheduleEntry {
        ScheduleEntry {
            time_of_day: t,
            target_volume: v,
        }
    }

    #[test]
    fn last_entry_wins_for_shared_time() {
        let table = ScheduleTable::new(vec![
            entry(time!(08:00:00), 2.0),
            entry(time!(08:00:00), 3.0),
        ]);
        assert_eq!(table.lookup(time!(08:00:00)), 3.0);
        assert_eq!(table.len(), 2);
        assert_eq!(table.summary().distinct_times, 1);
    }

    #[test]
    fn no_match_is_zero() {
        let table = ScheduleTable::new(vec![entry(time!(08:00:00), 2.0)]);
        assert_eq!(table.lookup(time!(08:00:01)), 0.0);
        assert_eq!(table.lookup(time!(07:59:59)), 0.0);
    }

    #[test]
    fn sub_second_readings_match_their_second() {
        let table = ScheduleTable::new(vec![entry(time!(12:00:00), 0.5)]);
        assert_eq!(table.lookup(Time::from_hms_milli(12, 0, 0, 750).unwrap()), 0.5);
    }

    #[test]
    fn summary_ignores_overridden_and_degenerate_volumes() {
        let table = ScheduleTable::new(vec![
            entry(time!(06:00:00), 1.0),
            entry(time!(06:00:00), 0.25),
            entry(time!(07:00:00), 0.0),
            entry(time!(05:30:00), 0.5),
        ]);
        let s = table.summary();
        assert_eq!(s.entries, 4);
        assert_eq!(s.distinct_times, 3);
        assert!((s.total_volume - 0.75).abs() < 1e-12);
        assert_eq!(s.first, Some(time!(05:30:00)));
        assert_eq!(s.last, Some(time!(07:00:00)));
    }

    #[test]
    fn empty_table_never_matches() {
        let table = ScheduleTable::default();
        assert!(table.is_empty());
        assert_eq!(table.lookup(time!(00:00:00)), 0.0);
        assert_eq!(table.summary().first, None);
    }

    proptest! {
        #[test]
        fn lookup_matches_last_occurrence(
            rows in proptest::collection::vec((0u8..3, 0u8..3, 0.0f64..10.0), 1..40),
            query_m in 0u8..3,
            query_s in 0u8..3,
        ) {
            let entries: Vec<_> = rows
                .iter()
                .map(|(m, s, v)| entry(Time::from_hms(8, *m, *s).unwrap(), *v))
                .collect();
            let query = Time::from_hms(8, query_m, query_s).unwrap();
            let expected = entries
                .iter()
                .rev()
                .find(|e| e.time_of_day == query)
                .map_or(0.0, |e| e.target_volume);
            let table = ScheduleTable::new(entries);
            prop_assert_eq!(table.lookup(query), expected);
        }
    }
}
