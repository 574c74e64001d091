//! In-memory implementations of the collaborator traits.
//!
//! These back the tests and benchmarks, and suit embedders that already
//! hold a day's punches in memory.

use chrono::{NaiveDate, NaiveDateTime};
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::error::IntegrityResult;
use crate::models::{PunchRecord, ScheduleEntry};

use super::{RecordStore, ScheduleLookup};

/// In-memory punch record store.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<PunchRecord>>,
}

impl InMemoryRecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `records`.
    pub fn with_records(records: impl IntoIterator<Item = PunchRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }

    /// Adds a record.
    pub fn insert(&self, record: PunchRecord) {
        self.records.write().push(record);
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn matching(&self, user_id: u64, date: NaiveDate) -> Vec<PunchRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.user_id == user_id && r.attendance_date == date)
            .cloned()
            .collect()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn query_recent_punches(
        &self,
        user_id: u64,
        date: NaiveDate,
        limit: usize,
    ) -> IntegrityResult<Vec<PunchRecord>> {
        let mut records = self.matching(user_id, date);
        // Option orders None first, so records without a punch time sort last.
        records.sort_by(|a, b| b.punch_time.cmp(&a.punch_time));
        records.truncate(limit);
        Ok(records)
    }

    fn query_punches_in_window(
        &self,
        user_id: u64,
        date: NaiveDate,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> IntegrityResult<Vec<PunchRecord>> {
        let mut records: Vec<PunchRecord> = self
            .matching(user_id, date)
            .into_iter()
            .filter(|r| r.punch_time.is_some_and(|t| t >= start && t <= end))
            .collect();
        records.sort_by_key(|r| r.punch_time);
        Ok(records)
    }
}

/// In-memory schedule lookup keyed by employee and day.
#[derive(Debug, Default)]
pub struct InMemoryScheduleLookup {
    entries: DashMap<(u64, NaiveDate), ScheduleEntry>,
}

impl InMemoryScheduleLookup {
    /// Creates an empty lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the entry for its employee and day.
    pub fn insert(&self, entry: ScheduleEntry) {
        self.entries
            .insert((entry.employee_id, entry.schedule_date), entry);
    }
}

impl ScheduleLookup for InMemoryScheduleLookup {
    fn get_schedule(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> IntegrityResult<Option<ScheduleEntry>> {
        Ok(self
            .entries
            .get(&(employee_id, date))
            .map(|e| e.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStatus;
    use chrono::NaiveTime;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    fn punch(record_id: u64, user_id: u64, time: &str) -> PunchRecord {
        PunchRecord {
            record_id,
            user_id,
            department_id: None,
            device_id: 500,
            attendance_date: date(),
            punch_time: Some(date().and_time(NaiveTime::parse_from_str(time, "%H:%M").unwrap())),
            attendance_status: AttendanceStatus::Normal,
        }
    }

    fn at(time: &str) -> NaiveDateTime {
        date().and_time(NaiveTime::parse_from_str(time, "%H:%M").unwrap())
    }

    #[test]
    fn test_recent_punches_are_newest_first_and_limited() {
        let store = InMemoryRecordStore::with_records(vec![
            punch(1, 42, "09:00"),
            punch(2, 42, "12:00"),
            punch(3, 42, "17:00"),
            punch(4, 7, "18:00"),
        ]);

        let recent = store.query_recent_punches(42, date(), 2).unwrap();
        let ids: Vec<u64> = recent.iter().map(|r| r.record_id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_window_query_is_inclusive_and_oldest_first() {
        let store = InMemoryRecordStore::new();
        store.insert(punch(3, 42, "09:05"));
        store.insert(punch(1, 42, "08:55"));
        store.insert(punch(2, 42, "09:00"));
        store.insert(punch(4, 42, "09:06"));

        let window = store
            .query_punches_in_window(42, date(), at("08:55"), at("09:05"))
            .unwrap();
        let ids: Vec<u64> = window.iter().map(|r| r.record_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_schedule_lookup_returns_inserted_entry() {
        let lookup = InMemoryScheduleLookup::new();
        lookup.insert(ScheduleEntry::new(
            42,
            date(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        ));

        let entry = lookup.get_schedule(42, date()).unwrap().unwrap();
        assert_eq!(entry.work_start_time, NaiveTime::from_hms_opt(9, 0, 0));
        assert!(lookup.get_schedule(7, date()).unwrap().is_none());
    }
}
