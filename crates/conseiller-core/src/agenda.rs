//! Day-by-day agenda bucketing for calendar-style views.
//!
//! Given dated items (appointments, actions, sessions) and a period, builds
//! an ordered map from calendar day to a morning/afternoon split. Every day of
//! the period is seeded up front with an empty sentinel so views can render
//! "nothing planned" days without a second pass.
//!
//! # Day keys
//!
//! Days are computed in the period's time zone: an item dated
//! `2024-01-01T23:30:00Z` lands on `2024-01-02` for a Paris period.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, TimeZone, Timelike};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use thiserror::Error;
use tracing::debug;

/// First hour of the afternoon half. Hours before it are morning.
pub const AFTERNOON_START_HOUR: u32 = 12;

/// Anything that can be placed in an agenda carries a stable identifier.
pub trait Identified {
    fn id(&self) -> &str;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgendaError {
    #[error("item {id} is dated {day}, outside the period {start}..={end}")]
    OutOfRange {
        id: String,
        day: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// Inclusive period of days to seed.
#[derive(Debug, Clone)]
pub struct Period<Tz: TimeZone> {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl<Tz: TimeZone> Period<Tz> {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self { start, end }
    }

    pub fn first_day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.end.date_naive()
    }

    /// Calendar days from `start` to `end` inclusive. Empty when `start > end`.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let last = self.last_day();
        self.first_day().iter_days().take_while(move |d| *d <= last)
    }
}

/// Items of one day, split on [`AFTERNOON_START_HOUR`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayBucket<T> {
    pub morning: Vec<T>,
    pub afternoon: Vec<T>,
}

impl<T> Default for DayBucket<T> {
    fn default() -> Self {
        Self {
            morning: Vec::new(),
            afternoon: Vec::new(),
        }
    }
}

impl<T> DayBucket<T> {
    pub fn len(&self) -> usize {
        self.morning.len() + self.afternoon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, hour: u32, item: T) {
        if hour < AFTERNOON_START_HOUR {
            self.morning.push(item);
        } else {
            self.afternoon.push(item);
        }
    }
}

/// `None` means the day was seeded but no item has been placed on it yet.
pub type AgendaDay<T> = Option<DayBucket<T>>;

/// Insertion-ordered map from calendar day to its bucket.
///
/// Seeded days come first in ascending order. Days created for items that
/// fall outside the seeded period are appended after them, in the order the
/// items were met.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaData<T> {
    days: Vec<(NaiveDate, AgendaDay<T>)>,
    index: HashMap<NaiveDate, usize>,
}

impl<T> AgendaData<T> {
    fn seeded<Tz: TimeZone>(period: &Period<Tz>) -> Self {
        let mut data = Self {
            days: Vec::new(),
            index: HashMap::new(),
        };
        for day in period.days() {
            data.index.insert(day, data.days.len());
            data.days.push((day, None));
        }
        data
    }

    fn contains(&self, day: NaiveDate) -> bool {
        self.index.contains_key(&day)
    }

    fn place(&mut self, day: NaiveDate, hour: u32, item: T) {
        let slot = match self.index.get(&day) {
            Some(&i) => i,
            None => {
                self.index.insert(day, self.days.len());
                self.days.push((day, None));
                self.days.len() - 1
            }
        };
        self.days[slot]
            .1
            .get_or_insert_with(DayBucket::default)
            .push(hour, item);
    }

    /// Entry for `day`: `None` if the day is not in the map at all,
    /// `Some(None)` for the sentinel.
    pub fn get(&self, day: NaiveDate) -> Option<&AgendaDay<T>> {
        self.index.get(&day).map(|&i| &self.days[i].1)
    }

    /// Populated bucket for `day`, skipping both missing and sentinel days.
    pub fn bucket(&self, day: NaiveDate) -> Option<&DayBucket<T>> {
        self.get(day).and_then(Option::as_ref)
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.iter().map(|(day, _)| *day)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &AgendaDay<T>)> {
        self.days.iter().map(|(day, entry)| (*day, entry))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Total number of placed items across all days.
    pub fn item_count(&self) -> usize {
        self.days
            .iter()
            .filter_map(|(_, entry)| entry.as_ref())
            .map(DayBucket::len)
            .sum()
    }
}

impl<T> IntoIterator for AgendaData<T> {
    type Item = (NaiveDate, AgendaDay<T>);
    type IntoIter = std::vec::IntoIter<(NaiveDate, AgendaDay<T>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.days.into_iter()
    }
}

/// Serialises as a JSON object keyed by ISO date, sentinel days as `null`.
impl<T: Serialize> Serialize for AgendaData<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.days.len()))?;
        for (day, entry) in &self.days {
            map.serialize_entry(&day.to_string(), entry)?;
        }
        map.end()
    }
}

/// Bucket `items` by day and half-day over `period`.
///
/// Items dated outside the period get a day of their own appended after the
/// seeded days. Callers that pre-filter to the period never see this; use
/// [`build_agenda_data_strict`] to reject such items instead.
pub fn build_agenda_data<T, Tz, ItemTz, F>(
    items: impl IntoIterator<Item = T>,
    period: &Period<Tz>,
    date_of: F,
) -> AgendaData<T>
where
    T: Identified,
    Tz: TimeZone,
    ItemTz: TimeZone,
    F: Fn(&T) -> DateTime<ItemTz>,
{
    let zone = period.start.timezone();
    let mut data = AgendaData::seeded(period);

    for item in items {
        let date = date_of(&item).with_timezone(&zone);
        let day = date.date_naive();
        if !data.contains(day) {
            debug!(id = item.id(), %day, "item outside agenda period, adding day");
        }
        data.place(day, date.hour(), item);
    }

    data
}

/// Same as [`build_agenda_data`], but an item outside the period is an error.
pub fn build_agenda_data_strict<T, Tz, ItemTz, F>(
    items: impl IntoIterator<Item = T>,
    period: &Period<Tz>,
    date_of: F,
) -> Result<AgendaData<T>, AgendaError>
where
    T: Identified,
    Tz: TimeZone,
    ItemTz: TimeZone,
    F: Fn(&T) -> DateTime<ItemTz>,
{
    let zone = period.start.timezone();
    let mut data = AgendaData::seeded(period);

    for item in items {
        let date = date_of(&item).with_timezone(&zone);
        let day = date.date_naive();
        if !data.contains(day) {
            return Err(AgendaError::OutOfRange {
                id: item.id().to_string(),
                day,
                start: period.first_day(),
                end: period.last_day(),
            });
        }
        data.place(day, date.hour(), item);
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Rdv {
        id: String,
        date: DateTime<Utc>,
    }

    impl Identified for Rdv {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn rdv(id: &str, date: &str) -> Rdv {
        Rdv {
            id: id.into(),
            date: utc(date),
        }
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn january() -> Period<Utc> {
        Period::new(utc("2024-01-01T10:00:00Z"), utc("2024-01-03T08:00:00Z"))
    }

    #[test]
    fn morning_and_afternoon_split() {
        let items = vec![
            rdv("A", "2024-01-02T09:00:00Z"),
            rdv("B", "2024-01-02T15:00:00Z"),
        ];
        let data = build_agenda_data(items.clone(), &january(), |r| r.date);

        assert_eq!(data.len(), 3);
        let bucket = data.bucket(day("2024-01-02")).unwrap();
        assert_eq!(bucket.morning, vec![items[0].clone()]);
        assert_eq!(bucket.afternoon, vec![items[1].clone()]);
        assert_eq!(data.get(day("2024-01-01")), Some(&None));
        assert_eq!(data.get(day("2024-01-03")), Some(&None));
    }

    #[test]
    fn seeds_every_day_in_ascending_order() {
        let period = Period::new(utc("2024-02-27T00:00:00Z"), utc("2024-03-02T23:59:00Z"));
        let data = build_agenda_data(Vec::<Rdv>::new(), &period, |r| r.date);

        let days: Vec<String> = data.days().map(|d| d.to_string()).collect();
        assert_eq!(
            days,
            ["2024-02-27", "2024-02-28", "2024-02-29", "2024-03-01", "2024-03-02"]
        );
        assert!(data.iter().all(|(_, entry)| entry.is_none()));
    }

    #[test]
    fn single_day_period() {
        let period = Period::new(utc("2024-01-05T08:00:00Z"), utc("2024-01-05T18:00:00Z"));
        let data = build_agenda_data(vec![rdv("A", "2024-01-05T11:59:59Z")], &period, |r| r.date);
        assert_eq!(data.len(), 1);
        assert_eq!(data.bucket(day("2024-01-05")).unwrap().morning.len(), 1);
    }

    #[test]
    fn reversed_period_seeds_nothing() {
        let period = Period::new(utc("2024-01-05T00:00:00Z"), utc("2024-01-01T00:00:00Z"));
        let data = build_agenda_data(Vec::<Rdv>::new(), &period, |r| r.date);
        assert!(data.is_empty());
    }

    #[test]
    fn noon_is_afternoon() {
        let data = build_agenda_data(
            vec![
                rdv("before", "2024-01-01T11:59:00Z"),
                rdv("noon", "2024-01-01T12:00:00Z"),
                rdv("midnight", "2024-01-01T00:00:00Z"),
            ],
            &january(),
            |r| r.date,
        );
        let bucket = data.bucket(day("2024-01-01")).unwrap();
        let morning: Vec<&str> = bucket.morning.iter().map(|r| r.id()).collect();
        let afternoon: Vec<&str> = bucket.afternoon.iter().map(|r| r.id()).collect();
        assert_eq!(morning, ["before", "midnight"]);
        assert_eq!(afternoon, ["noon"]);
    }

    #[test]
    fn each_item_placed_exactly_once() {
        let items = vec![
            rdv("1", "2024-01-01T08:00:00Z"),
            rdv("2", "2024-01-01T14:00:00Z"),
            rdv("3", "2024-01-03T10:30:00Z"),
            rdv("4", "2024-01-03T17:45:00Z"),
            rdv("5", "2024-01-03T17:45:00Z"),
        ];
        let data = build_agenda_data(items, &january(), |r| r.date);
        assert_eq!(data.item_count(), 5);
        assert_eq!(data.bucket(day("2024-01-03")).unwrap().afternoon.len(), 2);
        assert_eq!(data.get(day("2024-01-02")), Some(&None));
    }

    #[test]
    fn out_of_range_item_appends_a_day() {
        let items = vec![
            rdv("late", "2024-01-10T09:00:00Z"),
            rdv("early", "2023-12-31T16:00:00Z"),
            rdv("in", "2024-01-02T09:00:00Z"),
        ];
        let data = build_agenda_data(items, &january(), |r| r.date);

        let days: Vec<String> = data.days().map(|d| d.to_string()).collect();
        assert_eq!(
            days,
            ["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-10", "2023-12-31"]
        );
        assert_eq!(data.bucket(day("2024-01-10")).unwrap().morning.len(), 1);
        assert_eq!(data.bucket(day("2023-12-31")).unwrap().afternoon.len(), 1);
    }

    #[test]
    fn strict_rejects_out_of_range_item() {
        let err = build_agenda_data_strict(
            vec![rdv("ok", "2024-01-01T09:00:00Z"), rdv("late", "2024-01-04T09:00:00Z")],
            &january(),
            |r| r.date,
        )
        .unwrap_err();
        assert_eq!(
            err,
            AgendaError::OutOfRange {
                id: "late".into(),
                day: day("2024-01-04"),
                start: day("2024-01-01"),
                end: day("2024-01-03"),
            }
        );
    }

    #[test]
    fn strict_matches_lenient_for_in_range_items() {
        let items = vec![
            rdv("A", "2024-01-02T09:00:00Z"),
            rdv("B", "2024-01-03T15:00:00Z"),
        ];
        let lenient = build_agenda_data(items.clone(), &january(), |r| r.date);
        let strict = build_agenda_data_strict(items, &january(), |r| r.date).unwrap();
        assert_eq!(lenient, strict);
    }

    #[test]
    fn same_inputs_same_map() {
        let items = vec![
            rdv("A", "2024-01-02T09:00:00Z"),
            rdv("B", "2024-01-02T15:00:00Z"),
            rdv("C", "2024-01-07T15:00:00Z"),
        ];
        let first = build_agenda_data(items.clone(), &january(), |r| r.date);
        let second = build_agenda_data(items, &january(), |r| r.date);
        assert_eq!(first, second);
    }

    #[test]
    fn days_follow_period_time_zone() {
        let paris = FixedOffset::east_opt(3600).unwrap();
        let period = Period::new(
            utc("2024-01-01T00:00:00Z").with_timezone(&paris),
            utc("2024-01-02T12:00:00Z").with_timezone(&paris),
        );
        // 23:30 UTC is 00:30 the next day in Paris.
        let data = build_agenda_data(vec![rdv("A", "2024-01-01T23:30:00Z")], &period, |r| r.date);
        let bucket = data.bucket(day("2024-01-02")).unwrap();
        assert_eq!(bucket.morning.len(), 1);
        assert_eq!(data.get(day("2024-01-01")), Some(&None));
    }

    #[test]
    fn serialises_sentinel_as_null() {
        let data = build_agenda_data(vec![rdv("A", "2024-01-02T15:00:00Z")], &january(), |r| r.date);
        let json = serde_json::to_value(&data).unwrap();
        assert!(json["2024-01-01"].is_null());
        assert_eq!(json["2024-01-02"]["morning"], serde_json::json!([]));
        assert_eq!(json["2024-01-02"]["afternoon"][0]["id"], "A");
    }
}
