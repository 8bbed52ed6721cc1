//! Rewriting free-text date requests into `date_from`/`date_to` timestamps.

use crate::natural_date::parse_date_expression;
use crate::spec::{HISTORY_PATH, USER_DATE_REQUEST};
use chrono::{Local, NaiveDate, NaiveTime, TimeDelta, TimeZone};
use serde_json::{Map, Value};
use tracing::{debug, info};

pub const DATE_FROM: &str = "date_from";
pub const DATE_TO: &str = "date_to";

/// Turns the caller's wording in `user_date_request` into a whole-day Unix timestamp window.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRangeResolver {
    reference_date: Option<NaiveDate>,
}

impl DateRangeResolver {
    /// Resolve relative to the local calendar day at call time.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin "today" (tests, replays).
    #[must_use]
    pub fn with_reference_date(mut self, today: NaiveDate) -> Self {
        self.reference_date = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Rewrite `query` for a call to `path`.
    ///
    /// Only the history listing is touched. There, `user_date_request` is always removed; when it
    /// names a date, `date_from` is set to the start of the first day (00:00:00 local) and
    /// `date_to` to the end of the last (23:59:59 local), replacing whatever the caller passed.
    /// Returns the window written, if any.
    pub fn resolve(&self, path: &str, query: &mut Map<String, Value>) -> Option<(i64, i64)> {
        if path != HISTORY_PATH {
            return None;
        }
        let request = query.remove(USER_DATE_REQUEST)?;
        let Value::String(text) = request else {
            debug!("ignoring non-string {USER_DATE_REQUEST}");
            return None;
        };
        let Some(parsed) = parse_date_expression(&text, self.today()) else {
            debug!("no date recognized in {USER_DATE_REQUEST}: {text:?}");
            return None;
        };

        let last_day = parsed.end.unwrap_or(parsed.start);
        let from = local_timestamp(parsed.start, NaiveTime::MIN);
        let to = local_timestamp(last_day, end_of_day());
        info!(
            date_from = from,
            date_to = to,
            start = %parsed.start,
            end = %last_day,
            "resolved {USER_DATE_REQUEST} {text:?}"
        );
        query.insert(DATE_FROM.to_string(), Value::from(from));
        query.insert(DATE_TO.to_string(), Value::from(to));
        Some((from, to))
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

/// Unix seconds for `date` at `time` in the local zone.
///
/// An ambiguous wall-clock time takes its earlier instant; one skipped by a DST jump is shifted
/// forward an hour.
#[must_use]
pub fn local_timestamp(date: NaiveDate, time: NaiveTime) -> i64 {
    let naive = date.and_time(time);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            Local
                .from_local_datetime(&(naive + TimeDelta::hours(1)))
                .earliest()
        })
        .map_or_else(|| naive.and_utc().timestamp(), |dt| dt.timestamp())
}
