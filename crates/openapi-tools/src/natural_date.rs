//! Natural-language date expressions.
//!
//! Recognizes the phrasings people actually type when asking for message history: calendar dates
//! ("Aug 5 2025", "5th of August", "2025-08-05", "8/5/2025"), day ranges inside a month
//! ("Aug 5-7"), relative days ("yesterday", "3 days ago", "last tuesday"), relative spans
//! ("last week", "this month", "past 7 days") and two dates joined by a connector
//! ("Aug 5 to Aug 7 2025").
//!
//! Matching is case-insensitive and the earliest mention in the text wins. A calendar date without
//! a year takes the other endpoint's year when part of a range, otherwise the most recent
//! occurrence on or before the reference day.

use chrono::{Datelike, Days, Months, NaiveDate, TimeDelta, Weekday};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Result of a successful parse. `end` is set only when the text names an explicit end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDates {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b\.?";
const ORDINAL: &str = r"(?:st|nd|rd|th)?";
const WEEKDAY: &str = r"(monday|tuesday|wednesday|thursday|friday|saturday|sunday)";
const COUNT: &str = r"(\d+|a|an|one|two|three|four|five|six|seven|eight|nine|ten)";
const DAY_RANGE_SEP: &str = r"\s*(?:-|–|to|through|thru|until|till)\s*";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid date regex")
}

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(\d{4})[-/](\d{1,2})[-/](\d{1,2})\b"));
static US_DATE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})\b"));
static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(r"\b{MONTH}\s*(\d{{1,2}}){ORDINAL}\b(?:,?\s+(\d{{4}})\b)?"))
});
static DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"\b(\d{{1,2}}){ORDINAL}\s+(?:of\s+)?{MONTH}(?:,?\s+(\d{{4}})\b)?"
    ))
});
static MONTH_DAY_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"\b{MONTH}\s*(\d{{1,2}}){ORDINAL}{DAY_RANGE_SEP}(\d{{1,2}}){ORDINAL}\b(?:,?\s+(\d{{4}})\b)?"
    ))
});
static DAY_RANGE_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"\b(\d{{1,2}}){ORDINAL}{DAY_RANGE_SEP}(\d{{1,2}}){ORDINAL}\s+(?:of\s+)?{MONTH}(?:,?\s+(\d{{4}})\b)?"
    ))
});
static RELATIVE_DAY: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(today|yesterday|tomorrow)\b"));
static AGO: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"\b{COUNT}\s+(day|week|month)s?\s+ago\b")));
static RELATIVE_WEEKDAY: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"\b(last|this|next)\s+{WEEKDAY}\b")));
static BARE_WEEKDAY: LazyLock<Regex> = LazyLock::new(|| compile(&format!(r"\b{WEEKDAY}\b")));
static PERIOD: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(this|last)\s+(week|month|year)\b"));
static TRAILING_SPAN: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"\b(?:past|last)\s+{COUNT}\s+(day|week)s?\b")));
static CONNECTOR: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^\s*(?:-|–|—|to|until|till|through|thru|and)\s*$"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mention {
    /// A calendar date, possibly without a year.
    Calendar {
        year: Option<i32>,
        month: u32,
        day: u32,
    },
    /// `first`..=`last` within one month.
    DayRange {
        year: Option<i32>,
        month: u32,
        first: u32,
        last: u32,
    },
    /// A fully resolved day ("yesterday", "last friday").
    Day(NaiveDate),
    /// A fully resolved span ("last week").
    Span(NaiveDate, NaiveDate),
}

impl Mention {
    fn is_point(&self) -> bool {
        matches!(self, Self::Calendar { .. } | Self::Day(_))
    }

    fn explicit_year(&self) -> Option<i32> {
        match self {
            Self::Calendar { year, .. } | Self::DayRange { year, .. } => *year,
            Self::Day(d) | Self::Span(d, _) => Some(d.year()),
        }
    }
}

#[derive(Debug)]
struct Found {
    start: usize,
    end: usize,
    mention: Mention,
}

/// Parse `text` relative to `today`.
///
/// Returns `None` when nothing date-like is recognized.
#[must_use]
pub fn parse_date_expression(text: &str, today: NaiveDate) -> Option<ParsedDates> {
    let lowered = text.to_lowercase();
    let found = scan(&lowered, today);
    let first = found.first()?;

    match first.mention {
        Mention::Span(start, end) => Some(ParsedDates {
            start,
            end: Some(end),
        }),
        Mention::DayRange {
            year,
            month,
            first: from,
            last: to,
        } => {
            let (start, end) = match year {
                Some(y) => (
                    NaiveDate::from_ymd_opt(y, month, from)?,
                    NaiveDate::from_ymd_opt(y, month, to)?,
                ),
                None => most_recent_day_range(month, from, to, today)?,
            };
            Some(ordered(start, end))
        }
        Mention::Calendar { .. } | Mention::Day(_) => {
            if let Some(second) = found.get(1)
                && second.mention.is_point()
                && CONNECTOR.is_match(&lowered[first.end..second.start])
            {
                let (start, end) = resolve_range(first.mention, second.mention, today)?;
                return Some(ParsedDates {
                    start,
                    end: Some(end),
                });
            }
            Some(ParsedDates {
                start: point_date(first.mention, None, today)?,
                end: None,
            })
        }
    }
}

fn ordered(a: NaiveDate, b: NaiveDate) -> ParsedDates {
    let (start, end) = if b < a { (b, a) } else { (a, b) };
    ParsedDates {
        start,
        end: Some(end),
    }
}

fn resolve_range(a: Mention, b: Mention, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let start = point_date(a, b.explicit_year(), today)?;
    let end = point_date(b, Some(start.year()), today)?;
    if end >= start {
        return Some((start, end));
    }
    // "Dec 28 to Jan 3": a yearless endpoint moves a year so the range wraps forward.
    match (a.explicit_year(), b.explicit_year()) {
        (Some(_), Some(_)) => Some((end, start)),
        (None, Some(_)) => Some((start.checked_sub_months(Months::new(12))?, end)),
        (_, None) => Some((start, end.checked_add_months(Months::new(12))?)),
    }
}

fn point_date(m: Mention, inherited_year: Option<i32>, today: NaiveDate) -> Option<NaiveDate> {
    match m {
        Mention::Calendar { year, month, day } => match year.or(inherited_year) {
            Some(y) => NaiveDate::from_ymd_opt(y, month, day),
            None => most_recent(month, day, today),
        },
        Mention::Day(d) => Some(d),
        Mention::DayRange { .. } | Mention::Span(..) => None,
    }
}

/// The latest `month`/`day` on or before `today`.
fn most_recent(month: u32, day: u32, today: NaiveDate) -> Option<NaiveDate> {
    // Four years back always reaches a leap year for Feb 29.
    (0..=4).find_map(|back| {
        NaiveDate::from_ymd_opt(today.year() - back, month, day).filter(|d| *d <= today)
    })
}

/// The latest year in which both `first` and `last` exist in `month` and `first` is on or before
/// `today`.
fn most_recent_day_range(
    month: u32,
    first: u32,
    last: u32,
    today: NaiveDate,
) -> Option<(NaiveDate, NaiveDate)> {
    (0..=4).find_map(|back| {
        let year = today.year() - back;
        let start = NaiveDate::from_ymd_opt(year, month, first).filter(|d| *d <= today)?;
        Some((start, NaiveDate::from_ymd_opt(year, month, last)?))
    })
}

fn scan(text: &str, today: NaiveDate) -> Vec<Found> {
    let mut found = Vec::new();

    collect(&mut found, &ISO_DATE, text, |c| {
        calendar(num(c, 1), num(c, 2)?, num(c, 3)?)
    });
    collect(&mut found, &US_DATE, text, |c| {
        let year: i32 = num(c, 3)?;
        let year = if year < 100 { 2000 + year } else { year };
        calendar(Some(year), num(c, 1)?, num(c, 2)?)
    });
    collect(&mut found, &MONTH_DAY, text, |c| {
        calendar(num(c, 3), month_at(c, 1)?, num(c, 2)?)
    });
    collect(&mut found, &DAY_MONTH, text, |c| {
        calendar(num(c, 3), month_at(c, 2)?, num(c, 1)?)
    });
    collect(&mut found, &MONTH_DAY_RANGE, text, |c| {
        day_range(num(c, 4), month_at(c, 1)?, num(c, 2)?, num(c, 3)?)
    });
    collect(&mut found, &DAY_RANGE_MONTH, text, |c| {
        day_range(num(c, 4), month_at(c, 3)?, num(c, 1)?, num(c, 2)?)
    });
    collect(&mut found, &RELATIVE_DAY, text, |c| {
        let day = match &c[1] {
            "today" => today,
            "yesterday" => today.pred_opt()?,
            _ => today.succ_opt()?,
        };
        Some(Mention::Day(day))
    });
    collect(&mut found, &AGO, text, |c| {
        let n = count(&c[1])?;
        let day = match &c[2] {
            "day" => today.checked_sub_days(Days::new(u64::from(n)))?,
            "week" => today.checked_sub_days(Days::new(7 * u64::from(n)))?,
            _ => today.checked_sub_months(Months::new(n))?,
        };
        Some(Mention::Day(day))
    });
    collect(&mut found, &RELATIVE_WEEKDAY, text, |c| {
        let target = weekday(&c[2])?;
        Some(Mention::Day(relative_weekday(&c[1], target, today)?))
    });
    collect(&mut found, &BARE_WEEKDAY, text, |c| {
        let target = weekday(&c[1])?;
        Some(Mention::Day(relative_weekday("", target, today)?))
    });
    collect(&mut found, &PERIOD, text, |c| {
        let (start, end) = period(&c[1] == "last", &c[2], today)?;
        Some(Mention::Span(start, end))
    });
    collect(&mut found, &TRAILING_SPAN, text, |c| {
        let n = u64::from(count(&c[1])?.max(1));
        let days = if &c[2] == "week" { 7 * n } else { n };
        Some(Mention::Span(today.checked_sub_days(Days::new(days - 1))?, today))
    });

    // Earliest first; at equal offsets the longest match wins. Overlapping matches are dropped.
    found.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    let mut kept: Vec<Found> = Vec::with_capacity(found.len());
    for f in found {
        if kept.last().is_none_or(|last| f.start >= last.end) {
            kept.push(f);
        }
    }
    kept
}

fn collect(
    found: &mut Vec<Found>,
    re: &Regex,
    text: &str,
    to_mention: impl Fn(&Captures<'_>) -> Option<Mention>,
) {
    for caps in re.captures_iter(text) {
        let (Some(whole), Some(mention)) = (caps.get(0), to_mention(&caps)) else {
            continue;
        };
        found.push(Found {
            start: whole.start(),
            end: whole.end(),
            mention,
        });
    }
}

fn num<T: std::str::FromStr>(caps: &Captures<'_>, group: usize) -> Option<T> {
    caps.get(group)?.as_str().parse().ok()
}

fn calendar(year: Option<i32>, month: u32, day: u32) -> Option<Mention> {
    // 2000 is a leap year, so Feb 29 survives validation when the year is unknown.
    NaiveDate::from_ymd_opt(year.unwrap_or(2000), month, day)?;
    Some(Mention::Calendar { year, month, day })
}

fn day_range(year: Option<i32>, month: u32, first: u32, last: u32) -> Option<Mention> {
    NaiveDate::from_ymd_opt(year.unwrap_or(2000), month, first)?;
    NaiveDate::from_ymd_opt(year.unwrap_or(2000), month, last)?;
    Some(Mention::DayRange {
        year,
        month,
        first,
        last,
    })
}

fn month_at(caps: &Captures<'_>, group: usize) -> Option<u32> {
    let name = caps.get(group)?.as_str();
    let idx = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ]
    .iter()
    .position(|m| name.starts_with(m))?;
    u32::try_from(idx + 1).ok()
}

fn weekday(name: &str) -> Option<Weekday> {
    name.parse().ok()
}

fn count(word: &str) -> Option<u32> {
    match word {
        "a" | "an" | "one" => Some(1),
        "two" => Some(2),
        "three" => Some(3),
        "four" => Some(4),
        "five" => Some(5),
        "six" => Some(6),
        "seven" => Some(7),
        "eight" => Some(8),
        "nine" => Some(9),
        "ten" => Some(10),
        digits => digits.parse().ok(),
    }
}

/// `last` is strictly before today, `next` strictly after, `this` is within the current
/// Monday-based week, and a bare weekday is the most recent occurrence including today.
fn relative_weekday(modifier: &str, target: Weekday, today: NaiveDate) -> Option<NaiveDate> {
    let today_idx = i64::from(today.weekday().num_days_from_monday());
    let target_idx = i64::from(target.num_days_from_monday());
    let back = (today_idx - target_idx).rem_euclid(7);
    let ahead = (target_idx - today_idx).rem_euclid(7);
    let offset = match modifier {
        "last" if back == 0 => -7,
        "last" => -back,
        "next" if ahead == 0 => 7,
        "next" => ahead,
        "this" => target_idx - today_idx,
        _ => -back,
    };
    today.checked_add_signed(TimeDelta::days(offset))
}

fn period(last: bool, unit: &str, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    match unit {
        "week" => {
            let monday = today.checked_sub_days(Days::new(u64::from(
                today.weekday().num_days_from_monday(),
            )))?;
            let monday = if last {
                monday.checked_sub_days(Days::new(7))?
            } else {
                monday
            };
            Some((monday, monday.checked_add_days(Days::new(6))?))
        }
        "month" => {
            let first = today.with_day(1)?;
            let first = if last {
                first.checked_sub_months(Months::new(1))?
            } else {
                first
            };
            let end = first.checked_add_months(Months::new(1))?.pred_opt()?;
            Some((first, end))
        }
        _ => {
            let year = if last { today.year() - 1 } else { today.year() };
            Some((
                NaiveDate::from_ymd_opt(year, 1, 1)?,
                NaiveDate::from_ymd_opt(year, 12, 31)?,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Thursday.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 14).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn single(text: &str) -> NaiveDate {
        let parsed = parse_date_expression(text, today())
            .unwrap_or_else(|| panic!("no date in {text:?}"));
        assert_eq!(parsed.end, None, "{text:?} should be a single day");
        parsed.start
    }

    fn range(text: &str) -> (NaiveDate, NaiveDate) {
        let parsed = parse_date_expression(text, today())
            .unwrap_or_else(|| panic!("no date in {text:?}"));
        (parsed.start, parsed.end.unwrap_or_else(|| panic!("{text:?} should be a range")))
    }

    #[test]
    fn calendar_dates() {
        assert_eq!(single("Aug 5 2025"), d(2025, 8, 5));
        assert_eq!(single("messages from August 5th, 2025 please"), d(2025, 8, 5));
        assert_eq!(single("5 Aug 2025"), d(2025, 8, 5));
        assert_eq!(single("the 5th of august 2025"), d(2025, 8, 5));
        assert_eq!(single("2025-08-05"), d(2025, 8, 5));
        assert_eq!(single("8/5/2025"), d(2025, 8, 5));
        assert_eq!(single("8/5/25"), d(2025, 8, 5));
        assert_eq!(single("Sept. 30, 2024"), d(2024, 9, 30));
    }

    #[test]
    fn missing_year_is_most_recent_occurrence() {
        assert_eq!(single("Aug 5"), d(2025, 8, 5));
        assert_eq!(single("Aug 14"), d(2025, 8, 14));
        assert_eq!(single("Dec 25"), d(2024, 12, 25));
    }

    #[test]
    fn relative_days() {
        assert_eq!(single("today"), d(2025, 8, 14));
        assert_eq!(single("what did I send YESTERDAY?"), d(2025, 8, 13));
        assert_eq!(single("tomorrow"), d(2025, 8, 15));
        assert_eq!(single("3 days ago"), d(2025, 8, 11));
        assert_eq!(single("a week ago"), d(2025, 8, 7));
        assert_eq!(single("two months ago"), d(2025, 6, 14));
    }

    #[test]
    fn weekdays() {
        assert_eq!(single("last tuesday"), d(2025, 8, 12));
        assert_eq!(single("last thursday"), d(2025, 8, 7));
        assert_eq!(single("next thursday"), d(2025, 8, 21));
        assert_eq!(single("next monday"), d(2025, 8, 18));
        assert_eq!(single("this monday"), d(2025, 8, 11));
        assert_eq!(single("on friday"), d(2025, 8, 8));
        assert_eq!(single("thursday"), d(2025, 8, 14));
    }

    #[test]
    fn spans() {
        assert_eq!(range("this week"), (d(2025, 8, 11), d(2025, 8, 17)));
        assert_eq!(range("last week"), (d(2025, 8, 4), d(2025, 8, 10)));
        assert_eq!(range("this month"), (d(2025, 8, 1), d(2025, 8, 31)));
        assert_eq!(range("last month"), (d(2025, 7, 1), d(2025, 7, 31)));
        assert_eq!(range("last year"), (d(2024, 1, 1), d(2024, 12, 31)));
        assert_eq!(range("past 7 days"), (d(2025, 8, 8), d(2025, 8, 14)));
        assert_eq!(range("the last 2 weeks"), (d(2025, 8, 1), d(2025, 8, 14)));
    }

    #[test]
    fn explicit_ranges() {
        assert_eq!(range("Aug 5 2025 to Aug 7 2025"), (d(2025, 8, 5), d(2025, 8, 7)));
        assert_eq!(range("from Aug 5 to Aug 7 2025"), (d(2025, 8, 5), d(2025, 8, 7)));
        assert_eq!(range("between 2025-07-01 and 2025-07-31"), (d(2025, 7, 1), d(2025, 7, 31)));
        assert_eq!(range("Aug 5-7 2025"), (d(2025, 8, 5), d(2025, 8, 7)));
        assert_eq!(range("5 - 7 August 2025"), (d(2025, 8, 5), d(2025, 8, 7)));
        assert_eq!(range("yesterday until today"), (d(2025, 8, 13), d(2025, 8, 14)));
        assert_eq!(range("Aug 7 2025 - Aug 5 2025"), (d(2025, 8, 5), d(2025, 8, 7)));
        assert_eq!(range("Dec 28 to Jan 3"), (d(2024, 12, 28), d(2025, 1, 3)));
        assert_eq!(range("Dec 28 to Jan 3 2025"), (d(2024, 12, 28), d(2025, 1, 3)));
        assert_eq!(range("Nov 30 to Feb 2 2025"), (d(2024, 11, 30), d(2025, 2, 2)));
        assert_eq!(range("Dec 28 2024 to Jan 3"), (d(2024, 12, 28), d(2025, 1, 3)));
    }

    #[test]
    fn yearless_day_range_lands_in_a_year_where_both_days_exist() {
        assert_eq!(range("Feb 28-29"), (d(2024, 2, 28), d(2024, 2, 29)));
        assert_eq!(range("Aug 5-7"), (d(2025, 8, 5), d(2025, 8, 7)));
        assert_eq!(range("Dec 20-24"), (d(2024, 12, 20), d(2024, 12, 24)));
    }

    #[test]
    fn unrelated_dates_do_not_form_a_range() {
        assert_eq!(single("Aug 5 2025 or maybe Aug 7 2025"), d(2025, 8, 5));
    }

    #[test]
    fn nothing_recognized() {
        assert_eq!(parse_date_expression("show me my messages", today()), None);
        assert_eq!(parse_date_expression("Feb 30 2025", today()), None);
        assert_eq!(parse_date_expression("", today()), None);
    }
}
