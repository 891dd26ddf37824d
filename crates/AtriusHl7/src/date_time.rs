use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::{Serialize, Serializer};

/// Precision levels for HL7 `DT` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatePrecision {
    /// YYYY
    Year,
    /// YYYYMM
    YearMonth,
    /// YYYYMMDD
    Full,
}

/// Precision levels for HL7 `TM` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimePrecision {
    /// HH
    Hour,
    /// HHMM
    HourMinute,
    /// HHMMSS
    HourMinuteSecond,
    /// HHMMSS.S[S...]
    Fractional,
}

/// Precision levels for HL7 `TS`/`DTM` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DateTimePrecision {
    Year,
    YearMonth,
    Date,
    DateHour,
    DateHourMinute,
    DateHourMinuteSecond,
    /// Sub-second digits present
    Full,
}

/// Precision-aware HL7 date.
///
/// HL7 dates may stop after the year or the month; the precision and the original text
/// are kept so the value prints back exactly as received.
///
/// # Examples
/// ```rust
/// use atrius_hl7_lib::date_time::{DatePrecision, Hl7Date};
///
/// let date = Hl7Date::parse("198807").unwrap();
/// assert_eq!(date.precision(), DatePrecision::YearMonth);
/// assert_eq!(date.month(), Some(7));
/// assert_eq!(date.original_string(), "198807");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hl7Date {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
    precision: DatePrecision,
    original_string: Arc<str>,
}

impl Hl7Date {
    /// Parses `YYYY`, `YYYYMM` or `YYYYMMDD`.
    pub fn parse(s: &str) -> Option<Self> {
        let (year, month, day, precision) = parse_date_digits(s)?;
        Some(Self {
            year,
            month,
            day,
            precision,
            original_string: Arc::from(s),
        })
    }

    pub fn precision(&self) -> DatePrecision {
        self.precision
    }

    pub fn original_string(&self) -> &str {
        &self.original_string
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Option<u32> {
        self.month
    }

    pub fn day(&self) -> Option<u32> {
        self.day
    }

    /// The first day covered by this date.
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), self.day.unwrap_or(1))
    }
}

/// Precision-aware HL7 time of day with an optional UTC offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hl7Time {
    hour: u32,
    minute: Option<u32>,
    second: Option<u32>,
    nanosecond: Option<u32>,
    offset: Option<FixedOffset>,
    precision: TimePrecision,
    original_string: Arc<str>,
}

impl Hl7Time {
    /// Parses `HH[MM[SS[.S[S...]]]][+/-ZZZZ]`.
    pub fn parse(s: &str) -> Option<Self> {
        let (body, offset) = split_offset(s)?;
        let parts = parse_time_digits(body)?;
        Some(Self {
            hour: parts.hour,
            minute: parts.minute,
            second: parts.second,
            nanosecond: parts.nanosecond,
            offset,
            precision: parts.precision,
            original_string: Arc::from(s),
        })
    }

    pub fn precision(&self) -> TimePrecision {
        self.precision
    }

    pub fn original_string(&self) -> &str {
        &self.original_string
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> Option<u32> {
        self.minute
    }

    pub fn second(&self) -> Option<u32> {
        self.second
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }

    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_nano_opt(
            self.hour,
            self.minute.unwrap_or(0),
            self.second.unwrap_or(0),
            self.nanosecond.unwrap_or(0),
        )
    }
}

/// Precision-aware HL7 timestamp.
///
/// # Examples
/// ```rust
/// use atrius_hl7_lib::date_time::{DateTimePrecision, Hl7DateTime};
///
/// let ts = Hl7DateTime::parse("200202150930-0500").unwrap();
/// assert_eq!(ts.precision(), DateTimePrecision::DateHourMinute);
/// assert_eq!(ts.offset().map(|o| o.local_minus_utc()), Some(-5 * 3600));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hl7DateTime {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    minute: Option<u32>,
    second: Option<u32>,
    nanosecond: Option<u32>,
    offset: Option<FixedOffset>,
    precision: DateTimePrecision,
    original_string: Arc<str>,
}

impl Hl7DateTime {
    /// Parses `YYYY[MM[DD[HH[MM[SS[.S[S...]]]]]]][+/-ZZZZ]`.
    pub fn parse(s: &str) -> Option<Self> {
        let (body, offset) = split_offset(s)?;
        let digits = body.split('.').next()?;
        if digits.len() < 8 {
            if body.contains('.') {
                return None;
            }
            let (year, month, day, precision) = parse_date_digits(digits)?;
            let precision = match precision {
                DatePrecision::Year => DateTimePrecision::Year,
                DatePrecision::YearMonth => DateTimePrecision::YearMonth,
                DatePrecision::Full => DateTimePrecision::Date,
            };
            return Some(Self {
                year,
                month,
                day,
                hour: None,
                minute: None,
                second: None,
                nanosecond: None,
                offset,
                precision,
                original_string: Arc::from(s),
            });
        }

        let (year, month, day, _) = parse_date_digits(body.get(..8)?)?;
        let (hour, minute, second, nanosecond, precision) = match body.get(8..)? {
            "" => (None, None, None, None, DateTimePrecision::Date),
            time => {
                let parts = parse_time_digits(time)?;
                let precision = match parts.precision {
                    TimePrecision::Hour => DateTimePrecision::DateHour,
                    TimePrecision::HourMinute => DateTimePrecision::DateHourMinute,
                    TimePrecision::HourMinuteSecond => DateTimePrecision::DateHourMinuteSecond,
                    TimePrecision::Fractional => DateTimePrecision::Full,
                };
                (
                    Some(parts.hour),
                    parts.minute,
                    parts.second,
                    parts.nanosecond,
                    precision,
                )
            }
        };
        Some(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            nanosecond,
            offset,
            precision,
            original_string: Arc::from(s),
        })
    }

    pub fn precision(&self) -> DateTimePrecision {
        self.precision
    }

    pub fn original_string(&self) -> &str {
        &self.original_string
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Option<u32> {
        self.month
    }

    pub fn day(&self) -> Option<u32> {
        self.day
    }

    pub fn hour(&self) -> Option<u32> {
        self.hour
    }

    pub fn minute(&self) -> Option<u32> {
        self.minute
    }

    pub fn second(&self) -> Option<u32> {
        self.second
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }

    /// The start of the period covered by this value, ignoring any offset.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        let date =
            NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), self.day.unwrap_or(1))?;
        date.and_hms_nano_opt(
            self.hour.unwrap_or(0),
            self.minute.unwrap_or(0),
            self.second.unwrap_or(0),
            self.nanosecond.unwrap_or(0),
        )
    }

    /// The value as an absolute instant; `None` without an offset.
    pub fn to_fixed_offset(&self) -> Option<DateTime<FixedOffset>> {
        let offset = self.offset?;
        offset.from_local_datetime(&self.to_naive()?).single()
    }
}

macro_rules! impl_text_traits {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.original_string)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.original_string)
            }
        }
    )*};
}

impl_text_traits!(Hl7Date, Hl7Time, Hl7DateTime);

struct TimeParts {
    hour: u32,
    minute: Option<u32>,
    second: Option<u32>,
    nanosecond: Option<u32>,
    precision: TimePrecision,
}

fn number(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_date_digits(s: &str) -> Option<(i32, Option<u32>, Option<u32>, DatePrecision)> {
    let year = number(s.get(..4)?)? as i32;
    match s.len() {
        4 => Some((year, None, None, DatePrecision::Year)),
        6 => {
            let month = number(s.get(4..6)?).filter(|m| (1..=12).contains(m))?;
            Some((year, Some(month), None, DatePrecision::YearMonth))
        }
        8 => {
            let month = number(s.get(4..6)?)?;
            let day = number(s.get(6..8)?)?;
            NaiveDate::from_ymd_opt(year, month, day)?;
            Some((year, Some(month), Some(day), DatePrecision::Full))
        }
        _ => None,
    }
}

fn parse_time_digits(s: &str) -> Option<TimeParts> {
    let (digits, fraction) = match s.split_once('.') {
        Some((digits, fraction)) => (digits, Some(fraction)),
        None => (s, None),
    };
    let hour = number(digits.get(..2)?).filter(|h| *h <= 23)?;
    let minute = match digits.get(2..4) {
        Some(m) => Some(number(m).filter(|m| *m <= 59)?),
        None => None,
    };
    let second = match digits.get(4..6) {
        Some(sec) => Some(number(sec).filter(|sec| *sec <= 59)?),
        None => None,
    };
    let precision = match digits.len() {
        2 => TimePrecision::Hour,
        4 => TimePrecision::HourMinute,
        6 if fraction.is_some() => TimePrecision::Fractional,
        6 => TimePrecision::HourMinuteSecond,
        _ => return None,
    };
    let nanosecond = match fraction {
        Some(f) if precision == TimePrecision::Fractional && (1..=9).contains(&f.len()) => {
            Some(number(f)? * 10u32.pow(9 - f.len() as u32))
        }
        Some(_) => return None,
        None => None,
    };
    Some(TimeParts {
        hour,
        minute,
        second,
        nanosecond,
        precision,
    })
}

/// Splits a trailing `+ZZZZ`/`-ZZZZ` offset off a value.
fn split_offset(s: &str) -> Option<(&str, Option<FixedOffset>)> {
    let Some(index) = s.find(['+', '-']) else {
        return Some((s, None));
    };
    let (body, offset) = s.split_at(index);
    let sign = if offset.starts_with('-') { -1 } else { 1 };
    let digits = &offset[1..];
    if digits.len() != 4 {
        return None;
    }
    let hours = number(digits.get(..2)?).filter(|h| *h <= 23)? as i32;
    let minutes = number(digits.get(2..)?).filter(|m| *m <= 59)? as i32;
    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;
    Some((body, Some(offset)))
}
