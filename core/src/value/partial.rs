//! Date and time types with partial precision.
//!
//! DICOM date and time values may omit trailing components
//! (e.g. a date of `"199804"` has month precision).
//! The types in this module keep track of the precision found
//! when decoding, so that re-encoding a value reproduces
//! the original form instead of inventing components.

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike};
use snafu::{ensure, OptionExt, Snafu};
use std::fmt;

/// An error during partial date/time construction or conversion.
#[derive(Debug, Snafu, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("component `{}` out of range: {}", component, value))]
    ComponentRange { component: &'static str, value: u32 },

    #[snafu(display("second fraction must have 1 to 6 digits, got {}", digits))]
    FractionPrecision { digits: u8 },

    #[snafu(display("value cannot be converted to a complete date/time"))]
    Incomplete,

    #[snafu(display("could not parse `{}` as a {}", text, target))]
    Parse { text: String, target: &'static str },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A DICOM date with year, month or day precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DicomDate {
    year: u16,
    month: Option<u8>,
    day: Option<u8>,
}

impl DicomDate {
    /// Create a date with year precision.
    pub fn from_y(year: u16) -> Result<Self> {
        ensure!(
            year <= 9999,
            ComponentRangeSnafu {
                component: "year",
                value: year as u32
            }
        );
        Ok(DicomDate {
            year,
            month: None,
            day: None,
        })
    }

    /// Create a date with month precision.
    pub fn from_ym(year: u16, month: u8) -> Result<Self> {
        let date = Self::from_y(year)?;
        ensure!(
            (1..=12).contains(&month),
            ComponentRangeSnafu {
                component: "month",
                value: month as u32
            }
        );
        Ok(DicomDate {
            month: Some(month),
            ..date
        })
    }

    /// Create a complete date.
    pub fn from_ymd(year: u16, month: u8, day: u8) -> Result<Self> {
        let date = Self::from_ym(year, month)?;
        ensure!(
            (1..=31).contains(&day),
            ComponentRangeSnafu {
                component: "day",
                value: day as u32
            }
        );
        Ok(DicomDate {
            day: Some(day),
            ..date
        })
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> Option<u8> {
        self.month
    }

    pub fn day(&self) -> Option<u8> {
        self.day
    }

    /// Whether all components are present.
    pub fn is_precise(&self) -> bool {
        self.day.is_some()
    }

    /// Convert to a `chrono` date; fails when imprecise.
    pub fn to_naive_date(&self) -> Result<NaiveDate> {
        let (m, d) = match (self.month, self.day) {
            (Some(m), Some(d)) => (m, d),
            _ => return IncompleteSnafu.fail(),
        };
        NaiveDate::from_ymd_opt(self.year as i32, m as u32, d as u32).context(IncompleteSnafu)
    }

    /// Parse a date from its wire form `YYYY[MM[DD]]`.
    /// The historical form `YYYY.MM.DD` is also accepted.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim_end_matches([' ', '\0']);
        let canonical: String;
        let text = if text.contains('.') {
            canonical = text.replace('.', "");
            &canonical
        } else {
            text
        };
        let fail = || {
            ParseSnafu {
                text: text.to_owned(),
                target: "DicomDate",
            }
            .build()
        };
        if !text.chars().all(|c| c.is_ascii_digit()) {
            return Err(fail());
        }
        match text.len() {
            4 => DicomDate::from_y(text.parse().map_err(|_| fail())?),
            6 => DicomDate::from_ym(
                text[0..4].parse().map_err(|_| fail())?,
                text[4..6].parse().map_err(|_| fail())?,
            ),
            8 => DicomDate::from_ymd(
                text[0..4].parse().map_err(|_| fail())?,
                text[4..6].parse().map_err(|_| fail())?,
                text[6..8].parse().map_err(|_| fail())?,
            ),
            _ => Err(fail()),
        }
    }
}

impl From<NaiveDate> for DicomDate {
    fn from(date: NaiveDate) -> Self {
        DicomDate {
            year: date.year() as u16,
            month: Some(date.month() as u8),
            day: Some(date.day() as u8),
        }
    }
}

impl fmt::Display for DicomDate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(month) = self.month {
            write!(f, "{:02}", month)?;
            if let Some(day) = self.day {
                write!(f, "{:02}", day)?;
            }
        }
        Ok(())
    }
}

/// A DICOM time with hour, minute, second or fractional precision.
///
/// The fraction is kept together with its number of digits,
/// so that `"1010"` and `"101000.00"` round-trip distinctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DicomTime {
    hour: u8,
    minute: Option<u8>,
    second: Option<u8>,
    fraction: Option<(u32, u8)>,
}

impl DicomTime {
    /// Create a time with hour precision.
    pub fn from_h(hour: u8) -> Result<Self> {
        ensure!(
            hour <= 23,
            ComponentRangeSnafu {
                component: "hour",
                value: hour as u32
            }
        );
        Ok(DicomTime {
            hour,
            minute: None,
            second: None,
            fraction: None,
        })
    }

    /// Create a time with minute precision.
    pub fn from_hm(hour: u8, minute: u8) -> Result<Self> {
        let t = Self::from_h(hour)?;
        ensure!(
            minute <= 59,
            ComponentRangeSnafu {
                component: "minute",
                value: minute as u32
            }
        );
        Ok(DicomTime {
            minute: Some(minute),
            ..t
        })
    }

    /// Create a time with second precision.
    pub fn from_hms(hour: u8, minute: u8, second: u8) -> Result<Self> {
        let t = Self::from_hm(hour, minute)?;
        // 60 admitted for leap seconds
        ensure!(
            second <= 60,
            ComponentRangeSnafu {
                component: "second",
                value: second as u32
            }
        );
        Ok(DicomTime {
            second: Some(second),
            ..t
        })
    }

    /// Create a time with a second fraction of the given
    /// number of digits (1 to 6).
    pub fn from_hms_fraction(
        hour: u8,
        minute: u8,
        second: u8,
        fraction: u32,
        digits: u8,
    ) -> Result<Self> {
        let t = Self::from_hms(hour, minute, second)?;
        ensure!(
            (1..=6).contains(&digits),
            FractionPrecisionSnafu { digits }
        );
        ensure!(
            fraction < 10u32.pow(digits as u32),
            ComponentRangeSnafu {
                component: "fraction",
                value: fraction
            }
        );
        Ok(DicomTime {
            fraction: Some((fraction, digits)),
            ..t
        })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> Option<u8> {
        self.minute
    }

    pub fn second(&self) -> Option<u8> {
        self.second
    }

    /// The second fraction and its number of digits, if present.
    pub fn fraction(&self) -> Option<(u32, u8)> {
        self.fraction
    }

    /// Convert to a `chrono` time; fails when imprecise.
    pub fn to_naive_time(&self) -> Result<NaiveTime> {
        let (m, s) = match (self.minute, self.second) {
            (Some(m), Some(s)) => (m, s),
            _ => return IncompleteSnafu.fail(),
        };
        let micros = match self.fraction {
            Some((frac, digits)) => frac * 10u32.pow(6 - digits as u32),
            None => 0,
        };
        NaiveTime::from_hms_micro_opt(self.hour as u32, m as u32, s as u32, micros)
            .context(IncompleteSnafu)
    }

    /// Parse a time from its wire form `HH[MM[SS[.F{1,6}]]]`.
    /// The historical form with `:` separators is also accepted.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim_end_matches([' ', '\0']);
        let canonical: String;
        let text = if text.contains(':') {
            canonical = text.replace(':', "");
            &canonical
        } else {
            text
        };
        let fail = || {
            ParseSnafu {
                text: text.to_owned(),
                target: "DicomTime",
            }
            .build()
        };
        let (whole, frac) = match text.split_once('.') {
            Some((w, f)) => (w, Some(f)),
            None => (text, None),
        };
        if !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(fail());
        }
        let t = match whole.len() {
            2 => DicomTime::from_h(whole.parse().map_err(|_| fail())?)?,
            4 => DicomTime::from_hm(
                whole[0..2].parse().map_err(|_| fail())?,
                whole[2..4].parse().map_err(|_| fail())?,
            )?,
            6 => DicomTime::from_hms(
                whole[0..2].parse().map_err(|_| fail())?,
                whole[2..4].parse().map_err(|_| fail())?,
                whole[4..6].parse().map_err(|_| fail())?,
            )?,
            _ => return Err(fail()),
        };
        match frac {
            None => Ok(t),
            Some(f) => {
                if f.is_empty() || f.len() > 6 || !f.chars().all(|c| c.is_ascii_digit()) {
                    return Err(fail());
                }
                DicomTime::from_hms_fraction(
                    t.hour,
                    t.minute.context(IncompleteSnafu)?,
                    t.second.context(IncompleteSnafu)?,
                    f.parse().map_err(|_| fail())?,
                    f.len() as u8,
                )
            }
        }
    }
}

impl From<NaiveTime> for DicomTime {
    fn from(time: NaiveTime) -> Self {
        DicomTime {
            hour: time.hour() as u8,
            minute: Some(time.minute() as u8),
            second: Some(time.second() as u8),
            fraction: Some((time.nanosecond() / 1_000, 6)),
        }
    }
}

impl fmt::Display for DicomTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02}", self.hour)?;
        if let Some(minute) = self.minute {
            write!(f, "{:02}", minute)?;
            if let Some(second) = self.second {
                write!(f, "{:02}", second)?;
                if let Some((frac, digits)) = self.fraction {
                    write!(f, ".{:0width$}", frac, width = digits as usize)?;
                }
            }
        }
        Ok(())
    }
}

/// A DICOM date-time: a partial date, an optional partial time,
/// and an optional UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DicomDateTime {
    date: DicomDate,
    time: Option<DicomTime>,
    offset: Option<FixedOffset>,
}

impl DicomDateTime {
    /// Create a date-time from a date alone.
    pub fn from_date(date: DicomDate) -> Self {
        DicomDateTime {
            date,
            time: None,
            offset: None,
        }
    }

    /// Create a date-time from a date and a time.
    pub fn from_date_and_time(date: DicomDate, time: DicomTime) -> Self {
        DicomDateTime {
            date,
            time: Some(time),
            offset: None,
        }
    }

    /// Attach a UTC offset.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn date(&self) -> DicomDate {
        self.date
    }

    pub fn time(&self) -> Option<DicomTime> {
        self.time
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }

    /// Convert to a `chrono` date-time in the value's own offset
    /// (UTC when absent); fails when imprecise.
    pub fn to_chrono_datetime(&self) -> Result<chrono::DateTime<FixedOffset>> {
        let date = self.date.to_naive_date()?;
        let time = self.time.context(IncompleteSnafu)?.to_naive_time()?;
        let offset = self
            .offset
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
        offset
            .from_local_datetime(&date.and_time(time))
            .single()
            .context(IncompleteSnafu)
    }

    /// Parse a date-time from its wire form
    /// `YYYY[MM[DD[HH[MM[SS[.F{1,6}]]]]]][&ZZXX]`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim_end_matches([' ', '\0']);
        let fail = || {
            ParseSnafu {
                text: text.to_owned(),
                target: "DicomDateTime",
            }
            .build()
        };
        // split the optional offset suffix
        let (stem, offset) = match text.rfind(['+', '-']) {
            Some(at) if at >= 4 => {
                let (stem, suffix) = text.split_at(at);
                let sign = if suffix.starts_with('-') { -1 } else { 1 };
                let digits = &suffix[1..];
                if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
                    return Err(fail());
                }
                let hours: i32 = digits[0..2].parse().map_err(|_| fail())?;
                let minutes: i32 = digits[2..4].parse().map_err(|_| fail())?;
                let offset =
                    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(fail)?;
                (stem, Some(offset))
            }
            _ => (text, None),
        };

        let (date_text, time_text) = if stem.len() > 8 {
            stem.split_at(8)
        } else {
            (stem, "")
        };
        let date = DicomDate::parse(date_text)?;
        let mut dt = if time_text.is_empty() {
            DicomDateTime::from_date(date)
        } else {
            DicomDateTime::from_date_and_time(date, DicomTime::parse(time_text)?)
        };
        dt.offset = offset;
        Ok(dt)
    }
}

impl From<chrono::DateTime<FixedOffset>> for DicomDateTime {
    fn from(dt: chrono::DateTime<FixedOffset>) -> Self {
        DicomDateTime {
            date: dt.date_naive().into(),
            time: Some(dt.time().into()),
            offset: Some(*dt.offset()),
        }
    }
}

impl fmt::Display for DicomDateTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.date)?;
        if let Some(time) = self.time {
            write!(f, "{}", time)?;
        }
        if let Some(offset) = self.offset {
            let secs = offset.local_minus_utc();
            let (sign, secs) = if secs < 0 { ('-', -secs) } else { ('+', secs) };
            write!(f, "{}{:02}{:02}", sign, secs / 3600, (secs % 3600) / 60)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_precision_round_trip() {
        for text in ["1998", "199804", "19980429"] {
            assert_eq!(DicomDate::parse(text).unwrap().to_string(), text);
        }
        // historical form canonicalizes
        assert_eq!(
            DicomDate::parse("1998.04.29").unwrap(),
            DicomDate::from_ymd(1998, 4, 29).unwrap()
        );
        assert!(DicomDate::parse("199813").is_err());
        assert!(DicomDate::parse("19980").is_err());
    }

    #[test]
    fn time_precision_round_trip() {
        for text in ["10", "1030", "103045", "103045.1", "103045.123456"] {
            assert_eq!(DicomTime::parse(text).unwrap().to_string(), text);
        }
        assert_eq!(
            DicomTime::parse("10:30:45").unwrap(),
            DicomTime::from_hms(10, 30, 45).unwrap()
        );
        assert!(DicomTime::parse("25").is_err());
        assert!(DicomTime::parse("103045.1234567").is_err());
    }

    #[test]
    fn datetime_with_offset() {
        let dt = DicomDateTime::parse("19980429103045.1-0500").unwrap();
        assert_eq!(dt.date(), DicomDate::from_ymd(1998, 4, 29).unwrap());
        assert_eq!(
            dt.time(),
            Some(DicomTime::from_hms_fraction(10, 30, 45, 1, 1).unwrap())
        );
        assert_eq!(
            dt.offset(),
            Some(FixedOffset::west_opt(5 * 3600).unwrap())
        );
        assert_eq!(dt.to_string(), "19980429103045.1-0500");
    }

    #[test]
    fn datetime_date_only() {
        let dt = DicomDateTime::parse("199804").unwrap();
        assert_eq!(dt.date(), DicomDate::from_ym(1998, 4).unwrap());
        assert_eq!(dt.time(), None);
        assert_eq!(dt.to_string(), "199804");
    }
}
