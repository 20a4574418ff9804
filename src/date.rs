//! Conversion between `DD-MMM-YYYY` calendar dates and epoch seconds.
//!
//! Dates are stored as the number of seconds between 1970-01-01T00:00:00Z
//! and midnight UTC of the day in question, so every stored value is a
//! multiple of [`SECONDS_PER_DAY`].

use serde::Serializer;
use time::{Date, OffsetDateTime};

use crate::errors::BackendError;

/// Seconds since 1970-01-01T00:00:00Z.
pub type Epoch = i64;

pub const SECONDS_PER_DAY: Epoch = 86_400;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parses a date such as `27-Aug-2024` into epoch seconds.
///
/// The layout is exact: a two-digit day, an English month abbreviation
/// in title case and a four-digit year, separated by hyphens.
///
/// ```
/// use bookshelf::date::parse;
/// assert_eq!(parse("02-Jan-1970").unwrap(), 86_400);
/// assert!(parse("2-Jan-1970").is_err());
/// ```
pub fn parse(s: &str) -> Result<Epoch, BackendError> {
    let invalid = || BackendError::InvalidDateFormat(s.to_owned());

    let mut fields = s.split('-');
    let (day, month, year) = match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(day), Some(month), Some(year), None) => (day, month, year),
        _ => return Err(invalid()),
    };

    let day = digits(day, 2).ok_or_else(invalid)?;
    let year = digits(year, 4).ok_or_else(invalid)?;
    let month = MONTHS
        .iter()
        .position(|m| *m == month)
        .ok_or_else(invalid)?;

    // the month index is below 12 and the day has two digits, so both fit
    let date = Date::try_from_ymd(year as i32, month as u8 + 1, day as u8).map_err(|_| invalid())?;

    Ok(date.midnight().assume_utc().unix_timestamp())
}

/// Formats epoch seconds as `DD-MMM-YYYY`. Any time of day is dropped.
///
/// ```
/// use bookshelf::date::format;
/// assert_eq!(format(1_724_716_800), "27-Aug-2024");
/// ```
pub fn format(epoch: Epoch) -> String {
    let date = OffsetDateTime::from_unix_timestamp(epoch).date();
    let month = MONTHS[usize::from(date.month() - 1)];

    format!("{:02}-{}-{:04}", date.day(), month, date.year())
}

/// Serializes an optional date as `DD-MMM-YYYY`, or `null` when unset.
pub fn serialize_option<S>(epoch: &Option<Epoch>, serializer: S) -> Result<S::Ok, S::Error>
where S: Serializer {
    match epoch {
        Some(epoch) => serializer.serialize_some(&format(*epoch)),
        None => serializer.serialize_none(),
    }
}

fn digits(field: &str, width: usize) -> Option<u32> {
    if field.len() == width && field.bytes().all(|b| b.is_ascii_digit()) {
        field.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{format, parse, SECONDS_PER_DAY};
    use crate::errors::BackendError;

    #[test]
    fn parses_known_dates() {
        assert_eq!(parse("01-Jan-1970").unwrap(), 0);
        assert_eq!(parse("01-Jan-2024").unwrap(), 1_704_067_200);
        assert_eq!(parse("10-Jan-2024").unwrap(), 1_704_067_200 + 9 * SECONDS_PER_DAY);
        assert_eq!(parse("29-Feb-2024").unwrap(), 1_709_164_800);
        assert_eq!(parse("31-Dec-1969").unwrap(), -SECONDS_PER_DAY);
    }

    #[test]
    fn formats_known_dates() {
        assert_eq!(format(0), "01-Jan-1970");
        assert_eq!(format(1_704_067_200), "01-Jan-2024");
        assert_eq!(format(-SECONDS_PER_DAY), "31-Dec-1969");
        assert_eq!(format(1_704_067_200 + 3_600), "01-Jan-2024");
    }

    #[test]
    fn rejects_malformed_dates() {
        for s in &[
            "",
            "27/Aug/2024",
            "27 Aug 2024",
            "2024-Aug-27",
            "Aug-27-2024",
            "27-08-2024",
            "27-August-2024",
            "27-aug-2024",
            "27-AUG-2024",
            "7-Aug-2024",
            "027-Aug-2024",
            "27-Aug-24",
            "aa-Aug-2024",
            "27-Aug-20x4",
            "+7-Aug-2024",
            "27-Aug-2024-",
            "00-Aug-2024",
            "32-Aug-2024",
            "31-Sep-2024",
            "29-Feb-2023",
        ] {
            match parse(s) {
                Err(BackendError::InvalidDateFormat(input)) => assert_eq!(&input, s),
                other => panic!("{:?} parsed as {:?}", s, other),
            }
        }
    }

    proptest! {
        #[test]
        fn parsing_round_trips(day in 1u32..=28, month in 0usize..12, year in 0u32..=9999) {
            let s = format!("{:02}-{}-{:04}", day, super::MONTHS[month], year);
            let epoch = parse(&s).unwrap();

            prop_assert_eq!(epoch % SECONDS_PER_DAY, 0);
            prop_assert_eq!(&format(epoch), &s);
            prop_assert_eq!(parse(&format(epoch)).unwrap(), epoch);
        }
    }
}
