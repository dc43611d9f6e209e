//! Format predicates for `date` and `datetime` literals.
//!
//! Dates are `YYYY-M-D` with a four-digit year and one- or two-digit month
//! and day, checked against the calendar (including leap years). Datetimes add
//! ` HH:MM:SS` with each field two digits and in range.

/// Shown to users next to rejected date literals.
pub const DATE_FORMAT_HINT: &str = "YYYY-MM-DD";
/// Shown to users next to rejected datetime literals.
pub const DATETIME_FORMAT_HINT: &str = "YYYY-MM-DD HH:MM:SS";

const fn is_leap_year(y: u32) -> bool {
    (y % 4 == 0 && y % 100 != 0) || y % 400 == 0
}

const fn days_in_month(y: u32, m: u32) -> u32 {
    match m {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(y) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Parse an all-digit field whose length lies in `min..=max`.
fn digits(field: &str, min: usize, max: usize) -> Option<u32> {
    if field.len() < min || field.len() > max || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

fn parse_date(s: &str) -> Option<(u32, u32, u32)> {
    let mut parts = s.split('-');
    let year = digits(parts.next()?, 4, 4)?;
    let month = digits(parts.next()?, 1, 2)?;
    let day = digits(parts.next()?, 1, 2)?;
    if parts.next().is_some() {
        return None;
    }
    if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
        return None;
    }
    Some((year, month, day))
}

fn parse_time(s: &str) -> Option<(u32, u32, u32)> {
    let mut parts = s.split(':');
    let hour = digits(parts.next()?, 2, 2)?;
    let minute = digits(parts.next()?, 2, 2)?;
    let second = digits(parts.next()?, 2, 2)?;
    if parts.next().is_some() || hour > 23 || minute > 59 || second > 59 {
        return None;
    }
    Some((hour, minute, second))
}

fn parse_datetime(s: &str) -> Option<((u32, u32, u32), (u32, u32, u32))> {
    let (date, time) = s.split_once(' ')?;
    Some((parse_date(date)?, parse_time(time)?))
}

#[must_use]
pub fn is_valid_date(s: &str) -> bool {
    parse_date(s).is_some()
}

#[must_use]
pub fn is_valid_datetime(s: &str) -> bool {
    parse_datetime(s).is_some()
}

/// Zero-pad a valid date to `YYYY-MM-DD`.
#[must_use]
pub fn normalize_date(s: &str) -> Option<String> {
    let (y, m, d) = parse_date(s)?;
    Some(format!("{y:04}-{m:02}-{d:02}"))
}

/// Zero-pad the date part of a valid datetime.
#[must_use]
pub fn normalize_datetime(s: &str) -> Option<String> {
    let ((y, mo, d), (h, mi, sec)) = parse_datetime(s)?;
    Some(format!("{y:04}-{mo:02}-{d:02} {h:02}:{mi:02}:{sec:02}"))
}
