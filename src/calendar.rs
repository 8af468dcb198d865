//! Calendar primitives shared by both generators.

use jiff::civil::Date;
use jiff::Span;

use crate::config::Weekday;
use crate::error::RecurrenceError;

/// Get the last day of `date`'s month.
pub fn end_of_month(date: Date) -> Date {
    date.last_of_month()
}

/// Get the first day of the month after `date`'s month.
pub fn first_of_next_month(date: Date) -> Result<Date, RecurrenceError> {
    Ok(end_of_month(date).tomorrow()?)
}

/// Shift a date by a signed number of days.
pub fn add_days(date: Date, days: i64) -> Result<Date, RecurrenceError> {
    Ok(date.checked_add(Span::new().try_days(days)?)?)
}

/// Shift a date by a signed number of months, clamping the day to the
/// length of the target month (Jan 31 + 1 month = Feb 28/29).
pub fn add_months(date: Date, months: i32) -> Result<Date, RecurrenceError> {
    Ok(date.checked_add(Span::new().try_months(i64::from(months))?)?)
}

/// Whether two dates fall in the same calendar month.
pub fn same_month(a: Date, b: Date) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Resolve the `ordinal`-th occurrence of `weekday` relative to `anchor`.
///
/// - `ordinal > 0`: the first occurrence on or after `anchor`, then
///   `ordinal - 1` more weeks forward.
/// - `ordinal < 0`: the first occurrence on or before `anchor`, then
///   `|ordinal| - 1` more weeks backward.
/// - `ordinal == 0`: the most recent occurrence on or before `anchor`.
pub fn date_of_weekday(
    anchor: Date,
    weekday: Weekday,
    ordinal: i32,
) -> Result<Date, RecurrenceError> {
    let anchor_wd = i64::from(Weekday::from_jiff(anchor.weekday()).number());
    let target_wd = i64::from(weekday.number());
    let extra_weeks = (i64::from(ordinal).abs() - 1).max(0);

    let days = if ordinal > 0 {
        let forward = (target_wd - anchor_wd).rem_euclid(7);
        forward + 7 * extra_weeks
    } else {
        let backward = (anchor_wd - target_wd).rem_euclid(7);
        -(backward + 7 * extra_weeks)
    };
    add_days(anchor, days)
}
