use jiff::civil::Date;
use log::{debug, trace};

use crate::calendar::{
    add_days, add_months, date_of_weekday, end_of_month, first_of_next_month, same_month,
};
use crate::config::*;
use crate::error::RecurrenceError;

/// Resolve the single date satisfying `target` within `date`'s month.
///
/// A `FromStart` day past the end of a short month runs over into the next
/// month (day 31 of February lands in March), and a `FromEnd` position longer
/// than the month runs back into the previous one. The same holds for a fifth
/// weekday that the month does not have. Callers compare the month of the
/// result against the month they asked for.
pub fn monthly_date(date: Date, target: MonthlyTarget) -> Result<Date, RecurrenceError> {
    match target {
        MonthlyTarget::DayOfMonth(Ordinal::FromStart(k)) => {
            add_days(date.first_of_month(), i64::from(k) - 1)
        }
        MonthlyTarget::DayOfMonth(Ordinal::FromEnd(k)) => {
            add_days(end_of_month(date), 1 - i64::from(k))
        }
        MonthlyTarget::WeekdayOfMonth {
            ordinal: Ordinal::FromStart(k),
            weekday,
        } => date_of_weekday(date.first_of_month(), weekday, i32::from(k)),
        MonthlyTarget::WeekdayOfMonth {
            ordinal: Ordinal::FromEnd(k),
            weekday,
        } => date_of_weekday(end_of_month(date), weekday, -i32::from(k)),
    }
}

/// Nearest position to `target` that exists in `date`'s month.
fn clamp_into_month(date: Date, target: MonthlyTarget) -> Result<Date, RecurrenceError> {
    match target {
        MonthlyTarget::DayOfMonth(Ordinal::FromStart(_)) => Ok(end_of_month(date)),
        MonthlyTarget::DayOfMonth(Ordinal::FromEnd(_)) => Ok(date.first_of_month()),
        MonthlyTarget::WeekdayOfMonth {
            ordinal: Ordinal::FromStart(_),
            weekday,
        } => date_of_weekday(end_of_month(date), weekday, -1),
        MonthlyTarget::WeekdayOfMonth {
            ordinal: Ordinal::FromEnd(_),
            weekday,
        } => date_of_weekday(date.first_of_month(), weekday, 1),
    }
}

/// The date the first step would produce for `start`'s month.
fn first_occurrence(start: Date, rule: MonthlyRule) -> Result<Date, RecurrenceError> {
    let resolved = monthly_date(start, rule.target)?;
    match rule.overflow {
        OverflowPolicy::Clamp if !same_month(resolved, start) => {
            clamp_into_month(start, rule.target)
        }
        _ => Ok(resolved),
    }
}

/// Generate the whole fixed-interval sequence for a reference recurrence.
pub fn reference_sequence(config: &RecurrenceConfig) -> Result<Vec<Date>, RecurrenceError> {
    ReferenceDates::new(config)?.collect()
}

/// Generate the whole sequence for a monthly recurrence.
pub fn monthly_sequence(config: &RecurrenceConfig) -> Result<Vec<Date>, RecurrenceError> {
    MonthlyDates::new(config)?.collect()
}

/// Generate the sequence for whichever kind of recurrence `config` holds.
pub fn generate(config: &RecurrenceConfig) -> Result<Vec<Date>, RecurrenceError> {
    match config.rule() {
        Rule::Reference(_) => reference_sequence(config),
        Rule::Monthly(_) => monthly_sequence(config),
    }
}

/// Lazy iterator over the dates of a reference recurrence.
///
/// The sequence is strictly monotonic in the direction of the step. Creating
/// a new iterator from the same config restarts it.
#[derive(Debug, Clone)]
pub struct ReferenceDates {
    current: Date,
    step: i64,
    bound: Bound,
    emitted: u32,
    done: bool,
}

impl ReferenceDates {
    pub fn new(config: &RecurrenceConfig) -> Result<Self, RecurrenceError> {
        let interval = match config.rule() {
            Rule::Reference(interval) => *interval,
            Rule::Monthly(_) => {
                return Err(RecurrenceError::config(
                    "reference sequence requested for a monthly recurrence",
                ))
            }
        };
        let bound = config.bound();
        let (current, done) = match interval {
            Interval::Days(_) => (config.start(), false),
            Interval::Weekday { weekday, ordinal } => {
                match date_of_weekday(config.start(), weekday, ordinal) {
                    Ok(first) => (first, false),
                    // No first date inside the calendar range, so none inside the end.
                    Err(e) if matches!(bound, Bound::Until(_)) => {
                        debug!("{e}; end-bounded sequence is empty");
                        (config.start(), true)
                    }
                    Err(e) => return Err(e),
                }
            }
        };
        Ok(Self {
            current,
            step: interval.step_days(),
            bound,
            emitted: 0,
            done,
        })
    }

    fn within_end(&self, end: Date) -> bool {
        if self.step > 0 {
            self.current <= end
        } else {
            self.current >= end
        }
    }
}

impl Iterator for ReferenceDates {
    type Item = Result<Date, RecurrenceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Bound::Count(n) = self.bound {
            if self.emitted >= n {
                self.done = true;
                return None;
            }
        }

        if self.emitted > 0 {
            match add_days(self.current, self.step) {
                Ok(d) => self.current = d,
                // Leaving the calendar range always passes an end date.
                Err(_) if matches!(self.bound, Bound::Until(_)) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        if let Bound::Until(end) = self.bound {
            if !self.within_end(end) {
                self.done = true;
                return None;
            }
        }

        self.emitted += 1;
        Some(Ok(self.current))
    }
}

/// Lazy iterator over the dates of a monthly recurrence.
///
/// Each step resolves the target in the working month, then advances the
/// working date by `months_per_step` months. With [`OverflowPolicy::Skip`] a
/// month lacking the target consumes its step without yielding, so a
/// count-bounded sequence can come out shorter than the count.
///
/// An end date bounds the working month rather than the resolved date: the
/// last working month on or before the end still yields its date, even when
/// that date falls after the end.
#[derive(Debug, Clone)]
pub struct MonthlyDates {
    working: Date,
    rule: MonthlyRule,
    bound: Bound,
    steps: u32,
    pending_advance: bool,
    done: bool,
}

impl MonthlyDates {
    pub fn new(config: &RecurrenceConfig) -> Result<Self, RecurrenceError> {
        let rule = match config.rule() {
            Rule::Monthly(rule) => *rule,
            Rule::Reference(_) => {
                return Err(RecurrenceError::config(
                    "monthly sequence requested for a reference recurrence",
                ))
            }
        };

        let start = config.start();
        let mut working = start;
        // Only a count bound aligns: an end-bounded run starts in the start
        // month even when that month's occurrence precedes the start date.
        if let Bound::Count(_) = config.bound() {
            let first = first_occurrence(start, rule)?;
            if start > first {
                working = first_of_next_month(start)?;
                trace!("{start} is past {first}, starting from {working}");
            }
        }

        Ok(Self {
            working,
            rule,
            bound: config.bound(),
            steps: 0,
            pending_advance: false,
            done: false,
        })
    }

    fn advance(&mut self) -> Result<(), RecurrenceError> {
        for _ in 0..self.rule.months_per_step {
            self.working = first_of_next_month(self.working)?;
        }
        Ok(())
    }

    /// Resolve the working month. `None` means the month was skipped.
    fn resolve(&mut self) -> Result<Option<Date>, RecurrenceError> {
        let target = self.rule.target;
        let resolved = monthly_date(self.working, target)?;
        if same_month(resolved, self.working) {
            self.working = resolved;
            return Ok(Some(resolved));
        }

        match self.rule.overflow {
            OverflowPolicy::Skip => {
                debug!(
                    "no {target} in {}-{:02}, resolved to {resolved}; skipping",
                    self.working.year(),
                    self.working.month()
                );
                // Roll the overflowed date back into the month it came from.
                let correction = match target.ordinal() {
                    Ordinal::FromStart(_) => -1,
                    Ordinal::FromEnd(_) => 1,
                };
                self.working = add_months(resolved, correction)?;
                Ok(None)
            }
            OverflowPolicy::Clamp => {
                let clamped = clamp_into_month(self.working, target)?;
                debug!("no {target} in the month of {clamped}, clamped from {resolved}");
                self.working = clamped;
                Ok(Some(clamped))
            }
        }
    }
}

impl Iterator for MonthlyDates {
    type Item = Result<Date, RecurrenceError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            if let Bound::Count(n) = self.bound {
                if self.steps >= n {
                    self.done = true;
                    return None;
                }
            }

            if self.pending_advance {
                self.pending_advance = false;
                if let Err(e) = self.advance() {
                    self.done = true;
                    return match self.bound {
                        Bound::Until(_) => None,
                        Bound::Count(_) => Some(Err(e)),
                    };
                }
            }

            if let Bound::Until(end) = self.bound {
                if self.working > end {
                    self.done = true;
                    return None;
                }
            }

            self.steps += 1;
            self.pending_advance = true;
            match self.resolve() {
                Ok(Some(date)) => return Some(Ok(date)),
                Ok(None) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;

    fn day_target(day: i32) -> MonthlyTarget {
        MonthlyTarget::day_of_month(day).unwrap()
    }

    fn weekday_target(ordinal: i32, weekday: Weekday) -> MonthlyTarget {
        MonthlyTarget::weekday_of_month(ordinal, weekday).unwrap()
    }

    fn monthly(start: Date, bound: Bound, target: MonthlyTarget) -> RecurrenceConfig {
        RecurrenceConfig::monthly(start, bound, target).unwrap()
    }

    #[test]
    fn test_monthly_date_day_from_start() {
        assert_eq!(monthly_date(date(2024, 2, 20), day_target(15)).unwrap(), date(2024, 2, 15));
        assert_eq!(monthly_date(date(2024, 2, 20), day_target(1)).unwrap(), date(2024, 2, 1));
    }

    #[test]
    fn test_monthly_date_day_overflows_into_next_month() {
        assert_eq!(monthly_date(date(2024, 2, 1), day_target(31)).unwrap(), date(2024, 3, 2));
        assert_eq!(monthly_date(date(2024, 4, 1), day_target(31)).unwrap(), date(2024, 5, 1));
    }

    #[test]
    fn test_monthly_date_day_from_end() {
        assert_eq!(monthly_date(date(2024, 2, 3), day_target(-1)).unwrap(), date(2024, 2, 29));
        assert_eq!(monthly_date(date(2024, 2, 3), day_target(-2)).unwrap(), date(2024, 2, 28));
        assert_eq!(monthly_date(date(2024, 2, 3), day_target(-31)).unwrap(), date(2024, 1, 30));
    }

    #[test]
    fn test_monthly_date_weekday() {
        // February 2024 starts on a Thursday and ends on Thursday the 29th.
        let feb = date(2024, 2, 17);
        assert_eq!(
            monthly_date(feb, weekday_target(1, Weekday::Monday)).unwrap(),
            date(2024, 2, 5)
        );
        assert_eq!(
            monthly_date(feb, weekday_target(5, Weekday::Thursday)).unwrap(),
            date(2024, 2, 29)
        );
        assert_eq!(
            monthly_date(feb, weekday_target(-1, Weekday::Thursday)).unwrap(),
            date(2024, 2, 29)
        );
        assert_eq!(
            monthly_date(feb, weekday_target(-1, Weekday::Friday)).unwrap(),
            date(2024, 2, 23)
        );
        // No fifth Friday: runs into March.
        assert_eq!(
            monthly_date(feb, weekday_target(5, Weekday::Friday)).unwrap(),
            date(2024, 3, 1)
        );
    }

    #[test]
    fn test_reference_count() {
        let config = RecurrenceConfig::reference(
            date(2024, 1, 31),
            Bound::Count(3),
            Interval::Days(1),
        )
        .unwrap();
        assert_eq!(
            reference_sequence(&config).unwrap(),
            vec![date(2024, 1, 31), date(2024, 2, 1), date(2024, 2, 2)]
        );
    }

    #[test]
    fn test_reference_until_inclusive() {
        let config = RecurrenceConfig::reference(
            date(2024, 1, 1),
            Bound::Until(date(2024, 1, 15)),
            Interval::weeks(1).unwrap(),
        )
        .unwrap();
        assert_eq!(
            reference_sequence(&config).unwrap(),
            vec![date(2024, 1, 1), date(2024, 1, 8), date(2024, 1, 15)]
        );
    }

    #[test]
    fn test_reference_negative_step_until() {
        let config = RecurrenceConfig::reference(
            date(2024, 1, 10),
            Bound::Until(date(2024, 1, 1)),
            Interval::Days(-3),
        )
        .unwrap();
        assert_eq!(
            reference_sequence(&config).unwrap(),
            vec![date(2024, 1, 10), date(2024, 1, 7), date(2024, 1, 4), date(2024, 1, 1)]
        );
    }

    #[test]
    fn test_reference_start_past_end_is_empty() {
        let backward = RecurrenceConfig::reference(
            date(2024, 1, 1),
            Bound::Until(date(2024, 1, 10)),
            Interval::Days(-1),
        )
        .unwrap();
        assert!(reference_sequence(&backward).unwrap().is_empty());

        let forward = RecurrenceConfig::reference(
            date(2024, 1, 10),
            Bound::Until(date(2024, 1, 1)),
            Interval::Days(1),
        )
        .unwrap();
        assert!(reference_sequence(&forward).unwrap().is_empty());
    }

    #[test]
    fn test_reference_next_weekday() {
        let interval = Interval::Weekday {
            weekday: Weekday::Friday,
            ordinal: 1,
        };
        let config = RecurrenceConfig::reference(
            date(2024, 1, 1),
            Bound::Count(3),
            interval,
        )
        .unwrap();
        assert_eq!(
            reference_sequence(&config).unwrap(),
            vec![date(2024, 1, 5), date(2024, 1, 12), date(2024, 1, 19)]
        );
    }

    #[test]
    fn test_reference_previous_weekday() {
        let interval = Interval::Weekday {
            weekday: Weekday::Friday,
            ordinal: -1,
        };
        let config = RecurrenceConfig::reference(
            date(2024, 1, 1),
            Bound::Count(2),
            interval,
        )
        .unwrap();
        assert_eq!(
            reference_sequence(&config).unwrap(),
            vec![date(2023, 12, 29), date(2023, 12, 22)]
        );
    }

    #[test]
    fn test_reference_count_range_error() {
        let config = RecurrenceConfig::reference(
            date(9999, 12, 30),
            Bound::Count(5),
            Interval::Days(1),
        )
        .unwrap();
        let err = reference_sequence(&config).unwrap_err();
        assert!(matches!(err, RecurrenceError::Range { .. }));
    }

    #[test]
    fn test_reference_until_stops_at_calendar_end() {
        let config = RecurrenceConfig::reference(
            date(9999, 12, 30),
            Bound::Until(date(9999, 12, 31)),
            Interval::Days(1),
        )
        .unwrap();
        assert_eq!(
            reference_sequence(&config).unwrap(),
            vec![date(9999, 12, 30), date(9999, 12, 31)]
        );
    }

    #[test]
    fn test_reference_weekday_past_calendar_end() {
        // 9999-12-31 is a Friday; the next Saturday does not exist.
        let interval = Interval::Weekday {
            weekday: Weekday::Saturday,
            ordinal: 1,
        };
        let until = RecurrenceConfig::reference(
            date(9999, 12, 31),
            Bound::Until(date(9999, 12, 31)),
            interval,
        )
        .unwrap();
        assert!(reference_sequence(&until).unwrap().is_empty());

        let count =
            RecurrenceConfig::reference(date(9999, 12, 31), Bound::Count(1), interval).unwrap();
        assert!(matches!(
            reference_sequence(&count),
            Err(RecurrenceError::Range { .. })
        ));
    }

    #[test]
    fn test_monthly_day_31_skips_february() {
        let config = monthly(date(2024, 1, 31), Bound::Count(3), day_target(31));
        assert_eq!(
            monthly_sequence(&config).unwrap(),
            vec![date(2024, 1, 31), date(2024, 3, 31)]
        );
    }

    #[test]
    fn test_monthly_day_31_clamp() {
        let config = monthly(date(2024, 1, 31), Bound::Count(3), day_target(31))
            .with_overflow(OverflowPolicy::Clamp);
        assert_eq!(
            monthly_sequence(&config).unwrap(),
            vec![date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 31)]
        );
    }

    #[test]
    fn test_monthly_last_friday() {
        let config = monthly(
            date(2024, 2, 1),
            Bound::Count(2),
            weekday_target(-1, Weekday::Friday),
        );
        assert_eq!(
            monthly_sequence(&config).unwrap(),
            vec![date(2024, 2, 23), date(2024, 3, 29)]
        );
    }

    #[test]
    fn test_monthly_alignment_rolls_forward() {
        let config = monthly(date(2024, 1, 20), Bound::Count(2), day_target(15));
        assert_eq!(
            monthly_sequence(&config).unwrap(),
            vec![date(2024, 2, 15), date(2024, 3, 15)]
        );
    }

    #[test]
    fn test_monthly_alignment_from_month_end() {
        // The 31st is the last day of January, so no roll is needed.
        let on_target = monthly(date(2024, 1, 31), Bound::Count(3), day_target(-1));
        assert_eq!(
            monthly_sequence(&on_target).unwrap(),
            vec![date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 31)]
        );

        let past_target = monthly(date(2024, 1, 31), Bound::Count(2), day_target(-2));
        assert_eq!(
            monthly_sequence(&past_target).unwrap(),
            vec![date(2024, 2, 28), date(2024, 3, 30)]
        );
    }

    #[test]
    fn test_monthly_from_end_underflow_skips() {
        let config = monthly(date(2024, 1, 1), Bound::Count(3), day_target(-31));
        assert_eq!(
            monthly_sequence(&config).unwrap(),
            vec![date(2024, 1, 1), date(2024, 3, 1)]
        );
    }

    #[test]
    fn test_monthly_fifth_friday_skips_april() {
        let config = monthly(
            date(2024, 3, 1),
            Bound::Count(3),
            weekday_target(5, Weekday::Friday),
        );
        assert_eq!(
            monthly_sequence(&config).unwrap(),
            vec![date(2024, 3, 29), date(2024, 5, 31)]
        );
    }

    #[test]
    fn test_monthly_fifth_friday_clamp() {
        let config = monthly(
            date(2024, 3, 1),
            Bound::Count(3),
            weekday_target(5, Weekday::Friday),
        )
        .with_overflow(OverflowPolicy::Clamp);
        assert_eq!(
            monthly_sequence(&config).unwrap(),
            vec![date(2024, 3, 29), date(2024, 4, 26), date(2024, 5, 31)]
        );
    }

    #[test]
    fn test_monthly_clamp_aligns_on_clamped_date() {
        // No fifth Friday in February 2024; the clamped last Friday (23rd)
        // is before the start, so the first result comes from March.
        let config = monthly(
            date(2024, 2, 27),
            Bound::Count(2),
            weekday_target(5, Weekday::Friday),
        )
        .with_overflow(OverflowPolicy::Clamp);
        assert_eq!(
            monthly_sequence(&config).unwrap(),
            vec![date(2024, 3, 29), date(2024, 4, 26)]
        );
    }

    #[test]
    fn test_monthly_months_per_step() {
        let config = monthly(date(2024, 1, 1), Bound::Count(3), day_target(1))
            .with_months_per_step(2)
            .unwrap();
        assert_eq!(
            monthly_sequence(&config).unwrap(),
            vec![date(2024, 1, 1), date(2024, 3, 1), date(2024, 5, 1)]
        );
    }

    #[test]
    fn test_monthly_until() {
        let config = monthly(date(2024, 1, 1), Bound::Until(date(2024, 4, 10)), day_target(15));
        assert_eq!(
            monthly_sequence(&config).unwrap(),
            vec![date(2024, 1, 15), date(2024, 2, 15), date(2024, 3, 15), date(2024, 4, 15)]
        );
    }

    #[test]
    fn test_monthly_until_bounds_working_month() {
        // The April working date is inside the bound, so its resolution is
        // emitted even though it lands after the end date.
        let config = monthly(date(2024, 1, 1), Bound::Until(date(2024, 4, 1)), day_target(-1));
        assert_eq!(
            monthly_sequence(&config).unwrap(),
            vec![date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 31), date(2024, 4, 30)]
        );

        let config = monthly(date(2024, 1, 1), Bound::Until(date(2024, 3, 31)), day_target(-1));
        assert_eq!(monthly_sequence(&config).unwrap().last(), Some(&date(2024, 3, 31)));
    }

    #[test]
    fn test_monthly_until_does_not_align() {
        let config = monthly(date(2024, 1, 20), Bound::Until(date(2024, 2, 20)), day_target(15));
        assert_eq!(
            monthly_sequence(&config).unwrap(),
            vec![date(2024, 1, 15), date(2024, 2, 15)]
        );
    }

    #[test]
    fn test_monthly_until_skips_overflow() {
        let config = monthly(date(2024, 1, 1), Bound::Until(date(2024, 4, 30)), day_target(31));
        assert_eq!(
            monthly_sequence(&config).unwrap(),
            vec![date(2024, 1, 31), date(2024, 3, 31)]
        );
    }

    #[test]
    fn test_generators_reject_wrong_rule() {
        let reference = RecurrenceConfig::reference(
            date(2024, 1, 1),
            Bound::Count(1),
            Interval::Days(1),
        )
        .unwrap();
        assert!(matches!(
            monthly_sequence(&reference),
            Err(RecurrenceError::Config { .. })
        ));
        let month = monthly(date(2024, 1, 1), Bound::Count(1), day_target(1));
        assert!(matches!(
            reference_sequence(&month),
            Err(RecurrenceError::Config { .. })
        ));
    }

    #[test]
    fn test_generate_dispatches() {
        let month = monthly(date(2024, 1, 1), Bound::Count(2), day_target(1));
        assert_eq!(generate(&month).unwrap(), vec![date(2024, 1, 1), date(2024, 2, 1)]);
    }

    #[test]
    fn test_sequences_are_repeatable() {
        let config = monthly(date(2024, 1, 31), Bound::Count(12), day_target(31));
        assert_eq!(
            monthly_sequence(&config).unwrap(),
            monthly_sequence(&config).unwrap()
        );
    }
}
