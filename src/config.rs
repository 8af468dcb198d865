#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use jiff::civil::Date;

use crate::error::RecurrenceError;

/// Largest day-of-month position a monthly rule may ask for.
pub const MAX_DAY_OF_MONTH: u8 = 31;

/// Largest weekday-of-month ordinal a monthly rule may ask for.
pub const MAX_WEEKDAY_ORDINAL: u8 = 5;

/// A validated recurrence: where it starts, how it is bounded and what repeats.
///
/// Built once through [`RecurrenceConfig::reference`] or
/// [`RecurrenceConfig::monthly`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceConfig {
    start: Date,
    bound: Bound,
    rule: Rule,
}

impl RecurrenceConfig {
    /// Create a recurrence from any rule, e.g. one read back from JSON.
    pub fn new(start: Date, bound: Bound, rule: Rule) -> Result<Self, RecurrenceError> {
        bound.validate()?;
        match rule {
            Rule::Reference(interval) => interval.validate()?,
            Rule::Monthly(monthly) => monthly.validate()?,
        }
        Ok(Self { start, bound, rule })
    }

    /// Create a fixed-interval recurrence anchored at `start`.
    pub fn reference(
        start: Date,
        bound: Bound,
        interval: Interval,
    ) -> Result<Self, RecurrenceError> {
        Self::new(start, bound, Rule::Reference(interval))
    }

    /// Create a monthly recurrence advancing one month per step.
    pub fn monthly(
        start: Date,
        bound: Bound,
        target: MonthlyTarget,
    ) -> Result<Self, RecurrenceError> {
        Self::new(start, bound, Rule::Monthly(MonthlyRule::new(target)))
    }

    /// Set how many months a monthly recurrence advances between results.
    pub fn with_months_per_step(mut self, months: u32) -> Result<Self, RecurrenceError> {
        match &mut self.rule {
            Rule::Monthly(rule) => {
                let stepped = MonthlyRule {
                    months_per_step: months,
                    ..*rule
                };
                stepped.validate()?;
                *rule = stepped;
            }
            Rule::Reference(_) => {
                return Err(RecurrenceError::config(
                    "months per step only applies to monthly recurrences",
                ))
            }
        }
        Ok(self)
    }

    /// Set what a monthly recurrence does when the requested position does not
    /// exist in a month. Has no effect on reference recurrences.
    pub fn with_overflow(mut self, policy: OverflowPolicy) -> Self {
        if let Rule::Monthly(rule) = &mut self.rule {
            rule.overflow = policy;
        }
        self
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn bound(&self) -> Bound {
        self.bound
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// The end date, if the recurrence is bounded by one.
    pub fn end(&self) -> Option<Date> {
        match self.bound {
            Bound::Until(end) => Some(end),
            Bound::Count(_) => None,
        }
    }

    /// The repetition count, if the recurrence is bounded by one.
    pub fn count(&self) -> Option<u32> {
        match self.bound {
            Bound::Count(n) => Some(n),
            Bound::Until(_) => None,
        }
    }
}

/// How a sequence terminates. Exactly one bound applies to a recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Run this many steps.
    Count(u32),
    /// Run until this date, inclusive.
    Until(Date),
}

impl Bound {
    fn validate(self) -> Result<(), RecurrenceError> {
        match self {
            Bound::Count(0) => Err(RecurrenceError::config("count must be at least 1")),
            _ => Ok(()),
        }
    }
}

/// What repeats: a fixed interval or a position within each month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Rule {
    Reference(Interval),
    Monthly(MonthlyRule),
}

/// Step of a reference-mode recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(rename_all = "snake_case", try_from = "repr::IntervalRepr")
)]
pub enum Interval {
    /// Signed step in days. Weeks are stored pre-multiplied by seven.
    Days(i32),
    /// Every next (`ordinal > 0`) or previous (`ordinal <= 0`) occurrence of a
    /// weekday. The first date is the `ordinal`-th occurrence relative to the
    /// start date, then the sequence steps one week at a time.
    Weekday { weekday: Weekday, ordinal: i32 },
}

impl Interval {
    /// A step of `weeks` weeks.
    pub fn weeks(weeks: i32) -> Result<Self, RecurrenceError> {
        weeks
            .checked_mul(7)
            .map(Interval::Days)
            .ok_or_else(|| RecurrenceError::config(format!("{weeks} weeks is too large a step")))
    }

    /// Signed number of days between consecutive dates.
    pub fn step_days(self) -> i64 {
        match self {
            Interval::Days(days) => i64::from(days),
            Interval::Weekday { ordinal, .. } if ordinal > 0 => 7,
            Interval::Weekday { .. } => -7,
        }
    }

    fn validate(self) -> Result<(), RecurrenceError> {
        match self {
            Interval::Days(0) => Err(RecurrenceError::config("step must not be zero days")),
            _ => Ok(()),
        }
    }
}

/// A monthly recurrence: which position in the month, and how often.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "repr::MonthlyRuleRepr"))]
pub struct MonthlyRule {
    pub target: MonthlyTarget,
    pub months_per_step: u32,
    pub overflow: OverflowPolicy,
}

impl MonthlyRule {
    pub fn new(target: MonthlyTarget) -> Self {
        Self {
            target,
            months_per_step: 1,
            overflow: OverflowPolicy::default(),
        }
    }

    fn validate(self) -> Result<(), RecurrenceError> {
        if self.months_per_step == 0 {
            return Err(RecurrenceError::config("months per step must be at least 1"));
        }
        self.target.validate()
    }
}

/// The position within a month a monthly recurrence lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(rename_all = "snake_case", try_from = "repr::MonthlyTargetRepr")
)]
pub enum MonthlyTarget {
    /// `the 15th`, `the last day`, `the 2nd-to-last day`.
    DayOfMonth(Ordinal),
    /// `the 2nd friday`, `the last monday`.
    WeekdayOfMonth { ordinal: Ordinal, weekday: Weekday },
}

impl MonthlyTarget {
    /// Day-of-month target from a signed day number (`-1` is the last day).
    pub fn day_of_month(day: i32) -> Result<Self, RecurrenceError> {
        let ordinal = Ordinal::from_signed(day)
            .ok_or_else(|| RecurrenceError::config("day of month must not be zero"))?;
        let target = MonthlyTarget::DayOfMonth(ordinal);
        target.validate()?;
        Ok(target)
    }

    /// Weekday-of-month target from a signed ordinal (`-1` is the last one).
    pub fn weekday_of_month(ordinal: i32, weekday: Weekday) -> Result<Self, RecurrenceError> {
        let ordinal = Ordinal::from_signed(ordinal)
            .ok_or_else(|| RecurrenceError::config("weekday ordinal must not be zero"))?;
        let target = MonthlyTarget::WeekdayOfMonth { ordinal, weekday };
        target.validate()?;
        Ok(target)
    }

    pub fn ordinal(self) -> Ordinal {
        match self {
            MonthlyTarget::DayOfMonth(ordinal) => ordinal,
            MonthlyTarget::WeekdayOfMonth { ordinal, .. } => ordinal,
        }
    }

    fn validate(self) -> Result<(), RecurrenceError> {
        let (position, max, what) = match self {
            MonthlyTarget::DayOfMonth(o) => (o.position(), MAX_DAY_OF_MONTH, "day of month"),
            MonthlyTarget::WeekdayOfMonth { ordinal, .. } => {
                (ordinal.position(), MAX_WEEKDAY_ORDINAL, "weekday ordinal")
            }
        };
        if position == 0 || position > max {
            return Err(RecurrenceError::config(format!(
                "{what} must be between 1 and {max} from either end of the month, got {}",
                self.ordinal().signed()
            )));
        }
        Ok(())
    }
}

/// A position counted from the start or from the end of a period.
///
/// Both variants are 1-based: `FromStart(1)` is the first, `FromEnd(1)` the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Ordinal {
    FromStart(u8),
    FromEnd(u8),
}

impl Ordinal {
    /// Convert a signed ordinal; zero has no position and yields `None`.
    pub fn from_signed(n: i32) -> Option<Self> {
        let position = u8::try_from(n.unsigned_abs()).unwrap_or(u8::MAX);
        match n {
            0 => None,
            n if n > 0 => Some(Ordinal::FromStart(position)),
            _ => Some(Ordinal::FromEnd(position)),
        }
    }

    /// Signed form: positive from the start, negative from the end.
    pub fn signed(self) -> i32 {
        match self {
            Ordinal::FromStart(k) => i32::from(k),
            Ordinal::FromEnd(k) => -i32::from(k),
        }
    }

    pub fn position(self) -> u8 {
        match self {
            Ordinal::FromStart(k) | Ordinal::FromEnd(k) => k,
        }
    }
}

/// What a monthly recurrence does with a month that lacks the requested position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OverflowPolicy {
    /// Emit nothing for that month. Count-bounded sequences come out shorter.
    #[default]
    Skip,
    /// Emit the nearest position that does exist in the month.
    Clamp,
}

impl OverflowPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Clamp => "clamp",
        }
    }
}

/// Day of the week, Sunday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sunday => "sunday",
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            Self::Sunday => "sun",
            Self::Monday => "mon",
            Self::Tuesday => "tue",
            Self::Wednesday => "wed",
            Self::Thursday => "thu",
            Self::Friday => "fri",
            Self::Saturday => "sat",
        }
    }

    pub fn to_jiff(self) -> jiff::civil::Weekday {
        match self {
            Self::Sunday => jiff::civil::Weekday::Sunday,
            Self::Monday => jiff::civil::Weekday::Monday,
            Self::Tuesday => jiff::civil::Weekday::Tuesday,
            Self::Wednesday => jiff::civil::Weekday::Wednesday,
            Self::Thursday => jiff::civil::Weekday::Thursday,
            Self::Friday => jiff::civil::Weekday::Friday,
            Self::Saturday => jiff::civil::Weekday::Saturday,
        }
    }

    pub fn from_jiff(wd: jiff::civil::Weekday) -> Self {
        match wd {
            jiff::civil::Weekday::Sunday => Self::Sunday,
            jiff::civil::Weekday::Monday => Self::Monday,
            jiff::civil::Weekday::Tuesday => Self::Tuesday,
            jiff::civil::Weekday::Wednesday => Self::Wednesday,
            jiff::civil::Weekday::Thursday => Self::Thursday,
            jiff::civil::Weekday::Friday => Self::Friday,
            jiff::civil::Weekday::Saturday => Self::Saturday,
        }
    }

    /// Day number with Sunday=0 and Saturday=6.
    pub fn number(self) -> u8 {
        match self {
            Self::Sunday => 0,
            Self::Monday => 1,
            Self::Tuesday => 2,
            Self::Wednesday => 3,
            Self::Thursday => 4,
            Self::Friday => 5,
            Self::Saturday => 6,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            0 => Some(Self::Sunday),
            1 => Some(Self::Monday),
            2 => Some(Self::Tuesday),
            3 => Some(Self::Wednesday),
            4 => Some(Self::Thursday),
            5 => Some(Self::Friday),
            6 => Some(Self::Saturday),
            _ => None,
        }
    }

    pub fn all() -> [Self; 7] {
        [
            Self::Sunday,
            Self::Monday,
            Self::Tuesday,
            Self::Wednesday,
            Self::Thursday,
            Self::Friday,
            Self::Saturday,
        ]
    }
}

impl std::str::FromStr for Weekday {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_weekday(s).ok_or_else(|| {
            RecurrenceError::parse(
                "unknown weekday, expected one of sun, mon, tue, wed, thu, fri, sat",
                s,
            )
        })
    }
}

#[cfg(feature = "serde")]
impl Serialize for Weekday {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Weekday {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_weekday(&s).ok_or_else(|| serde::de::Error::custom(format!("unknown weekday: {s}")))
    }
}

pub fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.trim().to_lowercase().as_str() {
        "sunday" | "sun" => Some(Weekday::Sunday),
        "monday" | "mon" => Some(Weekday::Monday),
        "tuesday" | "tue" => Some(Weekday::Tuesday),
        "wednesday" | "wed" => Some(Weekday::Wednesday),
        "thursday" | "thu" => Some(Weekday::Thursday),
        "friday" | "fri" => Some(Weekday::Friday),
        "saturday" | "sat" => Some(Weekday::Saturday),
        _ => None,
    }
}

/// Unchecked wire shapes. Deserialized values pass through the same
/// validation as the constructors.
#[cfg(feature = "serde")]
mod repr {
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub(super) enum IntervalRepr {
        Days(i32),
        Weekday { weekday: Weekday, ordinal: i32 },
    }

    impl TryFrom<IntervalRepr> for Interval {
        type Error = RecurrenceError;

        fn try_from(repr: IntervalRepr) -> Result<Self, Self::Error> {
            let interval = match repr {
                IntervalRepr::Days(days) => Interval::Days(days),
                IntervalRepr::Weekday { weekday, ordinal } => {
                    Interval::Weekday { weekday, ordinal }
                }
            };
            interval.validate()?;
            Ok(interval)
        }
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub(super) enum MonthlyTargetRepr {
        DayOfMonth(Ordinal),
        WeekdayOfMonth { ordinal: Ordinal, weekday: Weekday },
    }

    impl TryFrom<MonthlyTargetRepr> for MonthlyTarget {
        type Error = RecurrenceError;

        fn try_from(repr: MonthlyTargetRepr) -> Result<Self, Self::Error> {
            let target = match repr {
                MonthlyTargetRepr::DayOfMonth(ordinal) => MonthlyTarget::DayOfMonth(ordinal),
                MonthlyTargetRepr::WeekdayOfMonth { ordinal, weekday } => {
                    MonthlyTarget::WeekdayOfMonth { ordinal, weekday }
                }
            };
            target.validate()?;
            Ok(target)
        }
    }

    fn one() -> u32 {
        1
    }

    #[derive(Deserialize)]
    pub(super) struct MonthlyRuleRepr {
        target: MonthlyTarget,
        #[serde(default = "one")]
        months_per_step: u32,
        #[serde(default)]
        overflow: OverflowPolicy,
    }

    impl TryFrom<MonthlyRuleRepr> for MonthlyRule {
        type Error = RecurrenceError;

        fn try_from(repr: MonthlyRuleRepr) -> Result<Self, Self::Error> {
            let rule = MonthlyRule {
                target: repr.target,
                months_per_step: repr.months_per_step,
                overflow: repr.overflow,
            };
            rule.validate()?;
            Ok(rule)
        }
    }
}

/// Parse a `YYYY-MM-DD` civil date.
pub fn parse_date(s: &str) -> Result<Date, RecurrenceError> {
    s.trim()
        .parse::<Date>()
        .map_err(|e| RecurrenceError::parse(format!("invalid date, expected YYYY-MM-DD: {e}"), s))
}
