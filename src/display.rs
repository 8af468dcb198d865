use std::fmt;

use jiff::civil::Date;
use jiff::tz::TimeZone;

use crate::config::*;
use crate::error::RecurrenceError;

impl fmt::Display for RecurrenceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}, {}", self.rule(), self.start(), self.bound())
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Reference(interval) => write!(f, "{interval}"),
            Rule::Monthly(rule) => write!(f, "{rule}"),
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Count(1) => write!(f, "once"),
            Bound::Count(n) => write!(f, "{n} times"),
            Bound::Until(end) => write!(f, "until {end}"),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Interval::Days(days) => {
                let n = days.unsigned_abs();
                if n % 7 == 0 {
                    write!(f, "every {}", plural(n / 7, "week"))?;
                } else {
                    write!(f, "every {}", plural(n, "day"))?;
                }
                if days < 0 {
                    write!(f, " backward")?;
                }
                Ok(())
            }
            Interval::Weekday { weekday, ordinal } => {
                let direction = if ordinal > 0 { "next" } else { "previous" };
                write!(f, "every {direction} {weekday}")?;
                let k = ordinal.unsigned_abs();
                if k > 1 {
                    write!(f, " from the {k}{}", ordinal_suffix(k))?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for MonthlyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of every ", self.target)?;
        if self.months_per_step == 1 {
            write!(f, "month")?;
        } else {
            write!(f, "{} months", self.months_per_step)?;
        }
        if self.overflow == OverflowPolicy::Clamp {
            write!(f, " (clamped)")?;
        }
        Ok(())
    }
}

impl fmt::Display for MonthlyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthlyTarget::DayOfMonth(ordinal) => write!(f, "the {ordinal} day"),
            MonthlyTarget::WeekdayOfMonth { ordinal, weekday } => {
                write!(f, "the {ordinal} {weekday}")
            }
        }
    }
}

impl fmt::Display for Ordinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Ordinal::FromStart(k) => write!(f, "{k}{}", ordinal_suffix(u32::from(k))),
            Ordinal::FromEnd(1) => write!(f, "last"),
            Ordinal::FromEnd(k) => write!(f, "{k}{}-to-last", ordinal_suffix(u32::from(k))),
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn ordinal_suffix(n: u32) -> &'static str {
    match n % 100 {
        11..=13 => "th",
        _ => match n % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    }
}

fn plural(n: u32, unit: &str) -> String {
    if n == 1 {
        unit.to_string()
    } else {
        format!("{n} {unit}s")
    }
}

/// How a generated date is rendered for output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Seconds since the Unix epoch at midnight in the given time zone.
    #[default]
    Unix,
    /// `2024-02-23 Fri`
    Human,
    /// `2024-02-23`
    Iso,
}

impl OutputFormat {
    /// Render `date`. Only [`OutputFormat::Unix`] depends on `tz`.
    pub fn format(self, date: Date, tz: &TimeZone) -> Result<String, RecurrenceError> {
        match self {
            OutputFormat::Unix => {
                let zoned = date.to_zoned(tz.clone()).map_err(|e| {
                    RecurrenceError::range(format!("cannot place {date} in time zone: {e}"))
                })?;
                Ok(zoned.timestamp().as_second().to_string())
            }
            OutputFormat::Human => Ok(date.strftime("%Y-%m-%d %a").to_string()),
            OutputFormat::Iso => Ok(date.to_string()),
        }
    }
}
