//! getdates — ordered sequences of calendar dates from compact recurrence rules.
//!
//! Two families of recurrence are supported:
//!
//! - **Reference mode**: fixed-interval stepping from a start date (every N days
//!   or weeks, or every next/previous occurrence of a weekday).
//! - **Monthly mode**: the Kth day of the month or the Nth weekday of the month,
//!   repeated every M months.
//!
//! Every sequence is bounded either by a repetition count or by an inclusive
//! end date.
//!
//! # Examples
//!
//! ```
//! use getdates::{Bound, MonthlyTarget, RecurrenceConfig, Weekday};
//! use jiff::civil::date;
//!
//! let last_friday = MonthlyTarget::weekday_of_month(-1, Weekday::Friday).unwrap();
//! let config = RecurrenceConfig::monthly(date(2024, 2, 1), Bound::Count(2), last_friday).unwrap();
//! assert_eq!(
//!     config.generate().unwrap(),
//!     vec![date(2024, 2, 23), date(2024, 3, 29)],
//! );
//! ```

pub mod calendar;
pub mod config;
pub mod display;
pub mod error;
pub mod eval;

pub use config::{
    Bound, Interval, MonthlyRule, MonthlyTarget, Ordinal, OverflowPolicy, RecurrenceConfig, Rule,
    Weekday,
};
pub use display::OutputFormat;
pub use error::RecurrenceError;
pub use eval::{MonthlyDates, ReferenceDates};

use jiff::civil::Date;
#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

// --- RecurrenceConfig convenience methods ---

impl RecurrenceConfig {
    /// Generate every date of this recurrence.
    pub fn generate(&self) -> Result<Vec<Date>, RecurrenceError> {
        eval::generate(self)
    }

    /// Lazily iterate a reference recurrence.
    pub fn reference_dates(&self) -> Result<ReferenceDates, RecurrenceError> {
        ReferenceDates::new(self)
    }

    /// Lazily iterate a monthly recurrence.
    pub fn monthly_dates(&self) -> Result<MonthlyDates, RecurrenceError> {
        MonthlyDates::new(self)
    }

    /// Serialize this configuration as pretty-printed JSON.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(feature = "serde")]
impl Serialize for RecurrenceConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;

        map.serialize_entry("start", &self.start().to_string())?;
        // Both keys are always present for a consistent JSON shape
        map.serialize_entry("end", &self.end().map(|d| d.to_string()))?;
        map.serialize_entry("count", &self.count())?;
        map.serialize_entry("rule", self.rule())?;
        map.serialize_entry("description", &self.to_string())?;

        map.end()
    }
}
