//! Calendar range helper
//!
//! Activity times are stored as the naive local time the user typed. Ranges
//! are therefore built from the local calendar month but expressed directly as
//! UTC timestamps, so they compare against stored values without conversion.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Months shown before the current one in the month picker and "all" view
pub const MONTHS_BEFORE: u32 = 2;
/// Total months covered by the "all" view
pub const ALL_SPAN_MONTHS: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarSelection {
    CurrentMonth,
    Month { year: i32, month: u32 },
    All,
}

/// Inclusive interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CalendarRange {
    /// `2024-02` or `2024-01 - 2025-06`
    pub fn label(&self) -> String {
        let start = self.start.format("%Y-%m").to_string();
        let end = self.end.format("%Y-%m").to_string();
        if start == end {
            start
        } else {
            format!("{start} - {end}")
        }
    }

    fn spanning(start: DateTime<Utc>, months: u32) -> Option<Self> {
        let next = start.checked_add_months(Months::new(months))?;
        Some(Self {
            start,
            end: next - Duration::nanoseconds(1),
        })
    }
}

/// First instant of the local month containing `now`, as a UTC timestamp
pub fn current_month_start(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local = now.with_timezone(&tz);
    month_start(local.year(), local.month()).unwrap_or(now)
}

/// Midnight on the first of `year-month`, UTC
pub fn month_start(year: i32, month: u32) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year, month, 1)?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Resolve a selection to its interval; `None` for an impossible month
pub fn range(
    selection: CalendarSelection,
    now: DateTime<Utc>,
    tz: Tz,
) -> Option<CalendarRange> {
    match selection {
        CalendarSelection::CurrentMonth => {
            CalendarRange::spanning(current_month_start(now, tz), 1)
        }
        CalendarSelection::Month { year, month } => {
            CalendarRange::spanning(month_start(year, month)?, 1)
        }
        CalendarSelection::All => {
            let start = current_month_start(now, tz)
                .checked_sub_months(Months::new(MONTHS_BEFORE))?;
            CalendarRange::spanning(start, ALL_SPAN_MONTHS)
        }
    }
}

/// Months offered by the picker: two back through fifteen ahead
pub fn picker_months(now: DateTime<Utc>, tz: Tz) -> Vec<(i32, u32)> {
    let Some(first) =
        current_month_start(now, tz).checked_sub_months(Months::new(MONTHS_BEFORE))
    else {
        return Vec::new();
    };
    (0..ALL_SPAN_MONTHS)
        .filter_map(|i| first.checked_add_months(Months::new(i)))
        .map(|m| (m.year(), m.month()))
        .collect()
}
