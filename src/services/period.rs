use chrono::{Datelike, Duration, NaiveDate};

use crate::error::{AppError, AppResult};

/// Lookup dates for one report request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPeriod {
    pub curr_date: NaiveDate,
    pub prev_month_date: NaiveDate,
    pub prev_year_date: NaiveDate,
    pub day_of_month: u32,
    pub days_in_month: u32,
}

impl ReportPeriod {
    /// Month-end selections compare against the last day of the prior
    /// month/year; any other day keeps its day-of-month, clamped to the
    /// length of the target month.
    pub fn resolve(selected: NaiveDate) -> Self {
        let days_in_month = days_in_month(selected.year(), selected.month());
        let month_end = selected.day() == days_in_month;

        let (prev_month_year, prev_month) = if selected.month() == 1 {
            (selected.year() - 1, 12)
        } else {
            (selected.year(), selected.month() - 1)
        };

        Self {
            curr_date: selected,
            prev_month_date: anchored(prev_month_year, prev_month, selected.day(), month_end),
            prev_year_date: anchored(selected.year() - 1, selected.month(), selected.day(), month_end),
            day_of_month: selected.day(),
            days_in_month,
        }
    }

    /// `YYYYMM` key of the target table.
    pub fn period_key(&self) -> String {
        format!("{:04}{:02}", self.curr_date.year(), self.curr_date.month())
    }

    pub fn elapsed_fraction(&self) -> f64 {
        f64::from(self.day_of_month) / f64::from(self.days_in_month)
    }

    pub fn is_month_end(&self) -> bool {
        self.day_of_month == self.days_in_month
    }
}

fn anchored(year: i32, month: u32, day: u32, month_end: bool) -> NaiveDate {
    let last = last_day_of_month(year, month);
    if month_end {
        return last;
    }
    last.with_day(day.min(last.day())).unwrap_or(last)
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(NaiveDate::MIN)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    last_day_of_month(year, month).day()
}

/// Reporting lags behind the calendar, so the default date trails today.
pub fn default_report_date(today: NaiveDate, latency_days: i64) -> NaiveDate {
    today - Duration::days(latency_days.max(0))
}

pub fn resolve_report_date(raw: Option<&str>, today: NaiveDate, latency_days: i64) -> AppResult<NaiveDate> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => parse_date(value),
        None => Ok(default_report_date(today, latency_days)),
    }
}

fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("Invalid ISO date.".to_string()))
}
