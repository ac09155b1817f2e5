//! Calendar month periods encoded as `YYYYMM`

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar month, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Create a period from a year and a month in `1..=12`
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ForecastError::SchemaError(format!(
                "Month {} out of range in period {}{:02}",
                month, year, month
            )));
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(ForecastError::SchemaError(format!(
                "Year {} is outside the supported calendar",
                year
            )));
        }
        Ok(Self { year, month })
    }

    /// Decode a `YYYYMM` integer such as `201912`
    pub fn from_yyyymm(code: i64) -> Result<Self> {
        if code < 0 {
            return Err(ForecastError::SchemaError(format!(
                "Negative period code {}",
                code
            )));
        }
        let year = i32::try_from(code / 100).map_err(|_| {
            ForecastError::SchemaError(format!("Period code {} is too large", code))
        })?;
        Self::new(year, (code % 100) as u32)
    }

    /// Encode as a `YYYYMM` integer
    pub fn yyyymm(&self) -> i64 {
        self.year as i64 * 100 + self.month as i64
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month
    pub fn first_day(&self) -> NaiveDate {
        // Validated on construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Period containing `date`
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Period `months` months later
    pub fn plus_months(&self, months: u32) -> Result<Self> {
        self.first_day()
            .checked_add_months(Months::new(months))
            .map(Self::from_date)
            .ok_or_else(|| {
                ForecastError::SchemaError(format!(
                    "Period {} plus {} months leaves the calendar",
                    self, months
                ))
            })
    }

    /// The following month
    pub fn succ(&self) -> Result<Self> {
        self.plus_months(1)
    }

    /// Signed number of months from `self` to `other`
    pub fn months_until(&self, other: &Period) -> i64 {
        (other.year as i64 - self.year as i64) * 12 + other.month as i64 - self.month as i64
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = ForecastError;

    /// Accepts `YYYYMM` and `YYYY-MM`
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits: String = trimmed.chars().filter(|c| *c != '-').collect();
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ForecastError::SchemaError(format!(
                "Cannot parse '{}' as a YYYYMM period",
                s
            )));
        }
        let code: i64 = digits.parse().map_err(|_| {
            ForecastError::SchemaError(format!("Cannot parse '{}' as a YYYYMM period", s))
        })?;
        Self::from_yyyymm(code)
    }
}

impl TryFrom<i64> for Period {
    type Error = ForecastError;

    fn try_from(code: i64) -> Result<Self> {
        Self::from_yyyymm(code)
    }
}

impl From<Period> for i64 {
    fn from(period: Period) -> i64 {
        period.yyyymm()
    }
}

/// The `horizon` months that follow `last`
pub fn future_periods(last: Period, horizon: usize) -> Result<Vec<Period>> {
    let mut periods = Vec::with_capacity(horizon);
    let mut current = last;

    for _ in 0..horizon {
        current = current.succ()?;
        periods.push(current);
    }

    Ok(periods)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(201912, 2019, 12)]
    #[case(202001, 2020, 1)]
    #[case(199506, 1995, 6)]
    fn test_decode_yyyymm(#[case] code: i64, #[case] year: i32, #[case] month: u32) {
        let period = Period::from_yyyymm(code).unwrap();
        assert_eq!(period.year(), year);
        assert_eq!(period.month(), month);
        assert_eq!(period.yyyymm(), code);
        assert_eq!(period.to_string(), code.to_string());
    }

    #[rstest]
    #[case(201913)]
    #[case(201900)]
    #[case(-201901)]
    fn test_invalid_codes_are_schema_errors(#[case] code: i64) {
        assert!(matches!(
            Period::from_yyyymm(code),
            Err(ForecastError::SchemaError(_))
        ));
    }

    #[test]
    fn test_first_day() {
        let period = Period::new(2020, 2).unwrap();
        assert_eq!(period.first_day(), NaiveDate::from_ymd_opt(2020, 2, 1).unwrap());
    }

    #[test]
    fn test_future_periods_cross_year_boundary() {
        let last = Period::from_yyyymm(201911).unwrap();
        let periods = future_periods(last, 3).unwrap();
        let codes: Vec<i64> = periods.iter().map(Period::yyyymm).collect();
        assert_eq!(codes, vec![201912, 202001, 202002]);
    }

    #[test]
    fn test_parse_with_and_without_dash() {
        assert_eq!("2020-02".parse::<Period>().unwrap().yyyymm(), 202002);
        assert_eq!("202002".parse::<Period>().unwrap().yyyymm(), 202002);
        assert!("2020-2".parse::<Period>().is_err());
    }

    #[test]
    fn test_months_until() {
        let a = Period::from_yyyymm(201911).unwrap();
        let b = Period::from_yyyymm(202002).unwrap();
        assert_eq!(a.months_until(&b), 3);
        assert_eq!(b.months_until(&a), -3);
    }
}
