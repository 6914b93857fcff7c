//! Календарный месяц в формате "YYYY-MM".

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Некорректный месяц: {0:?} (ожидается YYYY-MM)")]
pub struct MonthParseError(pub String);

/// Месяц оплаты. Сериализуется строкой "2026-01".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self, MonthParseError> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(MonthParseError(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    /// Текущий месяц по UTC.
    pub fn current() -> Self {
        Self::from_date(Utc::now().date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Количество дней в месяце.
    pub fn days(&self) -> u32 {
        let first = self.first_day();
        let next = self.next().first_day();
        next.signed_duration_since(first).num_days() as u32
    }

    pub fn first_day(&self) -> NaiveDate {
        // год и месяц проверены в конструкторе
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || MonthParseError(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(bad)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(bad());
        }
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let year: i32 = year.parse().map_err(|_| bad())?;
        let month: u32 = month.parse().map_err(|_| bad())?;
        Month::new(year, month).map_err(|_| bad())
    }
}

impl TryFrom<String> for Month {
    type Error = MonthParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(m: Month) -> Self {
        m.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let m: Month = "2026-01".parse().unwrap();
        assert_eq!(m.year(), 2026);
        assert_eq!(m.month(), 1);
        assert_eq!(m.to_string(), "2026-01");
    }

    #[test]
    fn test_rejects_malformed() {
        for s in ["2026-1", "2026-13", "26-01", "2026/01", "2026-01-05", "", "abcd-ef"] {
            assert!(s.parse::<Month>().is_err(), "{s} должен отклоняться");
        }
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(Month::new(2024, 2).unwrap().days(), 29);
        assert_eq!(Month::new(2026, 2).unwrap().days(), 28);
        assert_eq!(Month::new(2026, 12).unwrap().days(), 31);
        assert_eq!(Month::new(2026, 4).unwrap().days(), 30);
    }

    #[test]
    fn test_current_matches_iso_prefix() {
        let iso = Utc::now().date_naive().to_string();
        assert_eq!(Month::current().to_string(), iso[..7]);
    }

    #[test]
    fn test_serde_as_string() {
        let m = Month::new(2026, 3).unwrap();
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"2026-03\"");
        let back: Month = serde_json::from_str("\"2026-03\"").unwrap();
        assert_eq!(back, m);
        assert!(serde_json::from_str::<Month>("\"2026-3\"").is_err());
    }
}
