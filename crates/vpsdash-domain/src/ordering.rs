//! Порядок отображения: по позиции или по срочности оплаты.

use crate::billing::{is_paid_for_month, is_payable, BillableServer};
use crate::models::NO_PAYMENT_DATE;
use crate::month::Month;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Режим сортировки списка папок.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Position,
    PaymentUrgency,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Position => "position",
            SortBy::PaymentUrgency => "payment_urgency",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "position" => Ok(SortBy::Position),
            "payment_urgency" => Ok(SortBy::PaymentUrgency),
            other => Err(format!(
                "Неизвестный режим сортировки: {other}. Допустимые: position, payment_urgency"
            )),
        }
    }
}

/// Срочность оплаты. `Due(0)` означает срок сегодня; всё, что не ждёт оплаты,
/// сортируется после любых `Due`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    Due(u32),
    NotDue,
}

/// День оплаты из строки `payment_date`: "-" означает «не задан».
pub fn due_day(payment_date: &str) -> Option<u32> {
    let trimmed = payment_date.trim();
    if trimmed.is_empty() || trimmed == NO_PAYMENT_DATE {
        return None;
    }
    trimmed
        .parse::<u32>()
        .ok()
        .filter(|d| (1..=31).contains(d))
}

/// Дней до ближайшей даты оплаты. День, которого нет в коротком месяце,
/// переносится на последний день этого месяца.
pub fn days_until_due(day: u32, today: NaiveDate) -> u32 {
    let this_month = Month::from_date(today);
    let due_this_month = day.min(this_month.days());
    if due_this_month >= today.day() {
        return due_this_month - today.day();
    }

    let next = this_month.next();
    let due_next = day.min(next.days());
    let remaining_this_month = this_month.days() - today.day();
    remaining_this_month + due_next
}

/// Срочность оплаты сервера на дату `today`.
pub fn urgency<S: BillableServer + ?Sized>(server: &S, today: NaiveDate) -> Urgency {
    if !is_payable(server) || is_paid_for_month(server, Month::from_date(today)) {
        return Urgency::NotDue;
    }
    match due_day(server.payment_date()) {
        Some(day) => Urgency::Due(days_until_due(day, today)),
        None => Urgency::NotDue,
    }
}

/// Срочность папки равна срочности её самого срочного сервера.
pub fn folder_urgency<S: BillableServer>(servers: &[S], today: NaiveDate) -> Urgency {
    servers
        .iter()
        .map(|s| urgency(s, today))
        .min()
        .unwrap_or(Urgency::NotDue)
}

/// Устойчивая сортировка серверов по срочности.
pub fn sort_by_urgency<S: BillableServer>(servers: &mut [S], today: NaiveDate) {
    servers.sort_by_key(|s| urgency(s, today));
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Srv {
        name: &'static str,
        price: f64,
        date: &'static str,
        paid: Option<String>,
    }

    impl BillableServer for Srv {
        fn price(&self) -> f64 {
            self.price
        }
        fn currency(&self) -> &str {
            "USD"
        }
        fn payment_date(&self) -> &str {
            self.date
        }
        fn last_paid_month(&self) -> Option<&str> {
            self.paid.as_deref()
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_due_day_parsing() {
        assert_eq!(due_day("-"), None);
        assert_eq!(due_day(""), None);
        assert_eq!(due_day("15"), Some(15));
        assert_eq!(due_day("0"), None);
        assert_eq!(due_day("32"), None);
        assert_eq!(due_day("abc"), None);
    }

    #[test]
    fn test_days_until_due() {
        assert_eq!(days_until_due(15, day(2026, 1, 15)), 0);
        assert_eq!(days_until_due(20, day(2026, 1, 15)), 5);
        // 10-е уже прошло: до 10 февраля 16 + 10 дней
        assert_eq!(days_until_due(10, day(2026, 1, 15)), 26);
        // 31-е в феврале переносится на 28-е
        assert_eq!(days_until_due(31, day(2026, 2, 20)), 8);
        // 30-е после 31 января: 0 дней до конца + 28 февраля
        assert_eq!(days_until_due(30, day(2026, 1, 31)), 28);
    }

    #[test]
    fn test_sort_by_urgency() {
        let today = day(2026, 1, 15);
        let mut servers = vec![
            Srv { name: "free", price: 0.0, date: "16", paid: None },
            Srv { name: "later", price: 5.0, date: "10", paid: None },
            Srv { name: "no-date", price: 5.0, date: "-", paid: None },
            Srv { name: "soon", price: 5.0, date: "17", paid: None },
            Srv { name: "paid", price: 5.0, date: "15", paid: Some("2026-01".into()) },
            Srv { name: "today", price: 5.0, date: "15", paid: Some("2025-12".into()) },
        ];
        sort_by_urgency(&mut servers, today);
        let names: Vec<_> = servers.iter().map(|s| s.name).collect();
        assert_eq!(names, ["today", "soon", "later", "free", "no-date", "paid"]);
        assert_eq!(folder_urgency(&servers, today), Urgency::Due(0));
    }

    #[test]
    fn test_sort_mode_parsing() {
        assert_eq!("payment_urgency".parse::<SortBy>().unwrap(), SortBy::PaymentUrgency);
        assert_eq!(SortBy::default(), SortBy::Position);
        assert!("name".parse::<SortBy>().is_err());
    }
}
