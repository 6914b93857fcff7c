//! Сверка оплат: признак «оплачено в этом месяце», расчёт платежа в рублях,
//! сводка за месяц.

use crate::models::PaymentSummary;
use crate::month::Month;
use std::collections::BTreeMap;
use thiserror::Error;

/// Базовая валюта, в которую пересчитываются все суммы.
pub const BASE_CURRENCY: &str = "RUB";

/// Курсы: код валюты → стоимость единицы в рублях.
pub type RateTable = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BillingError {
    #[error("У сервера не задана цена: оплата не требуется")]
    FreeServer,

    #[error("Нет курса для валюты {0}")]
    MissingRate(String),

    #[error("Некорректный курс для валюты {currency}: {rate}")]
    InvalidRate { currency: String, rate: f64 },
}

/// Сервер с точки зрения учёта оплат.
pub trait BillableServer {
    fn price(&self) -> f64;
    fn currency(&self) -> &str;
    /// День месяца ("1".."31") или "-".
    fn payment_date(&self) -> &str;
    fn last_paid_month(&self) -> Option<&str>;
}

/// Запись журнала оплат.
pub trait LedgerEntry {
    fn amount(&self) -> f64;
    fn currency(&self) -> &str;
    fn amount_rub(&self) -> f64;
    fn payment_month(&self) -> &str;
}

/// Нормализовать код валюты ("usd " → "USD").
pub fn normalize_currency(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Оплачен ли сервер за месяц: истина тогда и только тогда, когда
/// `last_paid_month` совпадает с `month`.
pub fn is_paid_for_month<S: BillableServer + ?Sized>(server: &S, month: Month) -> bool {
    server
        .last_paid_month()
        .and_then(|m| m.parse::<Month>().ok())
        .is_some_and(|m| m == month)
}

/// Бесплатные серверы (цена 0) в оплатах не участвуют.
pub fn is_payable<S: BillableServer + ?Sized>(server: &S) -> bool {
    server.price() > 0.0
}

/// Серверы, которые можно отметить оплаченными за месяц.
pub fn payable_servers<S: BillableServer>(servers: &[S], month: Month) -> Vec<&S> {
    servers
        .iter()
        .filter(|s| is_payable(*s) && !is_paid_for_month(*s, month))
        .collect()
}

/// Рассчитанный, но ещё не сохранённый платёж.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentQuote {
    pub amount: f64,
    pub currency: String,
    pub exchange_rate: f64,
    pub amount_rub: f64,
    pub payment_month: Month,
}

/// Рассчитать платёж по текущей цене сервера и курсу.
///
/// Для рублёвого сервера курс равен 1 и таблица курсов не нужна. Для прочих
/// валют отсутствие курса является ошибкой.
pub fn quote_payment<S: BillableServer + ?Sized>(
    server: &S,
    rates: &RateTable,
    month: Month,
) -> Result<PaymentQuote, BillingError> {
    if !is_payable(server) {
        return Err(BillingError::FreeServer);
    }

    let currency = normalize_currency(server.currency());
    let amount = server.price();

    let exchange_rate = if currency == BASE_CURRENCY {
        1.0
    } else {
        let rate = *rates
            .get(&currency)
            .ok_or_else(|| BillingError::MissingRate(currency.clone()))?;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(BillingError::InvalidRate {
                currency: currency.clone(),
                rate,
            });
        }
        rate
    };

    let amount_rub = if currency == BASE_CURRENCY {
        amount
    } else {
        round2(amount * exchange_rate)
    };

    Ok(PaymentQuote {
        amount,
        currency,
        exchange_rate,
        amount_rub,
        payment_month: month,
    })
}

/// Сводка оплат за месяц.
pub fn summarize<P: LedgerEntry>(payments: &[P], month: Month) -> PaymentSummary {
    let mut total_rub = 0.0;
    let mut by_currency: BTreeMap<String, f64> = BTreeMap::new();
    let mut by_currency_rub: BTreeMap<String, f64> = BTreeMap::new();
    let mut payments_count = 0;

    for payment in payments
        .iter()
        .filter(|p| p.payment_month().parse::<Month>().ok() == Some(month))
    {
        payments_count += 1;
        total_rub += payment.amount_rub();
        let currency = normalize_currency(payment.currency());
        *by_currency.entry(currency.clone()).or_default() += payment.amount();
        *by_currency_rub.entry(currency).or_default() += payment.amount_rub();
    }

    PaymentSummary {
        total_rub: round2(total_rub),
        by_currency: by_currency.into_iter().map(|(k, v)| (k, round2(v))).collect(),
        by_currency_rub: by_currency_rub
            .into_iter()
            .map(|(k, v)| (k, round2(v)))
            .collect(),
        payments_count,
        month: month.to_string(),
    }
}

/// Округление денежных сумм до копеек.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
