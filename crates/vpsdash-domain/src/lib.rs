//! Доменная логика VPS-дашборда: учёт оплат, сводки, метрики, порядок папок.
//!
//! Крейт не выполняет ввода-вывода: сервер и клиент используют одни и те же
//! правила сверки оплат и одну и ту же схему JSON.

pub mod billing;
pub mod metrics;
pub mod models;
pub mod month;
pub mod ordering;
pub mod validation;

pub use billing::{BillableServer, BillingError, LedgerEntry, RateTable, BASE_CURRENCY};
pub use month::Month;
pub use ordering::SortBy;
