//! sea-orm entity для таблиц VPS-дашборда.

pub mod exchange_rates;
pub mod folders;
pub mod payments;
pub mod server_metrics;
pub mod servers;
