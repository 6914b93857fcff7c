//! Клиент API VPS-дашборда и состояние интерфейса поверх него.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod poller;
pub mod resource;
pub mod token_store;
pub mod view;

#[cfg(test)]
mod tests;

pub use api::{ApiClient, PaymentQuery, ServerDraft};
pub use config::ClientConfig;
pub use dashboard::{load_payment_panel, Dashboard, DashboardState, PaymentPanel};
pub use error::ClientError;
pub use poller::{spawn_poller, Coalescer, PollHandle};
pub use resource::Resource;
pub use token_store::{JsonFileStore, KeyValueStore, MemoryStore, TokenStore};
