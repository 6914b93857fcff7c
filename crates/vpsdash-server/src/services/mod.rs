pub mod backup_service;
pub mod exchange_service;
pub mod folder_service;
pub mod metrics_service;
pub mod payment_service;
pub mod probe_service;
pub mod server_service;
