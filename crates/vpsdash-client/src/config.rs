//! Настройки клиента.

use crate::error::ClientError;
use std::time::Duration;
use url::Url;

/// Таймаут запроса по умолчанию.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Корень API, например `http://127.0.0.1:8000/api/`
    pub base_url: Url,

    /// Таймаут каждого запроса
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Validation(format!("Некорректный адрес API: {e}")))?;
        // Без завершающего слэша join() заменит последний сегмент пути
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Полный адрес эндпоинта относительно корня API.
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::Validation(format!("Некорректный путь {path}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = ClientConfig::new("http://localhost:8000/api").unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8000/api/");
        assert_eq!(
            config.endpoint("/folders/3").unwrap().as_str(),
            "http://localhost:8000/api/folders/3"
        );
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ClientConfig::new("not a url"),
            Err(ClientError::Validation(_))
        ));
    }
}
