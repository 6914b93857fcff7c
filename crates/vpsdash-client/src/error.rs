//! Ошибки клиента.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// Токен отсутствует, просрочен или отклонён. Токен уже удалён.
    #[error("Требуется вход в систему")]
    Unauthorized,

    /// Ошибка ввода, запрос не отправлялся.
    #[error("{0}")]
    Validation(String),

    /// Ответ сервера с кодом не 2xx; `detail` показывается как есть.
    #[error("{detail}")]
    Api { status: u16, detail: String },

    #[error("Не удалось загрузить данные: {0}")]
    Network(String),

    #[error("Сервер не ответил вовремя")]
    Timeout,

    #[error("Некорректный ответ сервера: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized => Some(401),
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}
