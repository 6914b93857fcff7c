//! Аутентификация: JWT администратора и токен агента метрик.

use crate::api::AppState;
use crate::config::hash_password;
use crate::error::AppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use vpsdash_entities::servers;

/// Единственный пользователь дашборда.
pub const ADMIN_SUBJECT: &str = "admin";

/// Заголовок, в котором агент передаёт свой токен.
pub const AGENT_TOKEN_HEADER: &str = "X-Agent-Token";

/// Claims токена доступа.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

/// Экстрактор аутентифицированного администратора.
pub struct AdminUser(pub AccessClaims);

/// Экстрактор сервера, от имени которого пишет агент.
pub struct AgentServer(pub servers::Model);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)?;
        let claims = decode_token(token, &state.jwt_secret)?;
        if claims.sub != ADMIN_SUBJECT {
            return Err(AppError::Unauthorized("Недействительный или просроченный токен".into()));
        }
        Ok(AdminUser(claims))
    }
}

impl FromRequestParts<AppState> for AgentServer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AGENT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Отсутствует токен агента".into()))?;

        let rejected = || AppError::Unauthorized("Неверный токен агента".into());
        let server = servers::Entity::find()
            .filter(servers::Column::AgentTokenHash.eq(hash_password(token)))
            .one(&state.db)
            .await?
            .ok_or_else(rejected)?;

        let stored = server.agent_token.as_deref().unwrap_or_default();
        if !bool::from(stored.as_bytes().ct_eq(token.as_bytes())) {
            return Err(rejected());
        }

        Ok(AgentServer(server))
    }
}

/// Создать токен доступа администратора.
pub fn create_access_token(jwt_secret: &str, ttl_minutes: i64) -> Result<String, AppError> {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = AccessClaims {
        sub: ADMIN_SUBJECT.to_string(),
        exp: now + (ttl_minutes.max(1) as usize) * 60,
        iat: now,
    };
    let key = jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_bytes());
    jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &key)
        .map_err(|e| AppError::Internal(format!("Ошибка создания токена: {e}")))
}

fn extract_bearer_token(parts: &Parts) -> Result<&str, AppError> {
    parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Отсутствует заголовок Authorization".into()))?
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Ожидается Bearer токен".into()))
}

fn decode_token(token: &str, jwt_secret: &str) -> Result<AccessClaims, AppError> {
    let key = jsonwebtoken::DecodingKey::from_secret(jwt_secret.as_bytes());
    jsonwebtoken::decode::<AccessClaims>(token, &key, &jsonwebtoken::Validation::default())
        .map(|d| d.claims)
        .map_err(|e| {
            tracing::debug!("Отклонён токен доступа: {e}");
            AppError::Unauthorized("Недействительный или просроченный токен".into())
        })
}
