//! HTTP-клиент API дашборда.
//!
//! Каждый запрос несёт Bearer-токен (если он есть) и таймаут. Ответ 401
//! удаляет токен: последующие запросы уходят без заголовка авторизации до
//! следующего входа.

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::token_store::TokenStore;
use crate::view::{
    AgentTokenView, CurrentMetricsView, ExchangeRatesView, FolderView, MetricsView,
    PaymentSummaryView, PaymentView, ServerView,
};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use vpsdash_domain::models::{
    AgentTokenResponse, BackupData, CreateFolderRequest, CreateServerRequest, CurrentMetrics,
    ErrorBody, ExchangeRatesResponse, FolderResponse, ImportResult, LoginRequest,
    MetricsHistoryResponse, PaymentResponse, PaymentSummary, ServerResponse, TokenResponse,
    UpdateFolderRequest, UpdateServerRequest, DEFAULT_CURRENCY, DEFAULT_FOLDER_COLOR,
    NO_PAYMENT_DATE,
};
use vpsdash_domain::validation;
use vpsdash_domain::{Month, SortBy};

/// Фильтр журнала оплат.
#[derive(Debug, Clone, Default)]
pub struct PaymentQuery {
    pub month: Option<Month>,
    pub server_id: Option<String>,
    pub limit: Option<u64>,
}

/// Данные формы нового сервера. Папка обязательна.
#[derive(Debug, Clone, Default)]
pub struct ServerDraft {
    pub folder_id: Option<String>,
    pub name: String,
    pub ip: String,
    pub provider: String,
    pub price: f64,
    pub currency: Option<String>,
    pub payment_date: Option<String>,
}

impl ServerDraft {
    /// Проверить форму до отправки.
    pub fn into_request(self) -> Result<CreateServerRequest, ClientError> {
        let folder_id = match self.folder_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => parse_id(id)?,
            _ => return Err(ClientError::Validation("Выберите папку".into())),
        };
        let request = CreateServerRequest {
            folder_id,
            name: self.name,
            ip: self.ip,
            provider: self.provider,
            price: self.price,
            currency: self.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            payment_date: self
                .payment_date
                .unwrap_or_else(|| NO_PAYMENT_DATE.to_string()),
        };
        validation::validate_create_server(&request)
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        Ok(request)
    }
}

/// Строковый id представления → числовой id API.
pub fn parse_id(id: &str) -> Result<i32, ClientError> {
    id.trim()
        .parse()
        .map_err(|_| ClientError::Validation(format!("Некорректный идентификатор: {id}")))
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    tokens: TokenStore,
}

impl ApiClient {
    pub fn new(config: ClientConfig, tokens: TokenStore) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_set()
    }

    // ── Транспорт ────────────────────────────────────────────────────────────

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, ClientError> {
        let mut url = self.config.endpoint(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        let mut request = self.http.request(method.clone(), url);
        if let Some(token) = self.tokens.get() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::debug!("{method} {path}: {e}");
            ClientError::from(e)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::info!("{method} {path}: 401, токен удалён");
            self.tokens.clear();
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.detail)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("Ошибка сервера")
                        .to_string()
                });
            tracing::debug!("{method} {path}: {status} {detail}");
            return Err(ClientError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(response)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<T, ClientError> {
        let bytes = self.send(method, path, query, body).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn request_empty(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(), ClientError> {
        self.send(method, path, &[], body).await?;
        Ok(())
    }

    fn body(value: &impl Serialize) -> Result<Option<serde_json::Value>, ClientError> {
        Ok(Some(serde_json::to_value(value)?))
    }

    // ── Авторизация ──────────────────────────────────────────────────────────

    /// Войти и сохранить токен.
    pub async fn login(&self, password: &str) -> Result<(), ClientError> {
        if password.is_empty() {
            return Err(ClientError::Validation("Введите пароль".into()));
        }
        let body = Self::body(&LoginRequest {
            password: password.to_string(),
        })?;
        let token: TokenResponse = self
            .request(Method::POST, "auth/login", &[], body)
            .await?;
        self.tokens.set(&token.access_token);
        Ok(())
    }

    pub fn logout(&self) {
        self.tokens.clear();
    }

    /// Действителен ли сохранённый токен.
    pub async fn check_auth(&self) -> Result<bool, ClientError> {
        if !self.tokens.is_set() {
            return Ok(false);
        }
        match self
            .request::<serde_json::Value>(Method::GET, "auth/check", &[], None)
            .await
        {
            Ok(_) => Ok(true),
            Err(ClientError::Unauthorized) => Ok(false),
            Err(e) => Err(e),
        }
    }

    // ── Папки ────────────────────────────────────────────────────────────────

    pub async fn list_folders(&self, sort_by: SortBy) -> Result<Vec<FolderView>, ClientError> {
        let folders: Vec<FolderResponse> = self
            .request(
                Method::GET,
                "folders",
                &[("sort_by", sort_by.as_str().to_string())],
                None,
            )
            .await?;
        Ok(folders.into_iter().map(Into::into).collect())
    }

    pub async fn get_folder(&self, id: &str) -> Result<FolderView, ClientError> {
        let path = format!("folders/{}", parse_id(id)?);
        let folder: FolderResponse = self.request(Method::GET, &path, &[], None).await?;
        Ok(folder.into())
    }

    pub async fn create_folder(
        &self,
        name: &str,
        color: Option<&str>,
    ) -> Result<FolderView, ClientError> {
        let req = CreateFolderRequest {
            name: name.to_string(),
            color: color.unwrap_or(DEFAULT_FOLDER_COLOR).to_string(),
        };
        validation::validate_create_folder(&req)
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        let folder: FolderResponse = self
            .request(Method::POST, "folders", &[], Self::body(&req)?)
            .await?;
        Ok(folder.into())
    }

    pub async fn update_folder(
        &self,
        id: &str,
        req: &UpdateFolderRequest,
    ) -> Result<FolderView, ClientError> {
        validation::validate_update_folder(req)
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        let path = format!("folders/{}", parse_id(id)?);
        let folder: FolderResponse = self
            .request(Method::PUT, &path, &[], Self::body(req)?)
            .await?;
        Ok(folder.into())
    }

    pub async fn delete_folder(&self, id: &str) -> Result<(), ClientError> {
        let path = format!("folders/{}", parse_id(id)?);
        self.request_empty(Method::DELETE, &path, None).await
    }

    pub async fn reorder_folders(&self, ids: &[String]) -> Result<(), ClientError> {
        let ids = ids
            .iter()
            .map(|id| parse_id(id))
            .collect::<Result<Vec<i32>, _>>()?;
        let _: serde_json::Value = self
            .request(Method::POST, "folders/reorder", &[], Self::body(&ids)?)
            .await?;
        Ok(())
    }

    // ── Серверы ──────────────────────────────────────────────────────────────

    pub async fn list_servers(&self, folder_id: Option<&str>) -> Result<Vec<ServerView>, ClientError> {
        let query = match folder_id {
            Some(id) => vec![("folder_id", parse_id(id)?.to_string())],
            None => Vec::new(),
        };
        let servers: Vec<ServerResponse> =
            self.request(Method::GET, "servers", &query, None).await?;
        Ok(servers.into_iter().map(Into::into).collect())
    }

    pub async fn get_server(&self, id: &str) -> Result<ServerView, ClientError> {
        let path = format!("servers/{}", parse_id(id)?);
        let server: ServerResponse = self.request(Method::GET, &path, &[], None).await?;
        Ok(server.into())
    }

    /// Создать сервер. Без выбранной папки запрос не отправляется.
    pub async fn create_server(&self, draft: ServerDraft) -> Result<ServerView, ClientError> {
        let req = draft.into_request()?;
        let server: ServerResponse = self
            .request(Method::POST, "servers", &[], Self::body(&req)?)
            .await?;
        Ok(server.into())
    }

    pub async fn update_server(
        &self,
        id: &str,
        req: &UpdateServerRequest,
    ) -> Result<ServerView, ClientError> {
        validation::validate_update_server(req)
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        let path = format!("servers/{}", parse_id(id)?);
        let server: ServerResponse = self
            .request(Method::PUT, &path, &[], Self::body(req)?)
            .await?;
        Ok(server.into())
    }

    /// Перенести сервер в другую папку.
    pub async fn move_server(&self, id: &str, folder_id: &str) -> Result<ServerView, ClientError> {
        let req = UpdateServerRequest {
            folder_id: Some(parse_id(folder_id)?),
            ..Default::default()
        };
        self.update_server(id, &req).await
    }

    pub async fn delete_server(&self, id: &str) -> Result<(), ClientError> {
        let path = format!("servers/{}", parse_id(id)?);
        self.request_empty(Method::DELETE, &path, None).await
    }

    // ── Оплаты и курсы ───────────────────────────────────────────────────────

    pub async fn record_payment(&self, server_id: &str) -> Result<PaymentView, ClientError> {
        let path = format!("payments/{}", parse_id(server_id)?);
        let payment: PaymentResponse = self.request(Method::POST, &path, &[], None).await?;
        Ok(payment.into())
    }

    pub async fn list_payments(&self, query: &PaymentQuery) -> Result<Vec<PaymentView>, ClientError> {
        let mut params = Vec::new();
        if let Some(month) = query.month {
            params.push(("month", month.to_string()));
        }
        if let Some(server_id) = &query.server_id {
            params.push(("server_id", parse_id(server_id)?.to_string()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        let payments: Vec<PaymentResponse> =
            self.request(Method::GET, "payments", &params, None).await?;
        Ok(payments.into_iter().map(Into::into).collect())
    }

    pub async fn payment_summary(&self, month: Option<Month>) -> Result<PaymentSummaryView, ClientError> {
        let query: Vec<(&str, String)> = month
            .map(|m| vec![("month", m.to_string())])
            .unwrap_or_default();
        let summary: PaymentSummary = self
            .request(Method::GET, "payments/summary", &query, None)
            .await?;
        Ok(summary.into())
    }

    pub async fn delete_payment(&self, id: &str) -> Result<(), ClientError> {
        let path = format!("payments/{}", parse_id(id)?);
        self.request_empty(Method::DELETE, &path, None).await
    }

    pub async fn get_rates(&self) -> Result<ExchangeRatesView, ClientError> {
        let rates: ExchangeRatesResponse = self
            .request(Method::GET, "exchange/rates", &[], None)
            .await?;
        Ok(rates.into())
    }

    pub async fn refresh_rates(&self) -> Result<ExchangeRatesView, ClientError> {
        let rates: ExchangeRatesResponse = self
            .request(Method::POST, "exchange/rates/refresh", &[], None)
            .await?;
        Ok(rates.into())
    }

    // ── Метрики ──────────────────────────────────────────────────────────────

    pub async fn server_metrics(
        &self,
        server_id: &str,
        hours: Option<u32>,
    ) -> Result<MetricsView, ClientError> {
        let path = format!("metrics/{}", parse_id(server_id)?);
        let query: Vec<(&str, String)> = hours
            .map(|h| vec![("hours", h.to_string())])
            .unwrap_or_default();
        let metrics: MetricsHistoryResponse =
            self.request(Method::GET, &path, &query, None).await?;
        Ok(metrics.into())
    }

    /// Последние метрики всех серверов, ключ: id сервера.
    pub async fn current_metrics(&self) -> Result<BTreeMap<String, CurrentMetricsView>, ClientError> {
        let current: BTreeMap<String, CurrentMetrics> = self
            .request(Method::GET, "metrics/current/all", &[], None)
            .await?;
        Ok(current.into_iter().map(|(k, v)| (k, v.into())).collect())
    }

    pub async fn generate_agent_token(&self, server_id: &str) -> Result<AgentTokenView, ClientError> {
        let path = format!("metrics/{}/token", parse_id(server_id)?);
        let token: AgentTokenResponse = self.request(Method::POST, &path, &[], None).await?;
        Ok(token.into())
    }

    pub async fn get_agent_token(&self, server_id: &str) -> Result<AgentTokenView, ClientError> {
        let path = format!("metrics/{}/token", parse_id(server_id)?);
        let token: AgentTokenResponse = self.request(Method::GET, &path, &[], None).await?;
        Ok(token.into())
    }

    pub async fn revoke_agent_token(&self, server_id: &str) -> Result<(), ClientError> {
        let path = format!("metrics/{}/token", parse_id(server_id)?);
        self.request_empty(Method::DELETE, &path, None).await
    }

    // ── Резервная копия ──────────────────────────────────────────────────────

    pub async fn export_backup(&self) -> Result<BackupData, ClientError> {
        self.request(Method::GET, "backup/export", &[], None).await
    }

    pub async fn import_backup(
        &self,
        data: &BackupData,
        replace: bool,
    ) -> Result<ImportResult, ClientError> {
        self.request(
            Method::POST,
            "backup/import",
            &[("replace", replace.to_string())],
            Self::body(data)?,
        )
        .await
    }
}
