//! Ограничение частоты попыток входа по IP (фиксированное окно).

use crate::error::AppError;
use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<String, (Instant, u32)>>>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            limit,
            window,
        }
    }

    /// Учесть запрос; `false`, если лимит окна исчерпан.
    pub async fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        if windows.len() > 1024 {
            let window = self.window;
            windows.retain(|_, (started, _)| now.duration_since(*started) < window);
        }

        let (started, count) = windows.entry(key.to_string()).or_insert((now, 0));
        if now.duration_since(*started) >= self.window {
            *started = now;
            *count = 0;
        }
        *count += 1;
        *count <= self.limit
    }
}

/// Middleware: 429 при превышении лимита.
pub async fn limit_by_ip(
    limiter: RateLimiter,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&req);
    if !limiter.allow(&ip).await {
        tracing::warn!(ip = %ip, "Превышен лимит попыток входа");
        return Err(AppError::TooManyRequests);
    }
    Ok(next.run(req).await)
}

/// IP клиента: первый адрес X-Forwarded-For или адрес соединения.
pub fn client_ip<B>(req: &Request<B>) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
