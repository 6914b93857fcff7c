//! HTTP-тесты клиента и дашборда против тестового axum-сервера на 127.0.0.1:0.

use crate::api::{ApiClient, PaymentQuery, ServerDraft};
use crate::config::ClientConfig;
use crate::dashboard::{load_payment_panel, Dashboard};
use crate::error::ClientError;
use crate::resource::Resource;
use crate::token_store::TokenStore;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vpsdash_domain::{Month, SortBy};

const TOKEN: &str = "tok-1";

/// Что видел тестовый сервер.
#[derive(Clone, Default)]
struct Stub {
    auth_headers: Arc<Mutex<Vec<Option<String>>>>,
    hits: Arc<AtomicUsize>,
    metrics_calls: Arc<AtomicUsize>,
    folders_delay_ms: Arc<AtomicU64>,
    servers_delay_ms: Arc<AtomicU64>,
}

impl Stub {
    fn record(&self, headers: &HeaderMap) -> bool {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let ok = auth.as_deref() == Some(format!("Bearer {TOKEN}").as_str());
        self.auth_headers.lock().unwrap().push(auth);
        ok
    }

    fn last_auth(&self) -> Option<String> {
        self.auth_headers.lock().unwrap().last().cloned().flatten()
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    async fn wait_hits(&self, n: usize) {
        while self.hits() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

async fn pause(delay_ms: &AtomicU64) {
    let ms = delay_ms.load(Ordering::SeqCst);
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

fn unauthorized() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Недействительный токен"})),
    )
        .into_response()
}

fn wire_server(id: i32, folder_id: i32, price: f64) -> Value {
    json!({
        "id": id, "folder_id": folder_id, "name": format!("srv-{id}"), "ip": "10.0.0.1",
        "provider": "Hetzner", "price": price, "currency": "EUR", "payment_date": "5",
        "status": "unknown", "last_ping": null, "last_paid_month": null
    })
}

async fn login(Json(body): Json<Value>) -> axum::response::Response {
    if body["password"] == "secret" {
        Json(json!({"access_token": TOKEN, "token_type": "bearer"})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Неверный пароль"})),
        )
            .into_response()
    }
}

/// Имя папки повторяет запрошенную сортировку.
async fn folders(
    State(stub): State<Stub>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> axum::response::Response {
    let authorized = stub.record(&headers);
    pause(&stub.folders_delay_ms).await;
    if !authorized {
        return unauthorized();
    }
    let name = query.get("sort_by").cloned().unwrap_or_default();
    Json(json!([{
        "id": 1, "name": name, "color": "#ff0000", "position": 0,
        "servers": [wire_server(10, 1, 10.0), wire_server(11, 1, 0.0)]
    }]))
    .into_response()
}

fn stub_router(stub: Stub) -> Router {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/folders", get(folders))
        .route(
            "/servers",
            post(|State(stub): State<Stub>, headers: HeaderMap| async move {
                stub.record(&headers);
                pause(&stub.servers_delay_ms).await;
                (StatusCode::CREATED, Json(wire_server(20, 1, 5.0)))
            }),
        )
        .route(
            "/payments/summary",
            get(|| async {
                Json(json!({
                    "total_rub": 950.0, "by_currency": {"EUR": 10.0},
                    "by_currency_rub": {"EUR": 950.0}, "payments_count": 1, "month": "2026-01"
                }))
            }),
        )
        .route(
            "/payments",
            get(|| async {
                Json(json!([{
                    "id": 1, "server_id": 10, "server_name": "srv-10", "amount": 10.0,
                    "currency": "EUR", "amount_rub": 950.0, "exchange_rate": 95.0,
                    "paid_at": "2026-01-05T10:00:00Z", "payment_month": "2026-01"
                }]))
            }),
        )
        .route(
            "/exchange/rates",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"detail": "Курсы недоступны"})),
                )
            }),
        )
        .route(
            "/payments/{id}",
            post(|| async {
                (
                    StatusCode::CONFLICT,
                    Json(json!({"detail": "Оплата за 2026-01 уже внесена"})),
                )
            }),
        )
        .route(
            "/exchange/rates/refresh",
            post(|| async { "{not json" }),
        )
        .route(
            "/metrics/current/all",
            get(|State(stub): State<Stub>, headers: HeaderMap| async move {
                // Первый снимок отдаётся, дальше сессия считается истёкшей
                let first = stub.metrics_calls.fetch_add(1, Ordering::SeqCst) == 0;
                if !first || !stub.record(&headers) {
                    return unauthorized();
                }
                Json(json!({"10": {
                    "cpu_percent": 12.5, "memory_percent": 40.0, "memory_used_mb": 800,
                    "memory_total_mb": 2000, "disk_percent": 55.0,
                    "collected_at": "2026-01-05T10:00:00Z"
                }}))
                .into_response()
            }),
        )
        .with_state(stub);

    Router::new().nest("/api", api)
}

/// Поднять тестовый сервер и клиент к нему.
async fn spawn_stub(timeout: Duration) -> (ApiClient, Stub) {
    let stub = Stub::default();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = stub_router(stub.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = ClientConfig::new(&format!("http://{addr}/api"))
        .unwrap()
        .with_timeout(timeout);
    let api = ApiClient::new(config, TokenStore::in_memory()).unwrap();
    (api, stub)
}

// ── Авторизация ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_stores_token_and_sends_bearer() {
    let (api, stub) = spawn_stub(Duration::from_secs(5)).await;

    assert!(!api.is_authenticated());
    api.login("secret").await.unwrap();
    assert_eq!(api.tokens().get().as_deref(), Some(TOKEN));

    let folders = api.list_folders(SortBy::Position).await.unwrap();
    assert_eq!(folders[0].id, "1");
    assert_eq!(folders[0].servers[1].id, "11");
    assert_eq!(stub.last_auth(), Some(format!("Bearer {TOKEN}")));
}

#[tokio::test]
async fn test_wrong_password_and_empty_password() {
    let (api, stub) = spawn_stub(Duration::from_secs(5)).await;

    assert_eq!(
        api.login("").await.unwrap_err(),
        ClientError::Validation("Введите пароль".into())
    );
    assert_eq!(api.login("nope").await.unwrap_err(), ClientError::Unauthorized);
    assert!(!api.is_authenticated());
    assert_eq!(stub.hits(), 0);
}

#[tokio::test]
async fn test_unauthorized_clears_token_for_later_calls() {
    let (api, stub) = spawn_stub(Duration::from_secs(5)).await;
    api.tokens().set("expired");

    let err = api.list_folders(SortBy::Position).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(stub.last_auth(), Some("Bearer expired".into()));
    assert!(!api.is_authenticated(), "401 должен удалять токен");

    let _ = api.list_folders(SortBy::Position).await;
    assert_eq!(stub.last_auth(), None, "После 401 заголовок не отправляется");

    api.login("secret").await.unwrap();
    api.list_folders(SortBy::Position).await.unwrap();
    assert_eq!(stub.last_auth(), Some(format!("Bearer {TOKEN}")));
}

// ── Ошибки транспорта и ответа ────────────────────────────────────────────────

#[tokio::test]
async fn test_api_detail_is_surfaced_verbatim() {
    let (api, _stub) = spawn_stub(Duration::from_secs(5)).await;

    let err = api.record_payment("10").await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Api {
            status: 409,
            detail: "Оплата за 2026-01 уже внесена".into()
        }
    );
    assert_eq!(err.to_string(), "Оплата за 2026-01 уже внесена");
}

#[tokio::test]
async fn test_invalid_json_is_decode_error() {
    let (api, _stub) = spawn_stub(Duration::from_secs(5)).await;

    let err = api.refresh_rates().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let (api, stub) = spawn_stub(Duration::from_millis(100)).await;
    stub.folders_delay_ms.store(500, Ordering::SeqCst);

    assert_eq!(
        api.list_folders(SortBy::Position).await.unwrap_err(),
        ClientError::Timeout
    );
}

#[tokio::test]
async fn test_closed_port_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig::new(&format!("http://{addr}/api")).unwrap();
    let api = ApiClient::new(config, TokenStore::in_memory()).unwrap();

    let err = api.get_rates().await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)), "{err:?}");
}

#[tokio::test]
async fn test_invalid_id_is_not_sent() {
    let (api, stub) = spawn_stub(Duration::from_secs(5)).await;

    let err = api.delete_server("abc").await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    let err = api
        .list_payments(&PaymentQuery {
            server_id: Some("x1".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(stub.hits(), 0);
}

// ── Дашборд ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_server_without_folder_sends_nothing() {
    let (api, stub) = spawn_stub(Duration::from_secs(5)).await;
    api.login("secret").await.unwrap();
    let dashboard = Dashboard::new(api);

    let draft = ServerDraft {
        name: "fra-1".into(),
        ip: "10.0.0.1".into(),
        price: 5.0,
        ..Default::default()
    };
    let err = dashboard.create_server(draft).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(stub.hits(), 0);
}

#[tokio::test]
async fn test_refresh_and_create_server_update_state() {
    let (api, _stub) = spawn_stub(Duration::from_secs(5)).await;
    api.login("secret").await.unwrap();
    let dashboard = Dashboard::new(api);

    assert!(dashboard.refresh().await.unwrap());
    let draft = ServerDraft {
        folder_id: Some("1".into()),
        name: "srv-20".into(),
        ip: "10.0.0.1".into(),
        price: 5.0,
        currency: Some("EUR".into()),
        ..Default::default()
    };
    dashboard.create_server(draft).await.unwrap();

    let state = dashboard.snapshot();
    let folders = state.folders.loaded().unwrap();
    let ids: Vec<&str> = folders[0].servers.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["10", "11", "20"]);
}

#[tokio::test]
async fn test_mark_paid_free_server_sends_nothing() {
    let (api, stub) = spawn_stub(Duration::from_secs(5)).await;
    api.login("secret").await.unwrap();
    let dashboard = Dashboard::new(api);
    dashboard.refresh().await.unwrap();
    let before = stub.hits();

    let err = dashboard.mark_paid("11").await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(stub.hits(), before);
}

#[tokio::test]
async fn test_failed_mutation_leaves_state_untouched() {
    let (api, _stub) = spawn_stub(Duration::from_secs(5)).await;
    api.login("secret").await.unwrap();
    let dashboard = Dashboard::new(api);
    dashboard.refresh().await.unwrap();
    let before = dashboard.snapshot();

    let err = dashboard.mark_paid("10").await.unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(dashboard.snapshot(), before);
}

#[tokio::test]
async fn test_unauthorized_refresh_resets_dashboard() {
    let (api, _stub) = spawn_stub(Duration::from_secs(5)).await;
    api.login("secret").await.unwrap();
    let dashboard = Dashboard::new(api);
    dashboard.refresh().await.unwrap();
    dashboard.toggle_expanded("1");

    dashboard.api().tokens().set("expired");
    let err = dashboard.refresh().await.unwrap_err();
    assert!(err.is_unauthorized());

    let state = dashboard.snapshot();
    assert_eq!(state.folders, Resource::NotLoaded);
    assert!(state.expanded.is_empty());
    assert!(!dashboard.api().is_authenticated());
}

#[tokio::test]
async fn test_payment_panel_partial_success() {
    let (api, _stub) = spawn_stub(Duration::from_secs(5)).await;
    let month: Month = "2026-01".parse().unwrap();

    let panel = load_payment_panel(&api, month, 10).await;

    assert_eq!(panel.summary.loaded().unwrap().total_rub, 950.0);
    assert_eq!(panel.recent.loaded().unwrap().len(), 1);
    assert_eq!(
        panel.rates.error(),
        Some(&ClientError::Api {
            status: 500,
            detail: "Курсы недоступны".into()
        })
    );
}

#[tokio::test]
async fn test_sort_change_during_refresh_reloads_folders() {
    let (api, stub) = spawn_stub(Duration::from_secs(5)).await;
    api.login("secret").await.unwrap();
    let dashboard = Dashboard::new(api);
    stub.folders_delay_ms.store(150, Ordering::SeqCst);

    let first = {
        let dashboard = dashboard.clone();
        tokio::spawn(async move { dashboard.refresh().await })
    };
    stub.wait_hits(1).await;

    let started = dashboard.set_sort_by(SortBy::PaymentUrgency).await.unwrap();
    assert!(!started, "Параллельное обновление не запускается");
    assert!(first.await.unwrap().unwrap());

    let state = dashboard.snapshot();
    assert_eq!(state.sort_by, SortBy::PaymentUrgency);
    assert_eq!(state.folders.loaded().unwrap()[0].name, "payment_urgency");
    assert_eq!(stub.hits(), 2);
}

#[tokio::test]
async fn test_logout_during_refresh_discards_folders() {
    let (api, stub) = spawn_stub(Duration::from_secs(5)).await;
    api.login("secret").await.unwrap();
    let dashboard = Dashboard::new(api);
    stub.folders_delay_ms.store(150, Ordering::SeqCst);

    let pending = {
        let dashboard = dashboard.clone();
        tokio::spawn(async move { dashboard.refresh().await })
    };
    stub.wait_hits(1).await;
    dashboard.logout();

    assert!(!pending.await.unwrap().unwrap());
    assert_eq!(dashboard.snapshot().folders, Resource::NotLoaded);
}

#[tokio::test]
async fn test_refresh_after_relogin_waits_for_fresh_folders() {
    let (api, stub) = spawn_stub(Duration::from_secs(5)).await;
    api.login("secret").await.unwrap();
    let dashboard = Dashboard::new(api);
    stub.folders_delay_ms.store(150, Ordering::SeqCst);

    let stale = {
        let dashboard = dashboard.clone();
        tokio::spawn(async move { dashboard.refresh().await })
    };
    stub.wait_hits(1).await;
    dashboard.logout();
    dashboard.api().login("secret").await.unwrap();

    assert!(!dashboard.refresh().await.unwrap(), "Обновление уже выполняется");
    assert!(stale.await.unwrap().unwrap());
    assert!(dashboard.snapshot().folders.is_loaded());
    assert_eq!(stub.hits(), 2);
}

#[tokio::test]
async fn test_mutation_confirmed_after_relogin_is_not_applied() {
    let (api, stub) = spawn_stub(Duration::from_secs(5)).await;
    api.login("secret").await.unwrap();
    let dashboard = Dashboard::new(api);
    dashboard.refresh().await.unwrap();
    stub.servers_delay_ms.store(200, Ordering::SeqCst);

    let create = {
        let dashboard = dashboard.clone();
        tokio::spawn(async move {
            let draft = ServerDraft {
                folder_id: Some("1".into()),
                name: "srv-20".into(),
                ip: "10.0.0.1".into(),
                price: 5.0,
                currency: Some("EUR".into()),
                ..Default::default()
            };
            dashboard.create_server(draft).await
        })
    };
    stub.wait_hits(2).await;

    dashboard.logout();
    dashboard.api().login("secret").await.unwrap();
    assert!(dashboard.refresh().await.unwrap());
    assert_eq!(create.await.unwrap().unwrap().id, "20");

    let state = dashboard.snapshot();
    let ids: Vec<&str> = state.folders.loaded().unwrap()[0]
        .servers
        .iter()
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(ids, vec!["10", "11"]);
}

#[tokio::test]
async fn test_metrics_poller_stops_after_session_expires() {
    let (api, stub) = spawn_stub(Duration::from_secs(5)).await;
    api.login("secret").await.unwrap();
    let dashboard = Dashboard::new(api);
    dashboard.refresh().await.unwrap();

    let (handle, mut rx) = dashboard.watch_metrics(Duration::from_millis(20));
    rx.wait_for(|r| matches!(r.error(), Some(ClientError::Unauthorized)))
        .await
        .unwrap();
    assert_eq!(rx.borrow().loaded(), None);

    tokio::time::timeout(Duration::from_secs(1), async {
        while !handle.is_finished() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(stub.metrics_calls.load(Ordering::SeqCst), 2);
    assert_eq!(dashboard.snapshot().folders, Resource::NotLoaded);
    assert!(!dashboard.api().is_authenticated());
}
