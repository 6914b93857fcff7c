//! Состояние дашборда: список папок, раскрытые папки, режим сортировки.
//!
//! Состояние меняется только после подтверждения сервером: ошибка мутации
//! оставляет его нетронутым. Любой ответ 401 сбрасывает состояние, как при
//! выходе. Ответ на запрос, отправленный до сброса, в новое состояние не
//! попадает.

use crate::api::{ApiClient, PaymentQuery, ServerDraft};
use crate::error::ClientError;
use crate::poller::{spawn_poller, Coalescer, PollHandle};
use crate::resource::Resource;
use crate::view::{
    CurrentMetricsView, ExchangeRatesView, FolderView, MetricsView, PaymentSummaryView,
    PaymentView, ServerView,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use vpsdash_domain::billing;
use vpsdash_domain::models::{UpdateFolderRequest, UpdateServerRequest};
use vpsdash_domain::{Month, SortBy};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub folders: Resource<Vec<FolderView>>,
    pub expanded: BTreeSet<String>,
    pub sort_by: SortBy,
    /// Номер сессии; растёт при каждом сбросе
    session: u64,
}

impl DashboardState {
    fn reset(&mut self) {
        *self = DashboardState {
            session: self.session.wrapping_add(1),
            ..Default::default()
        };
    }

    fn folder_mut(&mut self, id: &str) -> Option<&mut FolderView> {
        self.folders
            .loaded_mut()?
            .iter_mut()
            .find(|f| f.id == id)
    }

    fn find_server(&self, id: &str) -> Option<&ServerView> {
        self.folders
            .loaded()?
            .iter()
            .flat_map(|f| f.servers.iter())
            .find(|s| s.id == id)
    }

    fn take_server(&mut self, id: &str) -> Option<ServerView> {
        let folders = self.folders.loaded_mut()?;
        folders.iter_mut().find_map(|f| {
            let index = f.servers.iter().position(|s| s.id == id)?;
            Some(f.servers.remove(index))
        })
    }

    fn put_server(&mut self, server: ServerView) {
        if let Some(folder) = self.folder_mut(&server.folder_id) {
            folder.servers.push(server);
        }
    }

    /// Обновить сервер на его месте; при смене папки он уходит в конец новой.
    fn replace_server(&mut self, server: ServerView) {
        let slot = self
            .folder_mut(&server.folder_id)
            .and_then(|f| f.servers.iter_mut().find(|s| s.id == server.id));
        if let Some(slot) = slot {
            *slot = server;
            return;
        }
        self.take_server(&server.id);
        self.put_server(server);
    }
}

#[derive(Clone)]
pub struct Dashboard {
    api: ApiClient,
    state: Arc<Mutex<DashboardState>>,
    refresh_gate: Coalescer,
}

impl Dashboard {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(DashboardState::default())),
            refresh_gate: Coalescer::new(),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn lock(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> DashboardState {
        self.lock().clone()
    }

    /// Сбросить состояние при 401: токен к этому моменту уже удалён клиентом.
    fn checked<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(ClientError::Unauthorized) = &result {
            tracing::info!("Сессия истекла, состояние дашборда сброшено");
            self.lock().reset();
        }
        result
    }

    pub fn logout(&self) {
        self.api.logout();
        self.lock().reset();
    }

    fn session(&self) -> u64 {
        self.lock().session
    }

    /// Применить подтверждённую мутацию, если сессия с момента запроса не сменилась.
    fn apply(&self, session: u64, update: impl FnOnce(&mut DashboardState)) {
        let mut state = self.lock();
        if state.session == session {
            update(&mut state);
        } else {
            tracing::debug!("Ответ получен после выхода, состояние не меняется");
        }
    }

    // ── Загрузка ─────────────────────────────────────────────────────────────

    /// Перезагрузить папки. `Ok(false)`, если обновление уже выполняется
    /// (оно само подхватит новую сортировку) или сессия сменилась во время запроса.
    pub async fn refresh(&self) -> Result<bool, ClientError> {
        self.lock().folders.start_loading();
        loop {
            let Some(loaded) = self.refresh_gate.run(self.load_folders()).await else {
                return Ok(false);
            };
            let Some(sort_by) = loaded? else {
                return Ok(false);
            };
            // Сортировку могли сменить между применением ответа и снятием флага
            if self.lock().sort_by == sort_by {
                return Ok(true);
            }
        }
    }

    /// Загрузить папки в текущей сортировке и применить ответ.
    /// `None`, если за время запроса сменилась сессия и новой загрузки не просили.
    async fn load_folders(&self) -> Result<Option<SortBy>, ClientError> {
        loop {
            let (sort_by, session) = {
                let state = self.lock();
                (state.sort_by, state.session)
            };

            let result = self.checked(self.api.list_folders(sort_by).await);
            if let Err(e) = &result {
                tracing::warn!("Не удалось загрузить папки: {e}");
            }

            let mut state = self.lock();
            if state.session != session {
                tracing::debug!("Список папок получен после выхода и отброшен");
                // В новой сессии уже ждут список
                if state.folders.is_loading() {
                    continue;
                }
                return result.map(|_| None);
            }
            if state.sort_by != sort_by {
                tracing::debug!(?sort_by, "Сортировка сменилась, список загружается заново");
                continue;
            }
            let outcome = result.as_ref().map(|_| Some(sort_by)).map_err(|e| e.clone());
            state.folders.settle(result);
            return outcome;
        }
    }

    pub async fn set_sort_by(&self, sort_by: SortBy) -> Result<bool, ClientError> {
        self.lock().sort_by = sort_by;
        self.refresh().await
    }

    /// Переключить раскрытие папки; возвращает новое состояние.
    pub fn toggle_expanded(&self, folder_id: &str) -> bool {
        let mut state = self.lock();
        if state.expanded.remove(folder_id) {
            false
        } else {
            state.expanded.insert(folder_id.to_string());
            true
        }
    }

    pub fn is_expanded(&self, folder_id: &str) -> bool {
        self.lock().expanded.contains(folder_id)
    }

    /// Платные серверы без оплаты за `month`.
    pub fn payable_servers(&self, month: Month) -> Vec<ServerView> {
        let state = self.lock();
        let all: Vec<ServerView> = state
            .folders
            .loaded()
            .map(|folders| {
                folders
                    .iter()
                    .flat_map(|f| f.servers.iter().cloned())
                    .collect()
            })
            .unwrap_or_default();
        billing::payable_servers(&all, month)
            .into_iter()
            .cloned()
            .collect()
    }

    // ── Папки ────────────────────────────────────────────────────────────────

    pub async fn create_folder(
        &self,
        name: &str,
        color: Option<&str>,
    ) -> Result<FolderView, ClientError> {
        let session = self.session();
        let folder = self.checked(self.api.create_folder(name, color).await)?;
        self.apply(session, |state| {
            if let Some(folders) = state.folders.loaded_mut() {
                folders.push(folder.clone());
            }
        });
        Ok(folder)
    }

    pub async fn update_folder(
        &self,
        id: &str,
        req: &UpdateFolderRequest,
    ) -> Result<FolderView, ClientError> {
        let session = self.session();
        let updated = self.checked(self.api.update_folder(id, req).await)?;
        self.apply(session, |state| {
            if let Some(folder) = state.folder_mut(id) {
                folder.name = updated.name.clone();
                folder.color = updated.color.clone();
                folder.position = updated.position;
            }
        });
        Ok(updated)
    }

    pub async fn delete_folder(&self, id: &str) -> Result<(), ClientError> {
        let session = self.session();
        self.checked(self.api.delete_folder(id).await)?;
        self.apply(session, |state| {
            if let Some(folders) = state.folders.loaded_mut() {
                folders.retain(|f| f.id != id);
            }
            state.expanded.remove(id);
        });
        Ok(())
    }

    /// Новый порядок папок. Не перечисленные папки идут следом в прежнем порядке.
    pub async fn reorder_folders(&self, ids: &[String]) -> Result<(), ClientError> {
        let session = self.session();
        self.checked(self.api.reorder_folders(ids).await)?;
        self.apply(session, |state| {
            let Some(folders) = state.folders.loaded_mut() else {
                return;
            };
            let mut reordered = Vec::with_capacity(folders.len());
            for id in ids {
                if let Some(index) = folders.iter().position(|f| &f.id == id) {
                    reordered.push(folders.remove(index));
                }
            }
            reordered.append(folders);
            for (position, folder) in reordered.iter_mut().enumerate() {
                folder.position = position as i32;
            }
            *folders = reordered;
        });
        Ok(())
    }

    // ── Серверы ──────────────────────────────────────────────────────────────

    pub async fn create_server(&self, draft: ServerDraft) -> Result<ServerView, ClientError> {
        let session = self.session();
        let server = self.checked(self.api.create_server(draft).await)?;
        self.apply(session, |state| state.put_server(server.clone()));
        Ok(server)
    }

    pub async fn update_server(
        &self,
        id: &str,
        req: &UpdateServerRequest,
    ) -> Result<ServerView, ClientError> {
        let session = self.session();
        let server = self.checked(self.api.update_server(id, req).await)?;
        self.apply(session, |state| state.replace_server(server.clone()));
        Ok(server)
    }

    pub async fn move_server(&self, id: &str, folder_id: &str) -> Result<ServerView, ClientError> {
        let session = self.session();
        let server = self.checked(self.api.move_server(id, folder_id).await)?;
        self.apply(session, |state| state.replace_server(server.clone()));
        Ok(server)
    }

    pub async fn delete_server(&self, id: &str) -> Result<(), ClientError> {
        let session = self.session();
        self.checked(self.api.delete_server(id).await)?;
        self.apply(session, |state| {
            state.take_server(id);
        });
        Ok(())
    }

    /// Отметить оплату за текущий месяц. Бесплатный сервер отклоняется без запроса.
    pub async fn mark_paid(&self, server_id: &str) -> Result<PaymentView, ClientError> {
        let free = self
            .lock()
            .find_server(server_id)
            .filter(|s| s.is_free())
            .map(|s| s.name.clone());
        if let Some(name) = free {
            return Err(ClientError::Validation(format!(
                "Сервер «{name}» бесплатный, оплата не требуется"
            )));
        }

        let session = self.session();
        let payment = self.checked(self.api.record_payment(server_id).await)?;
        self.apply(session, |state| {
            let server = state
                .folders
                .loaded_mut()
                .into_iter()
                .flatten()
                .flat_map(|f| f.servers.iter_mut())
                .find(|s| s.id == server_id);
            if let Some(server) = server {
                server.last_paid_month = Some(payment.payment_month.clone());
            }
        });
        Ok(payment)
    }

    // ── Метрики ──────────────────────────────────────────────────────────────

    /// Периодически загружать последние метрики всех серверов.
    pub fn watch_metrics(
        &self,
        period: Duration,
    ) -> (
        PollHandle,
        watch::Receiver<Resource<BTreeMap<String, CurrentMetricsView>>>,
    ) {
        let dashboard = self.clone();
        spawn_poller(period, move || {
            let dashboard = dashboard.clone();
            async move { dashboard.checked(dashboard.api.current_metrics().await) }
        })
    }

    /// Периодически загружать историю метрик одного сервера.
    pub fn watch_server_metrics(
        &self,
        server_id: &str,
        hours: Option<u32>,
        period: Duration,
    ) -> (PollHandle, watch::Receiver<Resource<MetricsView>>) {
        let dashboard = self.clone();
        let server_id = server_id.to_string();
        spawn_poller(period, move || {
            let dashboard = dashboard.clone();
            let server_id = server_id.clone();
            async move {
                let result = dashboard.api.server_metrics(&server_id, hours).await;
                dashboard.checked(result)
            }
        })
    }
}

/// Панель оплат: три независимых ресурса.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentPanel {
    pub summary: Resource<PaymentSummaryView>,
    pub rates: Resource<ExchangeRatesView>,
    pub recent: Resource<Vec<PaymentView>>,
}

/// Загрузить сводку, курсы и последние оплаты параллельно.
/// Ошибка одного запроса не мешает показать остальные.
pub async fn load_payment_panel(api: &ApiClient, month: Month, limit: u64) -> PaymentPanel {
    let query = PaymentQuery {
        month: Some(month),
        limit: Some(limit),
        ..Default::default()
    };
    let (summary, rates, recent) = tokio::join!(
        api.payment_summary(Some(month)),
        api.get_rates(),
        api.list_payments(&query),
    );

    for (name, error) in [
        ("сводка", summary.as_ref().err()),
        ("курсы", rates.as_ref().err()),
        ("оплаты", recent.as_ref().err()),
    ] {
        if let Some(e) = error {
            tracing::warn!("Панель оплат: не загружено ({name}): {e}");
        }
    }

    PaymentPanel {
        summary: Resource::from_result(summary),
        rates: Resource::from_result(rates),
        recent: Resource::from_result(recent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::token_store::TokenStore;
    use vpsdash_domain::models::ServerStatus;

    fn server(id: &str, folder_id: &str, price: f64) -> ServerView {
        ServerView {
            id: id.into(),
            folder_id: folder_id.into(),
            name: format!("srv-{id}"),
            ip: "10.0.0.1".into(),
            status: ServerStatus::Unknown,
            provider: String::new(),
            price,
            currency: "USD".into(),
            payment_date: "5".into(),
            last_ping: None,
            last_check: None,
            last_paid_month: None,
        }
    }

    fn folder(id: &str, servers: Vec<ServerView>) -> FolderView {
        FolderView {
            id: id.into(),
            name: format!("folder-{id}"),
            color: "#000000".into(),
            position: 0,
            servers,
        }
    }

    fn offline_dashboard() -> Dashboard {
        // Порт 9 никто не слушает: тесты ниже запросов не отправляют.
        let config = ClientConfig::new("http://127.0.0.1:9/api/").unwrap();
        Dashboard::new(ApiClient::new(config, TokenStore::in_memory()).unwrap())
    }

    #[test]
    fn test_move_between_folders_in_state() {
        let mut state = DashboardState {
            folders: Resource::Loaded(vec![
                folder("1", vec![server("10", "1", 5.0)]),
                folder("2", vec![]),
            ]),
            ..Default::default()
        };

        let mut moved = state.take_server("10").unwrap();
        moved.folder_id = "2".into();
        state.put_server(moved);

        let folders = state.folders.loaded().unwrap();
        assert!(folders[0].servers.is_empty());
        assert_eq!(folders[1].servers[0].id, "10");
    }

    #[test]
    fn test_update_keeps_server_position() {
        let mut state = DashboardState {
            folders: Resource::Loaded(vec![
                folder(
                    "1",
                    vec![server("10", "1", 5.0), server("11", "1", 5.0), server("12", "1", 5.0)],
                ),
                folder("2", vec![server("20", "2", 5.0)]),
            ]),
            ..Default::default()
        };

        let mut renamed = server("10", "1", 7.0);
        renamed.name = "db".into();
        state.replace_server(renamed);

        let ids = |state: &DashboardState, i: usize| -> Vec<String> {
            state.folders.loaded().unwrap()[i]
                .servers
                .iter()
                .map(|s| s.id.clone())
                .collect()
        };
        assert_eq!(ids(&state, 0), ["10", "11", "12"]);
        let first = &state.folders.loaded().unwrap()[0].servers[0];
        assert_eq!((first.name.as_str(), first.price), ("db", 7.0));

        state.replace_server(server("11", "2", 5.0));
        assert_eq!(ids(&state, 0), ["10", "12"]);
        assert_eq!(ids(&state, 1), ["20", "11"]);
    }

    #[test]
    fn test_reset_starts_new_session() {
        let dashboard = offline_dashboard();
        dashboard.toggle_expanded("1");
        let session = dashboard.session();

        dashboard.logout();

        assert_eq!(dashboard.session(), session + 1);
        assert!(!dashboard.is_expanded("1"));

        let mut applied = false;
        dashboard.apply(session, |_| applied = true);
        assert!(!applied, "Ответ прежней сессии не применяется");
        dashboard.apply(session + 1, |_| applied = true);
        assert!(applied);
    }

    #[test]
    fn test_toggle_expanded() {
        let dashboard = offline_dashboard();
        assert!(dashboard.toggle_expanded("3"));
        assert!(dashboard.is_expanded("3"));
        assert!(!dashboard.toggle_expanded("3"));
        assert!(!dashboard.is_expanded("3"));
    }

    #[test]
    fn test_payable_servers_skips_free_and_paid() {
        let dashboard = offline_dashboard();
        let month: Month = "2026-01".parse().unwrap();
        let mut paid = server("11", "1", 5.0);
        paid.last_paid_month = Some("2026-01".into());
        dashboard.lock().folders = Resource::Loaded(vec![folder(
            "1",
            vec![server("10", "1", 5.0), paid, server("12", "1", 0.0)],
        )]);

        let payable = dashboard.payable_servers(month);
        assert_eq!(payable.len(), 1);
        assert_eq!(payable[0].id, "10");
    }

    #[tokio::test]
    async fn test_mark_paid_free_server_is_rejected_locally() {
        let dashboard = offline_dashboard();
        dashboard.lock().folders =
            Resource::Loaded(vec![folder("1", vec![server("12", "1", 0.0)])]);

        let err = dashboard.mark_paid("12").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }
}
