//! Периодический опрос и защита от параллельных ручных обновлений.

use crate::error::ClientError;
use crate::resource::Resource;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Владелец фоновой задачи опроса. Задача останавливается при `cancel()`
/// или при уничтожении хэндла.
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn cancel(self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Запустить опрос с фиксированным интервалом.
///
/// Одновременно выполняется не больше одного запроса: пропущенные за время
/// долгого запроса тики отбрасываются. Ошибка после успешной загрузки
/// только логируется, прежние данные остаются. Задача завершается, когда
/// все получатели уничтожены, или после ответа 401: тогда прежние данные
/// заменяются ошибкой `Unauthorized`.
pub fn spawn_poller<T, F, Fut>(
    period: Duration,
    mut fetch: F,
) -> (PollHandle, watch::Receiver<Resource<T>>)
where
    T: Send + Sync + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
{
    let (tx, rx) = watch::channel(Resource::NotLoaded);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = tx.closed() => break,
            }

            tx.send_if_modified(|r| {
                let before = r.is_loading();
                r.start_loading();
                r.is_loading() != before
            });

            let result = tokio::select! {
                result = fetch() => result,
                _ = tx.closed() => break,
            };

            match result {
                Err(ClientError::Unauthorized) => {
                    // Сессии больше нет: прежние данные не показываем
                    tracing::info!("Опрос остановлен: сессия истекла");
                    tx.send_replace(Resource::Failed(ClientError::Unauthorized));
                    return;
                }
                Err(e) => {
                    tracing::warn!("Фоновое обновление не удалось: {e}");
                    tx.send_if_modified(|r| r.settle(Err(e)));
                }
                Ok(value) => {
                    tx.send_if_modified(|r| r.settle(Ok(value)));
                }
            }
        }

        tracing::debug!("Опрос остановлен: получателей не осталось");
    });

    (PollHandle { task }, rx)
}

/// Флаг «запрос уже выполняется» для ручных обновлений.
#[derive(Debug, Clone, Default)]
pub struct Coalescer {
    in_flight: Arc<AtomicBool>,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Coalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Выполнить `fut`, если другой запрос не выполняется; иначе `None`.
    pub async fn run<T>(&self, fut: impl Future<Output = T>) -> Option<T> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Обновление уже выполняется, запрос пропущен");
            return None;
        }
        let _guard = InFlightGuard(&self.in_flight);
        Some(fut.await)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_poller_publishes_values() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (_handle, mut rx) = spawn_poller(Duration::from_millis(20), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ClientError>(n) }
        });

        rx.wait_for(|r| r.loaded().is_some_and(|n| *n >= 2))
            .await
            .unwrap();
        assert!(calls.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_poller_never_overlaps_requests() {
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let (a, m) = (active.clone(), max_seen.clone());

        let (_handle, mut rx) = spawn_poller(Duration::from_millis(5), move || {
            let (a, m) = (a.clone(), m.clone());
            async move {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                m.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                a.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, ClientError>(())
            }
        });

        for _ in 0..3 {
            rx.changed().await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_poller_keeps_data_on_later_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (_handle, mut rx) = spawn_poller(Duration::from_millis(10), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Ok(7)
                } else {
                    Err(ClientError::Network("down".into()))
                }
            }
        });

        rx.wait_for(|r| r.is_loaded()).await.unwrap();
        while calls.load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(rx.borrow().loaded(), Some(&7));
    }

    #[tokio::test]
    async fn test_poller_stops_on_unauthorized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (handle, mut rx) = spawn_poller(Duration::from_millis(10), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Ok(7)
                } else {
                    Err(ClientError::Unauthorized)
                }
            }
        });

        rx.wait_for(|r| matches!(r.error(), Some(ClientError::Unauthorized)))
            .await
            .unwrap();
        assert_eq!(rx.borrow().loaded(), None, "Данные прежней сессии не остаются");

        tokio::time::timeout(Duration::from_secs(1), async {
            while !handle.is_finished() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        let after_stop = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), after_stop);
        assert_eq!(after_stop, 2);
    }

    #[tokio::test]
    async fn test_poller_stops_when_receiver_dropped() {
        let (handle, rx) = spawn_poller(Duration::from_millis(10), || async {
            Ok::<_, ClientError>(())
        });
        drop(rx);

        tokio::time::timeout(Duration::from_secs(1), async {
            while !handle.is_finished() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_stops_updates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (handle, _rx) = spawn_poller(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ClientError>(()) }
        });

        tokio::time::sleep(Duration::from_millis(35)).await;
        handle.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let after_cancel = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), after_cancel);
    }

    #[tokio::test]
    async fn test_coalescer_skips_concurrent_run() {
        let coalescer = Coalescer::new();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let first = {
            let c = coalescer.clone();
            tokio::spawn(async move {
                c.run(async move {
                    release_rx.await.ok();
                    1
                })
                .await
            })
        };
        while !coalescer.is_in_flight() {
            tokio::task::yield_now().await;
        }

        assert_eq!(coalescer.run(async { 2 }).await, None);
        release_tx.send(()).unwrap();
        assert_eq!(first.await.unwrap(), Some(1));
        assert!(!coalescer.is_in_flight());
        assert_eq!(coalescer.run(async { 3 }).await, Some(3));
    }
}
