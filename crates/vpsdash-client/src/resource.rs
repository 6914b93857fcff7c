//! Состояние асинхронно загружаемого ресурса.

use crate::error::ClientError;

/// «Ещё не загружали» отличается от «загрузили пустое».
#[derive(Debug, Clone, PartialEq)]
pub enum Resource<T, E = ClientError> {
    NotLoaded,
    Loading,
    Loaded(T),
    Failed(E),
}

impl<T, E> Default for Resource<T, E> {
    fn default() -> Self {
        Resource::NotLoaded
    }
}

impl<T, E> Resource<T, E> {
    pub fn from_result(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Resource::Loaded(value),
            Err(e) => Resource::Failed(e),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Resource::Loaded(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Resource::Loading)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Resource::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn loaded_mut(&mut self) -> Option<&mut T> {
        match self {
            Resource::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            Resource::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Перейти в `Loading`, если загруженного значения ещё нет.
    /// Уже показанные данные при перезагрузке не скрываются.
    pub fn start_loading(&mut self) {
        if !self.is_loaded() {
            *self = Resource::Loading;
        }
    }

    /// Применить результат загрузки. Ошибка не затирает уже загруженные данные;
    /// возвращается `true`, если состояние изменилось.
    pub fn settle(&mut self, result: Result<T, E>) -> bool {
        match result {
            Ok(value) => {
                *self = Resource::Loaded(value);
                true
            }
            Err(_) if self.is_loaded() => false,
            Err(e) => {
                *self = Resource::Failed(e);
                true
            }
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resource<U, E> {
        match self {
            Resource::NotLoaded => Resource::NotLoaded,
            Resource::Loading => Resource::Loading,
            Resource::Loaded(value) => Resource::Loaded(f(value)),
            Resource::Failed(e) => Resource::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loaded_empty_differs_from_not_loaded() {
        let never: Resource<Vec<i32>> = Resource::default();
        let empty: Resource<Vec<i32>> = Resource::Loaded(vec![]);

        assert_eq!(never.loaded(), None);
        assert_eq!(empty.loaded(), Some(&vec![]));
        assert_ne!(never, empty);
    }

    #[test]
    fn test_reload_keeps_previous_value() {
        let mut r: Resource<u32> = Resource::NotLoaded;
        r.start_loading();
        assert!(r.is_loading());

        assert!(r.settle(Ok(5)));
        r.start_loading();
        assert_eq!(r.loaded(), Some(&5), "Данные не прячутся на время перезагрузки");

        assert!(!r.settle(Err(ClientError::Timeout)));
        assert_eq!(r.loaded(), Some(&5));
    }

    #[test]
    fn test_failure_without_data() {
        let mut r: Resource<u32> = Resource::Loading;
        r.settle(Err(ClientError::Network("refused".into())));
        assert_eq!(r.error(), Some(&ClientError::Network("refused".into())));
        assert_eq!(r.map(|v| v * 2).loaded(), None);
    }
}
