use thiserror::Error;

#[derive(Debug, Error)]
/// Ошибки клиентской библиотеки `pulse-client`.
pub enum PulseClientError {
    /// Транспортная ошибка (`reqwest`): соединение, DNS, таймаут.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Не-2xx ответ сервера без более точной классификации.
    #[error("server error: http status {status}: {message}")]
    Server {
        /// HTTP-статус ответа.
        status: u16,
        /// Сообщение из тела ошибки или сгенерированное по статусу.
        message: String,
    },

    /// Требуется авторизация: токен отсутствует, просрочен или отвергнут.
    #[error("unauthorized")]
    Auth,

    /// Целевой пост не найден или не принадлежит пользователю.
    #[error("not found")]
    NotFound,

    /// Нарушено клиентское ограничение, запрос не отправлялся.
    #[error("validation error: {0}")]
    Validation(String),

    /// Не удалось прочитать или записать локальное хранилище сессии.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
#[error("session store error: {0}")]
/// Ошибка локального хранилища сессии.
pub struct StoreError(pub String);

/// Результат операций `pulse-client`.
pub type PulseResult<T> = Result<T, PulseClientError>;

impl PulseClientError {
    /// true для ошибок, переводящих сессию в неавторизованное состояние.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth)
    }

    pub(crate) fn from_http_status(status: reqwest::StatusCode, message: Option<String>) -> Self {
        match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => Self::Auth,
            reqwest::StatusCode::NOT_FOUND => Self::NotFound,
            _ => {
                let message = message.unwrap_or_else(|| format!("http status {status}"));
                Self::Server {
                    status: status.as_u16(),
                    message,
                }
            }
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_http_status(status, None);
        }
        Self::Network(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_401_and_403_map_to_auth() {
        assert!(matches!(
            PulseClientError::from_http_status(reqwest::StatusCode::UNAUTHORIZED, None),
            PulseClientError::Auth
        ));
        assert!(matches!(
            PulseClientError::from_http_status(reqwest::StatusCode::FORBIDDEN, None),
            PulseClientError::Auth
        ));
    }

    #[test]
    fn status_404_maps_to_not_found() {
        assert!(matches!(
            PulseClientError::from_http_status(reqwest::StatusCode::NOT_FOUND, None),
            PulseClientError::NotFound
        ));
    }

    #[test]
    fn other_statuses_keep_server_message() {
        let err = PulseClientError::from_http_status(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            Some("boom".to_string()),
        );
        match err {
            PulseClientError::Server { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected Server, got {other:?}"),
        }
    }
}
