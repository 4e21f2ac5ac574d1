//! Клиентская библиотека минимального сервиса микропостов.
//!
//! Реализует наблюдаемый контракт браузерного клиента: управление сессией
//! (токен + userId с долговременным хранением) и CRUD постов по HTTP
//! (`reqwest`). Хранилище сессии — шов [`SessionStore`]: в тестах память,
//! в CLI файл.
//!
//! Фасад [`PulseClient`] держит сессию и подставляет Bearer-токен в
//! защищённые операции; отказ авторизации переводит сессию в
//! неавторизованное состояние.
#![warn(missing_docs)]

mod error;
mod feed;
mod http_client;
mod models;
mod policy;
mod session;

pub use error::{PulseClientError, PulseResult, StoreError};
pub use feed::{FeedView, RECONCILE_DELAY};
pub use http_client::HttpClient;
pub use models::{AuthResponse, MediaType, Post, UserInfo, UserPosts};
pub use policy::PostPolicy;
pub use session::{MemoryStore, Session, SessionManager, SessionStore, Theme};

use tracing::debug;

#[derive(Debug)]
/// Фасад сервиса: HTTP-транспорт, сессия и профиль развёртывания.
pub struct PulseClient<S: SessionStore> {
    http: HttpClient,
    session: SessionManager<S>,
    policy: PostPolicy,
}

impl<S: SessionStore> PulseClient<S> {
    /// Создаёт клиент и восстанавливает сессию из хранилища.
    pub fn new(base_url: impl Into<String>, store: S, policy: PostPolicy) -> Self {
        Self {
            http: HttpClient::new(base_url),
            session: SessionManager::new(store),
            policy,
        }
    }

    /// Текущая сессия.
    pub fn session(&self) -> &Session {
        self.session.session()
    }

    /// true, если сессия авторизована.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Профиль развёртывания, с которым создан клиент.
    pub fn policy(&self) -> &PostPolicy {
        &self.policy
    }

    /// Низкоуровневый HTTP-клиент (для сверки ленты и смоук-тестов).
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Регистрирует пользователя. Аватар передаётся как data-URI.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        picture: &str,
    ) -> PulseResult<()> {
        self.http.register(username, password, picture).await
    }

    /// Вход: при успехе сессия сохраняется в памяти и в хранилище.
    pub async fn login(&mut self, username: &str, password: &str) -> PulseResult<AuthResponse> {
        let auth = self.http.login(username, password).await?;
        self.session.login(&auth.token, &auth.user_id)?;
        Ok(auth)
    }

    /// Сбрасывает сессию. Идемпотентен.
    pub fn logout(&mut self) -> PulseResult<()> {
        self.session.logout()?;
        Ok(())
    }

    /// Публичная лента, авторизация не нужна.
    pub async fn public_feed(&self) -> PulseResult<Vec<Post>> {
        self.http.list_public_posts().await
    }

    /// Посты текущего пользователя вместе с его профилем.
    pub async fn my_posts(&mut self) -> PulseResult<UserPosts> {
        let (token, user_id) = self.require_session()?;
        let result = self.http.list_user_posts(&token, &user_id).await;
        self.note_auth_failure(&result);
        result
    }

    /// Создаёт пост. Ограничения профиля проверяются до отправки:
    /// при нарушении сетевого запроса не будет.
    pub async fn create_post(
        &mut self,
        content: &str,
        media_type: MediaType,
        media_url: Option<&str>,
    ) -> PulseResult<Post> {
        self.policy.validate(content, media_type)?;

        let (token, _) = self.require_session()?;
        let result = self
            .http
            .create_post(&token, content, media_type, media_url)
            .await;
        self.note_auth_failure(&result);
        result
    }

    /// Обновляет существующий пост. Те же клиентские ограничения,
    /// что и при создании.
    pub async fn update_post(
        &mut self,
        post_id: &str,
        content: &str,
        media_type: MediaType,
        media_url: Option<&str>,
    ) -> PulseResult<Post> {
        self.policy.validate(content, media_type)?;

        let (token, _) = self.require_session()?;
        let result = self
            .http
            .update_post(&token, post_id, content, media_type, media_url)
            .await;
        self.note_auth_failure(&result);
        result
    }

    /// Удаляет пост текущего пользователя.
    pub async fn delete_post(&mut self, post_id: &str) -> PulseResult<()> {
        let (token, user_id) = self.require_session()?;
        let result = self.http.delete_post(&token, &user_id, post_id).await;
        self.note_auth_failure(&result);
        result
    }

    /// Future для сверки ленты после мутации: повторно читает посты
    /// пользователя. Передаётся в [`FeedView::schedule_reconcile`].
    pub fn my_posts_refetch(
        &self,
    ) -> PulseResult<impl Future<Output = PulseResult<Vec<Post>>> + Send + 'static> {
        let (token, user_id) = self.require_session()?;
        let http = self.http.clone();
        Ok(async move {
            http.list_user_posts(&token, &user_id)
                .await
                .map(|user_posts| user_posts.posts)
        })
    }

    /// Сохранённая тема интерфейса.
    pub fn theme(&self) -> Option<Theme> {
        self.session.theme()
    }

    /// Сохраняет тему интерфейса. От сессии не зависит.
    pub fn set_theme(&self, theme: Theme) -> PulseResult<()> {
        self.session.set_theme(theme)?;
        Ok(())
    }

    fn require_session(&self) -> PulseResult<(String, String)> {
        let session = self.session.session();
        match (session.token(), session.user_id()) {
            (Some(token), Some(user_id)) => Ok((token.to_string(), user_id.to_string())),
            _ => Err(PulseClientError::Auth),
        }
    }

    /// Отказ авторизации от сервера означает протухший токен:
    /// сессия сбрасывается, чтобы дальше клиент вёл себя как неавторизованный.
    fn note_auth_failure<T>(&mut self, result: &PulseResult<T>) {
        if let Err(err) = result
            && err.is_auth()
        {
            debug!("server rejected token, dropping session");
            if let Err(store_err) = self.session.logout() {
                debug!(error = %store_err, "failed to clear stored session");
            }
        }
    }
}
