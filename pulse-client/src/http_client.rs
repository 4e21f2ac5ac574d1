use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use reqwest::{Client, Method, header};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::error::{PulseClientError, PulseResult};
use crate::models::{AuthResponse, MediaType, Post, UserPosts};

#[derive(Debug, Serialize)]
struct LoginRequestDto<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequestDto<'a> {
    username: &'a str,
    password: &'a str,
    picture: &'a str,
}

#[derive(Debug, Serialize)]
struct PostBodyDto<'a> {
    #[serde(rename = "Content")]
    content: &'a str,
    #[serde(rename = "MediaType")]
    media_type: MediaType,
    #[serde(rename = "MediaURL")]
    media_url: Option<&'a str>,
    #[serde(rename = "Timestamp")]
    timestamp: chrono::DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponseDto {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostEnvelopeDto {
    data: Post,
}

#[derive(Debug, Clone)]
/// Низкоуровневый HTTP-клиент REST API сервиса постов.
///
/// Не владеет сессией: токен и userId передаются в каждую защищённую
/// операцию явно. Поверх него работает фасад [`crate::PulseClient`].
pub struct HttpClient {
    base_url: String,
    client: Client,
}

impl HttpClient {
    /// Создаёт новый HTTP-клиент с базовым URL сервера.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn decode_error(response: reqwest::Response) -> PulseClientError {
        let status = response.status();

        let message = match response.json::<ErrorResponseDto>().await {
            Ok(body) => body
                .message
                .unwrap_or_else(|| format!("http status {status}")),
            Err(_) => format!("http status {status}"),
        };
        PulseClientError::from_http_status(status, Some(message))
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> PulseResult<T> {
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(PulseClientError::from_reqwest)
    }

    /// универсальный helper для запросов с json-телом
    async fn send_json<TReq, TRes>(
        &self,
        method: Method,
        path: &str,
        body: &TReq,
        token: Option<&str>,
    ) -> PulseResult<TRes>
    where
        TReq: Serialize,
        TRes: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!(%method, %url, "sending request");

        let mut request = self.client.request(method, url).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(PulseClientError::from_reqwest)?;
        Self::read_json(response).await
    }

    /// Публичная лента: все посты, новые первыми (порядок сервера).
    pub async fn list_public_posts(&self) -> PulseResult<Vec<Post>> {
        let url = self.endpoint("/api/posts");
        debug!(%url, "fetching public feed");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(PulseClientError::from_reqwest)?;
        Self::read_json(response).await
    }

    /// Вход: сервер ждёт и Basic-заголовок, и те же учётные данные в теле.
    pub async fn login(&self, username: &str, password: &str) -> PulseResult<AuthResponse> {
        let url = self.endpoint("/api/login");
        debug!(%url, %username, "logging in");

        let basic = BASE64.encode(format!("{username}:{password}"));
        let payload = LoginRequestDto { username, password };

        let response = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, format!("Basic {basic}"))
            .json(&payload)
            .send()
            .await
            .map_err(PulseClientError::from_reqwest)?;
        Self::read_json(response).await
    }

    /// Регистрация нового пользователя с аватаром (data-URI).
    ///
    /// Успешный ответ тела не несёт.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        picture: &str,
    ) -> PulseResult<()> {
        let url = self.endpoint("/api/register");
        debug!(%url, %username, "registering");

        let payload = RegisterRequestDto {
            username,
            password,
            picture,
        };

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(PulseClientError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        Ok(())
    }

    /// Посты пользователя вместе с его профилем.
    ///
    /// Требует валидный Bearer-токен.
    pub async fn list_user_posts(&self, token: &str, user_id: &str) -> PulseResult<UserPosts> {
        let url = self.endpoint(&format!("/api/{user_id}/posts"));
        debug!(%url, "fetching user posts");

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(PulseClientError::from_reqwest)?;
        Self::read_json(response).await
    }

    /// Создаёт пост. Метка времени проставляется клиентом, как и в
    /// остальных мутациях этого API.
    pub async fn create_post(
        &self,
        token: &str,
        content: &str,
        media_type: MediaType,
        media_url: Option<&str>,
    ) -> PulseResult<Post> {
        let payload = PostBodyDto {
            content,
            media_type,
            media_url,
            timestamp: Utc::now(),
        };
        let envelope: PostEnvelopeDto = self
            .send_json(Method::POST, "/api/posts", &payload, Some(token))
            .await?;

        Ok(envelope.data)
    }

    /// Обновляет пост по идентификатору.
    ///
    /// Требует валидный Bearer-токен.
    pub async fn update_post(
        &self,
        token: &str,
        post_id: &str,
        content: &str,
        media_type: MediaType,
        media_url: Option<&str>,
    ) -> PulseResult<Post> {
        let payload = PostBodyDto {
            content,
            media_type,
            media_url,
            timestamp: Utc::now(),
        };
        let envelope: PostEnvelopeDto = self
            .send_json(
                Method::PUT,
                &format!("/api/posts/{post_id}"),
                &payload,
                Some(token),
            )
            .await?;

        Ok(envelope.data)
    }

    /// Удаляет пост пользователя. Тело успешного ответа не гарантировано,
    /// поэтому читается только статус.
    pub async fn delete_post(&self, token: &str, user_id: &str, post_id: &str) -> PulseResult<()> {
        let url = self.endpoint(&format!("/api/{user_id}/posts/{post_id}"));
        debug!(%url, "deleting post");

        let response = self
            .client
            .delete(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(PulseClientError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_normalizes_slashes() {
        let client = HttpClient::new("http://localhost:3003/");
        let full = client.endpoint("/api/posts");
        assert_eq!(full, "http://localhost:3003/api/posts");
    }

    #[test]
    fn post_body_uses_wire_field_names() {
        let payload = PostBodyDto {
            content: "hello",
            media_type: MediaType::Text,
            media_url: None,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&payload).expect("serialize post body");
        assert_eq!(json["Content"], "hello");
        assert_eq!(json["MediaType"], "text");
        assert!(json["MediaURL"].is_null());
        assert!(json["Timestamp"].is_string());
    }

    #[test]
    fn basic_credentials_encode_like_the_browser() {
        let encoded = BASE64.encode("alice:pw");
        assert_eq!(encoded, "YWxpY2U6cHc=");
    }
}
