use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Тип медиа-вложения поста.
pub enum MediaType {
    /// Только текст, без вложения.
    Text,
    /// Картинка (data-URI или внешний URL).
    Image,
    /// Видео по URL.
    Video,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
        };
        f.write_str(name)
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            other => Err(format!("unknown media type: {other}")),
        }
    }
}

/// Сервер в разных ответах отдаёт идентификатор поста то числом, то строкой.
/// Нормализуем оба варианта в строку.
fn post_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Num(i64),
        Str(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Num(num) => num.to_string(),
        RawId::Str(raw) => raw,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Пост пользователя: текст, опциональное медиа и счётчики вовлечённости.
///
/// Имена полей на проводе — PascalCase (`Content`, `MediaURL`, ...), как их
/// отдаёт API. Счётчики присутствуют не во всех развёртываниях, поэтому при
/// отсутствии читаются нулями.
pub struct Post {
    /// Идентификатор поста (ключ `PostID`, в части ответов — `id`).
    #[serde(rename = "PostID", alias = "id", deserialize_with = "post_id")]
    pub id: String,
    /// Текст поста.
    #[serde(rename = "Content")]
    pub content: String,
    /// Тип вложения.
    #[serde(rename = "MediaType")]
    pub media_type: MediaType,
    /// URL вложения (или data-URI); отсутствует у чисто текстовых постов.
    #[serde(rename = "MediaURL", default)]
    pub media_url: Option<String>,
    /// Момент публикации (UTC, ISO-8601).
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Лайки.
    #[serde(default)]
    pub likes: u64,
    /// Комментарии.
    #[serde(default)]
    pub comments: u64,
    /// Репосты.
    #[serde(default)]
    pub shares: u64,
    /// Просмотры.
    #[serde(default)]
    pub views: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Публичные данные владельца ленты, приходят вместе с его постами.
pub struct UserInfo {
    /// Логин.
    pub username: String,
    /// Аватар как data-URI.
    pub picture: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Ответ после успешного входа.
pub struct AuthResponse {
    /// Bearer-токен для защищённых операций.
    pub token: String,
    /// Идентификатор вошедшего пользователя.
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Посты пользователя вместе с его профилем.
pub struct UserPosts {
    /// Посты, новые первыми (порядок сервера).
    pub posts: Vec<Post>,
    /// Профиль владельца.
    #[serde(rename = "userInfo")]
    pub user_info: UserInfo,
}
