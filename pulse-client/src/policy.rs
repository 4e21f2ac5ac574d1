use std::str::FromStr;

use crate::error::{PulseClientError, PulseResult};
use crate::models::MediaType;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Параметры развёртывания сервиса.
///
/// Исторически существуют два профиля одного и того же контракта: строгий
/// (короткие посты, только картинки, без счётчиков) и расширенный. Вместо
/// двух веток кода — одна структура с двумя пресетами.
pub struct PostPolicy {
    max_content_len: Option<usize>,
    allowed_media: Vec<MediaType>,
    engagement_counters: bool,
}

impl PostPolicy {
    /// Строгий профиль: текст до 200 символов, вложения только картинки,
    /// счётчики вовлечённости не отдаются.
    pub fn strict() -> Self {
        Self {
            max_content_len: Some(200),
            allowed_media: vec![MediaType::Text, MediaType::Image],
            engagement_counters: false,
        }
    }

    /// Расширенный профиль: длина не ограничена, любые типы медиа,
    /// счётчики вовлечённости присутствуют в ответах.
    pub fn extended() -> Self {
        Self {
            max_content_len: None,
            allowed_media: vec![MediaType::Text, MediaType::Image, MediaType::Video],
            engagement_counters: true,
        }
    }

    /// Проверяет пост до отправки. Ошибка здесь означает, что сетевой
    /// запрос не выполнялся.
    pub fn validate(&self, content: &str, media_type: MediaType) -> PulseResult<()> {
        if content.trim().is_empty() {
            return Err(PulseClientError::Validation(
                "content must not be empty".to_string(),
            ));
        }

        if let Some(max) = self.max_content_len {
            let len = content.chars().count();
            if len > max {
                return Err(PulseClientError::Validation(format!(
                    "content is {len} chars, limit is {max}"
                )));
            }
        }

        if !self.allowed_media.contains(&media_type) {
            return Err(PulseClientError::Validation(format!(
                "media type {media_type} is not allowed by this profile"
            )));
        }

        Ok(())
    }

    /// Максимальная длина текста, если профиль её ограничивает.
    pub fn max_content_len(&self) -> Option<usize> {
        self.max_content_len
    }

    /// Отдаёт ли сервер счётчики вовлечённости в этом профиле.
    pub fn engagement_counters(&self) -> bool {
        self.engagement_counters
    }
}

impl Default for PostPolicy {
    fn default() -> Self {
        Self::strict()
    }
}

impl FromStr for PostPolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::strict()),
            "extended" => Ok(Self::extended()),
            other => Err(format!("unknown profile: {other} (strict|extended)")),
        }
    }
}
