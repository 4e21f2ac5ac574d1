use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Сохранённая тема интерфейса. Живёт рядом с сессией, но от неё не зависит:
/// logout тему не трогает.
pub enum Theme {
    /// Светлая тема.
    Light,
    /// Тёмная тема.
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => f.write_str("light"),
            Self::Dark => f.write_str("dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Текущее представление клиента о своей авторизации.
///
/// Инвариант: токен и идентификатор пользователя либо оба присутствуют,
/// либо оба отсутствуют.
pub struct Session {
    token: Option<String>,
    user_id: Option<String>,
}

impl Session {
    /// Неавторизованная сессия.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn authenticated(token: String, user_id: String) -> Self {
        Self {
            token: Some(token),
            user_id: Some(user_id),
        }
    }

    /// Bearer-токен, если сессия авторизована.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Идентификатор пользователя, если сессия авторизована.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// true, если токен присутствует.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Долговременное хранилище сессии и темы — шов для внедрения зависимостей.
///
/// Реализация отвечает за инвариант «оба-или-ничего»: `load` обязана вернуть
/// `None`, если сохранена только половина пары.
pub trait SessionStore {
    /// Читает сохранённую пару (token, userId). Отсутствие значений — не ошибка.
    fn load(&self) -> Option<(String, String)>;

    /// Сохраняет пару целиком.
    fn save(&self, token: &str, user_id: &str) -> Result<(), StoreError>;

    /// Удаляет сохранённую пару. Повторный вызов — no-op.
    fn clear(&self) -> Result<(), StoreError>;

    /// Читает сохранённую тему.
    fn load_theme(&self) -> Option<Theme>;

    /// Сохраняет тему.
    fn save_theme(&self, theme: Theme) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
/// Хранилище в памяти — для тестов и короткоживущих клиентов.
pub struct MemoryStore {
    session: Mutex<Option<(String, String)>>,
    theme: Mutex<Option<Theme>>,
}

impl MemoryStore {
    /// Пустое хранилище.
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Option<(String, String)> {
        lock_or_recover(&self.session).clone()
    }

    fn save(&self, token: &str, user_id: &str) -> Result<(), StoreError> {
        *lock_or_recover(&self.session) = Some((token.to_string(), user_id.to_string()));
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *lock_or_recover(&self.session) = None;
        Ok(())
    }

    fn load_theme(&self) -> Option<Theme> {
        *lock_or_recover(&self.theme)
    }

    fn save_theme(&self, theme: Theme) -> Result<(), StoreError> {
        *lock_or_recover(&self.theme) = Some(theme);
        Ok(())
    }
}

impl<S: SessionStore + ?Sized> SessionStore for &S {
    fn load(&self) -> Option<(String, String)> {
        (**self).load()
    }

    fn save(&self, token: &str, user_id: &str) -> Result<(), StoreError> {
        (**self).save(token, user_id)
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }

    fn load_theme(&self) -> Option<Theme> {
        (**self).load_theme()
    }

    fn save_theme(&self, theme: Theme) -> Result<(), StoreError> {
        (**self).save_theme(theme)
    }
}

#[derive(Debug)]
/// Единственный владелец сессии и побочных эффектов её персистентности.
pub struct SessionManager<S: SessionStore> {
    store: S,
    session: Session,
}

impl<S: SessionStore> SessionManager<S> {
    /// Создаёт менеджер и сразу восстанавливает сессию из хранилища.
    pub fn new(store: S) -> Self {
        let mut manager = Self {
            store,
            session: Session::empty(),
        };
        manager.restore();
        manager
    }

    /// Перечитывает сессию из хранилища. Никогда не падает: любые проблемы
    /// чтения дают неавторизованную сессию.
    pub fn restore(&mut self) -> &Session {
        self.session = match self.store.load() {
            Some((token, user_id)) if !token.trim().is_empty() && !user_id.trim().is_empty() => {
                Session::authenticated(token, user_id)
            }
            _ => Session::empty(),
        };
        &self.session
    }

    /// Авторизует сессию: сначала персистентная запись, затем память,
    /// поэтому наблюдаемо либо происходит всё, либо ничего.
    pub fn login(&mut self, token: &str, user_id: &str) -> Result<(), StoreError> {
        self.store.save(token, user_id)?;
        self.session = Session::authenticated(token.to_string(), user_id.to_string());
        Ok(())
    }

    /// Сбрасывает сессию в памяти и в хранилище. Идемпотентен.
    pub fn logout(&mut self) -> Result<(), StoreError> {
        self.session = Session::empty();
        self.store.clear()
    }

    /// true, если в сессии есть токен.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Текущая сессия.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Сохранённая тема интерфейса.
    pub fn theme(&self) -> Option<Theme> {
        self.store.load_theme()
    }

    /// Сохраняет тему интерфейса. От сессии не зависит.
    pub fn set_theme(&self, theme: Theme) -> Result<(), StoreError> {
        self.store.save_theme(theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_then_restore_round_trips_pair() {
        let store = MemoryStore::new();
        let mut manager = SessionManager::new(&store);
        manager.login("t1", "u1").expect("login should persist");

        // Имитация перезапуска: новый менеджер поверх того же хранилища.
        let reloaded = SessionManager::new(&store);
        assert!(reloaded.is_authenticated());
        assert_eq!(reloaded.session().token(), Some("t1"));
        assert_eq!(reloaded.session().user_id(), Some("u1"));
    }

    #[test]
    fn logout_clears_session_and_is_idempotent() {
        let mut manager = SessionManager::new(MemoryStore::new());
        manager.login("t1", "u1").expect("login should persist");

        manager.logout().expect("first logout");
        assert!(!manager.is_authenticated());
        assert_eq!(manager.session(), &Session::empty());

        manager.logout().expect("second logout is a no-op");
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn restore_treats_blank_halves_as_absent() {
        struct HalfStore;
        impl SessionStore for HalfStore {
            fn load(&self) -> Option<(String, String)> {
                Some(("t1".to_string(), "   ".to_string()))
            }
            fn save(&self, _: &str, _: &str) -> Result<(), StoreError> {
                Ok(())
            }
            fn clear(&self) -> Result<(), StoreError> {
                Ok(())
            }
            fn load_theme(&self) -> Option<Theme> {
                None
            }
            fn save_theme(&self, _: Theme) -> Result<(), StoreError> {
                Ok(())
            }
        }

        let manager = SessionManager::new(HalfStore);
        assert!(!manager.is_authenticated());
        assert_eq!(manager.session().token(), None);
    }

    #[test]
    fn failed_save_leaves_session_unauthenticated() {
        struct BrokenStore;
        impl SessionStore for BrokenStore {
            fn load(&self) -> Option<(String, String)> {
                None
            }
            fn save(&self, _: &str, _: &str) -> Result<(), StoreError> {
                Err(StoreError("disk full".to_string()))
            }
            fn clear(&self) -> Result<(), StoreError> {
                Ok(())
            }
            fn load_theme(&self) -> Option<Theme> {
                None
            }
            fn save_theme(&self, _: Theme) -> Result<(), StoreError> {
                Ok(())
            }
        }

        let mut manager = SessionManager::new(BrokenStore);
        assert!(manager.login("t1", "u1").is_err());
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn theme_survives_logout() {
        let mut manager = SessionManager::new(MemoryStore::new());
        manager.login("t1", "u1").expect("login should persist");
        manager.set_theme(Theme::Dark).expect("save theme");

        manager.logout().expect("logout");
        assert_eq!(manager.theme(), Some(Theme::Dark));
    }
}
