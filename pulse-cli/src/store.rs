use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use pulse_client::{SessionStore, StoreError, Theme};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredState {
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    theme: Option<Theme>,
}

#[derive(Debug, Clone)]
/// Файловое хранилище сессии и темы: один JSON-файл с фиксированными
/// ключами `token`, `userId`, `theme`.
///
/// Сброс сессии тему не трогает — это независимая настройка интерфейса.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> StoredState {
        // Отсутствующий или битый файл равнозначен пустому состоянию.
        let Ok(raw) = fs::read_to_string(&self.path) else {
            return StoredState::default();
        };
        serde_json::from_str(&raw).unwrap_or_default()
    }

    fn write(&self, state: &StoredState) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(state)
            .map_err(|err| StoreError(format!("serialize session state: {err}")))?;
        fs::write(&self.path, raw)
            .map_err(|err| StoreError(format!("write {}: {err}", self.path.display())))
    }
}

impl SessionStore for FileStore {
    fn load(&self) -> Option<(String, String)> {
        let state = self.read();
        // Половина пары — как будто не сохранено ничего.
        match (state.token, state.user_id) {
            (Some(token), Some(user_id)) => Some((token, user_id)),
            _ => None,
        }
    }

    fn save(&self, token: &str, user_id: &str) -> Result<(), StoreError> {
        let mut state = self.read();
        state.token = Some(token.to_string());
        state.user_id = Some(user_id.to_string());
        self.write(&state)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut state = self.read();
        state.token = None;
        state.user_id = None;
        self.write(&state)
    }

    fn load_theme(&self) -> Option<Theme> {
        self.read().theme
    }

    fn save_theme(&self, theme: Theme) -> Result<(), StoreError> {
        let mut state = self.read();
        state.theme = Some(theme);
        self.write(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock must be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("pulse_{name}_{nanos}.json"))
    }

    #[test]
    fn save_then_load_round_trips_pair() {
        let path = temp_path("round_trip");
        let store = FileStore::new(&path);
        store.save("t1", "u1").expect("save");
        assert_eq!(store.load(), Some(("t1".to_string(), "u1".to_string())));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let store = FileStore::new(temp_path("missing"));
        assert!(store.load().is_none());
        assert!(store.load_theme().is_none());
    }

    #[test]
    fn corrupt_file_loads_as_empty() {
        let path = temp_path("corrupt");
        fs::write(&path, "{not json").expect("seed corrupt file");
        let store = FileStore::new(&path);
        assert!(store.load().is_none());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn half_pair_loads_as_empty() {
        let path = temp_path("half");
        fs::write(&path, r#"{"token":"t1"}"#).expect("seed half pair");
        let store = FileStore::new(&path);
        assert!(store.load().is_none());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn clear_keeps_theme() {
        let path = temp_path("theme");
        let store = FileStore::new(&path);
        store.save("t1", "u1").expect("save");
        store.save_theme(Theme::Dark).expect("save theme");

        store.clear().expect("clear");
        assert!(store.load().is_none());
        assert_eq!(store.load_theme(), Some(Theme::Dark));

        store.clear().expect("clear is idempotent");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn stored_file_uses_fixed_wire_keys() {
        let path = temp_path("keys");
        let store = FileStore::new(&path);
        store.save("t1", "u1").expect("save");
        store.save_theme(Theme::Light).expect("save theme");

        let raw = fs::read_to_string(&path).expect("read state file");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("state is json");
        assert_eq!(value["token"], "t1");
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["theme"], "light");

        let _ = fs::remove_file(&path);
    }
}
