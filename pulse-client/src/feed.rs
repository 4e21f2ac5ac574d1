use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::PulseResult;
use crate::models::Post;

/// Пауза перед сверкой с сервером после мутации.
pub const RECONCILE_DELAY: Duration = Duration::from_secs(2);

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Debug)]
/// Локальное представление списка постов с двухфазным обновлением.
///
/// Мутация применяется к списку сразу (оптимистично), а через фиксированную
/// паузу список заменяется авторитетным состоянием сервера. Новая мутация
/// отменяет ещё не выполненную сверку: устаревший ответ не должен затирать
/// более свежее оптимистичное состояние.
///
/// Сверка — не повтор запроса: если она не удалась, остаётся оптимистичное
/// состояние и новых попыток не делается.
pub struct FeedView {
    posts: Arc<Mutex<Vec<Post>>>,
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl FeedView {
    /// Пустая лента со стандартной паузой сверки (2 секунды).
    pub fn new() -> Self {
        Self::with_delay(RECONCILE_DELAY)
    }

    /// Пустая лента с заданной паузой сверки. В тестах пауза сокращается.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            posts: Arc::new(Mutex::new(Vec::new())),
            delay,
            pending: None,
        }
    }

    /// Полностью заменяет список (первичная загрузка).
    pub fn replace(&self, posts: Vec<Post>) {
        *lock_or_recover(&self.posts) = posts;
    }

    /// Копия текущего списка.
    pub fn snapshot(&self) -> Vec<Post> {
        lock_or_recover(&self.posts).clone()
    }

    /// Оптимистично добавляет свежесозданный пост в начало списка.
    pub fn apply_created(&self, post: Post) {
        lock_or_recover(&self.posts).insert(0, post);
    }

    /// Оптимистично убирает удалённый пост из списка.
    pub fn apply_deleted(&self, post_id: &str) {
        lock_or_recover(&self.posts).retain(|post| post.id != post_id);
    }

    /// Ставит сверку с сервером: после паузы `fetch` выполняется и его
    /// результат замещает список. Предыдущая незавершённая сверка при этом
    /// отменяется — действует последняя мутация.
    pub fn schedule_reconcile<F>(&mut self, fetch: F)
    where
        F: Future<Output = PulseResult<Vec<Post>>> + Send + 'static,
    {
        if let Some(stale) = self.pending.take() {
            stale.abort();
        }

        let posts = Arc::clone(&self.posts);
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match fetch.await {
                Ok(fresh) => *lock_or_recover(&posts) = fresh,
                Err(err) => {
                    warn!(error = %err, "reconcile fetch failed, keeping optimistic state");
                }
            }
        }));
    }

    /// Дожидается завершения отложенной сверки, если она есть.
    pub async fn wait_reconcile(&mut self) {
        if let Some(pending) = self.pending.take() {
            // Отменённая задача отдаёт JoinError — для ожидающего это штатно.
            let _ = pending.await;
        }
    }
}

impl Default for FeedView {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FeedView {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::models::MediaType;

    fn post(id: &str, content: &str) -> Post {
        Post {
            id: id.to_string(),
            content: content.to_string(),
            media_type: MediaType::Text,
            media_url: None,
            timestamp: Utc::now(),
            likes: 0,
            comments: 0,
            shares: 0,
            views: 0,
        }
    }

    #[tokio::test]
    async fn optimistic_create_is_visible_before_reconcile() {
        let mut feed = FeedView::with_delay(Duration::from_millis(20));
        feed.replace(vec![post("1", "old")]);

        feed.apply_created(post("2", "hello"));
        let snapshot = feed.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].content, "hello");

        // Сервер уже проставил счётчики — после сверки они видны.
        let mut confirmed = post("2", "hello");
        confirmed.views = 7;
        let authoritative = vec![confirmed, post("1", "old")];
        feed.schedule_reconcile(async move { Ok(authoritative) });
        feed.wait_reconcile().await;

        let snapshot = feed.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].views, 7);
    }

    #[tokio::test]
    async fn optimistic_delete_removes_post_immediately() {
        let mut feed = FeedView::with_delay(Duration::from_millis(20));
        feed.replace(vec![post("1", "keep"), post("2", "drop")]);

        feed.apply_deleted("2");
        assert_eq!(feed.snapshot().len(), 1);

        feed.schedule_reconcile(async { Ok(vec![post("1", "keep")]) });
        feed.wait_reconcile().await;
        assert_eq!(feed.snapshot().len(), 1);
        assert_eq!(feed.snapshot()[0].id, "1");
    }

    #[tokio::test]
    async fn newer_mutation_cancels_pending_reconcile() {
        static STALE_FETCHES: AtomicUsize = AtomicUsize::new(0);

        let mut feed = FeedView::with_delay(Duration::from_millis(50));
        feed.apply_created(post("1", "first"));
        feed.schedule_reconcile(async {
            STALE_FETCHES.fetch_add(1, Ordering::SeqCst);
            Ok(vec![post("1", "first")])
        });

        // Вторая мутация до истечения паузы: первая сверка не должна
        // ни выполниться, ни затереть список.
        feed.apply_created(post("2", "second"));
        feed.schedule_reconcile(async { Ok(vec![post("2", "second"), post("1", "first")]) });
        feed.wait_reconcile().await;

        assert_eq!(STALE_FETCHES.load(Ordering::SeqCst), 0);
        let snapshot = feed.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, "2");
    }

    #[tokio::test]
    async fn failed_reconcile_keeps_optimistic_state() {
        let mut feed = FeedView::with_delay(Duration::from_millis(10));
        feed.apply_created(post("1", "optimistic"));

        feed.schedule_reconcile(async {
            Err(crate::error::PulseClientError::Server {
                status: 500,
                message: "boom".to_string(),
            })
        });
        feed.wait_reconcile().await;

        let snapshot = feed.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].content, "optimistic");
    }
}
