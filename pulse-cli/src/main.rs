mod store;

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pulse_client::{
    FeedView, MediaType, Post, PostPolicy, PulseClient, PulseClientError, Theme, UserPosts,
};
use store::FileStore;

const SESSION_FILE: &str = ".pulse_session";
const DEFAULT_SERVER: &str = "http://127.0.0.1:3003";

#[derive(Debug, Parser)]
#[command(name = "pulse-cli", version, about = "CLI клиент сервиса микропостов")]
struct Cli {
    /// Адрес API-сервера (или переменная PULSE_SERVER).
    #[arg(long, global = true)]
    server: Option<String>,

    /// Профиль развёртывания: strict | extended (или PULSE_PROFILE).
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Файл сессии (или PULSE_SESSION_FILE).
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Регистрация пользователя с аватаром.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Путь к файлу картинки; уйдёт на сервер как data-URI.
        #[arg(long)]
        picture: PathBuf,
    },
    /// Вход пользователя (сессия сохраняется в файл).
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Сброс сессии.
    Logout,
    /// Публичная лента (авторизация не нужна).
    Feed,
    /// Посты текущего пользователя (требует вход).
    Posts,
    /// Создание поста (требует вход).
    Create {
        #[arg(long)]
        content: String,
        /// Тип вложения: text | image | video.
        #[arg(long, default_value = "text")]
        media: String,
        /// URL или data-URI вложения.
        #[arg(long)]
        media_url: Option<String>,
        /// После создания подождать сверку с сервером и показать итоговый список.
        #[arg(long)]
        wait_sync: bool,
    },
    /// Обновление поста (требует вход).
    Update {
        #[arg(long)]
        id: String,
        #[arg(long)]
        content: String,
        #[arg(long, default_value = "text")]
        media: String,
        #[arg(long)]
        media_url: Option<String>,
    },
    /// Удаление поста (требует вход).
    Delete {
        #[arg(long)]
        id: String,
        /// После удаления подождать сверку с сервером и показать итоговый список.
        #[arg(long)]
        wait_sync: bool,
    },
    /// Тема интерфейса, хранится рядом с сессией, но от неё не зависит.
    #[command(subcommand)]
    Theme(ThemeCommand),
}

#[derive(Debug, Subcommand)]
enum ThemeCommand {
    /// Показать сохранённую тему.
    Get,
    /// Сохранить тему: light | dark.
    Set { theme: String },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_logging();

    if let Err(err) = run().await {
        eprintln!("Ошибка: {err}");
        process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init()
        .ok();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let server = resolve_server(cli.server);
    let policy = resolve_policy(cli.profile)?;
    let session_path = resolve_session_file(cli.session_file);
    let store = FileStore::new(session_path.clone());
    let mut client = PulseClient::new(server, store, policy);

    match cli.command {
        Command::Register {
            username,
            password,
            picture,
        } => {
            let picture = data_uri(&picture)
                .with_context(|| format!("не удалось прочитать {}", picture.display()))?;
            client
                .register(&username, &password, &picture)
                .await
                .map_err(map_client_error)?;
            println!("Регистрация успешна, теперь выполните `pulse-cli login`");
        }
        Command::Login { username, password } => {
            let auth = client
                .login(&username, &password)
                .await
                .map_err(map_client_error)?;
            println!("Вход выполнен");
            println!("userId: {}", auth.user_id);
        }
        Command::Logout => {
            client.logout().map_err(map_client_error)?;
            println!("Сессия сброшена ({})", session_path.display());
        }
        Command::Feed => {
            let posts = client.public_feed().await.map_err(map_client_error)?;
            print_posts("Публичная лента", &posts, client.policy());
        }
        Command::Posts => {
            let listed = client.my_posts().await.map_err(map_client_error)?;
            print_user_posts(&listed, client.policy());
        }
        Command::Create {
            content,
            media,
            media_url,
            wait_sync,
        } => {
            let media_type = parse_media(&media)?;
            let post = client
                .create_post(&content, media_type, media_url.as_deref())
                .await
                .map_err(map_client_error)?;
            print_post("Пост создан", &post, client.policy());

            if wait_sync {
                let mut feed = FeedView::new();
                feed.apply_created(post);
                feed.schedule_reconcile(client.my_posts_refetch().map_err(map_client_error)?);
                println!("Ожидание сверки с сервером...");
                feed.wait_reconcile().await;
                print_posts("Посты после сверки", &feed.snapshot(), client.policy());
            }
        }
        Command::Update {
            id,
            content,
            media,
            media_url,
        } => {
            let media_type = parse_media(&media)?;
            let post = client
                .update_post(&id, &content, media_type, media_url.as_deref())
                .await
                .map_err(map_client_error)?;
            print_post("Пост обновлён", &post, client.policy());
        }
        Command::Delete { id, wait_sync } => {
            client.delete_post(&id).await.map_err(map_client_error)?;
            println!("Пост удалён: id={id}");

            if wait_sync {
                let mut feed = FeedView::new();
                feed.apply_deleted(&id);
                feed.schedule_reconcile(client.my_posts_refetch().map_err(map_client_error)?);
                println!("Ожидание сверки с сервером...");
                feed.wait_reconcile().await;
                print_posts("Посты после сверки", &feed.snapshot(), client.policy());
            }
        }
        Command::Theme(ThemeCommand::Get) => match client.theme() {
            Some(theme) => println!("Тема: {theme}"),
            None => println!("Тема не сохранена (по умолчанию light)"),
        },
        Command::Theme(ThemeCommand::Set { theme }) => {
            let theme: Theme = theme.parse().map_err(anyhow::Error::msg)?;
            client.set_theme(theme).map_err(map_client_error)?;
            println!("Тема сохранена: {theme}");
        }
    }

    Ok(())
}

fn resolve_server(server: Option<String>) -> String {
    let raw = server
        .or_else(|| std::env::var("PULSE_SERVER").ok())
        .unwrap_or_else(|| DEFAULT_SERVER.to_string());
    normalize_server(raw)
}

fn normalize_server(server: String) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        return server;
    }

    format!("http://{server}")
}

fn resolve_policy(profile: Option<String>) -> Result<PostPolicy> {
    let raw = profile
        .or_else(|| std::env::var("PULSE_PROFILE").ok())
        .unwrap_or_else(|| "strict".to_string());
    raw.parse::<PostPolicy>().map_err(anyhow::Error::msg)
}

fn resolve_session_file(path: Option<PathBuf>) -> PathBuf {
    path.or_else(|| std::env::var("PULSE_SESSION_FILE").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(SESSION_FILE))
}

fn parse_media(raw: &str) -> Result<MediaType> {
    raw.parse::<MediaType>().map_err(anyhow::Error::msg)
}

/// Упаковывает файл картинки в data-URI, как это делает браузерный загрузчик.
fn data_uri(path: &std::path::Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let mime = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    };
    Ok(format!("data:{mime};base64,{}", BASE64.encode(bytes)))
}

fn map_client_error(err: PulseClientError) -> anyhow::Error {
    let message = match err {
        PulseClientError::Auth => {
            "требуется авторизация: выполните `pulse-cli login ...`".to_string()
        }
        PulseClientError::NotFound => "пост не найден или принадлежит не вам".to_string(),
        PulseClientError::Validation(message) => format!("пост не прошёл проверку: {message}"),
        PulseClientError::Server { status, message } => {
            format!("ошибка сервера ({status}): {message}")
        }
        PulseClientError::Network(err) => format!("сетевая ошибка: {err}"),
        PulseClientError::Store(err) => format!("ошибка файла сессии: {err}"),
    };
    anyhow::anyhow!(message)
}

fn print_post(title: &str, post: &Post, policy: &PostPolicy) {
    println!("{title}");
    println!("id: {}", post.id);
    println!("content: {}", post.content);
    println!("media: {}", post.media_type);
    if let Some(url) = &post.media_url {
        println!("media_url: {url}");
    }
    println!("timestamp: {}", post.timestamp);
    if policy.engagement_counters() {
        println!(
            "likes: {}, comments: {}, shares: {}, views: {}",
            post.likes, post.comments, post.shares, post.views
        );
    }
}

fn print_posts(title: &str, posts: &[Post], policy: &PostPolicy) {
    println!("{title} ({} шт.)", posts.len());
    for post in posts {
        if policy.engagement_counters() {
            println!(
                "- [{}] {} ({}, likes={}, views={})",
                post.id, post.content, post.timestamp, post.likes, post.views
            );
        } else {
            println!("- [{}] {} ({})", post.id, post.content, post.timestamp);
        }
    }
}

fn print_user_posts(listed: &UserPosts, policy: &PostPolicy) {
    println!("Пользователь: {}", listed.user_info.username);
    print_posts("Ваши посты", &listed.posts, policy);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_server_keeps_scheme() {
        let s = normalize_server("https://example.com:3003".to_string());
        assert_eq!(s, "https://example.com:3003");
    }

    #[test]
    fn normalize_server_adds_http_scheme() {
        let s = normalize_server("127.0.0.1:3003".to_string());
        assert_eq!(s, "http://127.0.0.1:3003");
    }

    #[test]
    fn resolve_policy_defaults_to_strict() {
        let policy = resolve_policy(None).expect("default profile");
        assert_eq!(policy, PostPolicy::strict());
    }

    #[test]
    fn resolve_policy_rejects_unknown_profile() {
        assert!(resolve_policy(Some("fancy".to_string())).is_err());
    }

    #[test]
    fn parse_media_accepts_known_types() {
        assert_eq!(parse_media("image").expect("image parses"), MediaType::Image);
        assert!(parse_media("gif").is_err());
    }

    #[test]
    fn data_uri_wraps_file_bytes() {
        let path = std::env::temp_dir().join("pulse_cli_data_uri_test.png");
        std::fs::write(&path, b"AB").expect("seed picture file");

        let uri = data_uri(&path).expect("data uri");
        assert_eq!(uri, "data:image/png;base64,QUI=");

        let _ = std::fs::remove_file(&path);
    }
}
