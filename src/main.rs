use ordered_todos::application::todo_service::TodoServiceImpl;
use ordered_todos::config::{AppConfig, Backend};
use ordered_todos::domain::repository::TodoRepository;
use ordered_todos::http::routing::{self, todos};
use ordered_todos::infrastructure::{memory_repo::InMemoryTodoRepository, sqlite_repo::{prepare_sqlite_file, SqliteTodoRepository}};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env()?;
    match &config.backend {
        Backend::Memory => {
            tracing::warn!("using in-memory store; todos are lost on shutdown");
            serve(InMemoryTodoRepository::new(), &config).await
        }
        Backend::Sqlite { database_url, max_connections } => {
            // Ensure SQLite file can be created/opened when using a file-backed URL
            prepare_sqlite_file(database_url)?;
            let repo = SqliteTodoRepository::connect_with(database_url, *max_connections).await?;
            tracing::info!(%database_url, "sqlite store ready");
            serve(repo, &config).await
        }
    }
}

async fn serve<R: TodoRepository + Clone>(repo: R, config: &AppConfig) -> anyhow::Result<()> {
    repo.init().await?;
    let service = TodoServiceImpl::new(repo);
    let router = routing::app(todos::router(todos::AppState { service }));

    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(tokio::net::TcpListener::bind(config.bind_addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::ctrl_c;
    let _ = ctrl_c().await;
    tracing::info!("shutdown");
}
