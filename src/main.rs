// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;

use classroom_quiz::config::Config;
use classroom_quiz::error::AppError;
use classroom_quiz::routes;
use classroom_quiz::state::AppState;
use classroom_quiz::store::{MemoryStore, PgStore, Store};
use classroom_quiz::utils::hash::hash_password;
use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connected...");

            tracing::info!("Running migrations...");
            store
                .migrate()
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Migrations applied successfully.");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // Seed Teacher Account
    if let Err(e) = seed_teacher(store.as_ref(), &config).await {
        tracing::error!("Failed to seed teacher account: {:?}", e);
    }

    for dir in [&config.upload_dir, &config.export_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .unwrap_or_else(|e| panic!("Failed to create directory {}: {}", dir.display(), e));
    }

    // Create AppState
    let state = AppState::new(store, config.clone());

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    // Start the server
    axum::serve(listener, app).await.unwrap();
}

/// Creates the teacher account from the environment when none exists yet.
async fn seed_teacher(store: &dyn Store, config: &Config) -> Result<(), AppError> {
    if let (Some(username), Some(password)) = (&config.teacher_username, &config.teacher_password) {
        let hashed_password = hash_password(password)?;
        let full_name = config.teacher_full_name.as_deref().unwrap_or(username);

        if store
            .create_first_teacher(username, &hashed_password, full_name)
            .await?
            .is_some()
        {
            tracing::info!("Seeded teacher account: {}", username);
        }
    }
    Ok(())
}
