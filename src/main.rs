use std::sync::Arc;
use threadchat::config::AppConfig;
use threadchat::groq_client::GroqClient;
use threadchat::handlers::ui::Templates;
use threadchat::middleware::auth::SessionKeys;
use threadchat::store::{ChatStore, MemoryChatStore, PgChatStore};
use threadchat::workflow::checkpoint::{Checkpointer, MemoryCheckpointer, PgCheckpointer};
use threadchat::workflow::graph::ChatPipeline;
use threadchat::{build_router, db, AppState};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Database-backed stores when DATABASE_URL is set, in-process otherwise
    let (store, checkpointer, persistent): (Arc<dyn ChatStore>, Arc<dyn Checkpointer>, bool) =
        match config.database_url.as_deref() {
            Some(db_url) => {
                let pool = db::create_pool(db_url, config.db_max_connections)
                    .await
                    .expect("Failed to create database pool.");
                (
                    Arc::new(PgChatStore::new(pool.clone())),
                    Arc::new(PgCheckpointer::new(pool)),
                    true,
                )
            }
            None => {
                tracing::warn!("DATABASE_URL not found. Users, chats and history will be kept in memory only.");
                (Arc::new(MemoryChatStore::new()), Arc::new(MemoryCheckpointer::new()), false)
            }
        };

    store.init_schema().await.expect("Failed to create user tables");
    checkpointer.setup().await.expect("Failed to setup conversation checkpointing");

    tracing::info!("Initializing Groq client ({})...", config.groq_model);
    let model = GroqClient::new(
        config.groq_api_key.clone(),
        config.groq_model.clone(),
        config.groq_base_url.clone(),
        config.llm_timeout,
    );

    if config.session_secret_is_default {
        tracing::warn!("SESSION_SECRET not set. Using a development secret; sessions are forgeable.");
    }

    let shared_state = Arc::new(AppState {
        store,
        pipeline: ChatPipeline::new(Arc::new(model), checkpointer),
        sessions: SessionKeys::new(&config.session_secret, config.session_ttl_hours),
        templates: Templates::new().expect("Failed to compile page templates"),
        persistent,
    });

    let app = build_router(shared_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>())
        .await
        .expect("Server error");
}

// Production-grade logging configuration
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Get log level from environment or default to INFO for production
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,threadchat=trace,sqlx=info,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,threadchat=info,sqlx=warn,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        // JSON logging for production (easier for log aggregation)
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("💬 Chat service starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Build mode: {}", if cfg!(debug_assertions) { "development" } else { "production" });
    tracing::info!("Log level: {}", log_level);

    let db_configured = std::env::var("DATABASE_URL").is_ok();
    let groq_configured = std::env::var("GROQ_API_KEY").is_ok();
    tracing::info!(
        "Configuration - Database: {}, Groq: {}",
        if db_configured { "✅" } else { "❌" },
        if groq_configured { "✅" } else { "❌" }
    );

    Ok(())
}
