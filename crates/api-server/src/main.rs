use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use api_server::http;
use shared::config::{ApiConfig, load_dotenv};
use shared::conversation::ConversationManager;
use shared::dispatch::DispatchEngine;
use shared::llm::{OpenRouterCompleter, OpenRouterCompleterConfig};
use shared::store::{MemoryRideStore, PgRideStore, RideStore};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(err) = load_dotenv() {
        eprintln!("{err}");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "api_server=debug,shared=debug,axum=info".to_string()),
        )
        .init();

    let config = match ApiConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let store: Arc<dyn RideStore> = match &config.database_url {
        Some(database_url) => {
            let store =
                match PgRideStore::connect(database_url, config.database_max_connections).await {
                    Ok(store) => store,
                    Err(err) => {
                        error!("failed to connect to postgres: {err}");
                        std::process::exit(1);
                    }
                };

            let migrator = match sqlx::migrate::Migrator::new(config.migrations_dir.clone()).await {
                Ok(migrator) => migrator,
                Err(err) => {
                    error!("failed to load migrations: {err}");
                    std::process::exit(1);
                }
            };

            if let Err(err) = migrator.run(store.pool()).await {
                error!("failed to run migrations: {err}");
                std::process::exit(1);
            }

            Arc::new(store)
        }
        None => {
            info!("DATABASE_URL not set; using the in-memory store with the demo fleet");
            Arc::new(MemoryRideStore::with_demo_fleet())
        }
    };

    let completer_config = match OpenRouterCompleterConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read completer config: {err}");
            std::process::exit(1);
        }
    };
    let completer = match OpenRouterCompleter::new(completer_config) {
        Ok(completer) => Arc::new(completer),
        Err(err) => {
            error!("failed to build completer: {err}");
            std::process::exit(1);
        }
    };

    let dispatcher = DispatchEngine::new(store.clone());
    let conversation = ConversationManager::new(completer, dispatcher.clone());

    let app = http::build_router(http::AppState {
        store,
        dispatcher,
        conversation,
        admin_updates_wait: Duration::from_secs(config.admin_updates_wait_seconds),
    });

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .unwrap_or_else(|_| "127.0.0.1:8080".parse().expect("valid default bind addr"));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind should succeed");

    info!(
        "api server listening on {}",
        listener.local_addr().unwrap_or(addr)
    );
    axum::serve(listener, app).await.expect("server should run");
}
