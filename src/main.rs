mod config;
mod db;
mod error;
mod model;
mod routes;
mod services;
mod state;
mod store;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::store::{DocumentStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() {
    let config = config::Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sketchboard=info,tower_http=info")),
        )
        .init();

    let store: Arc<dyn DocumentStore> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = db::init_pool(url, config.db_max_connections)
                .await
                .expect("database init failed");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store, nothing will persist");
            let memory = MemoryStore::new();
            if let Some(token) = config.dev_token.as_deref() {
                let user = memory.add_user("Developer", "dev@localhost", token).await;
                tracing::info!(user_id = %user.id, "seeded development user");
            }
            Arc::new(memory)
        }
    };

    // Shared-element resync runs off the save path.
    let (cascade_tx, _cascade) = services::cascade::spawn_cascade_worker(store.clone(), config.cascade_queue_capacity);

    let port = config.port;
    let state = state::AppState::new(store, config).with_cascade(cascade_tx);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "sketchboard listening");
    axum::serve(listener, app).await.expect("server failed");
}
