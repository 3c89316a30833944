/// Common utilities for load generator tests
///
/// Serves the real API router over an in-memory store on an ephemeral port.

use std::{sync::Arc, time::Duration};
use todo_api::app::{build_router, AppState};
use todo_api::config::Config;
use todo_loadgen::{client::ApiClient, metrics::Metrics};
use todo_shared::store::{MemoryStore, Store};

/// A running API and a client pointed at it
pub struct TestServer {
    pub store: Arc<MemoryStore>,
    pub client: ApiClient,
}

impl TestServer {
    pub async fn start() -> Self {
        let config = Config::from_lookup(|key| match key {
            "STORE_BACKEND" => Some("memory".to_string()),
            _ => None,
        })
        .expect("memory config");

        let store = Arc::new(MemoryStore::new());
        let app = build_router(AppState::new(store.clone(), config));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test api");
        });

        let client = ApiClient::new(
            &format!("http://{}", addr),
            Duration::from_secs(5),
            Arc::new(Metrics::new()),
        )
        .expect("api client");

        Self { store, client }
    }

    pub async fn user_count(&self) -> usize {
        self.store.list_users().await.expect("list users").len()
    }
}
