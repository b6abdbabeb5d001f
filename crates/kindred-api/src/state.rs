//! Application state wiring the memory components together.
//!
//! Components are generic over repository and embedder ports; `AppState`
//! pins them to the SQLite repositories and the HTTP embedder.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use kindred_core::aging::engine::AgingEngine;
use kindred_core::memory::box_embedder::BoxEmbedder;
use kindred_core::memory::retriever::EmbeddingRetriever;
use kindred_core::network::service::SharedMemoryNetwork;
use kindred_infra::config::{load_config, resolve_data_dir};
use kindred_infra::embedding::http::HttpEmbedder;
use kindred_infra::sqlite::memory::SqliteMemoryRepository;
use kindred_infra::sqlite::pool::{DatabasePool, database_url};
use kindred_infra::sqlite::relationship::SqliteRelationshipRepository;
use kindred_infra::sqlite::shared::SqliteSharedMemoryRepository;
use kindred_types::config::MemoryConfig;

pub type ConcreteRetriever = EmbeddingRetriever<SqliteMemoryRepository, BoxEmbedder>;
pub type ConcreteEngine = AgingEngine<SqliteMemoryRepository>;
pub type ConcreteNetwork = SharedMemoryNetwork<
    SqliteMemoryRepository,
    SqliteSharedMemoryRepository,
    SqliteRelationshipRepository,
>;

#[derive(Clone)]
pub struct AppState {
    pub config: MemoryConfig,
    pub data_dir: PathBuf,
    pub memories: Arc<SqliteMemoryRepository>,
    pub retriever: Arc<ConcreteRetriever>,
    pub engine: Arc<ConcreteEngine>,
    pub network: Arc<ConcreteNetwork>,
}

impl AppState {
    /// Load config, open the database and wire the components.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let config = load_config(&data_dir).await;
        let pool = DatabasePool::new(&database_url(&data_dir))
            .await
            .context("failed to open database")?;

        let memories = Arc::new(SqliteMemoryRepository::new(pool.clone()));
        let shared = Arc::new(SqliteSharedMemoryRepository::new(pool.clone()));
        let relationships = Arc::new(SqliteRelationshipRepository::new(pool));

        let embedder = HttpEmbedder::from_config(&config.embedding)
            .context("failed to configure embedding provider")?;
        let embedder = Arc::new(BoxEmbedder::new(embedder));

        let retriever = EmbeddingRetriever::new(memories.clone(), embedder, &config);
        let engine = AgingEngine::new(memories.clone(), &config.aging);
        let network = SharedMemoryNetwork::new(memories.clone(), shared, relationships, &config);

        tracing::debug!(data_dir = %data_dir.display(), "application state ready");

        Ok(Self {
            config,
            data_dir,
            memories,
            retriever: Arc::new(retriever),
            engine: Arc::new(engine),
            network: Arc::new(network),
        })
    }
}
