//! Loads [`cognitive_memory_core::Config`] and builds the storage backend
//! the CLI runs against. Mirrors the core crate's own "environment wins
//! over file, file wins over defaults" layering so the CLI's `--config`
//! flag and the library's environment variables compose predictably.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use cognitive_memory_core::facade::{CognitiveMemory, MemoryConfig};
use cognitive_memory_core::{Config, MetadataStore, VectorStore};
use cognitive_memory_storage_redb::RedbStore;

/// Load the core [`Config`], overlaying `path` (if given) and then the
/// environment on top.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    Config::load(path).context("failed to load configuration")
}

/// Which backend the CLI connected to, for `--verbose` diagnostics.
#[derive(Debug)]
pub enum Backend {
    Redb,
    #[cfg(feature = "turso")]
    Turso,
}

/// A constructed [`CognitiveMemory`] plus which backend it is running on.
/// `memory` is `Arc`-wrapped so the `watch` subcommand can hand a clone to
/// the file sync engine as its [`cognitive_memory_core::file_sync::MemorySink`]
/// while the rest of the CLI keeps using it by reference.
pub struct Connected {
    pub memory: Arc<CognitiveMemory>,
    pub backend: Backend,
}

/// Build a [`CognitiveMemory`] from `config`, selecting the backend by
/// `vector_store_endpoint`'s scheme: `libsql://` connects to Turso (only
/// when the `turso` feature is enabled), anything else is treated as a
/// local `redb` file path.
///
/// # Errors
/// Propagates backend connection failures and reconciliation failures.
pub async fn connect(config: &Config) -> anyhow::Result<Connected> {
    #[cfg(feature = "turso")]
    if config.vector_store_endpoint.starts_with("libsql://") {
        let token = std::env::var("TURSO_AUTH_TOKEN").unwrap_or_default();
        let store = Arc::new(
            cognitive_memory_storage_turso::TursoStore::connect_remote(&config.vector_store_endpoint, &token)
                .await
                .context("failed to connect to turso")?,
        );
        let memory_config = MemoryConfig::from_config(
            config,
            store.clone() as Arc<dyn VectorStore>,
            store as Arc<dyn MetadataStore>,
        );
        let memory = CognitiveMemory::new(memory_config).await.context("failed to initialize memory system")?;
        return Ok(Connected { memory: Arc::new(memory), backend: Backend::Turso });
    }

    let store = Arc::new(
        RedbStore::open(&config.metadata_db_path).await.context("failed to open redb database")?,
    );
    let memory_config =
        MemoryConfig::from_config(config, store.clone() as Arc<dyn VectorStore>, store as Arc<dyn MetadataStore>);
    let memory = CognitiveMemory::new(memory_config).await.context("failed to initialize memory system")?;
    Ok(Connected { memory: Arc::new(memory), backend: Backend::Redb })
}
