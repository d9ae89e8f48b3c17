//! Subcommand handlers, one per façade operation (`SPEC_FULL.md` §6):
//! `store`, `recall`, `consolidate`, `stats`, `delete-by-source`, plus
//! `watch`, which runs the file sync engine against a directory.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use cognitive_memory_core::facade::{CognitiveMemory, RecallLimits, StoreContext};
use cognitive_memory_core::file_sync::{FileSyncCoordinator, FileSyncEngine, LoaderRegistry, MarkdownLoader};
use cognitive_memory_core::{Config, MemoryLevel};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::{helpers, EnhancedError};
use crate::output::{Output, OutputFormat};

#[derive(Subcommand)]
pub enum Commands {
    /// Encode and store a piece of text as a memory.
    Store {
        /// The text to store.
        text: String,
        /// Hierarchy level: concept, context, or episode (default: episode).
        #[arg(long, value_enum, default_value_t = LevelArg::Episode)]
        level: LevelArg,
        /// Parent memory id, if this should nest under an existing memory.
        #[arg(long)]
        parent: Option<Uuid>,
        /// Originating file path, if this memory came from a synced file.
        #[arg(long)]
        source_path: Option<String>,
    },
    /// Retrieve core/peripheral/bridge memories for a query.
    Recall {
        /// The query text.
        query: String,
        /// Maximum core results.
        #[arg(long, default_value_t = 10)]
        k_core: usize,
        /// Maximum peripheral results.
        #[arg(long, default_value_t = 20)]
        k_peripheral: usize,
        /// Maximum bridge results.
        #[arg(long, default_value_t = 5)]
        k_bridge: usize,
    },
    /// Run one decay/eviction + promotion pass.
    Consolidate,
    /// Show per-level counts, connection count, and bridge cache hit ratio.
    Stats,
    /// Delete every memory whose source_path matches exactly.
    DeleteBySource {
        /// The source path to delete.
        path: String,
    },
    /// Watch a directory of markdown files, syncing stores to its contents
    /// until interrupted (Ctrl-C).
    Watch {
        /// Directory to watch.
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LevelArg {
    Concept,
    Context,
    Episode,
}

impl From<LevelArg> for MemoryLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Concept => MemoryLevel::Concept,
            LevelArg::Context => MemoryLevel::Context,
            LevelArg::Episode => MemoryLevel::Episode,
        }
    }
}

#[derive(Serialize)]
struct StoreOutput {
    memory_id: Uuid,
}

impl Output for StoreOutput {
    fn write_human<W: io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "stored memory {}", self.memory_id)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct RecallOutput {
    core: Vec<RecallItemOutput>,
    peripheral: Vec<RecallItemOutput>,
    bridges: Vec<RecallItemOutput>,
}

#[derive(Serialize)]
struct RecallItemOutput {
    id: Uuid,
    score: f32,
    why: String,
    content: String,
}

impl Output for RecallOutput {
    fn write_human<W: io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for (label, items) in [("core", &self.core), ("peripheral", &self.peripheral), ("bridges", &self.bridges)] {
            writeln!(writer, "{label}:")?;
            for item in items {
                writeln!(writer, "  [{:.3}] {} ({}) — {}", item.score, item.content, item.id, item.why)?;
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ConsolidateOutput {
    evicted: usize,
    promoted: usize,
}

impl Output for ConsolidateOutput {
    fn write_human<W: io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "evicted {} memories, promoted {} memories", self.evicted, self.promoted)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct StatsOutput {
    concept_count: usize,
    context_count: usize,
    episode_count: usize,
    connection_count: usize,
    bridge_cache_hit_ratio: f32,
}

impl Output for StatsOutput {
    fn write_human<W: io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "concepts:  {}", self.concept_count)?;
        writeln!(writer, "contexts:  {}", self.context_count)?;
        writeln!(writer, "episodes:  {}", self.episode_count)?;
        writeln!(writer, "connections: {}", self.connection_count)?;
        writeln!(writer, "bridge cache hit ratio: {:.2}", self.bridge_cache_hit_ratio)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct DeleteOutput {
    deleted: u64,
}

impl Output for DeleteOutput {
    fn write_human<W: io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "deleted {} memories", self.deleted)?;
        Ok(())
    }
}

/// Dispatch `command` against `memory`, printing the result in `format`.
/// `config` supplies the file-sync tunables (`watch` only; every other
/// subcommand ignores it).
///
/// # Errors
/// Propagates façade failures; wraps them with suggestions via
/// [`EnhancedError`] before returning.
pub async fn handle(
    command: Commands,
    memory: &Arc<CognitiveMemory>,
    config: &Config,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match command {
        Commands::Store { text, level, parent, source_path } => {
            let context =
                StoreContext { level_hint: Some(level.into()), parent_id: parent, source_path };
            let result = memory
                .store(&text, context, None)
                .await
                .context_with_help("store failed", helpers::STORAGE_CONNECTION_HELP)?;
            format.print_output(&StoreOutput { memory_id: result.memory_id })?;
        }
        Commands::Recall { query, k_core, k_peripheral, k_bridge } => {
            let limits = RecallLimits { k_core, k_peripheral, k_bridge };
            let result = memory
                .recall(&query, limits, None)
                .await
                .context_with_help("recall failed", helpers::STORAGE_CONNECTION_HELP)?;
            let to_output = |items: Vec<cognitive_memory_core::facade::RecallItem>| {
                items
                    .into_iter()
                    .map(|i| RecallItemOutput { id: i.id, score: i.score, why: i.why, content: i.content })
                    .collect()
            };
            format.print_output(&RecallOutput {
                core: to_output(result.core),
                peripheral: to_output(result.peripheral),
                bridges: to_output(result.bridges),
            })?;
        }
        Commands::Consolidate => {
            let report = memory
                .consolidate()
                .await
                .context_with_help("consolidation failed", helpers::STORAGE_CONNECTION_HELP)?;
            format.print_output(&ConsolidateOutput { evicted: report.evicted, promoted: report.promoted })?;
        }
        Commands::Stats => {
            let stats = memory
                .stats()
                .await
                .context_with_help("stats failed", helpers::STORAGE_CONNECTION_HELP)?;
            format.print_output(&StatsOutput {
                concept_count: stats.counts_by_level.get(&MemoryLevel::Concept).copied().unwrap_or(0),
                context_count: stats.counts_by_level.get(&MemoryLevel::Context).copied().unwrap_or(0),
                episode_count: stats.counts_by_level.get(&MemoryLevel::Episode).copied().unwrap_or(0),
                connection_count: stats.connection_count,
                bridge_cache_hit_ratio: stats.bridge_cache_hit_ratio,
            })?;
        }
        Commands::DeleteBySource { path } => {
            let deleted = memory
                .delete_by_source(&path)
                .await
                .context_with_help("delete failed", helpers::MEMORY_NOT_FOUND_HELP)?;
            format.print_output(&DeleteOutput { deleted })?;
        }
        Commands::Watch { path } => {
            watch(memory.clone(), config, path).await?;
        }
    }
    Ok(())
}

/// Run the file sync engine against `root` until Ctrl-C, using `memory` as
/// the [`cognitive_memory_core::file_sync::MemorySink`].
async fn watch(memory: Arc<CognitiveMemory>, config: &Config, root: PathBuf) -> anyhow::Result<()> {
    let registry = Arc::new(LoaderRegistry::new().with_loader(Box::new(MarkdownLoader::new())));
    let coordinator = Arc::new(FileSyncCoordinator::new(memory, registry, config.sync_atomic_operations));
    let extensions: Vec<String> =
        cognitive_memory_core::constants::DEFAULT_WATCHED_EXTENSIONS.iter().map(|s| (*s).to_string()).collect();
    let engine = FileSyncEngine::new(
        root.clone(),
        config.sync_poll_interval,
        extensions,
        config.sync_workers,
        coordinator,
    );

    println!("watching {} (Ctrl-C to stop)", root.display());
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let run_handle = tokio::spawn(engine.run(shutdown_rx));

    tokio::signal::ctrl_c().await.context_with_help("failed to install Ctrl-C handler", &[])?;
    let _ = shutdown_tx.send(true);
    run_handle.await.context_with_help("file sync engine task panicked", &[])?;
    Ok(())
}
