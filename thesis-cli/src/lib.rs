//! # thesis-cli
//!
//! The `thesis` command-line front end for the retrieval engine.
//!
//! ```bash
//! # rank evidence for a section from an exported chunk file
//! thesis retrieve --chunks chunks.json --project thesis-42 \
//!     --context-type section_drafting \
//!     --section-objective "examine the ethical implications of AI bias" \
//!     "How does AI bias affect hiring?"
//!
//! # show the advisory intent of a query
//! thesis classify "Compare supervised and unsupervised learning"
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use thesis_retrieval::{
    Chunk, DraftingContext, EmbeddingProvider, HashEmbeddingProvider, InMemoryChunkStore,
    IntentClassification, RetrievalConfig, RetrievalContext, RetrievalFilters,
    RetrievalOrchestrator, RetrievalResponse, SemanticFallback, intent,
};
use tracing::info;

/// Evidence retrieval for thesis drafting
#[derive(Parser, Debug)]
#[command(name = "thesis", version, about, propagate_version = true)]
pub struct Cli {
    /// Emit logs as JSON lines instead of human-readable text
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rank and select evidence chunks for a query, printing the response as JSON
    Retrieve(RetrieveArgs),
    /// Print the advisory intent classification of a query
    Classify {
        /// The query to classify
        query: String,
    },
}

/// Which embedding provider embeds the query.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbedderKind {
    /// Offline feature-hashing embeddings
    Hash,
    /// OpenAI embeddings API (requires the `openai` feature)
    Openai,
}

#[derive(Args, Debug)]
pub struct RetrieveArgs {
    /// The retrieval query
    pub query: String,

    /// JSON file holding an array of chunks
    #[arg(long, value_name = "PATH")]
    pub chunks: PathBuf,

    /// Project whose chunks are searched
    #[arg(long)]
    pub project: String,

    /// Writing task: section_drafting, paragraph_rewrite or research_query
    #[arg(long, value_name = "TYPE")]
    pub context_type: Option<DraftingContext>,

    #[arg(long, value_name = "TEXT")]
    pub section_title: Option<String>,

    #[arg(long, value_name = "TEXT")]
    pub section_objective: Option<String>,

    /// Chunk ID to leave out of the candidate pool (repeatable)
    #[arg(long = "exclude", value_name = "CHUNK_ID")]
    pub exclude: Vec<String>,

    /// Maximum number of chunks to return [default: from config, else 10]
    #[arg(long, value_name = "N")]
    pub max_chunks: Option<usize>,

    /// JSON retrieval configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = EmbedderKind::Hash)]
    pub embedder: EmbedderKind,

    /// Vector size of the hash embedder, also used by the offline fallback
    #[arg(long, default_value_t = 256)]
    pub dimensions: usize,

    /// Embed chunks that have no stored embedding with the selected embedder
    #[arg(long)]
    pub embed_missing: bool,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,
}

impl RetrieveArgs {
    /// Build the retrieval context described by the flags.
    pub fn context(&self) -> RetrievalContext {
        let mut context = RetrievalContext::new(&self.query, &self.project);
        if let Some(context_type) = self.context_type {
            context = context.with_context_type(context_type);
        }
        if let Some(title) = &self.section_title {
            context = context.with_section_title(title);
        }
        if let Some(objective) = &self.section_objective {
            context = context.with_section_objective(objective);
        }
        if !self.exclude.is_empty() {
            context = context.with_filters(RetrievalFilters {
                exclude_chunk_ids: self.exclude.clone(),
                ..Default::default()
            });
        }
        context
    }

    fn load_config(&self) -> Result<RetrievalConfig> {
        let mut config = match &self.config {
            Some(path) => RetrievalConfig::from_json_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => RetrievalConfig::default(),
        };
        if let Some(max_chunks) = self.max_chunks {
            config.max_chunks = max_chunks;
            config.validate()?;
        }
        Ok(config)
    }
}

/// Run a parsed command and return its JSON output.
pub async fn run(command: Commands) -> Result<serde_json::Value> {
    match command {
        Commands::Retrieve(args) => Ok(serde_json::to_value(retrieve(&args).await?)?),
        Commands::Classify { query } => Ok(serde_json::to_value(classify(&query))?),
    }
}

pub fn classify(query: &str) -> IntentClassification {
    intent::classify(query)
}

/// Load the chunk file, build an orchestrator and run one retrieval.
pub async fn retrieve(args: &RetrieveArgs) -> Result<RetrievalResponse> {
    let config = args.load_config()?;
    info!(max_chunks = config.max_chunks, embedder = ?args.embedder, "configuration loaded");
    let embedder = build_embedder(args)?;
    let store = Arc::new(load_chunks(args, embedder.as_ref()).await?);

    let orchestrator = build_orchestrator(config, embedder, store, args.dimensions)?;
    let response = orchestrator.retrieve(&args.context()).await?;
    Ok(response)
}

/// Wire the orchestrator around `primary`.
///
/// The fallback always runs on a local hash embedder of `fallback_dimensions`
/// and re-embeds chunk text as needed, so an outage of the primary provider
/// still yields evidence.
pub fn build_orchestrator(
    config: RetrievalConfig,
    primary: Arc<dyn EmbeddingProvider>,
    store: Arc<InMemoryChunkStore>,
    fallback_dimensions: usize,
) -> Result<RetrievalOrchestrator> {
    let local = Arc::new(HashEmbeddingProvider::new(fallback_dimensions)?);
    let fallback = SemanticFallback::new(local, store.clone()).with_chunk_reembedding();

    Ok(RetrievalOrchestrator::builder()
        .config(config)
        .embedding_provider(primary)
        .chunk_store(store)
        .fallback(Arc::new(fallback))
        .build()?)
}

/// Create the embedding provider selected on the command line.
pub fn build_embedder(args: &RetrieveArgs) -> Result<Arc<dyn EmbeddingProvider>> {
    match args.embedder {
        EmbedderKind::Hash => Ok(Arc::new(HashEmbeddingProvider::new(args.dimensions)?)),
        EmbedderKind::Openai => openai_embedder(args.openai_api_key.as_deref()),
    }
}

#[cfg(feature = "openai")]
fn openai_embedder(api_key: Option<&str>) -> Result<Arc<dyn EmbeddingProvider>> {
    let Some(api_key) = api_key else {
        bail!("--embedder openai needs OPENAI_API_KEY or --openai-api-key");
    };
    Ok(Arc::new(thesis_retrieval::OpenAIEmbeddingProvider::new(api_key)?))
}

#[cfg(not(feature = "openai"))]
fn openai_embedder(_api_key: Option<&str>) -> Result<Arc<dyn EmbeddingProvider>> {
    bail!("this build of thesis was compiled without the `openai` feature")
}

async fn load_chunks(
    args: &RetrieveArgs,
    embedder: &dyn EmbeddingProvider,
) -> Result<InMemoryChunkStore> {
    if !args.embed_missing {
        return InMemoryChunkStore::from_json_file(&args.chunks)
            .await
            .with_context(|| format!("loading chunks from {}", args.chunks.display()));
    }

    let raw = tokio::fs::read_to_string(&args.chunks)
        .await
        .with_context(|| format!("reading {}", args.chunks.display()))?;
    let mut chunks: Vec<Chunk> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", args.chunks.display()))?;

    let missing: Vec<usize> =
        chunks.iter().enumerate().filter(|(_, c)| c.embedding.is_none()).map(|(i, _)| i).collect();
    if !missing.is_empty() {
        let texts: Vec<&str> = missing.iter().map(|&i| chunks[i].text.as_str()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != missing.len() {
            bail!("embedder returned {} vectors for {} chunks", embeddings.len(), missing.len());
        }
        for (i, embedding) in missing.iter().zip(embeddings) {
            chunks[*i].embedding = Some(embedding);
        }
        info!(embedded = missing.len(), provider = embedder.name(), "embedded chunks");
    }

    let store = InMemoryChunkStore::new();
    store.insert_many(chunks).await?;
    Ok(store)
}
