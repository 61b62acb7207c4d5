use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::answer::Synthesizer;
use crate::config::{Config, get_base_dir};
use crate::embeddings::{Embedder, OllamaClient};
use crate::expander::{DocumentKind, expand_all};
use crate::index::{VectorStore, embed_documents};
use crate::loader::load_employee_records;
use crate::retriever::{MetadataFilter, Retriever, SearchOptions};

fn load_config() -> Result<Config> {
    let base_dir = get_base_dir().context("Failed to resolve base directory")?;
    Config::load(&base_dir)
}

/// Print the active configuration
#[inline]
pub fn show_config() -> Result<()> {
    let config = load_config()?;

    println!("Base directory: {}", config.get_base_dir().display());
    println!("Data file: {}", config.data_file_path().display());
    println!(
        "Ollama: {}://{}:{}",
        config.ollama.protocol, config.ollama.host, config.ollama.port
    );
    println!("Embedding model: {}", config.ollama.embedding_model);
    println!("Generation model: {}", config.ollama.generation_model);
    println!("Embedding dimension: {}", config.ollama.embedding_dimension);
    println!("Default k: {}", config.retrieval.k);
    println!("Default score threshold: {}", config.retrieval.score_threshold);

    Ok(())
}

/// Write the default configuration file if none exists yet
#[inline]
pub fn init_config() -> Result<()> {
    let base_dir = get_base_dir().context("Failed to resolve base directory")?;
    let config_path = base_dir.join("config.toml");

    if config_path.exists() {
        println!("Configuration already exists at {}", config_path.display());
        return Ok(());
    }

    let config = Config::load(&base_dir)?;
    config.save()?;
    println!("Wrote default configuration to {}", config_path.display());
    Ok(())
}

/// Rebuild the vector index from the employee data file. The previous
/// index generation stays queryable until the new one is published.
#[inline]
pub async fn build_index(data_file: Option<String>) -> Result<()> {
    let mut config = load_config()?;
    if let Some(path) = data_file {
        config.data_file = path.into();
    }

    let client = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    client
        .ping()
        .context("Ollama is not reachable. Make sure it is running")?;

    let records = load_employee_records(config.data_file_path())
        .context("Failed to load employee records")?;
    println!("Loaded {} employee records", records.len());

    let documents = expand_all(&records).context("Failed to expand records into documents")?;
    println!("Expanded into {} indexable documents", documents.len());

    info!("Generating embeddings for {} documents", documents.len());
    let index_records =
        embed_documents(&client, documents).context("Failed to embed documents")?;

    let store = VectorStore::new(&config)
        .await
        .context("Failed to open vector store")?;
    store
        .rebuild(index_records)
        .await
        .context("Failed to rebuild index")?;

    let count = store.count().await?;
    println!("Index built successfully ({} entries)", count);

    Ok(())
}

/// Per-call search overrides collected from the CLI.
#[derive(Debug, Default)]
pub struct SearchArgs {
    pub k: Option<usize>,
    pub score_threshold: Option<f32>,
    pub skill: Option<String>,
    pub project: Option<String>,
    pub kind: Option<String>,
    pub availability: Option<String>,
}

fn build_filter(args: &SearchArgs) -> Result<Option<MetadataFilter>> {
    let mut filters = Vec::new();

    if let Some(kind) = &args.kind {
        let kind = DocumentKind::parse(kind).ok_or_else(|| {
            anyhow::anyhow!("Unknown document kind '{}' (expected profile, skill, or project)", kind)
        })?;
        filters.push(MetadataFilter::Kind(kind));
    }
    if let Some(skill) = &args.skill {
        filters.push(MetadataFilter::Skill(skill.clone()));
    }
    if let Some(project) = &args.project {
        filters.push(MetadataFilter::Project(project.clone()));
    }
    if let Some(availability) = &args.availability {
        filters.push(MetadataFilter::Availability(availability.clone()));
    }

    Ok(match filters.len() {
        0 => None,
        1 => filters.pop(),
        _ => Some(MetadataFilter::All(filters)),
    })
}

async fn create_retriever(config: &Config) -> Result<Retriever> {
    let client = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    let embedder: Arc<dyn Embedder> = Arc::new(client);

    let store = Arc::new(
        VectorStore::new(config)
            .await
            .context("Failed to open vector store")?,
    );

    if !store.is_built().await {
        println!("The index has not been built yet. Run 'employee-search build' first.");
    }

    Ok(Retriever::new(embedder, store, config.retrieval.clone()))
}

/// Search the index and print ranked matches
#[inline]
pub async fn search_employees(query: &str, args: SearchArgs) -> Result<()> {
    let config = load_config()?;
    let retriever = create_retriever(&config).await?;

    let mut options = SearchOptions::default();
    if let Some(k) = args.k {
        options = options.with_k(k);
    }
    if let Some(threshold) = args.score_threshold {
        options = options.with_score_threshold(threshold);
    }
    if let Some(filter) = build_filter(&args)? {
        options = options.with_filter(filter);
    }

    let result = retriever.search_with_options(query, &options).await?;

    if result.is_empty() {
        println!("No documents matched the query above the score threshold.");
        return Ok(());
    }

    println!("Found {} matching documents:", result.matches.len());
    println!();

    for (rank, m) in result.matches.iter().enumerate() {
        let meta = &m.document.metadata;
        println!(
            "{}. {} [{}] (score: {:.3})",
            rank + 1,
            meta.name,
            meta.kind,
            m.score
        );
        if let Some(skill) = &meta.skill {
            println!("   Skill: {}", skill);
        }
        if let Some(project) = &meta.project {
            println!("   Project: {}", project);
        }
        println!(
            "   Experience: {} years | Availability: {}",
            meta.experience_years, meta.availability
        );
        println!();
    }

    Ok(())
}

/// Retrieve matching employees and synthesize a natural-language answer
#[inline]
pub async fn ask(query: &str) -> Result<()> {
    let config = load_config()?;

    let retriever = create_retriever(&config).await?;
    let result = retriever.search(query).await?;

    let client = Arc::new(
        OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?,
    );
    let synthesizer = Synthesizer::new(client);
    let answer = synthesizer.answer(&result)?;

    println!("{}", answer);
    Ok(())
}

/// Show index and service status
#[inline]
pub async fn show_status() -> Result<()> {
    let config = load_config()?;

    println!("Base directory: {}", config.get_base_dir().display());
    println!("Data file: {}", config.data_file_path().display());

    let store = VectorStore::new(&config)
        .await
        .context("Failed to open vector store")?;

    if store.is_built().await {
        println!("Index: built ({} entries)", store.count().await?);
    } else {
        println!("Index: not built");
    }

    let client = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    match client.health_check() {
        Ok(()) => println!("Ollama: reachable, configured models available"),
        Err(e) => println!("Ollama: unavailable ({})", e),
    }

    Ok(())
}
