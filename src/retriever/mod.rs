// Retriever module
// Translates free-text queries into ranked, threshold-filtered document
// matches by delegating to the vector store

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tracing::debug;

use crate::config::RetrievalConfig;
use crate::embeddings::Embedder;
use crate::expander::{DocumentKind, DocumentMetadata, IndexedDocument};
use crate::index::VectorStore;
use crate::{Result, SearchError};

/// Per-call retrieval options. Each knob is independently overridable;
/// unset knobs fall back to the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub k: Option<usize>,
    pub score_threshold: Option<f32>,
    pub filter: Option<MetadataFilter>,
}

impl SearchOptions {
    #[inline]
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    #[inline]
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    #[inline]
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Metadata predicate applied before the k-limit, so a filtered query
/// is never starved by unrelated top matches consuming the k budget.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataFilter {
    Kind(DocumentKind),
    Skill(String),
    Project(String),
    EmployeeId(u64),
    Availability(String),
    All(Vec<MetadataFilter>),
}

impl MetadataFilter {
    /// Render the filter as a LanceDB SQL predicate for push-down.
    #[inline]
    pub fn to_predicate(&self) -> String {
        match self {
            MetadataFilter::Kind(kind) => format!("kind = '{}'", kind.as_str()),
            MetadataFilter::Skill(skill) => format!("skill = '{}'", escape(skill)),
            MetadataFilter::Project(project) => format!("project = '{}'", escape(project)),
            MetadataFilter::EmployeeId(id) => format!("employee_id = {}", id),
            MetadataFilter::Availability(status) => {
                format!("availability = '{}'", escape(status))
            }
            MetadataFilter::All(filters) => filters
                .iter()
                .map(|f| format!("({})", f.to_predicate()))
                .collect::<Vec<_>>()
                .join(" AND "),
        }
    }

    /// In-process equivalent of the SQL predicate.
    #[inline]
    pub fn matches(&self, metadata: &DocumentMetadata) -> bool {
        match self {
            MetadataFilter::Kind(kind) => metadata.kind == *kind,
            MetadataFilter::Skill(skill) => metadata.skill.as_deref() == Some(skill.as_str()),
            MetadataFilter::Project(project) => {
                metadata.project.as_deref() == Some(project.as_str())
            }
            MetadataFilter::EmployeeId(id) => metadata.employee_id == *id,
            MetadataFilter::Availability(status) => metadata.availability == *status,
            MetadataFilter::All(filters) => filters.iter().all(|f| f.matches(metadata)),
        }
    }
}

fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

/// One retrieved document with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: IndexedDocument,
    pub score: f32,
}

/// Ordered retrieval outcome for one query: descending score, at most
/// k entries, every score at or above the threshold. Empty is a valid
/// outcome, not an error.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub query: String,
    pub matches: Vec<ScoredDocument>,
}

impl RetrievalResult {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Wraps the vector store behind a single search-by-query-text
/// operation. Embedding failures propagate as retrieval failures; no
/// retry policy lives here.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<VectorStore>,
    defaults: RetrievalConfig,
}

impl Retriever {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<VectorStore>,
        defaults: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            defaults,
        }
    }

    /// Search with the configured default k and score threshold.
    #[inline]
    pub async fn search(&self, query_text: &str) -> Result<RetrievalResult> {
        self.search_with_options(query_text, &SearchOptions::default())
            .await
    }

    /// Search with per-call overrides.
    #[inline]
    pub async fn search_with_options(
        &self,
        query_text: &str,
        options: &SearchOptions,
    ) -> Result<RetrievalResult> {
        let k = options.k.unwrap_or(self.defaults.k);
        let score_threshold = options
            .score_threshold
            .unwrap_or(self.defaults.score_threshold);

        debug!(
            "Retrieving for query '{}' (k={}, threshold={}, filter={:?})",
            query_text, k, score_threshold, options.filter
        );

        let query_vector = self
            .embedder
            .embed(query_text)
            .map_err(|e| SearchError::Embedding(format!("{:#}", e)))?;

        let predicate = options.filter.as_ref().map(MetadataFilter::to_predicate);

        let hits = self
            .store
            .search(&query_vector, k, predicate.as_deref())
            .await?;

        // Hits arrive ranked and filtered; apply the score floor and
        // deduplicate by document identity, keeping the best-scoring
        // entry. Below-threshold results are dropped, never padded.
        let mut seen = Vec::new();
        let mut matches = Vec::with_capacity(hits.len());
        for hit in hits {
            if hit.score < score_threshold {
                continue;
            }
            let identity = {
                let (id, kind, disc) = hit.document.identity();
                (id, kind, disc.map(str::to_string))
            };
            if seen.contains(&identity) {
                continue;
            }
            seen.push(identity);
            matches.push(ScoredDocument {
                document: hit.document,
                score: hit.score,
            });
        }
        matches.truncate(k);

        debug!(
            "Query '{}' matched {} documents above threshold",
            query_text,
            matches.len()
        );

        Ok(RetrievalResult {
            query: query_text.to_string(),
            matches,
        })
    }
}
