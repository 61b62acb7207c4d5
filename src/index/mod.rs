// Vector index module
// Owns the embedded document set for the current generation of data


pub mod vector_store;

use chrono::Utc;
use uuid::Uuid;

use crate::embeddings::Embedder;
use crate::expander::IndexedDocument;
use crate::{Result, SearchError};

pub use vector_store::{SearchHit, VectorStore};

/// One (vector, document) entry as stored in the vector index. `seq` is
/// the insertion ordinal within a generation, used to break similarity
/// ties deterministically (first-built entry wins).
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: String,
    pub seq: u32,
    pub vector: Vec<f32>,
    pub document: IndexedDocument,
    pub created_at: String,
}

/// Embed a document list into index-ready records. The pairing between
/// vectors and documents is carried explicitly: each record is built
/// from the document at the same position, and a count mismatch from
/// the embedding service aborts the whole batch instead of silently
/// misassociating vectors.
#[inline]
pub fn embed_documents(
    embedder: &dyn Embedder,
    documents: Vec<IndexedDocument>,
) -> Result<Vec<DocumentRecord>> {
    if documents.is_empty() {
        return Ok(Vec::new());
    }

    let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();

    let vectors = embedder
        .embed_batch(&texts)
        .map_err(|e| SearchError::Embedding(format!("{:#}", e)))?;

    if vectors.len() != documents.len() {
        return Err(SearchError::Embedding(format!(
            "Embedding service returned {} vectors for {} documents",
            vectors.len(),
            documents.len()
        )));
    }

    let created_at = Utc::now().to_rfc3339();

    let mut records = Vec::with_capacity(documents.len());
    for (seq, (document, vector)) in documents.into_iter().zip(vectors).enumerate() {
        let seq = u32::try_from(seq)
            .map_err(|_| SearchError::Database("Document count exceeds index capacity".to_string()))?;
        records.push(DocumentRecord {
            id: Uuid::new_v4().to_string(),
            seq,
            vector,
            document,
            created_at: created_at.clone(),
        });
    }

    Ok(records)
}
