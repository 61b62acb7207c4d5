use super::*;
use crate::config::{Config, OllamaConfig, RetrievalConfig};
use crate::index::embed_documents;
use crate::loader::EmployeeRecord;
use anyhow::anyhow;
use tempfile::TempDir;

/// Deterministic embedder over a four-axis keyword space. Vectors are
/// L2-normalized so cosine similarity behaves like production
/// embeddings.
struct StubEmbedder;

impl Embedder for StubEmbedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let lower = text.to_lowercase();
        let mut v = vec![0.0f32; 4];
        if lower.contains("python") {
            v[0] = 1.0;
        }
        if lower.contains("sql") {
            v[1] = 1.0;
        }
        if lower.contains("billing") {
            v[2] = 1.0;
        }
        if v.iter().all(|x| *x == 0.0) {
            v[3] = 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        Ok(v.into_iter().map(|x| x / norm).collect())
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Embedder that always fails, for error-propagation tests.
struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Err(anyhow!("embedding service unreachable"))
    }

    fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Err(anyhow!("embedding service unreachable"))
    }
}

fn ana() -> EmployeeRecord {
    EmployeeRecord {
        id: 1,
        name: "Ana".to_string(),
        skills: vec!["Python".to_string(), "SQL".to_string()],
        experience_years: 4,
        projects: vec!["Billing".to_string()],
        availability: "available".to_string(),
    }
}

fn test_config(temp_dir: &TempDir) -> Config {
    Config {
        ollama: OllamaConfig {
            embedding_dimension: 4,
            ..OllamaConfig::default()
        },
        retrieval: RetrievalConfig::default(),
        data_file: "data/employees.json".into(),
        base_dir: temp_dir.path().to_path_buf(),
    }
}

async fn build_retriever(records: &[EmployeeRecord]) -> (Retriever, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&temp_dir);

    let store = Arc::new(
        VectorStore::new(&config)
            .await
            .expect("should create vector store"),
    );

    let embedder: Arc<dyn Embedder> = Arc::new(StubEmbedder);
    let documents = crate::expander::expand_all(records).expect("should expand records");
    let index_records =
        embed_documents(embedder.as_ref(), documents).expect("should embed documents");
    store
        .rebuild(index_records)
        .await
        .expect("rebuild should succeed");

    let retriever = Retriever::new(embedder, store, config.retrieval);
    (retriever, temp_dir)
}

#[tokio::test]
async fn python_query_finds_profile_and_skill_documents() {
    let (retriever, _temp_dir) = build_retriever(&[ana()]).await;

    let result = retriever
        .search("Python developer")
        .await
        .expect("search should succeed");

    assert!(!result.is_empty());
    let kinds: Vec<_> = result
        .matches
        .iter()
        .map(|m| m.document.metadata.kind)
        .collect();
    assert!(kinds.contains(&DocumentKind::Profile));

    let python_skill_doc = result.matches.iter().find(|m| {
        m.document.metadata.kind == DocumentKind::Skill
            && m.document.metadata.skill.as_deref() == Some("Python")
    });
    assert!(python_skill_doc.is_some(), "Python skill doc should match");

    for m in &result.matches {
        assert!(m.score >= 0.3, "score {} below threshold", m.score);
    }
}

#[tokio::test]
async fn results_are_ordered_by_descending_score() {
    let (retriever, _temp_dir) = build_retriever(&[ana()]).await;

    let result = retriever
        .search("Python developer")
        .await
        .expect("search should succeed");

    for pair in result.matches.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn k_bound_is_respected() {
    let (retriever, _temp_dir) = build_retriever(&[ana()]).await;

    let options = SearchOptions::default().with_k(1).with_score_threshold(0.0);
    let result = retriever
        .search_with_options("Python developer", &options)
        .await
        .expect("search should succeed");

    assert_eq!(result.matches.len(), 1);
}

#[tokio::test]
async fn threshold_of_one_with_no_exact_match_yields_empty_result() {
    let (retriever, _temp_dir) = build_retriever(&[ana()]).await;

    // "Python developer" embeds onto the pure python axis; no indexed
    // document is an exact match for it.
    let options = SearchOptions::default().with_score_threshold(1.0);
    let result = retriever
        .search_with_options("Python developer", &options)
        .await
        .expect("search should succeed");

    assert!(result.is_empty());
}

#[tokio::test]
async fn below_threshold_matches_are_never_padded() {
    let (retriever, _temp_dir) = build_retriever(&[ana()]).await;

    // The SQL skill document has no overlap with the pure-python query
    let result = retriever
        .search("Python developer")
        .await
        .expect("search should succeed");

    let sql_doc = result
        .matches
        .iter()
        .find(|m| m.document.metadata.skill.as_deref() == Some("SQL"));
    assert!(sql_doc.is_none(), "orthogonal SQL doc must not appear");
}

#[tokio::test]
async fn filter_restricts_results_to_matching_metadata() {
    let (retriever, _temp_dir) = build_retriever(&[ana()]).await;

    let filter = MetadataFilter::Skill("Python".to_string());
    let options = SearchOptions::default().with_filter(filter.clone());
    let result = retriever
        .search_with_options("Python developer", &options)
        .await
        .expect("search should succeed");

    assert!(!result.is_empty());
    for m in &result.matches {
        assert!(filter.matches(&m.document.metadata));
    }
}

#[tokio::test]
async fn combined_filter_applies_all_clauses() {
    let records = vec![
        ana(),
        EmployeeRecord {
            id: 2,
            name: "Bram".to_string(),
            skills: vec!["Python".to_string()],
            experience_years: 7,
            projects: vec![],
            availability: "unavailable".to_string(),
        },
    ];
    let (retriever, _temp_dir) = build_retriever(&records).await;

    let filter = MetadataFilter::All(vec![
        MetadataFilter::Skill("Python".to_string()),
        MetadataFilter::Availability("available".to_string()),
    ]);
    let options = SearchOptions::default().with_filter(filter.clone());
    let result = retriever
        .search_with_options("Python developer", &options)
        .await
        .expect("search should succeed");

    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].document.metadata.employee_id, 1);
}

#[tokio::test]
async fn empty_index_returns_empty_result_not_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&temp_dir);
    let store = Arc::new(
        VectorStore::new(&config)
            .await
            .expect("should create vector store"),
    );
    store.rebuild(vec![]).await.expect("rebuild should succeed");

    let retriever = Retriever::new(Arc::new(StubEmbedder), store, config.retrieval);
    let result = retriever
        .search("anything")
        .await
        .expect("search should succeed");

    assert!(result.is_empty());
}

#[tokio::test]
async fn embedding_failure_propagates_as_retrieval_failure() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&temp_dir);
    let store = Arc::new(
        VectorStore::new(&config)
            .await
            .expect("should create vector store"),
    );

    let retriever = Retriever::new(Arc::new(FailingEmbedder), store, config.retrieval);
    let result = retriever.search("Python developer").await;

    assert!(matches!(result, Err(SearchError::Embedding(_))));
}

#[test]
fn filter_predicates_render_as_sql() {
    assert_eq!(
        MetadataFilter::Kind(DocumentKind::Skill).to_predicate(),
        "kind = 'skill'"
    );
    assert_eq!(
        MetadataFilter::Skill("Python".to_string()).to_predicate(),
        "skill = 'Python'"
    );
    assert_eq!(
        MetadataFilter::EmployeeId(7).to_predicate(),
        "employee_id = 7"
    );
    assert_eq!(
        MetadataFilter::All(vec![
            MetadataFilter::Kind(DocumentKind::Skill),
            MetadataFilter::Availability("available".to_string()),
        ])
        .to_predicate(),
        "(kind = 'skill') AND (availability = 'available')"
    );
}

#[test]
fn filter_predicates_escape_quotes() {
    let filter = MetadataFilter::Project("O'Brien Migration".to_string());
    assert_eq!(filter.to_predicate(), "project = 'O''Brien Migration'");
}
