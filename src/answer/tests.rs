use super::*;
use crate::config::OllamaConfig;
use crate::expander::{DocumentKind, DocumentMetadata, IndexedDocument};
use crate::retriever::ScoredDocument;

fn retrieval_with(matches: Vec<ScoredDocument>) -> RetrievalResult {
    RetrievalResult {
        query: "Python developer for a billing project".to_string(),
        matches,
    }
}

fn scored_document(text: &str, score: f32) -> ScoredDocument {
    ScoredDocument {
        document: IndexedDocument {
            text: text.to_string(),
            metadata: DocumentMetadata {
                employee_id: 1,
                name: "Ana".to_string(),
                kind: DocumentKind::Profile,
                skill: None,
                project: None,
                experience_years: 4,
                availability: "available".to_string(),
            },
        },
        score,
    }
}

#[test]
fn empty_retrieval_declines_without_calling_the_model() {
    // The client points at a default localhost config but is never
    // invoked on the empty path.
    let client = Arc::new(
        OllamaClient::new(&OllamaConfig::default()).expect("should create client"),
    );
    let synthesizer = Synthesizer::new(client);

    let answer = synthesizer
        .answer(&retrieval_with(vec![]))
        .expect("empty retrieval should not be an error");

    assert_eq!(answer, NO_MATCH_MESSAGE);
}

#[test]
fn prompt_contains_context_query_and_instructions() {
    let retrieval = retrieval_with(vec![
        scored_document("Ana has expertise in Python.", 0.9),
        scored_document("Ana worked on Billing project.", 0.7),
    ]);

    let prompt = build_prompt(&retrieval);

    assert!(prompt.contains("### Context ###"));
    assert!(prompt.contains("Ana has expertise in Python."));
    assert!(prompt.contains("Ana worked on Billing project."));
    assert!(prompt.contains("### Request ###"));
    assert!(prompt.contains("Python developer for a billing project"));
    assert!(prompt.contains("### Instructions ###"));
    assert!(prompt.contains("No hallucination"));
}

#[test]
fn prompt_orders_context_by_retrieval_rank() {
    let retrieval = retrieval_with(vec![
        scored_document("first ranked document", 0.9),
        scored_document("second ranked document", 0.5),
    ]);

    let prompt = build_prompt(&retrieval);
    let first = prompt.find("first ranked document").expect("first present");
    let second = prompt
        .find("second ranked document")
        .expect("second present");
    assert!(first < second);
}
