// Answer synthesis module
// Turns a retrieval result into a natural-language answer grounded in
// the retrieved documents

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tracing::{debug, info};

use crate::embeddings::OllamaClient;
use crate::retriever::RetrievalResult;
use crate::{Result, SearchError};

/// Fixed response when retrieval comes back empty. The synthesizer
/// must not fabricate candidates the index does not contain.
pub const NO_MATCH_MESSAGE: &str =
    "No employees in the index match this request. Try broadening the skills or availability criteria.";

/// Generates an answer from retrieved documents via the configured
/// Ollama generation model.
pub struct Synthesizer {
    client: Arc<OllamaClient>,
}

impl Synthesizer {
    #[inline]
    pub fn new(client: Arc<OllamaClient>) -> Self {
        Self { client }
    }

    /// Produce an answer for the query grounded in the retrieval
    /// result. An empty result yields the fixed no-match message
    /// without calling the language model.
    #[inline]
    pub fn answer(&self, retrieval: &RetrievalResult) -> Result<String> {
        if retrieval.is_empty() {
            info!(
                "No documents cleared the threshold for query '{}', declining to answer",
                retrieval.query
            );
            return Ok(NO_MATCH_MESSAGE.to_string());
        }

        let prompt = build_prompt(retrieval);
        debug!(
            "Synthesizing answer for query '{}' from {} documents",
            retrieval.query,
            retrieval.matches.len()
        );

        let answer = self
            .client
            .generate_completion(&prompt)
            .map_err(|e| SearchError::Synthesis(format!("{:#}", e)))?;

        Ok(answer.trim().to_string())
    }
}

/// Build the grounding prompt: retrieved document texts as context,
/// then the request, then the response instructions.
#[inline]
pub fn build_prompt(retrieval: &RetrievalResult) -> String {
    let context = retrieval
        .matches
        .iter()
        .map(|m| m.document.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are an AI assistant helping match employees to a user's project request.\n\
         \n\
         Use only the provided context. Do not guess or add information.\n\
         \n\
         ### Context ###\n\
         {context}\n\
         \n\
         ### Request ###\n\
         {query}\n\
         \n\
         ### Instructions ###\n\
         - Identify employees who meet all criteria (skills, domain experience, availability).\n\
         - Write a natural, paragraph-style response:\n\
         - Introduce each matching candidate\n\
         - Include their name, experience, relevant projects, key skills, and availability\n\
         - After listing, provide a short comparison of the candidates\n\
         - End with a helpful follow-up question\n\
         \n\
         Style: Professional, clear, and natural. No bullets. Bold names. No hallucination.\n\
         \n\
         Answer:",
        context = context,
        query = retrieval.query,
    )
}
