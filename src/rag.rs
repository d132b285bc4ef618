//! Retrieval-augmented question answering over the knowledge document.
//!
//! [`KnowledgePipeline::build`] runs once at startup: load the document,
//! split it into overlapping chunks, embed every chunk, and hold the
//! vectors in an in-memory index. [`KnowledgePipeline::answer`] embeds
//! the question, retrieves the top-k chunks by cosine similarity, and
//! asks the generator for an answer grounded in those passages.
//!
//! No answer caching, no relevance thresholding beyond top-k, no source
//! citation. Any failure surfaces as [`RetrievalError`]; callers render a
//! degraded message and keep serving.

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::controller::Answerer;
use crate::embedding::{create_embedder, Embedder};
use crate::generate::{Generator, GroqGenerator};
use crate::index::KnowledgeIndex;
use crate::knowledge::load_document;

/// Embedding, retrieval, or generation failure.
///
/// The full cause chain is preserved for logging; end users only ever
/// see a degraded chat message.
#[derive(Debug, Error)]
#[error("knowledge retrieval failed")]
pub struct RetrievalError(#[source] pub anyhow::Error);

pub struct KnowledgePipeline {
    embedder: Box<dyn Embedder>,
    generator: Box<dyn Generator>,
    index: KnowledgeIndex,
    top_k: usize,
}

impl KnowledgePipeline {
    /// Build the pipeline from configuration.
    ///
    /// Fails fast if the knowledge document is missing or unreadable, the
    /// embedding provider is disabled or misconfigured, or `GROQ_API_KEY`
    /// is absent. Building is idempotent; each call reconstructs the
    /// index from scratch.
    pub async fn build(config: &Config) -> Result<Self> {
        let text = load_document(&config.knowledge.path)?;
        let chunks = chunk_text(
            &text,
            config.knowledge.chunk_chars,
            config.knowledge.overlap_chars,
        );

        let embedder = create_embedder(&config.embedding)?;
        let generator: Box<dyn Generator> = Box::new(GroqGenerator::new(&config.generation)?);

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(config.embedding.batch_size.max(1)) {
            let batch_vectors = embedder
                .embed(batch)
                .await
                .context("Failed to embed knowledge chunks")?;
            vectors.extend(batch_vectors);
        }

        let index = KnowledgeIndex::new(chunks, vectors)?;

        info!(
            chunks = index.len(),
            model = embedder.model_name(),
            "knowledge index built"
        );

        Ok(Self {
            embedder,
            generator,
            index,
            top_k: config.retrieval.top_k,
        })
    }

    /// Assemble a pipeline from pre-built parts. Used by tests to
    /// substitute fake providers.
    pub fn from_parts(
        embedder: Box<dyn Embedder>,
        generator: Box<dyn Generator>,
        index: KnowledgeIndex,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            generator,
            index,
            top_k,
        }
    }

    /// Answer a free-form question against the knowledge index.
    pub async fn answer(&self, question: &str) -> Result<String, RetrievalError> {
        self.answer_inner(question).await.map_err(RetrievalError)
    }

    async fn answer_inner(&self, question: &str) -> Result<String> {
        let query_vecs = self
            .embedder
            .embed(&[question.to_string()])
            .await
            .context("Failed to embed question")?;
        let query_vec = query_vecs
            .into_iter()
            .next()
            .context("Empty embedding response for question")?;

        let retrieved = self.index.search(&query_vec, self.top_k);
        let prompt = build_prompt(
            question,
            retrieved.iter().map(|s| s.chunk.text.as_str()),
        );

        self.generator
            .generate(&prompt)
            .await
            .context("Failed to generate answer")
    }
}

#[async_trait]
impl Answerer for KnowledgePipeline {
    async fn answer(&self, question: &str) -> Result<String, RetrievalError> {
        KnowledgePipeline::answer(self, question).await
    }
}

/// Compose the grounded prompt: retrieved passages first, then the question.
fn build_prompt<'a>(question: &str, passages: impl Iterator<Item = &'a str>) -> String {
    let context = passages.collect::<Vec<_>>().join("\n\n---\n\n");
    format!(
        "Use the following passages from the knowledge base to answer the question.\n\n\
         {}\n\nQuestion: {}\nAnswer:",
        context, question
    )
}
