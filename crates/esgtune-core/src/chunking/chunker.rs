//! # Document Chunker
//!
//! Cuts each document's token sequence into fixed-length windows that
//! overlap by `stride` tokens, pads the last window, and stamps every
//! window with its parent document's id, labels and split.

use serde::{Deserialize, Serialize};

use crate::chunking::backend::TokenizerBackend;
use crate::error::{EsgError, Result};
use crate::types::{Chunk, ChunkSet, Corpus, Document};

/// Default window length for long-document models.
pub const DEFAULT_WINDOW_SIZE: usize = 4096;
/// Default overlap between consecutive windows.
pub const DEFAULT_STRIDE: usize = 512;
/// Longformer/RoBERTa `<pad>` id.
pub const DEFAULT_PAD_TOKEN_ID: u32 = 1;

/// Windowing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Tokens per chunk after padding.
    pub window_size: usize,
    /// Tokens shared by consecutive chunks of one document.
    pub stride: usize,
    /// Id written into padded positions.
    pub pad_token_id: u32,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            stride: DEFAULT_STRIDE,
            pad_token_id: DEFAULT_PAD_TOKEN_ID,
        }
    }
}

impl ChunkerConfig {
    pub fn new(window_size: usize, stride: usize) -> Self {
        Self {
            window_size,
            stride,
            ..Self::default()
        }
    }

    pub fn with_pad_token_id(mut self, pad_token_id: u32) -> Self {
        self.pad_token_id = pad_token_id;
        self
    }

    /// Distance between the starts of consecutive windows.
    pub fn step(&self) -> usize {
        self.window_size - self.stride
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(EsgError::InvalidChunking("window_size must be > 0".into()));
        }
        if self.stride >= self.window_size {
            return Err(EsgError::InvalidChunking(format!(
                "stride {} must be smaller than window_size {}",
                self.stride, self.window_size
            )));
        }
        Ok(())
    }
}

/// One padded window of token ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub token_ids: Vec<u32>,
    pub attention_mask: Vec<u8>,
}

/// Splits documents into overlapping chunks.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Create a chunker, rejecting window/stride combinations that cannot
    /// make progress.
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Cut a token sequence into padded windows.
    ///
    /// Always yields at least one window; an empty sequence yields a single
    /// all-padding window.
    pub fn windows(&self, token_ids: &[u32]) -> Vec<Window> {
        let size = self.config.window_size;
        let step = self.config.step();

        let mut windows = Vec::new();
        let mut start = 0usize;
        loop {
            let end = (start + size).min(token_ids.len());
            windows.push(self.pad(&token_ids[start..end]));
            if end >= token_ids.len() {
                break;
            }
            start += step;
        }
        windows
    }

    fn pad(&self, tokens: &[u32]) -> Window {
        let size = self.config.window_size;
        let mut token_ids = Vec::with_capacity(size);
        token_ids.extend_from_slice(tokens);
        token_ids.resize(size, self.config.pad_token_id);

        let mut attention_mask = vec![1u8; tokens.len()];
        attention_mask.resize(size, 0);

        Window {
            token_ids,
            attention_mask,
        }
    }

    /// Chunk one document.
    pub fn chunk_document<B: TokenizerBackend + ?Sized>(
        &self,
        document: &Document,
        backend: &B,
    ) -> Result<Vec<Chunk>> {
        let token_ids = backend.encode(&document.text)?;
        Ok(self
            .windows(&token_ids)
            .into_iter()
            .map(|window| Chunk {
                token_ids: window.token_ids,
                attention_mask: window.attention_mask,
                doc_id: document.doc_id,
                labels: document.labels.clone(),
                split: document.split,
            })
            .collect())
    }

    /// Chunk documents in input order.
    pub fn chunk_documents<B: TokenizerBackend + ?Sized>(
        &self,
        documents: &[Document],
        backend: &B,
    ) -> Result<ChunkSet> {
        let mut chunks = Vec::new();
        for document in documents {
            chunks.extend(self.chunk_document(document, backend)?);
        }
        tracing::debug!(
            documents = documents.len(),
            chunks = chunks.len(),
            "chunked documents"
        );
        Ok(ChunkSet::new(chunks))
    }

    /// Chunk a whole corpus.
    pub fn chunk_corpus<B: TokenizerBackend + ?Sized>(
        &self,
        corpus: &Corpus,
        backend: &B,
    ) -> Result<ChunkSet> {
        self.chunk_documents(corpus.documents(), backend)
    }
}
