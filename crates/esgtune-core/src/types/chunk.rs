use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::document::Split;
use crate::types::matrix::LabelMatrix;

/// A fixed-length token window cut from one document.
///
/// `doc_id`, `labels` and `split` are copied from the parent document when
/// the chunk is created so chunks can be shuffled and trained on
/// independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub token_ids: Vec<u32>,
    pub attention_mask: Vec<u8>,
    pub doc_id: usize,
    pub labels: Vec<u8>,
    pub split: Split,
}

impl Chunk {
    /// Number of non-padding tokens.
    pub fn real_tokens(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}

/// Chunks in input document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkSet {
    chunks: Vec<Chunk>,
}

impl ChunkSet {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Source document of the chunk at `index`.
    pub fn source_of(&self, index: usize) -> Option<usize> {
        self.chunks.get(index).map(|chunk| chunk.doc_id)
    }

    /// Chunks belonging to one split, preserving order.
    pub fn filter_split(&self, split: Split) -> ChunkSet {
        ChunkSet::new(
            self.chunks
                .iter()
                .filter(|chunk| chunk.split == split)
                .cloned()
                .collect(),
        )
    }

    /// Separate into (train, validation) without dropping or duplicating
    /// any chunk.
    pub fn partition(self) -> (ChunkSet, ChunkSet) {
        let (train, validation): (Vec<_>, Vec<_>) = self
            .chunks
            .into_iter()
            .partition(|chunk| chunk.split == Split::Train);
        (ChunkSet::new(train), ChunkSet::new(validation))
    }

    /// Chunk-level label matrix.
    pub fn label_matrix(&self, num_labels: usize) -> Result<LabelMatrix> {
        let rows: Vec<&[u8]> = self.chunks.iter().map(|c| c.labels.as_slice()).collect();
        LabelMatrix::from_label_rows(&rows, num_labels)
    }

    /// Document-level label matrix: one row per distinct `doc_id`, in
    /// first-seen order.
    pub fn document_label_matrix(&self, num_labels: usize) -> Result<LabelMatrix> {
        let mut seen = std::collections::HashSet::new();
        let rows: Vec<&[u8]> = self
            .chunks
            .iter()
            .filter(|c| seen.insert(c.doc_id))
            .map(|c| c.labels.as_slice())
            .collect();
        LabelMatrix::from_label_rows(&rows, num_labels)
    }
}

impl FromIterator<Chunk> for ChunkSet {
    fn from_iter<I: IntoIterator<Item = Chunk>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
