//! Tokenization step: dataset splits in, per-split chunk files out.

use std::path::Path;

use anyhow::Result;

use esgtune_core::{ChunkSet, Chunker, Corpus, Split, TokenizerBackend};

use crate::data::{read_jsonl, write_jsonl};
use crate::dataset::{load_splits, split_path};

/// Chunk counts written by [`tokenize_dataset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizeSummary {
    pub documents: usize,
    pub unmatched: usize,
    pub train_chunks: usize,
    pub validation_chunks: usize,
}

/// Chunk both dataset splits and write them as
/// `<output_dir>/{train,validation}.jsonl`.
///
/// `doc_id` is assigned over train then validation, so ids are unique
/// across both output files.
pub fn tokenize_dataset<B: TokenizerBackend + ?Sized>(
    dataset_dir: &Path,
    output_dir: &Path,
    chunker: &Chunker,
    backend: &B,
    num_labels: usize,
) -> Result<TokenizeSummary> {
    let (train, validation) = load_splits(dataset_dir)?;
    let corpus = Corpus::from_splits(train, validation, num_labels)?;

    let chunks = chunker.chunk_corpus(&corpus, backend)?;
    let (train_chunks, validation_chunks) = chunks.partition();

    write_jsonl(&split_path(output_dir, Split::Train), train_chunks.chunks())?;
    write_jsonl(
        &split_path(output_dir, Split::Validation),
        validation_chunks.chunks(),
    )?;

    let summary = TokenizeSummary {
        documents: corpus.len(),
        unmatched: corpus.unmatched(),
        train_chunks: train_chunks.len(),
        validation_chunks: validation_chunks.len(),
    };
    tracing::info!(
        documents = summary.documents,
        train = summary.train_chunks,
        validation = summary.validation_chunks,
        total = summary.train_chunks + summary.validation_chunks,
        output = %output_dir.display(),
        "saved tokenized dataset"
    );
    Ok(summary)
}

/// Read one split's chunk file.
pub fn load_chunks(dir: &Path, split: Split) -> Result<ChunkSet> {
    let chunks = read_jsonl(&split_path(dir, split))?;
    Ok(ChunkSet::new(chunks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use esgtune_core::{ChunkerConfig, RawDocument};

    fn words(n: usize) -> String {
        vec!["w"; n].join(" ")
    }

    #[test]
    fn test_tokenize_dataset_writes_both_splits() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset");
        write_jsonl(
            &split_path(&dataset, Split::Train),
            &[
                RawDocument::new(words(3), Some(vec![1, 0])),
                RawDocument::new(words(12), Some(vec![0, 1])),
            ],
        )
        .unwrap();
        write_jsonl(
            &split_path(&dataset, Split::Validation),
            &[RawDocument::new(words(5), None)],
        )
        .unwrap();

        let backend = |text: &str| -> Vec<u32> { text.split_whitespace().map(|_| 5).collect() };
        let chunker = Chunker::new(ChunkerConfig::new(8, 2)).unwrap();
        let out = dir.path().join("tokenized");

        let summary = tokenize_dataset(&dataset, &out, &chunker, &backend, 2).unwrap();
        // 3 words -> 1 chunk, 12 words -> windows at 0 and 6 -> 2 chunks
        assert_eq!(
            summary,
            TokenizeSummary {
                documents: 3,
                unmatched: 1,
                train_chunks: 3,
                validation_chunks: 1,
            }
        );

        let train = load_chunks(&out, Split::Train).unwrap();
        let ids: Vec<usize> = train.chunks().iter().map(|c| c.doc_id).collect();
        assert_eq!(ids, vec![0, 1, 1]);

        let validation = load_chunks(&out, Split::Validation).unwrap();
        assert_eq!(validation.chunks()[0].doc_id, 2);
        assert_eq!(validation.chunks()[0].labels, vec![0, 0]);
        assert_eq!(validation.chunks()[0].real_tokens(), 5);
    }

    #[test]
    fn test_tokenize_rejects_bad_labels() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset");
        write_jsonl(
            &split_path(&dataset, Split::Train),
            &[RawDocument::new("a b", Some(vec![1, 2]))],
        )
        .unwrap();
        write_jsonl::<RawDocument>(&split_path(&dataset, Split::Validation), &[]).unwrap();

        let backend = |text: &str| -> Vec<u32> { text.split_whitespace().map(|_| 5).collect() };
        let chunker = Chunker::new(ChunkerConfig::new(8, 2)).unwrap();
        let result = tokenize_dataset(&dataset, &dir.path().join("out"), &chunker, &backend, 2);
        assert!(result.is_err());
    }
}
