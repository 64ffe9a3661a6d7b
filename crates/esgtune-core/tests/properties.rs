use std::collections::HashSet;

use proptest::prelude::*;

use esgtune_core::metrics::MetricsAggregator;
use esgtune_core::threshold::{DEFAULT_THRESHOLD, SEARCH_LOWER, SEARCH_UPPER, binary_f1};
use esgtune_core::weights::ClassWeightMethod;
use esgtune_core::{
    Chunker, ChunkerConfig, Corpus, LabelMatrix, LabelNames, ProbMatrix, RawDocument, Split,
    ThresholdOptimizer, compute_class_weights,
};

fn label_rows(max_rows: usize, cols: usize) -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(0u8..=1, cols), 1..max_rows)
}

fn labelled_predictions(cols: usize) -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<Vec<f64>>)> {
    (1usize..40).prop_flat_map(move |rows| {
        (
            prop::collection::vec(prop::collection::vec(0u8..=1, cols), rows),
            prop::collection::vec(prop::collection::vec(0.0f64..=1.0, cols), rows),
        )
    })
}

proptest! {
    #[test]
    fn balanced_weights_cover_every_label(rows in label_rows(60, 4)) {
        let labels = LabelMatrix::from_label_rows(&rows, 4).unwrap();
        let weights = compute_class_weights(&labels, &ClassWeightMethod::Balanced, &LabelNames::positional());

        prop_assert_eq!(weights.len(), 4);
        for (col, &weight) in weights.iter().enumerate() {
            let column = labels.column(col);
            let pos = column.iter().filter(|&&v| v == 1).count();
            if pos == 0 {
                prop_assert_eq!(weight, 1.0);
            } else if 2 * pos <= column.len() {
                prop_assert!(weight >= 1.0);
            }
        }
    }

    #[test]
    fn balanced_weight_never_drops_as_positives_shrink(total in 2usize..500, pos in 2usize..500) {
        // zero positives short-circuit to 1.0, so compare non-empty counts only
        let pos = pos.min(total);
        let method = ClassWeightMethod::Balanced;
        prop_assert!(method.weight(pos - 1, total) >= method.weight(pos, total));
    }

    #[test]
    fn thresholds_in_range_and_not_worse_than_default((truth, probs) in labelled_predictions(3)) {
        let y = LabelMatrix::from_label_rows(&truth, 3).unwrap();
        let p = ProbMatrix::from_rows(&probs, 3).unwrap();
        let search = ThresholdOptimizer::new().optimize(&y, &p, &LabelNames::positional()).unwrap();

        prop_assert_eq!(search.len(), 3);
        for (col, found) in search.labels.iter().enumerate() {
            prop_assert!(found.threshold >= SEARCH_LOWER && found.threshold <= SEARCH_UPPER);
            let default_f1 = binary_f1(&y.column(col), &p.column(col), DEFAULT_THRESHOLD);
            prop_assert!(found.f1 >= default_f1);
            prop_assert_eq!(found.f1, binary_f1(&y.column(col), &p.column(col), found.threshold));
        }
    }

    #[test]
    fn aggregator_is_idempotent(
        (truth, probs) in labelled_predictions(2),
        t0 in 0.1f64..0.9,
        t1 in 0.1f64..0.9,
    ) {
        let y = LabelMatrix::from_label_rows(&truth, 2).unwrap();
        let p = ProbMatrix::from_rows(&probs, 2).unwrap();
        let aggregator = MetricsAggregator::default();

        let first = aggregator.aggregate(&y, &p, &[t0, t1]).unwrap();
        let second = aggregator.aggregate(&y, &p, &[t0, t1]).unwrap();
        for ((k1, v1), (k2, v2)) in first.iter().zip(second.iter()) {
            prop_assert_eq!(k1, k2);
            prop_assert_eq!(v1.to_bits(), v2.to_bits());
        }
    }

    #[test]
    fn chunk_splits_partition_the_chunk_set(
        train_lengths in prop::collection::vec(0usize..40, 0..6),
        validation_lengths in prop::collection::vec(0usize..40, 0..6),
        window in 2usize..12,
        overlap in 0usize..12,
    ) {
        let stride = overlap % window;
        let make = |lengths: &[usize]| -> Vec<RawDocument> {
            lengths
                .iter()
                .map(|&n| RawDocument::new(vec!["tok"; n].join(" "), Some(vec![1, 0])))
                .collect()
        };
        let corpus = Corpus::from_splits(make(&train_lengths), make(&validation_lengths), 2).unwrap();
        let backend = |text: &str| -> Vec<u32> { text.split_whitespace().map(|_| 7).collect() };

        let chunker = Chunker::new(ChunkerConfig::new(window, stride)).unwrap();
        let chunks = chunker.chunk_corpus(&corpus, &backend).unwrap();

        let train = chunks.filter_split(Split::Train);
        let validation = chunks.filter_split(Split::Validation);
        prop_assert_eq!(train.len() + validation.len(), chunks.len());

        // every document contributes, and every chunk points at exactly one
        // document of the same split
        let sources: HashSet<usize> = chunks.chunks().iter().map(|c| c.doc_id).collect();
        prop_assert_eq!(sources.len(), corpus.len());
        for chunk in chunks.chunks() {
            let doc = corpus.get(chunk.doc_id).unwrap();
            prop_assert_eq!(doc.split, chunk.split);
            prop_assert_eq!(&doc.labels, &chunk.labels);
            prop_assert_eq!(chunk.token_ids.len(), window);
        }

        // output order follows input document order
        let ids: Vec<usize> = chunks.chunks().iter().map(|c| c.doc_id).collect();
        prop_assert!(ids.windows(2).all(|pair| pair[0] <= pair[1]));
    }
}

#[test]
fn zero_positive_column_weight_is_exactly_one() {
    let rows = vec![[0u8]; 100];
    let labels = LabelMatrix::from_label_rows(&rows, 1).unwrap();
    let weights = compute_class_weights(&labels, &ClassWeightMethod::Balanced, &LabelNames::positional());
    assert_eq!(weights, vec![1.0]);
}

#[test]
fn unmatched_report_gets_zero_labels() {
    let corpus = Corpus::from_splits(vec![RawDocument::new("X123", None)], vec![], 7).unwrap();
    assert_eq!(corpus.unmatched(), 1);
    assert_eq!(corpus.documents()[0].labels, vec![0; 7]);
}
