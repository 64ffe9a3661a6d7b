//! Seeded train/validation split of the labelled report file.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use esgtune_core::{RawDocument, Split};

use crate::data::{read_jsonl, write_jsonl};

/// Shuffle `records` with a seeded generator and cut off
/// `ceil(n * validation_fraction)` of them for validation.
pub fn split_dataset<T>(
    mut records: Vec<T>,
    validation_fraction: f64,
    seed: u64,
) -> Result<(Vec<T>, Vec<T>)> {
    if !(validation_fraction > 0.0 && validation_fraction < 1.0) {
        bail!("validation_fraction must be in (0, 1), got {validation_fraction}");
    }

    let mut rng = oorandom::Rand64::new(u128::from(seed));
    for i in (1..records.len()).rev() {
        let j = rng.rand_range(0..(i as u64 + 1)) as usize;
        records.swap(i, j);
    }

    let n_validation = ((records.len() as f64) * validation_fraction).ceil() as usize;
    let n_validation = n_validation.min(records.len());
    let validation = records.split_off(records.len() - n_validation);
    Ok((records, validation))
}

/// File name of one split inside a dataset directory.
pub fn split_path(dir: &Path, split: Split) -> PathBuf {
    dir.join(format!("{split}.jsonl"))
}

/// Split the final labelled JSONL file into `train.jsonl` and
/// `validation.jsonl` under `output_dir`.
pub fn create_dataset(
    final_jsonl: &Path,
    output_dir: &Path,
    validation_fraction: f64,
    seed: u64,
) -> Result<(usize, usize)> {
    let records: Vec<RawDocument> = read_jsonl(final_jsonl)?;
    tracing::info!(samples = records.len(), path = %final_jsonl.display(), "loaded dataset");

    let (train, validation) = split_dataset(records, validation_fraction, seed)?;
    write_jsonl(&split_path(output_dir, Split::Train), &train)?;
    write_jsonl(&split_path(output_dir, Split::Validation), &validation)?;

    tracing::info!(
        train = train.len(),
        validation = validation.len(),
        output = %output_dir.display(),
        "dataset split written"
    );
    Ok((train.len(), validation.len()))
}

/// Load both splits written by [`create_dataset`].
pub fn load_splits(dir: &Path) -> Result<(Vec<RawDocument>, Vec<RawDocument>)> {
    let train = read_jsonl(&split_path(dir, Split::Train))?;
    let validation = read_jsonl(&split_path(dir, Split::Validation))?;
    Ok((train, validation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_sizes() {
        let (train, validation) = split_dataset((0..10).collect::<Vec<u32>>(), 0.2, 42).unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(validation.len(), 2);

        let (train, validation) = split_dataset((0..11).collect::<Vec<u32>>(), 0.2, 42).unwrap();
        assert_eq!(validation.len(), 3);
        assert_eq!(train.len(), 8);
    }

    #[test]
    fn test_split_is_a_permutation() {
        let (train, validation) = split_dataset((0..50).collect::<Vec<u32>>(), 0.3, 7).unwrap();
        let mut all: Vec<u32> = train.into_iter().chain(validation).collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<u32>>());
    }

    #[test]
    fn test_split_is_deterministic() {
        let a = split_dataset((0..30).collect::<Vec<u32>>(), 0.2, 42).unwrap();
        let b = split_dataset((0..30).collect::<Vec<u32>>(), 0.2, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        assert!(split_dataset(vec![1, 2, 3], 0.0, 1).is_err());
        assert!(split_dataset(vec![1, 2, 3], 1.0, 1).is_err());
    }

    #[test]
    fn test_split_empty() {
        let (train, validation) = split_dataset(Vec::<u8>::new(), 0.2, 1).unwrap();
        assert!(train.is_empty() && validation.is_empty());
    }

    #[test]
    fn test_create_and_load_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let final_jsonl = dir.path().join("final.jsonl");
        let docs: Vec<RawDocument> = (0..5)
            .map(|i| RawDocument::new(format!("report {i}"), Some(vec![i % 2, 1])))
            .collect();
        write_jsonl(&final_jsonl, &docs).unwrap();

        let out = dir.path().join("dataset");
        let (n_train, n_validation) = create_dataset(&final_jsonl, &out, 0.2, 42).unwrap();
        assert_eq!((n_train, n_validation), (4, 1));

        let (train, validation) = load_splits(&out).unwrap();
        assert_eq!(train.len(), 4);
        assert_eq!(validation.len(), 1);
        assert!(out.join("train.jsonl").exists());
        assert!(out.join("validation.jsonl").exists());
    }
}
