use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EsgError, Result};
use crate::types::labels::validate_label_vector;

/// Dataset split a document (and every chunk cut from it) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Validation,
}

impl Split {
    /// All splits in corpus order.
    pub const ALL: [Split; 2] = [Split::Train, Split::Validation];

    /// The split tag as written in chunk files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Validation => "validation",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = EsgError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "train" => Ok(Split::Train),
            "validation" => Ok(Split::Validation),
            other => Err(EsgError::UnknownSplit(other.to_string())),
        }
    }
}

/// A document record as produced by the conversion step, before it has
/// been assigned an id and split.
///
/// `labels` is `None` when the label table had no row for the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub text: String,
    #[serde(default)]
    pub labels: Option<Vec<i64>>,
}

impl RawDocument {
    pub fn new(text: impl Into<String>, labels: Option<Vec<i64>>) -> Self {
        Self {
            text: text.into(),
            labels,
        }
    }
}

/// A labelled document with a stable corpus ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: usize,
    pub text: String,
    pub labels: Vec<u8>,
    pub split: Split,
}

impl Document {
    /// Build a document, validating the label vector against `num_labels`.
    pub fn new(
        doc_id: usize,
        text: impl Into<String>,
        labels: &[i64],
        split: Split,
        num_labels: usize,
    ) -> Result<Self> {
        Ok(Self {
            doc_id,
            text: text.into(),
            labels: validate_label_vector(labels, num_labels)?,
            split,
        })
    }
}

/// Train and validation documents concatenated in that order, with
/// `doc_id` equal to each document's position in the concatenation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    documents: Vec<Document>,
    num_labels: usize,
    unmatched: usize,
}

impl Corpus {
    /// Assemble a corpus from the two raw splits.
    ///
    /// Documents without labels get an all-zero vector and are counted as
    /// unmatched. Present but malformed label vectors are rejected.
    pub fn from_splits(
        train: Vec<RawDocument>,
        validation: Vec<RawDocument>,
        num_labels: usize,
    ) -> Result<Self> {
        let mut documents = Vec::with_capacity(train.len() + validation.len());
        let mut unmatched = 0usize;

        let tagged = train
            .into_iter()
            .map(|doc| (doc, Split::Train))
            .chain(validation.into_iter().map(|doc| (doc, Split::Validation)));

        for (doc_id, (raw, split)) in tagged.enumerate() {
            let labels = match raw.labels {
                Some(labels) => labels,
                None => {
                    tracing::warn!(doc_id, "document has no labels, using all-zero vector");
                    unmatched += 1;
                    vec![0; num_labels]
                }
            };
            documents.push(Document::new(doc_id, raw.text, &labels, split, num_labels)?);
        }

        Ok(Self {
            documents,
            num_labels,
            unmatched,
        })
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    /// Number of documents that received the all-zero fallback.
    pub fn unmatched(&self) -> usize {
        self.unmatched
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Look up a document by its corpus ordinal.
    pub fn get(&self, doc_id: usize) -> Option<&Document> {
        self.documents.get(doc_id)
    }

    /// Documents of one split, in corpus order.
    pub fn split(&self, split: Split) -> impl Iterator<Item = &Document> {
        self.documents.iter().filter(move |doc| doc.split == split)
    }
}
