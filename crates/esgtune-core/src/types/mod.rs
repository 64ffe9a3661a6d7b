pub mod chunk;
pub mod document;
pub mod labels;
pub mod matrix;

pub use chunk::{Chunk, ChunkSet};
pub use document::{Corpus, Document, RawDocument, Split};
pub use labels::{LabelNames, validate_label_vector};
pub use matrix::{LabelMatrix, Matrix, ProbMatrix};
