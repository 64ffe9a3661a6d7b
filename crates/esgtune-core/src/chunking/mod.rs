pub mod backend;
pub mod chunker;

pub use backend::{HfTokenizerBackend, TokenizerBackend};
pub use chunker::{Chunker, ChunkerConfig, Window};
