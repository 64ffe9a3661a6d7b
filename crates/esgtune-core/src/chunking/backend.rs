//! # Tokenization Backends
//!
//! The chunker only needs the full token-id sequence of a document; window
//! cutting, padding and provenance tracking happen on our side.

use std::path::Path;

use tokenizers::Tokenizer as HfTokenizer;

use crate::error::{EsgError, Result};

/// Turns document text into token ids.
pub trait TokenizerBackend {
    /// Encode `text` without truncation or padding.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;
}

impl<F> TokenizerBackend for F
where
    F: Fn(&str) -> Vec<u32>,
{
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        Ok(self(text))
    }
}

/// Backend over a Hugging Face `tokenizer.json`.
pub struct HfTokenizerBackend {
    tokenizer: HfTokenizer,
    add_special_tokens: bool,
    pad_id: Option<u32>,
}

impl HfTokenizerBackend {
    /// Load a tokenizer from a `tokenizer.json` file.
    ///
    /// Any truncation or padding configured in the file is disabled.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut tokenizer = HfTokenizer::from_file(path)
            .map_err(|e| EsgError::Tokenizer(format!("{}: {}", path.display(), e)))?;
        let pad_id = tokenizer
            .get_padding()
            .map(|params| params.pad_id)
            .or_else(|| tokenizer.token_to_id("<pad>"))
            .or_else(|| tokenizer.token_to_id("[PAD]"));
        tokenizer
            .with_truncation(None)
            .map_err(|e| EsgError::Tokenizer(e.to_string()))?;
        tokenizer.with_padding(None);

        Ok(Self {
            tokenizer,
            add_special_tokens: false,
            pad_id,
        })
    }

    /// Whether to let the tokenizer add its special tokens to each document.
    pub fn with_special_tokens(mut self, enabled: bool) -> Self {
        self.add_special_tokens = enabled;
        self
    }

    /// Padding id declared by the tokenizer, if any.
    pub fn pad_token_id(&self) -> Option<u32> {
        self.pad_id
    }
}

impl TokenizerBackend for HfTokenizerBackend {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, self.add_special_tokens)
            .map_err(|e| EsgError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }
}
