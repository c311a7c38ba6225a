use crate::error::{RagError, Result};
use tiktoken_rs::CoreBPE;

/// Counts tokens the way the completion model will see them
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// BPE tokenizer of an OpenAI chat model
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Load the tokenizer used by `model` (e.g. `gpt-3.5-turbo`)
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = tiktoken_rs::get_bpe_from_model(model)
            .map_err(|e| RagError::Config(format!("no tokenizer for model {}: {}", model, e)))?;
        Ok(TiktokenCounter { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// Word plus punctuation estimate, for when no model tokenizer is wanted
#[derive(Debug, Default, Clone, Copy)]
pub struct EstimatingCounter;

impl TokenCounter for EstimatingCounter {
    fn count(&self, text: &str) -> usize {
        estimate_token_count(text)
    }
}

/// Calculate approximate token count for a text
/// This is a very simple estimation - words plus punctuation
pub fn estimate_token_count(text: &str) -> usize {
    let words = text.split_whitespace().count();
    let punctuation = text.chars().filter(|c| c.is_ascii_punctuation()).count();
    words + punctuation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_counts_words_and_punctuation() {
        assert_eq!(estimate_token_count("Hello, world!"), 4);
        assert_eq!(estimate_token_count("body\n---\n"), 5);
        assert_eq!(estimate_token_count(""), 0);
    }

    #[test]
    fn test_tiktoken_counter_for_chat_model() {
        let counter = TiktokenCounter::for_model("gpt-3.5-turbo").unwrap();
        assert_eq!(counter.count("hello world"), 2);
        assert_eq!(counter.count(""), 0);
    }

    #[test]
    fn test_unknown_model_is_config_error() {
        let err = TiktokenCounter::for_model("definitely-not-a-model").err().unwrap();
        assert!(matches!(err, RagError::Config(_)));
    }
}
