use crate::index::Match;
use crate::tokens::TokenCounter;
use log::debug;
use std::sync::Arc;

/// Packs ranked matches into a context string under a token budget
#[derive(Clone)]
pub struct ContextAssembler {
    counter: Arc<dyn TokenCounter>,
    max_tokens: usize,
    delimiter: String,
}

impl ContextAssembler {
    pub fn new(counter: Arc<dyn TokenCounter>, max_tokens: usize, delimiter: impl Into<String>) -> Self {
        ContextAssembler {
            counter,
            max_tokens,
            delimiter: delimiter.into(),
        }
    }

    /// Concatenate trimmed chunk texts, each followed by the delimiter, in rank order
    ///
    /// Stops at the first chunk that would push the total over the budget, so
    /// the output is always a prefix of `matches`. Chunks are never truncated:
    /// an oversized first match yields an empty context.
    pub fn assemble(&self, matches: &[Match]) -> String {
        let mut context = String::new();
        let mut total_tokens = 0;
        let mut packed = 0;

        for m in matches {
            let candidate = format!("{}{}", m.chunk.text.trim(), self.delimiter);
            let tokens = self.counter.count(&candidate);

            if total_tokens + tokens > self.max_tokens {
                break;
            }

            context.push_str(&candidate);
            total_tokens += tokens;
            packed += 1;
        }

        debug!(
            "packed {} of {} matches into {} tokens",
            packed,
            matches.len(),
            total_tokens
        );
        context
    }
}
