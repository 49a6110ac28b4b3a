//! Estimated reading time

use serde::{Deserialize, Serialize};

use super::ContentBlock;

/// How headings and bodies are cut into words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WordSplit {
    /// Runs of any whitespace separate words; empty text has no words
    #[default]
    Whitespace,
    /// Every single `' '` separates words and empty pieces count, so empty
    /// text is one word
    SingleSpace,
}

impl WordSplit {
    /// Number of words in `text`
    pub fn count(self, text: &str) -> usize {
        match self {
            WordSplit::Whitespace => text.split_whitespace().count(),
            WordSplit::SingleSpace => text.split(' ').count(),
        }
    }
}

/// Reading time estimator
#[derive(Debug, Clone, Copy)]
pub struct ReadingTime {
    words_per_minute: usize,
    split: WordSplit,
}

impl Default for ReadingTime {
    fn default() -> Self {
        Self::new(200, WordSplit::default())
    }
}

impl ReadingTime {
    /// Create an estimator; `words_per_minute` must be positive
    pub fn new(words_per_minute: usize, split: WordSplit) -> Self {
        Self {
            words_per_minute: words_per_minute.max(1),
            split,
        }
    }

    /// Words contributed by one block (heading plus plain-text body)
    pub fn block_words(&self, block: &ContentBlock) -> usize {
        self.split.count(&block.heading) + self.split.count(&block.body_text())
    }

    /// Minutes needed to read `blocks`
    ///
    /// The running total is rounded up after every block, so each block
    /// costs at least a whole minute once it has any words. With an integer
    /// total `ceil(total + w / wpm)` equals `total + ceil(w / wpm)`, which is
    /// what the loop adds.
    pub fn estimate(&self, blocks: &[ContentBlock]) -> u32 {
        blocks.iter().fold(0u32, |minutes, block| {
            let words = self.block_words(block);
            minutes + words.div_ceil(self.words_per_minute) as u32
        })
    }
}
