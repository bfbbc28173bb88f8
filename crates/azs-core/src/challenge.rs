//! Disable-time verification challenge.
//!
//! Turning a protection off requires typing a word from [`WORDS`] backwards.

/// Fixed word list. All ASCII, so reversal is unambiguous.
pub const WORDS: &[&str] = &[
    "discipline",
    "attention",
    "patience",
    "deliberate",
    "presence",
    "intention",
    "stillness",
    "awareness",
    "boundary",
    "purpose",
    "moderation",
    "restraint",
    "mindful",
    "balance",
    "clarity",
    "resolve",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge {
    word: &'static str,
}

impl Challenge {
    /// Pick a word; `index` is reduced modulo the list length.
    pub fn pick(index: usize) -> Self {
        Self {
            word: WORDS[index % WORDS.len()],
        }
    }

    /// The word shown to the user.
    pub fn word(&self) -> &'static str {
        self.word
    }

    pub fn expected(&self) -> String {
        self.word.chars().rev().collect()
    }

    /// Exact match against the reversed word. No trimming, case-sensitive.
    pub fn verify(&self, input: &str) -> bool {
        input.chars().eq(self.word.chars().rev())
    }
}
