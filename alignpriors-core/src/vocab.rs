//! Word to index mapping with lowercasing and prefix/suffix stemming.
//!
//! Ids are dense, 0-based and assigned in first-seen order. The sampler's
//! file formats reserve index 0 for the NULL word; that +1 shift is applied
//! only at serialization boundaries (see [`Vocabulary::sampler_id`]), never
//! inside the crate.

use hashbrown::HashMap;

use crate::types::Token;

#[derive(Debug, Clone)]
pub struct Vocabulary {
    index: HashMap<String, Token>,
    words: Vec<String>,
    lowercase: bool,
    prefix_len: usize,
    suffix_len: usize,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary {
    /// Lowercasing on, no affix truncation.
    pub fn new() -> Self {
        Self::with_affixes(true, 0, 0)
    }

    /// `prefix_len`/`suffix_len` of 0 disable the respective truncation.
    /// The prefix cut is applied first, the suffix cut to its result, both
    /// counted in characters.
    pub fn with_affixes(lowercase: bool, prefix_len: usize, suffix_len: usize) -> Self {
        Vocabulary {
            index: HashMap::new(),
            words: Vec::new(),
            lowercase,
            prefix_len,
            suffix_len,
        }
    }

    fn normalize(&self, word: &str) -> String {
        let mut word = if self.lowercase {
            word.to_lowercase()
        } else {
            word.to_string()
        };
        if self.prefix_len != 0 {
            if let Some((at, _)) = word.char_indices().nth(self.prefix_len) {
                word.truncate(at);
            }
        }
        if self.suffix_len != 0 {
            let n_chars = word.chars().count();
            if n_chars > self.suffix_len {
                let at = word
                    .char_indices()
                    .nth(n_chars - self.suffix_len)
                    .map(|(at, _)| at)
                    .unwrap_or(0);
                word.replace_range(..at, "");
            }
        }
        word
    }

    /// Look up the normalized form, assigning the next free id on first
    /// sight. The same surface form always maps to the same id.
    pub fn intern(&mut self, word: &str) -> Token {
        let normalized = self.normalize(word);
        match self.index.get(&normalized) {
            Some(&id) => id,
            None => {
                let id = self.words.len() as Token;
                self.words.push(normalized.clone());
                self.index.insert(normalized, id);
                id
            }
        }
    }

    /// Non-inserting lookup of the normalized form.
    pub fn lookup(&self, word: &str) -> Option<Token> {
        self.index.get(&self.normalize(word)).copied()
    }

    /// Id in the sampler's numbering, where 0 is the NULL word and real
    /// words start at 1. `None` for unknown words; the priors serializer
    /// treats that as a droppable entry, not a failure.
    pub fn sampler_id(&self, word: &str) -> Option<Token> {
        self.lookup(word).map(|id| id + 1)
    }

    /// Number of distinct normalized forms seen (NULL not included).
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Reverse mapping, used when dumping translation tables.
    pub fn word(&self, id: Token) -> Option<&str> {
        self.words.get(id as usize).map(String::as_str)
    }
}
