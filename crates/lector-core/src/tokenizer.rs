//! Splitting extracted text into the word list the narrator walks through.

use std::fmt;
use std::sync::Arc;

/// Ordered, immutable list of word tokens.
///
/// Tokens keep any punctuation attached to them (`"Hello,"` stays
/// `"Hello,"`). The list is never edited in place: loading a new document
/// builds a new `WordList` and the old one is dropped. Cloning is cheap.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct WordList {
    words: Arc<[String]>,
}

impl WordList {
    /// Tokenize `text` into a new word list
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        tokenize(text)
    }

    /// Empty word list
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of words
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the list holds no words
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Word at `index`, if any
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    /// Whether `index` addresses a word in this list
    #[must_use]
    pub fn contains_index(&self, index: usize) -> bool {
        index < self.words.len()
    }

    /// Iterate over the words in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    /// Borrow the words as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.words
    }

    /// The words joined by single spaces
    #[must_use]
    pub fn text(&self) -> String {
        self.words.join(" ")
    }
}

impl fmt::Debug for WordList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordList")
            .field("len", &self.words.len())
            .field("first", &self.words.first())
            .finish()
    }
}

impl From<Vec<String>> for WordList {
    fn from(words: Vec<String>) -> Self {
        Self {
            words: words.into(),
        }
    }
}

/// Split `text` on runs of whitespace, dropping empty pieces.
///
/// No normalization happens: case, punctuation and non-ASCII characters pass
/// through untouched.
#[must_use]
pub fn tokenize(text: &str) -> WordList {
    text.split_whitespace()
        .map(str::to_owned)
        .collect::<Vec<_>>()
        .into()
}
