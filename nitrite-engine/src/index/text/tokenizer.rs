use indexmap::IndexSet;
use std::ops::Deref;
use std::sync::Arc;

/// Splits text into index terms.
///
/// The default `tokenize` lower-cases the text, splits it on every
/// character that is not a letter or digit, drops stop words and returns
/// each distinct term once, in order of first appearance.
pub trait TokenizerProvider: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let stop_words = self.stop_words();
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|term| !term.is_empty() && !stop_words.iter().any(|word| word == term))
            .map(str::to_string)
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    fn stop_words(&self) -> &[&'static str];
}

#[derive(Clone)]
pub struct Tokenizer {
    inner: Arc<dyn TokenizerProvider>,
}

impl Tokenizer {
    pub fn new<T: TokenizerProvider + 'static>(inner: T) -> Self {
        Tokenizer { inner: Arc::new(inner) }
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Tokenizer::new(EnglishTokenizer)
    }
}

impl Deref for Tokenizer {
    type Target = Arc<dyn TokenizerProvider>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Tokenizer with English stop words.
pub struct EnglishTokenizer;

impl TokenizerProvider for EnglishTokenizer {
    #[inline]
    fn stop_words(&self) -> &[&'static str] {
        ENGLISH_STOP_WORDS
    }
}

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "with", "you",
];

#[cfg(test)]
mod tests {
    use super::*;

    struct NoStopWords;

    impl TokenizerProvider for NoStopWords {
        fn stop_words(&self) -> &[&'static str] {
            &[]
        }
    }

    #[test]
    fn english_tokenizer_lowercases_and_drops_stop_words() {
        let tokenizer = Tokenizer::default();
        assert_eq!(tokenizer.tokenize("The Quick, brown FOX!"), vec!["quick", "brown", "fox"]);
    }

    #[test]
    fn repeated_terms_appear_once() {
        let tokenizer = Tokenizer::new(NoStopWords);
        assert_eq!(tokenizer.tokenize("go go gadget go"), vec!["go", "gadget"]);
    }

    #[test]
    fn digits_are_kept() {
        let tokenizer = Tokenizer::default();
        assert_eq!(tokenizer.tokenize("route 66"), vec!["route", "66"]);
    }

    #[test]
    fn empty_text_has_no_terms() {
        assert!(Tokenizer::default().tokenize("  ...  ").is_empty());
    }
}
