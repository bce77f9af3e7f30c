//! Typo correction applied to user messages before emotion detection.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use solace_core::config::NormalizerConfig;

use crate::error::ChatError;

/// Longest message the lexicon normalizer will attempt to correct.
pub const MAX_CORRECTION_CHARS: usize = 2000;

/// Maps raw text to corrected text.
pub trait TextNormalizer: Send + Sync {
    fn correct(&self, text: &str) -> Result<String, ChatError>;
}

/// Returns text unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughNormalizer;

impl TextNormalizer for PassthroughNormalizer {
    fn correct(&self, text: &str) -> Result<String, ChatError> {
        Ok(text.to_string())
    }
}

// =============================================================================
// LexiconNormalizer
// =============================================================================

/// Conversational and emotional words, ranked ahead of the general list.
const CONVERSATION_VOCABULARY: &[&str] = &[
    "it's", "i'm", "feel", "feeling", "feels", "felt", "today",
    "tomorrow", "yesterday", "week", "friend", "friends", "job", "sleep", "tired", "capital",
    "weather", "question", "please", "thanks", "thank", "sorry", "hello", "help", "lonely",
    "alone", "sad", "happy", "angry", "afraid", "scared", "anxious", "worried", "nervous",
    "depressed", "upset", "excited", "glad", "love", "hate", "hurt", "cry", "crying",
    "stressed", "overwhelmed", "frustrated", "confused", "surprised", "grateful", "hopeless",
    "miserable", "calm", "better", "worse", "bad", "terrible", "awful", "fine", "okay",
    "nothing", "anything", "everything", "someone", "anyone", "everyone", "myself",
    "yourself", "talking", "trying", "going", "doing", "having", "getting", "thinking",
    "wanted", "wants", "needed", "needs", "lost", "miss", "missing", "worry", "anxiety",
    "panic", "relationship", "partner", "work", "exam", "exams", "money", "health",
];

/// General English words, most frequent first.
const GENERAL_VOCABULARY: &[&str] = &[
    "the", "and", "you", "that", "was", "for", "are", "with", "his", "they", "this", "have",
    "from", "one", "had", "word", "but", "not", "what", "all", "were", "when", "your", "can",
    "said", "there", "use", "each", "which", "she", "how", "their", "will", "other", "about",
    "out", "many", "then", "them", "these", "some", "her", "would", "make", "like", "him",
    "into", "time", "has", "look", "two", "more", "write", "see", "number", "way", "could",
    "people", "than", "first", "water", "been", "call", "who", "its", "now", "find", "long",
    "down", "day", "did", "get", "come", "made", "may", "part", "over", "new", "sound",
    "take", "only", "little", "work", "know", "place", "year", "live", "back", "give", "most",
    "very", "after", "thing", "our", "just", "name", "good", "sentence", "man", "think",
    "say", "great", "where", "help", "through", "much", "before", "line", "right", "too",
    "mean", "old", "any", "same", "tell", "boy", "follow", "came", "want", "show", "also",
    "around", "form", "three", "small", "set", "put", "end", "does", "another", "well",
    "large", "must", "big", "even", "such", "because", "turn", "here", "why", "ask", "went",
    "men", "read", "need", "land", "different", "home", "move", "try", "kind", "hand",
    "picture", "again", "change", "off", "play", "spell", "air", "away", "animal", "house",
    "point", "page", "letter", "mother", "answer", "found", "study", "still", "learn",
    "should", "world", "high", "every", "near", "add", "food", "between", "own", "below",
    "country", "plant", "last", "school", "father", "keep", "tree", "never", "start", "city",
    "earth", "eye", "light", "thought", "head", "under", "story", "saw", "left", "don't",
    "few", "while", "along", "might", "close", "something", "seem", "next", "hard", "open",
    "example", "begin", "life", "always", "those", "both", "paper", "together", "got",
    "group", "often", "run", "important", "until", "children", "side", "feet", "car",
    "mile", "night", "walk", "white", "sea", "began", "grow", "took", "river", "four",
    "carry", "state", "once", "book", "hear", "stop", "without", "second", "later", "miss",
    "idea", "enough", "eat", "face", "watch", "far", "really", "almost", "let", "above",
    "girl", "sometimes", "mountain", "cut", "young", "talk", "soon", "list", "song", "being",
    "leave", "family",
];

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]+(?:'[A-Za-z]+)?").expect("Invalid word regex"));

/// Word-level typo corrector backed by a ranked vocabulary.
///
/// Known words, words shorter than three letters, and capitalized words
/// after the first (likely proper nouns) are left alone. Other words are
/// replaced by the closest vocabulary entry within edit distance 1
/// (2 for words of five letters or more), lower rank winning ties.
#[derive(Debug, Clone)]
pub struct LexiconNormalizer {
    /// word -> frequency rank (0 = most frequent)
    vocabulary: HashMap<String, usize>,
}

impl LexiconNormalizer {
    /// Normalizer over the built-in vocabulary.
    pub fn new() -> Self {
        Self::with_words(std::iter::empty::<&str>())
    }

    /// Built-in vocabulary extended with `extra`, ranked after it in order.
    pub fn with_words<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocabulary = HashMap::new();
        let words = CONVERSATION_VOCABULARY
            .iter()
            .chain(GENERAL_VOCABULARY)
            .map(|w| w.to_string())
            .chain(extra.into_iter().map(|w| w.as_ref().trim().to_lowercase()));
        for word in words {
            if word.is_empty() {
                continue;
            }
            let rank = vocabulary.len();
            vocabulary.entry(word).or_insert(rank);
        }
        Self { vocabulary }
    }

    /// Build from the `[normalizer]` config section, reading the optional
    /// whitespace-separated vocabulary file.
    pub fn from_config(config: &NormalizerConfig) -> Result<Self, ChatError> {
        match &config.vocabulary_path {
            Some(path) => {
                let content = std::fs::read_to_string(Path::new(path)).map_err(|e| {
                    ChatError::Normalizer(format!("cannot read vocabulary {}: {}", path, e))
                })?;
                Ok(Self::with_words(content.split_whitespace()))
            }
            None => Ok(Self::new()),
        }
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_known(&self, word: &str) -> bool {
        self.vocabulary.contains_key(&word.to_lowercase())
    }

    /// Best replacement for a single lowercase word, if one is close enough.
    fn suggest(&self, lower: &str) -> Option<&str> {
        let len = lower.chars().count();
        let max_distance = if len >= 5 { 2 } else { 1 };

        self.vocabulary
            .iter()
            .filter(|(candidate, _)| candidate.chars().count().abs_diff(len) <= max_distance)
            .filter_map(|(candidate, rank)| {
                let distance = edit_distance(lower, candidate);
                (distance <= max_distance).then_some((distance, *rank, candidate.as_str()))
            })
            .min_by_key(|(distance, rank, _)| (*distance, *rank))
            .map(|(_, _, candidate)| candidate)
    }

    fn correct_word(&self, word: &str, is_first: bool) -> String {
        if word.chars().count() < 3 {
            return word.to_string();
        }
        let starts_upper = word.chars().next().is_some_and(char::is_uppercase);
        if starts_upper && !is_first {
            return word.to_string();
        }
        let lower = word.to_lowercase();
        if self.vocabulary.contains_key(&lower) {
            return word.to_string();
        }
        match self.suggest(&lower) {
            Some(replacement) => match_case(word, replacement),
            None => word.to_string(),
        }
    }
}

impl Default for LexiconNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextNormalizer for LexiconNormalizer {
    fn correct(&self, text: &str) -> Result<String, ChatError> {
        if text.chars().count() > MAX_CORRECTION_CHARS {
            return Err(ChatError::Normalizer(format!(
                "text exceeds {} characters",
                MAX_CORRECTION_CHARS
            )));
        }
        let first_start = WORD_RE.find(text).map(|m| m.start());
        let corrected = WORD_RE.replace_all(text, |caps: &Captures| {
            let m = caps.get(0).map(|m| (m.start(), m.as_str()));
            match m {
                Some((start, word)) => self.correct_word(word, Some(start) == first_start),
                None => String::new(),
            }
        });
        Ok(corrected.into_owned())
    }
}

/// Apply the capitalization pattern of `original` to `replacement`.
fn match_case(original: &str, replacement: &str) -> String {
    let letters: Vec<char> = original.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return replacement.to_uppercase();
    }
    if original.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = replacement.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
    }
    replacement.to_string()
}

/// Optimal string alignment distance (Levenshtein plus adjacent transposition).
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    let mut d = vec![vec![0usize; m + 1]; n + 1];
    for (i, row) in d.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=m {
        d[0][j] = j;
    }
    for i in 1..=n {
        for j in 1..=m {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (d[i - 1][j] + 1)
                .min(d[i][j - 1] + 1)
                .min(d[i - 1][j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(d[i - 2][j - 2] + 1);
            }
            d[i][j] = best;
        }
    }
    d[n][m]
}
