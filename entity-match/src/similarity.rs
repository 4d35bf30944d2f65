//! String similarity primitives and the composite match score.
//!
//! The composite score places every (text, query) pair into a fixed
//! confidence band so that exact, prefix and substring hits always
//! outrank pure edit-distance matches:
//!
//! ```text
//! exact (case-insensitive)        1.0
//! text starts with query          0.9
//! text contains query             0.8
//! text contains every query word  0.7
//! similarity > 0.6                similarity * 0.8   (< 0.8)
//! per-word typo matches           min(words * 0.6, 0.5)
//! ```

/// Minimum whole-string similarity for the edit-distance band.
const SIMILARITY_BAND_MIN: f64 = 0.6;

/// Scale applied to whole-string similarity so it stays below substring hits.
const SIMILARITY_BAND_SCALE: f64 = 0.8;

/// Minimum per-word similarity for a query word to count as matched.
const WORD_MATCH_MIN: f64 = 0.8;

/// Scale and cap for the per-word band.
const WORD_BAND_SCALE: f64 = 0.6;
const WORD_BAND_CAP: f64 = 0.5;

/// Default minimum score kept by [`ranked_search`].
pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// Default result cap for [`ranked_search`].
pub const DEFAULT_MAX_RESULTS: usize = 50;

/// Levenshtein distance: the minimum number of single-character inserts,
/// deletes and substitutions that turn `a` into `b`.
///
/// Operates on Unicode scalar values and is case-sensitive.
/// `edit_distance("", x)` is the character length of `x`.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }

    let mut row: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, ac) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, bc) in b_chars.iter().enumerate() {
            let above = row[j + 1];
            let cost = usize::from(ac != *bc);
            row[j + 1] = (above + 1).min(row[j] + 1).min(diagonal + cost);
            diagonal = above;
        }
    }
    row[b_chars.len()]
}

/// Normalized, case-insensitive similarity in `[0, 1]`.
///
/// `1 - edit_distance / max(len(a), len(b))`, with `similarity("", "") = 1`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - edit_distance(&a, &b) as f64 / longest as f64
}

/// Score how well `text` matches `query`, in `[0, 1]`.
///
/// Branches are tried in priority order and the first that applies wins;
/// see the module docs for the bands.
pub fn composite_score(text: &str, query: &str) -> f64 {
    let text_lower = text.to_lowercase();
    let query_lower = query.to_lowercase();

    if text_lower == query_lower {
        return 1.0;
    }
    if text_lower.starts_with(&query_lower) {
        return 0.9;
    }
    if text_lower.contains(&query_lower) {
        return 0.8;
    }

    let query_words: Vec<&str> = query_lower.split_whitespace().collect();
    if query_words.iter().all(|word| text_lower.contains(word)) {
        return 0.7;
    }

    let whole = similarity(&text_lower, &query_lower);
    if whole > SIMILARITY_BAND_MIN {
        return whole * SIMILARITY_BAND_SCALE;
    }

    let text_words: Vec<&str> = text_lower.split_whitespace().collect();
    let word_count = query_words.len() as f64;
    let word_match_score: f64 = query_words
        .iter()
        .filter_map(|query_word| {
            text_words
                .iter()
                .map(|text_word| similarity(query_word, text_word))
                .reduce(f64::max)
        })
        .filter(|best| *best > WORD_MATCH_MIN)
        .map(|best| best / word_count)
        .sum();

    (word_match_score * WORD_BAND_SCALE).min(WORD_BAND_CAP)
}

/// Something that can be matched by name.
pub trait Searchable {
    /// The primary display name.
    fn primary_name(&self) -> &str;

    /// Other names the item is known by (legal name, former names).
    fn alternate_names(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Best composite score over the primary and alternate names.
    fn best_score(&self, query: &str) -> f64 {
        self.alternate_names()
            .into_iter()
            .map(|alt| composite_score(alt, query))
            .fold(composite_score(self.primary_name(), query), f64::max)
    }
}

/// An item paired with its match score.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored<T> {
    pub item: T,
    pub score: f64,
}

/// Score, filter, sort and truncate a set of items against `query`.
///
/// Each item is scored by [`Searchable::best_score`]. Items below
/// `threshold` are dropped, the rest are sorted by descending score
/// (stable, so ties keep input order) and truncated to `max_results`.
///
/// A blank query matches nothing specific: the first `max_results` items
/// are returned in input order with a score of zero.
pub fn ranked_search<T: Searchable>(
    items: impl IntoIterator<Item = T>,
    query: &str,
    threshold: f64,
    max_results: usize,
) -> Vec<Scored<T>> {
    if query.trim().is_empty() {
        return items
            .into_iter()
            .take(max_results)
            .map(|item| Scored { item, score: 0.0 })
            .collect();
    }

    let mut scored: Vec<Scored<T>> = items
        .into_iter()
        .map(|item| {
            let score = item.best_score(query);
            Scored { item, score }
        })
        .filter(|s| s.score >= threshold)
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(max_results);
    scored
}
