//! Fuzzy ranking and search
//!
//! Rankers score how well a candidate string matches a query, between 0 and 1.
//! They stack by wrapping each other:
//!
//! - [`JaroRanker`]: Jaro similarity on the raw strings
//! - [`SortedWordsRanker`]: ignores case, punctuation and word order
//! - [`ContainsBoostRanker`]: boosts candidates that contain the query verbatim
//!
//! [`FuzzySearcher`] ranks a list of arbitrary items with any ranker.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::services::fuzzy::{FuzzySearcher, SearchOptions};
//!
//! let searcher = FuzzySearcher::default();
//! let hits = searcher.search("simpsons", &titles, &SearchOptions::default(), |t| t.as_str());
//! ```

/// Capability shared by all rankers
pub trait FuzzyRanker: Send + Sync {
    /// Generate a value between 0 and 1, where 1 means the strings are
    /// the same and 0 that they have no overlap.
    fn similarity(&self, query: &str, candidate: &str) -> f64;
}

/// Full ranking stack used for channel search
pub type DefaultRanker = ContainsBoostRanker<SortedWordsRanker<JaroRanker>>;

/// Jaro similarity
#[derive(Debug, Clone, Copy, Default)]
pub struct JaroRanker;

impl JaroRanker {
    /// Characters of `a` also found in `b` within `max_distance` of the same
    /// index. Every character of `b` is used at most once.
    fn matching_chars(a: &[char], b: &[char], max_distance: usize) -> Vec<char> {
        let mut unused: Vec<Option<char>> = b.iter().copied().map(Some).collect();
        let mut matching = Vec::with_capacity(a.len().min(b.len()));

        for (i, &c) in a.iter().enumerate() {
            let start = i.saturating_sub(max_distance);
            let end = (i + max_distance + 1).min(b.len());

            for slot in unused.iter_mut().take(end).skip(start) {
                if *slot == Some(c) {
                    *slot = None;
                    matching.push(c);
                    break;
                }
            }
        }

        matching
    }

    fn jaro_similarity(a: &[char], b: &[char]) -> f64 {
        // Strings of length < 4 only match on the same index
        let max_distance = (a.len().max(b.len()) / 2).saturating_sub(1);

        let matching_left = Self::matching_chars(a, b, max_distance);
        let matching_right = Self::matching_chars(b, a, max_distance);

        let matches = matching_left.len();
        if matches == 0 {
            return 0.0;
        }

        let transpositions = matching_left
            .iter()
            .zip(matching_right.iter())
            .filter(|(l, r)| l != r)
            .count()
            / 2;

        let m = matches as f64;
        (m / a.len() as f64 + m / b.len() as f64 + (matches - transpositions) as f64 / m) / 3.0
    }
}

impl FuzzyRanker for JaroRanker {
    fn similarity(&self, query: &str, candidate: &str) -> f64 {
        let query: Vec<char> = query.chars().collect();
        let candidate: Vec<char> = candidate.chars().collect();
        Self::jaro_similarity(&query, &candidate)
    }
}

/// Compares lower-cased, punctuation-free words in alphabetical order
#[derive(Debug, Clone, Copy, Default)]
pub struct SortedWordsRanker<R = JaroRanker> {
    inner: R,
}

impl<R: FuzzyRanker> SortedWordsRanker<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Lower-case, drop punctuation and sort the words alphabetically
    fn sort_words(text: &str) -> String {
        let cleaned: String = text
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        let mut words: Vec<&str> = cleaned.split_whitespace().collect();
        words.sort_unstable();
        let sorted = words.join(" ");

        // Punctuation-only input still compares against itself
        if sorted.is_empty() {
            text.to_lowercase()
        } else {
            sorted
        }
    }
}

impl<R: FuzzyRanker> FuzzyRanker for SortedWordsRanker<R> {
    fn similarity(&self, query: &str, candidate: &str) -> f64 {
        self.inner
            .similarity(&Self::sort_words(query), &Self::sort_words(candidate))
    }
}

/// Ranks candidates containing the whole query (ignoring case) higher.
/// The longer the query, the bigger the boost.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainsBoostRanker<R = SortedWordsRanker> {
    inner: R,
}

impl<R: FuzzyRanker> ContainsBoostRanker<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Score multiplier for a contained query of `query_len` characters
    pub fn scaling_factor(query_len: usize) -> f64 {
        1.1f64.powi(i32::try_from(query_len).unwrap_or(i32::MAX))
    }

    /// Lowest score a candidate containing the query can get
    pub fn min_ranking(query_len: usize) -> f64 {
        (0.4 * Self::scaling_factor(query_len)).min(0.7)
    }
}

impl<R: FuzzyRanker> FuzzyRanker for ContainsBoostRanker<R> {
    fn similarity(&self, query: &str, candidate: &str) -> f64 {
        let score = self.inner.similarity(query, candidate);

        if candidate.to_lowercase().contains(&query.to_lowercase()) {
            let query_len = query.chars().count();
            let boosted = score * Self::scaling_factor(query_len);
            return boosted.max(Self::min_ranking(query_len)).min(1.0);
        }

        score
    }
}

/// Result limits for [`FuzzySearcher::search`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Maximum amount of returned results
    pub max_results: usize,
    /// Results must score strictly above this, between 0 and 1
    pub min_confidence: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 15,
            min_confidence: 0.5,
        }
    }
}

/// Ranks items against a query with a [`FuzzyRanker`]
#[derive(Debug, Clone, Default)]
pub struct FuzzySearcher<R = DefaultRanker> {
    ranker: R,
}

impl<R: FuzzyRanker> FuzzySearcher<R> {
    pub fn new(ranker: R) -> Self {
        Self { ranker }
    }

    /// Search for `query` in `items`, best match first.
    ///
    /// `project` turns an item into the string compared against the query.
    /// Items are sorted by score (stable, so ties keep their input order),
    /// then taken while their score is above `min_confidence`, then
    /// truncated to `max_results`.
    pub fn search<T, I, F, S>(
        &self,
        query: &str,
        items: I,
        options: &SearchOptions,
        project: F,
    ) -> Vec<T>
    where
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> S,
        S: AsRef<str>,
    {
        let mut scored: Vec<(T, f64)> = items
            .into_iter()
            .map(|item| {
                let score = self.ranker.similarity(query, project(&item).as_ref());
                (item, score)
            })
            .collect();

        scored.sort_by(|(_, a), (_, b)| b.total_cmp(a));

        scored
            .into_iter()
            .take_while(|(_, score)| *score > options.min_confidence)
            .map(|(item, _)| item)
            .take(options.max_results)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn sorted() -> SortedWordsRanker {
        SortedWordsRanker::default()
    }

    fn contains() -> DefaultRanker {
        ContainsBoostRanker::default()
    }

    #[test]
    fn test_identical_strings_score_one() {
        for s in ["a", "ab", "abc", "Die Simpsons", "KiKA HD", "Ärzte TV", "!!"] {
            assert_eq!(JaroRanker.similarity(s, s), 1.0, "jaro {s}");
            assert_eq!(sorted().similarity(s, s), 1.0, "sorted {s}");
            assert_eq!(contains().similarity(s, s), 1.0, "contains {s}");
        }
    }

    #[test]
    fn test_jaro_known_values() {
        // Classic textbook pairs
        let martha = JaroRanker.similarity("MARTHA", "MARHTA");
        assert!((martha - 0.944444444).abs() < 1e-6, "{martha}");

        let dixon = JaroRanker.similarity("DIXON", "DICKSONX");
        assert!((dixon - 0.766666666).abs() < 1e-6, "{dixon}");
    }

    #[test]
    fn test_jaro_no_overlap() {
        assert_eq!(JaroRanker.similarity("abc", "xyz"), 0.0);
        assert_eq!(JaroRanker.similarity("", "abc"), 0.0);
        assert_eq!(JaroRanker.similarity("", ""), 0.0);
    }

    #[test]
    fn test_jaro_short_strings_match_same_index_only() {
        assert_eq!(JaroRanker.similarity("ab", "ba"), 0.0);
        assert!(JaroRanker.similarity("ab", "ac") > 0.0);
    }

    #[test]
    fn test_jaro_is_in_range() {
        let pairs = [
            ("simpsons", "die simpsons show"),
            ("a", "aaaaaaaaaa"),
            ("news", "sport"),
            ("zdf", "zdfneo"),
        ];
        for (a, b) in pairs {
            let score = JaroRanker.similarity(a, b);
            assert!((0.0..=1.0).contains(&score), "{a} {b} {score}");
        }
    }

    #[test]
    fn test_sorted_words_ignores_order_case_and_punctuation() {
        let reversed = sorted().similarity("Die Simpsons", "Simpsons Die");
        let same = sorted().similarity("Die Simpsons", "Die Simpsons");
        assert!((reversed - same).abs() < EPSILON);
        assert_eq!(reversed, 1.0);

        assert_eq!(sorted().similarity("ZDF-Neo!", "zdfneo"), 1.0);
        assert_eq!(sorted().similarity("Das   Erste", "erste das"), 1.0);
    }

    #[test]
    fn test_contains_boost() {
        let query = "Simpsons";
        let candidate = "Die Simpsons Show";

        let boosted = contains().similarity(query, candidate);
        let plain = sorted().similarity(query, candidate);
        let min_ranking = DefaultRanker::min_ranking(query.len());

        assert!((min_ranking - 0.7).abs() < EPSILON);
        assert!(boosted >= min_ranking);
        assert!(boosted >= plain);
        assert!(boosted <= 1.0);
    }

    #[test]
    fn test_contains_boost_short_query_floor() {
        // 0.4 * 1.1^2 = 0.484
        let min_ranking = DefaultRanker::min_ranking(2);
        assert!((min_ranking - 0.484).abs() < 1e-9);
        assert!(contains().similarity("tv", "Some Long Channel Name TV") >= min_ranking);
    }

    #[test]
    fn test_no_boost_without_containment() {
        let query = "simpsons";
        let candidate = "simpson family";
        assert_eq!(
            contains().similarity(query, candidate),
            sorted().similarity(query, candidate)
        );
    }

    #[test]
    fn test_search_basic() {
        let items = vec!["Apple", "Banana", "Grape"];
        let searcher = FuzzySearcher::<DefaultRanker>::default();

        let results = searcher.search("appl", items, &SearchOptions::default(), |s| *s);

        assert_eq!(results.first(), Some(&"Apple"));
        assert!(!results.contains(&"Grape"));
    }

    #[test]
    fn test_search_max_results() {
        let items = vec!["Das Erste HD", "Das Erste", "Das Erste Alpha"];
        let searcher = FuzzySearcher::<DefaultRanker>::default();
        let options = SearchOptions {
            max_results: 1,
            ..SearchOptions::default()
        };

        let all = searcher.search("das erste", items.clone(), &SearchOptions::default(), |s| *s);
        assert_eq!(all.len(), 3);

        let results = searcher.search("das erste", items, &options, |s| *s);
        assert_eq!(results, vec![all[0]]);
    }

    #[test]
    fn test_search_empty_when_below_confidence() {
        let searcher = FuzzySearcher::<DefaultRanker>::default();
        let results = searcher.search("xyz", vec!["Apple", "Banana"], &SearchOptions::default(), |s| *s);
        assert!(results.is_empty());
    }

    #[test]
    fn test_search_ties_keep_input_order() {
        let searcher = FuzzySearcher::new(JaroRanker);
        let items = vec![("first", "News"), ("second", "News"), ("third", "News")];

        let results = searcher.search("News", items, &SearchOptions::default(), |(_, t)| *t);
        let ids: Vec<&str> = results.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    /// Ranker that scores by a fixed table, regardless of the query
    struct TableRanker;

    impl FuzzyRanker for TableRanker {
        fn similarity(&self, _query: &str, candidate: &str) -> f64 {
            match candidate {
                "high" => 0.9,
                "mid" => 0.6,
                "exact" => 0.5,
                _ => 0.1,
            }
        }
    }

    #[test]
    fn test_search_threshold_is_strict() {
        let searcher = FuzzySearcher::new(TableRanker);
        let results = searcher.search(
            "q",
            vec!["low", "exact", "mid", "high"],
            &SearchOptions::default(),
            |s| *s,
        );
        assert_eq!(results, vec!["high", "mid"]);
    }

    #[test]
    fn test_search_by_reference() {
        let titles = vec!["KiKA".to_string(), "ZDF".to_string()];
        let searcher = FuzzySearcher::<DefaultRanker>::default();

        let results = searcher.search("kika", &titles, &SearchOptions::default(), |t| t.as_str());
        assert_eq!(results, vec![&titles[0]]);
    }
}
