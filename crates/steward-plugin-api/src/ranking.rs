//! Ranked fuzzy matching.
//!
//! Wraps the Skim V2 scorer from `fuzzy-matcher`. Candidates are ordered by
//! score (descending), then by weight (ascending), then by their original
//! position, so the order is total and reproducible.
//!
//! Non-Latin titles are also scored through an ASCII phonetic transliteration,
//! so `beijing` finds `北京`. Transliterations are cached for the lifetime of
//! the matcher (one session), never persisted.

use std::collections::HashMap;
use std::sync::Arc;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use parking_lot::Mutex;
use pinyin::ToPinyin;
use steward_core::ResultItem;

/// Maximum number of ranked results.
pub const RESULT_LIMIT: usize = 20;

/// Which field of a candidate is scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RankKey {
    #[default]
    Title,
    Desc,
    Key,
    Id,
}

/// Something the matcher can score.
pub trait Rankable {
    fn rank_text(&self, key: RankKey) -> &str;

    fn rank_weight(&self) -> i32 {
        0
    }
}

impl Rankable for ResultItem {
    fn rank_text(&self, key: RankKey) -> &str {
        match key {
            RankKey::Title => &self.title,
            RankKey::Desc => self.desc.as_deref().unwrap_or(""),
            RankKey::Key => &self.key,
            RankKey::Id => self.id.as_deref().unwrap_or(""),
        }
    }

    fn rank_weight(&self) -> i32 {
        self.weight
    }
}

impl Rankable for String {
    fn rank_text(&self, _key: RankKey) -> &str {
        self
    }
}

impl Rankable for &str {
    fn rank_text(&self, _key: RankKey) -> &str {
        self
    }
}

/// Score-ordered, capped candidate filter.
///
/// Cheap to clone; clones share the scorer and the transliteration cache.
#[derive(Clone)]
pub struct RankedMatcher {
    matcher: Arc<SkimMatcherV2>,
    transliterations: Arc<Mutex<HashMap<String, Arc<str>>>>,
    limit: usize,
}

impl RankedMatcher {
    pub fn new() -> Self {
        Self::with_limit(RESULT_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            matcher: Arc::new(SkimMatcherV2::default().ignore_case()),
            transliterations: Arc::new(Mutex::new(HashMap::new())),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Filter and order `candidates` against `query`.
    ///
    /// Candidates that do not match are dropped. An empty query keeps every
    /// candidate, ordered by weight. At most `limit` candidates are returned.
    pub fn rank<T: Rankable>(&self, candidates: Vec<T>, query: &str, key: Option<RankKey>) -> Vec<T> {
        self.sorted(candidates, query, key, false)
    }

    /// Order `candidates` against `query` without filtering.
    ///
    /// For candidates a plugin already selected by its own criteria: those
    /// that do not match on `key` sort after the ones that do.
    pub fn order<T: Rankable>(&self, candidates: Vec<T>, query: &str, key: Option<RankKey>) -> Vec<T> {
        self.sorted(candidates, query, key, true)
    }

    fn sorted<T: Rankable>(
        &self,
        candidates: Vec<T>,
        query: &str,
        key: Option<RankKey>,
        keep_unmatched: bool,
    ) -> Vec<T> {
        let key = key.unwrap_or_default();
        let pattern = normalize_query(query);

        let mut scored: Vec<(i64, i32, usize, T)> = candidates
            .into_iter()
            .enumerate()
            .filter_map(|(index, candidate)| {
                let score = if pattern.is_empty() {
                    Some(0)
                } else {
                    self.score(candidate.rank_text(key), &pattern)
                };
                let score = match score {
                    Some(s) => s,
                    None if keep_unmatched => i64::MIN,
                    None => return None,
                };
                Some((score, candidate.rank_weight(), index, candidate))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| a.1.cmp(&b.1))
                .then_with(|| a.2.cmp(&b.2))
        });

        scored
            .into_iter()
            .take(self.limit)
            .map(|(_, _, _, candidate)| candidate)
            .collect()
    }

    /// Best score of `text` (or its transliteration) against a normalized pattern.
    pub fn score(&self, text: &str, pattern: &str) -> Option<i64> {
        let direct = self.matcher.fuzzy_match(text, pattern);
        if text.is_ascii() {
            return direct;
        }

        let phonetic = self.transliterate(text);
        direct.max(self.matcher.fuzzy_match(&phonetic, pattern))
    }

    /// Loose text match: substring of the text or its transliteration, or the
    /// query's characters appear in order.
    pub fn matches(&self, query: &str, text: &str) -> bool {
        if query.is_empty() || text.contains(query) {
            return true;
        }

        let phonetic = self.transliterate(text);
        if phonetic.contains(query) {
            return true;
        }

        let mut remaining = phonetic.chars();
        query
            .chars()
            .filter(|c| !c.is_whitespace())
            .all(|q| remaining.any(|c| c == q))
    }

    /// Lower-cased ASCII phonetic form of `text`, cached per distinct text.
    pub fn transliterate(&self, text: &str) -> Arc<str> {
        if text.is_ascii() {
            return Arc::from(text.to_ascii_lowercase());
        }

        if let Some(cached) = self.transliterations.lock().get(text) {
            return Arc::clone(cached);
        }

        let value: Arc<str> = Arc::from(transliteration(text));
        self.transliterations
            .lock()
            .insert(text.to_string(), Arc::clone(&value));
        value
    }

    /// Number of cached transliterations.
    pub fn cached(&self) -> usize {
        self.transliterations.lock().len()
    }

    /// Drop cached transliterations (e.g. at session end).
    pub fn clear_cache(&self) {
        self.transliterations.lock().clear();
    }
}

impl Default for RankedMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RankedMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankedMatcher")
            .field("limit", &self.limit)
            .field("cached", &self.cached())
            .finish()
    }
}

fn normalize_query(query: &str) -> String {
    query
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn transliteration(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        match c.to_pinyin() {
            Some(p) => out.push_str(p.plain()),
            None => out.extend(c.to_lowercase()),
        }
    }
    out
}
