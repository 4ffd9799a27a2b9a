use std::collections::HashSet;

use crate::models::Chunk;

/// English stopwords excluded from query keyword extraction
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "will", "with", "that", "this", "what", "when",
    "where", "which", "who", "why", "how", "did", "does", "about", "from", "into", "their",
    "there", "they", "them", "have", "has", "had", "been", "being", "would", "could", "should",
    "meeting", "discuss", "discussed", "summarize", "summary",
];

/// How surviving chunks are selected
///
/// The two policies are never mixed: a caller picks one explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterPolicy {
    /// Keep chunks whose keyword score is at least this value
    MinScore(usize),
    /// Keep the highest-scoring `k` chunks, in original order
    TopK(usize),
}

/// Extract scoring keywords from a query: lowercased word tokens longer than
/// two characters, stopwords removed
pub fn query_keywords(query: &str) -> HashSet<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|t| t.len() > 2 && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

fn score_chunk(chunk: &Chunk, keywords: &HashSet<String>) -> usize {
    chunk
        .text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|t| keywords.contains(*t))
        .count()
}

/// Discard chunks with low keyword relevance to the query
///
/// A cheap heuristic, not ranked retrieval: chunks are scored by how many of
/// their word tokens appear in the query's keyword set. Order is preserved.
///
/// Fail-open: when the query yields no keywords or every chunk scores zero,
/// the full input is returned unchanged, so the reduce stage never runs over
/// zero evidence.
pub fn filter_chunks(chunks: Vec<Chunk>, query: &str, policy: &FilterPolicy) -> Vec<Chunk> {
    let keywords = query_keywords(query);
    if chunks.is_empty() || keywords.is_empty() {
        return chunks;
    }

    let scores: Vec<usize> = chunks.iter().map(|c| score_chunk(c, &keywords)).collect();
    if scores.iter().all(|&s| s == 0) {
        return chunks;
    }

    match policy {
        FilterPolicy::MinScore(threshold) => {
            let kept: Vec<Chunk> = chunks
                .iter()
                .zip(&scores)
                .filter(|&(_, &s)| s >= *threshold)
                .map(|(c, _)| c.clone())
                .collect();
            if kept.is_empty() { chunks } else { kept }
        }
        FilterPolicy::TopK(k) => {
            if *k == 0 {
                return chunks;
            }
            let mut ranked: Vec<usize> = (0..chunks.len()).collect();
            ranked.sort_by(|&a, &b| scores[b].cmp(&scores[a]).then(a.cmp(&b)));
            let selected: HashSet<usize> = ranked.into_iter().take(*k).collect();
            chunks
                .into_iter()
                .enumerate()
                .filter(|(i, _)| selected.contains(i))
                .map(|(_, c)| c)
                .collect()
        }
    }
}
