use std::collections::HashMap;

/// Bigrams too generic to be worth preserving
const STOP_BIGRAMS: &[&str] = &[
    "you know", "kind of", "sort of", "a lot", "at the", "in the", "on the", "for the", "to the",
    "and the", "of the", "with the",
];

/// Extract the `k` most frequent content bigrams from the transcript
///
/// Used to nudge the model toward reusing source wording: map and reduce
/// prompts list these phrases and ask the model to keep them when factually
/// correct.
pub fn top_bigrams(text: &str, k: usize) -> Vec<String> {
    let tokens: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|t| t.len() > 2)
        .map(str::to_string)
        .collect();

    if tokens.len() < 2 {
        return Vec::new();
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for pair in tokens.windows(2) {
        *counts.entry(format!("{} {}", pair[0], pair[1])).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    ranked
        .into_iter()
        .map(|(bigram, _)| bigram)
        .filter(|b| !STOP_BIGRAMS.contains(&b.as_str()))
        .take(k)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_bigrams_ranked_by_frequency() {
        let text = "release date release date release date budget review budget review lunch plans";
        let bigrams = top_bigrams(text, 2);
        assert_eq!(bigrams[0], "release date");
        assert_eq!(bigrams[1], "budget review");
    }

    #[test]
    fn test_stop_bigrams_excluded() {
        let text = "you know you know you know the budget estimate the budget estimate";
        let bigrams = top_bigrams(text, 5);
        assert!(!bigrams.contains(&"you know".to_string()));
        assert!(bigrams.contains(&"budget estimate".to_string()));
    }

    #[test]
    fn test_too_short_input() {
        assert!(top_bigrams("word", 5).is_empty());
        assert!(top_bigrams("", 5).is_empty());
    }
}
