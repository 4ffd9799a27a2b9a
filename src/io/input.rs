use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

use crate::models::{Transcript, TranscriptTurn};

static EMOJI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\u{2600}-\u{26FF}\u{2700}-\u{27BF}]+").expect("valid emoji pattern")
});
static FILLER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(uh+|um+)\b").expect("valid filler pattern"));
static SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("valid space pattern"));

/// Raw transcript entry as exported by meeting tools; the speaker may appear
/// under either `user` or `speaker`
#[derive(Debug, Deserialize)]
struct RawTurn {
    user: Option<String>,
    speaker: Option<String>,
    timestamp: Option<String>,
    text: Option<String>,
}

/// Strip emoji symbols and filler tokens ("uh", "um") from turn text
pub fn normalize_text(text: &str) -> String {
    let text = EMOJI_RE.replace_all(text, "");
    let text = FILLER_RE.replace_all(&text, "");
    SPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// Parse and normalize a JSON transcript file (array of turn objects)
///
/// Turn order is preserved; turns left empty by normalization are dropped.
pub fn load_transcript_file(path: &Path) -> Result<Transcript> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    parse_transcript_json(&content)
}

/// Parse and normalize a JSON transcript string
pub fn parse_transcript_json(json: &str) -> Result<Transcript> {
    let raw: Vec<RawTurn> = serde_json::from_str(json).context("Failed to parse transcript JSON")?;

    let turns = raw
        .into_iter()
        .filter_map(|entry| {
            let text = normalize_text(entry.text.as_deref().unwrap_or(""));
            if text.is_empty() {
                return None;
            }
            Some(TranscriptTurn {
                speaker: entry
                    .user
                    .or(entry.speaker)
                    .unwrap_or_else(|| "UNK".to_string()),
                timestamp: entry.timestamp,
                text,
            })
        })
        .collect();

    Ok(Transcript { turns })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_fillers_and_emoji() {
        assert_eq!(normalize_text("uh I think um we should ship ☀"), "I think we should ship");
        assert_eq!(normalize_text("Uhhh right"), "right");
        // "umbrella" is not a filler
        assert_eq!(normalize_text("the umbrella stand"), "the umbrella stand");
    }

    #[test]
    fn test_parse_transcript_drops_empty_turns_preserves_order() {
        let json = r#"[
            {"user": "Alice", "timestamp": "00:01", "text": "uh um"},
            {"speaker": "Bob", "text": "We need a decision."},
            {"text": "Agreed."}
        ]"#;

        let transcript = parse_transcript_json(json).unwrap();
        assert_eq!(transcript.turns.len(), 2);
        assert_eq!(transcript.turns[0].speaker, "Bob");
        assert_eq!(transcript.turns[0].text, "We need a decision.");
        assert_eq!(transcript.turns[1].speaker, "UNK");
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(parse_transcript_json("{not an array}").is_err());
    }
}
