use serde::{Deserialize, Serialize};

/// A single speaker turn in a meeting transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptTurn {
    /// Speaker name or label (falls back to "UNK" when missing)
    pub speaker: String,
    /// Optional timestamp string as recorded by the source tool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Spoken text for this turn
    pub text: String,
}

/// An ordered meeting transcript
///
/// Normalization edits turn text in place and drops empty turns; it never
/// reorders turns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    pub turns: Vec<TranscriptTurn>,
}

impl Transcript {
    /// Render the transcript as dialogue lines: `speaker [timestamp]: text`
    pub fn render_dialogue(&self) -> String {
        self.turns
            .iter()
            .map(|turn| {
                format!(
                    "{} [{}]: {}",
                    turn.speaker,
                    turn.timestamp.as_deref().unwrap_or(""),
                    turn.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_dialogue() {
        let transcript = Transcript {
            turns: vec![
                TranscriptTurn {
                    speaker: "Alice".to_string(),
                    timestamp: Some("00:01".to_string()),
                    text: "We agreed to ship in July.".to_string(),
                },
                TranscriptTurn {
                    speaker: "Bob".to_string(),
                    timestamp: None,
                    text: "QA needs the buffer.".to_string(),
                },
            ],
        };

        let dialogue = transcript.render_dialogue();
        assert_eq!(
            dialogue,
            "Alice [00:01]: We agreed to ship in July.\nBob []: QA needs the buffer."
        );
    }
}
