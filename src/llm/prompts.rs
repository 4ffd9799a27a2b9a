/// System prompt used for map, reduce, and single-shot calls
pub const SYSTEM_PROMPT: &str = "You are a precise, query-focused meeting summarizer. \
Write concise, factual summaries. \
Do not add any information that is not supported by the transcript.";

/// System prompt for the revision pass
pub const REVISE_SYSTEM_PROMPT: &str = "You are a precise editor for query-focused meeting summaries. \
Return only the revised summary, 4-6 sentences, factual, no preamble.";

/// Worked example prepended to map prompts when few-shot is enabled
const FEW_SHOT: &str = "### Example\n\
Query: 'What was decided about the release date?'\n\
Transcript slice:\n\
Alice: We agreed to aim for mid-July.\n\
Bob: The beta finishes end of June; July gives QA a buffer.\n\
Reference-style summary: The team decided to target a mid-July release, allowing time after the beta for QA.\n\
---\n\n";

/// Summarization mode, dispatched exhaustively at prompt-construction time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryMode {
    /// General summary with key points and action items
    General,
    /// Key decisions made in the meeting
    Decision,
    /// Issues or blockers raised by participants
    Blocker,
    /// Answer focused on a specific query
    Query(String),
}

impl SummaryMode {
    /// Short label used in output metadata and logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Decision => "decision",
            Self::Blocker => "blocker",
            Self::Query(_) => "query",
        }
    }

    /// The query text, when this mode carries one
    pub fn query(&self) -> Option<&str> {
        match self {
            Self::Query(q) => Some(q),
            _ => None,
        }
    }

    fn instruction(&self) -> String {
        match self {
            Self::General => {
                "Summarize this meeting. Include key points and action items.".to_string()
            }
            Self::Decision => "Summarize key decisions made in the meeting.".to_string(),
            Self::Blocker => {
                "Summarize any issues or blockers raised by participants.".to_string()
            }
            Self::Query(query) => {
                format!("Summarize the meeting in response to this query: '{query}'")
            }
        }
    }
}

fn preserve_clause(phrases: Option<&[String]>) -> String {
    match phrases {
        Some(phrases) if !phrases.is_empty() => format!(
            "Try to include these exact phrases if factually correct: {}\n\n",
            phrases.join("; ")
        ),
        _ => String::new(),
    }
}

/// Build the single-shot prompt used when the transcript fits in one call
pub fn build_single_prompt(mode: &SummaryMode, transcript: &str) -> String {
    format!("{}\n\n{}", mode.instruction(), transcript)
}

/// Build the map-stage prompt for one transcript slice
pub fn build_map_prompt(
    mode: &SummaryMode,
    slice: &str,
    phrases: Option<&[String]>,
    few_shot: bool,
) -> String {
    let mut prompt = String::new();
    if few_shot {
        prompt.push_str(FEW_SHOT);
    }
    match mode {
        SummaryMode::Query(query) => {
            prompt.push_str(
                "Task: answer ONLY the query using facts from the transcript slice. \
                 Be concise but complete; include all key facts. \
                 Reuse wording from the slice when possible. No preamble.\n\n",
            );
            prompt.push_str(&preserve_clause(phrases));
            prompt.push_str(&format!("Query: '{query}'\n\n"));
        }
        other => {
            prompt.push_str(&format!(
                "{} Base your answer only on the transcript slice below. No preamble.\n\n",
                other.instruction()
            ));
            prompt.push_str(&preserve_clause(phrases));
        }
    }
    prompt.push_str(&format!("Transcript slice:\n{slice}"));
    prompt
}

/// Build the reduce-stage prompt merging partial answers in chunk order
pub fn build_reduce_prompt(
    mode: &SummaryMode,
    partials: &[String],
    phrases: Option<&[String]>,
) -> String {
    let joined = partials.join("\n\n--- PART ---\n\n");
    let mut prompt = String::from(
        "Task: merge the partial answers into one coherent answer. \
         Eliminate duplicates; keep all key facts. \
         Reuse wording from the parts when possible. No preamble.\n\n",
    );
    prompt.push_str(&preserve_clause(phrases));
    if let Some(query) = mode.query() {
        prompt.push_str(&format!("Query: '{query}'\n\n"));
    }
    prompt.push_str(&format!("Partial answers:\n{joined}"));
    prompt
}

/// Build the revision prompt tightening the merged draft
pub fn build_revise_prompt(mode: &SummaryMode, draft: &str) -> String {
    let mut prompt = String::new();
    if let Some(query) = mode.query() {
        prompt.push_str(&format!("Query: '{query}'\n\n"));
    }
    prompt.push_str(
        "Revise the draft to be concise, coherent, and strictly supported by the transcript facts. \
         Edit wording; do not introduce new information.\n\n",
    );
    prompt.push_str(&format!("Draft:\n{draft}"));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_instructions() {
        assert!(SummaryMode::General.instruction().contains("action items"));
        assert!(SummaryMode::Decision.instruction().contains("decisions"));
        assert!(SummaryMode::Blocker.instruction().contains("blockers"));
        assert!(
            SummaryMode::Query("budget status".to_string())
                .instruction()
                .contains("'budget status'")
        );
    }

    #[test]
    fn test_map_prompt_query_mode() {
        let mode = SummaryMode::Query("what was decided".to_string());
        let prompt = build_map_prompt(&mode, "Alice: we ship in July", None, false);
        assert!(prompt.contains("Query: 'what was decided'"));
        assert!(prompt.contains("Transcript slice:\nAlice: we ship in July"));
        assert!(!prompt.contains("### Example"));

        let with_shot = build_map_prompt(&mode, "slice", None, true);
        assert!(with_shot.starts_with("### Example"));
    }

    #[test]
    fn test_reduce_prompt_joins_parts_in_order() {
        let mode = SummaryMode::Query("q".to_string());
        let partials = vec!["first".to_string(), "second".to_string()];
        let prompt = build_reduce_prompt(&mode, &partials, None);
        assert!(prompt.contains("first\n\n--- PART ---\n\nsecond"));
    }

    #[test]
    fn test_preserve_clause() {
        let phrases = vec!["release date".to_string(), "qa buffer".to_string()];
        let prompt = build_map_prompt(
            &SummaryMode::General,
            "slice",
            Some(&phrases),
            false,
        );
        assert!(prompt.contains("release date; qa buffer"));
    }
}
