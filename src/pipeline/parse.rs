use crate::models::ParsedSummary;

/// Split a final answer into a narrative summary and enumerated action items
///
/// Looks for a case-insensitive "Action Items:" heading; text before it is
/// the summary, lines after it become one item each (leading bullets and
/// numbering stripped). No marker is not an error: the whole text is the
/// summary and the item list is empty.
const MARKER: &str = "action items:";

pub fn parse_summary(text: &str) -> ParsedSummary {
    let trimmed = text.trim();

    // The marker is ASCII, so an ASCII-case-insensitive byte scan of the
    // original string yields offsets valid for slicing it. Lowercasing the
    // whole text first would shift byte offsets for some Unicode input.
    let Some(pos) = find_marker(trimmed) else {
        return ParsedSummary {
            summary: trimmed.to_string(),
            action_items: Vec::new(),
        };
    };

    let summary = trimmed[..pos].trim().to_string();
    let action_items = trimmed[pos + MARKER.len()..]
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*', '•'])
                .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')')
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect();

    ParsedSummary {
        summary,
        action_items,
    }
}

fn find_marker(text: &str) -> Option<usize> {
    text.as_bytes()
        .windows(MARKER.len())
        .position(|window| window.eq_ignore_ascii_case(MARKER.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_marker_fallback() {
        let parsed = parse_summary("no marker here");
        assert_eq!(parsed.summary, "no marker here");
        assert!(parsed.action_items.is_empty());
    }

    #[test]
    fn test_split_on_marker() {
        let text = "The team aligned on scope.\n\nAction Items:\n- Ship the beta\n- Book QA time\n";
        let parsed = parse_summary(text);
        assert_eq!(parsed.summary, "The team aligned on scope.");
        assert_eq!(parsed.action_items, vec!["Ship the beta", "Book QA time"]);
    }

    #[test]
    fn test_marker_case_insensitive() {
        let parsed = parse_summary("Summary body.\nACTION ITEMS:\n1. Follow up with legal");
        assert_eq!(parsed.summary, "Summary body.");
        assert_eq!(parsed.action_items, vec!["Follow up with legal"]);
    }

    #[test]
    fn test_marker_after_multibyte_text() {
        // 'İ' lowercases to two chars and grows by a byte, so offsets from a
        // lowercased copy would not line up with the original string.
        let parsed = parse_summary("İ did the recap.\nAction Items:\n- Send notes");
        assert_eq!(parsed.summary, "İ did the recap.");
        assert_eq!(parsed.action_items, vec!["Send notes"]);

        let parsed = parse_summary("İ did the recap.\nAction Items:");
        assert_eq!(parsed.summary, "İ did the recap.");
        assert!(parsed.action_items.is_empty());
    }

    #[test]
    fn test_blank_item_lines_dropped() {
        let parsed = parse_summary("S.\nAction items:\n\n- one\n   \n* two\n");
        assert_eq!(parsed.action_items, vec!["one", "two"]);
    }
}
