use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::io::input::normalize_text;
use crate::models::QueryRecord;

/// One QMSum meeting file
///
/// Query lists are kept as raw JSON values because the dataset mixes shapes:
/// references appear as plain strings, `{text: ...}` objects, or lists of
/// either.
#[derive(Debug, Deserialize)]
struct QmsumFile {
    meeting_id: Option<String>,
    #[serde(default)]
    meeting_transcripts: Vec<QmsumSegment>,
    #[serde(default)]
    general_query_list: Vec<Value>,
    #[serde(default)]
    specific_query_list: Vec<Value>,
    query: Option<String>,
    answer: Option<Value>,
    summary: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct QmsumSegment {
    speaker: Option<String>,
    content: Option<String>,
}

/// Load every query from every `*.json` meeting file in a split directory
///
/// Files are visited in sorted order so runs are deterministic. A file that
/// fails to parse is skipped with a warning rather than aborting the batch.
pub fn load_qmsum_dir(dir: &Path) -> Result<Vec<QueryRecord>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read dataset directory: {:?}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut records = Vec::new();
    for path in paths {
        match load_meeting_file(&path) {
            Ok(mut meeting_records) => records.append(&mut meeting_records),
            Err(e) => warn!("Skipping unreadable dataset file {:?}: {}", path, e),
        }
    }
    Ok(records)
}

fn load_meeting_file(path: &Path) -> Result<Vec<QueryRecord>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let file: QmsumFile =
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))?;

    let meeting_id = file
        .meeting_id
        .clone()
        .or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "unknown".to_string());

    let input_text = concat_transcript(&file.meeting_transcripts);
    let records: Vec<QueryRecord> = extract_queries(&file)
        .into_iter()
        .map(|(query_id, query, reference)| QueryRecord {
            meeting_id: meeting_id.clone(),
            query_id,
            query,
            input_text: input_text.clone(),
            reference: Some(reference),
        })
        .collect();

    debug!("Loaded {} queries from {:?}", records.len(), path);
    Ok(records)
}

/// Join transcript segments into `speaker [index]: text` lines, normalized
fn concat_transcript(segments: &[QmsumSegment]) -> String {
    segments
        .iter()
        .enumerate()
        .filter_map(|(i, seg)| {
            let text = normalize_text(seg.content.as_deref().unwrap_or(""));
            if text.is_empty() {
                return None;
            }
            Some(format!(
                "{} [{}]: {}",
                seg.speaker.as_deref().unwrap_or("UNK"),
                i,
                text
            ))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pull `(query_id, query, reference)` triples from the general and specific
/// query lists plus the single-query fallback form
fn extract_queries(file: &QmsumFile) -> Vec<(String, String, String)> {
    let mut queries = Vec::new();
    pull_query_list(&file.general_query_list, "gen", &mut queries);
    pull_query_list(&file.specific_query_list, "spec", &mut queries);

    if let (Some(query), Some(reference)) = (
        &file.query,
        file.answer
            .as_ref()
            .or(file.summary.as_ref())
            .and_then(flatten_reference),
    ) {
        queries.push(("single".to_string(), query.trim().to_string(), reference));
    }

    queries
}

fn pull_query_list(list: &[Value], prefix: &str, out: &mut Vec<(String, String, String)>) {
    for (idx, item) in list.iter().enumerate() {
        let Some(obj) = item.as_object() else {
            continue;
        };
        let query = obj
            .get("query")
            .or_else(|| obj.get("question"))
            .and_then(Value::as_str);
        let reference = obj
            .get("answer")
            .or_else(|| obj.get("summary"))
            .or_else(|| obj.get("reference"))
            .and_then(flatten_reference);

        if let (Some(query), Some(reference)) = (query, reference) {
            let query_id = obj
                .get("query_id")
                .or_else(|| obj.get("id"))
                .map(value_to_id)
                .unwrap_or_else(|| format!("{prefix}-{idx}"));
            out.push((query_id, query.trim().to_string(), reference));
        }
    }
}

fn value_to_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reduce the dataset's assorted reference shapes to one string
fn flatten_reference(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj.get("text")?.as_str()?.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                Value::Object(obj) => obj
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" "),
        _ => return None,
    };
    let text = text.trim().to_string();
    if text.is_empty() { None } else { Some(text) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meeting_json() -> &'static str {
        r#"{
            "meeting_id": "m-42",
            "meeting_transcripts": [
                {"speaker": "PM", "content": "uh let's review the budget"},
                {"speaker": "Designer", "content": ""},
                {"speaker": "Dev", "content": "the remote is over budget"}
            ],
            "general_query_list": [
                {"query": "Summarize the whole meeting.", "answer": "They reviewed the budget."}
            ],
            "specific_query_list": [
                {"question": "What about the remote?", "answer": {"text": "It is over budget."}},
                {"query": "Missing reference, must be skipped"}
            ]
        }"#
    }

    #[test]
    fn test_load_meeting_queries_and_transcript() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m42.json"), meeting_json()).unwrap();

        let records = load_qmsum_dir(dir.path()).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].meeting_id, "m-42");
        assert_eq!(records[0].query_id, "gen-0");
        assert_eq!(records[0].reference.as_deref(), Some("They reviewed the budget."));
        assert_eq!(
            records[0].input_text,
            "PM [0]: let's review the budget\nDev [2]: the remote is over budget"
        );

        assert_eq!(records[1].query_id, "spec-0");
        assert_eq!(records[1].query, "What about the remote?");
        assert_eq!(records[1].reference.as_deref(), Some("It is over budget."));
    }

    #[test]
    fn test_malformed_file_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{truncated").unwrap();
        std::fs::write(dir.path().join("good.json"), meeting_json()).unwrap();

        let records = load_qmsum_dir(dir.path()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_meeting_id_falls_back_to_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{
            "meeting_transcripts": [{"speaker": "A", "content": "hello there"}],
            "query": "What happened?",
            "answer": "Nothing much."
        }"#;
        std::fs::write(dir.path().join("standup_07.json"), json).unwrap();

        let records = load_qmsum_dir(dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].meeting_id, "standup_07");
        assert_eq!(records[0].query_id, "single");
    }

    #[test]
    fn test_reference_list_flattened() {
        let value: Value = serde_json::json!([{"text": "part one."}, "part two."]);
        assert_eq!(
            flatten_reference(&value).as_deref(),
            Some("part one. part two.")
        );
    }
}
