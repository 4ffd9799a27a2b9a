use serde::{Deserialize, Serialize};

/// One benchmark query paired with its meeting transcript
///
/// `meeting_id` groups queries that share a transcript; `query_id` is unique
/// within a meeting.
#[derive(Debug, Clone)]
pub struct QueryRecord {
    pub meeting_id: String,
    pub query_id: String,
    pub query: String,
    /// Normalized transcript text for the meeting
    pub input_text: String,
    /// Reference summary for scoring, when the dataset provides one
    pub reference: Option<String>,
}

/// One benchmark output row, written as a JSONL line
///
/// Immutable once emitted. A failed query is recorded with `prediction: null`
/// rather than being dropped, so a batch run always accounts for every query
/// it attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub meeting_id: String,
    pub query_id: String,
    pub query: String,
    pub prediction: Option<String>,
    pub reference: Option<String>,
}

impl PredictionRecord {
    pub fn from_query(record: &QueryRecord, prediction: Option<String>) -> Self {
        Self {
            meeting_id: record.meeting_id.clone(),
            query_id: record.query_id.clone(),
            query: record.query.clone(),
            prediction,
            reference: record.reference.clone(),
        }
    }
}

/// Final answer split into narrative summary and enumerated action items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSummary {
    pub summary: String,
    pub action_items: Vec<String>,
}
