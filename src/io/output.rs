use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{ParsedSummary, PredictionRecord};

/// Line-oriented writer for benchmark predictions
///
/// Rows are appended in the order queries complete, which under concurrency
/// is not necessarily input order.
pub struct JsonlWriter {
    file: File,
    written: usize,
}

impl JsonlWriter {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
            }
        }
        let file =
            File::create(path).with_context(|| format!("Failed to create file: {:?}", path))?;
        Ok(Self { file, written: 0 })
    }

    pub fn write_record(&mut self, record: &PredictionRecord) -> Result<()> {
        let line = serde_json::to_string(record).context("Failed to serialize prediction")?;
        writeln!(self.file, "{}", line).context("Failed to write prediction line")?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

/// Single-transcript output: parsed answer plus run metadata
#[derive(Debug, Clone, Serialize)]
pub struct SummaryOutput {
    pub summary: String,
    pub action_items: Vec<String>,
    pub mode: String,
    pub model: String,
    pub chunks_total: usize,
    pub chunks_mapped: usize,
    pub map_failures: usize,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
}

impl SummaryOutput {
    pub fn new(
        parsed: ParsedSummary,
        mode: String,
        model: String,
        chunks_total: usize,
        chunks_mapped: usize,
        map_failures: usize,
    ) -> Self {
        Self {
            summary: parsed.summary,
            action_items: parsed.action_items,
            mode,
            model,
            chunks_total,
            chunks_mapped,
            map_failures,
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
        }
    }

    /// Write to a JSON file
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
            }
        }
        let file =
            File::create(path).with_context(|| format!("Failed to create file: {:?}", path))?;
        serde_json::to_writer_pretty(file, self).context("Failed to write summary JSON")?;
        Ok(())
    }

    /// Append a human-readable entry for this run to the log file
    pub fn append_run_log(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory: {:?}", parent))?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open run log: {:?}", path))?;

        writeln!(
            file,
            "[{}] run {} mode={} model={} chunks={}/{} failures={} actions={} | {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S"),
            self.run_id,
            self.mode,
            self.model,
            self.chunks_mapped,
            self.chunks_total,
            self.map_failures,
            self.action_items.len(),
            truncate_chars(&self.summary, 120),
        )
        .context("Failed to append run log entry")?;
        Ok(())
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max {
        flat
    } else {
        let head: String = flat.chars().take(max).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_output() -> SummaryOutput {
        SummaryOutput::new(
            ParsedSummary {
                summary: "The team agreed on scope.".to_string(),
                action_items: vec!["Ship the beta".to_string()],
            },
            "general".to_string(),
            "gpt-3.5-turbo".to_string(),
            4,
            4,
            0,
        )
    }

    #[test]
    fn test_jsonl_writer_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preds.jsonl");
        let mut writer = JsonlWriter::create(&path).unwrap();

        writer
            .write_record(&PredictionRecord {
                meeting_id: "m1".to_string(),
                query_id: "q1".to_string(),
                query: "what?".to_string(),
                prediction: Some("something".to_string()),
                reference: None,
            })
            .unwrap();
        writer
            .write_record(&PredictionRecord {
                meeting_id: "m1".to_string(),
                query_id: "q2".to_string(),
                query: "why?".to_string(),
                prediction: None,
                reference: Some("ref".to_string()),
            })
            .unwrap();

        assert_eq!(writer.written(), 2);
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        // Failed queries keep their row, marked with a null prediction
        let failed: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(failed["query_id"], "q2");
        assert!(failed["prediction"].is_null());
    }

    #[test]
    fn test_summary_output_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        sample_output().write_json(&path).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["summary"], "The team agreed on scope.");
        assert_eq!(parsed["action_items"][0], "Ship the beta");
        assert_eq!(parsed["mode"], "general");
        assert!(parsed["generated_at"].is_string());
    }

    #[test]
    fn test_run_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.log");

        sample_output().append_run_log(&path).unwrap();
        sample_output().append_run_log(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("mode=general"));
        assert!(content.contains("The team agreed on scope."));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars(&"x".repeat(15), 10), format!("{}...", "x".repeat(10)));
    }
}
