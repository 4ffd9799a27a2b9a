use serde::{Deserialize, Serialize};

/// One overlapping window of transcript text
///
/// Spans are measured in characters (Unicode scalar values), half-open
/// `[start, end)`. Chunks from one transcript are ordered by `index` and
/// consecutive chunks overlap by a fixed number of characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of this chunk within the transcript's chunk sequence
    pub index: usize,
    /// Text contained in the window
    pub text: String,
    /// Character span `(start, end)` within the source text
    pub span: (usize, usize),
}

impl Chunk {
    /// Length of the chunk in characters
    pub fn len(&self) -> usize {
        self.span.1 - self.span.0
    }

    pub fn is_empty(&self) -> bool {
        self.span.1 == self.span.0
    }
}

/// Map-stage output for one chunk
///
/// One-to-one with the chunks that survive prefiltering. An empty `text`
/// marks a chunk whose map call failed under the empty-summary policy.
#[derive(Debug, Clone)]
pub struct PartialSummary {
    pub chunk_index: usize,
    pub text: String,
}
