use crate::models::Chunk;
use crate::pipeline::PipelineError;

/// Split text into overlapping windows of at most `max_size` characters
///
/// The window start advances by `max_size - overlap` each step, so every pair
/// of adjacent chunks shares exactly `overlap` characters and the union of
/// spans covers the whole text. The last chunk may be shorter. Text no longer
/// than `max_size` yields a single chunk spanning the whole input; callers
/// use that to skip map/reduce entirely.
///
/// Deterministic: identical arguments always produce identical chunks, which
/// keeps cache keys stable across re-runs.
pub fn chunk(text: &str, max_size: usize, overlap: usize) -> Result<Vec<Chunk>, PipelineError> {
    if max_size == 0 || overlap >= max_size {
        return Err(PipelineError::ChunkConfig { max_size, overlap });
    }

    // Byte offset of every char boundary, so slicing stays UTF-8 safe while
    // spans are counted in characters
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = boundaries.len() - 1;

    if total <= max_size {
        return Ok(vec![Chunk {
            index: 0,
            text: text.to_string(),
            span: (0, total),
        }]);
    }

    let step = max_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let end = (start + max_size).min(total);
        chunks.push(Chunk {
            index: chunks.len(),
            text: text[boundaries[start]..boundaries[end]].to_string(),
            span: (start, end),
        });
        if end == total {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk("hello world", 100, 10).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello world");
        assert_eq!(chunks[0].span, (0, 11));
    }

    #[test]
    fn test_overlapping_spans_for_12000_chars() {
        let text = "a".repeat(12_000);
        let chunks = chunk(&text, 4_000, 400).unwrap();

        let spans: Vec<(usize, usize)> = chunks.iter().map(|c| c.span).collect();
        assert_eq!(
            spans,
            vec![(0, 4_000), (3_600, 7_600), (7_200, 11_200), (10_800, 12_000)]
        );
        assert_eq!(chunks.last().unwrap().index, 3);
    }

    #[test]
    fn test_coverage_and_overlap() {
        let text: String = (0..9_731).map(|i| ((i % 26) as u8 + b'a') as char).collect();
        let max_size = 1_000;
        let overlap = 150;
        let chunks = chunk(&text, max_size, overlap).unwrap();

        assert_eq!(chunks[0].span.0, 0);
        assert_eq!(chunks.last().unwrap().span.1, text.chars().count());
        for pair in chunks.windows(2) {
            // Adjacent chunks overlap by exactly `overlap` characters
            assert_eq!(pair[0].span.1 - pair[1].span.0, overlap);
        }
        for c in &chunks {
            assert!(!c.text.is_empty());
            assert!(c.len() <= max_size);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "x".repeat(5_000);
        let a = chunk(&text, 1_200, 100).unwrap();
        let b = chunk(&text, 1_200, 100).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_multibyte_boundaries() {
        let text: String = "héllo wörld ".repeat(200);
        let chunks = chunk(&text, 500, 50).unwrap();
        let rebuilt: String = chunks
            .iter()
            .map(|c| {
                let skip = if c.index == 0 { 0 } else { 50 };
                c.text.chars().skip(skip).collect::<String>()
            })
            .collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(chunk("text", 100, 100).is_err());
        assert!(chunk("text", 100, 150).is_err());
        assert!(chunk("text", 0, 0).is_err());
    }
}
