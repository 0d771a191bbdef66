//! Passage types produced by the chunker.

/// One retrievable passage of a source document.
///
/// `chunk_index` is the position of the passage in the raw section
/// sequence of its document, assigned before whitespace-only sections
/// are filtered out. Indices of surviving passages are therefore not
/// necessarily contiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Non-empty passage text.
    pub text: String,
    /// Filename of the originating document (no directory component).
    pub source_file: String,
    /// Zero-based position in the pre-filter section sequence.
    pub chunk_index: usize,
}
