//! Heading-structured Markdown chunking.
//!
//! A document is split into one section per heading boundary, in
//! document order. Section text is the body under the heading; the
//! heading line itself is structural and not part of the passage.
//! Whitespace-only sections are dropped from the output but keep
//! their position in the raw enumeration, so `chunk_index` values of
//! the surviving passages may have gaps.

use std::fs;
use std::path::Path;

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

use crate::error::ChunkError;
use crate::models::Chunk;

/// Split one Markdown document into passages.
pub fn chunk_markdown(path: &Path) -> Result<Vec<Chunk>, ChunkError> {
    let source_file = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| ChunkError::InvalidPath(path.to_path_buf()))?;

    let content = fs::read_to_string(path).map_err(|source| ChunkError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let chunks = split_sections(&content)
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| Chunk {
            text: text.trim().to_string(),
            source_file: source_file.clone(),
            chunk_index: i,
        })
        .collect();

    Ok(chunks)
}

/// Raw section texts in document order, one per heading boundary.
/// Content before the first heading forms a leading section when
/// present. A heading with no body still produces an (empty) entry.
fn split_sections(markdown: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();
    let mut past_first_heading = false;
    let mut in_heading = false;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { .. } => {
                    if past_first_heading || !current.trim().is_empty() {
                        sections.push(std::mem::take(&mut current));
                    }
                    current.clear();
                    past_first_heading = true;
                    in_heading = true;
                }
                Tag::CodeBlock(_) => {
                    if !current.is_empty() && !current.ends_with('\n') {
                        current.push('\n');
                    }
                    current.push_str("```\n");
                }
                Tag::Paragraph => {
                    if !current.is_empty() && !current.ends_with("\n\n") {
                        current.push('\n');
                    }
                }
                Tag::List(_) => {
                    if !current.is_empty() && !current.ends_with('\n') {
                        current.push('\n');
                    }
                }
                Tag::Item => {
                    current.push_str("- ");
                }
                _ => {}
            },
            Event::End(tag_end) => match tag_end {
                TagEnd::Heading(_) => {
                    in_heading = false;
                }
                TagEnd::CodeBlock => {
                    current.push_str("```\n");
                }
                TagEnd::Paragraph | TagEnd::Item => {
                    current.push('\n');
                }
                _ => {}
            },
            Event::Text(text) => {
                if !in_heading {
                    current.push_str(&text);
                }
            }
            Event::Code(code) => {
                if !in_heading {
                    current.push('`');
                    current.push_str(&code);
                    current.push('`');
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if !in_heading {
                    current.push('\n');
                }
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                if !in_heading {
                    current.push_str(&html);
                }
            }
            _ => {}
        }
    }

    if past_first_heading || !current.trim().is_empty() {
        sections.push(current);
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_doc(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_heading_sections_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(
            &dir,
            "doc.md",
            "# One\nfirst body\n\n# Two\nsecond body\n\n# Three\nthird body\n",
        );

        let chunks = chunk_markdown(&path).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "first body");
        assert_eq!(chunks[1].text, "second body");
        assert_eq!(chunks[2].text, "third body");
        assert_eq!(
            chunks.iter().map(|c| c.chunk_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!(chunks.iter().all(|c| c.source_file == "doc.md"));
    }

    #[test]
    fn test_empty_section_keeps_original_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(
            &dir,
            "doc.md",
            "# One\nfirst\n\n# Two\n   \n\n# Three\nthird\n",
        );

        let chunks = chunk_markdown(&path).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "first");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].text, "third");
        assert_eq!(chunks[1].chunk_index, 2);
    }

    #[test]
    fn test_preamble_before_first_heading() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir, "doc.md", "intro paragraph\n\n# One\nbody\n");

        let chunks = chunk_markdown(&path).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "intro paragraph");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].text, "body");
        assert_eq!(chunks[1].chunk_index, 1);
    }

    #[test]
    fn test_source_file_is_filename_only() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        let path = nested.join("notes.md");
        fs::write(&path, "# H\ntext\n").unwrap();

        let chunks = chunk_markdown(&path).unwrap();
        assert_eq!(chunks[0].source_file, "notes.md");
    }

    #[test]
    fn test_code_blocks_and_lists_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(
            &dir,
            "doc.md",
            "# One\n\n- alpha\n- beta\n\n```\nlet x = 1;\n```\n",
        );

        let chunks = chunk_markdown(&path).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("- alpha"));
        assert!(chunks[0].text.contains("let x = 1;"));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.md");
        let err = chunk_markdown(&path).unwrap_err();
        assert!(matches!(err, ChunkError::Read { .. }));
    }
}
