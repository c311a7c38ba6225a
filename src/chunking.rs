use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Heading convention used to split document bodies
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Sub-string that starts a new chunk (a level-2 markdown heading by default)
    pub heading_marker: String,
    /// Sections whose heading starts with one of these names are dropped
    pub excluded_headings: Vec<String>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        ChunkerConfig {
            heading_marker: "## ".to_string(),
            excluded_headings: vec!["Contents".to_string()],
        }
    }
}

impl ChunkerConfig {
    fn is_excluded(&self, heading: &str) -> bool {
        self.excluded_headings
            .iter()
            .any(|name| heading.starts_with(name.as_str()))
    }
}

/// Represents a text chunk with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Page the chunk was cut from
    pub page_id: Option<String>,
    /// Unique identifier, also used as the vector index point id
    pub chunk_id: String,
    /// The actual text content of this chunk
    pub text: String,
}

impl Chunk {
    /// Create a chunk with a freshly generated identifier
    pub fn new(page_id: Option<String>, text: impl Into<String>) -> Self {
        Chunk {
            page_id,
            chunk_id: Uuid::new_v4().to_string(),
            text: text.into(),
        }
    }
}

/// Result of splitting a raw document
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub title: String,
    pub page_id: Option<String>,
    /// Chunk texts in document order
    pub chunks: Vec<String>,
}

impl ParsedDocument {
    /// Turn the chunk texts into identified chunks
    pub fn to_chunks(&self) -> Vec<Chunk> {
        self.chunks
            .iter()
            .map(|text| Chunk::new(self.page_id.clone(), text.as_str()))
            .collect()
    }
}

/// Parse the metadata header and split the body of a raw document into chunks
pub fn parse_document(raw: &str, config: &ChunkerConfig) -> Result<ParsedDocument> {
    let (_, header_start) = find_separator(raw, 0)
        .ok_or_else(|| RagError::Parse("missing metadata header".to_string()))?;
    let (header_end, body_start) = find_separator(raw, header_start)
        .ok_or_else(|| RagError::Parse("unterminated metadata header".to_string()))?;

    let mut title = None;
    let mut page_id = None;
    for (key, value) in parse_metadata(&raw[header_start..header_end]) {
        match key {
            "title" => title = Some(value.to_string()),
            "page_id" => page_id = Some(value.to_string()),
            _ => {}
        }
    }

    let title = title.ok_or_else(|| RagError::Parse("metadata has no title".to_string()))?;
    let chunks = split_into_chunks(&raw[body_start..], config);

    Ok(ParsedDocument {
        title,
        page_id,
        chunks,
    })
}

/// Split a document body on the heading marker
///
/// Every section after the first keeps its marker, so concatenating the
/// output restores the body minus excluded sections. Text preceding the
/// first heading is kept verbatim unless it is empty or itself excluded.
pub fn split_into_chunks(body: &str, config: &ChunkerConfig) -> Vec<String> {
    let marker = config.heading_marker.as_str();
    if marker.is_empty() || !body.contains(marker) {
        return vec![body.to_string()];
    }

    let mut sections = body.split(marker);
    let mut chunks = Vec::new();

    if let Some(leading) = sections.next() {
        if !leading.is_empty() && !config.is_excluded(leading) {
            chunks.push(leading.to_string());
        }
    }

    for section in sections {
        if config.is_excluded(section) {
            continue;
        }
        chunks.push(format!("{}{}", marker, section));
    }

    chunks
}

/// `key: "value"` pairs of a metadata header, quotes stripped
fn parse_metadata(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.lines().filter_map(|line| {
        let (key, value) = line.split_once(':')?;
        Some((key.trim(), value.trim().trim_matches('"')))
    })
}

/// Locate the next `---` separator line at or after `from`
///
/// The separator is `---` followed by whitespace that contains at least one
/// newline; the returned range ends after the last newline of that run.
fn find_separator(text: &str, from: usize) -> Option<(usize, usize)> {
    let mut search_from = from;

    while let Some(offset) = text[search_from..].find("---") {
        let start = search_from + offset;
        let rest = &text[start + 3..];
        let whitespace = &rest[..rest.len() - rest.trim_start().len()];

        if let Some(newline) = whitespace.rfind('\n') {
            return Some((start, start + 3 + newline + 1));
        }
        search_from = start + 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "---\ntitle: \"Managing your account\"\nupdated: 2022-01-10\npage_id: \"account\"\n---\nIntro text.\n\n## Contents\n\n* Reset\n* Passwords\n\n## Reset\n\nReset your password via Settings > Security.\n\n## Passwords\n\nPasswords must be 8+ characters.\n";

    #[test]
    fn test_parse_metadata_and_chunks() {
        let doc = parse_document(DOC, &ChunkerConfig::default()).unwrap();

        assert_eq!(doc.title, "Managing your account");
        assert_eq!(doc.page_id.as_deref(), Some("account"));
        assert_eq!(
            doc.chunks,
            vec![
                "Intro text.\n\n".to_string(),
                "## Reset\n\nReset your password via Settings > Security.\n\n".to_string(),
                "## Passwords\n\nPasswords must be 8+ characters.\n".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_title_is_parse_error() {
        let raw = "---\npage_id: \"abc\"\n---\nBody\n";
        let err = parse_document(raw, &ChunkerConfig::default()).unwrap_err();
        assert!(matches!(err, RagError::Parse(_)));
    }

    #[test]
    fn test_missing_page_id_is_allowed() {
        let raw = "---\ntitle: \"Only a title\"\n---\nBody\n";
        let doc = parse_document(raw, &ChunkerConfig::default()).unwrap();
        assert_eq!(doc.title, "Only a title");
        assert_eq!(doc.page_id, None);
        assert_eq!(doc.chunks, vec!["Body\n".to_string()]);
    }

    #[test]
    fn test_missing_header_is_parse_error() {
        let err = parse_document("# Just markdown\n", &ChunkerConfig::default()).unwrap_err();
        assert!(matches!(err, RagError::Parse(_)));
    }

    #[test]
    fn test_separator_allows_trailing_whitespace() {
        let raw = "---  \r\ntitle: \"Spaced\"\r\n---\t\r\n\r\nBody";
        let doc = parse_document(raw, &ChunkerConfig::default()).unwrap();
        assert_eq!(doc.title, "Spaced");
        assert_eq!(doc.chunks, vec!["Body".to_string()]);
    }

    #[test]
    fn test_no_headings_yields_whole_body() {
        let body = "Plain text without any headings.\nSecond line.";
        assert_eq!(
            split_into_chunks(body, &ChunkerConfig::default()),
            vec![body.to_string()]
        );
    }

    #[test]
    fn test_empty_leading_text_is_not_a_chunk() {
        let body = "## One\nfirst\n## Two\nsecond\n";
        let chunks = split_into_chunks(body, &ChunkerConfig::default());
        assert_eq!(chunks, vec!["## One\nfirst\n", "## Two\nsecond\n"]);
    }

    #[test]
    fn test_chunk_count_and_reconstruction() {
        let config = ChunkerConfig::default();
        let bodies = [
            "Lead\n## A\na\n## B\nb",
            "## A\na\n## B\nb\n## C\nc",
            "Lead only",
            "Lead\n## A\n## B\n",
            "  ## A\na\n",
            "\n\n## A\na",
        ];

        for body in bodies {
            let markers = body.matches("## ").count();
            let leading = body.split("## ").next().unwrap();
            let expected = if markers == 0 || !leading.is_empty() {
                markers + 1
            } else {
                markers
            };

            let chunks = split_into_chunks(body, &config);
            assert_eq!(chunks.len(), expected, "body {:?}", body);
            assert_eq!(chunks.concat(), body);
        }
    }

    #[test]
    fn test_excluded_section_is_dropped_from_reconstruction() {
        let body = "Lead\n## Contents\n- a\n## A\na\n";
        let chunks = split_into_chunks(body, &ChunkerConfig::default());
        assert_eq!(chunks.concat(), "Lead\n## A\na\n");
    }

    #[test]
    fn test_whitespace_lead_is_preserved() {
        let doc = parse_document("---\ntitle: \"T\"\n---\n  ## A\na\n", &ChunkerConfig::default())
            .unwrap();
        assert_eq!(doc.chunks, vec!["  ", "## A\na\n"]);
        assert_eq!(doc.chunks.concat(), "  ## A\na\n");
    }

    #[test]
    fn test_excluded_leading_text_is_dropped() {
        let chunks = split_into_chunks("Contents\n- a\n## A\na\n", &ChunkerConfig::default());
        assert_eq!(chunks, vec!["## A\na\n"]);
    }

    #[test]
    fn test_excluded_text_without_headings_is_one_chunk() {
        let body = "Contents\n- a\n";
        assert_eq!(
            split_into_chunks(body, &ChunkerConfig::default()),
            vec![body.to_string()]
        );
    }

    #[test]
    fn test_custom_marker_and_exclusions() {
        let config = ChunkerConfig {
            heading_marker: "### ".to_string(),
            excluded_headings: vec!["Index".to_string(), "See also".to_string()],
        };
        let body = "### Index\nx\n### Usage\ny\n### See also\nz\n";
        assert_eq!(split_into_chunks(body, &config), vec!["### Usage\ny\n"]);
    }

    #[test]
    fn test_chunks_get_unique_ids() {
        let doc = parse_document(DOC, &ChunkerConfig::default()).unwrap();
        let chunks = doc.to_chunks();

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.page_id.as_deref() == Some("account")));
        assert_ne!(chunks[0].chunk_id, chunks[1].chunk_id);
        assert_ne!(chunks[1].chunk_id, chunks[2].chunk_id);
    }
}
