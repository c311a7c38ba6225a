use crate::chunking::{parse_document, Chunk, ChunkerConfig};
use crate::error::{RagError, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Represents a document with its content and metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub page_id: Option<String>,
    pub title: String,
    pub source_path: PathBuf,
    /// Full file text, metadata header included
    pub raw_content: String,
}

impl Document {
    /// Build a document and its chunks from raw markdown text
    pub fn parse(
        source_path: impl Into<PathBuf>,
        raw_content: String,
        config: &ChunkerConfig,
    ) -> Result<(Self, Vec<Chunk>)> {
        let source_path = source_path.into();
        let parsed = parse_document(&raw_content, config).map_err(|e| match e {
            RagError::Parse(reason) => {
                RagError::Parse(format!("{}: {}", source_path.display(), reason))
            }
            other => other,
        })?;
        let chunks = parsed.to_chunks();

        debug!(
            "{} ({:?}) split into {} chunks",
            source_path.display(),
            parsed.title,
            chunks.len()
        );

        let document = Document {
            page_id: parsed.page_id,
            title: parsed.title,
            source_path,
            raw_content,
        };
        Ok((document, chunks))
    }

    /// Read and chunk a markdown file
    pub fn from_file<P: AsRef<Path>>(file_path: P, config: &ChunkerConfig) -> Result<(Self, Vec<Chunk>)> {
        let path = file_path.as_ref();
        let raw_content = fs::read_to_string(path)?;
        Self::parse(path, raw_content, config)
    }
}

/// All markdown files below `root`, in path order
pub fn discover_markdown(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(RagError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", root.display()),
        )));
    }

    let pattern = format!(
        "{}/**/*.md",
        glob::Pattern::escape(&root.display().to_string())
    );
    let entries = glob::glob(&pattern)
        .map_err(|e| RagError::Config(format!("invalid corpus pattern {}: {}", pattern, e)))?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable path: {}", e),
        }
    }
    files.sort();

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_raw_content() {
        let raw = "---\ntitle: \"Intro\"\npage_id: \"intro\"\n---\nHello\n## Next\nMore\n".to_string();
        let (document, chunks) =
            Document::parse("docs/intro.md", raw.clone(), &ChunkerConfig::default()).unwrap();

        assert_eq!(document.title, "Intro");
        assert_eq!(document.page_id.as_deref(), Some("intro"));
        assert_eq!(document.source_path, PathBuf::from("docs/intro.md"));
        assert_eq!(document.raw_content, raw);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let err = Document::parse(
            "docs/broken.md",
            "---\npage_id: \"x\"\n---\nBody".to_string(),
            &ChunkerConfig::default(),
        )
        .unwrap_err();

        match err {
            RagError::Parse(message) => assert!(message.contains("docs/broken.md")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_discover_markdown_recurses() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("guide/nested")).unwrap();
        fs::write(dir.path().join("b.md"), "x").unwrap();
        fs::write(dir.path().join("guide/a.md"), "x").unwrap();
        fs::write(dir.path().join("guide/nested/c.md"), "x").unwrap();
        fs::write(dir.path().join("guide/notes.txt"), "x").unwrap();

        let files = discover_markdown(dir.path()).unwrap();
        let relative: Vec<PathBuf> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            relative,
            vec![
                PathBuf::from("b.md"),
                PathBuf::from("guide/a.md"),
                PathBuf::from("guide/nested/c.md"),
            ]
        );
    }

    #[test]
    fn test_discover_missing_root_fails() {
        assert!(discover_markdown(Path::new("/definitely/not/here")).is_err());
    }
}
