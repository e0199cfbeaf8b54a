//! Page sources: where [`RawPage`]s come from.
//!
//! The layout engine that turns a report into table grids and page text runs
//! outside this crate. Its output reaches the pipeline through a
//! [`PageSource`], either already in memory or as a JSON page document on
//! disk:
//!
//! ```json
//! { "pages": [ { "raw_tables": [[["890326878", null, "..."]]], "raw_text": "..." } ] }
//! ```
//!
//! A bare top-level array of pages is accepted as well.

use crate::error::ExtractError;
use crate::model::RawPage;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Anything that can produce the pages of one report.
///
/// A failure here is fatal for the whole run: no partial results are
/// produced when the pages themselves cannot be read.
pub trait PageSource {
    /// Human-readable origin for logs and error messages.
    fn origin(&self) -> String {
        "<memory>".to_string()
    }

    fn load(&self) -> Result<Vec<RawPage>, ExtractError>;
}

impl PageSource for [RawPage] {
    fn load(&self) -> Result<Vec<RawPage>, ExtractError> {
        Ok(self.to_vec())
    }
}

impl PageSource for Vec<RawPage> {
    fn load(&self) -> Result<Vec<RawPage>, ExtractError> {
        Ok(self.clone())
    }
}

/// A JSON page document on disk.
#[derive(Debug, Clone)]
pub struct JsonPageSource {
    path: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageDocument {
    Wrapped { pages: Vec<RawPage> },
    Bare(Vec<RawPage>),
}

impl JsonPageSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file, mapping I/O failures onto the fatal error variants.
    fn read(&self) -> Result<String, ExtractError> {
        let path = &self.path;
        if !path.exists() {
            return Err(ExtractError::FileNotFound { path: path.clone() });
        }
        match std::fs::read_to_string(path) {
            Ok(s) => Ok(s),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(ExtractError::PermissionDenied { path: path.clone() })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ExtractError::FileNotFound { path: path.clone() })
            }
            Err(e) => Err(ExtractError::SourceRead {
                origin: self.origin(),
                detail: e.to_string(),
            }),
        }
    }
}

impl PageSource for JsonPageSource {
    fn origin(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Vec<RawPage>, ExtractError> {
        let text = self.read()?;
        debug!("Read {} bytes from {}", text.len(), self.path.display());
        let pages = parse_pages(&text).map_err(|e| ExtractError::SourceRead {
            origin: self.origin(),
            detail: e.to_string(),
        })?;
        info!("Loaded {} pages from {}", pages.len(), self.path.display());
        Ok(pages)
    }
}

/// Parse a JSON page document (wrapped or bare array).
pub fn parse_pages(json: &str) -> Result<Vec<RawPage>, serde_json::Error> {
    let doc: PageDocument = serde_json::from_str(json)?;
    Ok(match doc {
        PageDocument::Wrapped { pages } => pages,
        PageDocument::Bare(pages) => pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_wrapped_and_bare_documents() {
        let wrapped = r#"{"pages": [{"raw_tables": [], "raw_text": "a"}, {"raw_text": "b"}]}"#;
        let pages = parse_pages(wrapped).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].raw_text, "b");

        let bare = r#"[{"raw_tables": [[["x", null], ["y", "z"]]]}]"#;
        let pages = parse_pages(bare).unwrap();
        assert_eq!(pages[0].raw_tables[0].len(), 2);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_pages("{\"pages\": 3}").is_err());
        assert!(parse_pages("not json").is_err());
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let src = JsonPageSource::new("/definitely/not/here.json");
        assert!(matches!(src.load(), Err(ExtractError::FileNotFound { .. })));
    }

    #[test]
    fn malformed_file_is_source_read() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"[{\"raw_tables\": 5}]").unwrap();
        let err = JsonPageSource::new(f.path()).load().unwrap_err();
        match err {
            ExtractError::SourceRead { origin, .. } => {
                assert_eq!(origin, f.path().display().to_string())
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn in_memory_sources() {
        let pages = vec![RawPage::text_only("uno"), RawPage::text_only("dos")];
        assert_eq!(pages.load().unwrap().len(), 2);
        assert_eq!(pages[..1].load().unwrap().len(), 1);
        assert_eq!(pages.origin(), "<memory>");
    }
}
