//! Export of the current buffer as plain markdown or as a rich document.
//!
//! Exports only read the buffer. Producing the bytes and saving them are
//! separate steps so either side can be swapped: a [`DocumentConverter`]
//! turns the HTML document shell into the target format, and a [`SaveSink`]
//! performs the file-save side effect.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MARKDOWN_FILE_NAME: &str = "readme.md";
pub const MARKDOWN_MIME_TYPE: &str = "text/markdown";
pub const DOCUMENT_FILE_STEM: &str = "document";

/// Presentational styling embedded into the rich export.
const DOCUMENT_STYLE: &str = "\
body { font-family: Calibri, Arial, sans-serif; font-size: 11pt; line-height: 1.5; }
h1, h2, h3, h4, h5, h6 { font-family: Calibri Light, Arial, sans-serif; color: #1f3864; }
code { font-family: Consolas, Courier New, monospace; background: #f2f2f2; }
pre { font-family: Consolas, Courier New, monospace; background: #f2f2f2; padding: 8pt; }
blockquote { border-left: 3pt solid #a6a6a6; margin-left: 0; padding-left: 8pt; color: #595959; }
table { border-collapse: collapse; }
th, td { border: 1pt solid #bfbfbf; padding: 4pt 6pt; }
img { max-width: 100%; }
";

const WORD_HTML_OPEN: &str = "<html xmlns:o=\"urn:schemas-microsoft-com:office:office\" \
xmlns:w=\"urn:schemas-microsoft-com:office:word\" \
xmlns=\"http://www.w3.org/TR/REC-html40\">";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document conversion failed: {0}")]
    Conversion(String),
}

/// Bytes ready to be offered to the user as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Converts a complete HTML document into a downloadable document format.
pub trait DocumentConverter {
    fn convert(&self, html_document: &str) -> Result<Vec<u8>, ExportError>;
    fn extension(&self) -> &'static str;
    fn mime_type(&self) -> &'static str;
}

/// Emits HTML flavoured with Word's namespaces, which word processors open
/// as a native document.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordHtmlConverter;

impl DocumentConverter for WordHtmlConverter {
    fn convert(&self, html_document: &str) -> Result<Vec<u8>, ExportError> {
        let Some(body) = html_document.strip_prefix("<!DOCTYPE html>\n<html>") else {
            return Err(ExportError::Conversion(
                "document shell does not start with <html>".to_string(),
            ));
        };

        // The BOM lets word processors detect the encoding
        let mut out = String::with_capacity(html_document.len() + WORD_HTML_OPEN.len() + 3);
        out.push('\u{feff}');
        out.push_str(WORD_HTML_OPEN);
        out.push_str(body);
        Ok(out.into_bytes())
    }

    fn extension(&self) -> &'static str {
        "doc"
    }

    fn mime_type(&self) -> &'static str {
        "application/msword"
    }
}

/// Performs the file-save side effect for an export.
pub trait SaveSink {
    fn save(&mut self, artifact: &ExportArtifact) -> Result<PathBuf, ExportError>;
}

/// Saves exports into a directory, overwriting files of the same name.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SaveSink for DirectorySink {
    fn save(&mut self, artifact: &ExportArtifact) -> Result<PathBuf, ExportError> {
        let path = self.dir.join(&artifact.file_name);
        let io_err = |source: std::io::Error| ExportError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;
        fs::write(&path, &artifact.bytes).map_err(io_err)?;

        log::info!(
            "Exported {} ({} bytes) to {}",
            artifact.mime_type,
            artifact.bytes.len(),
            path.display()
        );
        Ok(path)
    }
}

/// The buffer, byte for byte.
pub fn markdown_artifact(buffer: &str) -> ExportArtifact {
    ExportArtifact {
        file_name: MARKDOWN_FILE_NAME.to_string(),
        mime_type: MARKDOWN_MIME_TYPE,
        bytes: buffer.as_bytes().to_vec(),
    }
}

/// Minimal standalone HTML document around rendered markup.
pub fn document_shell(title: &str, body_markup: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_text(title),
        DOCUMENT_STYLE,
        body_markup
    )
}

pub fn document_artifact(
    title: &str,
    markup: &str,
    converter: &dyn DocumentConverter,
) -> Result<ExportArtifact, ExportError> {
    let bytes = converter.convert(&document_shell(title, markup))?;
    Ok(ExportArtifact {
        file_name: format!("{}.{}", DOCUMENT_FILE_STEM, converter.extension()),
        mime_type: converter.mime_type(),
        bytes,
    })
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
