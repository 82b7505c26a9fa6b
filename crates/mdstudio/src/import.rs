use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Extensions accepted by the import gate (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: &[&str] = &["md", "txt"];
pub const PLAIN_TEXT_TYPE: &str = "text/plain";

const LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Only .md and .txt files can be opened: {name}")]
    Rejected { name: String },

    #[error("File does not contain UTF-8 text: {name}")]
    NotText { name: String },

    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Raw bytes of a file picked or dropped by the user.
#[derive(Debug, Clone)]
pub struct ImportedFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Whether a file may be loaded into the buffer.
pub fn is_allowed(name: &str, content_type: Option<&str>) -> bool {
    let extension_ok = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false);

    // Parameters such as "; charset=utf-8" are ignored
    let type_ok = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(PLAIN_TEXT_TYPE))
        .unwrap_or(false);

    extension_ok || type_ok
}

/// Gate and decode an imported file into buffer text.
pub fn decode(name: &str, content_type: Option<&str>, bytes: &[u8]) -> Result<String, ImportError> {
    if !is_allowed(name, content_type) {
        return Err(ImportError::Rejected {
            name: name.to_string(),
        });
    }

    let text = std::str::from_utf8(bytes).map_err(|_| ImportError::NotText {
        name: name.to_string(),
    })?;

    // NUL bytes mean a binary file that happens to be valid UTF-8
    if text.contains('\0') {
        return Err(ImportError::NotText {
            name: name.to_string(),
        });
    }

    Ok(text.to_string())
}

/// Read a file from disk for import. The allow-list is checked by `decode`,
/// not here, so the caller can report the rejection.
pub async fn read_file(path: &Path) -> Result<ImportedFile, ImportError> {
    let io_err = |source: std::io::Error| match source.kind() {
        std::io::ErrorKind::NotFound => ImportError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ImportError::Io {
            path: path.to_path_buf(),
            source,
        },
    };

    match fs::metadata(path).await {
        Ok(metadata) if metadata.len() > LARGE_FILE_THRESHOLD => {
            log::warn!(
                "Large file detected ({} bytes): {}",
                metadata.len(),
                path.display()
            );
        }
        Ok(_) => {}
        Err(e) => return Err(io_err(e)),
    }

    let bytes = fs::read(path).await.map_err(io_err)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    log::info!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(ImportedFile {
        name,
        content_type: None,
        bytes,
    })
}
