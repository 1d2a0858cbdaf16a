// src/input/mod.rs
use crate::document::MwTabFile;
use crate::utils::error::InputError;
use std::path::{Path, PathBuf};

// File extensions picked up when walking a directory
const MWTAB_EXTENSIONS: [&str; 2] = ["txt", "mwtab"];

/// Collects the mwTab files below `from`. A plain file is returned as is,
/// directories are walked recursively in sorted order.
pub async fn find_mwtab_files(from: &Path) -> Result<Vec<PathBuf>, InputError> {
    let metadata = tokio::fs::metadata(from).await.map_err(|e| read_err(from, e))?;
    if metadata.is_file() {
        return Ok(vec![from.to_path_buf()]);
    }

    let mut found = Vec::new();
    let mut pending = vec![from.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| read_err(&dir, e))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| read_err(&dir, e))? {
            let path = entry.path();
            let file_type = entry.file_type().await.map_err(|e| read_err(&path, e))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if has_mwtab_extension(&path) {
                found.push(path);
            } else {
                tracing::trace!("Skipping non-mwTab file: {}", path.display());
            }
        }
    }

    found.sort();
    tracing::debug!("Found {} mwTab files under {}", found.len(), from.display());
    Ok(found)
}

fn read_err(path: &Path, source: std::io::Error) -> InputError {
    InputError::Read {
        path: path.to_path_buf(),
        source,
    }
}

fn has_mwtab_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MWTAB_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Reads one file and parses it into a document.
pub async fn load_document(path: &Path) -> Result<MwTabFile, InputError> {
    tracing::debug!("Reading mwTab file: {}", path.display());
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| read_err(path, e))?;
    tracing::debug!("Read {} bytes from {}", text.len(), path.display());

    MwTabFile::parse(&text).map_err(|source| InputError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
