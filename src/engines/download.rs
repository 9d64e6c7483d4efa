//! Model file cache shared by the engines

use crate::error::ScanError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Return `dir/filename`, downloading it from `url` first if it is missing
pub fn ensure_downloaded(url: &str, dir: &Path, filename: &str) -> Result<PathBuf, ScanError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        ScanError::InitializationError(format!("Failed to create cache directory: {}", e))
    })?;

    let path = dir.join(filename);

    if !path.exists() {
        tracing::info!("Downloading {} (this may take a moment)...", filename);
        download_file(url, &path)?;
        tracing::info!("Downloaded {} to {:?}", filename, path);
    } else {
        tracing::info!("Using cached {} from {:?}", filename, dir);
    }

    Ok(path)
}

/// Download a file from URL to path using ureq
fn download_file(url: &str, path: &Path) -> Result<(), ScanError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| ScanError::InitializationError(format!("Failed to download {}: {}", url, e)))?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        ScanError::InitializationError(format!("Failed to read response body: {}", e))
    })?;

    // Written under a temporary name so an interrupted download is not cached
    let partial = path.with_extension("part");
    let mut file = File::create(&partial).map_err(|e| {
        ScanError::InitializationError(format!("Failed to create {}: {}", partial.display(), e))
    })?;
    file.write_all(&buffer)
        .map_err(|e| ScanError::InitializationError(format!("Failed to write model file: {}", e)))?;
    std::fs::rename(&partial, path)
        .map_err(|e| ScanError::InitializationError(format!("Failed to store model file: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_file_is_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.rten"), b"cached").unwrap();

        // The URL is never contacted when the file exists
        let path = ensure_downloaded("http://invalid.invalid/model.rten", dir.path(), "model.rten").unwrap();

        assert_eq!(std::fs::read(path).unwrap(), b"cached");
    }
}
