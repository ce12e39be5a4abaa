//! Content-addressed storage for uploaded document binaries.
//!
//! Files are stored under a two-level directory structure keyed by the
//! content fingerprint: `{documents_dir}/{fingerprint[0..2]}/{fingerprint}.{ext}`.
//! Because the fingerprint is derived from the bytes, writing the same
//! content twice lands on the same path.

use std::io;
use std::path::{Path, PathBuf};

/// Store for uploaded binaries, addressed by content fingerprint.
#[derive(Debug, Clone)]
pub struct ContentStore {
    documents_dir: PathBuf,
}

impl ContentStore {
    /// Create a store rooted at `documents_dir`.
    pub fn new(documents_dir: &Path) -> Self {
        Self {
            documents_dir: documents_dir.to_path_buf(),
        }
    }

    /// Path where content with this fingerprint and media type is stored.
    pub fn path_for(&self, fingerprint: &str, media_type: &str) -> PathBuf {
        let prefix = &fingerprint[..fingerprint.len().min(2)];
        self.documents_dir
            .join(prefix)
            .join(format!("{}.{}", fingerprint, mime_to_extension(media_type)))
    }

    /// Write content to its fingerprint-derived path, creating parent
    /// directories as needed. Returns the path written.
    pub fn save(
        &self,
        fingerprint: &str,
        media_type: &str,
        content: &[u8],
    ) -> io::Result<PathBuf> {
        let path = self.path_for(fingerprint, media_type);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Read stored content back.
    pub fn read(&self, fingerprint: &str, media_type: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.path_for(fingerprint, media_type))
    }

    /// Check whether content with this fingerprint is stored.
    pub fn exists(&self, fingerprint: &str, media_type: &str) -> bool {
        self.path_for(fingerprint, media_type).exists()
    }

    /// Remove stored content. Returns false when no file was present.
    pub fn remove(&self, fingerprint: &str, media_type: &str) -> io::Result<bool> {
        let path = self.path_for(fingerprint, media_type);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Map MIME type to file extension.
pub fn mime_to_extension(mime: &str) -> &'static str {
    match mime {
        "application/pdf" => "pdf",
        "text/html" => "html",
        "text/plain" => "txt",
        "application/json" => "json",
        "application/xml" | "text/xml" => "xml",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "application/vnd.ms-excel" => "xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const FINGERPRINT: &str = "abcdef1234567890abcdef1234567890abcdef1234567890abcdef1234567890";

    #[test]
    fn test_path_layout_uses_fingerprint_prefix() {
        let store = ContentStore::new(Path::new("/docs"));
        let path = store.path_for(FINGERPRINT, "application/pdf");
        assert_eq!(
            path,
            PathBuf::from(format!("/docs/ab/{}.pdf", FINGERPRINT))
        );
    }

    #[test]
    fn test_save_read_remove_roundtrip() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        let content = b"contract body";

        let path = store.save(FINGERPRINT, "application/pdf", content).unwrap();
        assert!(path.exists());
        assert!(store.exists(FINGERPRINT, "application/pdf"));
        assert_eq!(store.read(FINGERPRINT, "application/pdf").unwrap(), content);

        assert!(store.remove(FINGERPRINT, "application/pdf").unwrap());
        assert!(!store.exists(FINGERPRINT, "application/pdf"));
        assert!(!store.remove(FINGERPRINT, "application/pdf").unwrap());
    }

    #[test]
    fn test_same_content_lands_on_same_path() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path());

        let first = store.save(FINGERPRINT, "application/pdf", b"same").unwrap();
        let second = store.save(FINGERPRINT, "application/pdf", b"same").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_mime_to_extension() {
        assert_eq!(mime_to_extension("application/pdf"), "pdf");
        assert_eq!(mime_to_extension("text/plain"), "txt");
        assert_eq!(
            mime_to_extension(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            ),
            "docx"
        );
        assert_eq!(mime_to_extension("application/unknown"), "bin");
    }
}
