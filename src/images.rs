// 🖼️ Image Resolution - Optional side effect of merchandise import
//
// A product row may point at an image two ways: a filename inside the
// uploaded ZIP bundle, or a URL to download. Resolution failure never fails
// the product - the caller records a warning and the product stays
// imageless. Resolved bytes are stored content-addressed under the media
// dir so re-imports of the same image do not pile up copies.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on a downloaded image
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024; // 10 MB

// ============================================================================
// IMAGE REFERENCE
// ============================================================================

/// Where a product row says its image lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageRef {
    /// Filename inside the accompanying ZIP bundle
    Archive(String),

    /// Download URL
    Url(String),
}

impl ImageRef {
    pub fn describe(&self) -> String {
        match self {
            ImageRef::Archive(name) => format!("archive file \"{}\"", name),
            ImageRef::Url(url) => format!("URL {}", url),
        }
    }
}

// ============================================================================
// FETCHER (URL → bytes)
// ============================================================================

/// Black-box image download service
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP fetcher with a short per-request timeout. A slow remote
/// host degrades import latency but can never hang it open-ended.
pub struct HttpImageFetcher {
    client: reqwest::blocking::Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpImageFetcher { client })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to download {}", url))?
            .error_for_status()
            .with_context(|| format!("Bad response from {}", url))?;

        let bytes = response
            .bytes()
            .with_context(|| format!("Failed to read body from {}", url))?;

        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(anyhow!(
                "Image at {} is {} bytes (limit {})",
                url,
                bytes.len(),
                MAX_IMAGE_BYTES
            ));
        }

        Ok(bytes.to_vec())
    }
}

// ============================================================================
// ARCHIVE (filename → bytes)
// ============================================================================

/// Reader over the uploaded ZIP image bundle
pub struct ImageArchive {
    archive: zip::ZipArchive<Cursor<Vec<u8>>>,
}

impl ImageArchive {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let archive =
            zip::ZipArchive::new(Cursor::new(bytes)).context("Failed to open images ZIP")?;
        Ok(ImageArchive { archive })
    }

    /// Look a file up by name. Exact entry name first, then a
    /// case-insensitive basename match (exports often nest files in a
    /// folder the CSV does not mention).
    pub fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let entry_name = if self.archive.by_name(name).is_ok() {
            Some(name.to_string())
        } else {
            let wanted = basename(name).to_lowercase();
            self.archive
                .file_names()
                .find(|candidate| basename(candidate).to_lowercase() == wanted)
                .map(str::to_string)
        };

        let Some(entry_name) = entry_name else {
            return Ok(None);
        };

        let mut file = self
            .archive
            .by_name(&entry_name)
            .with_context(|| format!("Failed to open \"{}\" in images ZIP", entry_name))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read \"{}\" from images ZIP", entry_name))?;
        Ok(Some(bytes))
    }
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

// ============================================================================
// STORAGE
// ============================================================================

/// Write image bytes under the media dir, named by content hash so the same
/// bytes always land in the same file. Returns the stored filename.
pub fn store_image(media_dir: &Path, source_name: &str, bytes: &[u8]) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = format!("{:x}", hasher.finalize());

    let extension = basename(source_name)
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5)
        .unwrap_or_else(|| "img".to_string());

    let filename = format!("{}.{}", &digest[..16], extension);

    std::fs::create_dir_all(media_dir)
        .with_context(|| format!("Failed to create media dir {}", media_dir.display()))?;
    let target = media_dir.join(&filename);
    std::fs::write(&target, bytes)
        .with_context(|| format!("Failed to write image {}", target.display()))?;

    Ok(filename)
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Resolves an ImageRef to a stored filename using whatever sources the
/// import was given. Missing sources and failed lookups are plain errors
/// for the caller to downgrade to warnings.
pub struct ImageResolver {
    media_dir: PathBuf,
    archive: Option<ImageArchive>,
    fetcher: Option<Box<dyn ImageFetcher>>,
}

impl ImageResolver {
    pub fn new(media_dir: impl Into<PathBuf>) -> Self {
        ImageResolver {
            media_dir: media_dir.into(),
            archive: None,
            fetcher: None,
        }
    }

    pub fn with_archive(mut self, archive: ImageArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Box<dyn ImageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn resolve(&mut self, image: &ImageRef) -> Result<String> {
        match image {
            ImageRef::Archive(name) => {
                let archive = self
                    .archive
                    .as_mut()
                    .ok_or_else(|| anyhow!("No images ZIP was uploaded"))?;
                let bytes = archive
                    .read(name)?
                    .ok_or_else(|| anyhow!("\"{}\" not found in images ZIP", name))?;
                store_image(&self.media_dir, name, &bytes)
            }
            ImageRef::Url(url) => {
                let fetcher = self
                    .fetcher
                    .as_ref()
                    .ok_or_else(|| anyhow!("Image download is not enabled"))?;
                let bytes = fetcher.fetch(url)?;
                let source_name = basename(url.split('?').next().unwrap_or(url));
                store_image(&self.media_dir, source_name, &bytes)
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes) in entries {
            writer
                .start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    struct StubFetcher {
        bytes: Option<Vec<u8>>,
    }

    impl ImageFetcher for StubFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.bytes
                .clone()
                .ok_or_else(|| anyhow!("connection refused: {}", url))
        }
    }

    #[test]
    fn test_archive_exact_and_basename_lookup() {
        let bytes = zip_with(&[("images/mug.png", b"png-bytes")]);
        let mut archive = ImageArchive::from_bytes(bytes).unwrap();

        // Exact entry name
        assert_eq!(
            archive.read("images/mug.png").unwrap(),
            Some(b"png-bytes".to_vec())
        );

        // Basename, case-insensitive
        assert_eq!(archive.read("MUG.PNG").unwrap(), Some(b"png-bytes".to_vec()));

        // Missing file
        assert_eq!(archive.read("cap.png").unwrap(), None);
    }

    #[test]
    fn test_store_image_is_content_addressed() {
        let dir = tempfile::tempdir().unwrap();

        let first = store_image(dir.path(), "mug.png", b"png-bytes").unwrap();
        let second = store_image(dir.path(), "copy_of_mug.png", b"png-bytes").unwrap();

        assert_eq!(first, second, "same bytes should store under one name");
        assert!(first.ends_with(".png"));
        assert!(dir.path().join(&first).exists());
    }

    #[test]
    fn test_store_image_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let name = store_image(dir.path(), "mug", b"bytes").unwrap();
        assert!(name.ends_with(".img"));
    }

    #[test]
    fn test_resolver_prefers_given_source() {
        let dir = tempfile::tempdir().unwrap();
        let zip_bytes = zip_with(&[("mug.png", b"zip-bytes")]);
        let mut resolver = ImageResolver::new(dir.path())
            .with_archive(ImageArchive::from_bytes(zip_bytes).unwrap())
            .with_fetcher(Box::new(StubFetcher {
                bytes: Some(b"url-bytes".to_vec()),
            }));

        let from_archive = resolver
            .resolve(&ImageRef::Archive("mug.png".to_string()))
            .unwrap();
        assert!(dir.path().join(&from_archive).exists());

        let from_url = resolver
            .resolve(&ImageRef::Url(
                "https://example.com/cap.png?size=large".to_string(),
            ))
            .unwrap();
        assert!(from_url.ends_with(".png"));
    }

    #[test]
    fn test_resolver_errors_without_sources() {
        let dir = tempfile::tempdir().unwrap();
        let mut resolver = ImageResolver::new(dir.path());

        assert!(resolver
            .resolve(&ImageRef::Archive("mug.png".to_string()))
            .is_err());
        assert!(resolver
            .resolve(&ImageRef::Url("https://example.com/a.png".to_string()))
            .is_err());
    }

    #[test]
    fn test_resolver_fetch_failure_is_error_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let mut resolver =
            ImageResolver::new(dir.path()).with_fetcher(Box::new(StubFetcher { bytes: None }));

        let err = resolver
            .resolve(&ImageRef::Url("https://example.com/a.png".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
