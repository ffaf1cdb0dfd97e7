//! # font-auto
//!
//! Fetch and cache the font used to draw translated overlay text, so that
//! users never have to hunt down a CJK-capable TrueType file by hand.
//!
//! ## How it works
//!
//! On a call to [`ensure_font`]:
//!
//! 1. If `FONT_AUTO_PATH` points to an existing file, that file is used.
//! 2. Checks `~/.cache/ocr-translate-pdf/fonts/` for `source.filename`.
//! 3. If absent, downloads `source.url` into a temporary file next to the
//!    cache entry, validates the TrueType/OpenType magic, and renames it into
//!    place. A failed or interrupted download never leaves a partial font.
//!
//! Subsequent calls skip the network entirely.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use font_auto::{ensure_font, FontSource};
//!
//! let path = ensure_font(&FontSource::default(), Some(&|downloaded, total| {
//!     if let Some(t) = total {
//!         eprint!("\rDownloading font: {}/{} bytes", downloaded, t);
//!     }
//! })).expect("font unavailable");
//! println!("font at {}", path.display());
//! ```
//!
//! ## Environment variable overrides
//!
//! - `FONT_AUTO_PATH`: path to an existing font file; skips download.
//! - `FONT_AUTO_CACHE_DIR`: override the default cache directory.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Noto Sans CJK JP Regular, able to render Japanese, Chinese, Korean and Latin.
pub const DEFAULT_FONT_URL: &str =
    "https://github.com/minoryorg/Noto-Sans-CJK-JP/blob/master/fonts/NotoSansCJKjp-Regular.ttf?raw=true";

/// File name the default font is cached under.
pub const DEFAULT_FONT_FILENAME: &str = "NotoSansCJKjp-Regular.ttf";

/// Download timeout for a single font fetch.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by font-auto operations.
#[derive(Error, Debug)]
pub enum FontAutoError {
    /// Could not create or navigate the local cache directory.
    #[error("Font cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    /// Network download failed.
    #[error("Font download failed: {0}")]
    Download(String),

    /// The downloaded or configured file is not a TrueType/OpenType font.
    #[error("'{origin}' is not a TrueType/OpenType font (first bytes: {magic:?})")]
    NotAFont { origin: String, magic: Vec<u8> },

    /// Writing the font into the cache failed.
    #[error("Failed to store font at '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── Font source ──────────────────────────────────────────────────────────────

/// Where a font comes from and what it is called in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSource {
    /// HTTP/HTTPS URL the font is downloaded from when not cached.
    pub url: String,
    /// File name inside the cache directory.
    pub filename: String,
}

impl Default for FontSource {
    fn default() -> Self {
        Self {
            url: DEFAULT_FONT_URL.to_string(),
            filename: DEFAULT_FONT_FILENAME.to_string(),
        }
    }
}

impl FontSource {
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
        }
    }
}

// ── Cache directory resolution ───────────────────────────────────────────────

/// Returns the cache directory for downloaded fonts.
///
/// Default locations:
/// - **macOS**: `~/Library/Caches/ocr-translate-pdf/fonts/`
/// - **Linux**: `~/.cache/ocr-translate-pdf/fonts/`
/// - **Windows**: `%LOCALAPPDATA%\ocr-translate-pdf\fonts\`
///
/// Override by setting `FONT_AUTO_CACHE_DIR`.
pub fn font_cache_dir() -> PathBuf {
    if let Ok(override_dir) = std::env::var("FONT_AUTO_CACHE_DIR") {
        return PathBuf::from(override_dir).join("fonts");
    }

    let base = dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir);

    base.join("ocr-translate-pdf").join("fonts")
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Returns the on-disk path to the font, or `None` if it is not cached.
///
/// `FONT_AUTO_PATH` wins when it points to an existing file.
pub fn cached_font_path(source: &FontSource) -> Option<PathBuf> {
    if let Ok(p) = std::env::var("FONT_AUTO_PATH") {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Some(pb);
        }
    }
    let p = font_cache_dir().join(&source.filename);
    p.exists().then_some(p)
}

/// Returns `true` if no network access is needed to obtain the font.
pub fn is_font_cached(source: &FontSource) -> bool {
    cached_font_path(source).is_some()
}

/// Ensures the font is present in the cache and returns its path.
///
/// `on_progress` receives `(bytes_downloaded, total_size_option)` during
/// the download. Pass `None` to suppress progress callbacks.
pub fn ensure_font(
    source: &FontSource,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, FontAutoError> {
    if let Some(path) = cached_font_path(source) {
        return Ok(path);
    }
    ensure_font_in(&font_cache_dir(), source, on_progress)
}

/// Same as [`ensure_font`] but against an explicit cache directory.
///
/// Ignores `FONT_AUTO_PATH`.
pub fn ensure_font_in(
    cache_dir: &Path,
    source: &FontSource,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, FontAutoError> {
    let font_path = cache_dir.join(&source.filename);
    if font_path.exists() {
        return Ok(font_path);
    }

    std::fs::create_dir_all(cache_dir).map_err(FontAutoError::CacheDir)?;

    let bytes = download_bytes(&source.url, on_progress)?;
    if !is_font_data(&bytes) {
        return Err(FontAutoError::NotAFont {
            origin: source.url.clone(),
            magic: bytes.iter().take(4).copied().collect(),
        });
    }

    store_atomically(cache_dir, &font_path, &bytes)?;
    Ok(font_path)
}

/// Returns `true` when `bytes` start with a TrueType, OpenType or
/// TrueType-collection signature.
pub fn is_font_data(bytes: &[u8]) -> bool {
    matches!(
        bytes.get(..4),
        Some([0x00, 0x01, 0x00, 0x00]) | Some(b"OTTO") | Some(b"true") | Some(b"ttcf")
    )
}

// ── Internal helpers ─────────────────────────────────────────────────────────

/// Writes `bytes` to a temp file inside `dir`, then renames it to `dest`.
fn store_atomically(dir: &Path, dest: &Path, bytes: &[u8]) -> Result<(), FontAutoError> {
    let write_err = |source| FontAutoError::Write {
        path: dest.to_path_buf(),
        source,
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.persist(dest).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Streams a URL into a `Vec<u8>`, calling `on_progress` every 64 KiB.
fn download_bytes(
    url: &str,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Vec<u8>, FontAutoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("font-auto/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(|e| FontAutoError::Download(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .map_err(|e| FontAutoError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(FontAutoError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let capacity = total.unwrap_or(16 * 1024 * 1024) as usize;
    let mut buf = Vec::with_capacity(capacity);

    let mut stream = response;
    let mut chunk = vec![0u8; 64 * 1024];
    let mut downloaded: u64 = 0;

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                downloaded += n as u64;
                if let Some(cb) = on_progress {
                    cb(downloaded, total);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(FontAutoError::Download(format!("Read error: {e}")));
            }
        }
    }

    Ok(buf)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_dir_is_deterministic() {
        let d1 = font_cache_dir();
        let d2 = font_cache_dir();
        assert_eq!(d1, d2);
        assert!(d1.ends_with("fonts"));
    }

    #[test]
    fn cache_dir_override_via_env() {
        std::env::set_var("FONT_AUTO_CACHE_DIR", "/tmp/test_font_auto_override");
        let d = font_cache_dir();
        std::env::remove_var("FONT_AUTO_CACHE_DIR");
        assert!(d.starts_with("/tmp/test_font_auto_override"));
    }

    #[test]
    fn font_magic_detection() {
        assert!(is_font_data(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x10]));
        assert!(is_font_data(b"OTTO\x00\x0d"));
        assert!(is_font_data(b"ttcf\x00\x02"));
        assert!(!is_font_data(b"<!DOCTYPE html>"));
        assert!(!is_font_data(b"%PDF-1.7"));
        assert!(!is_font_data(&[0x00, 0x01]));
    }

    #[test]
    fn cached_font_is_returned_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let source = FontSource::new("http://127.0.0.1:9/unreachable.ttf", "Cached.ttf");
        std::fs::write(dir.path().join("Cached.ttf"), [0x00, 0x01, 0x00, 0x00]).unwrap();

        let path = ensure_font_in(dir.path(), &source, None).expect("cached font");
        assert_eq!(path, dir.path().join("Cached.ttf"));
    }

    #[test]
    fn failed_download_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = FontSource::new("http://127.0.0.1:9/unreachable.ttf", "Missing.ttf");

        let err = ensure_font_in(dir.path(), &source, None).unwrap_err();
        assert!(matches!(err, FontAutoError::Download(_)), "got: {err}");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn atomic_store_writes_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("f.ttf");
        store_atomically(dir.path(), &dest, b"OTTOabc").unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"OTTOabc");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn default_source_points_at_noto_cjk() {
        let s = FontSource::default();
        assert_eq!(s.filename, DEFAULT_FONT_FILENAME);
        assert!(s.url.starts_with("https://"));
    }
}
