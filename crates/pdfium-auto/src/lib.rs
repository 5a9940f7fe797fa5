//! Runtime PDFium provisioning for pixelsift.
//!
//! `pdfium-render` binds to a prebuilt libpdfium at runtime but leaves
//! obtaining that library to the application. This crate closes the gap:
//! the first PDF operation downloads the matching platform build from the
//! [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries)
//! releases, unpacks the shared library into a per-version cache
//! directory, and every later run binds straight from disk.
//!
//! Three entry points cover what an application needs:
//!
//! * [`is_pdfium_cached`] — cheap disk check, no network;
//! * [`ensure_pdfium_library`] — download-if-missing, with an optional
//!   progress callback for the one run that actually hits the network;
//! * [`bind_pdfium_silent`] — ensure + bind in one call.
//!
//! ```rust,no_run
//! let pdfium = pdfium_auto::bind_pdfium_silent().expect("PDFium unavailable");
//! ```
//!
//! Two environment variables override the defaults: `PDFIUM_LIB_PATH`
//! points at an existing library and skips the cache entirely, and
//! `PDFIUM_AUTO_CACHE_DIR` relocates the cache root.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;

/// Release tag in bblanchon/pdfium-binaries the downloads are pinned to.
pub const PDFIUM_VERSION: &str = "7690";

const RELEASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Progress observer for the one-time download: `(bytes_so_far, total)`.
/// The total is `None` until the server reports a content length.
pub type DownloadProgress<'a> = &'a dyn Fn(u64, Option<u64>);

/// Failures while provisioning or binding the PDFium library.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No prebuilt PDFium exists for this OS/architecture pair.
    #[error("no PDFium build is published for {os}/{arch}")]
    UnsupportedPlatform {
        os: &'static str,
        arch: &'static str,
    },

    /// The cache directory could not be created.
    #[error("cache directory: {0}")]
    Cache(#[source] std::io::Error),

    /// The release asset could not be fetched.
    #[error("download failed: {0}")]
    Download(String),

    /// The `.tgz` asset did not yield the shared library.
    #[error("archive extraction failed: {0}")]
    Extract(String),

    /// The library exists on disk but could not be loaded.
    #[error("could not load PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

/// Release asset and library naming for one OS/arch pair.
struct Platform {
    /// `.tgz` asset name in the GitHub release.
    asset: &'static str,
    /// Path of the shared library inside the archive.
    member: &'static str,
    /// Filename the library is cached under.
    lib_name: &'static str,
}

fn platform() -> Result<Platform, EngineError> {
    let (asset, member, lib_name) = match (std::env::consts::OS, std::env::consts::ARCH) {
        ("linux", "x86_64") => ("pdfium-linux-x64.tgz", "lib/libpdfium.so", "libpdfium.so"),
        ("linux", "aarch64") => ("pdfium-linux-arm64.tgz", "lib/libpdfium.so", "libpdfium.so"),
        ("macos", "aarch64") => (
            "pdfium-mac-arm64.tgz",
            "lib/libpdfium.dylib",
            "libpdfium.dylib",
        ),
        ("macos", "x86_64") => (
            "pdfium-mac-x64.tgz",
            "lib/libpdfium.dylib",
            "libpdfium.dylib",
        ),
        ("windows", "x86_64") => ("pdfium-win-x64.tgz", "bin/pdfium.dll", "pdfium.dll"),
        ("windows", "aarch64") => ("pdfium-win-arm64.tgz", "bin/pdfium.dll", "pdfium.dll"),
        ("windows", "x86") => ("pdfium-win-x86.tgz", "bin/pdfium.dll", "pdfium.dll"),
        (os, arch) => return Err(EngineError::UnsupportedPlatform { os, arch }),
    };
    Ok(Platform {
        asset,
        member,
        lib_name,
    })
}

/// Per-version cache directory, e.g. `~/.cache/pixelsift/pdfium-7690/`.
fn cache_dir() -> PathBuf {
    let root = match std::env::var_os("PDFIUM_AUTO_CACHE_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
            .unwrap_or_else(std::env::temp_dir)
            .join("pixelsift"),
    };
    root.join(format!("pdfium-{PDFIUM_VERSION}"))
}

/// `PDFIUM_LIB_PATH` override, when set and pointing at an existing file.
fn env_override() -> Option<PathBuf> {
    let p = PathBuf::from(std::env::var_os("PDFIUM_LIB_PATH")?);
    p.exists().then_some(p)
}

/// Find an on-disk library without touching the network.
fn locate() -> Option<PathBuf> {
    if let Some(p) = env_override() {
        return Some(p);
    }
    let platform = platform().ok()?;
    let p = cache_dir().join(platform.lib_name);
    p.exists().then_some(p)
}

/// Whether the next [`ensure_pdfium_library`] call can succeed without
/// touching the network.
pub fn is_pdfium_cached() -> bool {
    locate().is_some()
}

static LIBRARY: OnceLock<PathBuf> = OnceLock::new();

/// Make sure the PDFium shared library exists on disk and return its path.
///
/// Resolution order: the `PDFIUM_LIB_PATH` override, then the cache, then
/// a download from the pinned release. The resolved path is memoised per
/// process, so only the very first call can block on I/O.
pub fn ensure_pdfium_library(
    on_progress: Option<DownloadProgress<'_>>,
) -> Result<PathBuf, EngineError> {
    if let Some(path) = LIBRARY.get() {
        return Ok(path.clone());
    }
    let path = match locate() {
        Some(p) => p,
        None => fetch(on_progress)?,
    };
    // Concurrent first calls race benignly; every contender resolved a
    // valid path and the loser's clone is simply dropped.
    let _ = LIBRARY.set(path.clone());
    Ok(path)
}

/// Bind to PDFium, provisioning the library first when needed.
///
/// "Silent" refers to the download: no progress is reported. To observe
/// the download, call [`ensure_pdfium_library`] with a callback first —
/// the memoised path makes the resolution inside this function free.
pub fn bind_pdfium_silent() -> Result<Pdfium, EngineError> {
    let path = ensure_pdfium_library(None)?;
    Pdfium::bind_to_library(&path)
        .map(Pdfium::new)
        .map_err(|e| EngineError::Bind {
            path,
            reason: e.to_string(),
        })
}

/// Download the release asset and unpack the library into the cache.
fn fetch(on_progress: Option<DownloadProgress<'_>>) -> Result<PathBuf, EngineError> {
    let platform = platform()?;
    let dir = cache_dir();
    std::fs::create_dir_all(&dir).map_err(EngineError::Cache)?;

    let url = format!(
        "{RELEASE_URL}/chromium%2F{PDFIUM_VERSION}/{}",
        platform.asset
    );
    let archive = download(&url, on_progress)?;

    let dest = dir.join(platform.lib_name);
    unpack_member(&archive, platform.member, &dest)?;
    Ok(dest)
}

/// Stream a URL into memory, reporting progress after every chunk.
fn download(
    url: &str,
    on_progress: Option<DownloadProgress<'_>>,
) -> Result<Vec<u8>, EngineError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pixelsift-pdfium-auto/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| EngineError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| EngineError::Download(format!("GET {url}: {e}")))?
        .error_for_status()
        .map_err(|e| EngineError::Download(e.to_string()))?;

    let total = response.content_length();
    let mut body = Vec::with_capacity(total.unwrap_or(32 * 1024 * 1024) as usize);
    let mut chunk = vec![0u8; 64 * 1024];
    let mut received = 0u64;

    loop {
        let n = match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(EngineError::Download(format!("read: {e}"))),
        };
        body.extend_from_slice(&chunk[..n]);
        received += n as u64;
        if let Some(report) = on_progress {
            report(received, total);
        }
    }

    Ok(body)
}

/// Extract one archive member to `dest`, ignoring everything else.
fn unpack_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), EngineError> {
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(archive));
    for entry in tar
        .entries()
        .map_err(|e| EngineError::Extract(e.to_string()))?
    {
        let mut entry = entry.map_err(|e| EngineError::Extract(e.to_string()))?;
        let wanted = entry
            .path()
            .map(|p| p.as_ref() == Path::new(member))
            .unwrap_or(false);
        if wanted {
            entry
                .unpack(dest)
                .map_err(|e| EngineError::Extract(format!("unpack {member}: {e}")))?;
            return Ok(());
        }
    }
    Err(EngineError::Extract(format!(
        "'{member}' missing from archive"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn current_platform_has_a_release_asset() {
        let p = platform().expect("supported platform");
        assert!(p.asset.ends_with(".tgz"));
        assert!(p.member.ends_with(p.lib_name));
    }

    #[test]
    fn cache_dir_is_versioned() {
        let d = cache_dir();
        let s = d.to_string_lossy().into_owned();
        assert!(s.contains(PDFIUM_VERSION), "got: {s}");
    }

    #[test]
    fn cache_dir_honours_the_env_override() {
        std::env::set_var("PDFIUM_AUTO_CACHE_DIR", "/tmp/pixelsift-engine-cache");
        let d = cache_dir();
        std::env::remove_var("PDFIUM_AUTO_CACHE_DIR");
        assert!(d.starts_with("/tmp/pixelsift-engine-cache"));
        assert!(d.ends_with(format!("pdfium-{PDFIUM_VERSION}")));
    }

    #[test]
    fn unpack_rejects_an_archive_without_the_member() {
        // A valid gzipped tar that simply lacks the library.
        let empty_tar = tar::Builder::new(Vec::new()).into_inner().unwrap();
        let mut gz =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        gz.write_all(&empty_tar).unwrap();
        let bytes = gz.finish().unwrap();

        let err = unpack_member(
            &bytes,
            "lib/libpdfium.so",
            Path::new("/tmp/pixelsift-never-written"),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Extract(_)));
    }
}
