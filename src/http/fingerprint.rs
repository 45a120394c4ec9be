//! Content fingerprint cache module
//!
//! Process-wide map from absolute file path to a `(mtime, hash)` pair,
//! used to produce stable `ETag` values without rehashing unchanged
//! files. A stored hash is valid only while the stored mtime equals the
//! file's current mtime; entries are replaced wholesale and never
//! evicted.

use dashmap::DashMap;
use sha1::{Digest, Sha1};
use std::fmt::Write as _;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt};

const READ_CHUNK_SIZE: usize = 64 * 1024;

struct CacheEntry {
    mtime_ms: i64,
    hash: String,
}

/// Concurrent fingerprint cache, shared by all request tasks
pub struct FingerprintCache {
    entries: DashMap<PathBuf, CacheEntry>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Return the content hash for `absolute_path` at `mtime_ms`.
    ///
    /// On a hit (stored mtime equals the observed one) the stored hash is
    /// returned without touching `open`. On a miss the stream produced by
    /// `open` is hashed incrementally and the entry is overwritten. A
    /// stream failure propagates and leaves the cache unmodified.
    ///
    /// Two tasks racing on the same path may both recompute; the hash is
    /// a pure function of the content, so the lost update only costs one
    /// extra read.
    pub async fn fingerprint<F, Fut, R>(
        &self,
        open: F,
        absolute_path: &Path,
        mtime_ms: i64,
    ) -> io::Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = io::Result<R>>,
        R: AsyncRead + Unpin,
    {
        if let Some(entry) = self.entries.get(absolute_path) {
            if entry.mtime_ms == mtime_ms {
                return Ok(entry.hash.clone());
            }
        }

        let reader = open().await?;
        let hash = hash_stream(reader, absolute_path).await?;
        self.entries.insert(
            absolute_path.to_path_buf(),
            CacheEntry {
                mtime_ms,
                hash: hash.clone(),
            },
        );
        Ok(hash)
    }
}

impl Default for FingerprintCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash the file extension (with its dot), a separator, then the full
/// byte stream, reading in fixed-size chunks so large files are never
/// buffered whole.
async fn hash_stream<R: AsyncRead + Unpin>(mut reader: R, path: &Path) -> io::Result<String> {
    let mut hasher = Sha1::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hasher.update(format!(".{ext}").as_bytes());
    }
    hasher.update(b"-");

    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    Ok(hex)
}

/// Modification time of a file as milliseconds since the epoch
pub fn mtime_millis(stats: &std::fs::Metadata) -> io::Result<i64> {
    let modified = stats.modified()?;
    let millis = modified
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX));
    Ok(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::other("stream broke")))
        }
    }

    fn counting_open(
        opened: &Arc<AtomicUsize>,
        content: &'static [u8],
    ) -> impl FnOnce() -> std::future::Ready<io::Result<&'static [u8]>> {
        let opened = Arc::clone(opened);
        move || {
            opened.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(content))
        }
    }

    #[tokio::test]
    async fn test_second_call_reads_no_stream() {
        let cache = FingerprintCache::new();
        let opened = Arc::new(AtomicUsize::new(0));
        let path = Path::new("/site/app.js");

        let first = cache
            .fingerprint(counting_open(&opened, b"console.log(1)"), path, 100)
            .await
            .expect("hash");
        let second = cache
            .fingerprint(counting_open(&opened, b"console.log(1)"), path, 100)
            .await
            .expect("hash");

        assert_eq!(first, second);
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mtime_change_forces_recompute() {
        let cache = FingerprintCache::new();
        let opened = Arc::new(AtomicUsize::new(0));
        let path = Path::new("/site/app.js");

        let first = cache
            .fingerprint(counting_open(&opened, b"same bytes"), path, 100)
            .await
            .expect("hash");
        let second = cache
            .fingerprint(counting_open(&opened, b"same bytes"), path, 200)
            .await
            .expect("hash");

        // Recomputation must happen, but the hash is content-addressed
        assert_eq!(opened.load(Ordering::SeqCst), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_extension_seeds_the_hash() {
        let cache = FingerprintCache::new();
        let js = cache
            .fingerprint(
                || std::future::ready(Ok(&b"body"[..])),
                Path::new("/a/file.js"),
                1,
            )
            .await
            .expect("hash");
        let css = cache
            .fingerprint(
                || std::future::ready(Ok(&b"body"[..])),
                Path::new("/a/file.css"),
                1,
            )
            .await
            .expect("hash");
        assert_ne!(js, css);
    }

    #[tokio::test]
    async fn test_stream_error_leaves_cache_unmodified() {
        let cache = FingerprintCache::new();
        let opened = Arc::new(AtomicUsize::new(0));
        let path = Path::new("/site/big.bin");

        let failed = cache
            .fingerprint(|| std::future::ready(Ok(FailingReader)), path, 50)
            .await;
        assert!(failed.is_err());

        // The failed attempt stored nothing, so the same mtime still
        // triggers a fresh computation.
        cache
            .fingerprint(counting_open(&opened, b"payload"), path, 50)
            .await
            .expect("hash");
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }
}
