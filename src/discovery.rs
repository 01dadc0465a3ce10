use anyhow::{Context, Result};
use ignore::{WalkBuilder, WalkState};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

/// Configuration for file discovery behavior
#[derive(Debug, Clone, Default)]
pub struct DiscoveryConfig {
    /// Whether to fail fast on first error or continue processing
    pub fail_fast: bool,
}

/// A discovered source file with its validation outcome.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// UTF-8 sniff of the file head; full decoding happens in the pipeline.
    pub utf8_ok: bool,
    pub error: Option<String>,
}

/// Walk `root` in parallel and return every `*-0.txt` file, sorted.
///
/// Blocking; call from `spawn_blocking` in async contexts.
pub fn find_book_files(root: &Path) -> Result<Vec<PathBuf>> {
    let started = std::time::Instant::now();
    let (tx, rx) = std::sync::mpsc::channel::<PathBuf>();

    let walker = WalkBuilder::new(root)
        .threads((num_cpus::get() / 2).max(1))
        .follow_links(false)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            if let Ok(entry) = entry {
                if entry.file_type().is_some_and(|ft| ft.is_file()) {
                    if let Some(name) = entry.file_name().to_str() {
                        if name.ends_with("-0.txt") {
                            debug!("found matching file: {}", entry.path().display());
                            let _ = tx.send(entry.into_path());
                        }
                    }
                }
            }
            WalkState::Continue
        })
    });
    drop(tx);

    let mut paths: Vec<PathBuf> = rx.into_iter().collect();
    paths.sort();
    info!(
        "discovered {} files in {:.2}ms",
        paths.len(),
        started.elapsed().as_millis()
    );
    Ok(paths)
}

/// Validate one discovered file: size via metadata plus a UTF-8 sniff of the
/// first 4 KiB. A multi-byte character truncated by the sniff window does not
/// count as invalid.
pub async fn validate_book_file(path: &Path) -> DiscoveredFile {
    let size_bytes = match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(e) => {
            return DiscoveredFile {
                path: path.to_path_buf(),
                size_bytes: 0,
                utf8_ok: false,
                error: Some(format!("failed to stat {}: {}", path.display(), e)),
            }
        }
    };

    let mut head = vec![0u8; 4096];
    let utf8_ok = match tokio::fs::File::open(path).await {
        Ok(mut file) => match file.read(&mut head).await {
            Ok(n) => {
                head.truncate(n);
                match std::str::from_utf8(&head) {
                    Ok(_) => true,
                    // error_len() of None means the tail is an incomplete
                    // character cut off by the window, not bad data.
                    Err(e) => e.error_len().is_none(),
                }
            }
            Err(_) => false,
        },
        Err(_) => false,
    };

    DiscoveredFile {
        path: path.to_path_buf(),
        size_bytes,
        utf8_ok,
        error: None,
    }
}

/// Discover and validate all book files under `root`.
pub async fn collect_book_files(
    root: &Path,
    config: DiscoveryConfig,
) -> Result<Vec<DiscoveredFile>> {
    let root = root.to_path_buf();
    let paths = tokio::task::spawn_blocking(move || find_book_files(&root))
        .await
        .context("discovery task failed")??;

    let mut results = Vec::with_capacity(paths.len());
    for path in paths {
        let validated = validate_book_file(&path).await;
        if let Some(ref error) = validated.error {
            if config.fail_fast {
                anyhow::bail!("{error}");
            }
            warn!("file validation error (continuing): {error}");
        }
        results.push(validated);
    }
    Ok(results)
}
