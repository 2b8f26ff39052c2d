use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

/// Build the global rayon pool once; later calls are ignored by rayon.
pub fn init_thread_pool(threads: Option<usize>) {
    if let Some(n) = threads {
        if n > 0 {
            rayon::ThreadPoolBuilder::new().num_threads(n).build_global().ok();
        }
    }
}

/// Transient errors from sharing violations, AV scanners and network volumes
/// (raw Windows codes; never produced on unix).
fn is_retriable_io_error(e: &io::Error) -> bool {
    matches!(e.raw_os_error(), Some(5) | Some(21) | Some(32) | Some(33) | Some(1006) | Some(1224))
}

/// Open a file, retrying transient errors with linear backoff.
pub fn open_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    let mut attempt = 0usize;
    loop {
        match File::open(path) {
            Ok(f) => return Ok(f),
            Err(e) if is_retriable_io_error(&e) && attempt + 1 < tries.max(1) => {
                attempt += 1;
                sleep(Duration::from_millis(delay_ms.saturating_mul(attempt as u64)));
            }
            Err(e) => return Err(e),
        }
    }
}

/// Move `tmp` over `dest`. Falls back to copy+remove when rename keeps failing
/// (e.g. `dest` is held open by a spreadsheet).
pub fn replace_file_with_backoff(tmp: &Path, dest: &Path) -> Result<()> {
    let tries = 20u64;
    for i in 0..tries {
        match fs::rename(tmp, dest) {
            Ok(()) => return Ok(()),
            Err(e) if is_retriable_io_error(&e) && i + 1 < tries => {
                sleep(Duration::from_millis(50 * (i + 1)));
            }
            Err(_) => break,
        }
    }
    fs::copy(tmp, dest).with_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
    fs::remove_file(tmp).with_context(|| format!("remove {}", tmp.display()))?;
    Ok(())
}
