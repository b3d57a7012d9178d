//! Per-company exclusive lock.
//!
//! The lock is an OS advisory lock (`flock` on Unix, `LockFileEx` on Windows)
//! on a `.lock` file inside the company directory. It excludes other tasks and
//! other processes alike. The file itself is never removed; only the lock on
//! it matters, and the kernel drops that lock when the holder's handle closes,
//! including when the holder process dies.
//!
//! The lock is not re-entrant: a holder that asks again waits for itself and
//! times out.

use fs4::fs_std::FileExt;
use fundamentals_core::{FundamentalsError, Result, Symbol};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, trace};

/// Held lock. Dropping it releases the lock and leaves the file in place.
#[derive(Debug)]
pub struct CompanyLock {
    // Closing this handle releases the advisory lock.
    _file: File,
    path: PathBuf,
    company: Symbol,
}

impl CompanyLock {
    /// Waits up to `timeout` for the lock at `path`, polling every `retry`.
    ///
    /// # Errors
    /// [`FundamentalsError::LockTimeout`] if the lock is still held when the
    /// timeout elapses, or an I/O error if the lock file cannot be opened.
    #[instrument(skip(path), fields(company = %company, path = %path.display()))]
    pub async fn acquire(
        path: &Path,
        company: &Symbol,
        timeout: Duration,
        retry: Duration,
    ) -> Result<Self> {
        let started = Instant::now();

        loop {
            let attempt_path = path.to_path_buf();
            let attempt = tokio::task::spawn_blocking(move || try_lock(&attempt_path))
                .await
                .map_err(|e| FundamentalsError::Other(format!("Lock task failed: {e}")))?;

            match attempt {
                Ok(Some(file)) => {
                    debug!(waited = ?started.elapsed(), "Acquired company lock");
                    return Ok(Self {
                        _file: file,
                        path: path.to_path_buf(),
                        company: company.clone(),
                    });
                }
                Ok(None) => trace!("Company lock is held, retrying"),
                Err(err) => return Err(FundamentalsError::io(path, err)),
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(FundamentalsError::LockTimeout {
                    company: company.to_string(),
                    waited,
                });
            }
            tokio::time::sleep(retry.min(timeout - waited)).await;
        }
    }

    /// Company this lock belongs to.
    #[must_use]
    pub const fn company(&self) -> &Symbol {
        &self.company
    }

    /// Lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CompanyLock {
    fn drop(&mut self) {
        debug!(company = %self.company, "Released company lock");
    }
}

/// One non-blocking attempt. `Ok(None)` means another handle holds the lock.
fn try_lock(path: &Path) -> io::Result<Option<File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Whatever a previous holder left in the file is irrelevant.
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)?;

    if file.try_lock_exclusive()? {
        Ok(Some(file))
    } else {
        Ok(None)
    }
}
