//! # Quote Ledger
//!
//! The list of generated quotes, kept as a JSON file. Safety features:
//! - **Atomic saves**: write to .tmp, fsync, rename over the ledger
//! - **File locking**: keep two sales desks from appending at the same time
//! - **Version validation**: refuse ledgers written by a newer schema
//!
//! Lock files sit next to the ledger with a `.lock` suffix and record who
//! holds them.
//!
//! ## Example
//!
//! ```rust,no_run
//! use devis_core::ledger::{load_ledger_or_default, save_ledger, FileLock};
//! use std::path::Path;
//!
//! let path = Path::new("devis_ledger.json");
//! let lock = FileLock::acquire(path, "desk-2")?;
//! let mut ledger = load_ledger_or_default(path)?;
//! let next = ledger.next_reference();
//! // ... generate the quote, then ledger.upsert(record) ...
//! save_ledger(&ledger, path)?;
//! drop(lock);
//! # let _ = next;
//! # Ok::<(), devis_core::errors::DevisError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{DevisError, DevisResult};
use crate::record::{QuoteRecord, QuoteReference, SCHEMA_VERSION};

/// How many records the history view shows by default
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Every quote generated so far, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteLedger {
    pub version: String,
    pub records: Vec<QuoteRecord>,
}

impl Default for QuoteLedger {
    fn default() -> Self {
        QuoteLedger {
            version: SCHEMA_VERSION.to_string(),
            records: Vec::new(),
        }
    }
}

impl QuoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any record with the same reference.
    ///
    /// A replaced record moves to the end, as a fresh insertion.
    /// Returns the record it replaced.
    pub fn upsert(&mut self, record: QuoteRecord) -> Option<QuoteRecord> {
        let replaced = self
            .records
            .iter()
            .position(|r| r.reference == record.reference)
            .map(|idx| self.records.remove(idx));
        self.records.push(record);
        replaced
    }

    pub fn get(&self, reference: &QuoteReference) -> Option<&QuoteRecord> {
        self.records.iter().find(|r| &r.reference == reference)
    }

    /// Reference of the most recently inserted record
    pub fn last_reference(&self) -> Option<&QuoteReference> {
        self.records.last().map(|r| &r.reference)
    }

    /// The reference a new quote gets when the operator supplies none.
    pub fn next_reference(&self) -> QuoteReference {
        QuoteReference::next_after(self.last_reference())
    }

    /// Up to `limit` records, newest quote date first.
    ///
    /// Records sharing a date are listed latest insertion first.
    pub fn recent(&self, limit: usize) -> Vec<&QuoteRecord> {
        let mut indexed: Vec<(usize, &QuoteRecord)> = self.records.iter().enumerate().collect();
        indexed.sort_by(|(ia, a), (ib, b)| b.date.cmp(&a.date).then(ib.cmp(ia)));
        indexed.into_iter().take(limit).map(|(_, r)| r).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Lock file metadata stored in .lock files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Who took the lock (desk, user name)
    pub holder: String,
    pub machine: String,
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    pub fn new(holder: impl Into<String>) -> Self {
        LockInfo {
            holder: holder.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
    }
}

/// Exclusive lock on a ledger file, released on drop.
///
/// Holds an OS-level lock (fs2) and writes a .lock file naming the holder.
pub struct FileLock {
    ledger_path: PathBuf,
    lock_path: PathBuf,
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire the lock for the ledger at `path`.
    ///
    /// Fails with [`DevisError::FileLocked`] while another live process holds it.
    /// Locks left behind by dead processes, or older than 24 hours, are taken over.
    pub fn acquire(path: &Path, holder: impl Into<String>) -> DevisResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(holder);

        if let Some(existing) = Self::check(path) {
            return Err(DevisError::file_locked(
                path.display().to_string(),
                format!("{} ({})", existing.holder, existing.machine),
                existing.locked_at.to_rfc3339(),
            ));
        }

        // Not truncated on open: the holder's metadata stays intact until the OS lock is ours.
        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| DevisError::file_error("create lock", lock_path.display().to_string(), e.to_string()))?;

        lock_file.try_lock_exclusive().map_err(|_| {
            DevisError::file_locked(path.display().to_string(), "another process", "unknown")
        })?;

        write_lock_info(&mut lock_file, &info, &lock_path)?;

        Ok(FileLock {
            ledger_path: path.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Current live lock on the ledger, if any.
    pub fn check(path: &Path) -> Option<LockInfo> {
        let info = read_lock_info(&lock_path_for(path)).ok()?;
        if is_lock_stale(&info) {
            warn!(holder = %info.holder, machine = %info.machine, "ignoring stale ledger lock");
            None
        } else {
            Some(info)
        }
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn lock_path_for(ledger_path: &Path) -> PathBuf {
    suffixed(ledger_path, "lock")
}

fn tmp_path_for(ledger_path: &Path) -> PathBuf {
    suffixed(ledger_path, "tmp")
}

/// `ledger.json` → `ledger.json.<suffix>`
fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut out = path.to_path_buf();
    let extension = out
        .extension()
        .map(|e| format!("{}.{}", e.to_string_lossy(), suffix))
        .unwrap_or_else(|| suffix.to_string());
    out.set_extension(extension);
    out
}

fn write_lock_info(file: &mut File, info: &LockInfo, lock_path: &Path) -> DevisResult<()> {
    let io_error = |op: &str, e: std::io::Error| DevisError::file_error(op, lock_path.display().to_string(), e.to_string());

    let json = serde_json::to_string_pretty(info)?;
    file.set_len(0).map_err(|e| io_error("truncate lock", e))?;
    file.write_all(json.as_bytes()).map_err(|e| io_error("write lock", e))?;
    file.sync_all().map_err(|e| io_error("sync lock", e))
}

fn read_lock_info(lock_path: &Path) -> DevisResult<LockInfo> {
    let mut file = File::open(lock_path)
        .map_err(|e| DevisError::file_error("read lock", lock_path.display().to_string(), e.to_string()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| DevisError::file_error("read lock", lock_path.display().to_string(), e.to_string()))?;
    Ok(serde_json::from_str(&contents)?)
}

/// A lock is stale when its process is gone (same machine) or it is over a day old.
fn is_lock_stale(info: &LockInfo) -> bool {
    if hostname().as_deref() == Some(info.machine.as_str()) {
        #[cfg(unix)]
        {
            if fs::metadata(format!("/proc/{}", info.pid)).is_err() {
                return true;
            }
        }
        #[cfg(windows)]
        {
            use std::process::Command;
            let output = Command::new("tasklist")
                .args(["/FI", &format!("PID eq {}", info.pid), "/NH"])
                .output();
            if let Ok(output) = output {
                let stdout = String::from_utf8_lossy(&output.stdout);
                if !stdout.contains(&info.pid.to_string()) {
                    return true;
                }
            }
        }
    }

    (Utc::now() - info.locked_at).num_hours() > 24
}

/// Save the ledger with atomic write semantics.
///
/// JSON goes to `<path>.tmp`, is synced to disk, then renamed over `path`.
pub fn save_ledger(ledger: &QuoteLedger, path: &Path) -> DevisResult<()> {
    let json = serde_json::to_string_pretty(ledger)?;
    let tmp_path = tmp_path_for(path);

    let mut tmp_file = File::create(&tmp_path)
        .map_err(|e| DevisError::file_error("create temp file", tmp_path.display().to_string(), e.to_string()))?;
    tmp_file
        .write_all(json.as_bytes())
        .map_err(|e| DevisError::file_error("write temp file", tmp_path.display().to_string(), e.to_string()))?;
    tmp_file
        .sync_all()
        .map_err(|e| DevisError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string()))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DevisError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    info!(path = %path.display(), records = ledger.len(), "ledger saved");
    Ok(())
}

/// Load a ledger file.
///
/// # Returns
///
/// * `Err(DevisError::VersionMismatch)` - written by an incompatible schema
/// * `Err(DevisError::SerializationError)` - not a ledger
/// * `Err(DevisError::FileError)` - I/O error
pub fn load_ledger(path: &Path) -> DevisResult<QuoteLedger> {
    let contents = fs::read_to_string(path)
        .map_err(|e| DevisError::file_error("read", path.display().to_string(), e.to_string()))?;

    let ledger: QuoteLedger = serde_json::from_str(&contents).map_err(|e| DevisError::SerializationError {
        reason: format!("Invalid ledger in {}: {}", path.display(), e),
    })?;

    validate_version(&ledger.version)?;
    Ok(ledger)
}

/// Load a ledger, or start an empty one when the file does not exist yet.
pub fn load_ledger_or_default(path: &Path) -> DevisResult<QuoteLedger> {
    match fs::metadata(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(QuoteLedger::new()),
        _ => load_ledger(path),
    }
}

/// Major versions must match; within 0.x a newer minor is refused.
fn validate_version(file_version: &str) -> DevisResult<()> {
    let mismatch = || DevisError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let file_parts: Vec<u32> = file_version.split('.').filter_map(|p| p.parse().ok()).collect();
    let current_parts: Vec<u32> = SCHEMA_VERSION.split('.').filter_map(|p| p.parse().ok()).collect();

    let (Some(file_major), Some(current_major)) = (file_parts.first(), current_parts.first()) else {
        return Err(mismatch());
    };
    if file_major != current_major {
        return Err(mismatch());
    }
    if *current_major == 0 {
        if let (Some(file_minor), Some(current_minor)) = (file_parts.get(1), current_parts.get(1)) {
            if file_minor > current_minor {
                return Err(mismatch());
            }
        }
    }
    Ok(())
}
