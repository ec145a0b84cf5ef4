//! The remote file-service collaborator (§6). Out of scope per §1 as a concrete client; this
//! module defines the trait boundary plus a local-filesystem implementation used both for
//! shares that are in fact local mounts of the NAS and for tests.

use crate::types::{FileMeta, FileSource};
use chrono::{DateTime, Utc};
use std::io::Read as _;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

/// One entry yielded while walking a share: either a file (with metadata) or a directory about
/// to be entered (so the walker can apply blacklist-skip before descending).
#[derive(Clone, Debug)]
pub enum WalkEntry {
    Dir(String),
    File(FileMeta),
}

/// UNC-style normalisation: leading `\\`, `\` as separator (§6 "Remote file service").
pub fn normalize_unc(path: &str) -> String {
    let replaced = path.replace('/', "\\");
    if replaced.starts_with("\\\\") {
        replaced
    } else if let Some(stripped) = replaced.strip_prefix('\\') {
        format!("\\\\{stripped}")
    } else {
        format!("\\\\{replaced}")
    }
}

/// The remote file-service interface named in §6. A concrete networked implementation is
/// supplied by the surrounding system; this crate only depends on the trait.
pub trait FileService: Send + Sync {
    /// Depth-first walk of `share_root`, yielding directories (pre-order, before descending,
    /// so the caller can choose to skip) and files as they are discovered.
    fn walk(&self, share_root: &str) -> std::io::Result<Vec<WalkEntry>>;

    /// Open `path` for reading or writing into `local_staging`, i.e. the download/upload sides
    /// of a migration (§4.6 "stream source -> local staging -> destination").
    fn download(&self, path: &str, local_staging: &Path) -> std::io::Result<()>;
    fn upload(&self, local_staging: &Path, path: &str) -> std::io::Result<()>;

    fn remove(&self, path: &str) -> std::io::Result<()>;
    fn stat(&self, path: &str) -> std::io::Result<FileMeta>;

    /// Verify readability per §4.6: open the file and read at least one byte, returning its
    /// size. Used to distinguish zero-size sources and permission failures before migrating.
    fn probe_readable(&self, path: &str) -> std::io::Result<u64>;

    fn exists(&self, path: &str) -> bool;

    /// Set access/modification times on `path` (§4.6 "stamp destination's access/modification
    /// times to preserve recency").
    fn set_times(&self, path: &str, accessed: DateTime<Utc>, modified: DateTime<Utc>) -> std::io::Result<()>;

    /// Write the stub launcher at `path` that opens `target` when invoked (§6, §9).
    fn write_stub(&self, path: &str, target: &str) -> std::io::Result<()>;
}

/// UNC path `\\host\share\...` mapped onto a local mount root, e.g. `/mnt/host/share/...`.
/// This is the common real deployment shape: the NAS share is locally mounted and the file
/// service is a thin path-translating wrapper over `std::fs`.
pub struct LocalFileService {
    /// Maps a share's UNC prefix (e.g. `\\host\share`) to a local filesystem root.
    mount_root: PathBuf,
}

impl LocalFileService {
    pub fn new(mount_root: impl Into<PathBuf>) -> Self {
        LocalFileService {
            mount_root: mount_root.into(),
        }
    }

    fn local_path(&self, unc_path: &str) -> PathBuf {
        let normalized = normalize_unc(unc_path);
        let trimmed = normalized.trim_start_matches('\\').replace('\\', "/");
        self.mount_root.join(trimmed)
    }

    fn stat_local(&self, unc_path: &str, local: &Path) -> std::io::Result<FileMeta> {
        let meta = std::fs::metadata(local)?;
        let created = meta.created().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now());
        let accessed = meta.accessed().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now());
        let modified = meta.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now());
        Ok(FileMeta {
            path: normalize_unc(unc_path),
            size: meta.len(),
            created,
            accessed,
            modified,
            source: None,
            original_path: None,
        })
    }
}

impl FileService for LocalFileService {
    fn walk(&self, share_root: &str) -> std::io::Result<Vec<WalkEntry>> {
        let root_local = self.local_path(share_root);
        let mut out = Vec::new();
        let mut stack = vec![root_local.clone()];
        while let Some(dir) = stack.pop() {
            let read_dir = match std::fs::read_dir(&dir) {
                Ok(rd) => rd,
                Err(e) => {
                    log::warn!("skipping unreadable directory {}: {e}", dir.display());
                    continue;
                }
            };
            for entry in read_dir {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        log::warn!("skipping unreadable entry in {}: {e}", dir.display());
                        continue;
                    }
                };
                let path = entry.path();
                let unc = self.to_unc(&path);
                if path.is_dir() {
                    out.push(WalkEntry::Dir(unc.clone()));
                    stack.push(path);
                } else {
                    match self.stat_local(&unc, &path) {
                        Ok(meta) => out.push(WalkEntry::File(meta)),
                        Err(e) => log::warn!("skipping unreadable file {}: {e}", path.display()),
                    }
                }
            }
        }
        Ok(out)
    }

    fn download(&self, path: &str, local_staging: &Path) -> std::io::Result<()> {
        std::fs::copy(self.local_path(path), local_staging)?;
        Ok(())
    }

    fn upload(&self, local_staging: &Path, path: &str) -> std::io::Result<()> {
        let dest = self.local_path(path);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(local_staging, &dest)?;
        Ok(())
    }

    fn remove(&self, path: &str) -> std::io::Result<()> {
        std::fs::remove_file(self.local_path(path))
    }

    fn stat(&self, path: &str) -> std::io::Result<FileMeta> {
        let local = self.local_path(path);
        self.stat_local(path, &local)
    }

    fn probe_readable(&self, path: &str) -> std::io::Result<u64> {
        let local = self.local_path(path);
        let mut f = std::fs::File::open(&local)?;
        let mut buf = [0u8; 1];
        let _ = f.read(&mut buf)?;
        Ok(std::fs::metadata(&local)?.len())
    }

    fn exists(&self, path: &str) -> bool {
        self.local_path(path).exists()
    }

    fn set_times(&self, path: &str, accessed: DateTime<Utc>, modified: DateTime<Utc>) -> std::io::Result<()> {
        let local = self.local_path(path);
        let atime = filetime::FileTime::from_unix_time(accessed.timestamp(), 0);
        let mtime = filetime::FileTime::from_unix_time(modified.timestamp(), 0);
        filetime::set_file_times(local, atime, mtime)
    }

    fn write_stub(&self, path: &str, target: &str) -> std::io::Result<()> {
        let local = self.local_path(path);
        if let Some(parent) = local.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(local, stub_contents(target))
    }
}

impl LocalFileService {
    fn to_unc(&self, local: &Path) -> String {
        let rel = local.strip_prefix(&self.mount_root).unwrap_or(local);
        normalize_unc(&rel.to_string_lossy())
    }
}

/// Stub launcher content: a `.bat` script that opens `target` via the OS default handler (§9).
pub fn stub_contents(target: &str) -> String {
    format!("@echo off\r\nstart \"\" \"{target}\"\r\n")
}

/// Path of the stub launcher left at `original_path` after archival (§4.1, §6).
pub fn stub_path_for(original_path: &str) -> String {
    format!("{original_path}_shortcut.bat")
}

/// True if `path` names a launcher stub, excluded from all walk counts (§4.1).
pub fn is_stub_path(path: &str) -> bool {
    path.ends_with(".bat") || path.ends_with("_shortcut.bat")
}

impl FileSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileSource::Data => "data",
            FileSource::Archive => "archive",
        }
    }
}
