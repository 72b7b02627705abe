//! Latest-modification scanning of the watched root.

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Reports the most recent modification time found anywhere under a root.
///
/// Called from a blocking thread on every poll cycle; implementations may do
/// synchronous filesystem I/O.
pub trait ChangeDetector: Send + Sync {
	fn latest(&self, root: &Path) -> io::Result<SystemTime>;
}

/// Recursive mtime walk.
///
/// Directory mtimes are included so that deletions and renames register.
/// Directory symlinks are not followed. Entries named in `ignore` are skipped.
#[derive(Debug, Clone, Default)]
pub struct MtimeScanner {
	ignore: Vec<String>,
}

impl MtimeScanner {
	pub fn new(ignore: Vec<String>) -> Self {
		Self { ignore }
	}

	fn is_ignored(&self, path: &Path) -> bool {
		path.file_name()
			.map(|name| self.ignore.iter().any(|i| name == i.as_str()))
			.unwrap_or(false)
	}

	fn scan(&self, path: &Path) -> io::Result<SystemTime> {
		let meta = fs::symlink_metadata(path)?;

		if meta.file_type().is_symlink() {
			// Dangling links have no target mtime; fall back to the link itself.
			return match fs::metadata(path) {
				Ok(target) if !target.is_dir() => target.modified(),
				_ => meta.modified(),
			};
		}

		if !meta.is_dir() {
			return meta.modified();
		}

		let mut newest = meta.modified()?;
		for entry in fs::read_dir(path)? {
			let entry_path = entry?.path();
			if self.is_ignored(&entry_path) {
				continue;
			}
			let time = match self.scan(&entry_path) {
				Ok(t) => t,
				// Removed between read_dir and stat; the parent's mtime covers it.
				Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
				Err(e) => return Err(e),
			};
			if time > newest {
				newest = time;
			}
		}
		Ok(newest)
	}
}

impl ChangeDetector for MtimeScanner {
	fn latest(&self, root: &Path) -> io::Result<SystemTime> {
		self.scan(root)
	}
}
