use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::sink::LogSink;
use crate::types::Category;

const LOG_PREFIX: &str = "rerun";

/// Appends lines to `<dir>/rerun YY-MMDD.log`, rotating at `max_size` bytes.
pub struct FileSink {
	writer: Mutex<LogWriter>,
}

struct LogWriter {
	file: Option<File>,
	path: PathBuf,
	bytes_written: u64,
	max_size: u64,
	log_dir: PathBuf,
}

impl FileSink {
	pub fn new(log_dir: &Path, max_size: u64) -> Self {
		let _ = fs::create_dir_all(log_dir);
		let path = log_dir.join(current_log_name(LOG_PREFIX));
		let file = open_append(&path);

		let bytes_written = file
			.as_ref()
			.and_then(|f| f.metadata().ok())
			.map(|m| m.len())
			.unwrap_or(0);

		Self {
			writer: Mutex::new(LogWriter {
				file,
				path,
				bytes_written,
				max_size,
				log_dir: log_dir.to_path_buf(),
			}),
		}
	}

	pub fn path(&self) -> PathBuf {
		self.writer.lock().unwrap_or_else(|e| e.into_inner()).path.clone()
	}
}

impl LogSink for FileSink {
	fn write(&self, category: Category, line: &str) {
		let data = format!("[{}] {}\n", category, line);
		let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
		writer.write(data.as_bytes());
	}
}

impl LogWriter {
	fn write(&mut self, data: &[u8]) {
		if let Some(ref mut file) = self.file {
			let _ = file.write_all(data);

			self.bytes_written += data.len() as u64;

			if self.max_size > 0 && self.bytes_written >= self.max_size {
				self.rotate();
			}
		}
	}

	fn rotate(&mut self) {
		if let Some(file) = self.file.take() {
			drop(file);
		}

		let rotated_path = self.log_dir.join(rotated_log_name(&self.log_dir, LOG_PREFIX));
		let _ = fs::rename(&self.path, &rotated_path);

		self.path = self.log_dir.join(current_log_name(LOG_PREFIX));
		self.file = open_append(&self.path);
		self.bytes_written = 0;
	}
}

fn open_append(path: &Path) -> Option<File> {
	OpenOptions::new().create(true).append(true).open(path).ok()
}

pub fn current_log_name(prefix: &str) -> String {
	format!("{} {}.log", prefix, Stamp::now().date_tag())
}

/// Name for a rotated-out file, made unique by adding hour, then minute, then second.
pub fn rotated_log_name(log_dir: &Path, prefix: &str) -> String {
	let now = Stamp::now();
	let date = now.date_tag();
	let candidates = [
		format!("{} {} {:02}.log", prefix, date, now.hour),
		format!("{} {} {:02}.{:02}.log", prefix, date, now.hour, now.minute),
	];
	candidates
		.into_iter()
		.find(|name| !log_dir.join(name).exists())
		.unwrap_or_else(|| {
			format!("{} {} {:02}.{:02}.{:02}.log", prefix, date, now.hour, now.minute, now.second)
		})
}

/// Extracts `(yy, mm, dd)` from a name produced by `current_log_name` or `rotated_log_name`.
pub fn parse_log_date(filename: &str) -> Option<(u32, u32, u32)> {
	let (_, rest) = filename.split_once(' ')?;
	let tag = rest.split(' ').next()?.trim_end_matches(".log");
	let (yy, mmdd) = tag.split_once('-')?;
	if yy.len() != 2 || mmdd.len() != 4 {
		return None;
	}
	let year: u32 = yy.parse().ok()?;
	let month: u32 = mmdd[..2].parse().ok()?;
	let day: u32 = mmdd[2..].parse().ok()?;
	if !(1..=12).contains(&month) || day == 0 || u64::from(day) > days_in_month(2000 + year, month) {
		return None;
	}
	Some((year, month, day))
}

struct LogFile {
	path: PathBuf,
	/// Days since the epoch of the date in the file name.
	day: Option<u64>,
	modified: Option<SystemTime>,
}

fn list_log_files(log_dir: &Path) -> Vec<LogFile> {
	let Ok(entries) = fs::read_dir(log_dir) else {
		return Vec::new();
	};
	entries
		.flatten()
		.map(|entry| entry.path())
		.filter(|path| path.extension().and_then(|e| e.to_str()) == Some("log"))
		.map(|path| {
			let day = path
				.file_name()
				.and_then(|n| n.to_str())
				.and_then(parse_log_date)
				.map(|(y, m, d)| days_from_civil(2000 + y, m, d));
			let modified = path.metadata().and_then(|m| m.modified()).ok();
			LogFile { path, day, modified }
		})
		.collect()
}

fn remove_all(files: &[LogFile]) -> usize {
	files.iter().filter(|f| fs::remove_file(&f.path).is_ok()).count()
}

/// Removes `.log` files dated more than `max_age_days` ago, then the least recently
/// modified files beyond `max_files`. Zero disables either limit. Returns how many
/// files were removed.
pub fn expire_logs(log_dir: &Path, max_age_days: u32, max_files: u32) -> usize {
	let mut files = list_log_files(log_dir);
	let mut removed = 0;

	if max_age_days > 0 {
		let cutoff = (unix_now() / SECS_PER_DAY).saturating_sub(max_age_days as u64);
		let (expired, kept): (Vec<_>, Vec<_>) = files
			.into_iter()
			.partition(|f| matches!(f.day, Some(day) if day < cutoff));
		removed += remove_all(&expired);
		files = kept;
	}

	if max_files > 0 && files.len() > max_files as usize {
		files.sort_by_key(|f| f.modified);
		let excess = files.len() - max_files as usize;
		removed += remove_all(&files[..excess]);
	}

	removed
}

// ── calendar ────────────────────────────────────────────────────────────────

const SECS_PER_DAY: u64 = 86_400;

/// UTC wall-clock time, broken down for file naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
	pub year: u32,
	pub month: u32,
	pub day: u32,
	pub hour: u32,
	pub minute: u32,
	pub second: u32,
}

impl Stamp {
	pub fn now() -> Self {
		Self::from_unix(unix_now())
	}

	pub fn from_unix(secs: u64) -> Self {
		let (year, month, day) = civil_from_days(secs / SECS_PER_DAY);
		let of_day = (secs % SECS_PER_DAY) as u32;
		Self {
			year,
			month,
			day,
			hour: of_day / 3600,
			minute: of_day % 3600 / 60,
			second: of_day % 60,
		}
	}

	/// `YY-MMDD`
	pub fn date_tag(&self) -> String {
		format!("{:02}-{:02}{:02}", self.year % 100, self.month, self.day)
	}
}

fn unix_now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}

fn is_leap(year: u32) -> bool {
	(year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_year(year: u32) -> u64 {
	if is_leap(year) { 366 } else { 365 }
}

fn days_in_month(year: u32, month: u32) -> u64 {
	match month {
		2 if is_leap(year) => 29,
		2 => 28,
		4 | 6 | 9 | 11 => 30,
		_ => 31,
	}
}

fn civil_from_days(mut days: u64) -> (u32, u32, u32) {
	let mut year = 1970;
	while days >= days_in_year(year) {
		days -= days_in_year(year);
		year += 1;
	}
	let mut month = 1;
	while days >= days_in_month(year, month) {
		days -= days_in_month(year, month);
		month += 1;
	}
	(year, month, days as u32 + 1)
}

fn days_from_civil(year: u32, month: u32, day: u32) -> u64 {
	let years: u64 = (1970..year).map(days_in_year).sum();
	let months: u64 = (1..month).map(|m| days_in_month(year, m)).sum();
	years + months + (day as u64).saturating_sub(1)
}
