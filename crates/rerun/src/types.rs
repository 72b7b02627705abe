use serde::{Deserialize, Serialize};
use std::fmt;

/// Which panel a log line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
	/// Status messages from the supervisor itself.
	Watcher,
	/// Output forwarded from the supervised child.
	Process,
}

impl Category {
	pub fn as_str(&self) -> &'static str {
		match self {
			Category::Watcher => "watcher",
			Category::Process => "process",
		}
	}
}

impl fmt::Display for Category {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Snapshot of a launched child. Returned by `start`/`restart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
	pub pid: u32,
	/// The child leads its own group, so this equals `pid`.
	pub pgid: u32,
	pub command: Vec<String>,
	/// 1 for the first successful launch, incremented on every launch after.
	pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
	Absent,
	Running { pid: u32, pgid: u32 },
	Exited { code: Option<i32> },
}

impl ProcessState {
	pub fn is_running(&self) -> bool {
		matches!(self, ProcessState::Running { .. })
	}
}

/// How an owned child ended, as observed by `ProcessController::reap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
	pub info: ProcessInfo,
	pub code: Option<i32>,
	pub signal: Option<i32>,
}

impl ExitReport {
	pub fn success(&self) -> bool {
		self.code == Some(0)
	}
}

pub fn display_command(command: &[String]) -> String {
	command.join(" ")
}
