use std::io;
use std::path::PathBuf;

/// Errors from the controller, the watch loop and config loading.
#[derive(Debug)]
pub enum Error {
	/// A command vector with no program in it.
	EmptyCommand,
	/// The program could not be launched (missing binary, permission denied, ...).
	Spawn { command: Vec<String>, source: io::Error },
	/// `start` was called while a process is already owned.
	AlreadyRunning { pid: u32 },
	/// The controller has been shut down and launches nothing new.
	Closed,
	/// The watched path could not be scanned.
	Watch { path: PathBuf, source: io::Error },
	/// The config file could not be read or parsed.
	Config { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
	/// True for errors that leave the controller usable for the next trigger.
	pub fn is_spawn(&self) -> bool {
		matches!(self, Error::EmptyCommand | Error::Spawn { .. })
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::EmptyCommand => write!(f, "empty command"),
			Error::Spawn { command, source } => {
				write!(f, "failed to spawn `{}`: {}", command.join(" "), source)
			}
			Error::AlreadyRunning { pid } => write!(f, "process already running (pid {})", pid),
			Error::Closed => write!(f, "controller is shut down"),
			Error::Watch { path, source } => {
				write!(f, "failed to scan {}: {}", path.display(), source)
			}
			Error::Config { path, message } => {
				write!(f, "config {}: {}", path.display(), message)
			}
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Error::Spawn { source, .. } | Error::Watch { source, .. } => Some(source),
			_ => None,
		}
	}
}
