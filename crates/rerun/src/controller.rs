//! Ownership of the single supervised child.
//!
//! Every operation takes the controller's one `Mutex` for its whole duration.
//! The work itself lives on `Slot`, which is only reachable through the
//! guard, so `restart` can run stop-then-start inside a single critical
//! section without any path re-entering the lock.

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::output::{forward_lines, Stream};
use crate::sink::LogSink;
use crate::types::*;

pub struct ProcessController {
	slot: Mutex<Slot>,
}

struct Slot {
	current: Option<SupervisedProcess>,
	state: ProcessState,
	generation: u64,
	closed: bool,
	sink: Arc<dyn LogSink>,
	stop_timeout: Option<Duration>,
}

struct SupervisedProcess {
	info: ProcessInfo,
	child: Child,
}

impl ProcessController {
	/// `stop_timeout` is how long a stopped group gets after SIGTERM before
	/// the background reaper sends SIGKILL. `None` never escalates.
	pub fn new(sink: Arc<dyn LogSink>, stop_timeout: Option<Duration>) -> Arc<Self> {
		Arc::new(Self {
			slot: Mutex::new(Slot {
				current: None,
				state: ProcessState::Absent,
				generation: 0,
				closed: false,
				sink,
				stop_timeout,
			}),
		})
	}

	/// Launches `command` as the leader of a new process group.
	///
	/// Fails with `AlreadyRunning` if a child is still owned; use `restart`
	/// to replace it.
	pub async fn start(&self, command: Vec<String>) -> Result<ProcessInfo> {
		let mut slot = self.slot.lock().await;
		if let Some(p) = &slot.current {
			return Err(Error::AlreadyRunning { pid: p.info.pid });
		}
		slot.start(command)
	}

	/// Sends SIGTERM to the owned group and forgets it. No-op when empty.
	pub async fn stop(&self) {
		let mut slot = self.slot.lock().await;
		slot.stop();
	}

	/// Stop followed by start, with no other operation able to run in between.
	pub async fn restart(&self, command: Vec<String>) -> Result<ProcessInfo> {
		let mut slot = self.slot.lock().await;
		if slot.closed {
			return Err(Error::Closed);
		}
		slot.log("replacing process");
		slot.stop();
		slot.state = ProcessState::Absent;
		slot.start(command)
	}

	/// Stops the child and refuses every later launch.
	pub async fn shutdown(&self) {
		let mut slot = self.slot.lock().await;
		slot.stop();
		slot.closed = true;
	}

	/// Non-blocking exit check. Clears the slot and reports if the child has exited.
	pub async fn reap(&self) -> Option<ExitReport> {
		let mut slot = self.slot.lock().await;
		slot.reap()
	}

	pub async fn current(&self) -> Option<ProcessInfo> {
		let slot = self.slot.lock().await;
		slot.current.as_ref().map(|p| p.info.clone())
	}

	pub async fn state(&self) -> ProcessState {
		self.slot.lock().await.state.clone()
	}

	/// Number of successful launches so far.
	pub async fn generation(&self) -> u64 {
		self.slot.lock().await.generation
	}

	pub async fn is_closed(&self) -> bool {
		self.slot.lock().await.closed
	}
}

impl Slot {
	fn log(&self, line: &str) {
		self.sink.write(Category::Watcher, line);
	}

	fn start(&mut self, command: Vec<String>) -> Result<ProcessInfo> {
		if self.closed {
			return Err(Error::Closed);
		}
		let (program, args) = command.split_first().ok_or(Error::EmptyCommand)?;

		let mut child = Command::new(program)
			.args(args)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.process_group(0)
			.spawn()
			.map_err(|source| Error::Spawn {
				command: command.clone(),
				source,
			})?;

		let Some(pid) = child.id() else {
			return Err(Error::Spawn {
				command,
				source: std::io::Error::other("child exited before its pid was read"),
			});
		};

		self.generation += 1;
		let info = ProcessInfo {
			pid,
			pgid: pid,
			command,
			generation: self.generation,
		};

		if let Some(stdout) = child.stdout.take() {
			forward_lines(stdout, Stream::Stdout, info.generation, Arc::clone(&self.sink));
		}
		if let Some(stderr) = child.stderr.take() {
			forward_lines(stderr, Stream::Stderr, info.generation, Arc::clone(&self.sink));
		}

		self.log(&format!(
			"started :{}: `{}` (pid {})",
			info.generation,
			display_command(&info.command),
			info.pid
		));
		self.state = ProcessState::Running { pid, pgid: pid };
		self.current = Some(SupervisedProcess {
			info: info.clone(),
			child,
		});
		Ok(info)
	}

	fn stop(&mut self) {
		let Some(SupervisedProcess { info, child }) = self.current.take() else {
			return;
		};
		self.state = ProcessState::Absent;

		self.log(&format!("stopping :{}: (pgid {})", info.generation, info.pgid));
		let pgid = Pid::from_raw(info.pgid as i32);
		if let Err(e) = killpg(pgid, Signal::SIGTERM) {
			// ESRCH: the group already exited and is waiting to be reaped.
			tracing::debug!("SIGTERM to group {} failed: {}", info.pgid, e);
		}

		spawn_reaper(child, info, self.stop_timeout, Arc::clone(&self.sink));
	}

	fn reap(&mut self) -> Option<ExitReport> {
		let process = self.current.as_mut()?;
		let status = match process.child.try_wait() {
			Ok(Some(status)) => status,
			Ok(None) => return None,
			Err(e) => {
				tracing::warn!("failed to poll pid {}: {}", process.info.pid, e);
				return None;
			}
		};

		let process = self.current.take()?;
		self.state = ProcessState::Exited { code: status.code() };
		// The leader is gone but background members of its group may not be.
		if let Err(e) = killpg(Pid::from_raw(process.info.pgid as i32), Signal::SIGTERM) {
			if e != nix::errno::Errno::ESRCH {
				tracing::debug!("SIGTERM to group {} failed: {}", process.info.pgid, e);
			}
		}
		Some(ExitReport {
			info: process.info,
			code: status.code(),
			signal: status.signal(),
		})
	}
}

/// Waits for a stopped child off the lock, escalating to SIGKILL on its group
/// if it outlives `timeout`.
fn spawn_reaper(
	mut child: Child,
	info: ProcessInfo,
	timeout: Option<Duration>,
	sink: Arc<dyn LogSink>,
) {
	tokio::spawn(async move {
		let status = match timeout {
			Some(timeout) => match tokio::time::timeout(timeout, child.wait()).await {
				Ok(status) => status,
				Err(_) => {
					sink.write(
						Category::Watcher,
						&format!(
							":{}: still alive after {:?}, sending SIGKILL to group {}",
							info.generation, timeout, info.pgid
						),
					);
					let _ = killpg(Pid::from_raw(info.pgid as i32), Signal::SIGKILL);
					child.wait().await
				}
			},
			None => child.wait().await,
		};

		match status {
			Ok(status) => sink.write(
				Category::Watcher,
				&format!("process :{}: terminated ({})", info.generation, describe_status(&status)),
			),
			Err(e) => tracing::warn!("failed to wait for pid {}: {}", info.pid, e),
		}
	});
}

pub fn describe_status(status: &ExitStatus) -> String {
	match (status.code(), status.signal()) {
		(Some(code), _) => format!("exit code {}", code),
		(None, Some(signal)) => match Signal::try_from(signal) {
			Ok(sig) => format!("signal {}", sig.as_str()),
			Err(_) => format!("signal {}", signal),
		},
		(None, None) => "unknown status".to_string(),
	}
}
