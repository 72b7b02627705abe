use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;

use crate::command::{CommandSource, UserCommand, HELP};
use crate::controller::ProcessController;
use crate::error::{Error, Result};
use crate::signal::SignalSource;
use crate::sink::LogSink;
use crate::types::*;
use crate::watch::ChangeDetector;

pub struct SupervisorConfig {
	pub root: PathBuf,
	pub command: Vec<String>,
	pub poll_interval: Duration,
}

/// Why `Supervisor::run` returned without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shutdown {
	/// The `exit` command.
	Exit,
	/// A termination signal, by name.
	Signal(&'static str),
}

/// Last modification time the loop has reacted to. Never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchBaseline(SystemTime);

impl WatchBaseline {
	pub fn new(time: SystemTime) -> Self {
		Self(time)
	}

	pub fn get(&self) -> SystemTime {
		self.0
	}

	/// True if `latest` is strictly newer than the baseline.
	pub fn is_change(&self, latest: SystemTime) -> bool {
		latest > self.0
	}

	pub fn advance(&mut self, latest: SystemTime) {
		if latest > self.0 {
			self.0 = latest;
		}
	}
}

/// Funnels file changes, user commands and termination signals into one
/// `ProcessController`.
pub struct Supervisor {
	controller: Arc<ProcessController>,
	detector: Arc<dyn ChangeDetector>,
	sink: Arc<dyn LogSink>,
	root: PathBuf,
	poll_interval: Duration,
	command: Mutex<Vec<String>>,
}

impl Supervisor {
	pub fn new(
		config: SupervisorConfig,
		controller: Arc<ProcessController>,
		detector: Arc<dyn ChangeDetector>,
		sink: Arc<dyn LogSink>,
	) -> Arc<Self> {
		Arc::new(Self {
			controller,
			detector,
			sink,
			root: config.root,
			poll_interval: config.poll_interval,
			command: Mutex::new(config.command),
		})
	}

	pub fn controller(&self) -> &Arc<ProcessController> {
		&self.controller
	}

	/// The command vector the next restart will launch.
	pub fn command(&self) -> Vec<String> {
		self.command.lock().unwrap_or_else(|e| e.into_inner()).clone()
	}

	fn set_command(&self, command: Vec<String>) {
		*self.command.lock().unwrap_or_else(|e| e.into_inner()) = command;
	}

	fn log(&self, line: &str) {
		self.sink.write(Category::Watcher, line);
	}

	/// Takes the initial baseline, launches the command, then runs until
	/// `exit`, a termination signal, or a scan failure. The child is always
	/// stopped and the controller closed before this returns.
	pub async fn run(
		self: &Arc<Self>,
		commands: CommandSource,
		signals: SignalSource,
	) -> Result<Shutdown> {
		self.log(&format!("watching {}", self.root.display()));
		self.log(&format!("command: {}", display_command(&self.command())));

		let baseline = match self.scan().await {
			Ok(t) => WatchBaseline::new(t),
			Err(e) => {
				self.controller.shutdown().await;
				self.log(&format!("failed to read latest modified time: {}", e));
				return Err(e);
			}
		};

		if let Err(e) = self.controller.start(self.command()).await {
			self.log(&format!("failed to start process: {}", e));
		}

		let (done_tx, mut done_rx) = mpsc::channel::<Result<Shutdown>>(3);

		let handles = [
			tokio::spawn(Arc::clone(self).poll_loop(baseline, done_tx.clone())),
			tokio::spawn(Arc::clone(self).command_loop(commands, done_tx.clone())),
			tokio::spawn(Arc::clone(self).signal_loop(signals, done_tx)),
		];

		let outcome = done_rx.recv().await.unwrap_or(Ok(Shutdown::Exit));
		for handle in &handles {
			handle.abort();
		}
		// Every exit path closes the controller first; this covers the fallback.
		self.controller.shutdown().await;
		outcome
	}

	async fn scan(&self) -> Result<SystemTime> {
		let detector = Arc::clone(&self.detector);
		let root = self.root.clone();
		let scanned = tokio::task::spawn_blocking(move || detector.latest(&root))
			.await
			.unwrap_or_else(|e| Err(io::Error::other(e)));
		scanned.map_err(|source| Error::Watch {
			path: self.root.clone(),
			source,
		})
	}

	async fn restart(&self) {
		match self.controller.restart(self.command()).await {
			Ok(_) | Err(Error::Closed) => {}
			Err(e) => self.log(&format!("failed to restart: {}", e)),
		}
	}

	async fn poll_loop(self: Arc<Self>, mut baseline: WatchBaseline, done: mpsc::Sender<Result<Shutdown>>) {
		loop {
			if let Some(report) = self.controller.reap().await {
				match (report.code, report.signal) {
					(Some(0), _) => {}
					(Some(code), _) => self.log(&format!(
						"process :{}: returned non-zero exit code: {}",
						report.info.generation, code
					)),
					(None, Some(signal)) => self.log(&format!(
						"process :{}: killed by signal {}",
						report.info.generation, signal
					)),
					(None, None) => {}
				}
				self.log("process exited, watching for modifications to restart");
			}

			let latest = match self.scan().await {
				Ok(t) => t,
				Err(e) => {
					self.controller.shutdown().await;
					self.log(&format!("failed to get the latest modified time: {}", e));
					let _ = done.send(Err(e)).await;
					return;
				}
			};

			if baseline.is_change(latest) {
				self.log("change detected, restarting process");
				self.restart().await;
				baseline.advance(latest);
			}

			tokio::time::sleep(self.poll_interval).await;
		}
	}

	async fn command_loop(self: Arc<Self>, mut commands: CommandSource, done: mpsc::Sender<Result<Shutdown>>) {
		while let Some(line) = commands.next().await {
			let line = match line {
				Ok(l) => l,
				Err(e) => {
					self.log(&format!("failed to read command: {}", e));
					continue;
				}
			};
			let Some(command) = UserCommand::parse(&line) else {
				tracing::debug!("ignoring input {:?}", line);
				continue;
			};
			self.log(&format!("got command: {}", line.trim()));

			match command {
				UserCommand::Exit => {
					self.controller.shutdown().await;
					self.log("quitting");
					let _ = done.send(Ok(Shutdown::Exit)).await;
					return;
				}
				UserCommand::Help => {
					for line in HELP {
						self.log(line);
					}
				}
				UserCommand::Restart => self.restart().await,
				UserCommand::Status => match self.controller.current().await {
					Some(info) => self.log(&format!(
						"running :{}: `{}` (pid {}, pgid {})",
						info.generation,
						display_command(&info.command),
						info.pid,
						info.pgid
					)),
					None => self.log(&format!(
						"nothing running; next command: `{}`",
						display_command(&self.command())
					)),
				},
				UserCommand::SetProcess(words) => {
					if words.is_empty() {
						self.log(&format!("set_process: {}", Error::EmptyCommand));
						continue;
					}
					self.log(&format!("setting process to: {}", display_command(&words)));
					// Stored before restarting so a failed spawn can be retried with `restart`.
					self.set_command(words);
					self.restart().await;
				}
			}
		}
		self.log("input closed, interactive commands disabled");
	}

	async fn signal_loop(self: Arc<Self>, mut signals: SignalSource, done: mpsc::Sender<Result<Shutdown>>) {
		let Some(name) = signals.recv().await else {
			return;
		};
		self.controller.shutdown().await;
		self.log(&format!("killing processes: {}", name));
		let _ = done.send(Ok(Shutdown::Signal(name))).await;
	}
}
