//! Interactive commands and the line source that feeds them.

use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

pub const HELP: &[&str] = &[
	"`exit` stops the process and quits.",
	"`restart` restarts the process.",
	"`set_process <command...>` replaces the command and restarts.",
	"`status` shows the running process.",
	"`help` shows this message.",
];

const MAX_READ_FAILURES: u32 = 10;
const READ_RETRY_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
	Exit,
	Help,
	Restart,
	Status,
	/// The words after `set_process`, split on whitespace. May be empty.
	SetProcess(Vec<String>),
}

impl UserCommand {
	/// `None` for blank or unrecognized lines, which are ignored.
	pub fn parse(line: &str) -> Option<Self> {
		let mut words = line.split_whitespace();
		let command = match words.next()? {
			"exit" => UserCommand::Exit,
			"help" => UserCommand::Help,
			"restart" => UserCommand::Restart,
			"status" => UserCommand::Status,
			"set_process" => UserCommand::SetProcess(words.map(str::to_string).collect()),
			_ => return None,
		};
		Some(command)
	}
}

/// Async stream of raw input lines. Read errors are delivered, not fatal.
pub struct CommandSource {
	rx: mpsc::Receiver<io::Result<String>>,
}

impl CommandSource {
	/// A source fed by hand; used for embedding and tests.
	pub fn channel(capacity: usize) -> (mpsc::Sender<io::Result<String>>, Self) {
		let (tx, rx) = mpsc::channel(capacity);
		(tx, Self { rx })
	}

	/// Reads `reader` line by line on a background task until EOF.
	///
	/// Read errors are delivered and retried with a growing delay; the source
	/// closes only after `MAX_READ_FAILURES` of them in a row.
	pub fn from_reader<R>(reader: R) -> Self
	where
		R: AsyncRead + Unpin + Send + 'static,
	{
		let (tx, source) = Self::channel(16);
		tokio::spawn(async move {
			let mut reader = BufReader::new(reader);
			let mut buf = Vec::new();
			let mut failures = 0u32;
			loop {
				buf.clear();
				let item = match reader.read_until(b'\n', &mut buf).await {
					Ok(0) => break,
					Ok(_) => match std::str::from_utf8(&buf) {
						Ok(s) => Ok(s.trim_end_matches(&['\n', '\r'][..]).to_string()),
						Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
					},
					Err(e) => {
						failures += 1;
						let give_up = failures >= MAX_READ_FAILURES;
						if tx.send(Err(e)).await.is_err() || give_up {
							break;
						}
						tokio::time::sleep(READ_RETRY_DELAY * failures).await;
						continue;
					}
				};
				failures = 0;
				if tx.send(item).await.is_err() {
					break;
				}
			}
		});
		source
	}

	pub fn stdin() -> Self {
		Self::from_reader(tokio::io::stdin())
	}

	/// Next line, or `None` once the input is closed.
	pub async fn next(&mut self) -> Option<io::Result<String>> {
		self.rx.recv().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::pin::Pin;
	use std::task::{Context, Poll};
	use tokio::io::ReadBuf;

	/// Fails the first `failures` reads, then serves `data`.
	struct FlakyReader {
		failures: u32,
		data: &'static [u8],
	}

	impl AsyncRead for FlakyReader {
		fn poll_read(
			mut self: Pin<&mut Self>,
			_cx: &mut Context<'_>,
			buf: &mut ReadBuf<'_>,
		) -> Poll<io::Result<()>> {
			if self.failures > 0 {
				self.failures -= 1;
				return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "read failed")));
			}
			let n = self.data.len().min(buf.remaining());
			let (head, rest) = self.data.split_at(n);
			buf.put_slice(head);
			self.data = rest;
			Poll::Ready(Ok(()))
		}
	}

	#[test]
	fn parses_known_commands() {
		assert_eq!(UserCommand::parse("exit"), Some(UserCommand::Exit));
		assert_eq!(UserCommand::parse("  help  "), Some(UserCommand::Help));
		assert_eq!(UserCommand::parse("restart\n"), Some(UserCommand::Restart));
		assert_eq!(UserCommand::parse("status"), Some(UserCommand::Status));
		assert_eq!(
			UserCommand::parse("set_process echo  hi"),
			Some(UserCommand::SetProcess(vec!["echo".into(), "hi".into()]))
		);
		assert_eq!(UserCommand::parse("set_process"), Some(UserCommand::SetProcess(vec![])));
	}

	#[test]
	fn ignores_unknown_and_blank_lines() {
		assert_eq!(UserCommand::parse(""), None);
		assert_eq!(UserCommand::parse("   "), None);
		assert_eq!(UserCommand::parse("reboot"), None);
		assert_eq!(UserCommand::parse("EXIT"), None);
	}

	#[tokio::test]
	async fn reader_yields_lines_then_ends() {
		let input: &[u8] = b"help\r\nrestart\n\xff\nexit";
		let mut source = CommandSource::from_reader(input);
		assert_eq!(source.next().await.unwrap().unwrap(), "help");
		assert_eq!(source.next().await.unwrap().unwrap(), "restart");
		assert_eq!(
			source.next().await.unwrap().unwrap_err().kind(),
			io::ErrorKind::InvalidData
		);
		assert_eq!(source.next().await.unwrap().unwrap(), "exit");
		assert!(source.next().await.is_none());
	}

	#[tokio::test]
	async fn read_errors_are_delivered_and_reading_resumes() {
		let mut source = CommandSource::from_reader(FlakyReader {
			failures: 2,
			data: b"restart\nexit\n",
		});
		for _ in 0..2 {
			let err = source.next().await.unwrap().unwrap_err();
			assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
		}
		assert_eq!(source.next().await.unwrap().unwrap(), "restart");
		assert_eq!(source.next().await.unwrap().unwrap(), "exit");
		assert!(source.next().await.is_none());
	}

	#[tokio::test]
	async fn persistent_read_errors_close_the_source() {
		let mut source = CommandSource::from_reader(FlakyReader {
			failures: u32::MAX,
			data: b"",
		});
		let mut errors = 0;
		while let Some(item) = source.next().await {
			assert!(item.is_err());
			errors += 1;
		}
		assert_eq!(errors, MAX_READ_FAILURES);
	}
}
