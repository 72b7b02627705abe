use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

use crate::sink::LogSink;
use crate::types::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
	Stdout,
	Stderr,
}

impl Stream {
	fn tag(&self) -> &'static str {
		match self {
			Stream::Stdout => "(out)",
			Stream::Stderr => "(err)",
		}
	}
}

/// Spawns a task that forwards `reader` line by line into `sink` until EOF.
///
/// Lines are tagged with the launch generation and the stream, e.g. `:3: (err) boom`.
pub fn forward_lines<R>(
	reader: R,
	stream: Stream,
	generation: u64,
	sink: Arc<dyn LogSink>,
) -> JoinHandle<()>
where
	R: AsyncRead + Unpin + Send + 'static,
{
	tokio::spawn(async move {
		let mut reader = BufReader::new(reader);
		let mut buf = Vec::new();
		loop {
			buf.clear();
			match reader.read_until(b'\n', &mut buf).await {
				Ok(0) => break,
				Ok(_) => {
					let line = String::from_utf8_lossy(&buf);
					let line = line.trim_end_matches(&['\n', '\r'][..]);
					sink.write(
						Category::Process,
						&format!(":{}: {} {}", generation, stream.tag(), line),
					);
				}
				Err(e) => {
					tracing::debug!("output stream of generation {} closed: {}", generation, e);
					break;
				}
			}
		}
	})
}
