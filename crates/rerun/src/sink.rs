//! Destinations for supervisor status lines and forwarded child output.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::types::Category;

/// Append-only line sink shared by the loop and the output forwarders.
///
/// Implementations are called concurrently from several tasks and must not
/// block for long: no awaiting, no unbounded waits on locks held elsewhere.
pub trait LogSink: Send + Sync {
	fn write(&self, category: Category, line: &str);
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
	fn write(&self, category: Category, line: &str) {
		(**self).write(category, line)
	}
}

/// Emits every line as a `tracing` event under `rerun::watcher` / `rerun::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
	fn write(&self, category: Category, line: &str) {
		match category {
			Category::Watcher => tracing::info!(target: "rerun::watcher", "{}", line),
			Category::Process => tracing::info!(target: "rerun::process", "{}", line),
		}
	}
}

/// Keeps the last `capacity` lines per category and fans lines out to subscribers.
#[derive(Clone)]
pub struct MemorySink {
	inner: Arc<Mutex<History>>,
	sender: broadcast::Sender<(Category, String)>,
}

struct History {
	capacity: usize,
	watcher: VecDeque<String>,
	process: VecDeque<String>,
}

impl History {
	fn lines_mut(&mut self, category: Category) -> &mut VecDeque<String> {
		match category {
			Category::Watcher => &mut self.watcher,
			Category::Process => &mut self.process,
		}
	}
}

impl MemorySink {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(256);
		Self {
			inner: Arc::new(Mutex::new(History {
				capacity: capacity.max(1),
				watcher: VecDeque::new(),
				process: VecDeque::new(),
			})),
			sender,
		}
	}

	pub fn lines(&self, category: Category) -> Vec<String> {
		let mut history = self.inner.lock().unwrap_or_else(|e| e.into_inner());
		history.lines_mut(category).iter().cloned().collect()
	}

	pub fn contains(&self, category: Category, needle: &str) -> bool {
		self.lines(category).iter().any(|l| l.contains(needle))
	}

	pub fn subscribe(&self) -> broadcast::Receiver<(Category, String)> {
		self.sender.subscribe()
	}
}

impl LogSink for MemorySink {
	fn write(&self, category: Category, line: &str) {
		{
			let mut history = self.inner.lock().unwrap_or_else(|e| e.into_inner());
			let capacity = history.capacity;
			let lines = history.lines_mut(category);
			if lines.len() >= capacity {
				lines.pop_front();
			}
			lines.push_back(line.to_string());
		}
		let _ = self.sender.send((category, line.to_string()));
	}
}

/// Forwards every line to each inner sink in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
	sinks: Vec<Arc<dyn LogSink>>,
}

impl FanoutSink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, sink: Arc<dyn LogSink>) -> Self {
		self.sinks.push(sink);
		self
	}

	pub fn len(&self) -> usize {
		self.sinks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sinks.is_empty()
	}
}

impl LogSink for FanoutSink {
	fn write(&self, category: Category, line: &str) {
		for sink in &self.sinks {
			sink.write(category, line);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn memory_sink_keeps_last_lines_per_category() {
		let sink = MemorySink::new(2);
		sink.write(Category::Watcher, "one");
		sink.write(Category::Watcher, "two");
		sink.write(Category::Watcher, "three");
		sink.write(Category::Process, "out");

		assert_eq!(sink.lines(Category::Watcher), vec!["two", "three"]);
		assert_eq!(sink.lines(Category::Process), vec!["out"]);
		assert!(!sink.contains(Category::Watcher, "one"));
	}

	#[tokio::test]
	async fn memory_sink_broadcasts() {
		let sink = MemorySink::new(10);
		let mut rx = sink.subscribe();
		sink.write(Category::Process, ":1: (out) hi");
		let (category, line) = rx.recv().await.unwrap();
		assert_eq!(category, Category::Process);
		assert_eq!(line, ":1: (out) hi");
	}

	#[test]
	fn fanout_writes_to_every_sink() {
		let a = Arc::new(MemorySink::new(10));
		let b = Arc::new(MemorySink::new(10));
		let fanout = FanoutSink::new().with(a.clone()).with(b.clone());
		assert_eq!(fanout.len(), 2);

		fanout.write(Category::Watcher, "hello");
		assert!(a.contains(Category::Watcher, "hello"));
		assert!(b.contains(Category::Watcher, "hello"));
	}
}
