use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

/// Delivers the name of each termination request (SIGINT, SIGTERM).
pub struct SignalSource {
	rx: mpsc::Receiver<&'static str>,
}

impl SignalSource {
	/// A source fed by hand; used for embedding and tests.
	pub fn channel() -> (mpsc::Sender<&'static str>, Self) {
		let (tx, rx) = mpsc::channel(4);
		(tx, Self { rx })
	}

	/// Listens for SIGINT and SIGTERM. A handler that fails to install is
	/// logged and skipped; the other one still delivers.
	pub fn os() -> Self {
		let (tx, source) = Self::channel();
		for (kind, name) in [
			(SignalKind::interrupt(), "SIGINT"),
			(SignalKind::terminate(), "SIGTERM"),
		] {
			let mut stream = match signal(kind) {
				Ok(s) => s,
				Err(e) => {
					tracing::error!("failed to install {} handler: {}", name, e);
					continue;
				}
			};
			let tx = tx.clone();
			tokio::spawn(async move {
				while stream.recv().await.is_some() {
					if tx.send(name).await.is_err() {
						break;
					}
				}
			});
		}
		source
	}

	/// Waits for the next termination request. `None` if no handler is left.
	pub async fn recv(&mut self) -> Option<&'static str> {
		self.rx.recv().await
	}
}
