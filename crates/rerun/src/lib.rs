//! # rerun
//!
//! Watch a folder, restart a command when anything under it changes.
//!
//! A single [`ProcessController`] owns the child and serializes every start,
//! stop and restart. A [`Supervisor`] feeds it from three independent
//! sources: a poll of the folder's latest modification time, interactive
//! commands, and termination signals.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use rerun::{CommandSource, MtimeScanner, ProcessController, SignalSource};
//! use rerun::{Supervisor, SupervisorConfig, TracingSink};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sink = Arc::new(TracingSink);
//! let controller = ProcessController::new(sink.clone(), Some(Duration::from_secs(3)));
//! let sup = Supervisor::new(
//!     SupervisorConfig {
//!         root: "src".into(),
//!         command: vec!["cargo".into(), "run".into()],
//!         poll_interval: Duration::from_millis(250),
//!     },
//!     controller,
//!     Arc::new(MtimeScanner::default()),
//!     sink,
//! );
//!
//! let shutdown = sup.run(CommandSource::stdin(), SignalSource::os()).await;
//! # let _ = shutdown;
//! # }
//! ```

pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod logs;
pub mod output;
pub mod signal;
pub mod sink;
pub mod supervisor;
pub mod types;
pub mod watch;

pub use command::{CommandSource, UserCommand};
pub use config::{load_config, Config, LogsConfig};
pub use controller::ProcessController;
pub use error::{Error, Result};
pub use logs::FileSink;
pub use signal::SignalSource;
pub use sink::{FanoutSink, LogSink, MemorySink, TracingSink};
pub use supervisor::{Shutdown, Supervisor, SupervisorConfig, WatchBaseline};
pub use types::*;
pub use watch::{ChangeDetector, MtimeScanner};
