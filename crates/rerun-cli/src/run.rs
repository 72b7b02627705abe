use std::sync::Arc;
use std::time::Duration;

use rerun::{
	load_config, logs, CommandSource, Config, FanoutSink, FileSink, LogSink, MtimeScanner,
	ProcessController, Shutdown, SignalSource, Supervisor, SupervisorConfig, TracingSink,
};

use crate::args::Options;

const EXIT_SIGNAL: i32 = 130;

/// Runs the supervisor to completion and returns the process exit code.
pub async fn run(opts: Options) -> i32 {
	let config = match load_config(opts.config.as_deref()) {
		Ok(c) => c,
		Err(e) => {
			init_tracing(&Config::default());
			tracing::error!("{}", e);
			return 1;
		}
	};
	init_tracing(&config);

	let sink = build_sink(&config);
	let poll_interval = opts
		.interval_ms
		.map(Duration::from_millis)
		.unwrap_or_else(|| config.poll_interval());

	let controller = ProcessController::new(Arc::clone(&sink), config.stop_timeout());
	let supervisor = Supervisor::new(
		SupervisorConfig {
			root: opts.folder,
			command: opts.command,
			poll_interval,
		},
		controller,
		Arc::new(MtimeScanner::new(config.ignore.clone())),
		sink,
	);

	match supervisor.run(CommandSource::stdin(), SignalSource::os()).await {
		Ok(Shutdown::Exit) => 0,
		Ok(Shutdown::Signal(name)) => {
			tracing::info!("terminated by {}", name);
			EXIT_SIGNAL
		}
		Err(e) => {
			tracing::error!("{}", e);
			1
		}
	}
}

fn init_tracing(config: &Config) {
	let level = match config.log_level.parse::<tracing::Level>() {
		Ok(l) => l,
		Err(_) => {
			eprintln!("warning: unknown log_level {:?}, using info", config.log_level);
			tracing::Level::INFO
		}
	};
	tracing_subscriber::fmt().with_max_level(level).init();
}

fn build_sink(config: &Config) -> Arc<dyn LogSink> {
	let Some(dir) = &config.logs.dir else {
		return Arc::new(TracingSink);
	};

	let removed = logs::expire_logs(dir, config.logs.max_age_days, config.logs.max_files);
	if removed > 0 {
		tracing::debug!("expired {} old log files in {}", removed, dir.display());
	}

	let file = FileSink::new(dir, config.logs.max_size_bytes);
	tracing::info!("writing logs to {}", file.path().display());
	Arc::new(FanoutSink::new().with(Arc::new(TracingSink)).with(Arc::new(file)))
}
