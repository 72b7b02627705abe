use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
	pub folder: PathBuf,
	pub command: Vec<String>,
	pub interval_ms: Option<u64>,
	pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
	Run(Options),
	Help,
	Version,
}

/// Everything after `-p` belongs to the command, flags included.
pub fn parse_args(args: &[String]) -> Result<Parsed, String> {
	let mut folder: Option<PathBuf> = None;
	let mut command: Option<Vec<String>> = None;
	let mut interval_ms = None;
	let mut config = None;

	let mut iter = args.iter();
	while let Some(arg) = iter.next() {
		match arg.as_str() {
			"-h" | "--help" | "help" => return Ok(Parsed::Help),
			"-V" | "--version" | "version" => return Ok(Parsed::Version),
			"-f" | "--folder" => {
				let value = iter.next().ok_or("-f expects a folder")?;
				if folder.is_some() {
					return Err("multiple folders specified: not supported".into());
				}
				folder = Some(PathBuf::from(value));
			}
			"-i" | "--interval" => {
				let value = iter.next().ok_or("--interval expects milliseconds")?;
				let ms: u64 = value
					.parse()
					.map_err(|_| format!("invalid interval: {}", value))?;
				if ms == 0 {
					return Err("interval must be greater than zero".into());
				}
				interval_ms = Some(ms);
			}
			"-c" | "--config" => {
				let value = iter.next().ok_or("--config expects a path")?;
				config = Some(PathBuf::from(value));
			}
			"-p" | "--process" => {
				command = Some(iter.by_ref().cloned().collect());
			}
			other => return Err(format!("unknown argument: {}", other)),
		}
	}

	let folder = folder.ok_or("missing -f <folder>")?;
	let command = command.ok_or("missing -p <command...>")?;
	if command.is_empty() {
		return Err("-p expects a command".into());
	}

	Ok(Parsed::Run(Options {
		folder,
		command,
		interval_ms,
		config,
	}))
}
