mod args;
mod run;

use args::Parsed;
use owo_colors::OwoColorize;

fn main() {
	let args: Vec<String> = std::env::args().skip(1).collect();

	if args.is_empty() {
		print_usage();
		std::process::exit(1);
	}

	let opts = match args::parse_args(&args) {
		Ok(Parsed::Run(opts)) => opts,
		Ok(Parsed::Help) => {
			print_usage();
			return;
		}
		Ok(Parsed::Version) => {
			println!("rerun {}", env!("CARGO_PKG_VERSION"));
			return;
		}
		Err(e) => {
			eprintln!("{} {}", "error:".red().bold(), e);
			eprintln!("run 'rerun --help' for usage");
			std::process::exit(1);
		}
	};

	let runtime = match tokio::runtime::Runtime::new() {
		Ok(rt) => rt,
		Err(e) => {
			eprintln!("{} failed to start runtime: {}", "error:".red().bold(), e);
			std::process::exit(1);
		}
	};

	// Exit straight from here: the stdin reader thread would block a runtime drop.
	let code = runtime.block_on(run::run(opts));
	std::process::exit(code);
}

fn print_usage() {
	eprintln!("{} {} - restart a command when a folder changes", "rerun".bold(), env!("CARGO_PKG_VERSION"));
	eprintln!();
	eprintln!("usage: {} -f <folder> [options] -p <command...>", "rerun".bold());
	eprintln!();

	eprintln!("{}", "options".cyan().bold());
	eprintln!("  {} <folder>          Folder to watch for modifications", "-f".bold());
	eprintln!("  {} <command...>      Command to run; everything after -p is passed through", "-p".bold());
	eprintln!("  {} <ms>        Poll interval (default 250)", "--interval".bold());
	eprintln!("  {} <path>        Config file (default ~/.config/rerun/config.toml)", "--config".bold());
	eprintln!("  {}             Show this message", "--help".bold());
	eprintln!("  {}          Show version", "--version".bold());
	eprintln!();

	eprintln!("{}", "while running".cyan().bold());
	for line in rerun::command::HELP {
		eprintln!("  {}", line);
	}
	eprintln!();

	eprintln!("{}", "examples".cyan().bold());
	eprintln!("    rerun -f src -p cargo run");
	eprintln!("    rerun -f . --interval 1000 -p python3 server.py --port 8080");
}
