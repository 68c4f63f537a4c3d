use authdb::ErrorCode;
use authdb::ErrorDetail;
use authdb_cli::{cli::Cli, commands, error::EXIT_INTERRUPTED, logging, output};
use clap::Parser;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbosity());

	// Dropping the command future aborts any in-flight request; token file
	// writes are atomic renames and never observed half-done.
	let code = tokio::select! {
		code = commands::execute(cli) => code,
		_ = tokio::signal::ctrl_c() => {
			output::print_error_stderr(&ErrorDetail::new(ErrorCode::Cancelled, "interrupted"));
			EXIT_INTERRUPTED
		}
	};

	std::process::exit(code);
}
