use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs the stderr subscriber. `RUST_LOG` wins over `verbosity`.
pub fn init_logging(verbosity: u8) {
	// 0 = errors only, stdout stays clean for piping
	// 1 (-v) = session and retry events
	// 2+ (-vv, --debug) = every request and page, HTTP stack kept at info
	let filter = match verbosity {
		0 => "error",
		1 => "warn,authdb=info,authdb_cli=info",
		_ => "debug,hyper=info,hyper_util=info,reqwest=info,rustls=info",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
