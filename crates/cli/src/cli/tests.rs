use std::path::PathBuf;

use clap::Parser;

use super::*;

#[test]
fn parse_add_with_positional_and_flag_fields() {
	let args = vec![
		"authdbctl",
		"add",
		"user",
		"username=jsmith",
		"--field",
		"email=a@b.com",
		"--field",
		"roles=admin,editor",
	];
	let cli = Cli::try_parse_from(args).unwrap();

	match cli.command {
		Commands::Add(args) => {
			assert_eq!(args.resource, "user");
			let payload = args.payload();
			assert_eq!(payload["username"], "jsmith");
			assert_eq!(payload["email"], "a@b.com");
			assert_eq!(payload["roles"], "admin,editor");
		}
		_ => panic!("Expected Add command"),
	}
}

#[test]
fn value_may_contain_equals_sign() {
	let cli = Cli::try_parse_from(["authdbctl", "add", "role", "name=a=b"]).unwrap();
	match cli.command {
		Commands::Add(args) => assert_eq!(args.payload()["name"], "a=b"),
		_ => panic!("Expected Add command"),
	}
}

#[test]
fn malformed_field_is_rejected() {
	assert!(Cli::try_parse_from(["authdbctl", "add", "role", "name"]).is_err());
	assert!(Cli::try_parse_from(["authdbctl", "add", "role", "=x"]).is_err());
}

#[test]
fn parse_global_flags_after_subcommand() {
	let cli = Cli::try_parse_from([
		"authdbctl",
		"list",
		"role",
		"-f",
		"table",
		"--config",
		"/tmp/cfg.yaml",
		"--token-path",
		"/tmp/token.json",
	])
	.unwrap();

	assert_eq!(cli.format, Some(OutputFormat::Table));
	assert_eq!(cli.config, Some(PathBuf::from("/tmp/cfg.yaml")));
	assert_eq!(cli.token_path, Some(PathBuf::from("/tmp/token.json")));
	assert!(matches!(cli.command, Commands::List(ref a) if a.resource == "role"));
}

#[test]
fn unknown_format_is_a_usage_error() {
	let err = Cli::try_parse_from(["authdbctl", "-f", "xml", "metadata"]).unwrap_err();
	assert_eq!(err.exit_code(), 2);
}

#[test]
fn debug_implies_verbose_logging() {
	let cli = Cli::try_parse_from(["authdbctl", "--debug", "metadata"]).unwrap();
	assert_eq!(cli.verbosity(), 2);

	let cli = Cli::try_parse_from(["authdbctl", "-v", "metadata"]).unwrap();
	assert_eq!(cli.verbosity(), 1);
}

#[test]
fn parse_connect_flags() {
	let cli = Cli::try_parse_from(["authdbctl", "connect", "-u", "jsmith", "--password-stdin"]).unwrap();
	match cli.command {
		Commands::Connect(args) => {
			assert_eq!(args.username.as_deref(), Some("jsmith"));
			assert!(args.password_stdin);
		}
		_ => panic!("Expected Connect command"),
	}
}
