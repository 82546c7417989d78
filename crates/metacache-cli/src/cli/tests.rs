//! CLI parse tests.

use super::{Cli, CliCommand};
use clap::Parser;

fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

#[test]
fn cli_parse_serve_defaults() {
    match parse(&["metacache", "serve"]) {
        CliCommand::Serve { listen, memory } => {
            assert!(listen.is_none());
            assert!(!memory);
        }
        _ => panic!("expected Serve"),
    }
}

#[test]
fn cli_parse_serve_flags() {
    match parse(&["metacache", "serve", "--listen", "0.0.0.0:9000", "--memory"]) {
        CliCommand::Serve { listen, memory } => {
            assert_eq!(listen.as_deref(), Some("0.0.0.0:9000"));
            assert!(memory);
        }
        _ => panic!("expected Serve with flags"),
    }
}

#[test]
fn cli_parse_lookup() {
    match parse(&["metacache", "lookup", "https://example.com/a"]) {
        CliCommand::Lookup { url } => assert_eq!(url, "https://example.com/a"),
        _ => panic!("expected Lookup"),
    }
}

#[test]
fn cli_parse_collect() {
    match parse(&["metacache", "collect", "https://example.com"]) {
        CliCommand::Collect { url } => assert_eq!(url, "https://example.com"),
        _ => panic!("expected Collect"),
    }
}

#[test]
fn cli_rejects_missing_url() {
    assert!(Cli::try_parse_from(["metacache", "collect"]).is_err());
    assert!(Cli::try_parse_from(["metacache", "lookup"]).is_err());
}
