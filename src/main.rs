use std::path::PathBuf;
use std::process;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::error;

use proj_mcp::mcp::{McpServer, ServerConfig, StdioTransport};
use proj_mcp::TransformConfig;

fn cli() -> Command {
    Command::new("proj-mcp")
        .version(env!("CARGO_PKG_VERSION"))
        .about("MCP server reprojecting coordinates and GeoJSON documents with PROJ")
        .arg(
            Arg::new("proj-data")
                .long("proj-data")
                .help("Directory searched for proj.db and grid files (repeatable)")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("authority")
                .long("authority")
                .help("Only consider operations from this authority, e.g. EPSG")
                .value_name("NAME"),
        )
        .arg(
            Arg::new("accuracy")
                .long("accuracy")
                .help("Minimum desired accuracy of operations, in metres")
                .value_name("METRES")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("no-ballpark")
                .long("no-ballpark")
                .help("Refuse ballpark transformations")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging on stderr")
                .action(ArgAction::SetTrue),
        )
}

fn server_config(matches: &ArgMatches) -> ServerConfig {
    let transform = TransformConfig {
        search_paths: matches
            .get_many::<PathBuf>("proj-data")
            .map(|paths| paths.cloned().collect())
            .unwrap_or_default(),
        authority: matches.get_one::<String>("authority").cloned(),
        accuracy: matches.get_one::<f64>("accuracy").copied(),
        allow_ballpark: !matches.get_flag("no-ballpark"),
    };
    ServerConfig {
        transform,
        ..ServerConfig::default()
    }
}

fn main() {
    let matches = cli().get_matches();

    // stdout carries the protocol
    let level = if matches.get_flag("verbose") { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();

    let mut server = McpServer::new(server_config(&matches));
    let mut transport = StdioTransport::stdio();
    if let Err(e) = server.run(&mut transport) {
        error!("server stopped: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
