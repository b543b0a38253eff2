use std::fs;

use anyhow::Context;
use clap::{arg, Command};

mod chess_oracle;
mod memory_store;
mod network;
mod server_config;
mod server_main;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .target(env_logger::Target::Stdout)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    let matches = Command::new("arena-chess")
        .about("Multiplayer chess server")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("server")
                .about("Run the game server")
                .arg(arg!(<config_file> "Server config file (YAML)")),
        )
        .get_matches();
    match matches.subcommand() {
        Some(("server", sub_matches)) => {
            let config_file: &String = sub_matches.get_one("config_file").unwrap();
            let config = fs::read_to_string(config_file)
                .with_context(|| format!("Cannot read config file {config_file}"))?;
            let config: server_config::ServerConfig = serde_yaml::from_str(&config)
                .with_context(|| format!("Cannot parse config file {config_file}"))?;
            server_main::run(config)
        }
        _ => unreachable!("Unknown subcommand"),
    }
}
