// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use duelrank_config::ConfigManager;
use duelrank_sync_engine::HttpRemote;
use std::path::PathBuf;

mod app;
mod commands;
mod rater;

use app::App;

fn item(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .required(true)
        .value_name("ITEM")
        .help(help)
}

fn build_cli() -> Command {
    Command::new("duelrank")
        .version(env!("CARGO_PKG_VERSION"))
        .author("DrTomLLC")
        .about("Rank items by pairwise battles and manual reordering")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("DIR")
                .help("Configuration directory")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("state")
                .short('s')
                .long("state")
                .value_name("FILE")
                .help("Path to the local rankings file")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("show")
                .about("List items ranked by conservative score")
                .arg(
                    Arg::new("limit")
                        .short('n')
                        .long("limit")
                        .value_name("N")
                        .help("Show only the top N items")
                        .value_parser(value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("rating")
                .about("Show one item's rating")
                .arg(item("item", "Item to look up")),
        )
        .subcommand(
            Command::new("battle")
                .about("Record that one item beat another")
                .arg(item("winner", "Winning item"))
                .arg(item("loser", "Losing item")),
        )
        .subcommand(
            Command::new("move")
                .about("Move an item to a position in the ranking")
                .arg(item("item", "Item to move"))
                .arg(
                    Arg::new("index")
                        .required(true)
                        .value_name("INDEX")
                        .help("Zero-based target position among the other items")
                        .value_parser(value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("drop")
                .about("Drag an item onto another item's row")
                .arg(item("item", "Item being dragged"))
                .arg(item("over", "Item it is released on")),
        )
        .subcommand(
            Command::new("clear")
                .about("Remove every rating")
                .arg(
                    Arg::new("force")
                        .short('f')
                        .long("force")
                        .help("Skip confirmation")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("pending")
                .about("Items awaiting a battle")
                .subcommand(Command::new("add").arg(item("item", "Item to add")))
                .subcommand(Command::new("remove").arg(item("item", "Item to remove")))
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("refine")
                .about("Queued refinement battles")
                .subcommand(
                    Command::new("queue")
                        .about("Queue battles of PRIMARY against each OPPONENT")
                        .arg(item("primary", "Item being refined"))
                        .arg(
                            Arg::new("opponents")
                                .required(true)
                                .num_args(1..)
                                .value_name("OPPONENT")
                                .help("Opponents, in order"),
                        )
                        .arg(
                            Arg::new("priority")
                                .short('p')
                                .long("priority")
                                .value_name("P")
                                .help("Lower runs first")
                                .allow_negative_numbers(true)
                                .value_parser(value_parser!(i64)),
                        ),
                )
                .subcommand(Command::new("next").about("Show the next battle"))
                .subcommand(Command::new("pop").about("Take the next battle off the queue"))
                .subcommand(Command::new("list").about("Show the whole queue")),
        )
        .subcommand(
            Command::new("session")
                .about("Show the session, or switch to another one")
                .arg(
                    Arg::new("session")
                        .value_name("UUID")
                        .help("Session to switch to; local rankings are wiped"),
                ),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in and adopt the account's session")
                .arg(
                    Arg::new("identity")
                        .required(true)
                        .value_name("IDENTITY"),
                )
                .arg(
                    Arg::new("session")
                        .required(true)
                        .value_name("UUID"),
                ),
        )
        .subcommand(Command::new("logout").about("Sign out, keeping local rankings"))
        .subcommand(
            Command::new("sync")
                .about("Remote synchronization")
                .subcommand(Command::new("push").about("Push local rankings"))
                .subcommand(Command::new("pull").about("Pull and merge remote rankings"))
                .subcommand(Command::new("status").about("Show sync statistics"))
                .subcommand(
                    Command::new("watch")
                        .about("Keep syncing in the background until Ctrl-C")
                        .arg(
                            Arg::new("interval")
                                .short('i')
                                .long("interval")
                                .value_name("SECS")
                                .help("Reconciliation period")
                                .value_parser(value_parser!(u64)),
                        ),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Manage configuration")
                .subcommand(Command::new("init").about("Write the default config file"))
                .subcommand(Command::new("show").about("Print the effective config"))
                .subcommand(Command::new("validate").about("Check the config file")),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let manager = match matches.get_one::<PathBuf>("config") {
        Some(dir) => ConfigManager::with_directory(dir.clone()),
        None => ConfigManager::new(),
    }
    .context("Failed to locate configuration directory")?;
    let config = manager
        .load_with_env_overrides()
        .context("Failed to load configuration")?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.app.log_level.as_filter()),
    )
    .init();

    let Some((name, sub)) = matches.subcommand() else {
        build_cli().print_help()?;
        return Ok(());
    };
    if name == "config" {
        return commands::config(&manager, &config, sub);
    }

    let state_path = matches
        .get_one::<PathBuf>("state")
        .cloned()
        .unwrap_or_else(|| manager.state_path(&config));
    log::debug!("Using state file {}", state_path.display());

    let mut app = App::<HttpRemote>::open(&state_path, &config)?;
    app.start().await;
    let result = commands::dispatch(&mut app, &matches).await;
    app.finish().await;
    result
}
