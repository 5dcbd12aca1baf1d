// FILE: crates/cli/src/commands.rs

use crate::app::{report_sync_error, App};
use crate::rater::WengLinRater;
use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use console::style;
use duelrank_config::{Config, ConfigManager};
use duelrank_core::{ItemId, RankedItem, SessionId};
use duelrank_store::DragEvent;
use duelrank_sync_engine::{PullOutcome, PushOutcome, RemoteStore, SyncEngine};
use std::time::Duration;

/// Runs the store-backed subcommands
pub async fn dispatch<R: RemoteStore>(app: &mut App<R>, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", sub)) => show(app, sub),
        Some(("rating", sub)) => rating(app, sub),
        Some(("battle", sub)) => battle(app, sub),
        Some(("move", sub)) => move_item(app, sub),
        Some(("drop", sub)) => drop_on(app, sub),
        Some(("clear", sub)) => clear(app, sub),
        Some(("pending", sub)) => pending(app, sub),
        Some(("refine", sub)) => refine(app, sub),
        Some(("session", sub)) => session(app, sub).await,
        Some(("login", sub)) => login(app, sub).await,
        Some(("logout", _)) => logout(app),
        Some(("sync", sub)) => sync(app, sub).await,
        _ => bail!("Unknown command"),
    }
}

fn item_arg(matches: &ArgMatches, name: &str) -> Result<ItemId> {
    matches
        .get_one::<String>(name)
        .map(|s| ItemId::new(s.as_str()))
        .ok_or_else(|| anyhow!("{} is required", name))
}

/// List the ranking
pub fn show<R: RemoteStore>(app: &App<R>, matches: &ArgMatches) -> Result<()> {
    let items = app.view.items();
    if items.is_empty() {
        println!("No ratings yet. Use 'battle' or 'move' to rank items.");
        return Ok(());
    }

    let limit = matches
        .get_one::<usize>("limit")
        .copied()
        .unwrap_or(items.len());

    println!(
        "\n{} Ranked Items ({} battles)",
        style(items.len()).bold().cyan(),
        app.store().total_battles()
    );
    println!("{}", "=".repeat(72));
    for (rank, item) in items.iter().take(limit).enumerate() {
        print_ranked(rank, item);
    }
    Ok(())
}

/// Show one item's rating
pub fn rating<R: RemoteStore>(app: &App<R>, matches: &ArgMatches) -> Result<()> {
    let item = item_arg(matches, "item")?;
    let rating = app.store().get_rating(&item);

    println!("{}", style(&item).bold());
    match app.view.position_of(&item) {
        Some(rank) => println!("  Rank: #{}", rank + 1),
        None => println!("  {}", style("Unrated (showing the prior)").dim()),
    }
    println!("  Score: {:.4}", rating.conservative_score());
    println!("  mu: {:.4}  sigma: {:.4}", rating.mu, rating.sigma);
    println!("  Battles: {}", rating.battle_count);
    Ok(())
}

/// Record a battle result
pub fn battle<R: RemoteStore>(app: &App<R>, matches: &ArgMatches) -> Result<()> {
    let winner = item_arg(matches, "winner")?;
    let loser = item_arg(matches, "loser")?;

    let outcome = app
        .store()
        .record_battle(&winner, &loser, &WengLinRater::default())
        .context("Failed to record battle")?;

    println!("{} {} beat {}", style("✓").green().bold(), winner, loser);
    println!(
        "  {}: {:.4} ({} battles)",
        winner,
        outcome.winner.conservative_score(),
        outcome.winner.battle_count
    );
    println!(
        "  {}: {:.4} ({} battles)",
        loser,
        outcome.loser.conservative_score(),
        outcome.loser.battle_count
    );
    Ok(())
}

/// Move an item to a position
pub fn move_item<R: RemoteStore>(app: &App<R>, matches: &ArgMatches) -> Result<()> {
    let item = item_arg(matches, "item")?;
    let index = *matches
        .get_one::<usize>("index")
        .ok_or_else(|| anyhow!("index is required"))?;

    // The adjuster treats an out-of-range index as a bug, so check it here
    let others = app.view.items().iter().filter(|i| i.id != item).count();
    if index > others {
        bail!("Index {} is out of range (0..={})", index, others);
    }

    let plan = app.view.move_item(&item, index);
    if plan.is_empty() {
        println!("{} is already at position {}", item, index);
    } else {
        println!(
            "{} Moved {} to position {} ({} neighbor(s) adjusted)",
            style("✓").green().bold(),
            item,
            index,
            plan.tie_break_count()
        );
    }
    Ok(())
}

/// Drag an item onto another one
pub fn drop_on<R: RemoteStore>(app: &mut App<R>, matches: &ArgMatches) -> Result<()> {
    let item = item_arg(matches, "item")?;
    let over = item_arg(matches, "over")?;
    if item != over && app.view.position_of(&over).is_none() {
        bail!("{} is not ranked", over);
    }

    app.view.handle_drag(DragEvent::Started { item: item.clone() });
    match app.view.handle_drag(DragEvent::Dropped {
        item: item.clone(),
        over: Some(over.clone()),
    }) {
        Some(plan) if !plan.is_empty() => println!(
            "{} Dropped {} on {}",
            style("✓").green().bold(),
            item,
            over
        ),
        _ => println!("Nothing to do"),
    }
    Ok(())
}

/// Remove every rating
pub fn clear<R: RemoteStore>(app: &App<R>, matches: &ArgMatches) -> Result<()> {
    let count = app.store().len();
    if !matches.get_flag("force") {
        bail!(
            "Refusing to clear {} rating(s) without --force",
            count
        );
    }

    app.store().clear_all();
    println!("{} Cleared {} rating(s)", style("✓").green().bold(), count);
    Ok(())
}

pub fn pending<R: RemoteStore>(app: &App<R>, matches: &ArgMatches) -> Result<()> {
    let store = app.store();
    match matches.subcommand() {
        Some(("add", sub)) => {
            let item = item_arg(sub, "item")?;
            if store.add_pending_battle(&item) {
                println!("{} {} is awaiting a battle", style("✓").green().bold(), item);
            } else {
                println!("{} was already pending", item);
            }
        }
        Some(("remove", sub)) => {
            let item = item_arg(sub, "item")?;
            if store.remove_pending_battle(&item) {
                println!("{} Removed {}", style("✓").green().bold(), item);
            } else {
                println!("{} was not pending", item);
            }
        }
        _ => {
            let pending = store.pending_battles();
            if pending.is_empty() {
                println!("No pending battles");
            }
            for item in pending.iter() {
                println!("  {}", item);
            }
        }
    }
    Ok(())
}

pub fn refine<R: RemoteStore>(app: &App<R>, matches: &ArgMatches) -> Result<()> {
    let store = app.store();
    match matches.subcommand() {
        Some(("queue", sub)) => {
            let primary = item_arg(sub, "primary")?;
            let opponents: Vec<ItemId> = sub
                .get_many::<String>("opponents")
                .ok_or_else(|| anyhow!("at least one opponent is required"))?
                .map(|s| ItemId::new(s.as_str()))
                .collect();
            let priority = sub.get_one::<i64>("priority").copied().unwrap_or(0);

            let len = store.queue_refinement_battles(&primary, &opponents, priority);
            println!(
                "{} Queued {} battle(s), {} in queue",
                style("✓").green().bold(),
                opponents.len(),
                len
            );
        }
        Some(("next", _)) => match store.peek_next_refinement_battle() {
            Some(b) => println!(
                "Next: {} vs {} (priority {})",
                b.primary_item_id, b.opponent_item_id, b.priority
            ),
            None => println!("Refinement queue is empty"),
        },
        Some(("pop", _)) => match store.pop_refinement_battle() {
            Some(b) => println!(
                "{} vs {} (priority {})",
                b.primary_item_id, b.opponent_item_id, b.priority
            ),
            None => println!("Refinement queue is empty"),
        },
        _ => {
            let queue = store.refinement_queue();
            if queue.is_empty() {
                println!("Refinement queue is empty");
            }
            for b in queue.iter() {
                println!(
                    "  [{}] {} vs {}",
                    b.priority, b.primary_item_id, b.opponent_item_id
                );
            }
        }
    }
    Ok(())
}

fn parse_session(matches: &ArgMatches) -> Result<Option<SessionId>> {
    matches
        .get_one::<String>("session")
        .map(|s| SessionId::from_string(s).context("Invalid session ID format"))
        .transpose()
}

/// Show or switch the session
pub async fn session<R: RemoteStore>(app: &App<R>, matches: &ArgMatches) -> Result<()> {
    if let Some(id) = parse_session(matches)? {
        if id != app.store().session_id() {
            app.store().set_session_id(id);
            println!("{} Switched to session {}", style("✓").green().bold(), id);
            app.rehydrate().await;
        }
    }

    let session = app.store().session();
    println!("Session: {}", session.session_id);
    if let Some(identity) = &session.identity {
        println!("Signed in as: {}", identity);
    }
    println!(
        "Reconciled: {}",
        if session.reconciled { "yes" } else { "no" }
    );
    println!("Ratings: {}", app.store().len());
    println!("Total battles: {}", session.total_battles);
    Ok(())
}

pub async fn login<R: RemoteStore>(app: &App<R>, matches: &ArgMatches) -> Result<()> {
    let identity = matches
        .get_one::<String>("identity")
        .ok_or_else(|| anyhow!("identity is required"))?;
    let session = parse_session(matches)?.ok_or_else(|| anyhow!("session is required"))?;

    if app.store().attach_identity(identity, session) {
        println!(
            "{} Signed in as {}, local rankings replaced by the account's",
            style("✓").green().bold(),
            identity
        );
        app.rehydrate().await;
    } else {
        println!("Already signed in as {}", identity);
    }
    Ok(())
}

pub fn logout<R: RemoteStore>(app: &App<R>) -> Result<()> {
    match app.store().detach_identity() {
        Some(identity) => println!("{} Signed out {}", style("✓").green().bold(), identity),
        None => println!("Not signed in"),
    }
    Ok(())
}

fn require_engine<R: RemoteStore>(app: &App<R>) -> Result<&SyncEngine<R>> {
    app.engine()
        .ok_or_else(|| anyhow!("Remote sync is disabled (set remote.enabled = true)"))
}

pub async fn sync<R: RemoteStore>(app: &mut App<R>, matches: &ArgMatches) -> Result<()> {
    if let Some(("watch", sub)) = matches.subcommand() {
        return watch(app, sub).await;
    }

    let engine = require_engine(app)?;
    match matches.subcommand() {
        Some(("push", _)) => match engine.sync_to_cloud().await {
            Ok(PushOutcome::Pushed { items }) => {
                println!("{} Pushed {} rating(s)", style("✓").green().bold(), items)
            }
            Ok(PushOutcome::Skipped(reason)) => println!("Push skipped: {}", reason),
            Err(e) => report_sync_error(e),
        },
        Some(("pull", _)) => match engine.load_from_cloud().await {
            Ok(PullOutcome::Merged(stats)) => println!(
                "{} Merged: {} updated, {} added, {} kept",
                style("✓").green().bold(),
                stats.took_remote,
                stats.added_remote,
                stats.kept_local
            ),
            Ok(PullOutcome::NoRemoteData) => println!("No remote data, local rankings kept"),
            Ok(PullOutcome::Discarded) => println!("Session changed during pull, result dropped"),
            Ok(PullOutcome::Skipped(reason)) => println!("Pull skipped: {}", reason),
            Err(e) => report_sync_error(e),
        },
        _ => {
            let status = engine.status();
            println!(
                "{}",
                serde_json::to_string_pretty(&status).context("Failed to format status")?
            );
        }
    }
    Ok(())
}

/// Background sync until interrupted
async fn watch<R: RemoteStore>(app: &mut App<R>, matches: &ArgMatches) -> Result<()> {
    require_engine(app)?;
    let interval = matches
        .get_one::<u64>("interval")
        .map(|secs| Duration::from_secs(*secs))
        .or_else(|| app.reconcile_interval())
        .ok_or_else(|| {
            anyhow!("No reconcile interval (pass --interval or set remote.reconcile_interval_secs)")
        })?;
    if interval.is_zero() {
        bail!("Interval must be at least one second");
    }

    println!(
        "Syncing every {}s, press Ctrl-C to stop",
        interval.as_secs()
    );
    app.watch(interval).await
}

/// Config subcommands; they never open the state file
pub fn config(manager: &ConfigManager, config: &Config, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("init", _)) => {
            if manager
                .initialize()
                .context("Failed to write default config")?
            {
                println!(
                    "{} Wrote {}",
                    style("✓").green().bold(),
                    manager.config_path().display()
                );
            } else {
                println!(
                    "Config already exists at {}",
                    manager.config_path().display()
                );
            }
        }
        Some(("validate", _)) => {
            let problems = manager.validate().context("Failed to read config")?;
            if problems.is_empty() {
                println!("{} Configuration is valid", style("✓").green().bold());
            } else {
                for problem in &problems {
                    println!("  {} {}", style("✗").red(), problem);
                }
                bail!("{} configuration problem(s)", problems.len());
            }
        }
        _ => {
            println!("# {}", manager.config_path().display());
            print!(
                "{}",
                toml::to_string_pretty(config).context("Failed to format config")?
            );
        }
    }
    Ok(())
}

fn print_ranked(rank: usize, item: &RankedItem) {
    println!(
        "{:>4}. {:<32} {:>10.4}  (mu {:.3}, sigma {:.3}, {} battles)",
        rank + 1,
        truncate(item.id.as_str(), 32),
        item.score(),
        item.rating.mu,
        item.rating.sigma,
        item.rating.battle_count
    );
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
