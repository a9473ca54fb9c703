//! Operator console - drives a draw session from a terminal.
//!
//! Usage:
//!   cargo run --release --bin event-console -- --url http://localhost:8080
//!
//! Options:
//!   -u, --url              Backend URL (default: http://localhost:8080)
//!   -r, --row-width        Cards per grid row (default: 17)
//!   -c, --draw-cap         Most winners per round (default: 10)
//!   -t, --time-limit-secs  Force a stop this long after the spin starts
//!
//! Commands: arm, start, stop, continue, quit, select <id>, prizes, winners,
//! status, reset, help, exit.

use anyhow::{Context, Result};
use clap::Parser;
use stagedraw_client::HttpStore;
use stagedraw_engine::{
    geometry::{CardSize, WindowSize},
    Continuation, Cue, DrawEngine, EngineConfig, Presenter, SystemClock, Transition,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, Duration};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Prize draw operator console")]
struct Args {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, default_value = "17")]
    row_width: usize,

    #[arg(short = 'c', long, default_value = "10")]
    draw_cap: usize,

    #[arg(short, long)]
    time_limit_secs: Option<u64>,

    #[arg(long, default_value = "140.0")]
    card_width: f64,

    #[arg(long, default_value = "180.0")]
    card_height: f64,

    #[arg(long, default_value = "1920.0")]
    window_width: f64,

    #[arg(long, default_value = "1080.0")]
    window_height: f64,
}

/// Presenter that narrates cues to the log instead of a stage.
struct LogPresenter;

impl Presenter for LogPresenter {
    async fn animate(&mut self, cue: Cue<'_>) {
        match cue {
            Cue::Grid { slots } => info!(cards = slots.len(), "cards seated in the grid"),
            Cue::Sphere { targets } => info!(cards = targets.len(), "cards on the sphere"),
            Cue::Spin { turns, duration_ms } => info!(turns, duration_ms, "sphere spinning"),
            Cue::Reveal { placements } => info!(winners = placements.len(), "winners revealed"),
        }
    }
}

type ConsoleEngine = DrawEngine<HttpStore, LogPresenter, SystemClock>;

fn print_status(engine: &ConsoleEngine) {
    let snapshot = engine.snapshot();
    println!("phase: {}", engine.phase());
    match snapshot.current_prize() {
        Some(prize) => println!(
            "current prize: {} ({}/{} drawn, {} next round)",
            prize.name,
            prize.consumed,
            prize.quota,
            prize.effective_remaining()
        ),
        None => println!("current prize: none"),
    }
    println!("participants: {}", snapshot.participants.len());
}

fn print_prizes(engine: &ConsoleEngine) {
    for prize in &engine.snapshot().prizes {
        let state = if prize.is_open() { "open" } else { "done" };
        println!(
            "  [{}] {} ({}/{}, {})",
            prize.id, prize.name, prize.consumed, prize.quota, state
        );
    }
}

fn print_winners(engine: &ConsoleEngine) {
    let winners = engine.pending_winners();
    if winners.is_empty() {
        println!("no round in flight");
        return;
    }
    for winner in winners {
        println!("  {} ({}, {})", winner.name, winner.department, winner.badge);
    }
}

fn report(result: Result<Transition, impl std::fmt::Display>) {
    match result {
        Ok(Transition::Applied) => {}
        Ok(Transition::Ignored) => println!("ignored"),
        Err(error) => println!("rejected: {error}"),
    }
}

async fn handle_command(engine: &mut ConsoleEngine, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("arm") => report(engine.arm().await),
        Some("start") => report(engine.start().await),
        Some("stop") => report(engine.stop().await),
        Some("continue") => match engine.continue_draw().await {
            Ok(Continuation::Committed(outcome)) => {
                println!(
                    "committed {} winners for {}",
                    outcome.prize.consumed, outcome.prize.name
                );
                if outcome.all_finished {
                    println!("all prizes drawn");
                } else if let Some(next) = outcome.next_prize {
                    println!("advanced to prize {next}");
                }
            }
            Ok(Continuation::Ignored) => println!("ignored"),
            Err(error) => println!("rejected: {error}"),
        },
        Some("quit") => report(engine.quit().await),
        Some("select") => match parts.next().and_then(|id| id.parse::<u64>().ok()) {
            Some(id) => report(engine.select_prize(id).await),
            None => println!("usage: select <prize-id>"),
        },
        Some("reset") => report(engine.reset().await),
        Some("status") => print_status(engine),
        Some("prizes") => print_prizes(engine),
        Some("winners") => print_winners(engine),
        Some("help") => println!(
            "commands: arm start stop continue quit select <id> prizes winners status reset exit"
        ),
        Some("exit") => return false,
        Some(other) => println!("unknown command: {other}"),
        None => {}
    }
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let store = HttpStore::new(&args.url).context("Invalid backend URL")?;
    let config = EngineConfig {
        row_width: args.row_width,
        card_size: CardSize {
            width: args.card_width,
            height: args.card_height,
        },
        window_size: WindowSize {
            width: args.window_width,
            height: args.window_height,
        },
        definite_time_ms: args.time_limit_secs.map(|secs| secs * 1_000),
        draw_cap: args.draw_cap,
        ..EngineConfig::default()
    };

    let mut engine = DrawEngine::new(store, LogPresenter, SystemClock, config)
        .map_err(|reason| anyhow::anyhow!("invalid configuration: {reason}"))?;
    engine.load().await.context("Failed to load event data")?;
    print_status(&engine);
    println!("type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut deadline_poll = interval(Duration::from_millis(250));
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => {
                        if !handle_command(&mut engine, line.trim()).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = deadline_poll.tick() => {
                if let Err(error) = engine.tick().await {
                    warn!(%error, "forced stop failed");
                }
            }
        }
    }

    Ok(())
}
