//! Headless runner for a self-playing table.
//!
//! Seats AI players, starts autoplay and prints one JSON line for every
//! finished hand until a single player holds every chip.

mod config;

use std::{sync::Arc, time::Duration};

use anyhow::{Error, bail};
use autoholdem::{
    TableActor, TableEngine,
    entities::{Payout, Phase, PlayerId, TableSnapshot, Usd},
    table::ChannelObserver,
};
use ctrlc::set_handler;
use log::{info, warn};
use pico_args::Arguments;
use serde::Serialize;

use config::{Overrides, RunnerConfig};

const HELP: &str = "\
Run a self-playing Texas Hold'em table

USAGE:
  ah_table [OPTIONS]

OPTIONS:
  --players    N           Number of AI seats (2-6)      [default: env AH_PLAYERS or 6]
  --chips      N           Starting stack per seat       [default: env AH_CHIPS or 1000]
  --seed       N           Seed for shuffles and AI      [default: env AH_SEED or random]
  --hands      N           Stop after N hands            [default: env AH_MAX_HANDS or until one player is left]
  --speed      SPEED       normal, turbo or hyper        [default: env AH_SPEED or normal]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  AH_SMALL_BLIND           Small blind [default: 10]
  AH_BIG_BLIND             Big blind [default: 20]
  AH_TABLE_NAME            Table name used in logs
  AH_HUMAN_TIMEOUT_SECS    Seconds a human seat has to act
  RUST_LOG                 Log level (e.g., info, autoholdem=debug)
";

/// One line of output per finished hand
#[derive(Debug, Serialize)]
struct HandReport<'a> {
    hand: u64,
    pot: Usd,
    showdown: bool,
    board: Vec<String>,
    payouts: &'a [Payout],
    stacks: Vec<(&'a PlayerId, Usd)>,
}

impl<'a> HandReport<'a> {
    fn from_snapshot(snapshot: &'a TableSnapshot) -> Option<Self> {
        let outcome = snapshot.last_outcome.as_ref()?;
        Some(Self {
            hand: outcome.hand_number,
            pot: outcome.pot,
            showdown: outcome.showdown,
            board: snapshot
                .community_cards
                .iter()
                .map(ToString::to_string)
                .collect(),
            payouts: &outcome.payouts,
            stacks: snapshot.players.iter().map(|p| (&p.id, p.chips)).collect(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = Overrides {
        players: pargs.opt_value_from_str("--players")?,
        chips: pargs.opt_value_from_str("--chips")?,
        seed: pargs.opt_value_from_str("--seed")?,
        hands: pargs.opt_value_from_str("--hands")?,
        speed: pargs.opt_value_from_str("--speed")?,
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::builder().format_target(false).init();

    let config = RunnerConfig::from_env(overrides)?;
    config.validate()?;
    info!(
        "Starting '{}' with {} AI players, ${} each, blinds ${}/${}, {} speed",
        config.table.name,
        config.table.max_players,
        config.chips,
        config.table.small_blind,
        config.table.big_blind,
        config.speed
    );

    let (observer, mut snapshots) = ChannelObserver::channel(1024);
    let engine = TableEngine::new(config.table.clone()).with_observer(Arc::new(observer));
    let (actor, handle) = TableActor::new(engine, config.scheduler.clone());
    tokio::spawn(actor.run());

    let seated = handle.fill_with_ai_players(config.chips).await?;
    info!("Seated {seated} AI players");
    if !handle.start_auto().await? {
        bail!("table could not start autoplay");
    }

    let mut reported = 0;
    loop {
        tokio::select! {
            Some(snapshot) = snapshots.recv() => {
                if snapshot.phase != Phase::Finished || snapshot.hand_number <= reported {
                    continue;
                }
                let Some(report) = HandReport::from_snapshot(&snapshot) else {
                    continue;
                };
                println!("{}", serde_json::to_string(&report)?);
                reported = snapshot.hand_number;

                if snapshot.game_over {
                    break;
                }
                if config.max_hands.is_some_and(|max| reported >= max) {
                    info!("Played {reported} hands, stopping");
                    handle.stop_auto().await?;
                    break;
                }
            }
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                if !handle.is_auto_running().await? {
                    warn!("Autoplay stopped before the match ended");
                    break;
                }
            }
        }
    }

    let stats = handle.stats().await?;
    let snapshot = handle.snapshot(None).await?;
    match snapshot.players.iter().find(|p| p.chips == stats.total_chips) {
        Some(winner) if snapshot.game_over => {
            info!(
                "{} wins ${} after {} hands",
                winner.name, winner.chips, stats.hand_number
            );
        }
        _ => info!(
            "Stopped after {} hands with {} players still funded",
            stats.hand_number, stats.funded
        ),
    }

    handle.close().await?;
    Ok(())
}
