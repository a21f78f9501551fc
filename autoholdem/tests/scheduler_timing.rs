//! Timer-driven play through the table actor.
//!
//! These tests run on a paused Tokio clock: sleeping in the test advances
//! time instantly, firing every timer due before the wake-up in order. Times
//! in comments are measured from the first `start_auto` and use the default
//! delays (think 2s, human action 1s, human timeout 30s, phase 1.5s,
//! showdown 3s, next hand 5s).

use autoholdem::{
    SchedulerConfig, TableActor, TableConfig, TableEngine, TableHandle,
    entities::{Action, Phase, PlayerId, TableSnapshot, Usd},
    table::{ChannelObserver, TableSpeed},
};
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;

fn id(s: &str) -> PlayerId {
    PlayerId::from(s)
}

fn spawn(engine: TableEngine, config: SchedulerConfig) -> TableHandle {
    let (actor, handle) = TableActor::new(engine, config);
    tokio::spawn(actor.run());
    handle
}

fn seeded(max_players: usize) -> TableEngine {
    TableEngine::new(TableConfig {
        max_players,
        seed: Some(11),
        ..TableConfig::default()
    })
}

async fn heads_up_humans() -> TableHandle {
    let handle = spawn(seeded(6), SchedulerConfig::default());
    handle.add_player("alice", "Alice", 1000).await.unwrap();
    handle.add_player("bob", "Bob", 1000).await.unwrap();
    handle
}

fn actions_by(snapshot: &TableSnapshot, player: &str) -> Vec<Action> {
    snapshot
        .actions
        .iter()
        .filter(|record| record.player_id.as_str() == player)
        .map(|record| record.action)
        .collect()
}

fn chips(snapshot: &TableSnapshot, player: &str) -> Usd {
    snapshot.player(&id(player)).unwrap().chips
}

#[tokio::test(start_paused = true)]
async fn test_human_action_beats_pending_timeout() {
    let handle = heads_up_humans().await;
    assert!(handle.start_auto().await.unwrap());

    // Alice deals and posts the small blind, so she acts first. Her timeout
    // is armed at 2s and would fire at 32s.
    let snapshot = handle.snapshot(None).await.unwrap();
    assert_eq!(snapshot.current_player, Some(id("alice")));

    sleep(Duration::from_secs(5)).await;
    handle.submit_action("alice", Action::Call).await.unwrap();

    // Past alice's original deadline; bob's runs until 36s.
    sleep(Duration::from_secs(28)).await;
    let snapshot = handle.snapshot(None).await.unwrap();
    assert_eq!(actions_by(&snapshot, "alice"), [Action::Call]);
    assert!(!snapshot.player(&id("alice")).unwrap().folded);
    assert_eq!(snapshot.current_player, Some(id("bob")));
    assert_eq!(snapshot.phase, Phase::PreFlop);

    // Bob is folded at 36s and the pot is paid at 37.5s.
    sleep(Duration::from_secs(7)).await;
    let snapshot = handle.snapshot(None).await.unwrap();
    assert_eq!(snapshot.phase, Phase::Finished);
    assert_eq!(actions_by(&snapshot, "alice"), [Action::Call]);
    assert_eq!(actions_by(&snapshot, "bob"), [Action::Fold]);
    assert_eq!(chips(&snapshot, "alice"), 1020);
    assert_eq!(chips(&snapshot, "bob"), 980);

    // The next hand is dealt at 44.5s with the button moved to bob.
    sleep(Duration::from_secs(5)).await;
    let snapshot = handle.snapshot(None).await.unwrap();
    assert_eq!(snapshot.hand_number, 2);
    assert_eq!(snapshot.dealer_index, Some(1));
    handle.stop_auto().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_idle_human_is_folded_on_timeout() {
    let handle = heads_up_humans().await;
    assert!(handle.start_auto().await.unwrap());

    sleep(Duration::from_secs(31)).await;
    let snapshot = handle.snapshot(None).await.unwrap();
    assert!(!snapshot.player(&id("alice")).unwrap().folded);
    assert_eq!(snapshot.current_player, Some(id("alice")));

    // Folded at 32s, paid at 33.5s.
    sleep(Duration::from_secs(4)).await;
    let snapshot = handle.snapshot(None).await.unwrap();
    assert_eq!(snapshot.phase, Phase::Finished);
    assert_eq!(actions_by(&snapshot, "alice"), [Action::Fold]);
    assert_eq!(chips(&snapshot, "alice"), 990);
    assert_eq!(chips(&snapshot, "bob"), 1010);
    let outcome = snapshot.last_outcome.unwrap();
    assert!(!outcome.showdown);
    assert_eq!(outcome.payouts[0].player_id, id("bob"));
    assert_eq!(outcome.payouts[0].amount, 30);
}

#[tokio::test(start_paused = true)]
async fn test_manual_play_still_advances_phases() {
    let handle = heads_up_humans().await;
    handle.start_hand().await.unwrap();
    handle.submit_action("alice", Action::Call).await.unwrap();
    handle.submit_action("bob", Action::Check).await.unwrap();

    let snapshot = handle.snapshot(None).await.unwrap();
    assert_eq!(snapshot.phase, Phase::PreFlop);
    assert_eq!(snapshot.current_player, None);

    sleep(Duration::from_secs(2)).await;
    let snapshot = handle.snapshot(None).await.unwrap();
    assert_eq!(snapshot.phase, Phase::Flop);
    assert_eq!(snapshot.community_cards.len(), 3);
    assert_eq!(snapshot.current_player, Some(id("bob")));

    // Without autoplay nobody is timed out.
    sleep(Duration::from_secs(120)).await;
    let later = handle.snapshot(None).await.unwrap();
    assert_eq!(later, snapshot);
    assert!(!handle.is_auto_running().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_actions_out_of_turn_are_rejected_through_handle() {
    let handle = heads_up_humans().await;
    handle.start_hand().await.unwrap();

    assert!(handle.submit_action("bob", Action::Check).await.is_err());
    let seen_by_bob = handle.snapshot(Some(id("bob"))).await.unwrap();
    assert_eq!(seen_by_bob.player(&id("bob")).unwrap().hole_cards.len(), 2);
    assert!(
        seen_by_bob
            .player(&id("alice"))
            .unwrap()
            .hole_cards
            .is_empty()
    );
    assert!(seen_by_bob.actions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_ai_table_plays_until_one_player_is_left() {
    let (observer, mut snapshots) = ChannelObserver::channel(100_000);
    let engine = seeded(3).with_observer(Arc::new(observer));
    let handle = spawn(engine, SchedulerConfig::for_speed(TableSpeed::Hyper));

    assert_eq!(handle.fill_with_ai_players(200).await.unwrap(), 3);
    while snapshots.try_recv().is_ok() {}
    assert!(handle.start_auto().await.unwrap());

    let mut finished = false;
    for _ in 0..5_000 {
        sleep(Duration::from_secs(30)).await;
        while let Ok(snapshot) = snapshots.try_recv() {
            assert_eq!(snapshot.total_chips(), 600);
        }
        if !handle.is_auto_running().await.unwrap() {
            finished = true;
            break;
        }
    }
    assert!(finished, "autoplay never reached game over");

    let snapshot = handle.snapshot(None).await.unwrap();
    assert!(snapshot.game_over);
    assert_eq!(snapshot.phase, Phase::Finished);
    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.funded, 1);
    assert_eq!(stats.total_chips, 600);
    assert_eq!(stats.ai_players, 3);

    // A finished match can't be restarted.
    assert!(!handle.start_auto().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_stop_auto_freezes_the_table() {
    let handle = spawn(seeded(4), SchedulerConfig::for_speed(TableSpeed::Hyper));
    handle.fill_with_ai_players(1000).await.unwrap();
    assert!(handle.start_auto().await.unwrap());

    sleep(Duration::from_millis(7_300)).await;
    handle.stop_auto().await.unwrap();
    assert!(!handle.is_auto_running().await.unwrap());
    let stopped = handle.snapshot(None).await.unwrap();
    assert!(stopped.hand_number >= 1);

    sleep(Duration::from_secs(120)).await;
    assert_eq!(handle.snapshot(None).await.unwrap(), stopped);

    if !stopped.game_over {
        assert!(handle.start_auto().await.unwrap());
        sleep(Duration::from_secs(30)).await;
        let resumed = handle.snapshot(None).await.unwrap();
        assert_ne!(resumed, stopped);
        assert_eq!(resumed.total_chips(), 4000);
    }
}

#[tokio::test(start_paused = true)]
async fn test_leaving_player_is_not_timed_out() {
    let handle = spawn(seeded(6), SchedulerConfig::default());
    for name in ["alice", "bob", "carol"] {
        handle.add_player(name, name, 1000).await.unwrap();
    }
    assert!(handle.start_auto().await.unwrap());

    // alice deals; bob and carol post blinds; alice acts first.
    sleep(Duration::from_secs(3)).await;
    handle.remove_player("alice").await.unwrap();

    let snapshot = handle.snapshot(None).await.unwrap();
    assert!(snapshot.player(&id("alice")).unwrap().folded);
    assert_eq!(snapshot.current_player, Some(id("bob")));

    // bob's timeout (armed at 5s) folds him at 35s; carol takes the blinds.
    sleep(Duration::from_secs(36)).await;
    let snapshot = handle.snapshot(None).await.unwrap();
    assert_eq!(snapshot.phase, Phase::Finished);
    assert_eq!(actions_by(&snapshot, "alice"), [Action::Fold]);
    assert!(snapshot.player(&id("alice")).is_none());
    assert_eq!(chips(&snapshot, "carol"), 1010);
    assert_eq!(chips(&snapshot, "bob"), 990);
}

#[tokio::test(start_paused = true)]
async fn test_other_player_leaving_keeps_the_deadline() {
    let handle = spawn(seeded(6), SchedulerConfig::default());
    for name in ["alice", "bob", "carol"] {
        handle.add_player(name, name, 1000).await.unwrap();
    }
    assert!(handle.start_auto().await.unwrap());

    // alice is on the clock from 2s until 32s; carol leaves in between.
    sleep(Duration::from_secs(20)).await;
    handle.remove_player("carol").await.unwrap();
    let snapshot = handle.snapshot(None).await.unwrap();
    assert_eq!(snapshot.current_player, Some(id("alice")));

    sleep(Duration::from_secs(11)).await;
    let snapshot = handle.snapshot(None).await.unwrap();
    assert!(actions_by(&snapshot, "alice").is_empty());

    // Folded at 32s, not 52s; bob takes the blinds at 33.5s.
    sleep(Duration::from_secs(3)).await;
    let snapshot = handle.snapshot(None).await.unwrap();
    assert_eq!(snapshot.phase, Phase::Finished);
    assert_eq!(actions_by(&snapshot, "alice"), [Action::Fold]);
    assert_eq!(chips(&snapshot, "bob"), 1020);
    assert_eq!(chips(&snapshot, "alice"), 1000);
    assert!(snapshot.player(&id("carol")).is_none());
}
