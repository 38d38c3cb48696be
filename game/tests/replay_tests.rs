use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use engine::HeadlessRunner;
use tetris::input::InputEvent;
use tetris::playtest::{Autoplayer, DEFAULT_FRAME, PlayFrame, ReplayLog};
use tetris::session::{SessionRules, SessionStatus};
use tetris::view::FrameView;

fn unique_temp_json_path() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("tetris_replay_test_{nanos}.json"))
}

/// Autoplays `frames` frames and returns the log plus every frame's fingerprint.
fn record_autoplay(seed: u64, frames: usize) -> (ReplayLog, Vec<String>) {
    let mut log = ReplayLog::new(seed, SessionRules::default());
    let mut runner = HeadlessRunner::new(log.logic());
    let mut player = Autoplayer::new();
    let mut prints = vec![fingerprint(runner.state())];

    for _ in 0..frames {
        let input = player.next_input(runner.state());
        let frame = PlayFrame {
            dt: DEFAULT_FRAME,
            input,
        };
        log.push(frame);
        runner.step(frame);
        prints.push(fingerprint(runner.state()));
    }
    (log, prints)
}

fn fingerprint(session: &tetris::session::GameSession) -> String {
    FrameView::capture(session)
        .fingerprint()
        .expect("fingerprint frame")
}

#[test]
fn replaying_a_log_reproduces_every_frame() {
    let (log, prints) = record_autoplay(7, 3_000);
    let runner = log.replay(prints.len());

    assert_eq!(runner.frame(), 3_000);
    let replayed: Vec<String> = runner.history().iter().map(fingerprint).collect();
    assert_eq!(replayed, prints);
    assert!(runner.state().pieces_locked() > 20);
}

#[test]
fn rewinding_a_replay_lands_on_the_recorded_frame() {
    let (log, prints) = record_autoplay(11, 600);
    let mut runner = log.replay(1_000);

    assert_eq!(runner.rewind(250), 350);
    assert_eq!(fingerprint(runner.state()), prints[350]);
    assert_eq!(runner.forward(50), 400);
    assert_eq!(fingerprint(runner.state()), prints[400]);
}

#[test]
fn stepping_after_rewind_branches_history() {
    let (log, _) = record_autoplay(5, 100);
    let mut runner = log.replay(200);
    runner.rewind(40);
    runner.step(PlayFrame::with_input(DEFAULT_FRAME, InputEvent::Pause));

    assert_eq!(runner.frame(), 61);
    assert_eq!(runner.history().len(), 62);
    assert_eq!(runner.state().status(), SessionStatus::Paused);
    assert!(!runner.timemachine().can_forward());
}

#[test]
fn saved_log_replays_identically_after_reload() {
    let (log, prints) = record_autoplay(99, 1_200);
    let out = unique_temp_json_path();
    log.save_json_file(&out).expect("save replay json");

    let loaded = ReplayLog::load_json_file(&out).expect("load replay json");
    assert_eq!(loaded, log);
    let runner = loaded.replay(10);
    assert_eq!(fingerprint(runner.state()), prints[prints.len() - 1]);

    let _ = fs::remove_file(out);
}

#[test]
fn frame_log_is_compact_json() {
    let mut log = ReplayLog::new(1, SessionRules::default());
    log.push(PlayFrame::idle(DEFAULT_FRAME));
    log.push(PlayFrame::with_input(DEFAULT_FRAME, InputEvent::HardDrop));

    let value = serde_json::to_value(&log).expect("serialize log");
    assert_eq!(value["frames"][0], serde_json::json!({ "dt_ms": 16 }));
    assert_eq!(
        value["frames"][1],
        serde_json::json!({ "dt_ms": 16, "input": "hard_drop" })
    );
}

#[test]
fn different_seeds_diverge() {
    let (_, a) = record_autoplay(1, 300);
    let (_, b) = record_autoplay(2, 300);
    assert_ne!(a.last(), b.last());
}
