//! Integration tests for the playback controller
//!
//! These tests drive the public controller API against the scripted engine:
//! - Load outcomes and history recording
//! - Stale event isolation across reloads
//! - Seek, pause and end-of-media interplay
//! - Transport debouncing and disposal

use anyhow::Result;
use mockall::mock;
use mockall::predicate::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use vplay::history::HistoryStore;
use vplay::player::{EngineEventKind, PlaybackStatus, TickPolicy, TransportState};
use vplay::utils::PlaybackConfig;
use vplay::{SourceLocator, VplayError};
use vplay_integration_tests::{EngineCommand, TestFixture};

mock! {
    pub History {}

    impl HistoryStore for History {
        fn save(&self, source: &SourceLocator) -> vplay::Result<()>;
        fn retrieve(&self) -> vplay::Result<Vec<SourceLocator>>;
    }
}

const SOURCE: &str = "https://cdn.example/clip.mp4";

fn continuous() -> PlaybackConfig {
    PlaybackConfig {
        tick_policy: TickPolicy::Continuous,
        ..PlaybackConfig::default()
    }
}

#[test]
fn test_ready_publishes_duration_and_records_history() -> Result<()> {
    let mut history = MockHistory::new();
    history
        .expect_save()
        .with(eq(SourceLocator::from(SOURCE)))
        .times(1)
        .returning(|_| Ok(()));

    let mut fixture = TestFixture::new(&PlaybackConfig::default())?;
    fixture.controller = fixture.controller.with_history(Arc::new(history));

    fixture.controller.load(SOURCE);
    fixture.driver.ready(125.0);
    fixture.pump(Instant::now());

    let snapshot = fixture.controller.snapshot();
    assert_eq!(snapshot.status, PlaybackStatus::ReadyToPlay);
    assert_eq!(snapshot.duration_text, "02:05");
    assert_eq!(snapshot.current_time_text, "--:--");
    assert_eq!(
        fixture.driver.commands(),
        vec![EngineCommand::Load(SOURCE.into()), EngineCommand::Play]
    );

    // A repeated readiness report is not a second transition
    fixture.driver.ready(125.0);
    fixture.pump(Instant::now());
    assert_eq!(fixture.driver.commands().len(), 2);

    Ok(())
}

#[test]
fn test_failed_load_never_touches_history() -> Result<()> {
    let mut history = MockHistory::new();
    history.expect_save().never();

    let mut fixture = TestFixture::new(&PlaybackConfig::default())?;
    fixture.controller = fixture.controller.with_history(Arc::new(history));

    fixture.controller.load("https://cdn.example/missing.mp4");
    fixture.driver.fail();
    fixture.pump(Instant::now());

    let snapshot = fixture.controller.snapshot();
    assert_eq!(snapshot.status, PlaybackStatus::Failed);
    assert_eq!(snapshot.duration_text, "--:--");
    assert!(!snapshot.is_playing);
    assert_eq!(
        fixture.driver.commands(),
        vec![EngineCommand::Load("https://cdn.example/missing.mp4".into())]
    );

    Ok(())
}

#[test]
fn test_history_error_does_not_affect_playback() -> Result<()> {
    let mut history = MockHistory::new();
    history
        .expect_save()
        .times(1)
        .returning(|_| Err(VplayError::History("disk full".to_string())));

    let mut fixture = TestFixture::new(&PlaybackConfig::default())?;
    fixture.controller = fixture.controller.with_history(Arc::new(history));

    fixture.controller.load(SOURCE);
    fixture.driver.ready(10.0);
    fixture.pump(Instant::now());

    assert_eq!(fixture.controller.snapshot().status, PlaybackStatus::ReadyToPlay);
    assert_eq!(fixture.driver.commands().last(), Some(&EngineCommand::Play));

    Ok(())
}

#[test]
fn test_retry_after_failure_reloads_same_source() -> Result<()> {
    let mut fixture = TestFixture::new(&PlaybackConfig::default())?;

    let first = fixture.controller.load(SOURCE);
    fixture.driver.fail();
    fixture.pump(Instant::now());
    assert_eq!(fixture.controller.snapshot().status, PlaybackStatus::Failed);

    let second = fixture.controller.retry().expect("a source was loaded");
    assert_ne!(first, second);
    assert_eq!(fixture.controller.snapshot().status, PlaybackStatus::Unknown);

    fixture.driver.ready(30.0);
    fixture.pump(Instant::now());
    assert_eq!(fixture.controller.snapshot().status, PlaybackStatus::ReadyToPlay);

    let loads = fixture
        .driver
        .commands()
        .into_iter()
        .filter(|c| *c == EngineCommand::Load(SOURCE.into()))
        .count();
    assert_eq!(loads, 2);

    Ok(())
}

#[test]
fn test_events_from_previous_load_are_ignored() -> Result<()> {
    let mut fixture = TestFixture::new(&continuous())?;
    let now = Instant::now();

    let old = fixture.controller.load("https://cdn.example/a.mp4");
    fixture.driver.ready(60.0);
    fixture.pump(now);

    fixture.controller.load("https://cdn.example/b.mp4");
    assert_eq!(fixture.controller.snapshot().status, PlaybackStatus::Unknown);

    // The old item keeps talking after the reload
    fixture.driver.emit_for(old, EngineEventKind::PeriodicTick(42.0));
    fixture
        .driver
        .emit_for(old, EngineEventKind::Transport(TransportState::Playing));
    fixture.driver.emit_for(old, EngineEventKind::ReachedEnd);
    fixture
        .driver
        .emit_for(old, EngineEventKind::Status(PlaybackStatus::Failed));
    fixture.pump(now);
    fixture.controller.poll_timers(now + Duration::from_secs(1));

    let snapshot = fixture.controller.snapshot();
    assert_eq!(snapshot.status, PlaybackStatus::Unknown);
    assert_ne!(snapshot.current_time_text, "00:42");
    assert!(!snapshot.is_playing);
    assert_eq!(fixture.controller.next_deadline(), None);

    Ok(())
}

#[test]
fn test_ticks_update_time_and_progress() -> Result<()> {
    let mut fixture = TestFixture::new(&continuous())?;
    let now = Instant::now();

    fixture.controller.load(SOURCE);
    fixture.driver.ready(200.0);
    fixture.driver.tick(50.0);
    fixture.pump(now);

    let snapshot = fixture.controller.snapshot();
    assert_eq!(snapshot.current_time_text, "00:50");
    assert!((snapshot.progress - 0.25).abs() < 1e-9);

    // Past the end still clamps to a full bar
    fixture.driver.tick(250.0);
    fixture.pump(now);
    assert_eq!(fixture.controller.snapshot().progress, 1.0);

    Ok(())
}

#[test]
fn test_while_playing_policy_drops_ticks_when_paused() -> Result<()> {
    let mut fixture = TestFixture::new(&PlaybackConfig {
        auto_play: false,
        ..PlaybackConfig::default()
    })?;
    let now = Instant::now();

    fixture.controller.load(SOURCE);
    fixture.driver.ready(100.0);
    fixture.driver.tick(5.0);
    fixture.pump(now);
    assert_eq!(fixture.controller.snapshot().current_time_text, "--:--");

    fixture.controller.play();
    fixture.driver.tick(6.0);
    fixture.pump(now);
    assert_eq!(fixture.controller.snapshot().current_time_text, "00:06");

    fixture.controller.pause();
    fixture.driver.tick(7.0);
    fixture.pump(now);
    assert_eq!(fixture.controller.snapshot().current_time_text, "00:06");

    Ok(())
}

#[test]
fn test_seek_pauses_then_resumes_once_settled() -> Result<()> {
    let mut fixture = TestFixture::new(&PlaybackConfig::default())?;
    let now = Instant::now();

    fixture.controller.load(SOURCE);
    fixture.driver.ready(100.0);
    fixture.pump(now);
    fixture.driver.clear_commands();

    assert_eq!(fixture.controller.seek(0.5), Some(50.0));
    assert_eq!(
        fixture.driver.commands(),
        vec![EngineCommand::Pause, EngineCommand::Seek(50.0)]
    );

    assert_eq!(fixture.driver.settle_seeks(true), 1);
    fixture.pump(now);
    assert_eq!(
        fixture.driver.commands(),
        vec![
            EngineCommand::Pause,
            EngineCommand::Seek(50.0),
            EngineCommand::Play
        ]
    );

    Ok(())
}

#[test]
fn test_seek_clamps_out_of_range_fractions() -> Result<()> {
    let mut fixture = TestFixture::new(&PlaybackConfig::default())?;

    fixture.controller.load(SOURCE);
    fixture.driver.ready(80.0);
    fixture.pump(Instant::now());

    assert_eq!(fixture.controller.seek(1.7), Some(80.0));
    assert_eq!(fixture.controller.seek(-0.3), Some(0.0));
    assert_eq!(fixture.controller.seek(f64::NAN), Some(0.0));

    Ok(())
}

#[test]
fn test_seek_before_duration_is_known_does_nothing() -> Result<()> {
    let mut fixture = TestFixture::new(&PlaybackConfig::default())?;

    assert_eq!(fixture.controller.seek(0.5), None);

    fixture.controller.load(SOURCE);
    fixture.driver.clear_commands();
    assert_eq!(fixture.controller.seek(0.5), None);
    assert!(fixture.driver.commands().is_empty());

    Ok(())
}

#[test]
fn test_pause_during_seek_cancels_resume() -> Result<()> {
    let mut fixture = TestFixture::new(&PlaybackConfig::default())?;
    let now = Instant::now();

    fixture.controller.load(SOURCE);
    fixture.driver.ready(100.0);
    fixture.pump(now);

    fixture.controller.seek(0.2);
    fixture.controller.pause();
    fixture.driver.clear_commands();

    fixture.driver.settle_seeks(true);
    fixture.pump(now);
    assert!(fixture.driver.commands().is_empty());

    Ok(())
}

#[test]
fn test_interrupted_seek_stays_paused() -> Result<()> {
    let mut fixture = TestFixture::new(&PlaybackConfig::default())?;
    let now = Instant::now();

    fixture.controller.load(SOURCE);
    fixture.driver.ready(100.0);
    fixture.pump(now);

    fixture.controller.seek(0.9);
    fixture.driver.clear_commands();
    fixture.driver.settle_seeks(false);
    fixture.pump(now);

    assert!(!fixture.driver.commands().contains(&EngineCommand::Play));

    Ok(())
}

#[test]
fn test_seek_completion_after_reload_is_ignored() -> Result<()> {
    let mut fixture = TestFixture::new(&PlaybackConfig {
        auto_play: false,
        ..PlaybackConfig::default()
    })?;
    let now = Instant::now();

    fixture.controller.load("https://cdn.example/a.mp4");
    fixture.driver.ready(100.0);
    fixture.pump(now);
    fixture.controller.seek(0.5);

    fixture.controller.load("https://cdn.example/b.mp4");
    fixture.driver.clear_commands();
    fixture.driver.settle_seeks(true);
    fixture.pump(now);

    assert!(fixture.driver.commands().is_empty());

    Ok(())
}

#[test]
fn test_end_of_media_rewinds_and_stays_paused() -> Result<()> {
    let mut fixture = TestFixture::new(&continuous())?;
    let start = Instant::now();

    fixture.controller.load(SOURCE);
    fixture.driver.ready(60.0);
    fixture.driver.transport(TransportState::Playing);
    fixture.pump(start);
    fixture.controller.poll_timers(start + Duration::from_millis(450));
    assert!(fixture.controller.snapshot().is_playing);

    fixture.driver.tick(59.0);
    fixture.pump(start + Duration::from_secs(1));
    assert_eq!(fixture.controller.snapshot().current_time_text, "00:59");

    fixture.driver.clear_commands();
    fixture.driver.transport(TransportState::Paused);
    fixture.driver.emit(EngineEventKind::ReachedEnd);
    fixture.pump(start + Duration::from_secs(2));

    let snapshot = fixture.controller.snapshot();
    assert_eq!(snapshot.current_time_text, "00:00");
    assert_eq!(snapshot.progress, 0.0);
    assert!(!snapshot.is_playing);
    assert_eq!(
        fixture.driver.commands(),
        vec![EngineCommand::Pause, EngineCommand::Seek(0.0)]
    );

    // The rewind settles without resuming
    fixture.driver.settle_seeks(true);
    fixture.pump(start + Duration::from_secs(3));
    fixture.controller.poll_timers(start + Duration::from_secs(4));
    assert!(!fixture.driver.commands().contains(&EngineCommand::Play));
    assert!(!fixture.controller.snapshot().is_playing);

    Ok(())
}

#[test]
fn test_transport_flicker_is_debounced() -> Result<()> {
    let mut fixture = TestFixture::new(&PlaybackConfig::default())?;
    let start = Instant::now();
    let ms = Duration::from_millis;
    let mut playing = fixture.controller.subscribe().is_playing;

    fixture.controller.load(SOURCE);
    fixture.driver.ready(100.0);
    fixture.pump(start);

    // Buffering stalls flip the raw state back and forth
    for (offset, state) in [
        (0, TransportState::Playing),
        (100, TransportState::WaitingToPlay),
        (200, TransportState::Playing),
        (250, TransportState::Playing),
    ] {
        fixture.driver.transport(state);
        fixture.pump(start + ms(offset));
    }

    assert!(!fixture.controller.snapshot().is_playing);
    assert_eq!(fixture.controller.next_deadline(), Some(start + ms(650)));

    fixture.controller.poll_timers(start + ms(649));
    assert!(!playing.has_changed()?);

    fixture.controller.poll_timers(start + ms(650));
    assert!(playing.has_changed()?);
    assert!(*playing.borrow_and_update());

    Ok(())
}

#[test]
fn test_dispose_is_idempotent_and_silences_engine() -> Result<()> {
    let mut fixture = TestFixture::new(&continuous())?;
    let now = Instant::now();

    fixture.controller.load(SOURCE);
    fixture.driver.ready(100.0);
    fixture.pump(now);
    fixture.controller.seek(0.5);

    fixture.controller.dispose();
    fixture.controller.dispose();
    assert!(fixture.controller.is_disposed());
    assert_eq!(fixture.controller.live_subscriptions(), 0);
    assert_eq!(fixture.driver.pending_seeks(), 0);

    let unloads = fixture
        .driver
        .commands()
        .into_iter()
        .filter(|c| *c == EngineCommand::Unload)
        .count();
    assert_eq!(unloads, 1);

    let before = fixture.controller.snapshot();
    fixture.driver.tick(80.0);
    fixture.driver.emit(EngineEventKind::ReachedEnd);
    fixture.pump(now);
    assert_eq!(fixture.controller.snapshot(), before);

    Ok(())
}
