//! Integration tests for the reminder state machine.
//!
//! Every test runs on a paused tokio clock, so the deferred-fire resolves at
//! exactly the scheduled instant:
//! - Start → Alerting after the full duration, with a single alert
//! - Stop before the deadline suppresses the alert
//! - Restarting replaces the pending fire
//! - Remaining time is monotonic while running

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use hydra_reminder::timer::TimerEvent;
use hydra_reminder::{MockTimerObserver, TimerError, TimerManager, TimerPhase};

// ============================================================================
// Test Helpers
// ============================================================================

fn create_timer() -> (TimerManager, Arc<MockTimerObserver>) {
    let observer = Arc::new(MockTimerObserver::new());
    let timer = TimerManager::new(observer.clone(), Handle::current());
    (timer, observer)
}

async fn advance(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn start_alerts_once_after_duration() {
    let (timer, observer) = create_timer();
    timer.start(Duration::from_secs(2)).unwrap();

    advance(1900).await;
    assert_eq!(timer.phase(), TimerPhase::Running);
    assert_eq!(observer.count(TimerEvent::Alert), 0);

    advance(200).await;
    assert_eq!(timer.phase(), TimerPhase::Alerting);
    assert_eq!(observer.count(TimerEvent::Alert), 1);

    // Nothing else fires while alerting
    advance(10_000).await;
    assert_eq!(observer.count(TimerEvent::Alert), 1);
    assert_eq!(timer.time_remaining(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn stop_before_deadline_suppresses_alert() {
    let (timer, observer) = create_timer();
    timer.start(Duration::from_secs(2)).unwrap();

    advance(1000).await;
    timer.stop();
    advance(5000).await;

    assert_eq!(timer.phase(), TimerPhase::Stopped);
    assert!(!timer.is_fire_pending());
    assert_eq!(observer.events(), vec![TimerEvent::Running, TimerEvent::Stop]);
}

#[tokio::test(start_paused = true)]
async fn restart_replaces_pending_fire() {
    let (timer, observer) = create_timer();
    timer.start(Duration::from_secs(2)).unwrap();
    advance(1500).await;

    timer.start(Duration::from_secs(2)).unwrap();
    // The first schedule would have fired at 2.0s
    advance(1000).await;
    assert_eq!(timer.phase(), TimerPhase::Running);
    assert_eq!(observer.count(TimerEvent::Alert), 0);

    advance(600).await;
    assert_eq!(timer.phase(), TimerPhase::Alerting);
    assert_eq!(observer.count(TimerEvent::Alert), 1);
}

#[tokio::test(start_paused = true)]
async fn reset_from_alerting_restarts_countdown() {
    let (timer, observer) = create_timer();
    timer.start(Duration::from_secs(1)).unwrap();
    advance(1500).await;
    assert_eq!(timer.phase(), TimerPhase::Alerting);

    assert!(timer.reset());
    assert_eq!(timer.phase(), TimerPhase::Running);
    assert_eq!(timer.time_remaining(), Duration::from_secs(1));

    advance(1100).await;
    assert_eq!(observer.count(TimerEvent::Alert), 2);
}

#[tokio::test(start_paused = true)]
async fn remaining_time_is_monotonic() {
    let (timer, _observer) = create_timer();
    timer.start(Duration::from_secs(5)).unwrap();

    let mut previous = timer.time_remaining();
    for _ in 0..12 {
        advance(450).await;
        let remaining = timer.time_remaining();
        assert!(remaining <= previous);
        previous = remaining;
    }
    assert_eq!(previous, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn zero_duration_is_rejected_without_side_effects() {
    let (timer, observer) = create_timer();
    timer.start(Duration::from_secs(3)).unwrap();

    assert_eq!(timer.start(Duration::ZERO), Err(TimerError::InvalidDuration));
    assert_eq!(timer.duration(), Duration::from_secs(3));
    assert_eq!(observer.events(), vec![TimerEvent::Running]);
}

#[tokio::test(start_paused = true)]
async fn clones_share_state_across_threads() {
    let (timer, observer) = create_timer();
    timer.start(Duration::from_secs(60)).unwrap();

    let remote = timer.clone();
    std::thread::spawn(move || remote.stop()).join().unwrap();

    assert_eq!(timer.phase(), TimerPhase::Stopped);
    advance(61_000).await;
    assert_eq!(observer.count(TimerEvent::Alert), 0);
}
