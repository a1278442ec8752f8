// tests/scheduler_tests.rs

mod test_utils;

use std::time::Duration;

use chrono::Utc;

use shoutbot_common::models::{LiveChannel, ShoutoutCandidate, ShoutoutTarget};
use shoutbot_core::config::{ShoutoutSettings, TargetWindow};
use shoutbot_core::tasks::AutoShoutoutScheduler;

use test_utils::*;

fn scheduler(h: &Harness, window: TargetWindow) -> AutoShoutoutScheduler {
    let settings = ShoutoutSettings {
        target_window: window,
        ..ShoutoutSettings::default()
    };
    AutoShoutoutScheduler::new(h.repos.clone(), h.users.clone(), h.shoutouts.clone(), settings)
}

/// Alice is live with bob as her only target; bob is stored with channel info.
fn with_bob_target(h: &Harness) -> ShoutoutTarget {
    let mut bob = user(BOB, "bob", "Bob");
    bob.is_live = true;
    h.store.put_user(bob);
    h.store.put_live_info(live_info(BOB, "Celeste", "any% practice"));
    let target = ShoutoutTarget::new(ALICE, BOB);
    h.store.put_target(target.clone());
    target
}

#[tokio::test]
async fn live_channel_gets_one_shoutout() {
    let h = Harness::new();
    let target = with_bob_target(&h);
    let sched = scheduler(&h, TargetWindow::Fixed(Duration::from_secs(3600)));

    let now = Utc::now();
    assert_eq!(sched.run_cycle(now).await.unwrap(), 1);

    let sent = h.api.shoutouts();
    assert_eq!(sent.len(), 1);
    assert_eq!((sent[0].from.as_str(), sent[0].to.as_str()), (ALICE, BOB));

    let announcements = h.api.announcements();
    assert_eq!(announcements.len(), 1);
    assert_eq!(announcements[0].broadcaster_id, ALICE);
    assert!(announcements[0].message.contains("Bob"));
    assert!(announcements[0].message.contains("they are streaming Celeste"));

    let stored = h.store.targets_for(ALICE);
    assert_eq!(stored[0].id, target.id);
    assert_eq!(stored[0].last_shoutout_at, Some(now));
    assert_eq!(h.store.channel(ALICE).unwrap().last_shoutout_at, Some(now));

    // channel interval (10 min) has not passed
    let soon = now + chrono::Duration::minutes(1);
    assert_eq!(sched.run_cycle(soon).await.unwrap(), 0);
    assert_eq!(h.api.shoutouts().len(), 1);
}

#[tokio::test]
async fn offline_channel_is_skipped() {
    let h = Harness::new();
    with_bob_target(&h);
    let mut alice = h.store.user(ALICE).unwrap();
    alice.is_live = false;
    h.store.put_user(alice);

    let sched = scheduler(&h, TargetWindow::Fixed(Duration::from_secs(3600)));
    assert_eq!(sched.run_cycle(Utc::now()).await.unwrap(), 0);
    assert!(h.api.shoutouts().is_empty());
}

#[tokio::test]
async fn failing_channel_does_not_stop_cycle() {
    let h = Harness::new();
    with_bob_target(&h);
    h.api.fail_shoutouts(500, "Internal Server Error");

    let sched = scheduler(&h, TargetWindow::Fixed(Duration::from_secs(3600)));
    assert_eq!(sched.run_cycle(Utc::now()).await.unwrap(), 0);
    assert_eq!(h.store.channel(ALICE).unwrap().last_shoutout_at, None);
    assert_eq!(h.store.targets_for(ALICE)[0].last_shoutout_at, None);
}

#[tokio::test]
async fn target_window_policies() {
    let h = Harness::new();
    let now = Utc::now();
    let channel = h.store.channel(ALICE).unwrap();

    let candidate = |id: &str, minutes_ago: Option<i64>| {
        let mut target = ShoutoutTarget::new(ALICE, id);
        target.last_shoutout_at = minutes_ago.map(|m| now - chrono::Duration::minutes(m));
        ShoutoutCandidate {
            target,
            user: user(id, id, id),
            live_info: None,
        }
    };
    let live = LiveChannel {
        channel,
        candidates: vec![
            candidate("201", Some(30)),
            candidate("202", Some(10)),
            candidate("203", None),
            candidate(ALICE, None),
        ],
    };

    let fixed = scheduler(&h, TargetWindow::Fixed(Duration::from_secs(3600)));
    let ids: Vec<&str> = fixed.eligible(&live, now).iter().map(|c| c.user.id.as_str()).collect();
    assert_eq!(ids, vec!["203"]);

    // four targets: one hour spread gives a 15 minute window
    let spread = scheduler(&h, TargetWindow::Spread);
    let ids: Vec<&str> = spread.eligible(&live, now).iter().map(|c| c.user.id.as_str()).collect();
    assert_eq!(ids, vec!["201", "203"]);
}
