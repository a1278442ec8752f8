// tests/shoutout_tests.rs

mod test_utils;

use std::time::Duration;

use chrono::Utc;

use shoutbot_common::models::{ShoutoutTarget, TwitchUser};
use shoutbot_core::services::{
    Cooldown, CooldownBlock, ShoutoutOutcome, ShoutoutRequest, ShoutoutTrigger,
};
use shoutbot_core::Error;

use test_utils::*;

fn request(h: &Harness, target: TwitchUser, trigger: ShoutoutTrigger) -> ShoutoutRequest {
    ShoutoutRequest {
        channel: h.store.channel(ALICE).expect("alice channel"),
        target,
        live_info: Some(live_info(BOB, "Celeste", "any% practice")),
        template_override: None,
        target_id: None,
        trigger,
    }
}

#[tokio::test]
async fn concurrent_attempts_fire_once() {
    let h = Harness::new();
    h.api.delay_shoutouts(Duration::from_millis(50));

    let first = request(&h, user(BOB, "bob", "Bob"), ShoutoutTrigger::Auto);
    let second = request(&h, user(DAVE, "dave", "Dave"), ShoutoutTrigger::Auto);
    let (a, b) = tokio::join!(h.shoutouts.attempt(first), h.shoutouts.attempt(second));

    let outcomes = [a.unwrap(), b.unwrap()];
    let fired = outcomes
        .iter()
        .filter(|o| matches!(o, ShoutoutOutcome::Fired { .. }))
        .count();
    assert_eq!(fired, 1);
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, ShoutoutOutcome::OnCooldown(CooldownBlock::InFlight))));
    assert_eq!(h.api.shoutouts().len(), 1);
}

#[tokio::test]
async fn failed_shoutout_leaves_cooldowns_untouched() {
    let h = Harness::new();
    h.api.fail_shoutouts(400, "The broadcaster is not streaming live");

    let err = h
        .shoutouts
        .attempt(request(&h, user(BOB, "bob", "Bob"), ShoutoutTrigger::Manual))
        .await
        .unwrap_err();
    match &err {
        Error::TwitchApi { status, .. } => assert_eq!(*status, 400),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(err.chat_message(), "The broadcaster is not streaming live");

    assert_eq!(h.cooldowns.channel_cooldown(ALICE), Cooldown::Ready);
    assert_eq!(h.cooldowns.user_cooldown(ALICE, BOB), Cooldown::Ready);
    assert!(h.api.announcements().is_empty());
}

#[tokio::test]
async fn manual_on_cooldown_still_announces() {
    let h = Harness::new();
    let bob = user(BOB, "bob", "Bob");

    let first = h
        .shoutouts
        .attempt(request(&h, bob.clone(), ShoutoutTrigger::Manual))
        .await
        .unwrap();
    let ShoutoutOutcome::Fired { message } = first else {
        panic!("first attempt should fire");
    };
    assert_eq!(
        message,
        "Check out @Bob! they were streaming Celeste: any% practice. Go give them a follow!"
    );

    let again = h
        .shoutouts
        .attempt(request(&h, bob, ShoutoutTrigger::Manual))
        .await
        .unwrap();
    assert!(matches!(again, ShoutoutOutcome::OnCooldown(CooldownBlock::Channel { .. })));
    assert_eq!(h.api.shoutouts().len(), 1);
    assert_eq!(h.api.announcements().len(), 2);
}

#[tokio::test]
async fn auto_success_persists_and_auto_cooldown_is_silent() {
    let h = Harness::new();
    let target = ShoutoutTarget::new(ALICE, BOB);
    let target_id = target.id;
    h.store.put_target(target);

    let now = Utc::now();
    let mut req = request(&h, user(BOB, "bob", "Bob"), ShoutoutTrigger::Auto);
    req.target_id = Some(target_id);
    req.template_override = Some("Go watch {name} play {game}".into());

    let outcome = h.shoutouts.attempt_at(req.clone(), now).await.unwrap();
    assert_eq!(
        outcome,
        ShoutoutOutcome::Fired { message: "Go watch Bob play Celeste".into() }
    );
    assert_eq!(h.store.channel(ALICE).unwrap().last_shoutout_at, Some(now));
    assert_eq!(h.store.targets_for(ALICE)[0].last_shoutout_at, Some(now));

    let outcome = h.shoutouts.attempt_at(req, now).await.unwrap();
    assert!(matches!(outcome, ShoutoutOutcome::OnCooldown(_)));
    assert_eq!(h.api.announcements().len(), 1);
}
