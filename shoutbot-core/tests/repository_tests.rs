// tests/repository_tests.rs
//
// Runs against a real Postgres when TEST_DATABASE_URL is set; otherwise every
// test returns early.

use chrono::{TimeZone, Utc};

use shoutbot_common::models::{
    Channel, ChannelLiveInfo, ChannelModerator, Pronoun, ShoutoutTarget, TokenSet, TwitchUser,
};
use shoutbot_core::repositories::Repositories;
use shoutbot_core::test_utils::setup_test_database;
use shoutbot_core::Error;

// every test truncates the same database
static DB_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

async fn repos() -> Result<Option<Repositories>, Error> {
    Ok(setup_test_database()
        .await?
        .map(|db| Repositories::postgres(db.pool().clone())))
}

#[tokio::test]
async fn channel_and_user_round_trip() -> Result<(), Error> {
    let _guard = DB_LOCK.lock().await;
    let Some(repos) = repos().await? else { return Ok(()) };

    let mut alice = TwitchUser::new("100", "Alice", "Alice");
    alice.color = Some("#FF0000".into());
    repos.users.upsert_user(&alice).await?;
    repos.channels.create_channel(&Channel::new("100", "alice")).await?;

    let stored = repos.users.get_user_by_login("alice").await?.expect("alice");
    assert_eq!(stored.id, "100");
    assert_eq!(stored.color.as_deref(), Some("#FF0000"));

    let mut channel = repos.channels.get_channel_by_name("alice").await?.expect("channel");
    assert!(channel.enabled);
    channel.shoutout_template = "Go see {name}".into();
    repos.channels.update_channel(&channel).await?;
    repos.channels.set_channel_enabled("100", false).await?;

    let channel = repos.channels.get_channel("100").await?.expect("channel");
    assert_eq!(channel.shoutout_template, "Go see {name}");
    assert!(!channel.enabled);
    assert!(repos.channels.list_enabled_channels().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn upsert_keeps_stored_tokens() -> Result<(), Error> {
    let _guard = DB_LOCK.lock().await;
    let Some(repos) = repos().await? else { return Ok(()) };

    let user = TwitchUser::new("100", "alice", "Alice");
    repos.users.upsert_user(&user).await?;
    let expiry = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    repos
        .users
        .update_tokens(
            "100",
            &TokenSet {
                access_token: "a".into(),
                refresh_token: "r".into(),
                expires_at: expiry,
            },
        )
        .await?;

    // profile refresh from Helix carries no tokens
    repos.users.upsert_user(&TwitchUser::new("100", "alice", "ALICE")).await?;

    let stored = repos.users.get_user("100").await?.expect("alice");
    assert_eq!(stored.display_name, "ALICE");
    assert_eq!(stored.refresh_token.as_deref(), Some("r"));
    assert_eq!(stored.token_expiry, Some(expiry));
    assert_eq!(repos.users.list_users_with_refresh_token().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn live_channels_come_with_candidates() -> Result<(), Error> {
    let _guard = DB_LOCK.lock().await;
    let Some(repos) = repos().await? else { return Ok(()) };

    repos
        .pronouns
        .upsert_pronoun(&Pronoun {
            name: "sheher".into(),
            subject: "She".into(),
            object: "Her".into(),
            singular: true,
        })
        .await?;
    repos.users.upsert_user(&TwitchUser::new("100", "alice", "Alice")).await?;
    let mut bob = TwitchUser::new("200", "bob", "Bob");
    bob.pronoun = repos.pronouns.get_pronoun("sheher").await?;
    repos.users.upsert_user(&bob).await?;
    repos.channels.create_channel(&Channel::new("100", "alice")).await?;
    repos
        .live_info
        .upsert_live_info(&ChannelLiveInfo {
            broadcaster_id: "200".into(),
            game_name: Some("Celeste".into()),
            title: Some("any%".into()),
            ..Default::default()
        })
        .await?;
    let target = ShoutoutTarget::new("100", "200");
    repos.targets.create_target(&target).await?;

    assert!(repos.channels.list_live_channels_with_targets().await?.is_empty());
    repos.users.set_live("100", true).await?;

    let live = repos.channels.list_live_channels_with_targets().await?;
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].channel.id, "100");
    let candidate = &live[0].candidates[0];
    assert_eq!(candidate.target.id, target.id);
    assert_eq!(candidate.user.pronoun.as_ref().map(|p| p.subject.as_str()), Some("She"));
    assert_eq!(
        candidate.live_info.as_ref().and_then(|i| i.game_name.as_deref()),
        Some("Celeste")
    );

    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();
    repos.channels.set_channel_last_shoutout("100", at).await?;
    repos.targets.set_target_last_shoutout(target.id, at).await?;
    assert_eq!(repos.channels.get_channel("100").await?.unwrap().last_shoutout_at, Some(at));
    assert_eq!(
        repos.targets.get_target("100", "200").await?.unwrap().last_shoutout_at,
        Some(at)
    );

    assert!(repos.targets.delete_target("100", "200").await?);
    assert!(!repos.targets.delete_target("100", "200").await?);
    Ok(())
}

#[tokio::test]
async fn moderator_rows_are_idempotent() -> Result<(), Error> {
    let _guard = DB_LOCK.lock().await;
    let Some(repos) = repos().await? else { return Ok(()) };

    repos.users.upsert_user(&TwitchUser::new("100", "alice", "Alice")).await?;
    repos.users.upsert_user(&TwitchUser::new("300", "carol", "Carol")).await?;
    repos.channels.create_channel(&Channel::new("100", "alice")).await?;

    let row = ChannelModerator {
        channel_id: "100".into(),
        user_id: "300".into(),
    };
    repos.moderators.upsert_moderator(&row).await?;
    repos.moderators.upsert_moderator(&row).await?;

    assert!(repos.moderators.is_moderator("100", "300").await?);
    assert!(!repos.moderators.is_moderator("100", "200").await?);
    assert_eq!(repos.moderators.list_moderators("100").await?.len(), 1);
    Ok(())
}
