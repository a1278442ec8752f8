// tests/background_task_tests.rs
//
// Token refresh loops and the live status monitor.

mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mockall::mock;
use tokio_util::sync::CancellationToken;

use shoutbot_common::models::{Channel, ChannelRef, DeviceCodeGrant, TokenSet, ValidatedToken};
use shoutbot_common::traits::auth_traits::TokenProvider;
use shoutbot_core::auth::{BotSession, TokenFileStore};
use shoutbot_core::config::RefreshSettings;
use shoutbot_core::tasks::{LiveStatusMonitor, TokenRefreshed, TokenRefresher};
use shoutbot_core::Error;

use test_utils::*;

mock! {
    Provider {}
    #[async_trait]
    impl TokenProvider for Provider {
        fn authorize_url(&self, redirect_uri: &str, scopes: &[&'static str], state: &str) -> String;
        async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenSet, Error>;
        async fn validate(&self, access_token: &str) -> Result<ValidatedToken, Error>;
        async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, Error>;
        async fn revoke(&self, access_token: &str) -> Result<(), Error>;
        async fn start_device_flow(&self, scopes: &[&'static str]) -> Result<DeviceCodeGrant, Error>;
        async fn poll_device_token(&self, device_code: &str, scopes: &[&'static str]) -> Result<Option<TokenSet>, Error>;
    }
}

fn tokens(access: &str, refresh: &str, expires_in_secs: i64) -> TokenSet {
    TokenSet {
        access_token: access.into(),
        refresh_token: refresh.into(),
        expires_at: Utc::now() + chrono::Duration::seconds(expires_in_secs),
    }
}

fn refresher(
    h: &Harness,
    provider: MockProvider,
    session: Arc<BotSession>,
    store: TokenFileStore,
) -> Arc<TokenRefresher> {
    refresher_with(h, provider, session, store, RefreshSettings::default())
}

fn refresher_with(
    h: &Harness,
    provider: MockProvider,
    session: Arc<BotSession>,
    store: TokenFileStore,
    settings: RefreshSettings,
) -> Arc<TokenRefresher> {
    Arc::new(TokenRefresher::new(
        Arc::new(provider),
        h.repos.clone(),
        h.users.clone(),
        session,
        store,
        settings,
    ))
}

#[tokio::test]
async fn expiring_bot_token_rotates_everywhere() {
    let h = Harness::new();
    h.store.put_user(user(BOT_ID, "shoutbot", "ShoutBot"));
    let dir = tempfile::tempdir().unwrap();
    let store = TokenFileStore::new(dir.path().join("token.json"));
    let session = Arc::new(BotSession::new("cid", BOT_ID, "shoutbot", tokens("old", "r-old", 60)));

    let mut provider = MockProvider::new();
    provider
        .expect_refresh()
        .times(1)
        .returning(|r| match r {
            "r-old" => Ok(TokenSet::from_expires_in("fresh".into(), "r-fresh".into(), 14_000)),
            other => Err(Error::Auth(format!("unexpected refresh token {other}"))),
        });

    let refresher = refresher(&h, provider, session.clone(), store.clone());
    let mut rotations = refresher.subscribe();

    assert!(refresher.refresh_if_due(BOT_ID, Utc::now()).await.unwrap());

    assert_eq!(session.access_token(), "fresh");
    assert_eq!(store.load().await.unwrap().unwrap().refresh_token, "r-fresh");
    assert_eq!(h.store.user(BOT_ID).unwrap().access_token.as_deref(), Some("fresh"));
    assert_eq!(
        rotations.try_recv().unwrap(),
        TokenRefreshed {
            user_id: BOT_ID.into(),
            access_token: "fresh".into()
        }
    );
}

#[tokio::test]
async fn valid_token_is_left_alone() {
    let h = Harness::new();
    let dir = tempfile::tempdir().unwrap();
    let store = TokenFileStore::new(dir.path().join("token.json"));
    let session = Arc::new(BotSession::new("cid", BOT_ID, "shoutbot", tokens("still-good", "r", 4 * 3600)));

    let mut provider = MockProvider::new();
    provider.expect_refresh().times(0);

    let refresher = refresher(&h, provider, session.clone(), store.clone());
    assert!(!refresher.refresh_if_due(BOT_ID, Utc::now()).await.unwrap());
    assert_eq!(session.access_token(), "still-good");
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn broadcaster_tokens_are_stored() {
    let h = Harness::new();
    let mut alice = h.store.user(ALICE).unwrap();
    alice.access_token = Some("a-old".into());
    alice.refresh_token = Some("ra-old".into());
    alice.token_expiry = Some(Utc::now() + chrono::Duration::seconds(30));
    h.store.put_user(alice);

    let mut provider = MockProvider::new();
    provider
        .expect_refresh()
        .times(1)
        .returning(|_| Ok(TokenSet::from_expires_in("a-new".into(), "ra-new".into(), 14_000)));

    let dir = tempfile::tempdir().unwrap();
    let refresher = refresher(&h, provider, bot_session(), TokenFileStore::new(dir.path().join("t.json")));
    assert!(tokio_test::assert_ok!(refresher.refresh_if_due(ALICE, Utc::now()).await));

    let stored = h.store.user(ALICE).unwrap();
    assert_eq!(stored.access_token.as_deref(), Some("a-new"));
    assert_eq!(stored.refresh_token.as_deref(), Some("ra-new"));
}

#[tokio::test]
async fn account_without_refresh_token_is_an_error() {
    let h = Harness::new();
    let dir = tempfile::tempdir().unwrap();
    let refresher = refresher(
        &h,
        MockProvider::new(),
        bot_session(),
        TokenFileStore::new(dir.path().join("t.json")),
    );
    let err = tokio_test::assert_err!(refresher.refresh_if_due(CAROL, Utc::now()).await);
    assert!(matches!(err, Error::Auth(_)), "got {err:?}");
}

#[tokio::test(start_paused = true)]
async fn refresh_loop_syncs_moderators_and_stops_on_cancel() {
    let h = Harness::new();
    let mut carol = h.store.user(CAROL).unwrap();
    carol.access_token = Some("c".into());
    carol.refresh_token = Some("rc".into());
    carol.token_expiry = Some(Utc::now() + chrono::Duration::hours(4));
    h.store.put_user(carol);
    h.api.set_moderated(
        CAROL,
        vec![ChannelRef {
            broadcaster_id: BOB.into(),
            broadcaster_login: "bob".into(),
        }],
    );

    let dir = tempfile::tempdir().unwrap();
    let refresher = refresher(
        &h,
        MockProvider::new(),
        bot_session(),
        TokenFileStore::new(dir.path().join("t.json")),
    );
    let cancel = CancellationToken::new();
    let handle = refresher.spawn_loop(CAROL.into(), cancel.clone());

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(h.repos.moderators.is_moderator(BOB, CAROL).await.unwrap());

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn unwritable_token_file_still_announces_rotation() {
    let h = Harness::new();
    let dir = tempfile::tempdir().unwrap();
    // a plain file where the token file's directory should be
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();
    let store = TokenFileStore::new(blocker.join("token.json"));
    let session = Arc::new(BotSession::new("cid", BOT_ID, "shoutbot", tokens("old", "r-old", 60)));

    let mut provider = MockProvider::new();
    provider
        .expect_refresh()
        .times(1)
        .returning(|_| Ok(TokenSet::from_expires_in("fresh".into(), "r-fresh".into(), 14_000)));

    let refresher = refresher(&h, provider, session.clone(), store);
    let mut rotations = refresher.subscribe();

    assert!(refresher.refresh_if_due(BOT_ID, Utc::now()).await.unwrap());
    assert_eq!(session.access_token(), "fresh");
    assert_eq!(rotations.try_recv().unwrap().access_token, "fresh");
}

#[tokio::test]
async fn pause_shrinks_as_expiry_nears() {
    let h = Harness::new();
    let dir = tempfile::tempdir().unwrap();
    let settings = RefreshSettings {
        lead: Duration::from_secs(300),
        poll_interval: Duration::from_secs(900),
        retry_backoff: Duration::from_secs(300),
    };
    let refresher = refresher_with(
        &h,
        MockProvider::new(),
        bot_session(),
        TokenFileStore::new(dir.path().join("t.json")),
        settings,
    );
    let now = Utc::now();

    let far = now + chrono::Duration::hours(4);
    assert_eq!(refresher.next_pause(far, now), Duration::from_secs(900));
    let soon = now + chrono::Duration::minutes(10);
    assert_eq!(refresher.next_pause(soon, now), Duration::from_secs(300));
    // already inside the lead window
    let past = now + chrono::Duration::minutes(2);
    assert_eq!(refresher.next_pause(past, now), Duration::from_secs(1));
}

#[tokio::test]
async fn loop_wakes_before_expiry_instead_of_after_poll_interval() {
    let h = Harness::new();
    let dir = tempfile::tempdir().unwrap();
    let session = Arc::new(BotSession::new(
        "cid",
        BOT_ID,
        "shoutbot",
        TokenSet {
            access_token: "old".into(),
            refresh_token: "r-old".into(),
            expires_at: Utc::now() + chrono::Duration::milliseconds(1500),
        },
    ));

    let mut provider = MockProvider::new();
    provider
        .expect_refresh()
        .times(1)
        .returning(|_| Ok(TokenSet::from_expires_in("fresh".into(), "r-fresh".into(), 14_000)));

    let settings = RefreshSettings {
        lead: Duration::from_secs(1),
        poll_interval: Duration::from_secs(3600),
        retry_backoff: Duration::from_secs(3600),
    };
    let refresher = refresher_with(
        &h,
        provider,
        session.clone(),
        TokenFileStore::new(dir.path().join("t.json")),
        settings,
    );
    let cancel = CancellationToken::new();
    let handle = refresher.spawn_loop(BOT_ID.into(), cancel.clone());

    let refreshed = tokio::time::timeout(Duration::from_secs(5), async {
        while session.access_token() != "fresh" {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(refreshed.is_ok(), "token was not refreshed before the poll interval");

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn live_status_updates_flags_and_rejoins() {
    let h = Harness::new();
    h.store.put_user(user(DAVE, "dave", "Dave"));
    h.store.put_channel(Channel::new(DAVE, "dave"));
    h.api.set_live(DAVE, true);
    h.api.set_live_info(live_info(DAVE, "Tetris", "sprint"));

    let monitor = LiveStatusMonitor::new(h.api.clone(), h.repos.clone(), h.users.clone(), h.chat.clone());
    assert_eq!(monitor.run_once().await.unwrap(), 1);

    assert!(!h.store.user(ALICE).unwrap().is_live);
    assert!(h.store.user(DAVE).unwrap().is_live);
    let info = h.repos.live_info.get_live_info(DAVE).await.unwrap().unwrap();
    assert_eq!(info.game_name.as_deref(), Some("Tetris"));

    let mut joined = h.chat.joined();
    joined.sort();
    assert_eq!(joined, vec!["alice".to_string(), "dave".to_string()]);
}
