use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use shoutbot_common::models::{Channel, TwitchUser};
use shoutbot_core::auth::{AuthManager, TokenFileStore};
use shoutbot_core::config::{BotConfig, TargetWindow, SHUTDOWN_NOTICE};
use shoutbot_core::connections::ConnectionPool;
use shoutbot_core::platforms::pronouns::AlejoPronounClient;
use shoutbot_core::platforms::twitch::{TwitchAuthenticator, TwitchHelixClient};
use shoutbot_core::platforms::twitch_irc::TwitchIrcConnector;
use shoutbot_core::platforms::ChatCredentials;
use shoutbot_core::repositories::Repositories;
use shoutbot_core::services::{
    ChatCommandHandler, CommandParser, CommandRouter, CooldownTracker, PronounService,
    ShoutoutService, UserService,
};
use shoutbot_core::tasks::{AutoShoutoutScheduler, LiveStatusMonitor, TokenRefresher};
use shoutbot_core::Database;

#[derive(Parser, Debug, Clone)]
#[command(name = "shoutbot")]
#[command(author, version, about = "ShoutBot - Twitch shoutout bot")]
struct Args {
    /// Postgres connection URL.
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://shoutbot@localhost:5432/shoutbot")]
    db_url: String,

    /// Where the bot account's token pair is kept.
    #[arg(long)]
    token_file: Option<PathBuf>,

    #[arg(long)]
    command_prefix: Option<String>,

    #[arg(long)]
    channel_cooldown_secs: Option<u64>,

    #[arg(long)]
    user_cooldown_secs: Option<u64>,

    /// Spread each channel's targets evenly over an hour instead of one hour per target.
    #[arg(long, default_value = "false")]
    spread_targets: bool,
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_log::LogTracer::init().context("installing log bridge")?;
    let filter = EnvFilter::from_default_env().add_directive("shoutbot=info".parse()?);
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub).context("installing tracing subscriber")?;
    Ok(())
}

fn build_config(args: &Args) -> anyhow::Result<BotConfig> {
    let mut config = BotConfig::from_env()?;
    if let Some(path) = &args.token_file {
        config.token_file = path.clone();
    }
    if let Some(prefix) = args.command_prefix.as_deref().filter(|p| !p.trim().is_empty()) {
        config.command_prefix = prefix.trim().to_string();
    }
    if let Some(secs) = args.channel_cooldown_secs {
        config.shoutouts.channel_cooldown = Duration::from_secs(secs);
    }
    if let Some(secs) = args.user_cooldown_secs {
        config.shoutouts.user_cooldown = Duration::from_secs(secs);
    }
    if args.spread_targets {
        config.shoutouts.target_window = TargetWindow::Spread;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing()?;
    let args = Args::parse();
    info!("ShoutBot starting.");

    if let Err(e) = run_server(args).await {
        error!("Server error: {:?}", e);
        return Err(e);
    }
    info!("Main finished. Goodbye!");
    Ok(())
}

async fn run_server(args: Args) -> anyhow::Result<()> {
    let config = build_config(&args)?;
    let timeout = config.shoutouts.api_timeout;

    // 1) Storage
    let db = Database::new(&args.db_url).await.context("connecting to Postgres")?;
    db.migrate().await.context("applying migrations")?;
    let repos = Repositories::postgres(db.pool().clone());

    // 2) Bot identity
    let authenticator = Arc::new(TwitchAuthenticator::new(
        &config.client_id,
        &config.client_secret,
        timeout,
    )?);
    let token_store = TokenFileStore::new(config.token_file.clone());
    let auth = AuthManager::new(authenticator.clone(), token_store.clone());
    let session = Arc::new(auth.establish_bot_session(&config).await?);
    info!("Authenticated as {} ({})", session.bot_login(), session.bot_user_id());

    let mut bot_user = TwitchUser::new(session.bot_user_id(), session.bot_login(), session.bot_login());
    let tokens = session.tokens();
    bot_user.access_token = Some(tokens.access_token);
    bot_user.refresh_token = Some(tokens.refresh_token);
    bot_user.token_expiry = Some(tokens.expires_at);
    repos.users.upsert_user(&bot_user).await?;

    // 3) Helix, pronouns, services
    let api = Arc::new(TwitchHelixClient::new(session.clone(), timeout)?);
    let pronouns = Arc::new(PronounService::new(
        Arc::new(AlejoPronounClient::new(timeout)?),
        repos.pronouns.clone(),
    ));
    match pronouns.load_pronouns().await {
        Ok(n) => info!("Loaded {} pronoun definitions", n),
        Err(e) => warn!("Pronoun catalog unavailable: {}", e),
    }
    let users = Arc::new(UserService::new(api.clone(), repos.clone(), pronouns));
    let cooldowns = Arc::new(CooldownTracker::new(
        config.shoutouts.channel_cooldown,
        config.shoutouts.user_cooldown,
    ));
    let shoutouts = Arc::new(ShoutoutService::new(
        api.clone(),
        cooldowns,
        repos.clone(),
        session.clone(),
    ));

    // 4) Home channel is always joined
    match users.resolve_user(&config.home_channel).await? {
        Some(home) => {
            if repos.channels.get_channel(&home.id).await?.is_none() {
                repos.channels.create_channel(&Channel::new(&home.id, &home.username)).await?;
            }
        }
        None => warn!("Home channel {} is not a known Twitch user", config.home_channel),
    }

    // 5) Chat
    let credentials = ChatCredentials {
        login: session.bot_login().to_string(),
        oauth_token: session.access_token(),
    };
    let pool = {
        let repos = repos.clone();
        let users = users.clone();
        let shoutouts = shoutouts.clone();
        let prefix = config.command_prefix.clone();
        ConnectionPool::new(
            Arc::new(TwitchIrcConnector::default()),
            credentials,
            config.shoutouts.shutdown_grace,
            move |handle| {
                let router = CommandRouter::new(
                    repos,
                    users,
                    shoutouts,
                    Arc::new(handle.clone()),
                    Arc::new(handle),
                    &prefix,
                );
                Arc::new(ChatCommandHandler::new(CommandParser::new(&prefix), Arc::new(router)))
            },
        )
    };

    let mut channels = vec![config.home_channel.clone()];
    for ch in repos.channels.list_enabled_channels().await? {
        if !channels.contains(&ch.name) {
            channels.push(ch.name);
        }
    }
    let joined = pool.connect_all(&channels).await;
    info!("Joined {} of {} channels", joined, channels.len());

    // 6) Background tasks
    let cancel = CancellationToken::new();
    let refresher = Arc::new(TokenRefresher::new(
        authenticator,
        repos.clone(),
        users.clone(),
        session.clone(),
        token_store,
        config.refresh.clone(),
    ));
    let _rotation = pool.watch_token_rotation(
        session.bot_user_id().to_string(),
        refresher.subscribe(),
        cancel.child_token(),
    );
    let _refresh_loops = refresher.spawn_all(&cancel).await?;

    let scheduler = Arc::new(AutoShoutoutScheduler::new(
        repos.clone(),
        users.clone(),
        shoutouts,
        config.shoutouts.clone(),
    ));
    let _scheduler = scheduler.spawn(cancel.child_token());

    let monitor = Arc::new(LiveStatusMonitor::new(api, repos, users, Arc::new(pool.handle())));
    let _monitor = monitor.spawn(config.shoutouts.live_poll_interval, cancel.child_token());

    // 7) Run until Ctrl-C
    info!("ShoutBot running; press Ctrl-C to stop.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Ctrl-C handler error: {:?}", e);
    }
    info!("Ctrl-C detected; shutting down...");
    cancel.cancel();
    pool.shutdown_all(SHUTDOWN_NOTICE).await;
    Ok(())
}
