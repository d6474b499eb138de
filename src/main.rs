use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use tg_forwardbot::forwarder::BotForwarder;
use tg_forwardbot::handlers::BotState;
use tg_forwardbot::store::{DestStore, PostStore, SettingsStore};
use tg_forwardbot::{config, handlers, ingest, scheduler};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let posts = PostStore::in_dir(&cfg.app.data_dir);
    let dests = DestStore::in_dir(&cfg.app.data_dir);
    let settings = SettingsStore::in_dir(&cfg.app.data_dir);

    let bot = match &cfg.telegram.proxy_url {
        Some(proxy) => {
            let client = reqwest::Client::builder()
                .proxy(reqwest::Proxy::all(proxy)?)
                .build()?;
            Bot::with_client(cfg.telegram.bot_token.clone(), client)
        }
        None => Bot::new(cfg.telegram.bot_token.clone()),
    };

    let forwarder = Arc::new(BotForwarder::new(
        bot.clone(),
        cfg.telegram.source_channel_id,
    ));
    let state = BotState::new(
        Arc::new(cfg.clone()),
        posts.clone(),
        dests.clone(),
        settings.clone(),
        forwarder.clone(),
    );

    tokio::spawn(scheduler::run(
        settings,
        posts,
        dests,
        forwarder,
        Duration::from_secs(cfg.app.idle_seconds),
        Duration::from_secs(cfg.app.error_cooldown_seconds),
    ));

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let state = state.clone();
            move |bot: Bot, msg: Message| {
                let state = state.clone();
                async move {
                    if let Err(err) = handlers::handle_message(&bot, &state, &msg).await {
                        error!(?err, "failed to handle message");
                    }
                    respond(())
                }
            }
        }))
        .branch(Update::filter_channel_post().endpoint({
            let state = state.clone();
            let source_channel_id = cfg.telegram.source_channel_id;
            move |msg: Message| {
                let state = state.clone();
                async move {
                    ingest::handle_channel_post(
                        &msg,
                        source_channel_id,
                        &state.posts,
                        &state.dests,
                        &state.settings,
                        state.forwarder.as_ref(),
                    )
                    .await;
                    respond(())
                }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let state = state.clone();
            move |bot: Bot, q: CallbackQuery| {
                let state = state.clone();
                async move {
                    if let Err(err) = handlers::handle_callback(&bot, &state, &q).await {
                        error!(?err, "failed to handle callback");
                    }
                    respond(())
                }
            }
        }));

    info!("starting telegram bot");
    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
