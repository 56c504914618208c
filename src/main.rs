mod timekeeper;

use crate::timekeeper::config::Config;
use crate::timekeeper::connectors::discord::GuildMember;
use crate::timekeeper::connectors::discord::serenity::{
    Context, Data, SerenityDiscordConnector,
};
use crate::timekeeper::honor::{HonorLedger, SetupGate};
use crate::timekeeper::store::JsonStore;
use crate::timekeeper::voice::{self, VoiceLedger};
use crate::timekeeper::{Timekeeper, TimekeeperImpl};
use log::{LevelFilter, debug, error, info};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Logger, Root};
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::FullEvent;
use std::sync::Arc;
use std::time::Duration;

/// Ping command to test bot availability
#[poise::command(prefix_command)]
async fn ping(ctx: Context<'_>) -> anyhow::Result<()> {
    ctx.reply("Pong!").await?;
    Ok(())
}

/// Show this menu
#[poise::command(prefix_command)]
async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"] command: Option<String>,
) -> anyhow::Result<()> {
    let config = poise::builtins::HelpConfiguration {
        extra_text_at_bottom: "\
Type help command for more info on a command.",
        ..Default::default()
    };
    poise::builtins::help(ctx, command.as_deref(), config).await?;
    Ok(())
}

/// Show how much time a member has spent in voice channels
///
/// Without an argument I'll report on you; tag another member to see their time instead.
#[poise::command(prefix_command, guild_only)]
async fn tempo(
    ctx: Context<'_>,
    #[description = "The member to report on; defaults to you"] member: Option<serenity::Member>,
) -> anyhow::Result<()> {
    let member = match member {
        Some(member) => GuildMember::from(member),
        None => invoking_member(ctx).await,
    };
    let connector = SerenityDiscordConnector::new(ctx);
    let timekeeper = timekeeper_for(ctx, &connector);
    timekeeper.report_time(&member).await?;
    Ok(())
}

/// Show the top 10 members by cumulative voice time
#[poise::command(prefix_command, guild_only)]
async fn ranking(ctx: Context<'_>) -> anyhow::Result<()> {
    let connector = SerenityDiscordConnector::new(ctx);
    let timekeeper = timekeeper_for(ctx, &connector);
    timekeeper.report_ranking().await?;
    Ok(())
}

/// Set up the honor role, or show its panel once configured (administrators only)
#[poise::command(prefix_command, guild_only)]
async fn painelpd(ctx: Context<'_>) -> anyhow::Result<()> {
    let connector = SerenityDiscordConnector::new(ctx);
    let timekeeper = timekeeper_for(ctx, &connector);
    timekeeper.honor_panel().await?;
    Ok(())
}

/// Grant the honor role to the tagged members (administrators only)
#[poise::command(prefix_command, guild_only)]
async fn addpd(
    ctx: Context<'_>,
    #[description = "Members to grant the honor role to"] members: Vec<serenity::Member>,
) -> anyhow::Result<()> {
    let members: Vec<GuildMember> = members.into_iter().map(GuildMember::from).collect();
    let connector = SerenityDiscordConnector::new(ctx);
    let timekeeper = timekeeper_for(ctx, &connector);
    timekeeper.grant_honor(&members).await?;
    Ok(())
}

fn timekeeper_for<'a>(
    ctx: Context<'a>,
    connector: &'a SerenityDiscordConnector<'a>,
) -> TimekeeperImpl<'a, SerenityDiscordConnector<'a>> {
    let data = ctx.data();
    TimekeeperImpl::new(
        data.voice_store.as_ref(),
        data.honor_store.as_ref(),
        &data.setup_gate,
        data.config.setup_timeout(),
        connector,
    )
}

async fn invoking_member(ctx: Context<'_>) -> GuildMember {
    match ctx.author_member().await {
        Some(member) => member.into_owned().into(),
        None => GuildMember::from(ctx.author()),
    }
}

/// Folds open voice sessions into the totals for as long as the process
/// lives, so a crash loses at most one interval of accrued time.
async fn reconcile_open_sessions(
    ctx: serenity::Context,
    voice_store: Arc<JsonStore<VoiceLedger>>,
    cadence: Duration,
) {
    let mut ticker = tokio::time::interval(cadence);
    loop {
        ticker.tick().await;
        let connected = connected_voice_members(&ctx);
        if let Err(err) = voice::reconcile_connected(&voice_store, &connected).await {
            error!("Failed to reconcile open voice sessions: {}", err);
        }
    }
}

/// Members currently sitting in a voice channel, across all cached guilds.
fn connected_voice_members(ctx: &serenity::Context) -> Vec<u64> {
    let mut connected = Vec::new();
    for guild_id in ctx.cache.guilds() {
        let Some(guild) = ctx.cache.guild(guild_id) else {
            continue;
        };
        connected.extend(
            guild
                .voice_states
                .iter()
                .filter(|(_, state)| state.channel_id.is_some())
                .map(|(user_id, _)| user_id.get()),
        );
    }
    connected
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let stdout = ConsoleAppender::builder().build();
    let log_config = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .logger(Logger::builder().build("timekeeper", LevelFilter::Info))
        .build(Root::builder().appender("stdout").build(LevelFilter::Warn))?;
    log4rs::init_config(log_config)?;

    let config = Config::load()?;
    let voice_store: Arc<JsonStore<VoiceLedger>> =
        Arc::new(JsonStore::open(&config.voice_data_file).await?);
    let honor_store: Arc<JsonStore<HonorLedger>> =
        Arc::new(JsonStore::open(&config.honor_data_file).await?);

    let token = config.discord_token.clone();
    let prefix = config.command_prefix.clone();
    let reconcile_interval = config.reconcile_interval();
    let data = Data {
        config,
        voice_store: voice_store.clone(),
        honor_store,
        setup_gate: SetupGate::default(),
    };

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::<Data, anyhow::Error>::builder()
        .options(poise::FrameworkOptions {
            commands: vec![help(), ping(), tempo(), ranking(), painelpd(), addpd()],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(prefix),
                ..Default::default()
            },
            event_handler: |_ctx, event, _framework, data| {
                Box::pin(async move {
                    match event {
                        FullEvent::VoiceStateUpdate { old, new } => {
                            let previous = old
                                .as_ref()
                                .and_then(|state| state.channel_id)
                                .map(|channel_id| channel_id.get());
                            let current = new.channel_id.map(|channel_id| channel_id.get());
                            voice::handle_voice_update(
                                &data.voice_store,
                                new.user_id.get(),
                                previous,
                                current,
                            )
                            .await?;
                        }
                        _ => debug!("Unhandled event: {}", event.snake_case_name()),
                    }
                    Ok(())
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Bot connected as {}", ready.user.name);
                let task_ctx = ctx.clone();
                tokio::spawn(async move {
                    reconcile_open_sessions(task_ctx, voice_store, reconcile_interval).await;
                });
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    client.start().await?;
    Ok(())
}
