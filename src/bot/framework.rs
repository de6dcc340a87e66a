use std::sync::Arc;

use poise::serenity_prelude::{self as serenity, GatewayIntents, GuildId, Http};
use sqlx::PgPool;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::commands;
use crate::config::Settings;
use crate::constants::timeouts::format_duration;
use crate::db::queries::server_config;
use crate::handlers::event_handler::event_handler;
use crate::services::chat::DiscordChat;
use crate::services::scheduler::runner::{spawn_scheduler, PhaseScheduler};
use crate::services::sessions::sweeper::spawn_session_sweeper;

pub async fn run(settings: Settings, pool: PgPool) -> Result<(), Error> {
    let data = Arc::new(Data::new(pool, settings.clone()));

    spawn_session_sweeper(data.sessions.clone(), settings.session_sweep_interval());
    info!(
        "Started session sweeper, conversations expire after {} idle",
        format_duration(settings.session_ttl())
    );

    // The scheduler needs an HTTP client, which only exists once the gateway is ready
    let (ready_tx, ready_rx) = oneshot::channel::<Arc<Http>>();
    spawn_scheduler_when_ready(ready_rx, data.clone());

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::setup::setup(),
                commands::events::events(),
                commands::help::help(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: None, // Disable prefix commands - only use slash commands
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Command error: {:?}", error);
                            let _ = ctx.say(format!("Error: {}", error)).await;
                        }
                        poise::FrameworkError::ArgumentParse { error, ctx, .. } => {
                            let _ = ctx.say(format!("Invalid argument: {}", error)).await;
                        }
                        poise::FrameworkError::UnknownCommand { .. } => {
                            // Plain chat is routed to sessions by the event handler
                        }
                        err => {
                            error!("Framework error: {:?}", err);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot connected as {}", ready.user.name);

                // Every guild gets a config row; existing ones warm the cache
                for guild in &ready.guilds {
                    match server_config::get_or_create(&data.pool, guild.id.get() as i64).await {
                        Ok(config) => data.cache_config(&config),
                        Err(e) => warn!("Failed to load config for guild {}: {:?}", guild.id, e),
                    }
                }
                info!("Loaded config for {} guilds", ready.guilds.len());

                register_commands(ctx, framework, data.settings.guild_id).await?;

                if ready_tx.send(ctx.http.clone()).is_err() {
                    warn!("Scheduler launcher is gone; scheduled events will not run");
                }

                Ok(data)
            })
        })
        .build();

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = serenity::ClientBuilder::new(&settings.discord_token, intents)
        .framework(framework)
        .await
        .map_err(Error::Serenity)?;

    info!("Starting Discord client...");
    client.start().await.map_err(Error::Serenity)
}

/// Wait for the ready signal, then start the phase scheduler
fn spawn_scheduler_when_ready(ready_rx: oneshot::Receiver<Arc<Http>>, data: Arc<Data>) {
    tokio::spawn(async move {
        let http = match ready_rx.await {
            Ok(http) => http,
            Err(_) => {
                error!("Gateway never became ready; phase scheduler not started");
                return;
            }
        };

        let settings = &data.settings;
        let chat = Arc::new(DiscordChat::new(http, settings.message_delay()));
        let scheduler = PhaseScheduler::new(data.store.clone(), chat, settings.completion_grace());

        spawn_scheduler(scheduler, settings.scheduler_tick());
    });
}

/// Register commands globally or per-guild based on GUILD_ID
async fn register_commands(
    ctx: &serenity::Context,
    framework: &poise::Framework<Arc<Data>, Error>,
    guild_id: Option<u64>,
) -> Result<(), Error> {
    let commands = &framework.options().commands;

    match guild_id {
        Some(guild_id) => {
            let guild_id = GuildId::new(guild_id);
            poise::builtins::register_in_guild(ctx, commands, guild_id)
                .await
                .map_err(|e| {
                    error!("Failed to register guild commands for {}: {:?}", guild_id, e);
                    Error::Serenity(e)
                })?;
            info!("Registered {} commands in guild {}", commands.len(), guild_id);
        }
        None => {
            poise::builtins::register_globally(ctx, commands)
                .await
                .map_err(|e| {
                    error!("Failed to register commands globally: {:?}", e);
                    Error::Serenity(e)
                })?;
            info!(
                "Registered {} commands globally (may take up to an hour to appear)",
                commands.len()
            );
        }
    }

    Ok(())
}
