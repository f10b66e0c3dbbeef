use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::all::{Cache, ChannelId, GatewayIntents, Http};
use serenity::Client;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use herald_core::config::DiscordConfig;
use herald_scheduler::ChannelSink;

use crate::error::DiscordError;
use crate::handler::SignalHandler;
use crate::send;
use crate::signal::{GatewaySignal, CLOSE_ABNORMAL, CLOSE_NORMAL};
use crate::supervisor::GatewaySession;

/// Discord gateway adapter.
///
/// Builds serenity clients and keeps the gateway session running, feeding
/// lifecycle signals to the connection supervisor. Transport mechanics live
/// here; reconnect-or-terminate policy is the supervisor's alone.
pub struct DiscordAdapter {
    config: DiscordConfig,
    signals: mpsc::Sender<GatewaySignal>,
}

impl DiscordAdapter {
    pub fn new(config: &DiscordConfig, signals: mpsc::Sender<GatewaySignal>) -> Self {
        Self {
            config: config.clone(),
            signals,
        }
    }

    fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES
    }

    /// Build a serenity client wired to the signal-forwarding handler.
    pub async fn build_client(&self) -> Result<Client, serenity::Error> {
        Client::builder(&self.config.bot_token, Self::intents())
            .event_handler(SignalHandler::new(self.signals.clone()))
            .await
    }

    /// Drive the gateway session for the life of the process.
    ///
    /// `Client::start` only returns once the session is beyond serenity's
    /// own recovery. The exit is reported as a disconnect signal (a clean
    /// stop maps to close code 1000, an error to 1006) and a fresh client
    /// is built for the next attempt. If the supervisor decides to exit
    /// instead, its channel closes and this loop ends with it.
    pub async fn run(self, mut client: Client) {
        loop {
            info!("Discord: gateway connecting");

            let (code, reason) = match client.start().await {
                Ok(()) => (CLOSE_NORMAL, "gateway stopped cleanly".to_string()),
                Err(e) => (CLOSE_ABNORMAL, e.to_string()),
            };
            warn!(code, reason = %reason, "Discord: gateway session ended");

            if self
                .signals
                .send(GatewaySignal::Disconnect { code, reason })
                .await
                .is_err()
            {
                debug!("supervisor gone, stopping gateway loop");
                return;
            }

            tokio::time::sleep(Duration::from_secs(5)).await;

            client = loop {
                match self.build_client().await {
                    Ok(c) => break c,
                    Err(e) => {
                        error!(error = %e, "Discord: client rebuild failed, retrying in 30s");
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                }
            };
        }
    }
}

/// [`ChannelSink`] over the serenity HTTP client and gateway cache.
pub struct DiscordSink {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl DiscordSink {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }

    fn parse_channel(channel_id: &str) -> Option<ChannelId> {
        channel_id
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .map(ChannelId::new)
    }
}

#[async_trait]
impl ChannelSink for DiscordSink {
    fn resolve_channel(&self, channel_id: &str) -> bool {
        Self::parse_channel(channel_id)
            .map(|id| self.cache.channel(id).is_some())
            .unwrap_or(false)
    }

    async fn send(&self, channel_id: &str, payload: &str) -> anyhow::Result<()> {
        let id = Self::parse_channel(channel_id)
            .ok_or_else(|| DiscordError::InvalidChannelId(channel_id.to_string()))?;
        send::send_chunked(&self.http, id, payload)
            .await
            .map_err(DiscordError::Gateway)?;
        Ok(())
    }
}

/// [`GatewaySession`] over the serenity REST client.
pub struct DiscordGateway {
    http: Arc<Http>,
}

impl DiscordGateway {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl GatewaySession for DiscordGateway {
    /// Re-validate the held token against the REST API. Once the token
    /// checks out the shard runner re-establishes the session on its own.
    async fn login(&self) -> anyhow::Result<()> {
        let user = self.http.get_current_user().await?;
        debug!(name = %user.name, "token re-validated");
        Ok(())
    }

    /// The shard runner resumes a paused session start by itself; only the
    /// supervisor's bookkeeping depends on this call.
    async fn resume(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
