use std::sync::atomic::{AtomicBool, Ordering};

use serenity::all::{ConnectionStage, Ready, ResumedEvent, ShardStageUpdateEvent};
use serenity::async_trait;
use serenity::prelude::{Context, EventHandler};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::signal::GatewaySignal;

/// Serenity event handler that translates gateway events into
/// [`GatewaySignal`]s for the connection supervisor.
///
/// Holds no application state beyond the signal sender; everything the
/// supervisor needs travels inside the signals.
pub struct SignalHandler {
    signals: mpsc::Sender<GatewaySignal>,
    client_ready_sent: AtomicBool,
}

impl SignalHandler {
    pub fn new(signals: mpsc::Sender<GatewaySignal>) -> Self {
        Self {
            signals,
            client_ready_sent: AtomicBool::new(false),
        }
    }

    async fn forward(&self, signal: GatewaySignal) {
        if self.signals.send(signal).await.is_err() {
            debug!("supervisor signal channel closed");
        }
    }
}

#[async_trait]
impl EventHandler for SignalHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(name = %ready.user.name, "Discord gateway session ready");
        // ClientReady fires exactly once per process; reconnect readies only
        // produce Ready so jobs are never loaded twice.
        if !self.client_ready_sent.swap(true, Ordering::SeqCst) {
            self.forward(GatewaySignal::ClientReady).await;
        }
        self.forward(GatewaySignal::Ready).await;
    }

    async fn resume(&self, _ctx: Context, _event: ResumedEvent) {
        self.forward(GatewaySignal::Ready).await;
    }

    async fn shard_stage_update(&self, _ctx: Context, event: ShardStageUpdateEvent) {
        if matches!(event.new, ConnectionStage::Connecting) {
            self.forward(GatewaySignal::Reconnecting).await;
        }
    }
}
