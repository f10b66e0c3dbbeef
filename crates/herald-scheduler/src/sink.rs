use async_trait::async_trait;

/// Outbound seam between the scheduler and the gateway client.
///
/// The loader resolves target channels against the gateway's known channel
/// set before a job is registered; the task runner delivers payloads through
/// the same seam on every fire.
#[async_trait]
pub trait ChannelSink: Send + Sync {
    /// Whether `channel_id` resolves to a known text channel.
    fn resolve_channel(&self, channel_id: &str) -> bool;

    /// Deliver `payload` to `channel_id`.
    async fn send(&self, channel_id: &str, payload: &str) -> anyhow::Result<()>;
}
