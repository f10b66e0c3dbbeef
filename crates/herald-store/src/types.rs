use serde::{Deserialize, Serialize};

/// A persisted echo job definition.
///
/// Serialized with camelCase field names so guild data written by earlier
/// deployments loads unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoJob {
    /// Globally unique job id across all guilds — the registry key.
    pub identifier: String,
    /// Target text channel within the gateway's channel address space.
    pub text_channel_id: String,
    /// Cron schedule expression, five or six fields.
    pub expression: String,
    /// Message content posted on each fire.
    pub payload: String,
    /// Inactive jobs are skipped at load time and never registered.
    pub active: bool,
}
