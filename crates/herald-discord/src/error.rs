use thiserror::Error;

/// Errors from the Discord gateway glue.
#[derive(Debug, Error)]
pub enum DiscordError {
    /// serenity client construction or transport error.
    #[error("Gateway error: {0}")]
    Gateway(#[from] serenity::Error),

    /// A channel identifier did not parse as a Discord snowflake.
    #[error("Invalid channel id: {0}")]
    InvalidChannelId(String),
}
