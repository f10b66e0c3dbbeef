/// Close code for a normal, intentional closure. Ends the process.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code reported when the transport dropped without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Typed gateway lifecycle signal consumed by the connection supervisor.
///
/// The serenity event handler and the adapter's run loop translate raw
/// gateway events into these values; the supervisor is the single consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewaySignal {
    /// First successful ready of the process. Triggers guild job loading.
    ClientReady,
    /// The gateway session (re-)entered the ready state.
    Ready,
    /// Non-fatal gateway warning.
    Warn(String),
    /// Session start was paused by the gateway client.
    Pause,
    /// Gateway client error. Logged, never fatal.
    Error(String),
    /// The gateway connection dropped.
    Disconnect { code: u16, reason: String },
    /// The gateway client is re-establishing the session.
    Reconnecting,
    /// Process shutdown requested.
    Shutdown,
}
