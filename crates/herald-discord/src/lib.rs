pub mod adapter;
pub mod error;
pub mod handler;
pub mod send;
pub mod signal;
pub mod supervisor;

pub use adapter::{DiscordAdapter, DiscordGateway, DiscordSink};
pub use error::DiscordError;
pub use signal::GatewaySignal;
pub use supervisor::{ConnectionSupervisor, ExitReason, GatewaySession};
