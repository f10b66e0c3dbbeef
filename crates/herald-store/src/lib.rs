//! `herald-store` — SQLite-backed per-guild settings and job storage.
//!
//! Every guild owns a flat key-value namespace of JSON documents; the
//! reserved scope id [`store::GLOBAL_SCOPE`] carries process-global settings
//! such as the default command prefix. Echo job definitions live under the
//! [`store::JOBS_KEY`] key as a JSON array, in the camelCase on-disk format
//! inherited from earlier deployments.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use store::{GuildStore, GLOBAL_SCOPE, JOBS_KEY};
pub use types::EchoJob;
