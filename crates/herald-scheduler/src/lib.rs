//! `herald-scheduler` — per-guild echo job scheduling.
//!
//! # Overview
//!
//! Job definitions persist in the guild settings store. Once the gateway
//! signals readiness, the [`loader::GuildJobLoader`] validates each
//! definition and spawns one timer task per active job, keyed by job
//! identifier in the process-wide [`registry::JobRegistry`]. Each task
//! computes its next fire time from the job's cron expression and posts the
//! payload through the [`sink::ChannelSink`] seam.
//!
//! # Failure isolation
//!
//! | Failure                        | Effect                                 |
//! |--------------------------------|----------------------------------------|
//! | Storage read fails             | Guild skipped, process continues       |
//! | Channel unresolved             | Job skipped, rest of guild loads       |
//! | Cron expression invalid        | Job skipped, rest of guild loads       |
//! | Send fails on a fire           | Logged, schedule continues             |

pub mod error;
pub mod expression;
pub mod loader;
pub mod registry;
pub mod runner;
pub mod sink;

pub use error::{Result, SchedulerError};
pub use loader::{GuildJobLoader, LoadReport};
pub use registry::{JobHandle, JobRegistry};
pub use sink::ChannelSink;
