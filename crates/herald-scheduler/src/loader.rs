use std::sync::Arc;

use tracing::{error, info};

use herald_store::GuildStore;

use crate::registry::JobRegistry;
use crate::runner;
use crate::sink::ChannelSink;

/// Loads persisted job definitions for a guild and starts the valid ones.
pub struct GuildJobLoader {
    store: Arc<GuildStore>,
    registry: Arc<JobRegistry>,
    sink: Arc<dyn ChannelSink>,
}

/// Outcome of one guild's load pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Tasks registered and started.
    pub started: usize,
    /// Definitions skipped because they are inactive.
    pub inactive: usize,
    /// Definitions rejected: unresolved channel or invalid expression.
    pub rejected: usize,
}

impl GuildJobLoader {
    pub fn new(
        store: Arc<GuildStore>,
        registry: Arc<JobRegistry>,
        sink: Arc<dyn ChannelSink>,
    ) -> Self {
        Self {
            store,
            registry,
            sink,
        }
    }

    /// Load and start every valid, active job persisted for `guild_id`.
    ///
    /// Failures stay guild-scoped: a storage error skips the whole guild, an
    /// invalid definition skips that one job. Nothing here aborts the
    /// process or writes to persisted storage. Re-entrant loads are safe;
    /// the registry replaces handles keyed by the same identifier instead of
    /// duplicating them.
    pub fn load_jobs(&self, guild_id: &str) -> LoadReport {
        let mut report = LoadReport::default();

        let jobs = match self.store.jobs(guild_id) {
            Ok(jobs) => jobs,
            Err(e) => {
                error!(guild_id = %guild_id, error = %e, "failed to read guild jobs, guild skipped");
                return report;
            }
        };

        for job in jobs {
            if !job.active {
                report.inactive += 1;
                continue;
            }
            if !self.sink.resolve_channel(&job.text_channel_id) {
                error!(
                    guild_id = %guild_id,
                    job_id = %job.identifier,
                    channel_id = %job.text_channel_id,
                    "text channel not found, job skipped"
                );
                report.rejected += 1;
                continue;
            }
            let identifier = job.identifier.clone();
            match runner::spawn_echo_task(job, Arc::clone(&self.sink)) {
                Ok(handle) => {
                    self.registry.register(&identifier, handle);
                    report.started += 1;
                }
                Err(e) => {
                    error!(guild_id = %guild_id, job_id = %identifier, error = %e, "job rejected");
                    report.rejected += 1;
                }
            }
        }

        info!(
            guild_id = %guild_id,
            started = report.started,
            inactive = report.inactive,
            rejected = report.rejected,
            "guild jobs loaded"
        );
        report
    }

    /// Known guild ids from the settings store, empty on a read failure.
    pub fn known_guilds(&self) -> Vec<String> {
        match self.store.guild_ids() {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "failed to enumerate guilds");
                Vec::new()
            }
        }
    }
}
