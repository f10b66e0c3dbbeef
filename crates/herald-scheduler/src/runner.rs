use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, warn};

use herald_store::EchoJob;

use crate::error::Result;
use crate::expression;
use crate::registry::JobHandle;
use crate::sink::ChannelSink;

/// Spawn the timer task for one echo job and hand back its handle.
///
/// The task sleeps until the expression's next fire time, posts the payload
/// through the sink, and repeats. A failed send is logged and the schedule
/// continues; the next fire is the only retry. Fails fast when the
/// expression does not parse, before anything is spawned.
pub fn spawn_echo_task(job: EchoJob, sink: Arc<dyn ChannelSink>) -> Result<JobHandle> {
    let schedule = expression::parse(&job.expression)?;
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        loop {
            let Some(next) = expression::next_fire(&schedule, Utc::now()) else {
                debug!(job_id = %job.identifier, "schedule exhausted");
                break;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    if let Err(e) = sink.send(&job.text_channel_id, &job.payload).await {
                        warn!(
                            job_id = %job.identifier,
                            channel_id = %job.text_channel_id,
                            error = %e,
                            "echo delivery failed"
                        );
                    }
                }
                changed = stop_rx.changed() => {
                    // A closed channel means the handle is gone; stop too.
                    if changed.is_err() || *stop_rx.borrow() {
                        debug!(job_id = %job.identifier, "echo task stopped");
                        break;
                    }
                }
            }
        }
    });

    Ok(JobHandle::new(stop_tx, task))
}
