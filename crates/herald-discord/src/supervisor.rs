use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use herald_scheduler::{GuildJobLoader, JobRegistry};
use herald_store::{GuildStore, GLOBAL_SCOPE};

use crate::signal::{GatewaySignal, CLOSE_NORMAL};

/// Re-authentication seam between the supervisor and the gateway client.
#[async_trait]
pub trait GatewaySession: Send + Sync {
    /// Validate the held credential against the gateway.
    async fn login(&self) -> anyhow::Result<()>;

    /// Ask the gateway client to resume a paused session start.
    async fn resume(&self) -> anyhow::Result<()>;
}

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Starting,
    Paused,
    Active,
    Reconnecting,
    Terminated,
}

/// Why the supervisor stopped processing signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Close code 1000: a normal, intentional closure.
    CleanClose,
    /// Re-authentication after a disconnect failed.
    LoginFailed,
    /// Explicit shutdown request.
    Shutdown,
    /// Every signal sender dropped.
    ChannelClosed,
}

/// Process-wide connection diagnostics.
///
/// The disconnect counter only ever grows; a process restart is the only
/// reset. The close diagnostic is overwritten on each disconnect.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    disconnects: AtomicU32,
    last_close: Mutex<Option<(u16, String)>>,
}

impl ConnectionStats {
    fn record_disconnect(&self, code: u16, reason: &str) -> u32 {
        *self.last_close.lock().unwrap() = Some((code, reason.to_string()));
        self.disconnects.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Cumulative disconnects since process start.
    pub fn disconnects(&self) -> u32 {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Most recent close code and reason, if any disconnect happened.
    pub fn last_close(&self) -> Option<(u16, String)> {
        self.last_close.lock().unwrap().clone()
    }
}

/// Drives the connection-resilience state machine from a single-consumer
/// stream of [`GatewaySignal`]s.
///
/// Loading failures and send failures never reach this state machine; the
/// scheduler and the supervisor are failure-isolated. The supervisor never
/// exits the process itself: it reports an [`ExitReason`] and the daemon
/// decides what that means for the process.
pub struct ConnectionSupervisor<G: GatewaySession> {
    gateway: G,
    loader: Arc<GuildJobLoader>,
    registry: Arc<JobRegistry>,
    store: Arc<GuildStore>,
    stats: Arc<ConnectionStats>,
    state: SupervisorState,
    default_prefix: String,
    disconnect_warn_threshold: u32,
}

impl<G: GatewaySession> ConnectionSupervisor<G> {
    pub fn new(
        gateway: G,
        loader: Arc<GuildJobLoader>,
        registry: Arc<JobRegistry>,
        store: Arc<GuildStore>,
        default_prefix: String,
        disconnect_warn_threshold: u32,
    ) -> Self {
        Self {
            gateway,
            loader,
            registry,
            store,
            stats: Arc::new(ConnectionStats::default()),
            state: SupervisorState::Starting,
            default_prefix,
            disconnect_warn_threshold,
        }
    }

    /// Connection diagnostics, shareable with the rest of the process.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Consume signals until a terminating transition, drain all scheduled
    /// tasks, and report why.
    ///
    /// Signals still queued after the terminating one are never processed.
    pub async fn run(mut self, mut signals: mpsc::Receiver<GatewaySignal>) -> ExitReason {
        let reason = loop {
            let Some(signal) = signals.recv().await else {
                break ExitReason::ChannelClosed;
            };
            if let Some(reason) = self.apply(signal).await {
                break reason;
            }
        };

        self.registry.stop_all();
        self.state = SupervisorState::Terminated;
        info!(?reason, "connection supervisor terminated");
        reason
    }

    /// Apply one signal; `Some` is a terminating transition.
    async fn apply(&mut self, signal: GatewaySignal) -> Option<ExitReason> {
        match signal {
            GatewaySignal::ClientReady => {
                self.state = SupervisorState::Active;
                info!("client ready, starting echo tasks");
                self.load_all_guilds();
                None
            }
            GatewaySignal::Ready => {
                let guilds = self.loader.known_guilds().len();
                info!(guilds, "gateway ready");
                None
            }
            GatewaySignal::Warn(info_msg) => {
                warn!(info = %info_msg, "gateway warning");
                None
            }
            GatewaySignal::Pause => {
                self.state = SupervisorState::Paused;
                if let Err(e) =
                    self.store
                        .set_default(GLOBAL_SCOPE, "prefix", &json!(self.default_prefix))
                {
                    warn!(error = %e, "failed to ensure default prefix");
                }
                if let Err(e) = self.gateway.resume().await {
                    warn!(error = %e, "gateway resume failed");
                }
                self.state = SupervisorState::Active;
                None
            }
            GatewaySignal::Error(err) => {
                error!(error = %err, "gateway client error");
                None
            }
            GatewaySignal::Disconnect { code, reason } => self.handle_disconnect(code, reason).await,
            GatewaySignal::Reconnecting => {
                warn!("gateway reconnecting");
                None
            }
            GatewaySignal::Shutdown => {
                info!("shutdown requested");
                Some(ExitReason::Shutdown)
            }
        }
    }

    async fn handle_disconnect(&mut self, code: u16, reason: String) -> Option<ExitReason> {
        let count = self.stats.record_disconnect(code, &reason);
        warn!(code, reason = %reason, "gateway disconnected");

        if code == CLOSE_NORMAL {
            warn!("disconnect with close code 1000, exiting");
            return Some(ExitReason::CleanClose);
        }

        self.state = SupervisorState::Reconnecting;
        if count >= self.disconnect_warn_threshold {
            // Log-only alerting: reconnects continue past the threshold.
            warn!(attempts = count, "reconnect attempt threshold reached");
        }

        warn!(attempt = count, "attempting to log in again");
        match self.gateway.login().await {
            Ok(()) => {
                self.state = SupervisorState::Active;
                None
            }
            Err(e) => {
                error!(error = %e, "login after disconnect failed, exiting");
                Some(ExitReason::LoginFailed)
            }
        }
    }

    /// Fire one load task per known guild, each independently tracked and
    /// logged so a failing guild never affects the others. The supervision
    /// itself runs detached: later lifecycle signals are not held up behind
    /// guild loading.
    fn load_all_guilds(&self) {
        let loader = Arc::clone(&self.loader);
        tokio::spawn(async move {
            let mut loads = JoinSet::new();
            for guild_id in loader.known_guilds() {
                let loader = Arc::clone(&loader);
                loads.spawn(async move {
                    let report = loader.load_jobs(&guild_id);
                    (guild_id, report)
                });
            }
            while let Some(outcome) = loads.join_next().await {
                match outcome {
                    Ok((guild_id, report)) => {
                        if report.rejected > 0 {
                            warn!(guild_id = %guild_id, rejected = report.rejected, "guild loaded with rejected jobs");
                        }
                    }
                    Err(e) => error!(error = %e, "guild load task failed"),
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_store::{db::init_db, EchoJob};
    use rusqlite::Connection;
    use std::sync::atomic::AtomicUsize;

    struct MockGateway {
        login_calls: AtomicUsize,
        resume_calls: AtomicUsize,
        fail_login: bool,
    }

    impl MockGateway {
        fn good() -> Self {
            Self {
                login_calls: AtomicUsize::new(0),
                resume_calls: AtomicUsize::new(0),
                fail_login: false,
            }
        }

        fn rejecting() -> Self {
            Self {
                fail_login: true,
                ..Self::good()
            }
        }
    }

    #[async_trait]
    impl GatewaySession for Arc<MockGateway> {
        async fn login(&self) -> anyhow::Result<()> {
            self.login_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_login {
                anyhow::bail!("invalid token")
            }
            Ok(())
        }

        async fn resume(&self) -> anyhow::Result<()> {
            self.resume_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct OpenSink;

    #[async_trait]
    impl herald_scheduler::ChannelSink for OpenSink {
        fn resolve_channel(&self, _channel_id: &str) -> bool {
            true
        }

        async fn send(&self, _channel_id: &str, _payload: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Fixture {
        gateway: Arc<MockGateway>,
        registry: Arc<JobRegistry>,
        store: Arc<GuildStore>,
        loader: Arc<GuildJobLoader>,
    }

    fn fixture(gateway: MockGateway) -> (Fixture, ConnectionSupervisor<Arc<MockGateway>>) {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        let store = Arc::new(GuildStore::new(conn));
        let registry = Arc::new(JobRegistry::new());
        let loader = Arc::new(GuildJobLoader::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::new(OpenSink),
        ));
        let gateway = Arc::new(gateway);

        let supervisor = ConnectionSupervisor::new(
            Arc::clone(&gateway),
            Arc::clone(&loader),
            Arc::clone(&registry),
            Arc::clone(&store),
            "!".to_string(),
            10,
        );
        (
            Fixture {
                gateway,
                registry,
                store,
                loader,
            },
            supervisor,
        )
    }

    fn persist_job(store: &GuildStore, guild_id: &str, identifier: &str) {
        store
            .set_jobs(
                guild_id,
                &[EchoJob {
                    identifier: identifier.to_string(),
                    text_channel_id: "1000".to_string(),
                    expression: "*/5 * * * *".to_string(),
                    payload: "hi".to_string(),
                    active: true,
                }],
            )
            .unwrap();
    }

    #[tokio::test]
    async fn clean_close_terminates_without_reconnect() {
        let (fx, mut supervisor) = fixture(MockGateway::good());

        let exit = supervisor
            .apply(GatewaySignal::Disconnect {
                code: 1000,
                reason: "bye".to_string(),
            })
            .await;

        assert_eq!(exit, Some(ExitReason::CleanClose));
        assert_eq!(fx.gateway.login_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn abnormal_close_increments_once_and_relogins() {
        let (fx, mut supervisor) = fixture(MockGateway::good());
        persist_job(&fx.store, "G1", "j1");
        fx.loader.load_jobs("G1");
        assert!(fx.registry.contains("j1"));

        let exit = supervisor
            .apply(GatewaySignal::Disconnect {
                code: 1006,
                reason: "abnormal closure".to_string(),
            })
            .await;

        assert_eq!(exit, None);
        assert_eq!(supervisor.state(), SupervisorState::Active);
        assert_eq!(supervisor.stats().disconnects(), 1);
        assert_eq!(fx.gateway.login_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            supervisor.stats().last_close(),
            Some((1006, "abnormal closure".to_string()))
        );
        // Reconnects never reload jobs; registered tasks stay untouched.
        assert!(fx.registry.contains("j1"));
        assert_eq!(fx.registry.len(), 1);
    }

    #[tokio::test]
    async fn failed_relogin_terminates() {
        let (fx, mut supervisor) = fixture(MockGateway::rejecting());

        let exit = supervisor
            .apply(GatewaySignal::Disconnect {
                code: 4004,
                reason: "authentication failed".to_string(),
            })
            .await;

        assert_eq!(exit, Some(ExitReason::LoginFailed));
        assert_eq!(fx.gateway.login_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn warnings_and_errors_do_not_transition() {
        let (_fx, mut supervisor) = fixture(MockGateway::good());
        supervisor.apply(GatewaySignal::ClientReady).await;
        assert_eq!(supervisor.state(), SupervisorState::Active);

        assert_eq!(
            supervisor
                .apply(GatewaySignal::Warn("rate limited".to_string()))
                .await,
            None
        );
        assert_eq!(
            supervisor
                .apply(GatewaySignal::Error("shard hiccup".to_string()))
                .await,
            None
        );
        assert_eq!(supervisor.state(), SupervisorState::Active);
    }

    #[tokio::test]
    async fn pause_installs_default_prefix_and_resumes() {
        let (fx, mut supervisor) = fixture(MockGateway::good());

        let exit = supervisor.apply(GatewaySignal::Pause).await;

        assert_eq!(exit, None);
        assert_eq!(supervisor.state(), SupervisorState::Active);
        assert_eq!(fx.gateway.resume_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            fx.store.get(GLOBAL_SCOPE, "prefix").unwrap().unwrap(),
            json!("!")
        );
    }

    #[tokio::test]
    async fn pause_never_overwrites_an_existing_prefix() {
        let (fx, mut supervisor) = fixture(MockGateway::good());
        fx.store.set(GLOBAL_SCOPE, "prefix", &json!("?")).unwrap();

        supervisor.apply(GatewaySignal::Pause).await;

        assert_eq!(
            fx.store.get(GLOBAL_SCOPE, "prefix").unwrap().unwrap(),
            json!("?")
        );
    }

    #[tokio::test]
    async fn threshold_logs_but_keeps_reconnecting() {
        let (fx, mut supervisor) = fixture(MockGateway::good());
        supervisor.disconnect_warn_threshold = 1;

        for _ in 0..3 {
            let exit = supervisor
                .apply(GatewaySignal::Disconnect {
                    code: 1006,
                    reason: "flaky".to_string(),
                })
                .await;
            assert_eq!(exit, None);
        }

        assert_eq!(supervisor.stats().disconnects(), 3);
        assert_eq!(fx.gateway.login_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn shutdown_drains_all_scheduled_tasks() {
        let (fx, supervisor) = fixture(MockGateway::good());
        persist_job(&fx.store, "G1", "j1");
        fx.loader.load_jobs("G1");
        assert_eq!(fx.registry.len(), 1);

        let (tx, rx) = mpsc::channel(8);
        let run = tokio::spawn(supervisor.run(rx));
        tx.send(GatewaySignal::Shutdown).await.unwrap();

        assert_eq!(run.await.unwrap(), ExitReason::Shutdown);
        assert!(fx.registry.is_empty());
    }

    #[tokio::test]
    async fn signals_after_a_terminating_one_are_never_processed() {
        let (fx, supervisor) = fixture(MockGateway::good());

        let (tx, rx) = mpsc::channel(8);
        tx.send(GatewaySignal::Disconnect {
            code: 1000,
            reason: "bye".to_string(),
        })
        .await
        .unwrap();
        tx.send(GatewaySignal::Disconnect {
            code: 1006,
            reason: "late".to_string(),
        })
        .await
        .unwrap();
        drop(tx);

        assert_eq!(supervisor.run(rx).await, ExitReason::CleanClose);
        // The queued 1006 was dropped unprocessed: no re-login happened.
        assert_eq!(fx.gateway.login_calls.load(Ordering::SeqCst), 0);
    }
}
