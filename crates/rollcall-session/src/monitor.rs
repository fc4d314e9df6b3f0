use std::{sync::Arc, time::Duration};

use rollcall_network::{AttendanceApi, NoticeBoard};
use rollcall_types::{
    config::SessionConfig,
    notice::{Notice, NoticeLevel},
    Result,
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{interval, sleep, Instant, MissedTickBehavior},
};
use tracing::{info, trace, warn};

use crate::{
    clock::{
        format_countdown, ActivityKind, SessionClock, SessionExit, SessionPhase,
        SessionTransition,
    },
    session_error,
};

const EXTENDED_TOAST: &str = "Session extended successfully!";
const EXPIRED_TOAST: &str = "Session expired. Redirecting to login...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    WarningShown { remaining: Duration },
    Countdown { label: String },
    Extended,
    Dismissed,
    Expired(SessionExit),
    /// Terminal navigation; emitted at most once per monitor.
    Navigate { to: String },
}

struct Shared<A> {
    config: SessionConfig,
    api: Arc<A>,
    clock: Mutex<SessionClock>,
    events: broadcast::Sender<SessionEvent>,
    notices: NoticeBoard,
}

impl<A: AttendanceApi> Shared<A> {
    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    async fn apply(&self, transition: SessionTransition) {
        match transition {
            SessionTransition::WarningShown { remaining } => {
                warn!("Session idle; expiring in {}", format_countdown(remaining));
                self.emit(SessionEvent::WarningShown { remaining });
            }
            SessionTransition::Extended => {
                self.notices
                    .publish(Notice::toast(NoticeLevel::Success, EXTENDED_TOAST));
                self.emit(SessionEvent::Extended);
            }
            SessionTransition::Dismissed => self.emit(SessionEvent::Dismissed),
            SessionTransition::Expired(exit) => self.finish(exit).await,
        }
    }

    async fn finish(&self, exit: SessionExit) {
        self.emit(SessionEvent::Expired(exit));
        let target = match exit {
            SessionExit::TimedOut => {
                self.notices
                    .publish(Notice::toast(NoticeLevel::Warning, EXPIRED_TOAST));
                sleep(self.config.redirect_delay()).await;
                self.config.logout_path.clone()
            }
            SessionExit::Invalidated => self.config.expired_redirect.clone(),
        };
        info!("Session ended ({:?}); navigating to {}", exit, target);
        if let Err(err) = self.api.navigate(&target).await {
            warn!("Navigation to {} failed: {err}", target);
        }
        self.emit(SessionEvent::Navigate { to: target });
    }
}

/// Per-page session watchdog.
///
/// Two independent tasks share one [`SessionClock`]: a ticker that drives
/// the warning and countdown, and a poller that asks the server whether the
/// session still exists. Whichever reaches the exit first takes it.
pub struct SessionMonitor<A: AttendanceApi + 'static> {
    shared: Arc<Shared<A>>,
    tasks: Vec<JoinHandle<()>>,
}

impl<A: AttendanceApi + 'static> SessionMonitor<A> {
    pub fn new(config: SessionConfig, api: Arc<A>, notices: NoticeBoard) -> Self {
        let (events, _) = broadcast::channel(256);
        let clock = SessionClock::new(&config, Instant::now());
        Self {
            shared: Arc::new(Shared {
                config,
                api,
                clock: Mutex::new(clock),
                events,
                notices,
            }),
            tasks: Vec::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    pub fn start(&mut self) -> Result<()> {
        if !self.tasks.is_empty() {
            return Err(session_error("session monitor already started"));
        }
        info!(
            "Session monitor started: timeout {:?}, warning {:?}, poll {:?}",
            self.shared.config.timeout(),
            self.shared.config.warning_window(),
            self.shared.config.poll_interval()
        );
        self.shared
            .clock
            .try_lock()
            .map_err(|_| session_error("session clock locked before start"))?
            .record_activity(Instant::now());
        self.tasks.push(tokio::spawn(tick_loop(Arc::clone(&self.shared))));
        self.tasks.push(tokio::spawn(poll_loop(Arc::clone(&self.shared))));
        Ok(())
    }

    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    pub async fn record_activity(&self, kind: ActivityKind) {
        trace!("activity {:?}", kind);
        let transition = self.shared.clock.lock().await.record_activity(Instant::now());
        if let Some(transition) = transition {
            self.shared.apply(transition).await;
        }
    }

    pub async fn continue_session(&self) {
        let transition = self
            .shared
            .clock
            .lock()
            .await
            .continue_session(Instant::now());
        if let Some(transition) = transition {
            self.shared.apply(transition).await;
        }
    }

    pub async fn phase(&self) -> SessionPhase {
        self.shared.clock.lock().await.phase()
    }

    pub async fn countdown_label(&self) -> Option<String> {
        self.shared
            .clock
            .lock()
            .await
            .countdown_label(Instant::now())
    }
}

impl<A: AttendanceApi + 'static> Drop for SessionMonitor<A> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn tick_loop<A: AttendanceApi>(shared: Arc<Shared<A>>) {
    let mut ticker = interval(shared.config.tick());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let now = Instant::now();
        let (transition, countdown, terminated) = {
            let mut clock = shared.clock.lock().await;
            let transition = clock.tick(now);
            (transition, clock.countdown_label(now), clock.is_terminated())
        };
        if let Some(transition) = transition {
            shared.apply(transition).await;
        } else if let Some(label) = countdown {
            shared.emit(SessionEvent::Countdown { label });
        }
        if terminated {
            break;
        }
    }
}

async fn poll_loop<A: AttendanceApi>(shared: Arc<Shared<A>>) {
    let mut ticker = interval(shared.config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the first check is one period in.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if shared.clock.lock().await.is_terminated() {
            break;
        }
        match shared.api.check_session().await {
            Ok(status) => {
                let transition = shared.clock.lock().await.server_status(status.logged_in);
                if let Some(transition) = transition {
                    shared.apply(transition).await;
                    break;
                }
            }
            Err(err) => warn!("Session check failed: {err}"),
        }
    }
}
