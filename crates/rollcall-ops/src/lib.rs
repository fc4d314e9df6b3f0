//! Operational helpers: logging, notice history, capture archive.

use std::{path::PathBuf, sync::Arc};

use chrono::Utc;
use futures::StreamExt;
use rollcall_network::NoticeBoard;
use rollcall_types::{
    config::OpsConfig,
    notice::{Notice, NoticeTarget},
    Result, RollcallError,
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| RollcallError::Ops(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| RollcallError::Ops(format!("tracing init error: {err}")))?;
    Ok(())
}

/// In-memory history of every notice shown during a run.
#[derive(Clone, Default)]
pub struct NoticeLog {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, notice: Notice) {
        self.notices.lock().await.push(notice);
    }

    /// Records everything published on `board` until the board is dropped.
    pub fn follow(&self, board: &NoticeBoard) -> JoinHandle<()> {
        let log = self.clone();
        let mut stream = board.subscribe();
        tokio::spawn(async move {
            while let Some(notice) = stream.next().await {
                log.record(notice).await;
            }
        })
    }

    pub async fn snapshot(&self) -> Vec<Notice> {
        self.notices.lock().await.clone()
    }

    /// Notices still on screen: unexpired, and only the newest per target.
    pub async fn visible(&self) -> Vec<Notice> {
        let now = Utc::now();
        let notices = self.notices.lock().await;
        let mut latest: Vec<Notice> = Vec::new();
        for notice in notices.iter().rev() {
            if notice.is_expired(now) {
                continue;
            }
            let replaces_field = matches!(notice.target, NoticeTarget::Field(_));
            if replaces_field || !latest.iter().any(|n| n.target == notice.target) {
                latest.push(notice.clone());
            }
        }
        latest.reverse();
        latest
    }
}

pub fn ensure_capture_dir(path: &str) -> Result<PathBuf> {
    let dir = PathBuf::from(path);
    std::fs::create_dir_all(&dir)
        .map_err(|err| RollcallError::Ops(format!("failed to create capture dir: {err}")))?;
    info!("Capture directory ready at {:?}", dir);
    Ok(dir)
}
