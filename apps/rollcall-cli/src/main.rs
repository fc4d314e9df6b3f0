mod camera;
mod demo;
mod ui;

use std::{path::Path, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::{stream::BoxStream, StreamExt};
use rollcall_camera::CameraDevice;
use rollcall_network::{AttendanceApi, HttpApiClient, NoticeBoard};
use rollcall_ops::{ensure_capture_dir, init_tracing, NoticeLog};
use rollcall_pages::{
    AccountForms, AttendanceDesk, AttendanceHistory, FaceRegistration, LoginController,
    LoginOutcome, NewStudent,
};
use rollcall_session::{SessionEvent, SessionMonitor};
use rollcall_types::{
    api::UserType, config::RollcallConfig, notice::Notice, outcome::ActionOutcome,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use crate::{
    camera::FrameSource,
    demo::demo_backend,
    ui::{UiCommand, UiMessage},
};

#[derive(Parser)]
#[command(name = "rollcall", about = "Attendance client for the face recognition backend")]
struct Cli {
    /// Config file; falls back to configs/dev.toml, then built-in defaults.
    #[arg(long, env = "ROLLCALL_CONFIG")]
    config: Option<String>,
    /// Use the scripted demo backend instead of the server.
    #[arg(long)]
    offline: bool,
    #[arg(long = "as", value_enum, default_value_t = Role::Faculty)]
    role: Role,
    #[arg(long)]
    id: Option<String>,
    #[arg(long, env = "ROLLCALL_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Role {
    Faculty,
    Student,
}

impl From<Role> for UserType {
    fn from(role: Role) -> Self {
        match role {
            Role::Faculty => UserType::Faculty,
            Role::Student => UserType::Student,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Log in and print the dashboard path.
    Login,
    /// Mark attendance from one camera frame, or for a test student.
    Mark {
        #[arg(long)]
        subject: Option<String>,
        /// Simulate recognition of S001..S004 instead of using the camera.
        #[arg(long)]
        test_student: Option<String>,
    },
    /// Capture registration images until complete or `--captures` runs out.
    Register {
        #[arg(long)]
        captures: Option<usize>,
    },
    /// Delete the face registration.
    Reset {
        #[arg(long)]
        yes: bool,
    },
    /// Show session and registration status.
    Status,
    /// List the student's attendance history.
    History,
    AddStudent {
        #[arg(long)]
        student_id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long)]
        student_password: String,
    },
    ChangePassword {
        #[arg(long)]
        current: String,
        #[arg(long = "new")]
        new_password: String,
    },
    /// Keep the session open under the inactivity monitor.
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    init_tracing(&config.ops)?;
    if let Some(dir) = &config.ops.capture_dir {
        ensure_capture_dir(dir)?;
    }

    if cli.offline {
        info!("Using the scripted demo backend");
        run(cli, config, demo_backend()).await
    } else {
        let api = HttpApiClient::new(&config.server)?;
        run(cli, config, api).await
    }
}

async fn run<A>(cli: Cli, config: RollcallConfig, api: A) -> Result<()>
where
    A: AttendanceApi + Clone + 'static,
{
    let notices = NoticeBoard::default();
    let log = NoticeLog::new();
    let mut shown = notices.receiver();
    let role = UserType::from(cli.role);

    let dashboard = authenticate(&cli, api.clone(), notices.clone()).await?;
    if dashboard.is_none() && !cli.offline && !matches!(cli.command, Command::Login) {
        warn!("No --id/--password given; requests run without a session");
    }

    let outcome = match cli.command {
        Command::Login => match dashboard {
            Some(target) => {
                println!("Logged in as {role}; dashboard at {target}");
                ActionOutcome::Completed
            }
            None => bail!("login needs --id and --password"),
        },
        Command::Mark {
            subject,
            test_student,
        } => {
            let mut desk: AttendanceDesk<FrameSource, A> =
                AttendanceDesk::new(&config, api, notices.clone());
            if let Some(subject) = subject {
                desk.select_subject(subject);
            }
            match test_student {
                Some(id) => {
                    desk.toggle_test_mode();
                    if !desk.select_test_student(&id) {
                        bail!("{id} is not a test student (S001-S004)");
                    }
                }
                None => {
                    desk.attach_camera(FrameSource::from_config(&config)).await;
                }
            }
            let outcome = desk.mark().await;
            for record in desk.feed().records() {
                println!("{}  {}", record.time_label, record.headline());
            }
            desk.close();
            outcome
        }
        Command::Register { captures } => {
            let mut page: FaceRegistration<FrameSource, A> =
                FaceRegistration::new(&config, api, notices.clone());
            page.attach_camera(FrameSource::from_config(&config)).await;
            let mut outcome = page.load_status().await;
            let mut remaining = captures.unwrap_or(usize::MAX);
            while outcome.is_completed() && remaining > 0 && !page.state().is_complete() {
                outcome = page.capture().await;
                remaining -= 1;
            }
            print_registration(&page);
            page.close();
            outcome
        }
        Command::Reset { yes } => {
            let mut page: FaceRegistration<FrameSource, A> =
                FaceRegistration::new(&config, api, notices.clone());
            page.load_status().await;
            let outcome = page.reset(yes).await;
            if !yes {
                println!("Pass --yes to delete the registration");
            }
            print_registration(&page);
            outcome
        }
        Command::Status => {
            let session = api.check_session().await?;
            println!(
                "Session: {}",
                if session.logged_in { "logged in" } else { "logged out" }
            );
            let mut page: FaceRegistration<FrameSource, A> =
                FaceRegistration::new(&config, api, notices.clone());
            let outcome = page.load_status().await;
            print_registration(&page);
            outcome
        }
        Command::History => {
            let mut history = AttendanceHistory::new(api);
            let outcome = history.load().await;
            for line in history.lines() {
                println!("{line}");
            }
            outcome
        }
        Command::AddStudent {
            student_id,
            name,
            email,
            student_password,
        } => {
            let forms = AccountForms::new(api, notices.clone());
            forms
                .add_student(&NewStudent {
                    student_id,
                    name,
                    email,
                    password: student_password,
                })
                .await
        }
        Command::ChangePassword {
            current,
            new_password,
        } => {
            let forms = AccountForms::new(api, notices.clone());
            forms.change_password(&current, &new_password).await
        }
        Command::Watch => {
            watch(&config, api, notices.clone(), role).await?;
            ActionOutcome::Completed
        }
    };

    while let Ok(notice) = shown.try_recv() {
        log.record(notice).await;
    }
    for notice in log.visible().await {
        print_notice(&notice);
    }
    match outcome.message() {
        Some(message) => bail!("{message}"),
        None => Ok(()),
    }
}

async fn authenticate<A: AttendanceApi>(
    cli: &Cli,
    api: A,
    notices: NoticeBoard,
) -> Result<Option<String>> {
    let (Some(id), Some(password)) = (cli.id.as_deref(), cli.password.as_deref()) else {
        return Ok(None);
    };
    let mut login = LoginController::new(api, notices);
    login.select_tab(cli.role.into());
    match login.submit(id, password).await {
        LoginOutcome::Redirect(target) => Ok(Some(target)),
        LoginOutcome::Rejected(message) => bail!("login rejected: {message}"),
        LoginOutcome::Invalid(errors) => bail!("login form invalid: {errors}"),
        LoginOutcome::TransportFailed(reason) => bail!("login failed: {reason}"),
    }
}

async fn watch<A>(config: &RollcallConfig, api: A, notices: NoticeBoard, role: UserType) -> Result<()>
where
    A: AttendanceApi + Clone + 'static,
{
    // The page's camera stays open for the whole watch and is released on exit.
    let mut desk: Option<AttendanceDesk<FrameSource, A>> = None;
    let mut registration: Option<FaceRegistration<FrameSource, A>> = None;
    match role {
        UserType::Faculty => {
            let mut page = AttendanceDesk::new(config, api.clone(), notices.clone());
            page.attach_camera(FrameSource::from_config(config)).await;
            desk = Some(page);
        }
        UserType::Student => {
            let mut page = FaceRegistration::new(config, api.clone(), notices.clone());
            page.attach_camera(FrameSource::from_config(config)).await;
            page.load_status().await;
            registration = Some(page);
        }
    }

    let mut monitor = SessionMonitor::new(config.session.clone(), Arc::new(api), notices.clone());
    let events = monitor.subscribe();
    monitor.start()?;

    let (ui_tx, ui_rx) = std::sync::mpsc::channel();
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
    let forwarder = tokio::spawn(forward(events, notices.subscribe(), ui_tx));
    let summary = format!("{role} @ {}", config.server.base_url);
    let screen = tokio::task::spawn_blocking(move || ui::run(ui_rx, cmd_tx, summary));

    while let Some(command) = cmd_rx.recv().await {
        match command {
            UiCommand::Activity(kind) => monitor.record_activity(kind).await,
            UiCommand::Continue => monitor.continue_session().await,
        }
    }
    let result = screen.await.context("watch screen panicked")?;

    monitor.stop();
    forwarder.abort();
    if let Some(page) = desk.as_mut() {
        page.close();
    }
    if let Some(page) = registration.as_mut() {
        page.close();
    }
    result
}

async fn forward(
    mut events: broadcast::Receiver<SessionEvent>,
    mut notices: BoxStream<'static, Notice>,
    ui: std::sync::mpsc::Sender<UiMessage>,
) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let finished = matches!(event, SessionEvent::Navigate { .. });
                    if ui.send(UiMessage::Session(event)).is_err() {
                        break;
                    }
                    if finished {
                        let _ = ui.send(UiMessage::Shutdown);
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Watch screen skipped {skipped} session events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            Some(notice) = notices.next() => {
                if ui.send(UiMessage::Notice(notice)).is_err() {
                    break;
                }
            }
        }
    }
}

fn print_registration<C, A>(page: &FaceRegistration<C, A>)
where
    C: CameraDevice,
    A: AttendanceApi,
{
    println!("{} ({}%)", page.progress_text(), page.progress().percent());
    for card in page.slot_cards() {
        let instruction = card.instruction.unwrap_or("");
        println!("  {:<20} {:?} {}", card.title, card.status, instruction);
    }
}

fn print_notice(notice: &Notice) {
    println!("[{:?}] {}", notice.level, notice.message);
}

fn load_config(path: Option<&str>) -> RollcallConfig {
    let path = path.unwrap_or("configs/dev.toml");
    if !Path::new(path).exists() {
        eprintln!("No config at '{path}'. Using internal defaults.");
        return default_config();
    }
    match RollcallConfig::from_file(path) {
        Ok(cfg) => {
            if let Err(err) = cfg.validate() {
                eprintln!("Invalid config in '{path}': {err}. Falling back to internal defaults.");
                default_config()
            } else {
                cfg
            }
        }
        Err(err) => {
            eprintln!("Failed to load config from '{path}': {err}. Falling back to internal defaults.");
            default_config()
        }
    }
}

fn default_config() -> RollcallConfig {
    let config = RollcallConfig::default();
    debug_assert!(config.validate().is_ok());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_credentials_and_subcommand() {
        let cli = Cli::try_parse_from([
            "rollcall",
            "--as",
            "student",
            "--id",
            "S001",
            "--password",
            "abc123",
            "register",
            "--captures",
            "2",
        ])
        .unwrap();
        assert_eq!(UserType::from(cli.role), UserType::Student);
        assert_eq!(cli.id.as_deref(), Some("S001"));
        assert!(matches!(cli.command, Command::Register { captures: Some(2) }));
    }

    #[test]
    fn test_student_mark_parses() {
        let cli = Cli::try_parse_from([
            "rollcall",
            "--offline",
            "mark",
            "--subject",
            "Math",
            "--test-student",
            "S002",
        ])
        .unwrap();
        assert!(cli.offline);
        match cli.command {
            Command::Mark {
                subject,
                test_student,
            } => {
                assert_eq!(subject.as_deref(), Some("Math"));
                assert_eq!(test_student.as_deref(), Some("S002"));
            }
            _ => panic!("expected mark"),
        }
    }

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let config = load_config(Some("does/not/exist.toml"));
        assert_eq!(config.registration.required_images, 4);
        assert_eq!(config.capture.feed_capacity, 10);
    }

    #[tokio::test]
    async fn offline_mark_runs_end_to_end() {
        let cli = Cli::try_parse_from([
            "rollcall",
            "--offline",
            "--id",
            "F001",
            "--password",
            "faculty1",
            "mark",
            "--test-student",
            "S003",
        ])
        .unwrap();
        let api = demo_backend();
        run(cli, default_config(), api.clone()).await.unwrap();
        assert_eq!(api.calls_to("/login"), 1);
        assert_eq!(api.calls_to("/mark_attendance"), 1);
    }
}
