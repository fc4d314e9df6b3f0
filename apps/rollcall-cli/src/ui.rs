use std::{
    collections::VecDeque,
    sync::mpsc::{Receiver, TryRecvError},
    time::Duration,
};

use anyhow::Result;
use chrono::Local;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event as CEvent, KeyCode, KeyEventKind,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Terminal,
};
use rollcall_session::{ActivityKind, SessionEvent, SessionExit};
use rollcall_types::notice::{Notice, NoticeLevel};
use tokio::sync::mpsc::UnboundedSender;

const MAX_LOG_ENTRIES: usize = 120;

pub enum UiMessage {
    Session(SessionEvent),
    Notice(Notice),
    Shutdown,
}

pub enum UiCommand {
    Activity(ActivityKind),
    Continue,
}

pub fn run(
    receiver: Receiver<UiMessage>,
    commands: UnboundedSender<UiCommand>,
    summary: String,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let res = run_loop(&mut terminal, receiver, &commands, summary.as_str());

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    res
}

fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    receiver: Receiver<UiMessage>,
    commands: &UnboundedSender<UiCommand>,
    summary: &str,
) -> Result<()> {
    let mut logs: VecDeque<String> = VecDeque::with_capacity(MAX_LOG_ENTRIES);
    let mut last_status = String::from("Session active");
    let mut countdown: Option<String> = None;
    let mut should_close = false;

    loop {
        let mut receiver_closed = false;
        loop {
            match receiver.try_recv() {
                Ok(UiMessage::Session(SessionEvent::Countdown { label })) => {
                    countdown = Some(label);
                }
                Ok(UiMessage::Session(event)) => {
                    if !matches!(event, SessionEvent::WarningShown { .. }) {
                        countdown = None;
                    }
                    last_status = summarize_status(&event);
                    push_log(&mut logs, format_event(&event));
                }
                Ok(UiMessage::Notice(notice)) => {
                    push_log(&mut logs, format_notice(&notice));
                }
                Ok(UiMessage::Shutdown) => {
                    should_close = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    receiver_closed = true;
                    should_close = true;
                    break;
                }
            }
        }

        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints(
                    [
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Min(0),
                    ]
                    .as_ref(),
                )
                .split(f.size());

            let header = Paragraph::new(Line::from(vec![
                Span::styled(
                    "Rollcall",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::raw(last_status.clone()),
                Span::raw("  "),
                Span::styled("as:", Style::default().fg(Color::Magenta)),
                Span::raw(" "),
                Span::raw(summary),
                Span::raw("  "),
                Span::styled("q", Style::default().fg(Color::Yellow)),
                Span::raw(" quit"),
            ]))
            .block(Block::default().borders(Borders::ALL).title("Session"));
            f.render_widget(header, chunks[0]);

            let warning = match &countdown {
                Some(label) => Paragraph::new(Line::from(vec![
                    Span::styled(
                        format!("Your session will expire in {label}."),
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  Press "),
                    Span::styled("c", Style::default().fg(Color::Yellow)),
                    Span::raw(" to continue."),
                ])),
                None => Paragraph::new("No pending warning."),
            }
            .block(Block::default().borders(Borders::ALL).title("Inactivity"));
            f.render_widget(warning, chunks[1]);

            let items: Vec<ListItem> = logs
                .iter()
                .rev()
                .map(|entry| ListItem::new(entry.clone()))
                .collect();
            let list = List::new(items)
                .block(Block::default().borders(Borders::ALL).title("Recent events"));
            f.render_widget(list, chunks[2]);
        })?;

        if should_close && receiver_closed {
            break;
        }

        if event::poll(Duration::from_millis(100))? {
            let command = match event::read()? {
                CEvent::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Char('c') => Some(UiCommand::Continue),
                    _ => Some(UiCommand::Activity(ActivityKind::KeyPress)),
                },
                CEvent::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::Down(_) => Some(UiCommand::Activity(ActivityKind::PointerDown)),
                    MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                        Some(UiCommand::Activity(ActivityKind::PointerMove))
                    }
                    MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {
                        Some(UiCommand::Activity(ActivityKind::Scroll))
                    }
                    _ => None,
                },
                _ => None,
            };
            if let Some(command) = command {
                if commands.send(command).is_err() {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn push_log(logs: &mut VecDeque<String>, entry: String) {
    if logs.len() == MAX_LOG_ENTRIES {
        logs.pop_front();
    }
    logs.push_back(entry);
}

fn summarize_status(event: &SessionEvent) -> String {
    match event {
        SessionEvent::WarningShown { .. } => "Session expiring soon".to_string(),
        SessionEvent::Countdown { label } => format!("Expiring in {label}"),
        SessionEvent::Extended | SessionEvent::Dismissed => "Session active".to_string(),
        SessionEvent::Expired(SessionExit::TimedOut) => "Session timed out".to_string(),
        SessionEvent::Expired(SessionExit::Invalidated) => "Logged out by server".to_string(),
        SessionEvent::Navigate { to } => format!("Redirected to {to}"),
    }
}

fn format_event(event: &SessionEvent) -> String {
    let timestamp = Local::now().format("%H:%M:%S");
    match event {
        SessionEvent::WarningShown { remaining } => format!(
            "[{}] Inactivity warning, {}s left",
            timestamp,
            remaining.as_secs()
        ),
        SessionEvent::Countdown { label } => format!("[{}] Countdown {}", timestamp, label),
        SessionEvent::Extended => format!("[{}] Session extended", timestamp),
        SessionEvent::Dismissed => format!("[{}] Activity detected; warning dismissed", timestamp),
        SessionEvent::Expired(exit) => format!("[{}] Session expired ({:?})", timestamp, exit),
        SessionEvent::Navigate { to } => format!("[{}] Navigating to {}", timestamp, to),
    }
}

fn format_notice(notice: &Notice) -> String {
    let tag = match notice.level {
        NoticeLevel::Success => "ok",
        NoticeLevel::Error => "error",
        NoticeLevel::Info => "info",
        NoticeLevel::Warning => "warn",
    };
    format!(
        "[{}] {} {}",
        notice.created_at.format("%H:%M:%S"),
        tag,
        notice.message
    )
}
