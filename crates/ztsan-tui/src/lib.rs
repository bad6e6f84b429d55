//! Terminal dashboard for the node pipeline
//!
//! A stateless projection of the latest snapshot: four stage columns, the
//! status aggregates, a notice area and the node creation form. Actions run
//! on their own tasks and report back as notices, so a slow backend never
//! freezes the frame loop.

use std::io::Stdout;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use thiserror::Error;
use tokio::sync::mpsc;
use ztsan_pipeline::{CommandDispatcher, DispatchResult, Notice, PollHandle};

pub mod app;
pub mod form;
mod ui;

pub use app::{App, Command};

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Run the dashboard until the user quits
///
/// The caller owns the poll loop and shuts it down afterwards.
pub async fn run_dashboard(dispatcher: CommandDispatcher, poll: PollHandle) -> Result<(), TuiError> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, dispatcher, poll).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

async fn event_loop(
    terminal: &mut Term,
    dispatcher: CommandDispatcher,
    poll: PollHandle,
) -> Result<(), TuiError> {
    let mut snapshots = poll.subscribe();
    let mut app = App::new(snapshots.borrow_and_update().clone());
    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel::<Notice>();

    loop {
        if snapshots.has_changed().unwrap_or(false) {
            app.apply_snapshot(snapshots.borrow_and_update().clone());
        }
        let now = Instant::now();
        while let Ok(notice) = notice_rx.try_recv() {
            app.push_notice(notice, now);
        }
        app.expire_notices(now);

        terminal.draw(|frame| ui::draw(frame, &app))?;

        if !event::poll(Duration::from_millis(150))? {
            continue;
        }
        let CEvent::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.handle_key(key, Instant::now()) {
            Some(Command::Quit) => break,
            Some(Command::Refresh) => {
                if poll.request_refresh() {
                    app.push_notice(Notice::info("Refreshing"), Instant::now());
                }
            }
            Some(command) => spawn_command(&dispatcher, command, notice_tx.clone()),
            None => {}
        }
    }

    tracing::debug!("dashboard closed");
    Ok(())
}

fn spawn_command(
    dispatcher: &CommandDispatcher,
    command: Command,
    notices: mpsc::UnboundedSender<Notice>,
) {
    let dispatcher = dispatcher.clone();
    tokio::spawn(async move {
        let result: DispatchResult<Vec<Notice>> = match command {
            Command::SimulateAttack(id) => dispatcher.simulate_attack(&id).await.map(|o| o.notices),
            Command::CalculateTrust(id) => dispatcher.calculate_trust(&id).await.map(|o| o.notices),
            Command::MonitorBehavior(id) => {
                dispatcher.monitor_behavior(&id).await.map(|o| o.notices)
            }
            Command::Block(id) => dispatcher.block_node(&id, None).await.map(|o| o.notices),
            Command::Unblock(id) => dispatcher.unblock_node(&id).await.map(|o| o.notices),
            Command::ToggleMode => dispatcher.toggle_mode().await.map(|o| o.notices),
            Command::CreateNode(spec, options) => {
                dispatcher.create_node(spec, options).await.map(|o| o.notices)
            }
            Command::Quit | Command::Refresh => Ok(Vec::new()),
        };

        let batch = result.unwrap_or_else(|err| vec![err.notice()]);
        for notice in batch {
            if notices.send(notice).is_err() {
                break;
            }
        }
    });
}
