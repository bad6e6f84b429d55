//! Dashboard state between frames

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ztsan_pipeline::{CreateOptions, Notice, PipelineView, Snapshot};
use ztsan_types::{Node, NodeSpec, Stage};

use crate::form::NodeForm;

/// How long a notice stays on screen
pub const NOTICE_TTL: Duration = Duration::from_secs(5);
/// Oldest notices are dropped beyond this
pub const MAX_NOTICES: usize = 6;

/// What a key press asks the runtime to do
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Quit,
    Refresh,
    ToggleMode,
    SimulateAttack(String),
    CalculateTrust(String),
    MonitorBehavior(String),
    Block(String),
    Unblock(String),
    CreateNode(NodeSpec, CreateOptions),
}

pub struct App {
    snapshot: Arc<Snapshot>,
    pub view: PipelineView,
    pub column: usize,
    pub row: usize,
    selected_id: Option<String>,
    notices: VecDeque<(Notice, Instant)>,
    pub form: Option<NodeForm>,
}

impl App {
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        let view = PipelineView::from_snapshot(&snapshot);
        Self {
            snapshot,
            view,
            column: 0,
            row: 0,
            selected_id: None,
            notices: VecDeque::new(),
            form: None,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Rebuild the view from a newly published snapshot
    ///
    /// The selection follows the selected node while it stays in the same
    /// column, otherwise it is clamped to the column.
    pub fn apply_snapshot(&mut self, snapshot: Arc<Snapshot>) {
        self.view = PipelineView::from_snapshot(&snapshot);
        self.snapshot = snapshot;

        let bucket = self.view.bucket(self.stage());
        if let Some(id) = self.selected_id.as_deref() {
            if let Some(row) = bucket.iter().position(|n| n.id.as_deref() == Some(id)) {
                self.row = row;
            }
        }
        self.row = self.row.min(bucket.len().saturating_sub(1));
        self.remember_selection();
    }

    pub fn stage(&self) -> Stage {
        Stage::PIPELINE[self.column.min(Stage::PIPELINE.len() - 1)]
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.view.node_at(self.stage(), self.row)
    }

    fn selected_node_id(&self) -> Option<String> {
        self.selected_node().and_then(|n| n.id.clone())
    }

    fn remember_selection(&mut self) {
        self.selected_id = self.selected_node_id();
    }

    pub fn move_left(&mut self) {
        self.column = self.column.saturating_sub(1);
        self.clamp_row();
    }

    pub fn move_right(&mut self) {
        self.column = (self.column + 1).min(Stage::PIPELINE.len() - 1);
        self.clamp_row();
    }

    pub fn move_up(&mut self) {
        self.row = self.row.saturating_sub(1);
        self.remember_selection();
    }

    pub fn move_down(&mut self) {
        if self.row + 1 < self.view.bucket(self.stage()).len() {
            self.row += 1;
        }
        self.remember_selection();
    }

    fn clamp_row(&mut self) {
        let len = self.view.bucket(self.stage()).len();
        self.row = self.row.min(len.saturating_sub(1));
        self.remember_selection();
    }

    pub fn push_notice(&mut self, notice: Notice, now: Instant) {
        self.notices.push_back((notice, now));
        while self.notices.len() > MAX_NOTICES {
            self.notices.pop_front();
        }
    }

    pub fn expire_notices(&mut self, now: Instant) {
        self.notices
            .retain(|(_, at)| now.saturating_duration_since(*at) < NOTICE_TTL);
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter().map(|(notice, _)| notice)
    }

    /// Translate a key press; form input is consumed here
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Option<Command> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Command::Quit);
        }
        if self.form.is_some() {
            return self.handle_form_key(key, now);
        }

        let selected = self.selected_node_id();
        let on_selected = |make: fn(String) -> Command| selected.clone().map(make);

        let command = match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => Some(Command::Quit),
            KeyCode::Char('r') | KeyCode::Char('R') => Some(Command::Refresh),
            KeyCode::Char('m') | KeyCode::Char('M') => Some(Command::ToggleMode),
            KeyCode::Char('a') | KeyCode::Char('A') => on_selected(Command::SimulateAttack),
            KeyCode::Char('c') | KeyCode::Char('C') => on_selected(Command::CalculateTrust),
            KeyCode::Char('w') | KeyCode::Char('W') => on_selected(Command::MonitorBehavior),
            KeyCode::Char('b') | KeyCode::Char('B') => on_selected(Command::Block),
            KeyCode::Char('u') | KeyCode::Char('U') => on_selected(Command::Unblock),
            KeyCode::Char('n') | KeyCode::Char('N') => {
                self.form = Some(NodeForm::new());
                return None;
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.move_left();
                return None;
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.move_right();
                return None;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_up();
                return None;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_down();
                return None;
            }
            _ => return None,
        };

        if command.is_none() {
            self.push_notice(Notice::info("Select a node first"), now);
        }
        command
    }

    fn handle_form_key(&mut self, key: KeyEvent, now: Instant) -> Option<Command> {
        let form = self.form.as_mut()?;
        match key.code {
            KeyCode::Esc => self.form = None,
            KeyCode::Tab => form.switch_tab(),
            KeyCode::Down => form.focus_next(),
            KeyCode::Up | KeyCode::BackTab => form.focus_prev(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(c) => form.input(c),
            KeyCode::Enter => match form.build() {
                Ok((spec, options)) => {
                    self.form = None;
                    return Some(Command::CreateNode(spec, options));
                }
                Err(reason) => self.push_notice(Notice::warning(reason), now),
            },
            _ => {}
        }
        None
    }
}
