use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;
use ztsan_pipeline::{LinkState, NoticeLevel};
use ztsan_types::{Node, Stage, SystemMode, MISSING};

use crate::app::App;
use crate::form::{FormTab, NodeForm};

pub fn draw(frame: &mut Frame<'_>, app: &App) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(9),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, vertical[0], app);
    render_summary(frame, vertical[1], app);
    render_pipeline(frame, vertical[2], app);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(vertical[3]);
    render_details(frame, bottom[0], app.selected_node());
    render_notices(frame, bottom[1], app);

    let footer = Paragraph::new(
        "N new node | A attack | C trust | W monitor | B block | U unblock | M mode | R refresh | Q quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Hotkeys"));
    frame.render_widget(footer, vertical[4]);

    if let Some(form) = app.form.as_ref() {
        render_form(frame, frame.area(), form);
    }
}

fn render_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let snapshot = app.snapshot();
    let mode = match snapshot.mode {
        Some(SystemMode::Production) => Span::styled(
            " PRODUCTION ",
            Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        ),
        Some(SystemMode::Demo) => Span::styled(
            " DEMO ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ),
        None => Span::raw(" mode unknown "),
    };
    let link = match &snapshot.link {
        LinkState::Connecting => Span::styled("connecting", Style::default().fg(Color::Yellow)),
        LinkState::Online => Span::styled("online", Style::default().fg(Color::Green)),
        LinkState::Offline { kind, .. } => {
            Span::styled(kind.to_string(), Style::default().fg(Color::Red))
        }
    };
    let fetched = snapshot
        .fetched_at
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| MISSING.to_string());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " Zero Trust SAN ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        mode,
        Span::raw(" | backend "),
        link,
        Span::raw(format!(" | poll #{} at {}", snapshot.version, fetched)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn render_summary(frame: &mut Frame<'_>, area: Rect, app: &App) {
    // The offline banner replaces the aggregates until a poll succeeds.
    if let LinkState::Offline { kind, detail } = &app.snapshot().link {
        let banner = Paragraph::new(format!(
            "Backend {}: {} (showing last known nodes)",
            kind, detail
        ))
        .style(Style::default().fg(Color::White).bg(Color::Red))
        .block(Block::default().borders(Borders::ALL).title("Offline"));
        frame.render_widget(banner, area);
        return;
    }

    let counts = app.view.counts;
    let mut spans = vec![
        Span::raw(format!(" Total {} ", counts.total)),
        Span::styled(format!(" Active {} ", counts.active), Style::default().fg(Color::Green)),
        Span::styled(format!(" Blocked {} ", counts.blocked), Style::default().fg(Color::Red)),
        Span::raw(format!(" Other {} ", counts.other)),
    ];
    if app.view.unstaged > 0 {
        spans.push(Span::styled(
            format!(" Unstaged {} ", app.view.unstaged),
            Style::default().fg(Color::DarkGray),
        ));
    }
    let summary =
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL).title("Nodes"));
    frame.render_widget(summary, area);
}

fn render_pipeline(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    for (idx, (stage, nodes)) in app.view.columns().enumerate() {
        let selected = (idx == app.column).then_some(app.row);
        let items: Vec<ListItem<'_>> = nodes
            .iter()
            .enumerate()
            .map(|(row, node)| {
                let style = if selected == Some(row) {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                };
                ListItem::new(node_line(node)).style(style)
            })
            .collect();

        let mut block = Block::default()
            .borders(Borders::ALL)
            .title(format!("{} ({})", stage, nodes.len()))
            .border_style(Style::default().fg(stage_color(stage)));
        if idx == app.column {
            block = block.title_style(Style::default().add_modifier(Modifier::BOLD));
        }
        frame.render_widget(List::new(items).block(block), columns[idx]);
    }
}

fn node_line(node: &Node) -> String {
    match node.displayed_score() {
        Some(score) => format!("{} {} [{}]", node.short_id(), node.ip_or_missing(), score),
        None => format!("{} {}", node.short_id(), node.ip_or_missing()),
    }
}

fn stage_color(stage: Stage) -> Color {
    match stage {
        Stage::Verification => Color::Yellow,
        Stage::Scoring => Color::Blue,
        Stage::ActiveSession => Color::Green,
        Stage::Blocked => Color::Red,
    }
}

fn render_details(frame: &mut Frame<'_>, area: Rect, node: Option<&Node>) {
    let details = node
        .map(node_details)
        .unwrap_or_else(|| "No node selected".to_string());
    frame.render_widget(
        Paragraph::new(details)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Node Detail")),
        area,
    );
}

fn node_details(node: &Node) -> String {
    let field = |value: Option<&str>| value.unwrap_or(MISSING).to_string();
    format!(
        "id: {}\nip: {}\nstage: {} | status: {}\ntrust: {} | access: {}\nupdated: {}\nlogs: {} | last: {}",
        field(node.id.as_deref()),
        node.ip_or_missing(),
        field(node.stage_raw.as_deref()),
        field(node.status_raw.as_deref()),
        node.displayed_score()
            .map_or_else(|| MISSING.to_string(), |s| s.to_string()),
        field(node.access_level.as_deref()),
        field(node.updated_at.as_deref()),
        node.log_count(),
        field(node.last_log_message()),
    )
}

fn render_notices(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let items: Vec<ListItem<'_>> = app
        .notices()
        .map(|notice| {
            let color = match notice.level {
                NoticeLevel::Info => Color::Cyan,
                NoticeLevel::Success => Color::Green,
                NoticeLevel::Warning => Color::Yellow,
                NoticeLevel::Error => Color::Red,
            };
            ListItem::new(notice.message.clone()).style(Style::default().fg(color))
        })
        .collect();
    frame.render_widget(
        List::new(items).block(Block::default().borders(Borders::ALL).title("Notices")),
        area,
    );
}

fn render_form(frame: &mut Frame<'_>, area: Rect, form: &NodeForm) {
    let height = form.fields().len() as u16 + 4;
    let popup = centered(area, 60, height);
    frame.render_widget(Clear, popup);

    let tabs = match form.tab {
        FormTab::Preset => "[Preset]  Custom ",
        FormTab::Custom => " Preset  [Custom]",
    };
    let focused = form.focused();
    let mut lines = vec![
        Line::from(Span::styled(tabs, Style::default().add_modifier(Modifier::BOLD))),
        Line::from(""),
    ];
    lines.extend(form.fields().iter().map(|field| {
        let style = if *field == focused {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::raw(format!("{:<28}", field.label())),
            Span::styled(form.value(*field), style),
        ])
    }));

    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("New Node (Tab switch, Space toggle, Enter create, Esc cancel)"),
        ),
        popup,
    );
}

fn centered(area: Rect, width_pct: u16, height: u16) -> Rect {
    let width = (u32::from(area.width) * u32::from(width_pct.min(100)) / 100) as u16;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
