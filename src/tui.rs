//! Terminal front end: owns the terminal, decodes crossterm events for the
//! controller and paints each [`Frame`].

use crate::DiffNavError;
use crate::controller::{FOOTER_ROWS, Flow, Focus, TITLE_ROWS, ViewController};
use crate::event::{Event, Key, MouseAction};
use crate::frame::{Frame, Highlight, PaneLine, TreeRow};
use crate::pane::{Column, Intent, Layout, PaneRow, Side};
use crossterm::event::{
    self as term, DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Layout as Split, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use std::io::{self, Stdout};
use std::ops::Range;
use tracing::debug;

const TAB: &str = "    ";

fn terminal_error(err: io::Error) -> DiffNavError {
    DiffNavError::TerminalError {
        message: err.to_string(),
    }
}

/// Run the interactive view until the quit action
pub fn run(controller: &mut ViewController) -> Result<(), DiffNavError> {
    enable_raw_mode().map_err(terminal_error)?;
    let mut stdout = io::stdout();
    if let Err(err) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
        let _ = disable_raw_mode();
        return Err(terminal_error(err));
    }

    let mut terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(terminal) => terminal,
        Err(err) => {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
            return Err(terminal_error(err));
        }
    };

    let result = event_loop(&mut terminal, controller);
    restore(&mut terminal);
    result
}

fn restore(terminal: &mut Terminal<CrosstermBackend<Stdout>>) {
    let _ = disable_raw_mode();
    let _ = execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    );
    let _ = terminal.show_cursor();
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    controller: &mut ViewController,
) -> Result<(), DiffNavError> {
    let (width, height) = crossterm::terminal::size().map_err(terminal_error)?;
    controller.handle(Event::Loaded);
    controller.handle(Event::Resize { width, height });

    loop {
        let view = controller.frame();
        terminal
            .draw(|f| draw(f, &view))
            .map_err(terminal_error)?;

        let Some(event) = convert(term::read().map_err(terminal_error)?) else {
            continue;
        };
        if controller.handle(event) == Flow::Quit {
            debug!("quit requested");
            return Ok(());
        }
    }
}

/// Translate a crossterm event; `None` for events the view ignores
pub fn convert(event: term::Event) -> Option<Event> {
    match event {
        term::Event::Key(key) => convert_key(key).map(Event::Key),
        term::Event::Mouse(mouse) => convert_mouse(mouse),
        term::Event::Resize(width, height) => Some(Event::Resize { width, height }),
        _ => None,
    }
}

fn convert_key(key: KeyEvent) -> Option<Key> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    let key = match key.code {
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Key::Ctrl(c.to_ascii_lowercase())
        }
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::Tab => Key::Tab,
        KeyCode::BackTab => Key::BackTab,
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Esc,
        KeyCode::Backspace => Key::Backspace,
        _ => return None,
    };
    Some(key)
}

fn convert_mouse(mouse: MouseEvent) -> Option<Event> {
    let action = match mouse.kind {
        MouseEventKind::ScrollUp => MouseAction::ScrollUp,
        MouseEventKind::ScrollDown => MouseAction::ScrollDown,
        MouseEventKind::Down(MouseButton::Left) => MouseAction::Click,
        _ => return None,
    };
    Some(Event::Mouse {
        action,
        column: mouse.column,
        row: mouse.row,
    })
}

/// Paint one frame
pub fn draw(f: &mut ratatui::Frame, view: &Frame) {
    let rows = Split::vertical([Constraint::Min(1), Constraint::Length(FOOTER_ROWS)]).split(f.area());
    let columns = Split::horizontal([Constraint::Length(view.tree_width), Constraint::Min(1)])
        .split(rows[0]);

    if view.tree_width > 0 {
        draw_tree(f, columns[0], view);
    }
    draw_pane(f, columns[1], view);

    let status = Style::new().fg(Color::DarkGray);
    f.render_widget(Paragraph::new(view.status.as_str()).style(status), rows[1]);
}

fn draw_tree(f: &mut ratatui::Frame, area: Rect, view: &Frame) {
    let lines: Vec<Line> = view
        .tree
        .iter()
        .map(|row| tree_line(row, view.focus == Focus::Tree))
        .collect();

    let block = Block::new()
        .borders(Borders::RIGHT)
        .border_style(Style::new().fg(Color::DarkGray));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn tree_line(row: &TreeRow, focused: bool) -> Line<'static> {
    let mut spans = vec![Span::raw(row.label())];

    if let Some(kind) = row.kind {
        let color = match kind.symbol() {
            'A' => Color::Green,
            'D' => Color::Red,
            _ => Color::Yellow,
        };
        spans.push(Span::styled(
            format!(" {}", kind.symbol()),
            Style::new().fg(color),
        ));
        if row.added > 0 {
            spans.push(Span::styled(
                format!(" +{}", row.added),
                Style::new().fg(Color::Green),
            ));
        }
        if row.removed > 0 {
            spans.push(Span::styled(
                format!(" -{}", row.removed),
                Style::new().fg(Color::Red),
            ));
        }
    }

    let line = Line::from(spans);
    match (row.selected, focused) {
        (true, true) => line.style(Style::new().add_modifier(Modifier::REVERSED)),
        (true, false) => line.style(Style::new().bg(Color::DarkGray)),
        _ => line,
    }
}

fn draw_pane(f: &mut ratatui::Frame, area: Rect, view: &Frame) {
    let parts = Split::vertical([Constraint::Length(TITLE_ROWS), Constraint::Min(0)]).split(area);

    let mut title = Style::new().add_modifier(Modifier::BOLD);
    if view.focus == Focus::Pane {
        title = title.fg(Color::Cyan);
    }
    f.render_widget(Paragraph::new(view.title.as_str()).style(title), parts[0]);

    match view.layout {
        Layout::Unified => {
            let lines: Vec<Line> = view.pane.iter().map(unified_line).collect();
            f.render_widget(Paragraph::new(lines), parts[1]);
        }
        Layout::SideBySide => {
            let halves = Split::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(parts[1]);
            let (left, right): (Vec<Line>, Vec<Line>) =
                view.pane.iter().map(split_lines).unzip();
            f.render_widget(Paragraph::new(left), halves[0]);
            f.render_widget(Paragraph::new(right), halves[1]);
        }
    }
}

fn notice_line(row: &PaneRow) -> Option<Line<'static>> {
    match row {
        PaneRow::Header(text) => Some(Line::styled(text.clone(), Style::new().fg(Color::Cyan))),
        PaneRow::Notice(text) => Some(Line::styled(
            text.clone(),
            Style::new()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )),
        PaneRow::Line(_) | PaneRow::Pair { .. } => None,
    }
}

fn unified_line(line: &PaneLine) -> Line<'static> {
    if let Some(notice) = notice_line(&line.row) {
        return notice;
    }
    match &line.row {
        PaneRow::Line(side) => {
            let gutter = format!("{} {} ", number(side.old_number), number(side.new_number));
            side_line(side, gutter, &line.highlights, Column::Left)
        }
        _ => Line::default(),
    }
}

fn split_lines(line: &PaneLine) -> (Line<'static>, Line<'static>) {
    if let Some(notice) = notice_line(&line.row) {
        return (notice, Line::default());
    }

    let cell = |side: &Option<Side>, column: Column| match side {
        Some(side) => {
            let n = if column == Column::Left {
                side.old_number
            } else {
                side.new_number
            };
            side_line(side, format!("{} ", number(n)), &line.highlights, column)
        }
        None => Line::default(),
    };

    match &line.row {
        PaneRow::Pair { left, right } => (cell(left, Column::Left), cell(right, Column::Right)),
        PaneRow::Line(side) => (
            side_line(side, String::new(), &line.highlights, Column::Left),
            Line::default(),
        ),
        _ => (Line::default(), Line::default()),
    }
}

fn number(n: Option<u32>) -> String {
    match n {
        Some(n) => format!("{n:>4}"),
        None => "    ".to_string(),
    }
}

fn side_line(side: &Side, gutter: String, highlights: &[Highlight], column: Column) -> Line<'static> {
    let (base, emphasis) = match side.intent {
        Intent::Context => (Style::new(), Style::new()),
        Intent::Added => (
            Style::new().fg(Color::Green),
            Style::new().fg(Color::Black).bg(Color::Green),
        ),
        Intent::Removed => (
            Style::new().fg(Color::Red),
            Style::new().fg(Color::Black).bg(Color::Red),
        ),
    };

    let marks: Vec<(Range<usize>, Style)> = highlights
        .iter()
        .filter(|h| h.column == column)
        .map(|h| {
            let bg = if h.current { Color::LightYellow } else { Color::Yellow };
            (h.range.clone(), Style::new().fg(Color::Black).bg(bg))
        })
        .collect();

    let mut spans = vec![
        Span::styled(gutter, Style::new().fg(Color::DarkGray)),
        Span::styled(side.intent.marker().to_string(), base),
    ];
    spans.extend(styled_segments(&side.text, base, &side.spans, emphasis, &marks));
    Line::from(spans)
}

/// Split `text` at every span and highlight boundary and style each piece.
/// Highlights win over intraline spans.
fn styled_segments(
    text: &str,
    base: Style,
    spans: &[Range<usize>],
    emphasis: Style,
    marks: &[(Range<usize>, Style)],
) -> Vec<Span<'static>> {
    let mut cuts: Vec<usize> = vec![0, text.len()];
    for range in spans.iter().chain(marks.iter().map(|(r, _)| r)) {
        cuts.push(range.start.min(text.len()));
        cuts.push(range.end.min(text.len()));
    }
    cuts.sort_unstable();
    cuts.dedup();

    cuts.windows(2)
        .filter_map(|pair| {
            let (start, end) = (pair[0], pair[1]);
            let piece = text.get(start..end)?;
            let inside = |r: &Range<usize>| r.start <= start && end <= r.end;

            let mut style = base;
            if spans.iter().any(inside) {
                style = emphasis;
            }
            if let Some((_, mark)) = marks.iter().find(|(r, _)| inside(r)) {
                style = *mark;
            }
            Some(Span::styled(piece.replace('\t', TAB), style))
        })
        .collect()
}
