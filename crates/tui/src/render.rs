use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Paragraph},
};

use driver::ProcessState;

use crate::{
    layout::Arrangement,
    panes::{Align, CommandPane, LineClass, Pane, PaneId, Panes, StatusPane, ViewLine},
};

const PROMPT: &str = "(gdb) ";

/// What the frame is drawn from
pub struct Screen<'a> {
    pub panes: &'a Panes,
    pub arrangement: &'a Arrangement,
    pub focused: Option<PaneId>,
    pub status: PaneId,
}

pub fn draw(frame: &mut Frame, screen: &Screen<'_>) {
    let [main_area, status_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(frame.area());

    draw_arrangement(frame, main_area, screen.arrangement, screen);
    if let Some(Pane::Status(status)) = screen.panes.get(screen.status) {
        draw_status(frame, status_area, status);
    }
}

fn draw_arrangement(frame: &mut Frame, area: Rect, arrangement: &Arrangement, screen: &Screen<'_>) {
    let (layout, children) = match arrangement {
        Arrangement::Rows(children) => (Layout::vertical(fill(children.len())), children),
        Arrangement::Columns(children) => (Layout::horizontal(fill(children.len())), children),
        Arrangement::Pane(id) => {
            if let Some(pane) = screen.panes.get(*id) {
                draw_pane(frame, area, pane, screen.focused == Some(*id));
            }
            return;
        }
    };

    let areas = layout.split(area);
    for (child, child_area) in children.iter().zip(areas.iter()) {
        draw_arrangement(frame, *child_area, child, screen);
    }
}

fn fill(count: usize) -> Vec<Constraint> {
    vec![Constraint::Fill(1); count]
}

fn draw_pane(frame: &mut Frame, area: Rect, pane: &Pane, focused: bool) {
    let (style, title_style) = if focused {
        (Style::default(), Style::default().bold().fg(Color::Cyan))
    } else {
        (Style::default().dim(), Style::default().dim())
    };
    let block = Block::bordered().title(Span::styled(pane.title(), title_style));
    let inner = block.inner(area);
    frame.render_widget(block.style(style), area);

    match pane {
        Pane::Command(command) => draw_command(frame, inner, command, pane, focused),
        _ => draw_lines(frame, inner, pane, focused, style),
    }
}

fn draw_command(frame: &mut Frame, area: Rect, command: &CommandPane, pane: &Pane, focused: bool) {
    let [scrollback, input_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(area);
    let style = if focused {
        Style::default()
    } else {
        Style::default().dim()
    };
    draw_lines(frame, scrollback, pane, false, style);

    let input = Line::from(vec![
        Span::styled(PROMPT, Style::default().fg(Color::Green)),
        Span::raw(command.input()),
    ]);
    frame.render_widget(Paragraph::new(input).style(style), input_area);

    if focused {
        let offset = u16::try_from(PROMPT.len() + command.cursor_width()).unwrap_or(u16::MAX);
        let x = input_area
            .x
            .saturating_add(offset)
            .min(input_area.right().saturating_sub(1));
        frame.set_cursor_position(Position::new(x, input_area.y));
    }
}

/// Draw the window of a pane's lines that keeps its focused line visible
fn draw_lines(frame: &mut Frame, area: Rect, pane: &Pane, highlight_focus: bool, style: Style) {
    let view = pane.view();
    let height = area.height as usize;
    let offset = scroll_offset(view.focus(), view.lines().len(), height);

    let lines: Vec<Line> = view
        .lines()
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(index, line)| to_line(line, highlight_focus && index == view.focus()))
        .collect();
    frame.render_widget(Paragraph::new(lines).style(style), area);
}

pub(crate) fn scroll_offset(focus: usize, len: usize, height: usize) -> usize {
    focus
        .saturating_sub(height / 2)
        .min(len.saturating_sub(height))
}

fn to_line(line: &ViewLine, selected: bool) -> Line<'_> {
    let mut style = match line.class {
        LineClass::Normal => Style::default(),
        LineClass::Error => Style::default().fg(Color::Red),
        LineClass::Info => Style::default().fg(Color::Yellow),
        LineClass::Current => Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    };
    if selected && line.class != LineClass::Current {
        style = style.bg(Color::Blue);
    }
    let alignment = match line.align {
        Align::Left => Alignment::Left,
        Align::Center => Alignment::Center,
        Align::Right => Alignment::Right,
    };
    Line::from(Span::styled(line.text.as_str(), style)).alignment(alignment)
}

fn draw_status(frame: &mut Frame, area: Rect, status: &StatusPane) {
    let state = format!("{} ", status.state());
    let [legend_area, state_area] =
        Layout::horizontal([Constraint::Fill(1), Constraint::Length(state.len() as u16)])
            .areas(area);
    let background = Style::default().bg(Color::DarkGray);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::raw(" "),
            Span::styled(status.legend(), Style::default().bold()),
        ]))
        .style(background),
        legend_area,
    );
    frame.render_widget(
        Paragraph::new(
            Line::from(Span::styled(state, state_style(status.process_state())))
                .alignment(Alignment::Right),
        )
        .style(background),
        state_area,
    );
}

fn state_style(state: Option<ProcessState>) -> Style {
    match state {
        Some(ProcessState::Running) => Style::default().fg(Color::Green).bold(),
        Some(ProcessState::Stopped) => Style::default().fg(Color::Yellow).bold(),
        Some(ProcessState::Exited) => Style::default().fg(Color::Red).bold(),
        Some(ProcessState::Detached) | None => Style::default(),
    }
}

#[cfg(test)]
mod tests {
    use bus::EventBus;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use driver::testing::FakeDriver;
    use ratatui::{
        Terminal,
        backend::{Backend, TestBackend},
    };

    use super::*;
    use crate::{layout::LayoutBuilder, panes::LEGEND};

    #[test]
    fn offset_keeps_the_focus_visible() {
        assert_eq!(scroll_offset(0, 100, 10), 0);
        assert_eq!(scroll_offset(50, 100, 10), 45);
        assert_eq!(scroll_offset(99, 100, 10), 90);
        assert_eq!(scroll_offset(3, 4, 10), 0);
    }

    #[test]
    fn process_states_are_coloured() {
        assert_eq!(state_style(Some(ProcessState::Running)).fg, Some(Color::Green));
        assert_eq!(state_style(Some(ProcessState::Stopped)).fg, Some(Color::Yellow));
        assert_eq!(state_style(Some(ProcessState::Exited)).fg, Some(Color::Red));
        assert_eq!(state_style(None).fg, None);
    }

    #[test]
    fn draws_titles_and_legend() {
        let node = config::LayoutNode::Columns(vec![
            config::LayoutNode::Leaf("breakpoints".to_string()),
            config::LayoutNode::Leaf("command".to_string()),
        ]);
        let mut panes = Panes::default();
        let bus = EventBus::new();
        let arrangement = LayoutBuilder::new(&mut panes, &bus).build(&node).unwrap();
        let status = panes.insert(Pane::Status(StatusPane::new()));
        let focused = arrangement.panes().first().copied();

        let mut terminal = Terminal::new(TestBackend::new(80, 10)).unwrap();
        terminal
            .draw(|frame| {
                draw(
                    frame,
                    &Screen {
                        panes: &panes,
                        arrangement: &arrangement,
                        focused,
                        status,
                    },
                )
            })
            .unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("Breakpoints"));
        assert!(text.contains("Commands"));
        assert!(text.contains(PROMPT.trim_end()));
        assert!(text.contains(LEGEND));
    }

    #[test]
    fn cursor_follows_the_display_width_of_the_input() {
        let node = config::LayoutNode::Rows(vec![config::LayoutNode::Leaf("command".to_string())]);
        let mut panes = Panes::default();
        let bus = EventBus::new();
        let arrangement = LayoutBuilder::new(&mut panes, &bus).build(&node).unwrap();
        let status = panes.insert(Pane::Status(StatusPane::new()));
        let command = arrangement.panes()[0];
        let mut terminal = Terminal::new(TestBackend::new(40, 8)).unwrap();

        let mut cursor_x = |panes: &Panes| {
            terminal
                .draw(|frame| {
                    draw(
                        frame,
                        &Screen {
                            panes,
                            arrangement: &arrangement,
                            focused: Some(command),
                            status,
                        },
                    )
                })
                .unwrap();
            terminal.backend_mut().get_cursor_position().unwrap().x
        };

        let start = cursor_x(&panes);
        let driver = FakeDriver::new();
        for c in "日本".chars() {
            panes
                .get_mut(command)
                .unwrap()
                .handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE), &driver);
        }
        assert_eq!(cursor_x(&panes), start + 4);
    }
}
