use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs};

use super::app::{App, FocusArea};
use crate::controller::Phase;
use crate::deadline::{normalize_timestamp, remaining};
use crate::filter::DisplayFilter;
use crate::routes;

pub(super) fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);
    draw_error(frame, app, chunks[1]);
    draw_tabs(frame, app, chunks[2]);
    draw_links(frame, app, chunks[3]);
    draw_filter(frame, app, chunks[4]);
    draw_tasks(frame, app, chunks[5]);
    draw_status(frame, app, chunks[6]);
}

fn focus_border(app: &App, area: FocusArea) -> Style {
    if app.focus() == area {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let line = Line::from(vec![
        Span::styled("tasktab", Style::default().fg(Color::Black).bg(Color::White)),
        Span::raw("  "),
        Span::styled(app.base_url(), Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_error(frame: &mut Frame, app: &App, area: Rect) {
    let text = app.state().error_message().unwrap_or_default();
    let banner = Paragraph::new(Span::styled(
        text,
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(banner, area);
}

fn draw_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.state();
    let tabs_focused = app.focus() == FocusArea::Tabs;

    let titles: Vec<Line> = state
        .lists()
        .iter()
        .enumerate()
        .map(|(i, list)| {
            let mut style = Style::default();
            if tabs_focused && app.focused_tab() == Some(i) {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            Line::from(Span::styled(format!("{} {}", i + 1, list.title), style))
        })
        .collect();

    let title = match state.phase() {
        Phase::NoListsLoaded => "Lists (loading)",
        Phase::ListsLoaded if state.lists().is_empty() => "Lists (none)",
        Phase::ListsLoaded => "Lists",
    };

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(focus_border(app, FocusArea::Tabs))
                .title(title),
        )
        .select(state.selected_index().unwrap_or(0))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        );
    frame.render_widget(tabs, area);
}

fn draw_links(frame: &mut Frame, app: &App, area: Rect) {
    let key = Style::default().fg(Color::Cyan);
    let mut spans = vec![
        Span::styled("n", key),
        Span::raw(format!(" new list {}   ", routes::NEW_LIST)),
    ];
    if let Some(id) = app.state().selected_list_id() {
        spans.push(Span::styled("e", key));
        spans.push(Span::raw(format!(" edit list {}   ", routes::edit_list(id))));
    }
    spans.push(Span::styled("t", key));
    spans.push(Span::raw(format!(" new task {}", routes::NEW_TASK)));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_filter(frame: &mut Frame, app: &App, area: Rect) {
    let current = app.state().display_filter();
    let mut spans = vec![Span::styled("Show: ", focus_border(app, FocusArea::Filter))];
    for filter in DisplayFilter::ALL {
        let (mark, style) = if filter == current {
            ("(x)", Style::default().add_modifier(Modifier::BOLD))
        } else {
            ("( )", Style::default().fg(Color::DarkGray))
        };
        spans.push(Span::styled(format!("{mark} {}  ", filter.label()), style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_tasks(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.state();
    let now = app.now();

    let items: Vec<ListItem> = state
        .visible_tasks()
        .into_iter()
        .map(|task| {
            let limit = normalize_timestamp(task.limit.as_deref());
            let left = remaining(task.limit.as_deref(), now);
            let left_style = match left {
                Some(r) if r.is_expired() => Style::default().fg(Color::Red),
                _ => Style::default().fg(Color::Yellow),
            };

            ListItem::new(vec![
                Line::from(Span::styled(
                    task.title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(format!("{}  limit : {}", task.status_label(), limit)),
                Line::from(Span::styled(
                    left.map(|r| r.to_string()).unwrap_or_default(),
                    left_style,
                )),
            ])
        })
        .collect();

    let title = match state.selected_list() {
        Some(list) => format!("Tasks in {}", list.title),
        None => "Tasks".to_string(),
    };

    let empty = items.is_empty();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(focus_border(app, FocusArea::Tasks))
                .title(title),
        )
        .highlight_symbol("> ")
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut list_state = ListState::default();
    if !empty && app.focus() == FocusArea::Tasks {
        list_state.select(Some(app.task_cursor()));
    }
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let text = app.status().map(str::to_string).unwrap_or_else(|| {
        "tab focus  ←/→ switch list  f filter  r reload  enter open  q quit".to_string()
    });
    frame.render_widget(
        Paragraph::new(Span::styled(text, Style::default().fg(Color::DarkGray))),
        area,
    );
}
