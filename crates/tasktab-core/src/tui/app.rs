use chrono::NaiveDateTime;
use chrono_tz::Tz;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info};

use crate::controller::{Action, Direction, Effect, SelectionState, reduce};
use crate::deadline::wall_clock_now;
use crate::filter::DisplayFilter;
use crate::model::Task;
use crate::routes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusArea {
    Tabs,
    Filter,
    Tasks,
}

impl FocusArea {
    fn next(self) -> Self {
        match self {
            FocusArea::Tabs => FocusArea::Filter,
            FocusArea::Filter => FocusArea::Tasks,
            FocusArea::Tasks => FocusArea::Tabs,
        }
    }

    fn prev(self) -> Self {
        match self {
            FocusArea::Tabs => FocusArea::Tasks,
            FocusArea::Filter => FocusArea::Tabs,
            FocusArea::Tasks => FocusArea::Filter,
        }
    }
}

/// Viewer state: the controller's selection plus what only the terminal
/// cares about (focus, cursor, status line).
pub struct App {
    state: SelectionState,
    focus: FocusArea,
    focused_tab: Option<usize>,
    task_cursor: usize,
    status: Option<String>,
    base_url: String,
    tz: Option<Tz>,
    now: NaiveDateTime,
    quit: bool,
}

impl App {
    pub fn new(base_url: String, filter: DisplayFilter, tz: Option<Tz>) -> Self {
        Self {
            state: SelectionState::new(filter),
            focus: FocusArea::Tabs,
            focused_tab: None,
            task_cursor: 0,
            status: None,
            base_url,
            tz,
            now: wall_clock_now(tz),
            quit: false,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn focus(&self) -> FocusArea {
        self.focus
    }

    pub fn focused_tab(&self) -> Option<usize> {
        self.focused_tab
    }

    pub fn task_cursor(&self) -> usize {
        self.task_cursor
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn tick_clock(&mut self) {
        self.now = wall_clock_now(self.tz);
    }

    /// Feed an action through the controller. Focus requests are honored
    /// here; fetches are returned for the caller to run.
    pub fn apply(&mut self, action: Action) -> Vec<Effect> {
        self.apply_with_outcome(action).0
    }

    fn apply_with_outcome(&mut self, action: Action) -> (Vec<Effect>, bool) {
        let transition = reduce(&mut self.state, action);
        let mut fetches = Vec::new();
        for effect in transition.effects {
            match effect {
                Effect::FocusTab(index) => {
                    debug!(index, "focus follows selection");
                    self.focus = FocusArea::Tabs;
                    self.focused_tab = Some(index);
                }
                other => fetches.push(other),
            }
        }
        self.clamp_cursor();
        (fetches, transition.key_consumed)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit = true;
            return vec![];
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.quit = true;
                vec![]
            }
            KeyCode::Tab => {
                self.focus = self.focus.next();
                vec![]
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev();
                vec![]
            }
            KeyCode::Left => self.horizontal(Direction::Previous),
            KeyCode::Right => self.horizontal(Direction::Next),
            KeyCode::Up | KeyCode::Char('k') => {
                self.focus = FocusArea::Tasks;
                self.task_cursor = self.task_cursor.saturating_sub(1);
                vec![]
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.focus = FocusArea::Tasks;
                self.task_cursor += 1;
                self.clamp_cursor();
                vec![]
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.activate(),
            KeyCode::Char('f') => self.toggle_filter(),
            KeyCode::Char('r') => {
                self.status = Some("reloading lists".to_string());
                self.apply(Action::Refresh)
            }
            KeyCode::Char('n') => {
                self.navigate(routes::NEW_LIST.to_string());
                vec![]
            }
            KeyCode::Char('t') => {
                self.navigate(routes::NEW_TASK.to_string());
                vec![]
            }
            KeyCode::Char('e') => {
                match self.state.selected_list_id() {
                    Some(id) => self.navigate(routes::edit_list(id)),
                    None => self.status = Some("no list selected".to_string()),
                }
                vec![]
            }
            KeyCode::Char(c @ '1'..='9') => {
                let index = (c as usize) - ('1' as usize);
                match self.state.lists().get(index).map(|list| list.id) {
                    Some(id) => self.apply(Action::SelectList(id)),
                    None => vec![],
                }
            }
            _ => vec![],
        }
    }

    fn horizontal(&mut self, direction: Direction) -> Vec<Effect> {
        match self.focus {
            FocusArea::Tabs => {
                let current_index = self
                    .focused_tab
                    .or_else(|| self.state.selected_index())
                    .unwrap_or(0);
                let (effects, consumed) = self.apply_with_outcome(Action::ArrowKey {
                    direction,
                    current_index,
                });
                if !consumed {
                    self.move_focus(direction);
                }
                effects
            }
            FocusArea::Filter => self.toggle_filter(),
            FocusArea::Tasks => {
                self.move_focus(direction);
                vec![]
            }
        }
    }

    fn move_focus(&mut self, direction: Direction) {
        self.focus = match direction {
            Direction::Next => self.focus.next(),
            Direction::Previous => self.focus.prev(),
        };
    }

    fn activate(&mut self) -> Vec<Effect> {
        match self.focus {
            FocusArea::Tabs => {
                let index = self.focused_tab.or_else(|| self.state.selected_index());
                match index.and_then(|i| self.state.lists().get(i)).map(|l| l.id) {
                    Some(id) => self.apply(Action::SelectList(id)),
                    None => vec![],
                }
            }
            FocusArea::Filter => self.toggle_filter(),
            FocusArea::Tasks => {
                if let (Some(list_id), Some(task_id)) =
                    (self.state.selected_list_id(), self.cursor_task().map(|t| t.id))
                {
                    self.navigate(routes::task_detail(list_id, task_id));
                }
                vec![]
            }
        }
    }

    fn toggle_filter(&mut self) -> Vec<Effect> {
        let next = self.state.display_filter().toggled();
        self.apply(Action::FilterChange(next))
    }

    fn navigate(&mut self, route: String) {
        info!(route = %route, "navigation requested");
        self.status = Some(format!("open {route}"));
    }

    pub fn cursor_task(&self) -> Option<&Task> {
        self.state.visible_tasks().get(self.task_cursor).copied()
    }

    fn clamp_cursor(&mut self) {
        let len = self.state.visible_tasks().len();
        if len == 0 {
            self.task_cursor = 0;
        } else if self.task_cursor >= len {
            self.task_cursor = len - 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskList;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn loaded_app() -> App {
        let mut app = App::new("http://api.test".to_string(), DisplayFilter::Todo, None);
        app.apply(Action::ListsFetched(vec![
            TaskList {
                id: 1,
                title: "home".to_string(),
            },
            TaskList {
                id: 2,
                title: "work".to_string(),
            },
        ]));
        app.apply(Action::TasksFetched {
            list_id: 1,
            generation: 1,
            tasks: vec![
                Task::new(10, "a", false, None),
                Task::new(11, "b", true, None),
                Task::new(12, "c", false, None),
            ],
        });
        app
    }

    #[test]
    fn focus_follows_keyboard_selection() {
        let mut app = loaded_app();
        assert_eq!(app.focused_tab(), Some(0));

        let effects = app.handle_key(key(KeyCode::Left));
        assert_eq!(app.state().selected_list_id(), Some(2));
        assert_eq!(app.focused_tab(), Some(1));
        assert_eq!(app.focus(), FocusArea::Tabs);
        assert_eq!(
            effects,
            vec![Effect::FetchTasks {
                list_id: 2,
                generation: 2
            }]
        );
    }

    #[test]
    fn arrow_without_lists_falls_back_to_focus_move() {
        let mut app = App::new("http://api.test".to_string(), DisplayFilter::Todo, None);
        let effects = app.handle_key(key(KeyCode::Right));
        assert!(effects.is_empty());
        assert_eq!(app.focus(), FocusArea::Filter);
    }

    #[test]
    fn cursor_is_clamped_to_visible_tasks() {
        let mut app = loaded_app();
        for _ in 0..5 {
            app.handle_key(key(KeyCode::Down));
        }
        assert_eq!(app.task_cursor(), 1);
        assert_eq!(app.cursor_task().map(|t| t.id), Some(12));

        app.handle_key(key(KeyCode::Char('f')));
        assert_eq!(app.state().display_filter(), DisplayFilter::Done);
        assert_eq!(app.task_cursor(), 0);
    }

    #[test]
    fn navigation_keys_show_routes() {
        let mut app = loaded_app();
        app.handle_key(key(KeyCode::Char('e')));
        assert_eq!(app.status(), Some("open /lists/1/edit"));

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.status(), Some("open /lists/1/tasks/12"));
    }

    #[test]
    fn reload_keeps_focus_in_task_pane() {
        let mut app = loaded_app();
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.focus(), FocusArea::Tasks);

        let effects = app.handle_key(key(KeyCode::Char('r')));
        assert_eq!(effects, vec![Effect::FetchLists]);
        app.apply(Action::ListsFetched(vec![
            TaskList {
                id: 1,
                title: "home".to_string(),
            },
            TaskList {
                id: 2,
                title: "work".to_string(),
            },
        ]));

        assert_eq!(app.focus(), FocusArea::Tasks);
        assert_eq!(app.focused_tab(), Some(0));
        assert_eq!(app.state().selected_list_id(), Some(1));
    }

    #[test]
    fn number_keys_select_lists() {
        let mut app = loaded_app();
        let effects = app.handle_key(key(KeyCode::Char('2')));
        assert_eq!(app.state().selected_list_id(), Some(2));
        assert_eq!(effects.len(), 1);
        assert!(app.handle_key(key(KeyCode::Char('9'))).is_empty());
    }
}
