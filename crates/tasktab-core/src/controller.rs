//! List/task selection as a reducer.
//!
//! [`reduce`] never performs I/O. Fetches and focus changes come back as
//! [`Effect`]s for the caller to carry out, and fetch completions are fed in
//! again as [`Action`]s.

use tracing::{debug, info, warn};

use crate::api::FetchError;
use crate::filter::{DisplayFilter, filter_tasks};
use crate::model::{Task, TaskList};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

#[derive(Debug)]
pub enum Action {
    /// Request (re)loading the list collection.
    Refresh,
    ListsFetched(Vec<TaskList>),
    ListsFailed(FetchError),
    SelectList(u64),
    ArrowKey {
        direction: Direction,
        current_index: usize,
    },
    FilterChange(DisplayFilter),
    TasksFetched {
        list_id: u64,
        generation: u64,
        tasks: Vec<Task>,
    },
    TasksFailed {
        list_id: u64,
        generation: u64,
        error: FetchError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchLists,
    FetchTasks { list_id: u64, generation: u64 },
    /// Move input focus to the tab at this index.
    FocusTab(usize),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Transition {
    pub effects: Vec<Effect>,
    /// The key that produced the action must not get its default handling.
    pub key_consumed: bool,
}

impl Transition {
    fn none() -> Self {
        Self::default()
    }

    fn with(effect: Effect) -> Self {
        Self {
            effects: vec![effect],
            key_consumed: false,
        }
    }

    #[cfg(test)]
    fn focus_request(&self) -> Option<usize> {
        self.effects.iter().rev().find_map(|effect| match effect {
            Effect::FocusTab(index) => Some(*index),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoListsLoaded,
    ListsLoaded,
}

#[derive(Debug, Default)]
pub struct SelectionState {
    lists: Vec<TaskList>,
    lists_loaded: bool,
    selected_list_id: Option<u64>,
    tasks: Vec<Task>,
    display_filter: DisplayFilter,
    error_message: Option<String>,
    task_generation: u64,
}

impl SelectionState {
    pub fn new(display_filter: DisplayFilter) -> Self {
        Self {
            display_filter,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        if self.lists_loaded {
            Phase::ListsLoaded
        } else {
            Phase::NoListsLoaded
        }
    }

    pub fn lists(&self) -> &[TaskList] {
        &self.lists
    }

    pub fn selected_list_id(&self) -> Option<u64> {
        self.selected_list_id
    }

    pub fn selected_list(&self) -> Option<&TaskList> {
        let id = self.selected_list_id?;
        self.lists.iter().find(|list| list.id == id)
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_list_id.and_then(|id| self.index_of(id))
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        filter_tasks(&self.tasks, self.display_filter)
    }

    pub fn display_filter(&self) -> DisplayFilter {
        self.display_filter
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    fn index_of(&self, id: u64) -> Option<usize> {
        self.lists.iter().position(|list| list.id == id)
    }

    fn request_tasks(&mut self, list_id: u64) -> Effect {
        self.task_generation += 1;
        Effect::FetchTasks {
            list_id,
            generation: self.task_generation,
        }
    }

    fn is_current(&self, list_id: u64, generation: u64) -> bool {
        generation == self.task_generation && self.selected_list_id == Some(list_id)
    }

    fn apply_lists(&mut self, lists: Vec<TaskList>) -> Transition {
        info!(count = lists.len(), "lists loaded");
        let previous_index = self.selected_index();
        self.lists = lists;
        self.lists_loaded = true;
        self.error_message = None;

        let kept = self.selected_list_id.and_then(|id| self.index_of(id));
        if let Some(index) = kept {
            debug!(index, "previous selection still present");
            if previous_index == Some(index) {
                return Transition::none();
            }
            return Transition::with(Effect::FocusTab(index));
        }

        match self.lists.first().map(|list| list.id) {
            Some(first) => {
                self.selected_list_id = Some(first);
                let fetch = self.request_tasks(first);
                Transition {
                    effects: vec![Effect::FocusTab(0), fetch],
                    key_consumed: false,
                }
            }
            None => {
                if self.selected_list_id.take().is_some() {
                    debug!("selected list vanished and no lists remain");
                }
                self.tasks.clear();
                Transition::none()
            }
        }
    }

    fn select_list(&mut self, id: u64) -> Transition {
        let Some(index) = self.index_of(id) else {
            warn!(list_id = id, "ignoring selection of unknown list");
            return Transition::none();
        };

        let mut transition = Transition::none();
        if self.selected_list_id != Some(id) {
            transition.effects.push(Effect::FocusTab(index));
        }
        self.selected_list_id = Some(id);
        let fetch = self.request_tasks(id);
        transition.effects.push(fetch);
        transition
    }

    fn step(&mut self, direction: Direction, current_index: usize) -> Transition {
        let n = self.lists.len();
        if n == 0 {
            return Transition::none();
        }

        let current = current_index % n;
        let next = match direction {
            Direction::Next => (current + 1) % n,
            Direction::Previous => (current + n - 1) % n,
        };
        let id = self.lists[next].id;

        let mut transition = self.select_list(id);
        transition.key_consumed = true;
        transition
    }
}

/// Apply one action to the state.
pub fn reduce(state: &mut SelectionState, action: Action) -> Transition {
    match action {
        Action::Refresh => Transition::with(Effect::FetchLists),
        Action::ListsFetched(lists) => state.apply_lists(lists),
        Action::ListsFailed(error) => {
            warn!(error = %error, "list fetch failed");
            state.error_message = Some(error.to_string());
            Transition::none()
        }
        Action::SelectList(id) => state.select_list(id),
        Action::ArrowKey {
            direction,
            current_index,
        } => state.step(direction, current_index),
        Action::FilterChange(filter) => {
            debug!(filter = %filter, "display filter changed");
            state.display_filter = filter;
            Transition::none()
        }
        Action::TasksFetched {
            list_id,
            generation,
            tasks,
        } => {
            if !state.is_current(list_id, generation) {
                debug!(list_id, generation, "dropping stale task response");
                return Transition::none();
            }
            info!(list_id, count = tasks.len(), "tasks loaded");
            state.tasks = tasks;
            state.error_message = None;
            Transition::none()
        }
        Action::TasksFailed {
            list_id,
            generation,
            error,
        } => {
            if !state.is_current(list_id, generation) {
                debug!(list_id, generation, error = %error, "dropping stale task failure");
                return Transition::none();
            }
            warn!(list_id, error = %error, "task fetch failed");
            state.error_message = Some(error.to_string());
            Transition::none()
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;
    use crate::api::TransportError;

    fn lists(ids: &[u64]) -> Vec<TaskList> {
        ids.iter()
            .map(|id| TaskList {
                id: *id,
                title: format!("list {id}"),
            })
            .collect()
    }

    fn unauthorized() -> TransportError {
        TransportError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: String::new(),
        }
    }

    fn loaded(ids: &[u64]) -> SelectionState {
        let mut state = SelectionState::default();
        reduce(&mut state, Action::ListsFetched(lists(ids)));
        state
    }

    #[test]
    fn first_list_is_selected_on_initial_load() {
        let mut state = SelectionState::default();
        assert_eq!(state.phase(), Phase::NoListsLoaded);
        assert_eq!(
            reduce(&mut state, Action::Refresh).effects,
            vec![Effect::FetchLists]
        );

        let t = reduce(&mut state, Action::ListsFetched(lists(&[10, 20, 30])));

        assert_eq!(state.phase(), Phase::ListsLoaded);
        assert_eq!(state.selected_list_id(), Some(10));
        assert_eq!(
            t.effects,
            vec![
                Effect::FocusTab(0),
                Effect::FetchTasks {
                    list_id: 10,
                    generation: 1
                }
            ]
        );
    }

    #[test]
    fn empty_collection_leaves_no_selection() {
        let mut state = SelectionState::default();
        let t = reduce(&mut state, Action::ListsFetched(vec![]));
        assert!(t.effects.is_empty());
        assert_eq!(state.selected_list_id(), None);
        assert!(state.tasks().is_empty());
        assert_eq!(state.phase(), Phase::ListsLoaded);
    }

    #[test]
    fn refetch_keeps_existing_selection() {
        let mut state = loaded(&[1, 2, 3]);
        reduce(&mut state, Action::SelectList(3));

        let t = reduce(&mut state, Action::ListsFetched(lists(&[3, 1])));
        assert_eq!(state.selected_list_id(), Some(3));
        assert_eq!(t.effects, vec![Effect::FocusTab(0)]);
    }

    #[test]
    fn refetch_with_unmoved_selection_requests_no_focus() {
        let mut state = loaded(&[1, 2, 3]);
        reduce(&mut state, Action::SelectList(2));

        let t = reduce(&mut state, Action::ListsFetched(lists(&[1, 2, 3, 4])));
        assert_eq!(state.selected_list_id(), Some(2));
        assert!(t.effects.is_empty());
        assert_eq!(t.focus_request(), None);
    }

    #[test]
    fn refetch_without_selected_list_reselects_first() {
        let mut state = loaded(&[1, 2]);
        reduce(&mut state, Action::SelectList(2));

        let t = reduce(&mut state, Action::ListsFetched(lists(&[7, 8])));
        assert_eq!(state.selected_list_id(), Some(7));
        assert!(t.effects.contains(&Effect::FocusTab(0)));

        reduce(&mut state, Action::ListsFetched(vec![]));
        assert_eq!(state.selected_list_id(), None);
    }

    #[test]
    fn selection_keeps_stale_tasks_until_fetch_resolves() {
        let mut state = loaded(&[1, 2]);
        reduce(
            &mut state,
            Action::TasksFetched {
                list_id: 1,
                generation: 1,
                tasks: vec![Task::new(100, "old", false, None)],
            },
        );

        let t = reduce(&mut state, Action::SelectList(2));
        assert_eq!(
            t.effects,
            vec![
                Effect::FocusTab(1),
                Effect::FetchTasks {
                    list_id: 2,
                    generation: 2
                }
            ]
        );
        assert_eq!(state.tasks()[0].id, 100);

        reduce(
            &mut state,
            Action::TasksFetched {
                list_id: 2,
                generation: 2,
                tasks: vec![Task::new(200, "new", false, None)],
            },
        );
        assert_eq!(state.tasks().len(), 1);
        assert_eq!(state.tasks()[0].id, 200);
    }

    #[test]
    fn unknown_list_is_ignored() {
        let mut state = loaded(&[1, 2]);
        let t = reduce(&mut state, Action::SelectList(99));
        assert!(t.effects.is_empty());
        assert_eq!(state.selected_list_id(), Some(1));
    }

    #[test]
    fn reselecting_current_list_refetches_without_focus() {
        let mut state = loaded(&[1, 2]);
        let t = reduce(&mut state, Action::SelectList(1));
        assert_eq!(
            t.effects,
            vec![Effect::FetchTasks {
                list_id: 1,
                generation: 2
            }]
        );
    }

    #[test]
    fn arrow_keys_wrap_around() {
        let mut state = loaded(&[1, 2, 3]);

        let t = reduce(
            &mut state,
            Action::ArrowKey {
                direction: Direction::Next,
                current_index: 2,
            },
        );
        assert!(t.key_consumed);
        assert_eq!(state.selected_list_id(), Some(1));

        let t = reduce(
            &mut state,
            Action::ArrowKey {
                direction: Direction::Previous,
                current_index: 0,
            },
        );
        assert_eq!(state.selected_list_id(), Some(3));
        assert_eq!(t.focus_request(), Some(2));
    }

    #[test]
    fn arrow_key_without_lists_is_not_consumed() {
        let mut state = SelectionState::default();
        let t = reduce(
            &mut state,
            Action::ArrowKey {
                direction: Direction::Next,
                current_index: 0,
            },
        );
        assert!(!t.key_consumed);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn list_failure_keeps_selection_and_tasks() {
        let mut state = loaded(&[1, 2]);
        reduce(
            &mut state,
            Action::TasksFetched {
                list_id: 1,
                generation: 1,
                tasks: vec![Task::new(5, "keep", false, None)],
            },
        );

        reduce(
            &mut state,
            Action::ListsFailed(FetchError::Lists(unauthorized())),
        );

        assert_eq!(state.selected_list_id(), Some(1));
        assert_eq!(state.tasks().len(), 1);
        let message = state.error_message().unwrap();
        assert!(message.starts_with("failed to fetch lists."));
    }

    #[test]
    fn later_success_clears_error() {
        let mut state = loaded(&[1]);
        reduce(
            &mut state,
            Action::TasksFailed {
                list_id: 1,
                generation: 1,
                error: FetchError::Tasks(unauthorized()),
            },
        );
        assert!(state.error_message().is_some());

        reduce(&mut state, Action::SelectList(1));
        reduce(
            &mut state,
            Action::TasksFetched {
                list_id: 1,
                generation: 2,
                tasks: vec![],
            },
        );
        assert_eq!(state.error_message(), None);
    }

    #[test]
    fn stale_task_responses_are_dropped() {
        let mut state = loaded(&[1, 2]);
        reduce(&mut state, Action::SelectList(2));

        // Generation 1 (list 1) resolves after the switch to list 2.
        reduce(
            &mut state,
            Action::TasksFetched {
                list_id: 1,
                generation: 1,
                tasks: vec![Task::new(1, "stale", false, None)],
            },
        );
        assert!(state.tasks().is_empty());

        reduce(
            &mut state,
            Action::TasksFailed {
                list_id: 1,
                generation: 1,
                error: FetchError::Tasks(unauthorized()),
            },
        );
        assert_eq!(state.error_message(), None);
    }

    #[test]
    fn filter_change_is_local() {
        let mut state = loaded(&[1]);
        reduce(
            &mut state,
            Action::TasksFetched {
                list_id: 1,
                generation: 1,
                tasks: vec![
                    Task::new(1, "a", false, None),
                    Task::new(2, "b", true, None),
                ],
            },
        );

        let t = reduce(&mut state, Action::FilterChange(DisplayFilter::Done));
        assert!(t.effects.is_empty());
        let ids: Vec<u64> = state.visible_tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2]);
    }
}
