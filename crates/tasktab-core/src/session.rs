use std::sync::Arc;

use tracing::{debug, instrument};

use crate::api::TaskSource;
use crate::controller::{Action, Effect, SelectionState, reduce};
use crate::filter::DisplayFilter;

/// Run the I/O for one effect and turn its outcome into the action that
/// reports it. Focus requests need no I/O and yield nothing.
#[instrument(skip(source))]
pub async fn perform<S: TaskSource>(source: &S, effect: Effect) -> Option<Action> {
    match effect {
        Effect::FetchLists => Some(match source.fetch_lists().await {
            Ok(lists) => Action::ListsFetched(lists),
            Err(error) => Action::ListsFailed(error),
        }),
        Effect::FetchTasks {
            list_id,
            generation,
        } => Some(match source.fetch_tasks(list_id).await {
            Ok(tasks) => Action::TasksFetched {
                list_id,
                generation,
                tasks,
            },
            Err(error) => Action::TasksFailed {
                list_id,
                generation,
                error,
            },
        }),
        Effect::FocusTab(_) => None,
    }
}

/// Drives the reducer to quiescence, awaiting each fetch in turn. Used by the
/// non-interactive commands, where there is no event loop to overlap
/// requests with.
pub struct Session<S> {
    source: Arc<S>,
    state: SelectionState,
    focused_tab: Option<usize>,
}

impl<S: TaskSource> Session<S> {
    pub fn new(source: Arc<S>, display_filter: DisplayFilter) -> Self {
        Self {
            source,
            state: SelectionState::new(display_filter),
            focused_tab: None,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn focused_tab(&self) -> Option<usize> {
        self.focused_tab
    }

    /// Returns whether the initial action's key was consumed.
    pub async fn dispatch(&mut self, action: Action) -> bool {
        let first = reduce(&mut self.state, action);
        let consumed = first.key_consumed;

        let mut pending = first.effects;
        while !pending.is_empty() {
            let mut next = Vec::new();
            for effect in pending {
                if let Effect::FocusTab(index) = effect {
                    self.focused_tab = Some(index);
                }
                if let Some(action) = perform(self.source.as_ref(), effect).await {
                    debug!(?action, "feeding fetch result back");
                    next.extend(reduce(&mut self.state, action).effects);
                }
            }
            pending = next;
        }

        consumed
    }
}
