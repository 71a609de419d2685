use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use reqwest::StatusCode;
use tasktab_core::api::{FetchError, TaskSource, TransportError};
use tasktab_core::commands::{TasksQuery, load_session};
use tasktab_core::controller::{Action, Direction, Effect, SelectionState, reduce};
use tasktab_core::filter::DisplayFilter;
use tasktab_core::model::{Task, TaskList};
use tasktab_core::session::{Session, perform};

#[derive(Default)]
struct FakeSource {
    lists: Vec<TaskList>,
    tasks: HashMap<u64, Vec<Task>>,
    fail_lists: bool,
    requested: Mutex<Vec<u64>>,
}

fn denied() -> TransportError {
    TransportError::Status {
        status: StatusCode::UNAUTHORIZED,
        body: String::new(),
    }
}

impl TaskSource for FakeSource {
    async fn fetch_lists(&self) -> Result<Vec<TaskList>, FetchError> {
        if self.fail_lists {
            return Err(FetchError::Lists(denied()));
        }
        Ok(self.lists.clone())
    }

    async fn fetch_tasks(&self, list_id: u64) -> Result<Vec<Task>, FetchError> {
        self.requested.lock().unwrap().push(list_id);
        self.tasks
            .get(&list_id)
            .cloned()
            .ok_or_else(|| FetchError::Tasks(denied()))
    }
}

fn source() -> FakeSource {
    let lists = vec![
        TaskList {
            id: 1,
            title: "L1".to_string(),
        },
        TaskList {
            id: 2,
            title: "L2".to_string(),
        },
        TaskList {
            id: 3,
            title: "L3".to_string(),
        },
    ];
    let mut tasks = HashMap::new();
    tasks.insert(
        1,
        vec![
            Task::new(10, "todo one", false, Some("2024-01-12T10:00:00Z")),
            Task::new(11, "done one", true, None),
        ],
    );
    tasks.insert(2, vec![Task::new(20, "todo two", false, None)]);
    FakeSource {
        lists,
        tasks,
        ..FakeSource::default()
    }
}

#[tokio::test]
async fn initial_load_selects_first_list_and_fetches_its_tasks() {
    let src = Arc::new(source());
    let mut session = Session::new(Arc::clone(&src), DisplayFilter::Todo);

    session.dispatch(Action::Refresh).await;

    let state = session.state();
    assert_eq!(state.selected_list_id(), Some(1));
    assert_eq!(session.focused_tab(), Some(0));
    assert_eq!(state.tasks().len(), 2);
    let visible: Vec<u64> = state.visible_tasks().iter().map(|t| t.id).collect();
    assert_eq!(visible, vec![10]);
    assert_eq!(*src.requested.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn arrow_navigation_wraps_and_moves_focus() {
    let mut session = Session::new(Arc::new(source()), DisplayFilter::Todo);
    session.dispatch(Action::Refresh).await;

    let consumed = session
        .dispatch(Action::ArrowKey {
            direction: Direction::Previous,
            current_index: 0,
        })
        .await;

    assert!(consumed);
    assert_eq!(session.state().selected_list_id(), Some(3));
    assert_eq!(session.focused_tab(), Some(2));
    // List 3 has no tasks on the server: error shown, stale tasks kept.
    assert!(session.state().error_message().is_some());
    assert_eq!(session.state().tasks()[0].id, 10);

    session
        .dispatch(Action::ArrowKey {
            direction: Direction::Next,
            current_index: 2,
        })
        .await;
    assert_eq!(session.state().selected_list_id(), Some(1));
    assert_eq!(session.state().error_message(), None);
}

#[tokio::test]
async fn list_failure_sets_error_banner() {
    let mut failing = source();
    failing.fail_lists = true;
    let mut session = Session::new(Arc::new(failing), DisplayFilter::Todo);
    session.dispatch(Action::Refresh).await;

    assert_eq!(session.state().selected_list_id(), None);
    assert_eq!(
        session.state().error_message(),
        Some("failed to fetch lists. server responded with 401 Unauthorized")
    );
}

#[tokio::test]
async fn overlapping_task_fetches_keep_only_the_latest() {
    let src = source();
    let mut state = SelectionState::default();

    let lists = perform(&src, Effect::FetchLists).await.expect("lists action");
    let first = reduce(&mut state, lists);
    let fetch_first = first
        .effects
        .into_iter()
        .find(|e| matches!(e, Effect::FetchTasks { .. }))
        .expect("first fetch");

    let second = reduce(&mut state, Action::SelectList(2));
    let fetch_second = second.effects.last().cloned().expect("second fetch");

    // The newer request resolves first, the older one last.
    let newer = perform(&src, fetch_second).await.expect("newer");
    let older = perform(&src, fetch_first).await.expect("older");
    reduce(&mut state, newer);
    reduce(&mut state, older);

    assert_eq!(state.selected_list_id(), Some(2));
    let ids: Vec<u64> = state.tasks().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![20]);
}

#[tokio::test]
async fn load_session_targets_requested_list() {
    let query = TasksQuery {
        list_id: Some(2),
        filter: DisplayFilter::Todo,
    };
    let session = load_session(Arc::new(source()), query).await.expect("session");
    assert_eq!(session.state().selected_list_id(), Some(2));
    assert_eq!(session.state().tasks()[0].id, 20);

    let missing = TasksQuery {
        list_id: Some(42),
        filter: DisplayFilter::Done,
    };
    let err = load_session(Arc::new(source()), missing)
        .await
        .err()
        .expect("unknown list");
    assert_eq!(err.to_string(), "no list with id 42");

    let mut failing = source();
    failing.fail_lists = true;
    let err = load_session(Arc::new(failing), TasksQuery {
        list_id: None,
        filter: DisplayFilter::Todo,
    })
    .await
    .err()
    .expect("lists unavailable");
    assert!(err.to_string().starts_with("failed to fetch lists."));
}
