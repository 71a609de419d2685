mod app;
mod view;

use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures_util::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

pub use self::app::{App, FocusArea};

use crate::api::TaskSource;
use crate::config::Config;
use crate::controller::{Action, Effect};
use crate::session::perform;

/// Remaining-time labels are recomputed on this cadence even without input.
const CLOCK_TICK: Duration = Duration::from_secs(30);

#[instrument(skip_all)]
pub async fn run<S: TaskSource>(source: Arc<S>, cfg: &Config) -> Result<()> {
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        anyhow::bail!("the viewer requires an interactive terminal (TTY); try `tasktab tasks`");
    }

    let base_url = cfg.api_settings()?.base_url;
    let mut app = App::new(base_url, cfg.default_filter()?, cfg.timezone());

    let mut stdout = io::stdout();
    enable_raw_mode().context("enable raw mode")?;
    execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    info!("viewer started");
    let res = run_loop(&mut terminal, &mut app, source).await;

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    info!("viewer stopped");
    res
}

async fn run_loop<S: TaskSource>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    source: Arc<S>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Action>();
    let mut events = EventStream::new();
    let mut clock = tokio::time::interval(CLOCK_TICK);

    let effects = app.apply(Action::Refresh);
    spawn_fetches(&source, &tx, effects);

    loop {
        terminal.draw(|f| view::draw(f, app)).context("draw")?;
        if app.should_quit() {
            return Ok(());
        }

        tokio::select! {
            Some(action) = rx.recv() => {
                let effects = app.apply(action);
                spawn_fetches(&source, &tx, effects);
            }
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    let effects = app.handle_key(key);
                    spawn_fetches(&source, &tx, effects);
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err).context("read terminal event"),
                None => return Ok(()),
            },
            _ = clock.tick() => {
                app.tick_clock();
            }
        }
    }
}

/// Fetches run concurrently and are not cancelled when superseded; the
/// controller drops results that arrive for an outdated selection.
fn spawn_fetches<S: TaskSource>(
    source: &Arc<S>,
    tx: &mpsc::UnboundedSender<Action>,
    effects: Vec<Effect>,
) {
    for effect in effects {
        debug!(?effect, "spawning fetch");
        let source = Arc::clone(source);
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Some(action) = perform(source.as_ref(), effect).await
                && tx.send(action).is_err()
            {
                debug!("viewer closed before fetch completed");
            }
        });
    }
}
