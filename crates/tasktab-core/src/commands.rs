use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use tracing::{debug, info, instrument};

use crate::api::{ApiClient, TaskSource};
use crate::cli::Invocation;
use crate::config::Config;
use crate::controller::Action;
use crate::deadline::wall_clock_now;
use crate::filter::DisplayFilter;
use crate::render::Renderer;
use crate::session::Session;

pub fn known_command_names() -> Vec<&'static str> {
    vec!["ui", "lists", "tasks", "config", "help", "version"]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(cfg, renderer, inv))]
pub async fn dispatch(cfg: &Config, renderer: &mut Renderer, inv: Invocation) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    debug!(command, args = ?inv.command_args, "dispatching command");

    match command {
        "ui" => {
            let client = Arc::new(build_client(cfg)?);
            crate::tui::run(client, cfg).await
        }
        "lists" => {
            let client = Arc::new(build_client(cfg)?);
            cmd_lists(client, renderer).await
        }
        "tasks" => {
            let client = Arc::new(build_client(cfg)?);
            cmd_tasks(client, cfg, renderer, &inv.command_args).await
        }
        "config" => cmd_config(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn build_client(cfg: &Config) -> anyhow::Result<ApiClient> {
    let settings = cfg.api_settings()?;
    info!(base_url = %settings.base_url, "connecting to task API");
    ApiClient::new(&settings.base_url, settings.token, settings.timeout)
}

/// Target of the `tasks` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TasksQuery {
    pub list_id: Option<u64>,
    pub filter: DisplayFilter,
}

impl TasksQuery {
    pub fn parse(args: &[String], default_filter: DisplayFilter) -> anyhow::Result<Self> {
        let mut query = Self {
            list_id: None,
            filter: default_filter,
        };

        for arg in args {
            if let Ok(id) = arg.parse::<u64>() {
                if query.list_id.replace(id).is_some() {
                    bail!("more than one list id given");
                }
            } else {
                query.filter = arg
                    .parse()
                    .with_context(|| format!("unexpected argument: {arg}"))?;
            }
        }

        Ok(query)
    }
}

/// Load lists (and the first list's tasks), then move to the requested
/// list. Any fetch failure recorded by the controller becomes a hard error
/// here, since a script cannot see a banner.
pub async fn load_session<S: TaskSource>(
    source: Arc<S>,
    query: TasksQuery,
) -> anyhow::Result<Session<S>> {
    let mut session = Session::new(source, query.filter);
    session.dispatch(Action::Refresh).await;
    if let Some(message) = session.state().error_message() {
        bail!("{message}");
    }

    if let Some(list_id) = query.list_id {
        if !session.state().lists().iter().any(|l| l.id == list_id) {
            bail!("no list with id {list_id}");
        }
        if session.state().selected_list_id() != Some(list_id) {
            session.dispatch(Action::SelectList(list_id)).await;
        }
    }

    if let Some(message) = session.state().error_message() {
        bail!("{message}");
    }
    Ok(session)
}

#[instrument(skip(source, renderer))]
async fn cmd_lists<S: TaskSource>(source: Arc<S>, renderer: &mut Renderer) -> anyhow::Result<()> {
    let lists = source.fetch_lists().await?;
    if lists.is_empty() {
        println!("No lists.");
        return Ok(());
    }
    // The viewer opens on the first list.
    renderer.print_lists(&lists, lists.first().map(|l| l.id))?;
    Ok(())
}

#[instrument(skip(source, cfg, renderer, args))]
async fn cmd_tasks<S: TaskSource>(
    source: Arc<S>,
    cfg: &Config,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    let query = TasksQuery::parse(args, cfg.default_filter()?)?;
    let session = load_session(source, query).await?;
    let state = session.state();

    let Some(list) = state.selected_list() else {
        println!("No lists.");
        return Ok(());
    };

    println!("{} ({}) [{}]", list.title, list.id, state.display_filter().label());
    let visible = state.visible_tasks();
    if visible.is_empty() {
        println!("No matching tasks.");
        return Ok(());
    }

    renderer.print_tasks(&visible, wall_clock_now(cfg.timezone()))?;
    Ok(())
}

fn cmd_config(cfg: &Config) -> anyhow::Result<()> {
    let mut entries: Vec<(&String, &String)> = cfg.iter().collect();
    entries.sort();
    for (key, value) in entries {
        if key == "api.token" {
            println!("{key} = ********");
        } else {
            println!("{key} = {value}");
        }
    }
    for file in &cfg.loaded_files {
        println!("# loaded {}", file.display());
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("tasktab [options] [command] [args]");
    println!();
    println!("  ui                   interactive viewer (default)");
    println!("  lists                print all lists");
    println!("  tasks [ID] [todo|done]");
    println!("                       print the tasks of a list (first list by default)");
    println!("  config               print the effective configuration");
    println!("  version              print the version");
    println!();
    println!("Run with --help for options. Config overrides: rc.KEY=VALUE");
    Ok(())
}
