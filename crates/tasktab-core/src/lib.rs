pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod deadline;
pub mod filter;
pub mod model;
pub mod render;
pub mod routes;
pub mod session;
pub mod tui;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  let connection =
    cli.connection_overrides();
  cfg.apply_overrides(
    pre
      .rc_overrides
      .into_iter()
      .chain(
        cli
          .rc_overrides
          .into_iter()
          .map(|kv| (kv.key, kv.value))
      )
      .chain(connection)
  );

  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  let sink = if inv.command == "ui" {
    cli::LogSink::File(
      config::resolve_log_dir(&cfg)
        .context(
          "failed to resolve log \
           directory"
        )?
    )
  } else {
    cli::LogSink::Stderr
  };
  let _log_guard = cli::init_tracing(
    cli.verbose,
    cli.quiet,
    &sink
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    command = %inv.command,
    "starting tasktab"
  );
  debug!(
    rc_files = ?cfg.loaded_files,
    "configuration loaded"
  );

  let mut renderer =
    render::Renderer::new(&cfg)?;

  let runtime =
    tokio::runtime::Builder::new_multi_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async \
         runtime"
      )?;

  runtime.block_on(commands::dispatch(
    &cfg,
    &mut renderer,
    inv
  ))?;

  info!("done");
  Ok(())
}
