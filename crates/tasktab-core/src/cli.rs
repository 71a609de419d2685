use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tasktab",
    version,
    about = "Browse task lists from a remote task API",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    /// Path of the rc file (defaults to $TASKTABRC, then ~/.tasktabrc)
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Base URL of the task API
    #[arg(long = "url")]
    pub url: Option<String>,

    /// Bearer token sent with every request
    #[arg(long = "token")]
    pub token: Option<String>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

impl GlobalCli {
    /// `--url` / `--token` as config overrides, applied after `--rc`.
    pub fn connection_overrides(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Some(url) = &self.url {
            out.push(("api.url".to_string(), url.clone()));
        }
        if let Some(token) = &self.token {
            out.push(("api.token".to_string(), token.clone()));
        }
        out
    }
}

/// Where log output goes. The interactive viewer owns the terminal, so it
/// logs to a file instead of stderr.
#[derive(Debug, Clone)]
pub enum LogSink {
    Stderr,
    File(PathBuf),
}

fn default_level(verbose: u8, quiet: u8) -> &'static str {
    if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    }
}

/// The returned guard flushes file logs on drop; hold it for the life of
/// the process.
pub fn init_tracing(
    verbose: u8,
    quiet: u8,
    sink: &LogSink,
) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level(verbose, quiet)))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let (init_result, guard) = match sink {
        LogSink::Stderr => {
            let result = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr)
                .try_init();
            (result, None)
        }
        LogSink::File(dir) => {
            let (writer, guard) = file_writer(dir);
            let result = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .with_writer(writer)
                .try_init();
            (result, Some(guard))
        }
    };

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(guard)
}

fn file_writer(dir: &Path) -> (tracing_appender::non_blocking::NonBlocking, WorkerGuard) {
    let appender = tracing_appender::rolling::daily(dir, "tasktab.log");
    tracing_appender::non_blocking(appender)
}

#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub command_args: Vec<String>,
}

impl Invocation {
    #[tracing::instrument(skip(cfg, rest))]
    pub fn parse(cfg: &Config, rest: Vec<OsString>) -> anyhow::Result<Self> {
        let tokens: Vec<String> = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();

        let known = crate::commands::known_command_names();

        let Some((first, args)) = tokens.split_first() else {
            let cmd = cfg
                .get("default.command")
                .unwrap_or_else(|| "ui".to_string());
            let command = crate::commands::expand_command_abbrev(&cmd, &known)
                .ok_or_else(|| anyhow!("unknown default.command: {cmd}"))?;
            debug!(command = %command, "no explicit command, using default");
            return Ok(Self {
                command: command.to_string(),
                command_args: vec![],
            });
        };

        let command = crate::commands::expand_command_abbrev(first, &known)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {first}"))?;
        debug!(token = %first, expanded = %command, "resolved command token");

        Ok(Self {
            command: command.to_string(),
            command_args: args.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_extracted() {
        let pre = preprocess_args(&os(&[
            "tasktab",
            "rc.api.url=http://example.test",
            "tasks",
            "rc.default.filter:done",
        ]))
        .unwrap();

        assert_eq!(pre.cleaned_args, os(&["tasktab", "tasks"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.api.url".to_string(), "http://example.test".to_string()),
                ("rc.default.filter".to_string(), "done".to_string()),
            ]
        );
    }

    #[test]
    fn invocation_expands_abbreviations_and_defaults() {
        let cfg = Config::defaults();

        let inv = Invocation::parse(&cfg, os(&["ta", "3", "done"])).unwrap();
        assert_eq!(inv.command, "tasks");
        assert_eq!(inv.command_args, vec!["3".to_string(), "done".to_string()]);

        let inv = Invocation::parse(&cfg, vec![]).unwrap();
        assert_eq!(inv.command, "ui");

        assert!(Invocation::parse(&cfg, os(&["bogus"])).is_err());
    }

    #[test]
    fn url_and_token_flags_become_overrides() {
        let cli = GlobalCli::parse_from(["tasktab", "--url", "http://x", "--token", "t", "lists"]);
        assert_eq!(
            cli.connection_overrides(),
            vec![
                ("api.url".to_string(), "http://x".to_string()),
                ("api.token".to_string(), "t".to_string()),
            ]
        );
        assert_eq!(cli.rest, os(&["lists"]));
    }
}
