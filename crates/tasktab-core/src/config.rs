use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use chrono_tz::Tz;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::deadline::parse_timezone;
use crate::filter::DisplayFilter;

const RC_ENV_VAR: &str = "TASKTABRC";
const TOKEN_ENV_VAR: &str =
  "TASKTAB_TOKEN";
const RC_FILE_NAME: &str = ".tasktabrc";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

/// Everything needed to reach the task
/// API.
#[derive(Debug, Clone)]
pub struct ApiSettings {
  pub base_url: String,
  pub token:    Option<String>,
  pub timeout:  Duration
}

impl Config {
  #[must_use]
  pub fn defaults() -> Self {
    let mut cfg = Config {
      map:          HashMap::new(),
      loaded_files: vec![]
    };

    for (key, value) in [
      ("api.url", "http://localhost:3000"),
      ("api.timeout", "30"),
      ("default.command", "ui"),
      ("default.filter", "todo"),
      ("color", "on")
    ] {
      cfg.map.insert(
        key.to_string(),
        value.to_string()
      );
    }

    cfg
  }

  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::defaults();

    let rc = resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading rc file");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no rc file found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  pub fn api_settings(
    &self
  ) -> anyhow::Result<ApiSettings> {
    let base_url = self
      .get("api.url")
      .map(|url| url.trim().to_string())
      .filter(|url| !url.is_empty())
      .ok_or_else(|| {
        anyhow!("api.url is not set")
      })?;

    let timeout_secs = self
      .get("api.timeout")
      .unwrap_or_else(|| {
        "30".to_string()
      });
    let timeout_secs = timeout_secs
      .trim()
      .parse::<u64>()
      .with_context(|| {
        format!(
          "invalid api.timeout: \
           {timeout_secs}"
        )
      })?;

    let token = self
      .get("api.token")
      .or_else(|| {
        std::env::var(TOKEN_ENV_VAR)
          .ok()
      })
      .map(|t| t.trim().to_string())
      .filter(|t| !t.is_empty());

    Ok(ApiSettings {
      base_url,
      token,
      timeout: Duration::from_secs(
        timeout_secs
      )
    })
  }

  pub fn default_filter(
    &self
  ) -> anyhow::Result<DisplayFilter> {
    self
      .get("default.filter")
      .map_or(
        Ok(DisplayFilter::default()),
        |raw| raw.parse()
      )
  }

  pub fn timezone(&self) -> Option<Tz> {
    let raw = self.get("timezone")?;
    parse_timezone(&raw, "config")
  }

  pub fn color(
    &self
  ) -> anyhow::Result<bool> {
    let raw = self
      .get("color")
      .unwrap_or_else(|| "on".to_string());
    parse_switch(&raw).ok_or_else(|| {
      anyhow!(
        "invalid color setting: {}",
        raw.trim()
      )
    })
  }

  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    self.load_nested(path, &mut Vec::new())
  }

  /// `chain` holds the canonical paths
  /// of the files currently being read,
  /// outermost first.
  #[tracing::instrument(skip(self, chain))]
  fn load_nested(
    &mut self,
    path: &Path,
    chain: &mut Vec<PathBuf>
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;

    let canonical = fs::canonicalize(&path)
      .unwrap_or_else(|_| path.clone());
    if chain.contains(&canonical) {
      return Err(anyhow!(
        "include cycle: {} is already \
         being loaded",
        path.display()
      ));
    }
    chain.push(canonical);
    self.loaded_files.push(path.clone());

    let base_dir = path
      .parent()
      .map_or_else(
        || PathBuf::from("."),
        Path::to_path_buf
      );

    for (idx, raw_line) in
      text.lines().enumerate()
    {
      let Some(entry) = rc_line(raw_line)
      else {
        continue;
      };

      match entry {
        | RcLine::Include(target) => {
          let target = resolve_include_path(
            &base_dir, target
          )?;
          if !target.exists() {
            warn!(include = %target.display(), "missing include skipped");
            continue;
          }
          debug!(
            from = %path.display(),
            include = %target.display(),
            "following include"
          );
          self.load_nested(&target, chain)?;
        }
        | RcLine::Setting(key, value) => {
          trace!(key, "rc setting");
          self.map.insert(
            key.to_string(),
            value.to_string()
          );
        }
        | RcLine::Invalid => {
          return Err(anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            idx + 1,
            raw_line.trim()
          ));
        }
      }
    }

    chain.pop();
    Ok(())
  }
}

enum RcLine<'a> {
  Include(&'a str),
  Setting(&'a str, &'a str),
  Invalid
}

/// One rc line with its `#` comment
/// removed; `None` for blank lines.
fn rc_line(raw: &str) -> Option<RcLine<'_>> {
  let line = raw
    .split_once('#')
    .map_or(raw, |(before, _)| before)
    .trim();
  if line.is_empty() {
    return None;
  }

  if let Some(target) =
    line.strip_prefix("include ")
  {
    return Some(RcLine::Include(
      target.trim()
    ));
  }

  Some(match line.split_once('=') {
    | Some((key, value))
      if !key.trim().is_empty() =>
    {
      RcLine::Setting(
        key.trim(),
        value.trim()
      )
    }
    | _ => RcLine::Invalid
  })
}

/// Directory for the interactive
/// viewer's log files, created on
/// demand.
#[tracing::instrument(skip(cfg))]
pub fn resolve_log_dir(
  cfg: &Config
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(cfg_value) =
    cfg.get("log.dir")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_log_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating log directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping rc lookup"
    );
    return Ok(None);
  };
  let candidate = home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_log_dir()
-> anyhow::Result<PathBuf> {
  let base = dirs::data_local_dir()
    .or_else(dirs::home_dir)
    .ok_or_else(|| {
      anyhow!(
        "cannot determine a data \
         directory for logs"
      )
    })?;
  Ok(base.join("tasktab").join("logs"))
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_switch(raw: &str) -> Option<bool> {
  match raw
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "on" | "yes" | "true" | "1" => {
      Some(true)
    }
    | "off" | "no" | "false" | "0" => {
      Some(false)
    }
    | _ => None
  }
}
