use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::trace;

use crate::model::Task;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum DisplayFilter {
  #[default]
  Todo,
  Done
}

impl DisplayFilter {
  pub const ALL: [DisplayFilter; 2] = [
    DisplayFilter::Todo,
    DisplayFilter::Done
  ];

  #[must_use]
  pub fn as_str(self) -> &'static str {
    match self {
      | DisplayFilter::Todo => "todo",
      | DisplayFilter::Done => "done"
    }
  }

  #[must_use]
  pub fn label(self) -> &'static str {
    match self {
      | DisplayFilter::Todo => {
        "Incomplete"
      }
      | DisplayFilter::Done => {
        "Complete"
      }
    }
  }

  #[must_use]
  pub fn toggled(self) -> Self {
    match self {
      | DisplayFilter::Todo => {
        DisplayFilter::Done
      }
      | DisplayFilter::Done => {
        DisplayFilter::Todo
      }
    }
  }

  fn wants_done(self) -> bool {
    self == DisplayFilter::Done
  }
}

impl fmt::Display for DisplayFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for DisplayFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "todo" => Ok(DisplayFilter::Todo),
      | "done" => Ok(DisplayFilter::Done),
      | other => {
        Err(anyhow!(
          "invalid display filter: \
           {other} (expected todo or \
           done)"
        ))
      }
    }
  }
}

/// Tasks whose `done` flag is exactly
/// the boolean the filter asks for, in
/// source order.
#[tracing::instrument(skip(tasks))]
pub fn filter_tasks(
  tasks: &[Task],
  filter: DisplayFilter
) -> Vec<&Task> {
  let wanted = filter.wants_done();
  let matched: Vec<&Task> = tasks
    .iter()
    .filter(|task| {
      task.done == Some(wanted)
    })
    .collect();
  trace!(
    total = tasks.len(),
    matched = matched.len(),
    "filtered tasks"
  );
  matched
}
