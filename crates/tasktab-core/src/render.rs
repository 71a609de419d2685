use std::io::{self, IsTerminal, Write};

use chrono::NaiveDateTime;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::deadline::{normalize_timestamp, remaining};
use crate::model::{Task, TaskList};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self { color: cfg.color()? })
    }

    #[tracing::instrument(skip(self, lists))]
    pub fn print_lists(&mut self, lists: &[TaskList], selected: Option<u64>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let (headers, rows) = self.list_rows(lists, selected);
        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, tasks, now))]
    pub fn print_tasks(&mut self, tasks: &[&Task], now: NaiveDateTime) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let (headers, rows) = self.task_rows(tasks, now);
        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    fn list_rows(&self, lists: &[TaskList], selected: Option<u64>) -> (Vec<String>, Vec<Vec<String>>) {
        let headers = vec!["".to_string(), "ID".to_string(), "Title".to_string()];
        let rows = lists
            .iter()
            .map(|list| {
                let marker = if Some(list.id) == selected { "*" } else { "" };
                vec![
                    marker.to_string(),
                    self.paint(&list.id.to_string(), "33"),
                    list.title.clone(),
                ]
            })
            .collect();
        (headers, rows)
    }

    fn task_rows(&self, tasks: &[&Task], now: NaiveDateTime) -> (Vec<String>, Vec<Vec<String>>) {
        let headers = vec![
            "ID".to_string(),
            "Title".to_string(),
            "Status".to_string(),
            "Limit".to_string(),
            "Remaining".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let limit = normalize_timestamp(task.limit.as_deref());
            let left = match remaining(task.limit.as_deref(), now) {
                Some(r) if r.is_expired() => self.paint(&r.to_string(), "31"),
                Some(r) => r.to_string(),
                None => String::new(),
            };

            rows.push(vec![
                self.paint(&task.id.to_string(), "33"),
                task.title.clone(),
                task.status_label().to_string(),
                limit,
                left,
            ]);
        }

        (headers, rows)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
