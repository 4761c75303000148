use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::{format_project_date, format_project_datetime};
use crate::task::{Comment, Dashboard, Priority, Status, Task, User};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, tasks, now))]
    pub fn print_task_table(&mut self, tasks: &[&Task], now: DateTime<Utc>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if tasks.is_empty() {
            writeln!(out, "No tasks found.")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Status".to_string(),
            "Pri".to_string(),
            "Due".to_string(),
            "Category".to_string(),
            "Title".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());

        for task in tasks {
            let id = self.paint(task.short_id(), "33");

            let status = match task.status {
                Status::Completed => self.paint(task.status.wire_name(), "32"),
                _ => task.status.wire_name().to_string(),
            };

            let priority = match task.priority {
                Priority::Urgent => self.paint(task.priority.wire_name(), "31"),
                _ => task.priority.wire_name().to_string(),
            };

            let due = task
                .due_date
                .map(format_project_date)
                .unwrap_or_default();
            let due = if task.is_overdue(now) {
                self.paint(&due, "31")
            } else {
                due
            };

            let category = task.category.clone().unwrap_or_default();

            rows.push(vec![id, status, priority, due, category, task.title.clone()]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task))]
    pub fn print_task_info(&mut self, task: &Task) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id        {}", task.id)?;
        writeln!(out, "title     {}", task.title)?;
        writeln!(out, "status    {}", task.status.wire_name())?;
        writeln!(out, "priority  {}", task.priority.wire_name())?;
        if let Some(description) = &task.description {
            writeln!(out, "desc      {description}")?;
        }
        if let Some(category) = &task.category {
            writeln!(out, "category  {category}")?;
        }
        if let Some(due) = task.due_date {
            writeln!(out, "due       {}", format_project_date(due))?;
        }
        writeln!(out, "created   {}", format_project_datetime(task.created_at))?;

        Ok(())
    }

    #[tracing::instrument(skip(self, dashboard, now))]
    pub fn print_dashboard(
        &mut self,
        dashboard: &Dashboard,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        {
            let mut out = io::stdout().lock();
            let summary = &dashboard.summary;
            writeln!(out, "total      {}", summary.total_tasks)?;
            writeln!(out, "completed  {}", summary.completed_tasks)?;
            writeln!(out, "pending    {}", summary.pending_tasks)?;
            writeln!(
                out,
                "overdue    {}",
                self.paint(&summary.overdue_tasks.to_string(), "31")
            )?;
            writeln!(out)?;

            if dashboard.upcoming_tasks.is_empty() {
                writeln!(out, "No upcoming tasks.")?;
                return Ok(());
            }
            writeln!(out, "Upcoming:")?;
        }

        let upcoming: Vec<&Task> = dashboard.upcoming_tasks.iter().take(5).collect();
        self.print_task_table(&upcoming, now)
    }

    #[tracing::instrument(skip(self, comments))]
    pub fn print_comments(&mut self, comments: &[Comment]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if comments.is_empty() {
            writeln!(out, "No comments yet.")?;
            return Ok(());
        }

        for comment in comments {
            writeln!(
                out,
                "{} ({})",
                self.paint(&comment.author.username, "36"),
                format_project_datetime(comment.created_at)
            )?;
            writeln!(out, "  {}", comment.content)?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, user))]
    pub fn print_profile(&mut self, user: &User) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "username            {}", user.username)?;
        writeln!(out, "email               {}", user.email)?;
        writeln!(
            out,
            "email notifications {}",
            on_off(user.preferences.notifications.email)
        )?;
        writeln!(
            out,
            "task reminders      {}",
            on_off(user.preferences.notifications.task_reminders)
        )?;

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
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
