use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::{format_local_date, format_local_datetime};
use crate::task::{Category, Task, TaskHistory};
use crate::view::{StatusGroups, Summary};

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

    #[tracing::instrument(skip(self, tasks, categories, now))]
    pub fn print_task_table(
        &mut self,
        tasks: &[Task],
        categories: &[Category],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_task_table(&mut out, tasks, categories, now)
    }

    fn write_task_table<W: Write>(
        &self,
        writer: &mut W,
        tasks: &[Task],
        categories: &[Category],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Pri".to_string(),
            "Due".to_string(),
            "Category".to_string(),
            "Title".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());

        for task in tasks {
            let id = self.paint(&task.id.to_string(), "33");

            let due = task.due_date.map(format_local_date).unwrap_or_default();
            let due = match task.due_date {
                Some(task_due) if task_due < now && !task.is_completed() => {
                    self.paint(&due, "31")
                }
                _ => due,
            };

            let priority = task.priority.as_str().to_string();
            let category = task
                .category_id
                .and_then(|id| categories.iter().find(|c| c.id == id))
                .map(|c| c.name.clone())
                .unwrap_or_default();

            let title = if task.is_completed() {
                self.paint(&task.title, "2")
            } else {
                task.title.clone()
            };

            rows.push(vec![id, priority, due, category, title]);
        }

        write_table(writer, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, groups, categories, now))]
    pub fn print_board(
        &mut self,
        groups: &StatusGroups,
        categories: &[Category],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let sections: [(&str, &[Task]); 3] = [
            ("Todo", &groups.todo),
            ("In progress", &groups.in_progress),
            ("Completed", &groups.completed),
        ];

        for (idx, (label, tasks)) in sections.iter().enumerate() {
            if idx > 0 {
                writeln!(out)?;
            }
            writeln!(out, "{} ({})", label, tasks.len())?;
            if !tasks.is_empty() {
                self.write_task_table(&mut out, tasks, categories, now)?;
            }
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, summary))]
    pub fn print_summary(&mut self, summary: &Summary) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "Due today        {}", summary.today)?;
        writeln!(out, "Completed today  {}", summary.completed_today)?;
        writeln!(out, "Overdue          {}", self.paint_count(summary.overdue, "31"))?;
        writeln!(out, "Upcoming         {}", summary.upcoming)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task, category))]
    pub fn print_task_detail(
        &mut self,
        task: &Task,
        category: Option<&Category>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id         {}", task.id)?;
        writeln!(out, "title      {}", task.title)?;
        writeln!(out, "status     {}", task.status.as_str())?;
        writeln!(out, "priority   {}", task.priority.as_str())?;
        writeln!(
            out,
            "category   {}",
            category.map(|c| c.name.as_str()).unwrap_or_default()
        )?;
        if let Some(description) = &task.description {
            writeln!(out, "desc       {description}")?;
        }
        if let Some(due) = task.due_date {
            writeln!(out, "due        {}", format_local_datetime(due))?;
        }
        writeln!(out, "created    {}", format_local_datetime(task.created_at))?;
        if let Some(updated) = task.updated_at {
            writeln!(out, "updated    {}", format_local_datetime(updated))?;
        }
        if let Some(completed_at) = task.completed_at {
            writeln!(out, "completed  {}", format_local_datetime(completed_at))?;
        }
        if let Some(parent) = task.parent_task_id {
            writeln!(out, "parent     {parent}")?;
        }
        if task.ai_generated {
            writeln!(out, "origin     suggested")?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, rows))]
    pub fn print_history_table(&mut self, rows: &[TaskHistory]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "Time".to_string(),
            "Action".to_string(),
            "From".to_string(),
            "To".to_string(),
        ];

        let table_rows = rows
            .iter()
            .map(|row| {
                vec![
                    format_local_datetime(row.timestamp),
                    row.action.as_str().to_string(),
                    row.previous_status.map(|s| s.as_str().to_string()).unwrap_or_default(),
                    row.new_status.map(|s| s.as_str().to_string()).unwrap_or_default(),
                ]
            })
            .collect();

        write_table(&mut out, headers, table_rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, categories))]
    pub fn print_categories(&mut self, categories: &[Category]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec!["ID".to_string(), "Name".to_string(), "Color".to_string()];
        let rows = categories
            .iter()
            .map(|c| vec![c.id.to_string(), c.name.clone(), c.color.clone()])
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    fn paint_count(&self, count: usize, code: &str) -> String {
        if count == 0 {
            return count.to_string();
        }
        self.paint(&count.to_string(), code)
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
