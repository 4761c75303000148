use std::cmp::Ordering;

use anyhow::anyhow;
use tracing::trace;

use crate::task::{Priority, Status, Task};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(Status),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Created,
    Due,
    Priority,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskView {
    pub status: StatusFilter,
    pub priority: Option<Priority>,
    pub sort: SortKey,
}

impl TaskView {
    #[tracing::instrument(skip(terms))]
    pub fn parse(terms: &[String]) -> anyhow::Result<Self> {
        let mut view = Self::default();
        for term in terms {
            view.apply_term(term)?;
        }
        Ok(view)
    }

    fn apply_term(&mut self, term: &str) -> anyhow::Result<()> {
        let lower = term.to_ascii_lowercase();

        if lower == "all" {
            self.status = StatusFilter::All;
            return Ok(());
        }
        if let Some(status) = Status::parse_term(&lower) {
            self.status = StatusFilter::Only(status);
            return Ok(());
        }

        let (key, value) = lower
            .split_once(':')
            .ok_or_else(|| anyhow!("unrecognized selection term: {term}"))?;

        match key {
            "status" => {
                self.status = if value == "all" || value.is_empty() {
                    StatusFilter::All
                } else {
                    StatusFilter::Only(Status::parse_term(value).ok_or_else(|| {
                        anyhow!("unknown status: {value} (pending, in-progress, completed, all)")
                    })?)
                };
            }
            "pri" | "priority" => {
                self.priority = if value.is_empty() {
                    None
                } else {
                    Some(Priority::parse_term(value).ok_or_else(|| {
                        anyhow!("unknown priority: {value} (urgent, high, medium, low)")
                    })?)
                };
            }
            "sort" => {
                self.sort = match value {
                    "created" | "createdat" => SortKey::Created,
                    "due" | "duedate" => SortKey::Due,
                    "pri" | "priority" => SortKey::Priority,
                    other => {
                        return Err(anyhow!("unknown sort key: {other} (created, due, priority)"));
                    }
                };
            }
            other => return Err(anyhow!("unrecognized selection term: {other}:{value}")),
        }

        Ok(())
    }

    pub fn retain(&self, task: &Task) -> bool {
        if let StatusFilter::Only(status) = self.status
            && task.status != status
        {
            return false;
        }
        if let Some(priority) = self.priority
            && task.priority != priority
        {
            return false;
        }
        true
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn select<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        let mut selected: Vec<&Task> =
            tasks.iter().filter(|task| self.retain(task)).collect();
        selected.sort_by(|a, b| compare(a, b, self.sort));

        trace!(
            total = tasks.len(),
            selected = selected.len(),
            sort = ?self.sort,
            "selected tasks for display"
        );
        selected
    }
}

fn compare(a: &Task, b: &Task, sort: SortKey) -> Ordering {
    match sort {
        SortKey::Created => b.created_at.cmp(&a.created_at),
        SortKey::Due => match (a.due_date, b.due_date) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::Priority => a.priority.rank().cmp(&b.priority.rank()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{SortKey, StatusFilter, TaskView};
    use crate::task::{Priority, Status, Task};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 16, hour, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn task(id: &str, status: Status, priority: Priority, created: DateTime<Utc>) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            description: None,
            status,
            priority,
            due_date: None,
            category: None,
            created_at: created,
        }
    }

    #[test]
    fn status_filter_is_exact_and_idempotent() {
        let tasks = vec![
            task("1", Status::Pending, Priority::Low, at(1)),
            task("2", Status::Completed, Priority::Urgent, at(2)),
            task("3", Status::InProgress, Priority::Medium, at(3)),
        ];

        let view = TaskView {
            status: StatusFilter::Only(Status::Pending),
            ..TaskView::default()
        };

        let once = view.select(&tasks);
        assert!(once.iter().all(|t| t.status == Status::Pending));
        assert_eq!(once.len(), 1);

        let once_owned: Vec<Task> = once.iter().map(|t| (*t).clone()).collect();
        let twice = view.select(&once_owned);
        assert_eq!(twice.len(), once_owned.len());
    }

    #[test]
    fn created_sort_is_newest_first() {
        let tasks = vec![
            task("old", Status::Pending, Priority::Low, at(1)),
            task("new", Status::Pending, Priority::Low, at(5)),
            task("mid", Status::Pending, Priority::Low, at(3)),
        ];

        let view = TaskView::default();
        let order: Vec<&str> = view.select(&tasks).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, vec!["new", "mid", "old"]);
    }

    #[test]
    fn due_sort_puts_dated_tasks_first() {
        let mut dated = task("dated", Status::Pending, Priority::Low, at(1));
        dated.due_date = Some(at(2) + Duration::days(30));
        let undated = task("undated", Status::Pending, Priority::Low, at(2));

        let view = TaskView {
            sort: SortKey::Due,
            ..TaskView::default()
        };

        let tasks = vec![undated, dated];
        let order: Vec<&str> = view.select(&tasks).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, vec!["dated", "undated"]);
    }

    #[test]
    fn due_sort_is_ascending_among_dated_tasks() {
        let mut soon = task("soon", Status::Pending, Priority::Low, at(1));
        soon.due_date = Some(at(1) + Duration::days(1));
        let mut later = task("later", Status::Pending, Priority::Low, at(2));
        later.due_date = Some(at(1) + Duration::days(9));

        let view = TaskView {
            sort: SortKey::Due,
            ..TaskView::default()
        };

        let tasks = vec![later, soon];
        let order: Vec<&str> = view.select(&tasks).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, vec!["soon", "later"]);
    }

    #[test]
    fn priority_sort_orders_by_severity_regardless_of_input_order() {
        let tasks = vec![
            task("l", Status::Pending, Priority::Low, at(1)),
            task("u", Status::Pending, Priority::Urgent, at(2)),
            task("m", Status::Pending, Priority::Medium, at(3)),
        ];

        let view = TaskView {
            sort: SortKey::Priority,
            ..TaskView::default()
        };

        let order: Vec<&str> = view.select(&tasks).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, vec!["u", "m", "l"]);
    }

    #[test]
    fn unknown_priority_sorts_after_low() {
        let tasks = vec![
            task("x", Status::Pending, Priority::Unknown, at(1)),
            task("l", Status::Pending, Priority::Low, at(2)),
        ];

        let view = TaskView {
            sort: SortKey::Priority,
            ..TaskView::default()
        };

        let order: Vec<&str> = view.select(&tasks).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, vec!["l", "x"]);
    }

    #[test]
    fn status_and_priority_filters_commute() {
        let tasks = vec![
            task("1", Status::Pending, Priority::High, at(1)),
            task("2", Status::Pending, Priority::Low, at(2)),
            task("3", Status::Completed, Priority::High, at(3)),
            task("4", Status::InProgress, Priority::High, at(4)),
        ];

        let both = TaskView {
            status: StatusFilter::Only(Status::Pending),
            priority: Some(Priority::High),
            ..TaskView::default()
        };
        let status_only = TaskView {
            status: StatusFilter::Only(Status::Pending),
            ..TaskView::default()
        };
        let priority_only = TaskView {
            priority: Some(Priority::High),
            ..TaskView::default()
        };

        let combined: Vec<String> = both.select(&tasks).iter().map(|t| t.id.clone()).collect();

        let after_status: Vec<Task> = status_only
            .select(&tasks)
            .iter()
            .map(|t| (*t).clone())
            .collect();
        let status_then_priority: Vec<String> = priority_only
            .select(&after_status)
            .iter()
            .map(|t| t.id.clone())
            .collect();

        let after_priority: Vec<Task> = priority_only
            .select(&tasks)
            .iter()
            .map(|t| (*t).clone())
            .collect();
        let priority_then_status: Vec<String> = status_only
            .select(&after_priority)
            .iter()
            .map(|t| t.id.clone())
            .collect();

        assert_eq!(combined, status_then_priority);
        assert_eq!(combined, priority_then_status);
    }

    #[test]
    fn pending_filter_scenario_from_mixed_set() {
        let tasks = vec![
            task("1", Status::Pending, Priority::Low, at(1)),
            task("2", Status::Completed, Priority::Urgent, at(2)),
        ];

        let view = TaskView {
            status: StatusFilter::Only(Status::Pending),
            ..TaskView::default()
        };

        let selected = view.select(&tasks);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "1");
    }

    #[test]
    fn due_sort_scenario_dated_before_undated() {
        let undated = task("none", Status::Pending, Priority::Low, at(1));
        let mut dated = task("jan", Status::Pending, Priority::Low, at(2));
        dated.due_date = Some(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                .single()
                .expect("valid timestamp"),
        );

        let view = TaskView {
            sort: SortKey::Due,
            ..TaskView::default()
        };

        let tasks = vec![undated, dated];
        let order: Vec<&str> = view.select(&tasks).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(order, vec!["jan", "none"]);
    }

    #[test]
    fn selection_does_not_mutate_the_snapshot() {
        let tasks = vec![
            task("b", Status::Pending, Priority::Low, at(1)),
            task("a", Status::Pending, Priority::Urgent, at(2)),
        ];
        let before: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();

        let view = TaskView {
            sort: SortKey::Priority,
            ..TaskView::default()
        };
        let _ = view.select(&tasks);

        let after: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn parse_accepts_tab_terms_and_keyed_terms() {
        let view = TaskView::parse(&[
            "completed".to_string(),
            "priority:high".to_string(),
            "sort:due".to_string(),
        ])
        .expect("parse view terms");

        assert_eq!(view.status, StatusFilter::Only(Status::Completed));
        assert_eq!(view.priority, Some(Priority::High));
        assert_eq!(view.sort, SortKey::Due);

        assert!(TaskView::parse(&["sort:alphabetical".to_string()]).is_err());
        assert!(TaskView::parse(&["priority:sideways".to_string()]).is_err());
    }
}
