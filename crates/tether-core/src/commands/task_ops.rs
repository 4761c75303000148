use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use super::{authed_client, confirm, resolve_task};
use crate::api::ApiClient;
use crate::config::Config;
use crate::datetime::parse_due_expr;
use crate::render::Renderer;
use crate::session::SessionStore;
use crate::task::{Priority, Status, TaskPayload};
use crate::view::TaskView;

#[derive(Debug, Clone)]
enum Mod {
    Description(Option<String>),
    Status(Status),
    Priority(Priority),
    Due(Option<DateTime<Utc>>),
    Category(Option<String>),
}

#[instrument(skip(cfg, store, renderer, args, now))]
pub fn cmd_add(
    cfg: &Config,
    store: &SessionStore,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command add");

    let (client, _) = authed_client(cfg, store)?;
    let (title, mods) = parse_title_and_mods(args, now)?;
    let title = title.ok_or_else(|| anyhow!("add requires a task title"))?;

    let mut payload = TaskPayload {
        title,
        description: None,
        status: Status::Pending,
        priority: Priority::Medium,
        due_date: None,
        category: None,
    };
    apply_mods(&mut payload, &mods);

    client.create_task(&payload)?;
    println!("Created task '{}'.", payload.title);

    refresh_and_render(&client, renderer, now)
}

#[instrument(skip(cfg, store, renderer, args, now))]
pub fn cmd_modify(
    cfg: &Config,
    store: &SessionStore,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command modify");

    let Some((needle, rest)) = args.split_first() else {
        return Err(anyhow!("modify requires a task id"));
    };

    let (title, mods) = parse_title_and_mods(rest, now)?;
    if title.is_none() && mods.is_empty() {
        return Err(anyhow!("modify requires at least one change"));
    }

    let (client, _) = authed_client(cfg, store)?;
    let tasks = client.tasks()?;
    let task = resolve_task(&tasks, needle)?;

    let mut payload = TaskPayload::from_task(task);
    if let Some(title) = title {
        payload.title = title;
    }
    apply_mods(&mut payload, &mods);

    client.update_task(&task.id, &payload)?;
    println!("Updated task {}.", task.short_id());

    refresh_and_render(&client, renderer, now)
}

#[instrument(skip(cfg, store, renderer, args, now))]
pub fn cmd_done(
    cfg: &Config,
    store: &SessionStore,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command done");

    let Some(needle) = args.first() else {
        return Err(anyhow!("done requires a task id"));
    };

    let (client, _) = authed_client(cfg, store)?;
    let tasks = client.tasks()?;
    let task = resolve_task(&tasks, needle)?;

    if task.status == Status::Completed {
        println!("Task {} is already completed.", task.short_id());
        return Ok(());
    }

    let mut payload = TaskPayload::from_task(task);
    payload.status = Status::Completed;

    client.update_task(&task.id, &payload)?;
    println!("Completed task {}.", task.short_id());

    refresh_and_render(&client, renderer, now)
}

#[instrument(skip(cfg, store, renderer, args, now))]
pub fn cmd_delete(
    cfg: &Config,
    store: &SessionStore,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command delete");

    let Some(needle) = args.first() else {
        return Err(anyhow!("delete requires a task id"));
    };

    let (client, _) = authed_client(cfg, store)?;
    let tasks = client.tasks()?;
    let task = resolve_task(&tasks, needle)?;

    if !confirm(cfg, &format!("Delete task '{}'?", task.title))? {
        println!("Not deleting.");
        return Ok(());
    }

    client.delete_task(&task.id)?;
    println!("Deleted task {}.", task.short_id());

    refresh_and_render(&client, renderer, now)
}

#[instrument(skip(cfg, store, renderer, args))]
pub fn cmd_comment(
    cfg: &Config,
    store: &SessionStore,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command comment");

    let Some((needle, rest)) = args.split_first() else {
        return Err(anyhow!("comment requires a task id"));
    };
    let content = rest.join(" ");
    if content.trim().is_empty() {
        return Err(anyhow!("comment requires text"));
    }

    let (client, _) = authed_client(cfg, store)?;
    let tasks = client.tasks()?;
    let task = resolve_task(&tasks, needle)?;

    client.add_comment(&task.id, content.trim())?;
    println!("Comment added.");

    let comments = client.comments(&task.id)?;
    renderer.print_comments(&comments)
}

fn refresh_and_render(
    client: &ApiClient,
    renderer: &mut Renderer,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let tasks = client.tasks()?;
    let selection = TaskView::default().select(&tasks);
    renderer.print_task_table(&selection, now)
}

#[instrument(skip(args, now))]
fn parse_title_and_mods(
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<(Option<String>, Vec<Mod>)> {
    let mut title_parts = Vec::new();
    let mut mods = Vec::new();

    for arg in args {
        if let Some(one_mod) = parse_one_mod(arg, now)? {
            mods.push(one_mod);
        } else {
            title_parts.push(arg.clone());
        }
    }

    let title = if title_parts.is_empty() {
        None
    } else {
        Some(title_parts.join(" "))
    };
    Ok((title, mods))
}

fn parse_one_mod(tok: &str, now: DateTime<Utc>) -> anyhow::Result<Option<Mod>> {
    let (key, value) = if let Some((k, v)) = tok.split_once(':') {
        (k, v)
    } else if let Some((k, v)) = tok.split_once('=') {
        (k, v)
    } else {
        return Ok(None);
    };

    match key.to_ascii_lowercase().as_str() {
        "desc" | "description" => Ok(Some(Mod::Description(non_empty(value)))),
        "status" => {
            let status = Status::parse_term(value).ok_or_else(|| {
                anyhow!("unknown status: {value} (pending, in-progress, completed)")
            })?;
            Ok(Some(Mod::Status(status)))
        }
        "pri" | "priority" => {
            let priority = Priority::parse_term(value)
                .ok_or_else(|| anyhow!("unknown priority: {value} (urgent, high, medium, low)"))?;
            Ok(Some(Mod::Priority(priority)))
        }
        "due" => {
            if value.trim().is_empty() {
                Ok(Some(Mod::Due(None)))
            } else {
                Ok(Some(Mod::Due(Some(parse_due_expr(value, now)?))))
            }
        }
        "cat" | "category" => Ok(Some(Mod::Category(non_empty(value)))),
        other => {
            warn!(key = %other, "unrecognized modifier key; treating token as title text");
            Ok(None)
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn apply_mods(payload: &mut TaskPayload, mods: &[Mod]) {
    for one_mod in mods {
        match one_mod {
            Mod::Description(description) => {
                payload.description = description.clone();
            }
            Mod::Status(status) => {
                payload.status = *status;
            }
            Mod::Priority(priority) => {
                payload.priority = *priority;
            }
            Mod::Due(due) => {
                payload.due_date = *due;
            }
            Mod::Category(category) => {
                payload.category = category.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{apply_mods, parse_title_and_mods};
    use crate::task::{Priority, Status, TaskPayload};

    #[test]
    fn title_words_and_modifiers_separate_cleanly() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 16, 5, 0, 0)
            .single()
            .expect("valid timestamp");

        let args = vec![
            "Pay".to_string(),
            "the".to_string(),
            "rent".to_string(),
            "priority:urgent".to_string(),
            "due:2026-03-01".to_string(),
            "category:home".to_string(),
        ];
        let (title, mods) = parse_title_and_mods(&args, now).expect("parse args");

        assert_eq!(title.as_deref(), Some("Pay the rent"));
        assert_eq!(mods.len(), 3);

        let mut payload = TaskPayload {
            title: title.expect("title"),
            description: None,
            status: Status::Pending,
            priority: Priority::Medium,
            due_date: None,
            category: None,
        };
        apply_mods(&mut payload, &mods);

        assert_eq!(payload.priority, Priority::Urgent);
        assert_eq!(payload.category.as_deref(), Some("home"));
        assert!(payload.due_date.is_some());
    }

    #[test]
    fn empty_due_clears_and_bad_values_reject() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 16, 5, 0, 0)
            .single()
            .expect("valid timestamp");

        let (_, mods) =
            parse_title_and_mods(&["due:".to_string()], now).expect("parse clearing due");
        assert_eq!(mods.len(), 1);

        assert!(parse_title_and_mods(&["status:someday".to_string()], now).is_err());
        assert!(parse_title_and_mods(&["priority:critical".to_string()], now).is_err());
    }
}
