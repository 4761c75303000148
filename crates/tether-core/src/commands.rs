mod account;
mod task_ops;
mod views;

use std::io::{self, BufRead, Write};

use anyhow::{Context, anyhow};
use chrono::Utc;
use tracing::{debug, instrument};

use crate::api::ApiClient;
use crate::cli::Invocation;
use crate::config::Config;
use crate::render::Renderer;
use crate::session::{Session, SessionStore};
use crate::task::Task;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "login",
        "register",
        "logout",
        "dashboard",
        "list",
        "add",
        "modify",
        "done",
        "delete",
        "info",
        "comments",
        "comment",
        "profile",
        "preferences",
        "_commands",
        "_show",
        "help",
        "version",
    ]
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

#[instrument(skip(cfg, store, renderer, inv))]
pub fn dispatch(
    cfg: &Config,
    store: &SessionStore,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let command = inv.command.as_str();

    debug!(command, args = ?inv.args, "dispatching command");

    match command {
        "login" => account::cmd_login(cfg, store, &inv.args),
        "register" => account::cmd_register(cfg, store, &inv.args),
        "logout" => account::cmd_logout(store),
        "dashboard" => views::cmd_dashboard(cfg, store, renderer, now),
        "list" => views::cmd_list(cfg, store, renderer, &inv.args, now),
        "info" => views::cmd_info(cfg, store, renderer, &inv.args),
        "comments" => views::cmd_comments(cfg, store, renderer, &inv.args),
        "add" => task_ops::cmd_add(cfg, store, renderer, &inv.args, now),
        "modify" => task_ops::cmd_modify(cfg, store, renderer, &inv.args, now),
        "done" => task_ops::cmd_done(cfg, store, renderer, &inv.args, now),
        "delete" => task_ops::cmd_delete(cfg, store, renderer, &inv.args, now),
        "comment" => task_ops::cmd_comment(cfg, store, renderer, &inv.args),
        "profile" => account::cmd_profile(cfg, store, renderer, &inv.args),
        "preferences" => account::cmd_preferences(cfg, store, renderer, &inv.args),
        "_commands" => cmd_commands(),
        "_show" => cmd_show(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn cmd_commands() -> anyhow::Result<()> {
    for command in known_command_names() {
        println!("{command}");
    }
    Ok(())
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    for (k, v) in cfg.iter() {
        println!("{k}={v}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "Implemented commands: login, register, logout, dashboard, list, add, modify, done, delete, info, comments, comment, profile, preferences"
    );
    Ok(())
}

fn authed_client(cfg: &Config, store: &SessionStore) -> anyhow::Result<(ApiClient, Session)> {
    let session = store.require()?;
    let client = ApiClient::new(cfg.server_url()?, Some(session.token.clone()))?;
    Ok((client, session))
}

fn anonymous_client(cfg: &Config) -> anyhow::Result<ApiClient> {
    ApiClient::new(cfg.server_url()?, None)
}

fn resolve_task<'a>(tasks: &'a [Task], needle: &str) -> anyhow::Result<&'a Task> {
    if needle.is_empty() {
        return Err(anyhow!("task id cannot be empty"));
    }

    if let Some(task) = tasks.iter().find(|t| t.id == needle) {
        return Ok(task);
    }

    let mut matches = tasks.iter().filter(|t| t.id.starts_with(needle));
    let first = matches
        .next()
        .ok_or_else(|| anyhow!("no task matches id: {needle}"))?;
    if matches.next().is_some() {
        return Err(anyhow!("task id prefix is ambiguous: {needle}"));
    }
    Ok(first)
}

fn prompt_line(prompt: &str) -> anyhow::Result<String> {
    eprint!("{prompt}");
    io::stderr().flush().context("failed flushing prompt")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed reading stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn confirm(cfg: &Config, prompt: &str) -> anyhow::Result<bool> {
    if !cfg.get_bool("confirmation").unwrap_or(true) {
        return Ok(true);
    }

    let answer = prompt_line(&format!("{prompt} (y/n) "))?;
    Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{expand_command_abbrev, known_command_names, resolve_task};
    use crate::task::{Priority, Status, Task};

    fn task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            description: None,
            status: Status::Pending,
            priority: Priority::Medium,
            due_date: None,
            category: None,
            created_at: Utc
                .with_ymd_and_hms(2026, 2, 16, 5, 0, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    #[test]
    fn abbreviations_expand_when_unique() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("dash", &known), Some("dashboard"));
        assert_eq!(expand_command_abbrev("comment", &known), Some("comment"));
        assert_eq!(expand_command_abbrev("co", &known), None);
    }

    #[test]
    fn task_id_prefix_resolution() {
        let tasks = vec![task("665f1c9ab8d2aa0012345678"), task("7a01ffffb8d2aa0087654321")];

        assert_eq!(
            resolve_task(&tasks, "665f").expect("unique prefix").id,
            "665f1c9ab8d2aa0012345678"
        );
        assert!(resolve_task(&tasks, "zzz").is_err());
        assert!(resolve_task(&tasks, "").is_err());

        let clashing = vec![task("aa1"), task("aa2")];
        assert!(resolve_task(&clashing, "aa").is_err());
    }
}
