use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use super::{authed_client, resolve_task};
use crate::config::Config;
use crate::render::Renderer;
use crate::session::SessionStore;
use crate::view::TaskView;

#[instrument(skip(cfg, store, renderer, now))]
pub fn cmd_dashboard(
    cfg: &Config,
    store: &SessionStore,
    renderer: &mut Renderer,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command dashboard");

    let (client, _) = authed_client(cfg, store)?;
    let dashboard = client.dashboard()?;
    renderer.print_dashboard(&dashboard, now)
}

#[instrument(skip(cfg, store, renderer, args, now))]
pub fn cmd_list(
    cfg: &Config,
    store: &SessionStore,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command list");

    let view = TaskView::parse(args)?;
    let (client, _) = authed_client(cfg, store)?;

    let tasks = client.tasks()?;
    let selection = view.select(&tasks);
    renderer.print_task_table(&selection, now)
}

#[instrument(skip(cfg, store, renderer, args))]
pub fn cmd_info(
    cfg: &Config,
    store: &SessionStore,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command info");

    let Some(needle) = args.first() else {
        return Err(anyhow!("info requires a task id"));
    };

    let (client, _) = authed_client(cfg, store)?;
    let tasks = client.tasks()?;
    let task = resolve_task(&tasks, needle)?;

    renderer.print_task_info(task)?;
    println!();

    let comments = client.comments(&task.id)?;
    renderer.print_comments(&comments)
}

#[instrument(skip(cfg, store, renderer, args))]
pub fn cmd_comments(
    cfg: &Config,
    store: &SessionStore,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command comments");

    let Some(needle) = args.first() else {
        return Err(anyhow!("comments requires a task id"));
    };

    let (client, _) = authed_client(cfg, store)?;
    let tasks = client.tasks()?;
    let task = resolve_task(&tasks, needle)?;

    let comments = client.comments(&task.id)?;
    renderer.print_comments(&comments)
}
