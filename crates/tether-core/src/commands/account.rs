use anyhow::anyhow;
use tracing::{info, instrument, warn};

use super::{anonymous_client, authed_client, prompt_line};
use crate::config::{Config, parse_bool};
use crate::render::Renderer;
use crate::session::{Session, SessionStore};

#[instrument(skip(cfg, store, args))]
pub fn cmd_login(cfg: &Config, store: &SessionStore, args: &[String]) -> anyhow::Result<()> {
    info!("command login");

    let Some(email) = args.first() else {
        return Err(anyhow!("login requires an email address"));
    };

    let password = prompt_line("password: ")?;
    if password.is_empty() {
        return Err(anyhow!("password cannot be empty"));
    }

    let client = anonymous_client(cfg)?;
    let (token, user) = client.login(email, &password)?;

    store.save(&Session {
        token,
        user: user.clone(),
    })?;

    println!("Welcome back, {}.", user.username);
    Ok(())
}

#[instrument(skip(cfg, store, args))]
pub fn cmd_register(cfg: &Config, store: &SessionStore, args: &[String]) -> anyhow::Result<()> {
    info!("command register");

    let (Some(username), Some(email)) = (args.first(), args.get(1)) else {
        return Err(anyhow!("register requires a username and an email address"));
    };

    let password = prompt_line("password: ")?;
    if password.is_empty() {
        return Err(anyhow!("password cannot be empty"));
    }

    let client = anonymous_client(cfg)?;
    let (token, user) = client.register(username, email, &password)?;

    store.save(&Session {
        token,
        user: user.clone(),
    })?;

    println!("Account created. Logged in as {}.", user.username);
    Ok(())
}

#[instrument(skip(store))]
pub fn cmd_logout(store: &SessionStore) -> anyhow::Result<()> {
    info!("command logout");

    store.clear()?;
    println!("Logged out.");
    Ok(())
}

#[instrument(skip(cfg, store, renderer, args))]
pub fn cmd_profile(
    cfg: &Config,
    store: &SessionStore,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command profile");

    let (client, session) = authed_client(cfg, store)?;

    let mut username = None;
    let mut email = None;
    for arg in args {
        let Some((key, value)) = arg.split_once(':').or_else(|| arg.split_once('=')) else {
            return Err(anyhow!("unrecognized profile argument: {arg}"));
        };
        match key.to_ascii_lowercase().as_str() {
            "username" => username = Some(value.to_string()),
            "email" => email = Some(value.to_string()),
            other => return Err(anyhow!("unknown profile field: {other} (username, email)")),
        }
    }

    if username.is_none() && email.is_none() {
        let user = client.profile()?;
        return renderer.print_profile(&user);
    }

    let current = client.profile()?;
    let username = username.unwrap_or(current.username);
    let email = email.unwrap_or(current.email);

    let updated = client.update_profile(&username, &email)?;
    store.save(&Session {
        token: session.token,
        user: updated.clone(),
    })?;

    println!("Profile updated.");
    Ok(())
}

#[instrument(skip(cfg, store, renderer, args))]
pub fn cmd_preferences(
    cfg: &Config,
    store: &SessionStore,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command preferences");

    let (client, _) = authed_client(cfg, store)?;

    if args.is_empty() {
        let user = client.profile()?;
        return renderer.print_profile(&user);
    }

    let current = client.profile()?;
    let mut flags = current.preferences.notifications;

    for arg in args {
        let Some((key, value)) = arg.split_once(':').or_else(|| arg.split_once('=')) else {
            return Err(anyhow!("unrecognized preferences argument: {arg}"));
        };
        match key.to_ascii_lowercase().as_str() {
            "email" => flags.email = parse_bool(value),
            "reminders" | "taskreminders" => flags.task_reminders = parse_bool(value),
            other => {
                warn!(key = %other, "unknown preference key");
                return Err(anyhow!(
                    "unknown preference: {other} (email, reminders)"
                ));
            }
        }
    }

    client.update_preferences(&flags)?;
    println!("Preferences saved.");
    Ok(())
}
