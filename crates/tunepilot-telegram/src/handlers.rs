//! Command handlers for the Telegram bot.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::info;

use tunepilot_config::{presets, ConfigError};
use tunepilot_models::{BackupId, Provider, Task, TaskId, UserId};
use tunepilot_runtime::OrchestratorError;

use crate::state::BotState;

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot and get help")]
    Start,

    #[command(description = "Show help message")]
    Help,

    #[command(description = "Download from a music URL: /download <url>")]
    Download(String),

    #[command(description = "Cancel a download: /cancel <task-id>")]
    Cancel(String),

    #[command(description = "Show your downloads")]
    Status,

    #[command(description = "Show your finished downloads")]
    History,

    #[command(description = "Show a provider's settings: /settings <provider>")]
    Settings(String),

    #[command(description = "Read one setting: /get <provider> <key>")]
    Get(String),

    #[command(description = "Change one setting: /set <provider> <key> <value>")]
    Set(String),

    #[command(description = "Flip a boolean setting: /toggle <provider> <key>")]
    Toggle(String),

    #[command(description = "Apply a preset: /preset <provider> <name>")]
    Preset(String),

    #[command(description = "List available presets")]
    Presets,

    #[command(description = "Reset a provider to defaults: /reset <provider>")]
    Reset(String),

    #[command(description = "Check a provider's settings for problems: /validate <provider>")]
    Validate(String),

    #[command(description = "Back up a provider's settings: /backup <provider>")]
    Backup(String),

    #[command(description = "List a provider's backups: /backups <provider>")]
    Backups(String),

    #[command(description = "Restore a backup: /restore <provider> <backup-id>")]
    Restore(String),
}

/// Dispatches a parsed command.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    let owner = UserId(msg.chat.id.0);
    info!(owner = %owner, ?cmd, "command received");

    let reply = match cmd {
        Command::Start => start_text(),
        Command::Help => Command::descriptions().to_string(),
        Command::Download(arg) => download(&state, owner, &arg),
        Command::Cancel(arg) => cancel(&state, &arg),
        Command::Status => status(&state, owner),
        Command::History => history(&state, owner),
        Command::Settings(arg) => settings(&state, &arg),
        Command::Get(arg) => get(&state, &arg),
        Command::Set(arg) => set(&state, &arg),
        Command::Toggle(arg) => toggle(&state, &arg),
        Command::Preset(arg) => preset(&state, &arg),
        Command::Presets => list_presets(),
        Command::Reset(arg) => reset(&state, &arg),
        Command::Validate(arg) => validate(&state, &arg),
        Command::Backup(arg) => backup(&state, &arg),
        Command::Backups(arg) => backups(&state, &arg),
        Command::Restore(arg) => restore(&state, &arg),
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

/// Handles a plain message that looks like a URL as a download request.
pub async fn handle_url_message(
    bot: Bot,
    msg: Message,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let owner = UserId(msg.chat.id.0);
    let reply = download(&state, owner, text);
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

fn start_text() -> String {
    let providers = Provider::ALL
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Welcome to TunePilot!\n\n\
        Send me a music link and I'll download it for you.\n\
        Supported providers: {}\n\n\
        /download <url> - start a download\n\
        /status - see your downloads\n\
        /settings <provider> - see provider settings\n\n\
        Type /help for all commands.",
        providers
    )
}

fn download(state: &BotState, owner: UserId, arg: &str) -> String {
    let url = arg.trim();
    if url.is_empty() {
        return "Usage: /download <url>".to_string();
    }

    match state.orchestrator.submit(owner, url) {
        Ok(task) => format!(
            "Queued {} download.\nTask: {}\nCancel with /cancel {}",
            task.provider, task.id, task.id
        ),
        Err(OrchestratorError::UnsupportedUrl(_)) => {
            let providers = Provider::ALL
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("That URL isn't from a supported provider ({}).", providers)
        }
        Err(OrchestratorError::Registry(
            tunepilot_registry::RegistryError::DuplicateActiveRequest { .. },
        )) => "You already have a download running for that URL.".to_string(),
        Err(OrchestratorError::Shutdown) => "The bot is shutting down.".to_string(),
        Err(e) => format!("Error: {}", e),
    }
}

fn cancel(state: &BotState, arg: &str) -> String {
    let id = arg.trim();
    if id.is_empty() {
        return "Usage: /cancel <task-id>".to_string();
    }
    let id = TaskId::from(id);
    match state.orchestrator.cancel(&id) {
        Ok(prior) if prior.is_terminal() => {
            format!("Task {} had already finished ({:?}).", id, prior)
        }
        Ok(_) => format!("Cancelled {}.", id),
        Err(e) => format!("Error: {}", e),
    }
}

fn status(state: &BotState, owner: UserId) -> String {
    match state.registry.list_for(owner) {
        Ok(tasks) if tasks.is_empty() => "No downloads yet. Send me a link!".to_string(),
        Ok(tasks) => {
            let mut lines = vec!["Your downloads:".to_string()];
            for task in tasks {
                lines.push(format_task_line(&task));
            }
            lines.join("\n")
        }
        Err(e) => format!("Error: {}", e),
    }
}

fn history(state: &BotState, owner: UserId) -> String {
    match state.history.list_for(owner) {
        Ok(tasks) if tasks.is_empty() => "No finished downloads yet.".to_string(),
        Ok(tasks) => {
            let mut lines = vec!["Recent downloads:".to_string()];
            for task in tasks.iter().take(10) {
                lines.push(format!(
                    "{:?} - {} ({})",
                    task.status,
                    task.url,
                    task.created_at.format("%Y-%m-%d %H:%M")
                ));
            }
            lines.join("\n")
        }
        Err(e) => format!("Error: {}", e),
    }
}

fn settings(state: &BotState, arg: &str) -> String {
    let provider = match parse_provider(arg) {
        Ok(provider) => provider,
        Err(usage) => return usage,
    };

    let sections = match state.store.summary(provider) {
        Ok(sections) => sections,
        Err(e) => return format!("Error: {}", e),
    };

    let mut lines = vec![format!("{} settings:", provider)];
    match state.store.active_preset(provider) {
        Ok(Some(name)) => lines.push(format!("(preset: {})", name)),
        Ok(None) => {}
        Err(e) => return format!("Error: {}", e),
    }
    for section in sections {
        lines.push(format!("\n[{}]", section.name));
        for (key, value) in section.entries {
            lines.push(format!("  {} = {}", key, value));
        }
    }
    lines.join("\n")
}

fn get(state: &BotState, arg: &str) -> String {
    let Some((provider, key)) = split_args2(arg) else {
        return "Usage: /get <provider> <key>".to_string();
    };
    let provider = match parse_provider(&provider) {
        Ok(provider) => provider,
        Err(usage) => return usage,
    };
    match state.store.get(provider, &key) {
        Ok(value) => format!("{} {} = {}", provider, key, value),
        Err(e) => format!("Error: {}", e),
    }
}

fn set(state: &BotState, arg: &str) -> String {
    let Some((provider, key, value)) = split_args3(arg) else {
        return "Usage: /set <provider> <key> <value>".to_string();
    };
    let provider = match parse_provider(&provider) {
        Ok(provider) => provider,
        Err(usage) => return usage,
    };
    match state.store.set_raw(provider, &key, &value) {
        Ok(old) => format!("{} {}: {} -> {}", provider, key, old, value),
        Err(ConfigError::Validation { key, reason }) => {
            format!("Invalid value for {}: {}", key, reason)
        }
        Err(e) => format!("Error: {}", e),
    }
}

fn toggle(state: &BotState, arg: &str) -> String {
    let Some((provider, key)) = split_args2(arg) else {
        return "Usage: /toggle <provider> <key>".to_string();
    };
    let provider = match parse_provider(&provider) {
        Ok(provider) => provider,
        Err(usage) => return usage,
    };
    match state.store.toggle(provider, &key) {
        Ok(value) => format!(
            "{} {} is now {}",
            provider,
            key,
            if value { "on" } else { "off" }
        ),
        Err(e) => format!("Error: {}", e),
    }
}

fn preset(state: &BotState, arg: &str) -> String {
    let Some((provider, name)) = split_args2(arg) else {
        return "Usage: /preset <provider> <name>\nSee /presets for the list.".to_string();
    };
    let provider = match parse_provider(&provider) {
        Ok(provider) => provider,
        Err(usage) => return usage,
    };
    match state.store.apply_preset(provider, &name) {
        Ok(()) => format!("Applied preset {} to {}.", name, provider),
        Err(ConfigError::UnknownPreset(name)) => {
            format!("Unknown preset: {}. See /presets for the list.", name)
        }
        Err(e) => format!("Error: {}", e),
    }
}

fn list_presets() -> String {
    let mut lines = vec!["Available presets:".to_string()];
    for preset in presets() {
        lines.push(format!("  {} - {}", preset.name, preset.description));
    }
    lines.push("\nApply with /preset <provider> <name>".to_string());
    lines.join("\n")
}

fn reset(state: &BotState, arg: &str) -> String {
    let provider = match parse_provider(arg) {
        Ok(provider) => provider,
        Err(usage) => return usage,
    };
    match state.store.reset(provider) {
        Ok(()) => format!("{} settings reset to defaults.", provider),
        Err(e) => format!("Error: {}", e),
    }
}

fn validate(state: &BotState, arg: &str) -> String {
    let provider = match parse_provider(arg) {
        Ok(provider) => provider,
        Err(usage) => return usage,
    };
    match state.store.validate(provider) {
        Ok(issues) if issues.is_empty() => format!("{} settings look good.", provider),
        Ok(issues) => {
            let mut lines = vec![format!("{} settings have problems:", provider)];
            for issue in issues {
                lines.push(format!("  {}: {}", issue.key, issue.reason));
            }
            lines.join("\n")
        }
        Err(e) => format!("Error: {}", e),
    }
}

fn backup(state: &BotState, arg: &str) -> String {
    let provider = match parse_provider(arg) {
        Ok(provider) => provider,
        Err(usage) => return usage,
    };
    match state.store.backup(provider) {
        Ok(id) => format!("Backed up {} settings as {}.", provider, id),
        Err(e) => format!("Error: {}", e),
    }
}

fn backups(state: &BotState, arg: &str) -> String {
    let provider = match parse_provider(arg) {
        Ok(provider) => provider,
        Err(usage) => return usage,
    };
    match state.store.list_backups(provider) {
        Ok(ids) if ids.is_empty() => format!("No backups for {} yet.", provider),
        Ok(ids) => {
            let mut lines = vec![format!("{} backups (newest first):", provider)];
            for id in ids {
                lines.push(format!("  {}", id));
            }
            lines.push("\nRestore with /restore <provider> <backup-id>".to_string());
            lines.join("\n")
        }
        Err(e) => format!("Error: {}", e),
    }
}

fn restore(state: &BotState, arg: &str) -> String {
    let Some((provider, id)) = split_args2(arg) else {
        return "Usage: /restore <provider> <backup-id>".to_string();
    };
    let provider = match parse_provider(&provider) {
        Ok(provider) => provider,
        Err(usage) => return usage,
    };
    let Some(id) = BackupId::parse(&id) else {
        return format!("That doesn't look like a backup ID: {}", id);
    };
    match state.store.restore(provider, &id) {
        Ok(()) => format!("Restored {} settings from {}.", provider, id),
        Err(e) => format!("Error: {}", e),
    }
}

fn parse_provider(arg: &str) -> std::result::Result<Provider, String> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Err(provider_usage());
    }
    arg.parse::<Provider>().map_err(|_| provider_usage())
}

fn provider_usage() -> String {
    let providers = Provider::ALL
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!("Please name a provider: {}", providers)
}

fn split_args2(arg: &str) -> Option<(String, String)> {
    let mut parts = arg.split_whitespace();
    let a = parts.next()?.to_string();
    let b = parts.next()?.to_string();
    Some((a, b))
}

fn split_args3(arg: &str) -> Option<(String, String, String)> {
    let mut parts = arg.splitn(3, char::is_whitespace);
    let a = parts.next()?.trim().to_string();
    let b = parts.next()?.trim().to_string();
    let c = parts.next()?.trim().to_string();
    if a.is_empty() || b.is_empty() || c.is_empty() {
        return None;
    }
    Some((a, b, c))
}

fn format_task_line(task: &Task) -> String {
    let mut line = format!("{} [{:?}] {}%", task.id, task.status, task.progress);
    if let Some(stage) = &task.stage {
        line.push(' ');
        line.push_str(stage);
    }
    line.push_str(" - ");
    line.push_str(&task.url);
    line
}
