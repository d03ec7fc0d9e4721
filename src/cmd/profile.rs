//! Profile commands.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use console::style;
use dialoguer::Confirm;

use kanbanize::api::models::{ProfileUpdate, Role};
use super::{open_shell, require_token};
use kanbanize::ui::toast::Notifier;

pub async fn cmd_profile_show(config: Option<&Path>) -> Result<()> {
    let shell = open_shell(config).await?;
    let token = require_token(&shell).await?;
    let profile = shell.api.get_profile(&token).await?;

    println!("{}", style(&profile.name).green().bold());
    if let Some(email) = profile.email.as_deref() {
        println!("  email:    {}", email);
    }
    println!(
        "  role:     {}",
        profile.role.map(|r| r.as_str()).unwrap_or("unknown")
    );
    if let Some(position) = profile.position.as_deref().filter(|p| !p.is_empty()) {
        println!("  position: {}", position);
    }
    Ok(())
}

pub async fn cmd_profile_update(
    config: Option<&Path>,
    name: String,
    role: String,
    position: Option<String>,
) -> Result<()> {
    let shell = open_shell(config).await?;
    let token = require_token(&shell).await?;

    let role = Role::from_str(&role).map_err(|err| anyhow!(err))?;
    let update = ProfileUpdate {
        name: name.trim().to_string(),
        role,
        // managers carry no position
        position: if role == Role::ProjectManager {
            String::new()
        } else {
            position.unwrap_or_default()
        },
        profile_pic_data: None,
    };
    shell.api.update_profile(&token, &update).await?;
    shell.notifier.success("Profile updated");
    shell.refresh_gate().await;
    Ok(())
}

pub async fn cmd_profile_deactivate(config: Option<&Path>, force: bool) -> Result<()> {
    let shell = open_shell(config).await?;
    let token = require_token(&shell).await?;

    if !force
        && !Confirm::new()
            .with_prompt("Deactivate your account? This cannot be undone")
            .default(false)
            .interact()?
    {
        return Ok(());
    }

    shell.api.deactivate_profile(&token).await?;
    shell.session.sign_out()?;
    shell.notifier.success("Account deactivated successfully");
    Ok(())
}
