//! Team dashboard commands.

use std::path::Path;

use anyhow::Result;
use console::style;
use dialoguer::Confirm;

use super::{enter_team, open_shell, require_token};
use kanbanize::gate::Capabilities;

pub async fn cmd_teams_list(config: Option<&Path>) -> Result<()> {
    let shell = open_shell(config).await?;
    let token = require_token(&shell).await?;
    shell.teams.refresh(&token).await?;

    let teams = shell.teams.teams();
    if teams.is_empty() {
        println!("No teams available");
        return Ok(());
    }
    for team in teams {
        let members = if team.members.is_empty() {
            "No members".to_string()
        } else {
            team.members
                .iter()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "{:>5}  {}  {}  {}",
            team.id,
            style(&team.name).green().bold(),
            style(&team.code).dim(),
            members
        );
    }
    Ok(())
}

pub async fn cmd_team_create(config: Option<&Path>, name: String) -> Result<()> {
    let shell = open_shell(config).await?;
    let token = require_token(&shell).await?;
    let capabilities = shell.gate().capabilities();
    let team = shell.teams.create(&token, &capabilities, &name).await?;
    println!(
        "Share this code with team members to join: {}",
        style(&team.code).bold()
    );
    Ok(())
}

pub async fn cmd_team_join(config: Option<&Path>, code: String) -> Result<()> {
    let shell = open_shell(config).await?;
    let token = require_token(&shell).await?;
    shell.teams.join(&token, &code).await?;
    Ok(())
}

pub async fn cmd_team_delete(config: Option<&Path>, team_id: i64, force: bool) -> Result<()> {
    let shell = open_shell(config).await?;
    let token = require_token(&shell).await?;
    shell.teams.refresh(&token).await?;

    let name = shell
        .teams
        .teams()
        .iter()
        .find(|t| t.id == team_id)
        .map(|t| t.name.clone())
        .unwrap_or_else(|| format!("#{}", team_id));
    if !force
        && !Confirm::new()
            .with_prompt(format!("Delete team \"{}\"?", name))
            .default(false)
            .interact()?
    {
        return Ok(());
    }

    let capabilities = shell.gate().capabilities();
    shell.teams.delete(&token, &capabilities, team_id).await?;
    Ok(())
}

pub async fn cmd_team_remove_member(
    config: Option<&Path>,
    team_id: i64,
    member_id: i64,
    force: bool,
) -> Result<()> {
    let shell = open_shell(config).await?;
    enter_team(&shell, team_id).await?;
    let token = require_token(&shell).await?;

    if !force
        && !Confirm::new()
            .with_prompt(format!("Remove member {} from the team?", member_id))
            .default(false)
            .interact()?
    {
        return Ok(());
    }

    let capabilities: Capabilities = shell.gate().capabilities();
    shell
        .teams
        .remove_member(&token, &capabilities, team_id, member_id)
        .await?;
    Ok(())
}
