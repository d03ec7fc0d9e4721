//! Board and card commands.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use chrono::NaiveDate;
use console::style;

use kanbanize::api::models::{Column, Priority};
use super::{enter_team, open_shell, require_token};
use kanbanize::ui::board_view;

fn parse_column(column: &str) -> Result<Column> {
    Column::from_str(column).map_err(|err| anyhow!(err))
}

fn parse_priority(priority: &str) -> Result<Priority> {
    Priority::from_str(priority).map_err(|err| anyhow!(err))
}

fn parse_deadline(deadline: Option<&str>) -> Result<Option<NaiveDate>> {
    deadline
        .map(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|_| anyhow!("Deadline must be YYYY-MM-DD, got '{}'", d))
        })
        .transpose()
}

/// Print the five-lane board for a team.
pub async fn cmd_board_show(config: Option<&Path>, team_id: i64) -> Result<()> {
    let shell = open_shell(config).await?;
    enter_team(&shell, team_id).await?;
    let ctx = shell.board_ctx().await?;
    shell.board.refresh(&ctx).await?;

    let team_name = shell
        .teams
        .selected_team()
        .map(|t| t.name)
        .unwrap_or_default();
    println!("{}\n", style(&team_name).green().bold());
    board_view::print_board(&shell.store.snapshot());
    Ok(())
}

pub async fn cmd_card_add(
    config: Option<&Path>,
    team_id: i64,
    column: String,
    title: String,
    priority: String,
    deadline: Option<String>,
) -> Result<()> {
    let shell = open_shell(config).await?;
    enter_team(&shell, team_id).await?;
    let ctx = shell.board_ctx().await?;
    shell
        .board
        .create_card(
            &ctx,
            parse_column(&column)?,
            &title,
            parse_priority(&priority)?,
            parse_deadline(deadline.as_deref())?,
            None,
        )
        .await?;
    Ok(())
}

pub async fn cmd_card_move(
    config: Option<&Path>,
    team_id: i64,
    card_id: i64,
    column: String,
) -> Result<()> {
    let shell = open_shell(config).await?;
    enter_team(&shell, team_id).await?;
    let ctx = shell.board_ctx().await?;
    shell.board.refresh(&ctx).await?;
    shell
        .board
        .move_card(&ctx, card_id, parse_column(&column)?)
        .await?;
    Ok(())
}

pub async fn cmd_card_delete(config: Option<&Path>, team_id: i64, card_id: i64) -> Result<()> {
    let shell = open_shell(config).await?;
    enter_team(&shell, team_id).await?;
    let ctx = shell.board_ctx().await?;
    shell.board.refresh(&ctx).await?;
    shell.board.delete_card(&ctx, card_id).await?;
    Ok(())
}

pub async fn cmd_card_assign(
    config: Option<&Path>,
    team_id: i64,
    card_id: i64,
    member_id: i64,
) -> Result<()> {
    let shell = open_shell(config).await?;
    enter_team(&shell, team_id).await?;
    let ctx = shell.board_ctx().await?;
    shell.board.refresh(&ctx).await?;

    let member = shell
        .teams
        .selected_team()
        .and_then(|team| team.members.into_iter().find(|m| m.id == member_id));
    let Some(member) = member else {
        bail!("Member {} is not on this team", member_id);
    };
    shell.board.assign_card(&ctx, card_id, &member).await?;
    Ok(())
}

/// Set a card's progress. Values travel through the same 500 ms debouncer a
/// slider drag uses, so rapid repeated calls settle into one update.
pub async fn cmd_card_progress(
    config: Option<&Path>,
    team_id: i64,
    card_id: i64,
    value: u8,
) -> Result<()> {
    if value > 100 {
        bail!("Progress must be between 0 and 100");
    }
    let shell = open_shell(config).await?;
    enter_team(&shell, team_id).await?;
    let token = require_token(&shell).await?;
    // the workday gate needs the tracker's current state
    shell.timer.resume(&token).await.ok();
    let ctx = shell.board_ctx().await?;
    shell.board.refresh(&ctx).await?;

    let debouncer = shell.board.progress_debouncer(ctx, card_id);
    debouncer.submit(value);
    debouncer.close().await;
    Ok(())
}

pub async fn cmd_card_complete(config: Option<&Path>, team_id: i64, card_id: i64) -> Result<()> {
    let shell = open_shell(config).await?;
    enter_team(&shell, team_id).await?;
    let token = require_token(&shell).await?;
    shell.timer.resume(&token).await.ok();
    let ctx = shell.board_ctx().await?;
    shell.board.refresh(&ctx).await?;
    shell.board.toggle_complete(&ctx, card_id).await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn cmd_card_edit(
    config: Option<&Path>,
    team_id: i64,
    card_id: i64,
    title: String,
    priority: String,
    deadline: Option<String>,
    progress: u8,
) -> Result<()> {
    let shell = open_shell(config).await?;
    enter_team(&shell, team_id).await?;
    let ctx = shell.board_ctx().await?;
    shell.board.refresh(&ctx).await?;
    shell
        .board
        .edit_card(
            &ctx,
            card_id,
            &title,
            parse_priority(&priority)?,
            parse_deadline(deadline.as_deref())?,
            progress,
        )
        .await?;
    Ok(())
}

/// Live board: runs the 30-second poll and the sprint sweep, re-rendering on
/// every store change until interrupted.
pub async fn cmd_watch(config: Option<&Path>, team_id: i64) -> Result<()> {
    let shell = open_shell(config).await?;
    enter_team(&shell, team_id).await?;
    let token = require_token(&shell).await?;
    shell.timer.resume(&token).await.ok();

    let handles = shell.start_sync();
    let mut changes = shell.store.subscribe();
    println!("{}", style("Watching board — Ctrl-C to stop").dim());

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let cards = changes.borrow_and_update().clone();
                println!();
                board_view::print_board(&cards);
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    for handle in handles {
        handle.abort();
    }
    Ok(())
}
