//! Workday tracker commands.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use super::{enter_team, open_shell, require_token};
use kanbanize::ui::icons::CLOCK;
use kanbanize::workday::format_hms;

pub async fn cmd_workday_start(config: Option<&Path>) -> Result<()> {
    let shell = open_shell(config).await?;
    let token = require_token(&shell).await?;
    shell.timer.resume(&token).await?;
    shell.timer.start(&token, Utc::now()).await?;
    Ok(())
}

/// End the day. With a team given, the summary toast enumerates that team's
/// visible tasks; without one it reports "No tasks assigned".
pub async fn cmd_workday_end(config: Option<&Path>, team_id: Option<i64>) -> Result<()> {
    let shell = open_shell(config).await?;
    let token = require_token(&shell).await?;
    shell.timer.resume(&token).await?;

    if let Some(team_id) = team_id {
        enter_team(&shell, team_id).await?;
        let ctx = shell.board_ctx().await?;
        shell.board.refresh(&ctx).await?;
    }

    let tasks = shell.store.snapshot();
    shell.timer.end(&token, Utc::now(), &tasks).await?;
    Ok(())
}

/// Show the tracker state; `--follow` keeps the elapsed clock ticking once a
/// second until interrupted.
pub async fn cmd_workday_status(config: Option<&Path>, follow: bool) -> Result<()> {
    let shell = open_shell(config).await?;
    let token = require_token(&shell).await?;
    shell.timer.resume(&token).await?;

    if !shell.timer.is_running() {
        match shell.timer.can_start(Utc::now()) {
            Ok(()) => println!("{}Idle — ready to start a new workday", CLOCK),
            Err(minutes) => println!(
                "{}Idle — next workday available in {} minutes",
                CLOCK, minutes
            ),
        }
        return Ok(());
    }

    if !follow {
        let elapsed = shell.timer.elapsed(Utc::now()).unwrap_or_default();
        println!(
            "{}Running — elapsed {}",
            CLOCK,
            style(format_hms(elapsed)).bold()
        );
        return Ok(());
    }

    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .expect("spinner template is a valid static string"),
    );
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tick.tick() => {
                // recomputed from now - start each second, never accumulated
                let elapsed = shell.timer.elapsed(Utc::now()).unwrap_or_default();
                bar.set_message(format!("Elapsed {}", format_hms(elapsed)));
            }
            _ = tokio::signal::ctrl_c() => {
                bar.finish_and_clear();
                return Ok(());
            }
        }
    }
}
