//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled                                        |
//! |-----------|---------------------------------------------------------|
//! | `auth`    | `Login`, `Signup`, `Logout`, `ForgotPassword`,          |
//! |           | `SendVerification`, `ChangePassword`                    |
//! | `profile` | `Profile`                                               |
//! | `teams`   | `Teams`                                                 |
//! | `board`   | `Board`, `Card`, `Watch`                                |
//! | `workday` | `Workday`                                               |

pub mod auth;
pub mod board;
pub mod profile;
pub mod teams;
pub mod workday;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use kanbanize::config::Config;
use kanbanize::shell::AppShell;
use kanbanize::ui::toast::ConsoleNotifier;

pub use auth::{
    cmd_change_password, cmd_forgot_password, cmd_login, cmd_logout, cmd_send_verification,
    cmd_signup,
};
pub use board::{
    cmd_board_show, cmd_card_add, cmd_card_assign, cmd_card_complete, cmd_card_delete,
    cmd_card_edit, cmd_card_move, cmd_card_progress, cmd_watch,
};
pub use profile::{cmd_profile_deactivate, cmd_profile_show, cmd_profile_update};
pub use teams::{
    cmd_team_create, cmd_team_delete, cmd_team_join, cmd_team_remove_member, cmd_teams_list,
};
pub use workday::{cmd_workday_end, cmd_workday_start, cmd_workday_status};

/// Build the shell, resolve the cached session and evaluate the gate.
pub(crate) async fn open_shell(config_path: Option<&Path>) -> Result<Arc<AppShell>> {
    let config = Config::load(config_path)?;
    let shell = Arc::new(AppShell::new(config, Arc::new(ConsoleNotifier)));
    shell.init().await;
    Ok(shell)
}

/// A fresh ID token for the signed-in user.
pub(crate) async fn require_token(shell: &AppShell) -> Result<String> {
    Ok(shell.session.id_token().await?)
}

/// Load the team list and select `team_id` for the board commands.
pub(crate) async fn enter_team(shell: &Arc<AppShell>, team_id: i64) -> Result<()> {
    let token = require_token(shell).await?;
    shell.teams.refresh(&token).await?;
    shell.select_team(team_id)?;
    Ok(())
}

/// Validate an email address before sending it to the identity provider.
pub(crate) fn validate_email(email: &str) -> Result<String> {
    let email = email.trim();
    let pattern = regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid");
    if !pattern.is_match(email) {
        bail!("'{}' is not a valid email address", email);
    }
    Ok(email.to_string())
}

/// Prompt for a value when it was not passed as a flag.
pub(crate) fn prompt_if_missing(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => dialoguer::Input::new()
            .with_prompt(prompt)
            .interact_text()
            .context("Failed to read input"),
    }
}
