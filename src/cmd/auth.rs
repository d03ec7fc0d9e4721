//! Authentication commands: sign-in, sign-up, sign-out, email flows.

use std::path::Path;

use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::{Input, Password};

use super::{open_shell, prompt_if_missing, require_token, validate_email};
use kanbanize::ui::toast::Notifier;

/// Where to obtain a Google OAuth ID token for the browser handoff.
const OAUTH_PLAYGROUND_URL: &str = "https://developers.google.com/oauthplayground/";

pub async fn cmd_login(
    config: Option<&Path>,
    email: Option<String>,
    google: bool,
) -> Result<()> {
    let shell = open_shell(config).await?;

    let tokens = if google {
        // OAuth handoff: the provider credential is obtained in the browser
        // and pasted back here.
        println!(
            "Opening {} — sign in with Google and copy the ID token.",
            style(OAUTH_PLAYGROUND_URL).cyan()
        );
        if open::that(OAUTH_PLAYGROUND_URL).is_err() {
            println!("Could not open a browser; visit the URL manually.");
        }
        let oauth_token: String = Input::new()
            .with_prompt("Google ID token")
            .interact_text()
            .context("Failed to read the OAuth token")?;
        shell
            .provider
            .sign_in_with_idp("google.com", oauth_token.trim())
            .await?
    } else {
        let email = validate_email(&prompt_if_missing(email, "Email")?)?;
        let password = Password::new()
            .with_prompt("Password")
            .interact()
            .context("Failed to read password")?;
        shell.provider.sign_in_with_password(&email, &password).await?
    };

    let principal = shell.session.establish(tokens).await?;
    if !principal.email_verified {
        // unverified accounts are not allowed to hold a session
        shell.notifier.error("Please verify your email before logging in");
        shell.session.sign_out()?;
        return Ok(());
    }

    shell.refresh_gate().await;
    shell
        .notifier
        .success(&format!("Logged in as {}", principal.email));
    Ok(())
}

pub async fn cmd_signup(config: Option<&Path>, email: Option<String>) -> Result<()> {
    let shell = open_shell(config).await?;

    let email = validate_email(&prompt_if_missing(email, "Email")?)?;
    let password = Password::new()
        .with_prompt("Password (6+ characters)")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .context("Failed to read password")?;
    if password.len() < 6 {
        bail!("Password must be at least 6 characters");
    }

    let tokens = shell.provider.sign_up(&email, &password).await?;
    shell
        .provider
        .send_verification_email(&tokens.id_token)
        .await?;
    shell.session.establish(tokens).await?;
    shell.notifier.success(&format!(
        "Account created. Verification email sent to {}",
        email
    ));
    println!("Verify your email, then run {}.", style("kanbanize login").cyan());
    Ok(())
}

pub async fn cmd_logout(config: Option<&Path>) -> Result<()> {
    let shell = open_shell(config).await?;
    shell.session.sign_out()?;
    shell.notifier.success("Logged out");
    Ok(())
}

pub async fn cmd_forgot_password(config: Option<&Path>, email: Option<String>) -> Result<()> {
    let shell = open_shell(config).await?;
    let email = validate_email(&prompt_if_missing(email, "Email")?)?;
    shell.provider.send_password_reset_email(&email).await?;
    shell
        .notifier
        .success(&format!("Password reset email sent to {}", email));
    Ok(())
}

pub async fn cmd_send_verification(config: Option<&Path>) -> Result<()> {
    let shell = open_shell(config).await?;
    let token = require_token(&shell).await?;
    shell.provider.send_verification_email(&token).await?;
    shell.notifier.success("Verification email sent");
    Ok(())
}

/// Reauthenticate with the current password, then set a new one.
pub async fn cmd_change_password(config: Option<&Path>) -> Result<()> {
    let shell = open_shell(config).await?;
    let Some(principal) = shell.session.principal() else {
        bail!("No active session. Run `kanbanize login` first");
    };

    let current = Password::new()
        .with_prompt("Current password")
        .interact()
        .context("Failed to read password")?;
    let new = Password::new()
        .with_prompt("New password (6+ characters)")
        .with_confirmation("Confirm new password", "Passwords do not match")
        .interact()
        .context("Failed to read password")?;
    if new.len() < 6 {
        bail!("Password must be at least 6 characters");
    }

    let tokens = shell
        .provider
        .update_password(&principal.email, &current, &new)
        .await?;
    shell.session.establish(tokens).await?;
    shell.notifier.success("Password updated");
    Ok(())
}
