//! Integration tests for the kanbanize CLI.
//!
//! These run the real binary against an isolated home directory, so no cached
//! session or user config leaks in. Everything that needs a live API or
//! identity provider is exercised at the library layer instead.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper to create a kanbanize Command with an isolated environment.
fn kanbanize(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("kanbanize");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env("XDG_DATA_HOME", home.path());
    cmd
}

fn isolated_home() -> TempDir {
    TempDir::new().unwrap()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        let home = isolated_home();
        kanbanize(&home).arg("--help").assert().success();
    }

    #[test]
    fn test_version() {
        let home = isolated_home();
        kanbanize(&home).arg("--version").assert().success();
    }

    #[test]
    fn test_subcommand_help_screens() {
        let home = isolated_home();
        for subcommand in ["login", "teams", "card", "workday", "profile", "watch"] {
            kanbanize(&home)
                .args([subcommand, "--help"])
                .assert()
                .success();
        }
    }

    #[test]
    fn test_board_requires_team_flag() {
        let home = isolated_home();
        kanbanize(&home)
            .arg("board")
            .assert()
            .failure()
            .stderr(predicate::str::contains("--team"));
    }
}

// =============================================================================
// Session Gating
// =============================================================================

mod session_gating {
    use super::*;

    #[test]
    fn test_teams_without_session_reports_not_signed_in() {
        let home = isolated_home();
        kanbanize(&home)
            .arg("teams")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No active session"));
    }

    #[test]
    fn test_workday_start_without_session_reports_not_signed_in() {
        let home = isolated_home();
        kanbanize(&home)
            .args(["workday", "start"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No active session"));
    }

    #[test]
    fn test_profile_without_session_reports_not_signed_in() {
        let home = isolated_home();
        kanbanize(&home)
            .args(["profile", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No active session"));
    }

    #[test]
    fn test_logout_without_session_succeeds() {
        // dropping a session that does not exist is not an error
        let home = isolated_home();
        kanbanize(&home)
            .arg("logout")
            .assert()
            .success()
            .stdout(predicate::str::contains("Logged out"));
    }
}

// =============================================================================
// Argument Validation
// =============================================================================

mod argument_validation {
    use super::*;

    #[test]
    fn test_card_progress_rejects_values_over_100() {
        let home = isolated_home();
        kanbanize(&home)
            .args(["card", "progress", "--team", "1", "7", "101"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("between 0 and 100"));
    }

    #[test]
    fn test_card_progress_rejects_non_numeric_value() {
        let home = isolated_home();
        kanbanize(&home)
            .args(["card", "progress", "--team", "1", "7", "lots"])
            .assert()
            .failure();
    }

    #[test]
    fn test_explicit_config_path_must_exist() {
        let home = isolated_home();
        kanbanize(&home)
            .args(["--config", "/nonexistent/kanbanize.toml", "teams"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read config file"));
    }
}
