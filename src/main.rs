use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "kanbanize")]
#[command(version, about = "Headless client for the Kanbanize project tracker")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to kanbanize.toml. Defaults to the working directory, then the
    /// user config dir.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email + password, or via Google OAuth
    Login {
        #[arg(long)]
        email: Option<String>,

        /// Sign in through the Google OAuth browser handoff
        #[arg(long)]
        google: bool,
    },
    /// Create an account and send the verification email
    Signup {
        #[arg(long)]
        email: Option<String>,
    },
    /// Drop the local session
    Logout,
    /// Send a password reset email
    ForgotPassword { email: Option<String> },
    /// Re-send the email verification message
    SendVerification,
    /// Change the account password (reauthenticates first)
    ChangePassword,
    /// Show or change the user profile
    Profile {
        #[command(subcommand)]
        command: Option<ProfileCommands>,
    },
    /// Team dashboard: list, create, join, delete, membership
    Teams {
        #[command(subcommand)]
        command: Option<TeamsCommands>,
    },
    /// Print the five-lane board for a team
    Board {
        #[arg(short, long)]
        team: i64,
    },
    /// Card operations on a team's board
    Card {
        #[command(subcommand)]
        command: CardCommands,
    },
    /// The workday tracker
    Workday {
        #[command(subcommand)]
        command: WorkdayCommands,
    },
    /// Live board: poll, sweep expired sprints, re-render on changes
    Watch {
        #[arg(short, long)]
        team: i64,
    },
}

#[derive(Subcommand, Clone)]
pub enum ProfileCommands {
    /// Show the signed-in profile
    Show,
    /// Update name, role and position
    Update {
        #[arg(long)]
        name: String,
        /// "Project Manager" or "Team Member"
        #[arg(long)]
        role: String,
        #[arg(long)]
        position: Option<String>,
    },
    /// Deactivate the account
    Deactivate {
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum TeamsCommands {
    /// List your teams
    List,
    /// Create a team (Project Manager only)
    Create { name: String },
    /// Join a team by its 6-character code
    Join { code: String },
    /// Delete a team (Project Manager only)
    Delete {
        team: i64,
        #[arg(long)]
        force: bool,
    },
    /// Remove a member from a team (Project Manager only)
    RemoveMember {
        team: i64,
        member: i64,
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum CardCommands {
    /// Create a card in a lane
    Add {
        #[arg(short, long)]
        team: i64,
        /// backlog, todo, doing, review or done
        #[arg(long, default_value = "backlog")]
        column: String,
        #[arg(long)]
        title: String,
        /// Low, Medium or High
        #[arg(long, default_value = "Medium")]
        priority: String,
        /// YYYY-MM-DD
        #[arg(long)]
        deadline: Option<String>,
    },
    /// Move a card to another lane
    Move {
        #[arg(short, long)]
        team: i64,
        card: i64,
        column: String,
    },
    /// Delete a card
    Delete {
        #[arg(short, long)]
        team: i64,
        card: i64,
    },
    /// Assign a card to a team member
    Assign {
        #[arg(short, long)]
        team: i64,
        card: i64,
        member: i64,
    },
    /// Set a card's progress (requires an open workday)
    Progress {
        #[arg(short, long)]
        team: i64,
        card: i64,
        value: u8,
    },
    /// Toggle a card between complete and not
    Complete {
        #[arg(short, long)]
        team: i64,
        card: i64,
    },
    /// Edit title, priority, deadline and progress
    Edit {
        #[arg(short, long)]
        team: i64,
        card: i64,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "Medium")]
        priority: String,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long, default_value = "0")]
        progress: u8,
    },
}

#[derive(Subcommand, Clone)]
pub enum WorkdayCommands {
    /// Start the day (rejected within 24h of the previous start)
    Start,
    /// End the day and report task progress
    End {
        /// Team whose tasks the summary should enumerate
        #[arg(short, long)]
        team: Option<i64>,
    },
    /// Show tracker state
    Status {
        /// Keep the elapsed clock ticking once a second
        #[arg(long)]
        follow: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "kanbanize=debug" } else { "kanbanize=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Login { email, google } => cmd::cmd_login(config, email, google).await?,
        Commands::Signup { email } => cmd::cmd_signup(config, email).await?,
        Commands::Logout => cmd::cmd_logout(config).await?,
        Commands::ForgotPassword { email } => cmd::cmd_forgot_password(config, email).await?,
        Commands::SendVerification => cmd::cmd_send_verification(config).await?,
        Commands::ChangePassword => cmd::cmd_change_password(config).await?,
        Commands::Profile { command } => match command.unwrap_or(ProfileCommands::Show) {
            ProfileCommands::Show => cmd::cmd_profile_show(config).await?,
            ProfileCommands::Update {
                name,
                role,
                position,
            } => cmd::cmd_profile_update(config, name, role, position).await?,
            ProfileCommands::Deactivate { force } => {
                cmd::cmd_profile_deactivate(config, force).await?
            }
        },
        Commands::Teams { command } => match command.unwrap_or(TeamsCommands::List) {
            TeamsCommands::List => cmd::cmd_teams_list(config).await?,
            TeamsCommands::Create { name } => cmd::cmd_team_create(config, name).await?,
            TeamsCommands::Join { code } => cmd::cmd_team_join(config, code).await?,
            TeamsCommands::Delete { team, force } => {
                cmd::cmd_team_delete(config, team, force).await?
            }
            TeamsCommands::RemoveMember {
                team,
                member,
                force,
            } => cmd::cmd_team_remove_member(config, team, member, force).await?,
        },
        Commands::Board { team } => cmd::cmd_board_show(config, team).await?,
        Commands::Card { command } => match command {
            CardCommands::Add {
                team,
                column,
                title,
                priority,
                deadline,
            } => cmd::cmd_card_add(config, team, column, title, priority, deadline).await?,
            CardCommands::Move { team, card, column } => {
                cmd::cmd_card_move(config, team, card, column).await?
            }
            CardCommands::Delete { team, card } => {
                cmd::cmd_card_delete(config, team, card).await?
            }
            CardCommands::Assign { team, card, member } => {
                cmd::cmd_card_assign(config, team, card, member).await?
            }
            CardCommands::Progress { team, card, value } => {
                cmd::cmd_card_progress(config, team, card, value).await?
            }
            CardCommands::Complete { team, card } => {
                cmd::cmd_card_complete(config, team, card).await?
            }
            CardCommands::Edit {
                team,
                card,
                title,
                priority,
                deadline,
                progress,
            } => {
                cmd::cmd_card_edit(config, team, card, title, priority, deadline, progress).await?
            }
        },
        Commands::Workday { command } => match command {
            WorkdayCommands::Start => cmd::cmd_workday_start(config).await?,
            WorkdayCommands::End { team } => cmd::cmd_workday_end(config, team).await?,
            WorkdayCommands::Status { follow } => {
                cmd::cmd_workday_status(config, follow).await?
            }
        },
        Commands::Watch { team } => cmd::cmd_watch(config, team).await?,
    }

    Ok(())
}
