//! Command-line front end.
//!
//! Provides subcommands for working against a running CI/CD backend:
//! - `login` / `logout` / `whoami` / `status` - Session management
//! - `dashboard` - Totals and the latest builds
//! - `projects`, `pipelines`, `builds`, `users` - Resource management

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::client::Client;
use crate::config::Config;
use crate::error::{ClientError, ErrorKind};
use crate::models::{
    Build, BuildStatus, CreatePipelineRequest, CreateProjectRequest, CreateUserRequest,
    LoginRequest, PageParams, Paginated, Pipeline, Project, Role, TriggerBuildRequest, User,
};
use crate::session::SessionState;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "vortexia")]
#[command(author, version, about = "Command-line client for the Vortexia CI/CD backend", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "vortexia.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// API base URL (overrides api.base_url)
    #[arg(long, env = "VORTEXIA_API_URL")]
    pub api_url: Option<String>,

    /// Session file (overrides session.path)
    #[arg(long, env = "VORTEXIA_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(short, long)]
        username: Option<String>,
        /// Password (prompted for when omitted)
        #[arg(short, long, env = "VORTEXIA_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Fetch the signed-in user's profile from the server
    Whoami,

    /// Show the local session state
    Status,

    /// Show totals and the latest builds
    Dashboard,

    /// Project management commands
    #[command(subcommand)]
    Projects(ProjectsCommands),

    /// Pipeline management commands
    #[command(subcommand)]
    Pipelines(PipelinesCommands),

    /// Build commands
    #[command(subcommand)]
    Builds(BuildsCommands),

    /// User management commands (admin)
    #[command(subcommand)]
    Users(UsersCommands),
}

/// Pagination flags shared by list commands
#[derive(Args, Debug, Clone, Copy)]
pub struct PageArgs {
    #[arg(long, default_value = "1")]
    pub page: u32,
    #[arg(long, default_value = "10")]
    pub page_size: u32,
}

impl From<PageArgs> for PageParams {
    fn from(args: PageArgs) -> Self {
        PageParams::new(args.page, args.page_size)
    }
}

#[derive(Subcommand, Debug)]
pub enum ProjectsCommands {
    /// List all projects
    List(PageArgs),
    /// Show details for a project
    Show { id: i64 },
    /// List projects owned by the current user
    Mine,
    /// Create a project
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        repo_url: String,
        #[arg(long, default_value = "main")]
        branch: String,
    },
    /// Delete a project
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum PipelinesCommands {
    /// List all pipelines
    List(PageArgs),
    /// Show details for a pipeline, including its config
    Show { id: i64 },
    /// List the pipelines of a project
    ByProject { project_id: i64 },
    /// Create a pipeline from a config file
    Create {
        #[arg(long)]
        project_id: i64,
        #[arg(long)]
        name: String,
        /// Path to the pipeline definition
        #[arg(long)]
        config_file: PathBuf,
    },
    /// Delete a pipeline
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum BuildsCommands {
    /// List recent builds
    List(PageArgs),
    /// Show details for a build
    Show { id: i64 },
    /// Show the steps of a build
    Steps { id: i64 },
    /// Trigger a build
    Trigger {
        #[arg(long)]
        pipeline_id: i64,
        #[arg(long, default_value = "main")]
        branch: String,
        #[arg(long)]
        commit: Option<String>,
    },
    /// Cancel a build
    Cancel { id: i64 },
    /// List the builds of a pipeline
    ByPipeline {
        pipeline_id: i64,
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum UsersCommands {
    /// List all users
    List(PageArgs),
    /// Create a user
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "user")]
        role: Role,
    },
}

impl Cli {
    /// Load the config file and apply flag / environment overrides.
    pub fn load_config(&self) -> Result<Config> {
        let config = Config::load(&self.config)
            .with_context(|| format!("Failed to load {}", self.config.display()))?
            .with_overrides(self.api_url.clone(), self.session_file.clone());
        config.validate()?;
        Ok(config)
    }
}

/// Whether the request pipeline already showed this error to the user.
pub fn already_reported(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<ClientError>() {
        Some(ClientError::NotAuthenticated) | Some(ClientError::LoginInProgress) => false,
        Some(e) => matches!(
            e.kind(),
            ErrorKind::Application | ErrorKind::Network | ErrorKind::Authentication
        ),
        None => false,
    }
}

// ============================================================================
// CLI Command Handlers
// ============================================================================

/// Run a CLI command
pub async fn run_command(cli: &Cli, config: &Config, client: &Client) -> Result<()> {
    match &cli.command {
        Commands::Login { username, password } => {
            cmd_login(client, username.clone(), password.clone()).await
        }
        Commands::Logout => cmd_logout(client),
        Commands::Whoami => cmd_whoami(client).await,
        Commands::Status => cmd_status(config, client),
        Commands::Dashboard => cmd_dashboard(client).await,
        Commands::Projects(cmd) => cmd_projects(client, cmd).await,
        Commands::Pipelines(cmd) => cmd_pipelines(client, cmd).await,
        Commands::Builds(cmd) => cmd_builds(client, cmd).await,
        Commands::Users(cmd) => cmd_users(client, cmd).await,
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn cmd_login(
    client: &Client,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let username = match username {
        Some(u) => u,
        None => prompt("Username")?,
    };
    let password = match password {
        Some(p) => p,
        None => prompt("Password")?,
    };

    match client.login(LoginRequest::new(username, password)).await {
        Ok(user) => {
            println!("[OK] Logged in as {} ({})", user.username, user.role);
            Ok(())
        }
        Err(ClientError::Validation(errors)) => {
            for (field, messages) in errors.iter() {
                for message in messages {
                    eprintln!("  {}: {}", field, message);
                }
            }
            anyhow::bail!("Login form is invalid")
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_logout(client: &Client) -> Result<()> {
    let was_authenticated = client.snapshot().authenticated;
    client.logout();
    if was_authenticated {
        println!("[OK] Logged out");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

async fn cmd_whoami(client: &Client) -> Result<()> {
    if !client.snapshot().authenticated {
        anyhow::bail!("Not logged in. Run 'vortexia login' first.");
    }
    let user = client.refresh_profile().await?;
    print_user(&user);
    Ok(())
}

fn cmd_status(config: &Config, client: &Client) -> Result<()> {
    let snapshot = client.snapshot();

    println!();
    println!("=== Session ===");
    println!();
    println!("Server:   {}", config.api.base_url);
    println!("Storage:  {}", config.session.path.display());
    println!("State:    {}", snapshot.state);
    if let (SessionState::Authenticated, Some(user)) = (snapshot.state, &snapshot.user) {
        println!("User:     {} ({})", user.username, user.role);
        println!("Email:    {}", user.email);
    }
    println!();
    Ok(())
}

async fn cmd_dashboard(client: &Client) -> Result<()> {
    let summary = client.api().dashboard().summary().await?;

    println!();
    println!("=== Dashboard ===");
    println!();
    println!("Projects:   {}", summary.total_projects);
    println!("Pipelines:  {}", summary.total_pipelines);
    println!("Builds:     {}", summary.total_builds);
    println!("Running:    {}", summary.running());
    println!();

    if summary.recent_builds.is_empty() {
        println!("No builds yet.");
        println!();
        return Ok(());
    }

    println!("Recent builds:");
    let counts: Vec<String> = summary
        .recent_by_status()
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(status, count)| format!("{} {}", count, status))
        .collect();
    println!("  {}", counts.join(", "));
    print_builds(&summary.recent_builds);
    Ok(())
}

async fn cmd_projects(client: &Client, cmd: &ProjectsCommands) -> Result<()> {
    let projects = client.api().projects();
    match cmd {
        ProjectsCommands::List(page) => {
            let page = projects.list((*page).into()).await?;
            print_projects(&page.items);
            print_page_footer(&page);
        }
        ProjectsCommands::Show { id } => {
            let project = projects.get(*id).await?;
            println!();
            println!("=== Project: {} ===", project.name);
            println!();
            println!("ID:          {}", project.id);
            println!("Name:        {}", project.name);
            println!(
                "Description: {}",
                if project.description.is_empty() {
                    "-"
                } else {
                    project.description.as_str()
                }
            );
            println!("Repository:  {}", project.repo_url);
            println!("Branch:      {}", project.branch);
            println!("Owner:       {}", project.owner_id);
            println!("Active:      {}", yes_no(project.is_active));
            println!("Created:     {}", format_time(&project.created_at));
            println!("Updated:     {}", format_time(&project.updated_at));
            println!();
        }
        ProjectsCommands::Mine => {
            let mine = projects.mine().await?;
            print_projects(&mine);
        }
        ProjectsCommands::Create {
            name,
            description,
            repo_url,
            branch,
        } => {
            let request = CreateProjectRequest {
                name: name.clone(),
                description: description.clone(),
                repo_url: repo_url.clone(),
                branch: branch.clone(),
            };
            let project = projects.create(&request).await?;
            println!("[OK] Created project {} (ID {})", project.name, project.id);
        }
        ProjectsCommands::Delete { id } => {
            projects.delete(*id).await?;
            println!("[OK] Deleted project {}", id);
        }
    }
    Ok(())
}

async fn cmd_pipelines(client: &Client, cmd: &PipelinesCommands) -> Result<()> {
    let pipelines = client.api().pipelines();
    match cmd {
        PipelinesCommands::List(page) => {
            let page = pipelines.list((*page).into()).await?;
            print_pipelines(&page.items);
            print_page_footer(&page);
        }
        PipelinesCommands::Show { id } => {
            let pipeline = pipelines.get(*id).await?;
            println!();
            println!("=== Pipeline: {} ===", pipeline.name);
            println!();
            println!("ID:       {}", pipeline.id);
            println!("Project:  {}", pipeline.project_id);
            println!("Active:   {}", yes_no(pipeline.is_active));
            println!("Created:  {}", format_time(&pipeline.created_at));
            println!();
            println!("--- Config ---");
            println!("{}", pipeline.config);
            println!();
        }
        PipelinesCommands::ByProject { project_id } => {
            let list = pipelines.by_project(*project_id).await?;
            print_pipelines(&list);
        }
        PipelinesCommands::Create {
            project_id,
            name,
            config_file,
        } => {
            let config = std::fs::read_to_string(config_file)
                .with_context(|| format!("Failed to read {}", config_file.display()))?;
            let request = CreatePipelineRequest {
                project_id: *project_id,
                name: name.clone(),
                config,
            };
            let pipeline = pipelines.create(&request).await?;
            println!("[OK] Created pipeline {} (ID {})", pipeline.name, pipeline.id);
        }
        PipelinesCommands::Delete { id } => {
            pipelines.delete(*id).await?;
            println!("[OK] Deleted pipeline {}", id);
        }
    }
    Ok(())
}

async fn cmd_builds(client: &Client, cmd: &BuildsCommands) -> Result<()> {
    let builds = client.api().builds();
    match cmd {
        BuildsCommands::List(page) => {
            let page = builds.list((*page).into()).await?;
            print_builds(&page.items);
            print_page_footer(&page);
        }
        BuildsCommands::Show { id } => {
            let build = builds.get(*id).await?;
            print_build(&build);
        }
        BuildsCommands::Steps { id } => {
            let steps = builds.steps(*id).await?;
            if steps.is_empty() {
                println!("No steps recorded for build {}.", id);
                return Ok(());
            }
            println!();
            println!(
                "{:<4}  {:<24}  {:<10}  {:<10}  {:<40}",
                "#", "NAME", "STATUS", "DURATION", "COMMAND"
            );
            println!("{}", "-".repeat(96));
            for step in steps {
                println!(
                    "{:<4}  {:<24}  {:<10}  {:<10}  {:<40}",
                    step.step_order,
                    truncate(&step.name, 24),
                    step.status,
                    format_duration_opt(step.duration),
                    truncate(&step.command, 40)
                );
            }
            println!();
        }
        BuildsCommands::Trigger {
            pipeline_id,
            branch,
            commit,
        } => {
            let request = TriggerBuildRequest {
                pipeline_id: *pipeline_id,
                branch: branch.clone(),
                commit: commit.clone(),
            };
            let build = builds.trigger(&request).await?;
            println!();
            println!("[OK] Build triggered successfully!");
            println!();
            println!("Build ID: {}", build.id);
            println!("Status:   {}", build.status);
            println!("Branch:   {}", build.branch);
            println!();
        }
        BuildsCommands::Cancel { id } => {
            builds.cancel(*id).await?;
            println!("[OK] Build {} marked {}", id, BuildStatus::Canceled);
        }
        BuildsCommands::ByPipeline { pipeline_id, page } => {
            let page = builds.by_pipeline(*pipeline_id, (*page).into()).await?;
            print_builds(&page.items);
            print_page_footer(&page);
        }
    }
    Ok(())
}

async fn cmd_users(client: &Client, cmd: &UsersCommands) -> Result<()> {
    let users = client.api().users();
    match cmd {
        UsersCommands::List(page) => {
            let page = users.list((*page).into()).await?;
            if page.items.is_empty() {
                println!("No users found.");
                return Ok(());
            }
            println!();
            println!(
                "{:<6}  {:<20}  {:<30}  {:<6}  {:<6}",
                "ID", "USERNAME", "EMAIL", "ROLE", "ACTIVE"
            );
            println!("{}", "-".repeat(76));
            for user in &page.items {
                println!(
                    "{:<6}  {:<20}  {:<30}  {:<6}  {:<6}",
                    user.id,
                    truncate(&user.username, 20),
                    truncate(&user.email, 30),
                    user.role,
                    yes_no(user.active)
                );
            }
            print_page_footer(&page);
        }
        UsersCommands::Create {
            username,
            email,
            password,
            role,
        } => {
            let request = CreateUserRequest {
                username: username.clone(),
                email: email.clone(),
                password: password.clone(),
                role: *role,
            };
            let user = users.create(&request).await?;
            println!("[OK] Created user {} (ID {})", user.username, user.id);
        }
    }
    Ok(())
}

// ============================================================================
// Output helpers
// ============================================================================

fn print_user(user: &User) {
    println!();
    println!("=== User: {} ===", user.username);
    println!();
    println!("ID:       {}", user.id);
    println!("Email:    {}", user.email);
    println!("Role:     {}", user.role);
    println!("Active:   {}", yes_no(user.active));
    println!("Created:  {}", format_time(&user.created_at));
    println!();
}

fn print_projects(projects: &[Project]) {
    if projects.is_empty() {
        println!("No projects found.");
        return;
    }

    println!();
    println!(
        "{:<6}  {:<24}  {:<44}  {:<16}  {:<6}",
        "ID", "NAME", "REPOSITORY", "BRANCH", "ACTIVE"
    );
    println!("{}", "-".repeat(104));
    for project in projects {
        println!(
            "{:<6}  {:<24}  {:<44}  {:<16}  {:<6}",
            project.id,
            truncate(&project.name, 24),
            truncate(&project.repo_url, 44),
            truncate(&project.branch, 16),
            yes_no(project.is_active)
        );
    }
    println!();
}

fn print_pipelines(pipelines: &[Pipeline]) {
    if pipelines.is_empty() {
        println!("No pipelines found.");
        return;
    }

    println!();
    println!(
        "{:<6}  {:<8}  {:<30}  {:<6}  {:<16}",
        "ID", "PROJECT", "NAME", "ACTIVE", "CREATED"
    );
    println!("{}", "-".repeat(74));
    for pipeline in pipelines {
        println!(
            "{:<6}  {:<8}  {:<30}  {:<6}  {:<16}",
            pipeline.id,
            pipeline.project_id,
            truncate(&pipeline.name, 30),
            yes_no(pipeline.is_active),
            format_time(&pipeline.created_at)
        );
    }
    println!();
}

fn print_builds(builds: &[Build]) {
    if builds.is_empty() {
        println!("No builds found.");
        return;
    }

    println!();
    println!(
        "{:<6}  {:<8}  {:<20}  {:<10}  {:<10}  {:<10}  {:<16}",
        "ID", "PIPELINE", "BRANCH", "COMMIT", "STATUS", "DURATION", "STARTED"
    );
    println!("{}", "-".repeat(94));
    for build in builds {
        println!(
            "{:<6}  {:<8}  {:<20}  {:<10}  {:<10}  {:<10}  {:<16}",
            build.id,
            build.pipeline_id,
            truncate(&build.branch, 20),
            short_commit(&build.commit),
            build.status,
            format_duration_opt(build.duration),
            format_time(&build.started_at)
        );
    }
    println!();
}

fn print_build(build: &Build) {
    println!();
    println!("=== Build #{} ===", build.id);
    println!();
    println!("Pipeline:  {}", build.pipeline_id);
    println!("Branch:    {}", build.branch);
    println!("Commit:    {}", if build.commit.is_empty() { "-" } else { build.commit.as_str() });
    println!("Status:    {}", build.status);
    println!("Started:   {}", format_time(&build.started_at));
    if let Some(finished) = &build.finished_at {
        println!("Finished:  {}", format_time(finished));
    }
    println!("Duration:  {}", format_duration_opt(build.duration));
    println!("Triggered: user {}", build.trigger_by);
    println!();
}

fn print_page_footer<T>(page: &Paginated<T>) {
    println!(
        "Page {}/{} ({} total){}",
        page.page,
        page.total_pages.max(1),
        page.total,
        if page.is_last_page() {
            ""
        } else {
            ", use --page for more"
        }
    );
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn format_time(at: &chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

fn short_commit(commit: &str) -> String {
    if commit.is_empty() {
        "-".to_string()
    } else {
        commit.chars().take(8).collect()
    }
}

/// Format duration in human-readable form
fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

fn format_duration_opt(seconds: Option<i64>) -> String {
    match seconds {
        Some(s) if s >= 0 => format_duration(s as u64),
        _ => "-".to_string(),
    }
}

/// Truncate a string to a maximum display width
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_flags() {
        let cli = Cli::try_parse_from([
            "vortexia",
            "--api-url",
            "http://127.0.0.1:9000/api/v1",
            "login",
            "-u",
            "admin",
            "-p",
            "admin123",
        ])
        .unwrap();

        assert_eq!(cli.api_url.as_deref(), Some("http://127.0.0.1:9000/api/v1"));
        match cli.command {
            Commands::Login { username, password } => {
                assert_eq!(username.as_deref(), Some("admin"));
                assert_eq!(password.as_deref(), Some("admin123"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_paged_list() {
        let cli = Cli::try_parse_from(["vortexia", "projects", "list", "--page", "3"]).unwrap();
        match cli.command {
            Commands::Projects(ProjectsCommands::List(page)) => {
                assert_eq!(PageParams::from(page), PageParams::new(3, 10));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_user_role() {
        let cli = Cli::try_parse_from([
            "vortexia",
            "users",
            "create",
            "--username",
            "dev",
            "--email",
            "dev@example.com",
            "--password",
            "secret99",
            "--role",
            "admin",
        ])
        .unwrap();
        match cli.command {
            Commands::Users(UsersCommands::Create { role, .. }) => assert_eq!(role, Role::Admin),
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Cli::try_parse_from([
            "vortexia", "users", "create", "--username", "dev", "--email", "e@x.io",
            "--password", "secret99", "--role", "root",
        ])
        .is_err());
    }

    #[test]
    fn test_already_reported() {
        let api: anyhow::Error = ClientError::Api {
            code: 400,
            message: "bad".to_string(),
        }
        .into();
        assert!(already_reported(&api));

        let expired: anyhow::Error = ClientError::SessionExpired.into();
        assert!(already_reported(&expired));

        let local: anyhow::Error = ClientError::NotAuthenticated.into();
        assert!(!already_reported(&local));

        let other = anyhow::anyhow!("Failed to read pipeline.yml");
        assert!(!already_reported(&other));

        let malformed: anyhow::Error =
            ClientError::Decode("missing field `user`".to_string()).into();
        assert!(!already_reported(&malformed));

        let disk: anyhow::Error = ClientError::Storage("disk full".to_string()).into();
        assert!(!already_reported(&disk));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-project-name", 10), "a-very-...");
    }

    #[test]
    fn test_format_duration_opt() {
        assert_eq!(format_duration_opt(None), "-");
        assert_eq!(format_duration_opt(Some(59)), "59s");
        assert_eq!(format_duration_opt(Some(156)), "2m 36s");
        assert_eq!(format_duration_opt(Some(3725)), "1h 2m 5s");
    }
}
