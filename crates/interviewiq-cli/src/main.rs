//! InterviewIQ CLI - sign in and manage interviews from the terminal.
//!
//! Keeps a signed-in session between runs and talks to the InterviewIQ API
//! through the authenticated request pipeline in `interviewiq-core`.

mod app;

use std::io;

use anyhow::Result;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use interviewiq_core::api::ProfileUpdate;
use interviewiq_core::ApiError;

use app::App;

const USAGE: &str = "\
Usage: interviewiq <command> [args]

Session:
  login [email]                 Sign in (prompts for the password)
  register                      Create an account and sign in
  logout                        Sign out and erase stored credentials
  whoami                        Show the signed-in user
  route <path>                  Show where a page visit would land

Account:
  profile                       Fetch your profile from the server
  profile set <field> <value>   Update name, email or phone

Interviews:
  interviews [list]             List your interviews
  interviews show <id>          Show one interview
  interviews create <title> <type> <date> <minutes> [description]
  interviews delete <id>        Cancel and remove an interview

Submissions:
  submissions [list]            List your application forms
  submissions submit <json|file> [--draft]

Admin:
  admin users                   List all users
  admin applications            List all applications
";

#[derive(Debug, PartialEq)]
enum Command {
    Login(Option<String>),
    Register,
    Logout,
    WhoAmI,
    Route(String),
    Profile,
    UpdateProfile(ProfileField, String),
    ListInterviews,
    ShowInterview(i64),
    CreateInterview(Vec<String>),
    DeleteInterview(i64),
    ListSubmissions,
    Submit { source: String, draft: bool },
    AdminUsers,
    AdminApplications,
    Help,
}

#[derive(Debug, PartialEq, Clone, Copy)]
enum ProfileField {
    Name,
    Email,
    Phone,
}

fn parse_id(value: Option<&String>) -> Result<i64> {
    let value = value.ok_or_else(|| anyhow::anyhow!("Missing id"))?;
    value
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid id: {}", value))
}

fn parse_command(args: &[String]) -> Result<Command> {
    let words: Vec<&str> = args.iter().map(String::as_str).collect();
    let command = match words.as_slice() {
        [] | ["help"] | ["--help"] | ["-h"] => Command::Help,
        ["login"] => Command::Login(None),
        ["login", email] => Command::Login(Some(email.to_string())),
        ["register"] => Command::Register,
        ["logout"] => Command::Logout,
        ["whoami"] => Command::WhoAmI,
        ["route", path] => Command::Route(path.to_string()),
        ["profile"] => Command::Profile,
        ["profile", "set", field, value @ ..] if !value.is_empty() => {
            let field = match *field {
                "name" => ProfileField::Name,
                "email" => ProfileField::Email,
                "phone" => ProfileField::Phone,
                other => anyhow::bail!("Unknown profile field: {}", other),
            };
            Command::UpdateProfile(field, value.join(" "))
        }
        ["interviews"] | ["interviews", "list"] => Command::ListInterviews,
        ["interviews", "show", ..] => Command::ShowInterview(parse_id(args.get(2))?),
        ["interviews", "create", ..] => Command::CreateInterview(args[2..].to_vec()),
        ["interviews", "delete", ..] => Command::DeleteInterview(parse_id(args.get(2))?),
        ["submissions"] | ["submissions", "list"] => Command::ListSubmissions,
        ["submissions", "submit", source] => Command::Submit {
            source: source.to_string(),
            draft: false,
        },
        ["submissions", "submit", source, "--draft"] => Command::Submit {
            source: source.to_string(),
            draft: true,
        },
        ["admin", "users"] => Command::AdminUsers,
        ["admin", "applications"] => Command::AdminApplications,
        _ => anyhow::bail!("Unknown command: {}\n\n{}", args.join(" "), USAGE),
    };
    Ok(command)
}

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr and to a daily log file in the cache directory.
/// `RUST_LOG` controls the level (e.g. `RUST_LOG=interviewiq_core=debug`).
fn init_tracing(log_dir: Option<std::path::PathBuf>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "interviewiq.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

async fn run(app: &mut App, command: Command) -> Result<()> {
    match command {
        Command::Help => print!("{}", USAGE),
        Command::Login(email) => app.login(email).await?,
        Command::Register => app.register().await?,
        Command::Logout => app.logout()?,
        Command::WhoAmI => app.whoami(),
        Command::Route(path) => app.check_route(&path),
        Command::Profile => app.profile().await?,
        Command::UpdateProfile(field, value) => {
            let mut update = ProfileUpdate::default();
            match field {
                ProfileField::Name => update.name = Some(value),
                ProfileField::Email => update.email = Some(value),
                ProfileField::Phone => update.phone = Some(value),
            }
            app.update_profile(update).await?
        }
        Command::ListInterviews => app.list_interviews().await?,
        Command::ShowInterview(id) => app.show_interview(id).await?,
        Command::CreateInterview(args) => app.create_interview(&args).await?,
        Command::DeleteInterview(id) => app.delete_interview(id).await?,
        Command::ListSubmissions => app.list_submissions().await?,
        Command::Submit { source, draft } => app.submit_form(&source, draft).await?,
        Command::AdminUsers => app.admin_users().await?,
        Command::AdminApplications => app.admin_applications().await?,
    }
    Ok(())
}

/// Message shown to the user for a failed command.
fn describe_error(e: &anyhow::Error) -> String {
    match e.downcast_ref::<ApiError>() {
        Some(api_error) => api_error.user_message(),
        None => format!("{:#}", e),
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_command(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let _guard = init_tracing(log_dir());
    info!(?command, "InterviewIQ starting");

    let mut app = match App::new() {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&mut app, command).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", describe_error(&e));
        if e
            .downcast_ref::<ApiError>()
            .is_some_and(ApiError::is_session_ended)
        {
            eprintln!("Run `interviewiq login` to sign in again.");
        }
        std::process::exit(1);
    }
}

/// Log directory inside the cache dir, created on demand.
fn log_dir() -> Option<std::path::PathBuf> {
    let dir = interviewiq_core::Config::default().cache_dir().ok()?.join("logs");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}
