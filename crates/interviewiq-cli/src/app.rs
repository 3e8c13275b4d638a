//! Application state and command handlers.
//!
//! `App` owns the configuration, the credential store, the API client and
//! the route guard. Each handler runs one command and prints its result.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use interviewiq_core::api::ProfileUpdate;
use interviewiq_core::auth::{FileBackend, GuardOutcome, Route};
use interviewiq_core::config::StorageKind;
use interviewiq_core::forms::{InterviewForm, LoginForm, RegistrationForm};
use interviewiq_core::models::{SubmissionStatus, User};
use interviewiq_core::{ApiClient, Config, CredentialStore, RouteGuard};

pub struct App {
    pub config: Config,
    pub api: ApiClient,
    pub guard: RouteGuard,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = Config::load().context("Failed to load config")?;
        let store = Arc::new(Self::open_store(&config)?);
        debug!(backend = store.backend_name(), "Credential store ready");

        let api = ApiClient::new(&config, store.clone())?;
        let guard = RouteGuard::new(store);
        Ok(Self { config, api, guard })
    }

    /// Open the configured store. An unreadable session file is removed so
    /// the user can sign in again instead of being stuck.
    fn open_store(config: &Config) -> Result<CredentialStore> {
        match CredentialStore::open(config.credential_backend()?) {
            Ok(store) => Ok(store),
            Err(e) if config.storage == StorageKind::File => {
                warn!(error = %e, "Session file unreadable, starting signed out");
                let backend = FileBackend::new(&config.cache_dir()?);
                std::fs::remove_file(backend.path()).ok();
                CredentialStore::open(Box::new(backend))
            }
            Err(e) => Err(e),
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        self.api.store()
    }

    fn require_session(&self) -> Result<User> {
        self.store()
            .user()
            .ok_or_else(|| anyhow::anyhow!("Not signed in. Run `interviewiq login` first."))
    }

    // ===== Session commands =====

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email {
            Some(email) => email,
            None => Self::prompt_with_default("Email", self.config.last_email.as_deref())?,
        };
        let password = Self::prompt_password("Password: ")?;

        println!("\nSigning in...");
        let user = self
            .api
            .login(&LoginForm {
                email: email.clone(),
                password,
            })
            .await?;

        self.remember_email(email);
        println!("Signed in as {} <{}>", user.name, user.email);
        println!("Landing page: {}", Route::landing_for(user.role));
        Ok(())
    }

    pub async fn register(&mut self) -> Result<()> {
        let form = RegistrationForm {
            name: Self::prompt("Name")?,
            surname: Self::prompt("Surname")?,
            email: Self::prompt("Email")?,
            password: Self::prompt_password("Password: ")?,
            confirm_password: Self::prompt_password("Confirm password: ")?,
        };

        println!("\nCreating account...");
        let user = self.api.register(&form).await?;

        self.remember_email(form.email);
        println!("Welcome, {}! Your account is ready.", user.name);
        println!("Next: {}", Route::InterviewForm);
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.api.logout()?;
        println!("Signed out.");
        Ok(())
    }

    pub fn whoami(&self) {
        match self.store().user() {
            Some(user) => {
                println!("{} <{}>", user.name, user.email);
                println!("  id:   {}", user.id);
                println!("  role: {}", user.role.as_str());
                println!(
                    "  refresh token: {}",
                    if self.store().refresh_token().is_some() { "yes" } else { "no" }
                );
            }
            None => println!("Not signed in."),
        }
    }

    pub fn check_route(&self, path: &str) {
        let outcome = self.guard.check_path(path);
        match outcome {
            GuardOutcome::Allow(route) => println!("allow {}", route),
            GuardOutcome::RedirectToLogin => {
                println!("redirect {} (sign in required)", outcome.destination())
            }
            GuardOutcome::RedirectToLanding(route) => {
                println!("redirect {} (admin only)", route)
            }
            GuardOutcome::RedirectToWelcome => {
                println!("redirect {} (unknown page)", outcome.destination())
            }
        }
    }

    fn remember_email(&mut self, email: String) {
        self.config.last_email = Some(email.trim().to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    // ===== Profile =====

    pub async fn profile(&self) -> Result<()> {
        self.require_session()?;
        let user = self.api.fetch_profile().await?;
        println!("{} <{}> ({})", user.name, user.email, user.role.as_str());
        Ok(())
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<()> {
        self.require_session()?;
        self.api.update_profile(&update).await?;
        println!("Profile updated.");
        Ok(())
    }

    // ===== Interviews =====

    pub async fn list_interviews(&self) -> Result<()> {
        self.require_session()?;
        let mut interviews = self.api.list_interviews().await?;
        interviews.sort_by_key(|i| i.date);

        if interviews.is_empty() {
            println!("No interviews scheduled.");
        }
        for interview in &interviews {
            let marker = if interview.is_upcoming() { "*" } else { " " };
            println!("{} {}", marker, interview.summary());
        }
        info!(count = interviews.len(), "Listed interviews");
        Ok(())
    }

    pub async fn show_interview(&self, id: i64) -> Result<()> {
        self.require_session()?;
        let interview = self.api.get_interview(id).await?;
        println!("{}", interview.summary());
        if let Some(ref description) = interview.description {
            println!("\n{}", description);
        }
        if let Some(ref url) = interview.video_url {
            println!("Room: {}", url);
        }
        if let Some(rating) = interview.rating {
            println!("Rating: {}/5", rating);
        }
        if let Some(ref feedback) = interview.feedback {
            println!("Feedback: {}", feedback);
        }
        Ok(())
    }

    pub async fn create_interview(&self, args: &[String]) -> Result<()> {
        self.require_session()?;
        let [title, kind, date, minutes, rest @ ..] = args else {
            anyhow::bail!("Usage: interviewiq interviews create <title> <type> <RFC3339 date> <minutes> [description]");
        };

        let date: DateTime<Utc> = DateTime::parse_from_rfc3339(date)
            .with_context(|| format!("Invalid date: {}", date))?
            .with_timezone(&Utc);
        let duration_minutes = minutes
            .parse()
            .with_context(|| format!("Invalid duration: {}", minutes))?;

        let draft = InterviewForm {
            title: title.clone(),
            description: rest.join(" "),
            date,
            duration_minutes,
            interview_type: kind.clone(),
        }
        .validate()?;

        let interview = self.api.create_interview(&draft).await?;
        println!("Scheduled {}", interview.summary());
        Ok(())
    }

    pub async fn delete_interview(&self, id: i64) -> Result<()> {
        self.require_session()?;
        self.api.delete_interview(id).await?;
        println!("Deleted interview #{}", id);
        Ok(())
    }

    // ===== Submissions =====

    pub async fn list_submissions(&self) -> Result<()> {
        self.require_session()?;
        let submissions = self.api.list_submissions().await?;
        if submissions.is_empty() {
            println!("No submissions yet.");
        }
        for submission in submissions {
            let submitted = submission
                .submitted_at
                .map(|d| d.format(" on %b %d, %Y").to_string())
                .unwrap_or_default();
            println!(
                "#{} {}{}",
                submission.id,
                submission.status.display_name(),
                submitted
            );
        }
        Ok(())
    }

    /// Submit an application form given as a JSON string or a path to a
    /// JSON file.
    pub async fn submit_form(&self, source: &str, draft: bool) -> Result<()> {
        self.require_session()?;
        let text = if std::path::Path::new(source).is_file() {
            std::fs::read_to_string(source)
                .with_context(|| format!("Failed to read {}", source))?
        } else {
            source.to_string()
        };
        let form_data: serde_json::Value =
            serde_json::from_str(&text).context("Form data is not valid JSON")?;
        if !form_data.is_object() {
            anyhow::bail!("Form data must be a JSON object");
        }

        let status = if draft {
            SubmissionStatus::Draft
        } else {
            SubmissionStatus::Submitted
        };
        let submission = self.api.create_submission(form_data, status).await?;
        println!(
            "Saved submission #{} ({})",
            submission.id,
            submission.status.display_name()
        );
        Ok(())
    }

    // ===== Admin =====

    pub async fn admin_users(&self) -> Result<()> {
        self.require_session()?;
        for user in self.api.admin_list_users().await? {
            println!("#{} {} <{}> {}", user.id, user.name, user.email, user.role.as_str());
        }
        Ok(())
    }

    pub async fn admin_applications(&self) -> Result<()> {
        self.require_session()?;
        for interview in self.api.admin_list_applications().await? {
            println!("{}", interview.summary());
        }
        Ok(())
    }

    // ===== Prompts =====

    fn prompt(label: &str) -> Result<String> {
        print!("{}: ", label);
        io::stdout().flush()?;

        let mut value = String::new();
        io::stdin().read_line(&mut value)?;
        Ok(value.trim().to_string())
    }

    fn prompt_with_default(label: &str, default: Option<&str>) -> Result<String> {
        match default {
            Some(default) => {
                let value = Self::prompt(&format!("{} [{}]", label, default))?;
                Ok(if value.is_empty() { default.to_string() } else { value })
            }
            None => Self::prompt(label),
        }
    }

    fn prompt_password(label: &str) -> Result<String> {
        let password = rpassword::prompt_password(label)?;
        Ok(password)
    }
}
