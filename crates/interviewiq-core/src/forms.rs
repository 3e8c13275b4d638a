//! Client-side form validation.
//!
//! Forms are checked before anything is sent. A failed check never reaches
//! the network, and a password confirmation is never sent to the server.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::models::{InterviewDraft, InterviewType};

/// Longest interview that can be scheduled, in minutes.
const MAX_INTERVIEW_MINUTES: u32 = 8 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Enter a valid email address")]
    InvalidEmail,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Duration must be between 1 and {max} minutes")]
    InvalidDuration { max: u32 },

    #[error("Unknown interview type: {0}")]
    UnknownInterviewType(String),
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Loose shape check: one `@`, a non-empty local part, and a dotted domain.
fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
            .unwrap_or(false)
}

fn email(value: &str) -> Result<String, ValidationError> {
    let email = required(value, "Email")?;
    if looks_like_email(&email) {
        Ok(email.to_ascii_lowercase())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<LoginRequest, ValidationError> {
        let email = email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::MissingField("Password"));
        }
        Ok(LoginRequest {
            email,
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn login_request(&self) -> LoginRequest {
        LoginRequest {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<RegisterRequest, ValidationError> {
        let name = required(&self.name, "Name")?;
        let surname = required(&self.surname, "Surname")?;
        let email = email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::MissingField("Password"));
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(RegisterRequest {
            name,
            surname,
            email,
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct InterviewForm {
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub duration_minutes: u32,
    pub interview_type: String,
}

impl InterviewForm {
    pub fn validate(&self) -> Result<InterviewDraft, ValidationError> {
        let title = required(&self.title, "Title")?;
        if self.duration_minutes == 0 || self.duration_minutes > MAX_INTERVIEW_MINUTES {
            return Err(ValidationError::InvalidDuration {
                max: MAX_INTERVIEW_MINUTES,
            });
        }
        let interview_type = InterviewType::parse(&self.interview_type)
            .ok_or_else(|| ValidationError::UnknownInterviewType(self.interview_type.clone()))?;
        let description = Some(self.description.trim().to_string()).filter(|d| !d.is_empty());

        Ok(InterviewDraft {
            title,
            description,
            date: self.date,
            duration: self.duration_minutes,
            interview_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> RegistrationForm {
        RegistrationForm {
            name: " Ada ".to_string(),
            surname: "Lovelace".to_string(),
            email: "Ada@Example.com".to_string(),
            password: "hunter22".to_string(),
            confirm_password: "hunter22".to_string(),
        }
    }

    #[test]
    fn test_registration_valid() {
        let request = registration().validate().unwrap();
        assert_eq!(request.name, "Ada");
        assert_eq!(request.email, "ada@example.com");
        assert_eq!(request.login_request().password, "hunter22");
    }

    #[test]
    fn test_registration_password_mismatch() {
        let mut form = registration();
        form.confirm_password = "hunter23".to_string();
        assert_eq!(form.validate().unwrap_err(), ValidationError::PasswordMismatch);
    }

    #[test]
    fn test_registration_confirmation_not_serialized() {
        let request = registration().validate().unwrap();
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("confirm_password").is_none());
        assert!(value.get("confirmPassword").is_none());
        assert_eq!(value["surname"], "Lovelace");
    }

    #[test]
    fn test_registration_missing_fields() {
        let mut form = registration();
        form.surname = "   ".to_string();
        assert_eq!(form.validate().unwrap_err(), ValidationError::MissingField("Surname"));

        let mut form = registration();
        form.password.clear();
        form.confirm_password.clear();
        assert_eq!(form.validate().unwrap_err(), ValidationError::MissingField("Password"));
    }

    #[test]
    fn test_email_shapes() {
        assert!(looks_like_email("a@b.co"));
        assert!(looks_like_email("first.last@sub.example.org"));
        assert!(!looks_like_email("no-at-sign.com"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("a@nodot"));
        assert!(!looks_like_email("a@b@c.com"));
        assert!(!looks_like_email("a b@c.com"));
        assert!(!looks_like_email("a@.com"));
    }

    #[test]
    fn test_login_form() {
        let form = LoginForm {
            email: "sam@example.com".to_string(),
            password: String::new(),
        };
        assert_eq!(form.validate().unwrap_err(), ValidationError::MissingField("Password"));

        let form = LoginForm {
            email: "".to_string(),
            password: "pw".to_string(),
        };
        assert_eq!(form.validate().unwrap_err(), ValidationError::MissingField("Email"));
    }

    #[test]
    fn test_interview_form() {
        let mut form = InterviewForm {
            title: "Mock technical".to_string(),
            description: "  ".to_string(),
            date: Utc::now(),
            duration_minutes: 45,
            interview_type: "technical".to_string(),
        };
        let draft = form.validate().unwrap();
        assert_eq!(draft.interview_type, InterviewType::Technical);
        assert!(draft.description.is_none());

        form.duration_minutes = 0;
        assert!(matches!(form.validate(), Err(ValidationError::InvalidDuration { .. })));

        form.duration_minutes = 30;
        form.interview_type = "panel".to_string();
        assert_eq!(
            form.validate().unwrap_err(),
            ValidationError::UnknownInterviewType("panel".to_string())
        );
    }
}
