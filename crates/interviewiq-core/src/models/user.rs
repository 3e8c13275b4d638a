//! User and role models.
//!
//! `User` is the clean domain type held by the credential store. The
//! backends disagree on how they describe privilege (a `role` string on one,
//! an `is_staff` flag on the other), so the wire shape is parsed separately
//! and normalized into a single [`Role`].

use serde::{Deserialize, Serialize};

/// Authorization level attached to a user.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Standard,
    Admin,
}

impl Role {
    /// Parse a backend role string. Anything that is not an admin role
    /// degrades to `Standard`.
    pub fn from_wire(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" | "staff" | "superuser" => Role::Admin,
            _ => Role::Standard,
        }
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Standard => "standard",
            Role::Admin => "admin",
        }
    }
}

/// The authenticated user's profile.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// User as returned by the login, registration and profile endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserProfileResponse {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_staff: Option<bool>,
}

impl UserProfileResponse {
    /// Normalize into the domain type. An explicit `is_staff: true` wins,
    /// otherwise the role string decides.
    pub fn into_user(self) -> User {
        let role = match (self.is_staff, self.role.as_deref()) {
            (Some(true), _) => Role::Admin,
            (_, Some(role)) => Role::from_wire(role),
            _ => Role::Standard,
        };

        let name = match (self.name, self.surname) {
            (Some(name), Some(surname)) if !surname.is_empty() => {
                format!("{} {}", name, surname)
            }
            (Some(name), _) => name,
            (None, Some(surname)) => surname,
            (None, None) => String::new(),
        };

        User {
            id: self.id,
            name,
            email: self.email.unwrap_or_default(),
            role,
        }
    }
}
