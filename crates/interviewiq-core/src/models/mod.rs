//! Data models for InterviewIQ entities.
//!
//! This module contains the domain types shared by the credential store,
//! the API client and front ends:
//!
//! - `User`, `Role`: the signed-in user's profile and authorization level
//! - `Interview`, `InterviewDraft`: scheduled interviews
//! - `FormSubmission`, `NewSubmission`: interview application forms

pub mod interview;
pub mod submission;
pub mod user;

pub use interview::{Interview, InterviewDraft, InterviewStatus, InterviewType};
pub use submission::{FormSubmission, NewSubmission, SubmissionStatus};
pub use user::{Role, User};
pub(crate) use user::UserProfileResponse;
