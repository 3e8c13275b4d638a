//! API client for communicating with the InterviewIQ REST API.
//!
//! This module provides the `ApiClient` struct for signing in and for
//! making authenticated calls against the user, interview and submission
//! endpoints. All resource calls go through [`AuthPipeline`].

use std::sync::Arc;

use anyhow::{Context, Result};
use http::{header, HeaderValue, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use crate::auth::{Credential, CredentialStore};
use crate::config::{Config, Endpoints};
use crate::forms::{LoginForm, LoginRequest, RegistrationForm};
use crate::models::{
    FormSubmission, Interview, InterviewDraft, NewSubmission, SubmissionStatus, User,
    UserProfileResponse,
};

use super::pipeline::{ApiRequest, AuthPipeline};
use super::transport::{ReqwestTransport, Transport};
use super::ApiError;

/// Token response shared by login and registration. The two backends name
/// their fields differently; both spellings are accepted.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(rename = "accessToken", alias = "access", alias = "access_token", alias = "token", default)]
    access_token: Option<String>,
    #[serde(rename = "refreshToken", alias = "refresh", alias = "refresh_token", default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<UserProfileResponse>,
}

/// Fields a user can change on their own profile.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

pub struct ApiClient<T: Transport = ReqwestTransport> {
    pipeline: AuthPipeline<T>,
    base_url: String,
    endpoints: Endpoints,
}

impl<T: Transport> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            base_url: self.base_url.clone(),
            endpoints: self.endpoints.clone(),
        }
    }
}

impl ApiClient<ReqwestTransport> {
    /// Create a client talking to the configured server
    pub fn new(config: &Config, store: Arc<CredentialStore>) -> Result<Self> {
        let transport = ReqwestTransport::new(config.request_timeout())
            .context("Failed to build HTTP client")?;
        Ok(Self::with_transport(Arc::new(transport), store, config))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(transport: Arc<T>, store: Arc<CredentialStore>, config: &Config) -> Self {
        let pipeline = AuthPipeline::new(transport, store, config.url(&config.endpoints.refresh));
        Self {
            pipeline,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            endpoints: config.endpoints.clone(),
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        self.pipeline.store()
    }

    pub fn pipeline(&self) -> &AuthPipeline<T> {
        &self.pipeline
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn resource_url(&self, path: &str, id: i64) -> String {
        format!("{}/{}", self.url(path).trim_end_matches('/'), id)
    }

    /// Sign-in calls answer bad credentials with 400 or 401, which say
    /// nothing about a session.
    fn check_sign_in(response: Response<Vec<u8>>) -> Result<Response<Vec<u8>>, ApiError> {
        match response.status().as_u16() {
            400 | 401 => {
                let body = String::from_utf8_lossy(response.body());
                let message = ApiError::server_message(&body)
                    .unwrap_or_else(|| "Invalid email or password".to_string());
                Err(ApiError::Rejected(message))
            }
            _ => Self::check_response(response),
        }
    }

    /// Map non-2xx responses to an `ApiError`.
    fn check_response(response: Response<Vec<u8>>) -> Result<Response<Vec<u8>>, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let body = String::from_utf8_lossy(response.body());
            Err(ApiError::from_status(response.status(), &body))
        }
    }

    fn decode<R: DeserializeOwned>(response: &Response<Vec<u8>>, what: &str) -> Result<R> {
        serde_json::from_slice(response.body()).map_err(|e| {
            anyhow::Error::new(ApiError::InvalidResponse(format!("{}: {}", what, e)))
        })
    }

    async fn get<R: DeserializeOwned>(&self, url: &str) -> Result<R> {
        let response = self.pipeline.send(&ApiRequest::get(url)).await?;
        let response = Self::check_response(response)?;
        Self::decode(&response, url)
    }

    async fn send_json<R: DeserializeOwned, B: Serialize>(
        &self,
        request: ApiRequest,
        body: &B,
    ) -> Result<R> {
        let url = request.url.clone();
        let response = self.pipeline.send(&request.json(body)?).await?;
        let response = Self::check_response(response)?;
        Self::decode(&response, &url)
    }

    /// Send without expecting a body back.
    async fn execute(&self, request: ApiRequest) -> Result<()> {
        let response = self.pipeline.send(&request).await?;
        Self::check_response(response)?;
        Ok(())
    }

    fn require_admin(&self) -> Result<(), ApiError> {
        if self.store().has_admin_role() {
            Ok(())
        } else {
            Err(ApiError::AccessDenied("admin role required".to_string()))
        }
    }

    // ===== Session =====

    /// Sign in and store the resulting session.
    pub async fn login(&self, form: &LoginForm) -> Result<User> {
        let request = form.validate().map_err(ApiError::from)?;
        self.login_with(&request).await
    }

    async fn login_with(&self, request: &LoginRequest) -> Result<User> {
        let url = self.url(&self.endpoints.login);
        let response = self
            .pipeline
            .send_public(&ApiRequest::post(&url).json(request)?)
            .await?;
        let response = Self::check_sign_in(response)?;
        let auth: AuthResponse = Self::decode(&response, "login response")?;

        let access_token = auth.access_token.ok_or_else(|| {
            ApiError::InvalidResponse("login response has no access token".to_string())
        })?;
        self.establish_session(access_token, auth.refresh_token, auth.user)
            .await
    }

    /// Create an account, then store the session it starts.
    ///
    /// When the server answers with only the new user, the same
    /// credentials are used to sign in.
    pub async fn register(&self, form: &RegistrationForm) -> Result<User> {
        let request = form.validate().map_err(ApiError::from)?;

        let url = self.url(&self.endpoints.register);
        let response = self
            .pipeline
            .send_public(&ApiRequest::post(&url).json(&request)?)
            .await?;
        let response = Self::check_sign_in(response)?;

        let auth: AuthResponse = Self::decode(&response, "registration response")?;
        match auth.access_token {
            Some(access_token) => {
                self.establish_session(access_token, auth.refresh_token, auth.user)
                    .await
            }
            None => {
                debug!("Registration returned no tokens, signing in");
                self.login_with(&request.login_request()).await
            }
        }
    }

    async fn establish_session(
        &self,
        access_token: String,
        refresh_token: Option<String>,
        user: Option<UserProfileResponse>,
    ) -> Result<User> {
        let user = match user {
            Some(profile) => profile.into_user(),
            None => self.fetch_profile_with(&access_token).await?,
        };

        self.store()
            .save(Credential::new(access_token, refresh_token, user.clone()))?;
        info!(user_id = user.id, role = user.role.as_str(), "Signed in");
        Ok(user)
    }

    /// Profile lookup with a token that is not stored yet.
    async fn fetch_profile_with(&self, access_token: &str) -> Result<User> {
        let mut request = ApiRequest::get(self.url(&self.endpoints.profile));
        let value = HeaderValue::from_str(&format!("Bearer {}", access_token))
            .map_err(|e| ApiError::InvalidRequest(format!("unusable access token: {}", e)))?;
        request.headers.insert(header::AUTHORIZATION, value);

        let response = self.pipeline.send_public(&request).await?;
        let response = Self::check_response(response)?;
        let profile: UserProfileResponse = Self::decode(&response, "user profile")?;
        Ok(profile.into_user())
    }

    /// Forget the local session.
    pub fn logout(&self) -> Result<()> {
        self.store().clear()?;
        info!("Signed out");
        Ok(())
    }

    // ===== Profile =====

    pub async fn fetch_profile(&self) -> Result<User> {
        let profile: UserProfileResponse = self.get(&self.url(&self.endpoints.profile)).await?;
        Ok(profile.into_user())
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<()> {
        let request = ApiRequest::put(self.url(&self.endpoints.profile)).json(update)?;
        self.execute(request).await
    }

    // ===== Interviews =====

    pub async fn list_interviews(&self) -> Result<Vec<Interview>> {
        self.get(&self.url(&self.endpoints.interviews)).await
    }

    pub async fn get_interview(&self, id: i64) -> Result<Interview> {
        self.get(&self.resource_url(&self.endpoints.interviews, id))
            .await
            .with_context(|| format!("Failed to fetch interview {}", id))
    }

    pub async fn create_interview(&self, draft: &InterviewDraft) -> Result<Interview> {
        self.send_json(ApiRequest::post(self.url(&self.endpoints.interviews)), draft)
            .await
    }

    pub async fn update_interview(&self, id: i64, draft: &InterviewDraft) -> Result<Interview> {
        self.send_json(
            ApiRequest::put(self.resource_url(&self.endpoints.interviews, id)),
            draft,
        )
        .await
    }

    pub async fn delete_interview(&self, id: i64) -> Result<()> {
        self.execute(ApiRequest::delete(
            self.resource_url(&self.endpoints.interviews, id),
        ))
        .await
        .with_context(|| format!("Failed to delete interview {}", id))
    }

    // ===== Form submissions =====

    pub async fn list_submissions(&self) -> Result<Vec<FormSubmission>> {
        self.get(&self.url(&self.endpoints.submissions)).await
    }

    pub async fn create_submission(
        &self,
        form_data: serde_json::Value,
        status: SubmissionStatus,
    ) -> Result<FormSubmission> {
        let body = NewSubmission { form_data, status };
        self.send_json(ApiRequest::post(self.url(&self.endpoints.submissions)), &body)
            .await
    }

    // ===== Admin =====

    pub async fn admin_list_users(&self) -> Result<Vec<User>> {
        self.require_admin()?;
        let users: Vec<UserProfileResponse> = self.get(&self.url(&self.endpoints.admin_users)).await?;
        Ok(users.into_iter().map(|u| u.into_user()).collect())
    }

    pub async fn admin_list_applications(&self) -> Result<Vec<Interview>> {
        self.require_admin()?;
        self.get(&self.url(&self.endpoints.admin_applications)).await
    }
}
