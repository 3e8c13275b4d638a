//! Authenticated request pipeline.
//!
//! Every outbound call goes through [`AuthPipeline::send`]. The bearer token
//! comes from the credential store. A 401 triggers at most one refresh and
//! one retry of the original call, and a failed refresh ends the session.
//!
//! The refresh call is sent straight to the transport and never through
//! `send`, so a refresh can't set off another refresh.

use std::sync::Arc;

use http::{header, HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::CredentialStore;

use super::transport::Transport;
use super::ApiError;

/// A request as the caller describes it, before credentials are attached.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Vec<u8>>,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ApiError::InvalidRequest(format!("unable to encode body: {}", e)))?;
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(bytes);
        Ok(self)
    }

    /// Build the wire request, with a bearer token when one is given.
    fn build(&self, token: Option<&str>) -> Result<Request<Vec<u8>>, ApiError> {
        let mut builder = Request::builder()
            .method(self.method.clone())
            .uri(self.url.as_str());

        if let Some(headers) = builder.headers_mut() {
            headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
            headers.extend(self.headers.clone());
            if let Some(token) = token {
                let value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| ApiError::InvalidRequest(format!("invalid access token: {}", e)))?;
                headers.insert(header::AUTHORIZATION, value);
            }
        }

        builder
            .body(self.body.clone().unwrap_or_default())
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))
    }
}

/// Result of a single attempt at the original call.
enum Attempt {
    Completed(Response<Vec<u8>>),
    AuthExpired,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(rename = "accessToken", alias = "access", alias = "access_token", alias = "token")]
    access_token: String,
    #[serde(rename = "refreshToken", alias = "refresh", alias = "refresh_token", default)]
    refresh_token: Option<String>,
}

/// Wraps a transport with the credential store.
pub struct AuthPipeline<T: Transport> {
    transport: Arc<T>,
    store: Arc<CredentialStore>,
    refresh_url: String,
}

impl<T: Transport> Clone for AuthPipeline<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            store: self.store.clone(),
            refresh_url: self.refresh_url.clone(),
        }
    }
}

impl<T: Transport> AuthPipeline<T> {
    pub fn new(transport: Arc<T>, store: Arc<CredentialStore>, refresh_url: impl Into<String>) -> Self {
        Self {
            transport,
            store,
            refresh_url: refresh_url.into(),
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Issue a call by its parts.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
        headers: Option<HeaderMap>,
    ) -> Result<Response<Vec<u8>>, ApiError> {
        let request = ApiRequest {
            method,
            url: url.to_string(),
            body,
            headers: headers.unwrap_or_default(),
        };
        self.send(&request).await
    }

    /// Send a request exactly as described: no stored token is attached and
    /// a 401 is returned like any other response. Used for sign-in calls,
    /// where a 401 means bad credentials rather than an expired session.
    pub async fn send_public(&self, request: &ApiRequest) -> Result<Response<Vec<u8>>, ApiError> {
        debug!(method = %request.method, url = %request.url, "Sending public request");
        Ok(self.transport.execute(request.build(None)?).await?)
    }

    /// Send a request, refreshing the access token at most once.
    ///
    /// Any response other than 401 is returned as-is. A 401 comes back as
    /// `AuthorizationExpired` when there is nothing to refresh with or the
    /// retried call is rejected again, and as `RefreshRejected` when the
    /// refresh itself failed. Transport failures are never retried.
    pub async fn send(&self, request: &ApiRequest) -> Result<Response<Vec<u8>>, ApiError> {
        let credential = self.store.load();
        let token = credential.as_ref().map(|c| c.access_token.as_str());

        match self.attempt(request, token).await? {
            Attempt::Completed(response) => return Ok(response),
            Attempt::AuthExpired => {}
        }

        let Some(refresh_token) = credential.and_then(|c| c.refresh_token) else {
            debug!(url = %request.url, "Unauthorized and no refresh token");
            return Err(ApiError::AuthorizationExpired);
        };

        let access_token = self.refresh(refresh_token).await?;

        match self.attempt(request, Some(&access_token)).await? {
            Attempt::Completed(response) => Ok(response),
            Attempt::AuthExpired => {
                warn!(url = %request.url, "Still unauthorized after token refresh");
                Err(ApiError::AuthorizationExpired)
            }
        }
    }

    async fn attempt(&self, request: &ApiRequest, token: Option<&str>) -> Result<Attempt, ApiError> {
        let http_request = request.build(token)?;
        debug!(
            method = %request.method,
            url = %request.url,
            authenticated = token.is_some(),
            "Sending request"
        );

        let response = self.transport.execute(http_request).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            Ok(Attempt::AuthExpired)
        } else {
            debug!(status = %response.status(), url = %request.url, "Response received");
            Ok(Attempt::Completed(response))
        }
    }

    /// Run the refresh on its own task so that its effect on the store
    /// lands even if the caller stops waiting for the original request.
    async fn refresh(&self, refresh_token: String) -> Result<String, ApiError> {
        let transport = self.transport.clone();
        let store = self.store.clone();
        let url = self.refresh_url.clone();
        let spent = refresh_token.clone();

        let task = tokio::spawn(async move {
            refresh_session(transport.as_ref(), &store, &url, &refresh_token).await
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Token refresh task failed");
                end_session(&self.store, &spent);
                Err(ApiError::RefreshRejected(format!("refresh task failed: {}", e)))
            }
        }
    }
}

/// End the session the failed refresh belonged to. A session signed in
/// since then is left alone.
fn end_session(store: &CredentialStore, refresh_token: &str) {
    match store.clear_if_refresh_token(refresh_token) {
        Ok(true) => {}
        Ok(false) => debug!("Session changed during refresh, nothing to clear"),
        Err(e) => warn!(error = %e, "Failed to clear credentials after refresh failure"),
    }
}

/// Exchange the refresh token for a new access token and record it.
async fn refresh_session<T: Transport>(
    transport: &T,
    store: &CredentialStore,
    url: &str,
    refresh_token: &str,
) -> Result<String, ApiError> {
    let tokens = match request_new_token(transport, url, refresh_token).await {
        Ok(tokens) => tokens,
        Err(reason) => {
            warn!(%reason, "Token refresh failed, ending session");
            end_session(store, refresh_token);
            return Err(ApiError::RefreshRejected(reason));
        }
    };

    let replaced =
        store.replace_access_token(refresh_token, tokens.access_token.clone(), tokens.refresh_token);
    match replaced {
        Ok(true) => {
            info!("Access token refreshed");
            Ok(tokens.access_token)
        }
        Ok(false) => {
            debug!("Session ended or changed while refresh was in flight");
            Err(ApiError::RefreshRejected("signed out during refresh".to_string()))
        }
        Err(e) => {
            warn!(error = %e, "Failed to store refreshed token, ending session");
            end_session(store, refresh_token);
            Err(ApiError::RefreshRejected(format!("{:#}", e)))
        }
    }
}

async fn request_new_token<T: Transport>(
    transport: &T,
    url: &str,
    refresh_token: &str,
) -> Result<RefreshResponse, String> {
    let request = ApiRequest::post(url)
        .json(&RefreshRequest { refresh_token })
        .and_then(|r| r.build(None))
        .map_err(|e| e.to_string())?;

    let response = transport
        .execute(request)
        .await
        .map_err(|e| format!("network error: {}", e))?;

    if !response.status().is_success() {
        return Err(format!("refresh endpoint returned {}", response.status()));
    }

    serde_json::from_slice(response.body())
        .map_err(|e| format!("unreadable refresh response: {}", e))
}
