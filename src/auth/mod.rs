//! User identity via Supabase Auth (GoTrue) over REST.
//!
//! Signup registers the account and stores the profile row in the `Users`
//! table. Login checks the account exists before the password grant, so an
//! unknown email is reported separately from a bad password.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

const USERS_TABLE: &str = "Users";

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("identity service is not configured")]
    NotConfigured,

    #[error("user not found")]
    UserNotFound,

    #[error("identity service returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("identity request failed: {0}")]
    Transport(String),

    #[error("malformed identity response: {0}")]
    MalformedResponse(String),
}

/// Credentials and optional profile fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// A logged-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user_id: String,
}

/// Identity service seam used by the HTTP layer.
#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    async fn signup(&self, request: &LoginRequest) -> Result<(), AuthError>;
    async fn login(&self, request: &LoginRequest) -> Result<Session, AuthError>;
    async fn logout(&self, access_token: &str) -> Result<(), AuthError>;
}

// ---------------------------------------------------------------------------
// SupabaseAuth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SupabaseAuth {
    url: Option<String>,
    key: Option<String>,
    client: reqwest::Client,
}

impl SupabaseAuth {
    /// Missing URL or key leaves every call failing with `NotConfigured`.
    pub fn new(url: Option<String>, key: Option<String>) -> Self {
        if url.is_none() || key.is_none() {
            log::warn!("Supabase URL or key missing; authentication is disabled");
        }
        Self {
            url: url.map(|u| u.trim_end_matches('/').to_string()),
            key,
            client: reqwest::Client::new(),
        }
    }

    fn credentials(&self) -> Result<(&str, &str), AuthError> {
        match (&self.url, &self.key) {
            (Some(url), Some(key)) => Ok((url.as_str(), key.as_str())),
            _ => Err(AuthError::NotConfigured),
        }
    }

    fn signup_body(request: &LoginRequest) -> Value {
        json!({
            "email": request.email,
            "password": request.password,
            "data": {
                "first_name": request.first_name,
                "last_name": request.last_name,
            },
        })
    }

    fn profile_row(request: &LoginRequest) -> Value {
        json!({
            "email": request.email,
            "first_name": request.first_name,
            "last_name": request.last_name,
        })
    }

    /// Whether the admin user listing contains `email`.
    pub fn users_contain(listing: &Value, email: &str) -> bool {
        let users = listing
            .get("users")
            .and_then(Value::as_array)
            .or_else(|| listing.as_array());
        users.map_or(false, |users| {
            users.iter().any(|u| {
                u.get("email")
                    .and_then(Value::as_str)
                    .map_or(false, |e| e.eq_ignore_ascii_case(email))
            })
        })
    }

    /// Extract the session from a password-grant response.
    pub fn parse_session(body: &Value) -> Result<Session, AuthError> {
        let access_token = body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| AuthError::MalformedResponse("missing access_token".into()))?;
        let user_id = body
            .pointer("/user/id")
            .and_then(Value::as_str)
            .ok_or_else(|| AuthError::MalformedResponse("missing user.id".into()))?;
        Ok(Session {
            access_token: access_token.to_string(),
            user_id: user_id.to_string(),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, AuthError> {
        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| AuthError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn signup(&self, request: &LoginRequest) -> Result<(), AuthError> {
        let (url, key) = self.credentials()?;
        log::info!("Signing up new user: {}", request.email);
        self.send(
            self.client
                .post(format!("{url}/auth/v1/signup"))
                .header("apikey", key)
                .bearer_auth(key)
                .json(&Self::signup_body(request)),
        )
        .await?;

        log::info!("Adding user details to the {USERS_TABLE} table");
        self.send(
            self.client
                .post(format!("{url}/rest/v1/{USERS_TABLE}"))
                .header("apikey", key)
                .bearer_auth(key)
                .header("Prefer", "return=minimal")
                .json(&Self::profile_row(request)),
        )
        .await?;
        Ok(())
    }

    async fn login(&self, request: &LoginRequest) -> Result<Session, AuthError> {
        let (url, key) = self.credentials()?;
        log::info!("Checking for user: {}", request.email);
        let listing = self
            .send(
                self.client
                    .get(format!("{url}/auth/v1/admin/users"))
                    .header("apikey", key)
                    .bearer_auth(key),
            )
            .await?;
        if !Self::users_contain(&listing, &request.email) {
            return Err(AuthError::UserNotFound);
        }

        let body = self
            .send(
                self.client
                    .post(format!("{url}/auth/v1/token"))
                    .query(&[("grant_type", "password")])
                    .header("apikey", key)
                    .json(&json!({ "email": request.email, "password": request.password })),
            )
            .await?;
        let session = Self::parse_session(&body)?;
        log::info!("User {} logged in", session.user_id);
        Ok(session)
    }

    async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        let (url, key) = self.credentials()?;
        self.send(
            self.client
                .post(format!("{url}/auth/v1/logout"))
                .header("apikey", key)
                .bearer_auth(access_token),
        )
        .await?;
        log::info!("User logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> LoginRequest {
        LoginRequest {
            email: "ada@mindtype.io".into(),
            password: "secret".into(),
            first_name: Some("Ada".into()),
            last_name: None,
        }
    }

    #[tokio::test]
    async fn test_unconfigured_fails_without_network() {
        let auth = SupabaseAuth::new(None, Some("k".into()));
        assert!(matches!(auth.login(&request()).await, Err(AuthError::NotConfigured)));
        assert!(matches!(auth.signup(&request()).await, Err(AuthError::NotConfigured)));
        assert!(matches!(auth.logout("t").await, Err(AuthError::NotConfigured)));
    }

    #[test]
    fn test_users_contain() {
        let listing = json!({"users": [{"email": "ADA@mindtype.io"}, {"email": "bob@x.io"}]});
        assert!(SupabaseAuth::users_contain(&listing, "ada@mindtype.io"));
        assert!(!SupabaseAuth::users_contain(&listing, "eve@x.io"));
        assert!(SupabaseAuth::users_contain(&json!([{"email": "eve@x.io"}]), "eve@x.io"));
        assert!(!SupabaseAuth::users_contain(&Value::Null, "eve@x.io"));
    }

    #[test]
    fn test_parse_session() {
        let body = json!({"access_token": "tok", "user": {"id": "u-1"}});
        assert_eq!(
            SupabaseAuth::parse_session(&body).unwrap(),
            Session {
                access_token: "tok".into(),
                user_id: "u-1".into()
            }
        );
        assert!(SupabaseAuth::parse_session(&json!({"user": {}})).is_err());
    }

    #[test]
    fn test_signup_payloads() {
        let body = SupabaseAuth::signup_body(&request());
        assert_eq!(body["data"]["first_name"], "Ada");
        assert!(body["data"]["last_name"].is_null());
        assert_eq!(SupabaseAuth::profile_row(&request())["email"], "ada@mindtype.io");
    }

    #[test]
    fn test_login_request_optional_fields() {
        let req: LoginRequest = serde_json::from_str(r#"{"email": "a@b.c", "password": "p"}"#).unwrap();
        assert!(req.first_name.is_none());
    }
}
