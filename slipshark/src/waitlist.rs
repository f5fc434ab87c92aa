// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

// Waitlist capture
//
// Emails are checked locally, then inserted into a PostgREST-style table
// (`POST {url}/rest/v1/waitlist`). A unique violation means the address is
// already listed and is reported as `Duplicate`, not as a failure.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use crate::config::SecretString;

const WAITLIST_TABLE: &str = "waitlist";
const UNIQUE_VIOLATION: &str = "23505";

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaitlistError {
    #[error("invalid email address")]
    InvalidEmail,

    #[error("email is already on the waitlist")]
    Duplicate,

    #[error("waitlist insert rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("waitlist request failed: {0}")]
    Transport(String),
}

impl WaitlistError {
    /// Text shown to the user in place of the waitlist prompt.
    pub fn user_message(&self) -> &'static str {
        match self {
            WaitlistError::InvalidEmail => "Please enter a valid email address.",
            WaitlistError::Duplicate | WaitlistError::Rejected { .. } | WaitlistError::Transport(_) => {
                "This email is already on the waitlist or there was an error. Please try again."
            }
        }
    }
}

/// Somewhere waitlist emails are kept.
#[async_trait]
pub trait WaitlistStore: Send + Sync {
    async fn insert(&self, email: &str) -> Result<(), WaitlistError>;
}

/// Validate, trim and insert.
pub async fn join_waitlist(store: &dyn WaitlistStore, email: &str) -> Result<(), WaitlistError> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(WaitlistError::InvalidEmail);
    }
    store.insert(email).await?;
    tracing::info!("waitlist entry added");
    Ok(())
}

// ---------------------------------------------------------------------------
// REST implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RestErrorBody {
    code: Option<String>,
    message: Option<String>,
}

pub struct RestWaitlist {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
}

impl RestWaitlist {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, anon_key: SecretString) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            anon_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, WAITLIST_TABLE)
    }
}

#[async_trait]
impl WaitlistStore for RestWaitlist {
    async fn insert(&self, email: &str) -> Result<(), WaitlistError> {
        let resp = self
            .client
            .post(self.endpoint())
            .header("apikey", self.anon_key.expose())
            .bearer_auth(self.anon_key.expose())
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!([{ "email": email }]))
            .send()
            .await
            .map_err(|e| WaitlistError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let text = resp.text().await.unwrap_or_default();
        let body: Option<RestErrorBody> = serde_json::from_str(&text).ok();
        let code = body.as_ref().and_then(|b| b.code.as_deref());

        if status.as_u16() == 409 || code == Some(UNIQUE_VIOLATION) {
            return Err(WaitlistError::Duplicate);
        }

        let message = body
            .and_then(|b| b.message)
            .unwrap_or_else(|| text.chars().take(200).collect());
        tracing::warn!(status = status.as_u16(), message = %message, "waitlist insert rejected");
        Err(WaitlistError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn waitlist(server: &MockServer) -> RestWaitlist {
        RestWaitlist::new(
            reqwest::Client::new(),
            format!("{}/", server.uri()),
            SecretString::new("anon-key"),
        )
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("bettor@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.co"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("nodot@example"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn email_pattern_compiles_once() {
        assert!(std::ptr::eq(email_pattern(), email_pattern()));
    }

    #[tokio::test]
    async fn inserts_with_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/waitlist"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .and(body_json(serde_json::json!([{"email": "fan@example.com"}])))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        join_waitlist(&waitlist(&server), "  fan@example.com ")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn invalid_email_never_reaches_the_store() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let err = join_waitlist(&waitlist(&server), "not-an-email").await.unwrap_err();
        assert_eq!(err, WaitlistError::InvalidEmail);
    }

    #[tokio::test]
    async fn unique_violation_is_duplicate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint"
            })))
            .mount(&server)
            .await;

        let err = join_waitlist(&waitlist(&server), "fan@example.com")
            .await
            .unwrap_err();
        assert_eq!(err, WaitlistError::Duplicate);
    }

    #[tokio::test]
    async fn unique_violation_code_with_other_status_is_duplicate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(serde_json::json!({"code": "23505"})),
            )
            .mount(&server)
            .await;

        let err = join_waitlist(&waitlist(&server), "fan@example.com")
            .await
            .unwrap_err();
        assert_eq!(err, WaitlistError::Duplicate);
    }

    #[tokio::test]
    async fn other_failures_are_rejected_with_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "code": "PGRST301",
                "message": "JWT expired"
            })))
            .mount(&server)
            .await;

        let err = join_waitlist(&waitlist(&server), "fan@example.com")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            WaitlistError::Rejected {
                status: 401,
                message: "JWT expired".to_string()
            }
        );
        assert!(err.user_message().contains("Please try again"));
    }
}
