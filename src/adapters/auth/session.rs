//! Axiom session tokens
//!
//! Holds the access/refresh cookie pair and rotates it on a timer. A failed
//! refresh keeps the previous pair in place.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::Client;
use thiserror::Error;
use tokio::task::JoinHandle;

pub const REFRESH_URL: &str = "https://api10.axiom.trade/refresh-access-token";
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

const ACCESS_COOKIE: &str = "auth-access-token";
const REFRESH_COOKIE: &str = "auth-refresh-token";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Refresh request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Refresh rejected with status {0}")]
    Rejected(u16),
    #[error("No session cookies in refresh response")]
    NoCookies,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Tokens {
    access: String,
    refresh: String,
}

/// Shared session whose tokens are read by the relay on every submission
#[derive(Debug)]
pub struct AuthSession {
    tokens: RwLock<Tokens>,
    http: Client,
    refresh_url: String,
}

impl AuthSession {
    pub fn new(refresh_token: String) -> Self {
        Self {
            tokens: RwLock::new(Tokens {
                access: String::new(),
                refresh: refresh_token,
            }),
            http: Client::new(),
            refresh_url: REFRESH_URL.to_string(),
        }
    }

    pub fn with_refresh_url(mut self, url: String) -> Self {
        self.refresh_url = url;
        self
    }

    /// `Cookie` header value carrying both tokens
    pub fn cookie_header(&self) -> String {
        let tokens = self.tokens.read();
        format!(
            "{}={}; {}={}",
            REFRESH_COOKIE, tokens.refresh, ACCESS_COOKIE, tokens.access
        )
    }

    pub fn has_access_token(&self) -> bool {
        !self.tokens.read().access.is_empty()
    }

    /// Exchange the refresh token for a new pair
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let refresh = self.tokens.read().refresh.clone();
        let response = self
            .http
            .post(&self.refresh_url)
            .header(COOKIE, format!("{}={}", REFRESH_COOKIE, refresh))
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Rejected(status.as_u16()));
        }

        let headers: Vec<String> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();

        if headers.is_empty() {
            return Err(AuthError::NoCookies);
        }

        self.apply_set_cookies(&headers);
        Ok(())
    }

    fn apply_set_cookies(&self, headers: &[String]) {
        let mut tokens = self.tokens.write();
        for header in headers {
            if let Some((name, value)) = parse_set_cookie(header) {
                match name {
                    ACCESS_COOKIE => tokens.access = value.to_string(),
                    REFRESH_COOKIE => tokens.refresh = value.to_string(),
                    _ => {}
                }
            }
        }
    }

    /// Refresh now, then every `interval` until the task is aborted
    pub fn start(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match session.refresh().await {
                    Ok(()) => tracing::debug!("Axiom session refreshed"),
                    Err(e) => tracing::error!("Failed to refresh Axiom session: {}", e),
                }
            }
        })
    }
}

/// Name and value of the leading pair in a `Set-Cookie` header
fn parse_set_cookie(header: &str) -> Option<(&str, &str)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim().trim_matches('"')))
}
