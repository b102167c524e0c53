use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Credentials;

pub const USER_AGENT: &str = "Mozilla/5.0 (Wikisource OCR/1.0)";

/// Why a download falls back to anonymous access
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnonymousReason {
    NoCredentials,
    TokenFetch(String),
    LoginRejected(String),
    Transport(String),
}

pub enum SessionOutcome {
    /// Client carrying the Commons session cookies
    Authenticated(Client),
    Anonymous(AnonymousReason),
}

impl std::fmt::Debug for SessionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionOutcome::Authenticated(_) => f.write_str("Authenticated"),
            SessionOutcome::Anonymous(reason) => write!(f, "Anonymous({:?})", reason),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    query: TokenQuery,
}

#[derive(Deserialize)]
struct TokenQuery {
    tokens: Tokens,
}

#[derive(Deserialize)]
struct Tokens {
    logintoken: String,
}

#[derive(Deserialize)]
struct LoginResponse {
    login: Option<LoginResult>,
}

#[derive(Deserialize)]
struct LoginResult {
    result: String,
}

/// Logs in to the MediaWiki API of Wikimedia Commons with the two-step
/// token flow. Never fails: every problem turns into `Anonymous`.
#[derive(Debug, Clone)]
pub struct CommonsAuthenticator {
    api_url: String,
    credentials: Option<Credentials>,
    timeout: Duration,
}

impl CommonsAuthenticator {
    pub fn new(api_url: String, credentials: Option<Credentials>, timeout: Duration) -> Self {
        Self {
            api_url,
            credentials,
            timeout,
        }
    }

    pub async fn session(&self) -> SessionOutcome {
        let Some(credentials) = &self.credentials else {
            return SessionOutcome::Anonymous(AnonymousReason::NoCredentials);
        };

        match self.login(credentials).await {
            Ok(client) => {
                info!("Logged in to Wikimedia Commons as '{}'", credentials.username);
                SessionOutcome::Authenticated(client)
            }
            Err(reason) => {
                warn!(
                    "Wikimedia Commons login failed ({:?}), falling back to anonymous download.",
                    reason
                );
                SessionOutcome::Anonymous(reason)
            }
        }
    }

    async fn login(&self, credentials: &Credentials) -> Result<Client, AnonymousReason> {
        let transport = |e: reqwest::Error| AnonymousReason::Transport(e.to_string());

        let client = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()
            .map_err(transport)?;

        let token: TokenResponse = client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("meta", "tokens"),
                ("type", "login"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(transport)?
            .json()
            .await
            .map_err(|e| AnonymousReason::TokenFetch(e.to_string()))?;

        let login: LoginResponse = client
            .post(&self.api_url)
            .form(&[
                ("action", "login"),
                ("lgname", credentials.username.as_str()),
                ("lgpassword", credentials.password.as_str()),
                ("lgtoken", token.query.tokens.logintoken.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(transport)?
            .json()
            .await
            .map_err(|e| AnonymousReason::LoginRejected(e.to_string()))?;

        match login.login.map(|l| l.result) {
            Some(result) if result == "Success" => Ok(client),
            Some(result) => Err(AnonymousReason::LoginRejected(result)),
            None => Err(AnonymousReason::LoginRejected("no login result".to_string())),
        }
    }
}
