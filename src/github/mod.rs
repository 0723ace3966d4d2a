mod helpers;
pub mod types;

pub use helpers::{decode_content, truncate_chars, validate_username};
use helpers::{encode_segment, rate_limit_remaining};

use reqwest::Client;
use tracing::debug;

use types::{ContentsResponse, RawRepository};

pub const API_BASE: &str = "https://api.github.com";

/// Errors returned by GitHub API operations.
#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("Authentication required. Set GITHUB_TOKEN or pass --token.")]
    Unauthorized,

    #[error("User '{0}' not found")]
    UserNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("GitHub API returned status {code}: {message}")]
    Api { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected repository schema on page {page}: {source}")]
    Schema {
        page: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid username: '{0}'")]
    InvalidUsername(String),

    #[error("Content decode error: {0}")]
    Decode(String),
}

/// Whose stars to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The owner of the configured token (`GET /user/starred`).
    Authenticated,
    /// A named account (`GET /users/{username}/starred`).
    User(String),
}

impl Target {
    pub fn from_username(username: Option<String>) -> Result<Self, GitHubError> {
        match username {
            Some(name) => {
                validate_username(&name)?;
                Ok(Target::User(name))
            }
            None => Ok(Target::Authenticated),
        }
    }

    /// Name recorded in the scan output.
    pub fn label(&self) -> &str {
        match self {
            Target::Authenticated => "authenticated_user",
            Target::User(name) => name.as_str(),
        }
    }

    fn starred_path(&self) -> String {
        match self {
            Target::Authenticated => "/user/starred".to_string(),
            Target::User(name) => format!("/users/{name}/starred"),
        }
    }
}

/// One page of starred repositories plus the rate limit reported alongside it.
#[derive(Debug)]
pub struct StarredPage {
    pub repos: Vec<RawRepository>,
    pub rate_limit_remaining: Option<u64>,
}

#[derive(Clone)]
struct Token(String);

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// HTTP client for the GitHub REST API v3.
///
/// The token is supplied by the caller; this type never reads the environment.
#[derive(Clone, Debug)]
pub struct GitHubClient {
    http: Client,
    token: Option<Token>,
    base_url: String,
}

impl GitHubClient {
    pub fn new(http: Client, token: Option<String>, base_url: &str) -> Self {
        Self {
            http,
            token: token.map(Token),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let mut req = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", crate::USER_AGENT)
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(Token(ref token)) = self.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        req
    }

    /// Send a GET and classify any non-success status.
    async fn send(&self, path: &str) -> Result<reqwest::Response, GitHubError> {
        let response = self.request(path).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(%status, path, "GitHub request failed");
        Err(match status.as_u16() {
            401 => GitHubError::Unauthorized,
            404 => GitHubError::NotFound(path.to_string()),
            code => GitHubError::Api {
                code,
                message: body,
            },
        })
    }

    /// Fetch one page of starred repositories for `target`.
    pub async fn starred_page(
        &self,
        target: &Target,
        page: u32,
        per_page: u8,
    ) -> Result<StarredPage, GitHubError> {
        let path = format!("{}?per_page={per_page}&page={page}", target.starred_path());
        let response = self.send(&path).await.map_err(|e| match e {
            GitHubError::NotFound(_) => GitHubError::UserNotFound(target.label().to_string()),
            other => other,
        })?;

        let rate_limit_remaining = rate_limit_remaining(response.headers());
        let body = response.text().await?;
        let repos = serde_json::from_str(&body)
            .map_err(|source| GitHubError::Schema { page, source })?;

        Ok(StarredPage {
            repos,
            rate_limit_remaining,
        })
    }

    pub async fn get_readme(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<ContentsResponse, GitHubError> {
        let path = format!(
            "/repos/{}/{}/readme",
            encode_segment(owner),
            encode_segment(repo)
        );
        Ok(self.send(&path).await?.json().await?)
    }
}
