use std::env;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::github::{self, GitHubClient, GitHubError, Target};
use crate::scan::ScanOptions;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Export a GitHub user's starred repositories as JSON.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output JSON file path (default: print to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// GitHub username to scan (defaults to the authenticated user)
    #[arg(short, long)]
    pub username: Option<String>,

    /// GitHub personal access token
    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Results per page
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub per_page: u8,

    /// Maximum pages to fetch (default: all)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_pages: Option<u32>,

    /// Maximum number of repositories to process
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: Option<u32>,

    /// Fetch and include README previews (one extra request per repository)
    #[arg(long)]
    pub include_readme: bool,

    /// Parallel README requests when --include-readme is set
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub concurrency: u8,

    /// GitHub API base URL
    #[arg(long, default_value = github::API_BASE, value_parser = parse_api_url)]
    pub api_url: String,
}

impl Cli {
    /// Resolve credentials and build the client plus scan settings.
    pub fn into_parts(self) -> Result<(GitHubClient, ScanOptions), ConfigError> {
        let target = Target::from_username(self.username)?;
        let token = self
            .token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(resolve_fallback_token);
        if token.is_some() {
            debug!("GitHub token configured");
        }

        let http = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let client = GitHubClient::new(http, token, &self.api_url);

        let options = ScanOptions {
            target,
            per_page: self.per_page,
            max_pages: self.max_pages,
            limit: self.limit.map(|l| l as usize),
            include_readme: self.include_readme,
            concurrency: usize::from(self.concurrency),
            output: self.output,
        };
        Ok((client, options))
    }
}

fn parse_api_url(s: &str) -> Result<String, String> {
    let url = Url::parse(s).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(s.trim_end_matches('/').to_string()),
        other => Err(format!("unsupported scheme '{other}', expected http or https")),
    }
}

/// Token sources consulted when neither `--token` nor `GITHUB_TOKEN` is set:
/// `GH_TOKEN`, then `gh auth token`.
fn resolve_fallback_token() -> Option<String> {
    env::var("GH_TOKEN")
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| {
            std::process::Command::new("gh")
                .args(["auth", "token"])
                .output()
                .ok()
                .filter(|o| {
                    if !o.status.success() {
                        debug!(
                            stderr = %String::from_utf8_lossy(&o.stderr).trim(),
                            "gh auth token failed"
                        );
                    }
                    o.status.success()
                })
                .and_then(|o| {
                    let token = String::from_utf8_lossy(&o.stdout).trim().to_string();
                    if token.is_empty() { None } else { Some(token) }
                })
        })
}
