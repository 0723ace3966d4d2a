use tracing::{debug, warn};

use crate::github::{self, GitHubClient, GitHubError};

/// Maximum README preview length, in characters.
pub const PREVIEW_CHARS: usize = 2000;

/// Fetch and truncate a repository's README.
///
/// Every failure is logged and reported as `None`; a missing README never aborts a scan.
pub async fn fetch_preview(client: &GitHubClient, owner: &str, repo: &str) -> Option<String> {
    match load_readme(client, owner, repo).await {
        Ok(content) if content.is_empty() => None,
        Ok(content) => Some(github::truncate_chars(&content, PREVIEW_CHARS).to_string()),
        Err(GitHubError::NotFound(_)) => {
            warn!(owner, repo, "no README found");
            None
        }
        Err(e) => {
            warn!(owner, repo, error = %e, "could not fetch README");
            None
        }
    }
}

async fn load_readme(client: &GitHubClient, owner: &str, repo: &str) -> Result<String, GitHubError> {
    let response = client.get_readme(owner, repo).await?;
    let encoded = response
        .content
        .ok_or_else(|| GitHubError::Decode("README response has no content".into()))?;
    let content = github::decode_content(&encoded)?;
    debug!(owner, repo, chars = content.chars().count(), "README fetched");
    Ok(content)
}
