use serde::Serialize;

use crate::github::types::RawRepository;

/// Normalized record for one starred repository, as written to the output file.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RepositoryMetadata {
    pub repository: String,
    pub owner: String,
    pub name: String,
    pub github_url: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub topics: Vec<String>,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub created_at: String,
    pub updated_at: String,
    pub pushed_at: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<String>,
    pub archived: bool,
    pub fork: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readme_preview: Option<String>,
}

impl RepositoryMetadata {
    /// Map an API record onto the output schema, filling defaults for absent optional keys.
    pub fn from_raw(raw: RawRepository) -> Self {
        Self {
            repository: raw.full_name,
            owner: raw.owner.login,
            name: raw.name,
            github_url: raw.html_url,
            description: raw.description.unwrap_or_else(|| Some(String::new())),
            language: raw.language,
            topics: raw.topics.unwrap_or_default(),
            stars: raw.stargazers_count,
            forks: raw.forks_count,
            open_issues: raw.open_issues_count.unwrap_or(0),
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            pushed_at: raw.pushed_at,
            homepage: raw.homepage,
            license: raw.license.and_then(|l| l.name),
            archived: raw.archived.unwrap_or(false),
            fork: raw.fork.unwrap_or(false),
            readme_preview: None,
        }
    }

    pub fn with_readme_preview(self, readme_preview: Option<String>) -> Self {
        Self {
            readme_preview,
            ..self
        }
    }
}
