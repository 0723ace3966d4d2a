use serde::{Deserialize, Deserializer};

/// One entry of `GET /user/starred` or `GET /users/{username}/starred`.
///
/// Non-`Option` fields are required: a record without them fails to decode.
#[derive(Deserialize, Debug, Clone)]
pub struct RawRepository {
    pub full_name: String,
    pub owner: OwnerInfo,
    pub name: String,
    pub html_url: String,
    /// `None` when the key is absent, `Some(None)` when it is `null`.
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub language: Option<String>,
    pub topics: Option<Vec<String>>,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub open_issues_count: Option<u64>,
    pub created_at: String,
    pub updated_at: String,
    pub pushed_at: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<LicenseInfo>,
    pub archived: Option<bool>,
    pub fork: Option<bool>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct OwnerInfo {
    pub login: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LicenseInfo {
    pub name: Option<String>,
}

/// Response from `GET /repos/{owner}/{repo}/readme`.
#[derive(Deserialize, Debug)]
pub struct ContentsResponse {
    pub content: Option<String>,
}

/// Marks a key as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
