pub mod metadata;
pub mod readme;

use std::path::PathBuf;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::github::types::RawRepository;
use crate::github::{GitHubClient, GitHubError, StarredPage, Target};
use crate::output::{self, ScanResult};
use metadata::RepositoryMetadata;

/// Below this many remaining API calls a warning is logged after each page.
const RATE_LIMIT_WARN_THRESHOLD: u64 = 10;
const PROGRESS_EVERY: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error("failed to serialize scan result: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Settings for one scan, resolved from the command line.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub target: Target,
    pub per_page: u8,
    pub max_pages: Option<u32>,
    pub limit: Option<usize>,
    pub include_readme: bool,
    pub concurrency: usize,
    pub output: Option<PathBuf>,
}

/// Scan, then write the result. Nothing is written if any fatal error occurs first.
pub async fn run(client: &GitHubClient, options: &ScanOptions) -> Result<(), ScanError> {
    let result = scan(client, options).await?;
    output::write_output(&result, options.output.as_deref())
}

pub async fn scan(client: &GitHubClient, options: &ScanOptions) -> Result<ScanResult, ScanError> {
    if options.target == Target::Authenticated && !client.is_authenticated() {
        warn!("no username or token given; GitHub will likely reject /user/starred");
    }

    let mut raw = fetch_starred(client, &options.target, options.per_page, options.max_pages).await?;
    if let Some(limit) = options.limit {
        raw.truncate(limit);
    }

    info!(count = raw.len(), "processing repositories");
    let mut repositories: Vec<_> = raw.into_iter().map(RepositoryMetadata::from_raw).collect();

    if options.include_readme {
        repositories = enrich(client, repositories, options.concurrency).await;
    }

    Ok(ScanResult::new(options.target.label(), repositories, Utc::now()))
}

/// Request pages in order until one comes back empty or `max_pages` is reached.
pub async fn fetch_starred(
    client: &GitHubClient,
    target: &Target,
    per_page: u8,
    max_pages: Option<u32>,
) -> Result<Vec<RawRepository>, GitHubError> {
    let mut all = Vec::new();
    let mut page = 1u32;

    loop {
        if max_pages.is_some_and(|max| page > max) {
            break;
        }

        info!(page, "fetching page");
        let StarredPage {
            repos,
            rate_limit_remaining,
        } = client.starred_page(target, page, per_page).await?;

        if let Some(remaining) = rate_limit_remaining
            && remaining < RATE_LIMIT_WARN_THRESHOLD
        {
            warn!(remaining, "GitHub API rate limit nearly exhausted");
        }

        if repos.is_empty() {
            break;
        }
        all.extend(repos);
        page += 1;
    }

    info!(count = all.len(), "fetched starred repositories");
    Ok(all)
}

/// Attach README previews. Output order matches input order for any `concurrency`.
pub async fn enrich(
    client: &GitHubClient,
    repositories: Vec<RepositoryMetadata>,
    concurrency: usize,
) -> Vec<RepositoryMetadata> {
    let total = repositories.len();
    stream::iter(repositories)
        .map(|meta| async move {
            let preview = readme::fetch_preview(client, &meta.owner, &meta.name).await;
            meta.with_readme_preview(preview)
        })
        .buffered(concurrency.max(1))
        .enumerate()
        .map(|(i, meta)| {
            if (i + 1) % PROGRESS_EVERY == 0 {
                info!("processed {}/{total} repositories", i + 1);
            }
            meta
        })
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::test_support::raw_repo_json;
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use reqwest::Client;
    use wiremock::matchers::{method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GitHubClient {
        GitHubClient::new(Client::new(), Some("test-token".into()), &server.uri())
    }

    fn options(target: Target) -> ScanOptions {
        ScanOptions {
            target,
            per_page: 100,
            max_pages: None,
            limit: None,
            include_readme: false,
            concurrency: 1,
            output: None,
        }
    }

    fn page_of(names: &[&str]) -> serde_json::Value {
        serde_json::Value::Array(names.iter().map(|n| raw_repo_json("owner", n)).collect())
    }

    async fn mount_page(server: &MockServer, page: u32, names: &[&str]) {
        Mock::given(method("GET"))
            .and(path("/users/octocat/starred"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_of(names)))
            .expect(1)
            .mount(server)
            .await;
    }

    fn octocat() -> Target {
        Target::User("octocat".into())
    }

    #[tokio::test]
    async fn pages_are_concatenated_in_request_order() {
        let server = MockServer::start().await;
        mount_page(&server, 1, &["a", "b"]).await;
        mount_page(&server, 2, &["c", "d"]).await;
        mount_page(&server, 3, &["e"]).await;
        mount_page(&server, 4, &[]).await;

        let repos = fetch_starred(&client(&server), &octocat(), 2, None).await.unwrap();
        let names: Vec<_> = repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn pagination_stops_at_first_empty_page() {
        let server = MockServer::start().await;
        mount_page(&server, 1, &["a"]).await;
        mount_page(&server, 2, &[]).await;
        Mock::given(method("GET"))
            .and(path("/users/octocat/starred"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_of(&["never"])))
            .expect(0)
            .mount(&server)
            .await;

        let repos = fetch_starred(&client(&server), &octocat(), 100, None).await.unwrap();
        assert_eq!(repos.len(), 1);
    }

    #[tokio::test]
    async fn max_pages_caps_request_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/octocat/starred"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_of(&["x", "y"])))
            .expect(3)
            .mount(&server)
            .await;

        let repos = fetch_starred(&client(&server), &octocat(), 2, Some(3)).await.unwrap();
        assert_eq!(repos.len(), 6);
    }

    #[tokio::test]
    async fn low_rate_limit_only_warns() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/octocat/starred"))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("x-ratelimit-remaining", "3")
                    .set_body_json(page_of(&["a"])),
            )
            .mount(&server)
            .await;
        mount_page(&server, 2, &[]).await;

        let repos = fetch_starred(&client(&server), &octocat(), 100, None).await.unwrap();
        assert_eq!(repos.len(), 1);
    }

    #[tokio::test]
    async fn limit_keeps_first_n_in_order() {
        let server = MockServer::start().await;
        let names: Vec<String> = (0..20).map(|i| format!("r{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        mount_page(&server, 1, &refs).await;
        mount_page(&server, 2, &[]).await;

        let opts = ScanOptions {
            limit: Some(5),
            ..options(octocat())
        };
        let result = scan(&client(&server), &opts).await.unwrap();
        assert_eq!(result.total_repositories, 5);
        let got: Vec<_> = result.repositories.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(got, ["r00", "r01", "r02", "r03", "r04"]);
    }

    #[tokio::test]
    async fn zero_stars_is_a_successful_scan() {
        let server = MockServer::start().await;
        mount_page(&server, 1, &[]).await;

        let result = scan(&client(&server), &options(octocat())).await.unwrap();
        assert_eq!(result.total_repositories, 0);
        assert_eq!(result.username, "octocat");
    }

    #[tokio::test]
    async fn authenticated_scan_uses_sentinel_username() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/starred"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_of(&[])))
            .mount(&server)
            .await;

        let result = scan(&client(&server), &options(Target::Authenticated)).await.unwrap();
        assert_eq!(result.username, "authenticated_user");
    }

    #[tokio::test]
    async fn unauthorized_aborts_without_touching_output() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/starred"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/repos/.*/readme$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out/stars.json");
        let opts = ScanOptions {
            include_readme: true,
            output: Some(out.clone()),
            ..options(Target::Authenticated)
        };

        let client = GitHubClient::new(Client::new(), None, &server.uri());
        let result = run(&client, &opts).await;
        assert!(matches!(result, Err(ScanError::GitHub(GitHubError::Unauthorized))));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn unknown_user_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/octocat/starred"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = scan(&client(&server), &options(octocat())).await;
        assert!(matches!(
            result,
            Err(ScanError::GitHub(GitHubError::UserNotFound(ref u))) if u == "octocat"
        ));
    }

    #[tokio::test]
    async fn failure_mid_pagination_discards_earlier_pages() {
        let server = MockServer::start().await;
        mount_page(&server, 1, &["a"]).await;
        Mock::given(method("GET"))
            .and(path("/users/octocat/starred"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let result = scan(&client(&server), &options(octocat())).await;
        assert!(matches!(
            result,
            Err(ScanError::GitHub(GitHubError::Api { code: 500, .. }))
        ));
    }

    async fn mount_readmes(server: &MockServer, names: &[&str], failing: &str) {
        for name in names {
            let template = if *name == failing {
                ResponseTemplate::new(500)
            } else {
                ResponseTemplate::new(200).set_body_json(
                    serde_json::json!({ "content": STANDARD.encode(format!("# {name}")) }),
                )
            };
            Mock::given(method("GET"))
                .and(path(format!("/repos/owner/{name}/readme")))
                .respond_with(template)
                .expect(1)
                .mount(server)
                .await;
        }
    }

    async fn assert_failure_isolated(concurrency: usize) {
        let server = MockServer::start().await;
        let names = ["a", "b", "c", "d", "e"];
        mount_page(&server, 1, &names).await;
        mount_page(&server, 2, &[]).await;
        mount_readmes(&server, &names, "c").await;

        let opts = ScanOptions {
            include_readme: true,
            concurrency,
            ..options(octocat())
        };
        let result = scan(&client(&server), &opts).await.unwrap();

        assert_eq!(result.total_repositories, 5);
        for meta in &result.repositories {
            if meta.name == "c" {
                assert_eq!(meta.readme_preview, None);
            } else {
                assert_eq!(meta.readme_preview, Some(format!("# {}", meta.name)));
            }
        }
        let order: Vec<_> = result.repositories.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(order, names);
    }

    #[tokio::test]
    async fn readme_failure_is_isolated_sequential() {
        assert_failure_isolated(1).await;
    }

    #[tokio::test]
    async fn readme_failure_is_isolated_concurrent() {
        assert_failure_isolated(4).await;
    }

    #[tokio::test]
    async fn readmes_not_requested_unless_enabled() {
        let server = MockServer::start().await;
        mount_page(&server, 1, &["a"]).await;
        mount_page(&server, 2, &[]).await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/repos/.*/readme$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = scan(&client(&server), &options(octocat())).await.unwrap();
        assert_eq!(result.repositories[0].readme_preview, None);
    }

    #[tokio::test]
    async fn run_writes_file_sink() {
        let server = MockServer::start().await;
        mount_page(&server, 1, &["a", "b"]).await;
        mount_page(&server, 2, &[]).await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("data/stars.json");
        let opts = ScanOptions {
            output: Some(out.clone()),
            ..options(octocat())
        };
        run(&client(&server), &opts).await.unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(parsed["total_repositories"], 2);
        assert_eq!(parsed["repositories"][1]["repository"], "owner/b");
    }
}
