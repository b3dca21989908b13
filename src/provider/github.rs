//! GitHub REST API provider.

use reqwest::header::LINK;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::changes::FileChange;
use crate::error::{FilterError, Result};
use crate::provider::{CommitWithDate, ProviderFuture, RepoSlug, RepositoryProvider};
use crate::resolve::DiffRange;

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// REST API version requested on every call.
const API_VERSION: &str = "2022-11-28";

/// Page size requested from the commit listing.
const COMMITS_PER_PAGE: usize = 100;

/// `GET /repos/{owner}/{repo}`
#[derive(Deserialize, Debug)]
struct RepositoryResponse {
    default_branch: String,
}

/// One element of `GET /repos/{owner}/{repo}/tags`
#[derive(Deserialize, Debug)]
struct TagResponse {
    name: String,
}

/// One element of `GET /repos/{owner}/{repo}/commits`
#[derive(Deserialize, Debug)]
struct CommitResponse {
    sha: String,
    commit: CommitDetail,
}

#[derive(Deserialize, Debug)]
struct CommitDetail {
    author: Option<CommitAuthor>,
}

#[derive(Deserialize, Debug)]
struct CommitAuthor {
    date: Option<chrono::DateTime<chrono::Utc>>,
}

/// `GET /repos/{owner}/{repo}/pulls/{number}`
#[derive(Deserialize, Debug)]
struct PullRequestResponse {
    head: PullRequestHead,
}

#[derive(Deserialize, Debug)]
struct PullRequestHead {
    sha: String,
}

/// `GET /repos/{owner}/{repo}/compare/{basehead}`
#[derive(Deserialize, Debug)]
struct CompareResponse {
    files: Option<Vec<FileChange>>,
}

/// Provider backed by the GitHub REST API.
pub struct GitHubProvider {
    /// HTTP client for API requests
    client: Client,
    /// Token sent as a bearer credential
    token: String,
    /// API root, e.g. `https://api.github.com` or a GHES `/api/v3` URL
    base_url: Url,
    /// Repository being inspected
    repository: RepoSlug,
}

impl GitHubProvider {
    /// Creates a provider for `repository` talking to `base_url`.
    pub fn new(token: String, base_url: Url, repository: RepoSlug) -> Self {
        Self {
            client: Client::new(),
            token,
            base_url,
            repository,
        }
    }

    /// Builds `{base}/repos/{owner}/{repo}/{segments...}`, percent-encoding
    /// each segment so branch names containing `/` stay one segment.
    fn repo_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                FilterError::Configuration(format!("API URL cannot be a base: {}", self.base_url))
            })?;
            path.pop_if_empty()
                .push("repos")
                .push(&self.repository.owner)
                .push(&self.repository.name);
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn send(&self, url: &Url) -> Result<Response> {
        debug!(url = %url, "Sending GitHub API request");

        self.client
            .get(url.clone())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(
                "User-Agent",
                concat!("changed-matrix/", env!("CARGO_PKG_VERSION")),
            )
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| FilterError::ProviderUnavailable(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send(&url).await?;
        decode(response, &url).await
    }

    /// Fetches one page of commits, newest first, together with the number
    /// of the last page when the response is paginated.
    async fn fetch_commit_page(
        &self,
        page: usize,
    ) -> Result<(Vec<CommitWithDate>, Option<usize>)> {
        let mut url = self.repo_url(&["commits"])?;
        url.query_pairs_mut()
            .append_pair("per_page", &COMMITS_PER_PAGE.to_string())
            .append_pair("page", &page.to_string());

        let response = self.send(&url).await?;
        let last_page = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(last_page_number);
        let commits: Vec<CommitResponse> = decode(response, &url).await?;

        let commits = commits
            .into_iter()
            .map(|c| CommitWithDate {
                sha: c.sha,
                date: c.commit.author.and_then(|a| a.date),
            })
            .collect();
        Ok((commits, last_page))
    }
}

/// Extracts the `page` of the `rel="last"` entry of a `Link` header.
fn last_page_number(link: &str) -> Option<usize> {
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        if !params.split(';').any(|p| p.trim() == r#"rel="last""#) {
            return None;
        }
        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        Url::parse(target)
            .ok()?
            .query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
    })
}

async fn decode<T: DeserializeOwned>(response: Response, url: &Url) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(FilterError::ProviderUnavailable(format!(
            "HTTP {status} from {url}: {error_text}"
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| FilterError::ProviderUnavailable(format!("invalid response from {url}: {e}")))
}

impl RepositoryProvider for GitHubProvider {
    fn default_branch(&self) -> ProviderFuture<'_, String> {
        Box::pin(async move {
            let repo: RepositoryResponse = self.get_json(self.repo_url(&[])?).await?;
            Ok(repo.default_branch)
        })
    }

    fn last_tag(&self) -> ProviderFuture<'_, Option<String>> {
        Box::pin(async move {
            let mut url = self.repo_url(&["tags"])?;
            url.query_pairs_mut().append_pair("per_page", "1");

            let tags: Vec<TagResponse> = self.get_json(url).await?;
            Ok(tags
                .into_iter()
                .next()
                .map(|t| t.name)
                .filter(|name| !name.is_empty()))
        })
    }

    fn list_commits(&self) -> ProviderFuture<'_, Vec<CommitWithDate>> {
        Box::pin(async move {
            // Pages run newest to oldest, so the root commit is on the last one.
            let (first, last_page) = self.fetch_commit_page(1).await?;
            let commits = match last_page {
                Some(last) if last > 1 => self.fetch_commit_page(last).await?.0,
                _ => first,
            };
            info!(
                count = commits.len(),
                page = last_page.unwrap_or(1),
                "Fetched oldest commits"
            );
            Ok(commits)
        })
    }

    fn pull_request_head(&self, number: u64) -> ProviderFuture<'_, String> {
        Box::pin(async move {
            let url = self.repo_url(&["pulls", &number.to_string()])?;
            let response = self.send(&url).await?;
            if response.status() == StatusCode::NOT_FOUND {
                return Err(FilterError::InvalidReference(format!(
                    "pull request #{number} not found in {}",
                    self.repository
                )));
            }
            let pr: PullRequestResponse = decode(response, &url).await?;
            Ok(pr.head.sha)
        })
    }

    fn compare<'a>(&'a self, range: &'a DiffRange) -> ProviderFuture<'a, Option<Vec<FileChange>>> {
        Box::pin(async move {
            let url = self.repo_url(&["compare", &range.to_string()])?;
            let comparison: CompareResponse = self.get_json(url).await?;
            debug!(
                files = comparison.files.as_ref().map_or(0, Vec::len),
                "Received comparison"
            );
            Ok(comparison.files)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base: &str) -> GitHubProvider {
        GitHubProvider::new(
            "token".to_string(),
            Url::parse(base).unwrap(),
            RepoSlug::parse("acme/platform").unwrap(),
        )
    }

    #[test]
    fn repo_url_for_public_api() {
        let url = provider(DEFAULT_API_URL).repo_url(&["tags"]).unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/repos/acme/platform/tags");
    }

    #[test]
    fn repo_url_keeps_enterprise_prefix() {
        let url = provider("https://ghe.example.com/api/v3/")
            .repo_url(&[])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/acme/platform"
        );
    }

    #[test]
    fn repo_url_encodes_slashes_in_branch_names() {
        let range = DiffRange::new("main", "feature/login").unwrap();
        let url = provider(DEFAULT_API_URL)
            .repo_url(&["compare", &range.to_string()])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/acme/platform/compare/main...feature%2Flogin"
        );
    }

    #[test]
    fn last_page_from_link_header() {
        let link = concat!(
            r#"<https://api.github.com/repositories/1/commits?per_page=100&page=2>; rel="next", "#,
            r#"<https://api.github.com/repositories/1/commits?per_page=100&page=10>; rel="last""#
        );
        assert_eq!(last_page_number(link), Some(10));
    }

    #[test]
    fn link_header_without_last_entry() {
        let link = r#"<https://api.github.com/repositories/1/commits?page=1>; rel="prev""#;
        assert_eq!(last_page_number(link), None);
        assert_eq!(last_page_number(""), None);
    }
}
