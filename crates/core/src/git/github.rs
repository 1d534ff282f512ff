//! GitHub REST API client and the GitHub-backed [`RevisionSource`].

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{StatusCode, Url};
use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::errors::{GitHubError, SourceError};
use crate::source::{decode_text, Comparison, RevisionSource};

/// Response of `GET /repos/{owner}/{repo}/compare/{base}...{head}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CompareResponse {
    pub merge_base_commit: CommitRef,
    #[serde(default)]
    pub files: Vec<ChangedFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    #[serde(default)]
    pub status: String,
}

/// Response of `GET /repos/{owner}/{repo}/contents/{path}`: a single entry
/// for files, symlinks and submodules, or a listing for directories.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Entry(ContentEntry),
    Listing(Vec<IgnoredAny>),
}

#[derive(Debug, Clone, Deserialize)]
struct ContentEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Asynchronous GitHub REST API client.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self, GitHubError> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let token = token.into();
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("mergelens/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let http = reqwest::Client::builder().default_headers(headers).build()?;
        info!(api_url = %api_url, "created GitHubClient");
        Ok(Self {
            http,
            api_url,
            token,
        })
    }

    /// Compare two refs of `repo` (`owner/name`).
    #[instrument(skip(self))]
    pub async fn compare_commits(
        &self,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<CompareResponse, GitHubError> {
        let basehead = format!("{}...{}", base, head);
        let url = self.endpoint(repo, &["compare", &basehead])?;
        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;
        self.check_response(&resp)?;
        let comparison: CompareResponse = resp.json().await?;
        debug!(
            merge_base = %comparison.merge_base_commit.sha,
            files = comparison.files.len(),
            "compared refs"
        );
        Ok(comparison)
    }

    /// Fetch the raw bytes of a file at `rev`. Returns `None` when the path
    /// does not exist at that revision or is not a regular file.
    #[instrument(skip(self))]
    pub async fn get_file_content(
        &self,
        repo: &str,
        path: &str,
        rev: &str,
    ) -> Result<Option<Vec<u8>>, GitHubError> {
        let mut segments = vec!["contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        let mut url = self.endpoint(repo, &segments)?;
        url.query_pairs_mut().append_pair("ref", rev);

        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!(path, rev, "file absent at revision");
            return Ok(None);
        }
        self.check_response(&resp)?;
        let contents: ContentsResponse = resp.json().await?;
        decode_contents(contents)
    }

    /// Build `{api_url}/repos/{owner}/{name}/{segments...}` with each segment
    /// percent-encoded.
    fn endpoint(&self, repo: &str, segments: &[&str]) -> Result<Url, GitHubError> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| GitHubError::ParseError(format!("invalid API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| GitHubError::ParseError("API URL cannot be a base".into()))?
            .pop_if_empty()
            .push("repos")
            .extend(repo.split('/'))
            .extend(segments);
        Ok(url)
    }

    fn check_response(&self, resp: &reqwest::Response) -> Result<(), GitHubError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GitHubError::AuthenticationFailed(format!("HTTP {}", status)));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let reset = resp
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();
            return Err(GitHubError::RateLimited { reset_at: reset });
        }
        Err(GitHubError::ApiError {
            status: status.as_u16(),
            body: format!("HTTP {}", status),
        })
    }
}

fn decode_contents(contents: ContentsResponse) -> Result<Option<Vec<u8>>, GitHubError> {
    let entry = match contents {
        ContentsResponse::Entry(entry) if entry.kind == "file" => entry,
        ContentsResponse::Entry(entry) => {
            debug!(kind = %entry.kind, "not a regular file");
            return Ok(None);
        }
        ContentsResponse::Listing(entries) => {
            debug!(entries = entries.len(), "path is a directory");
            return Ok(None);
        }
    };
    match (entry.encoding.as_deref(), entry.content) {
        (Some("base64"), Some(content)) => {
            // GitHub wraps the payload at 60 columns.
            let compact: String = content.split_ascii_whitespace().collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact)
                .map(Some)
                .map_err(|e| GitHubError::ParseError(format!("invalid base64 content: {}", e)))
        }
        (encoding, _) => Err(GitHubError::ParseError(format!(
            "unsupported content encoding {:?} (file may exceed the contents API limit)",
            encoding.unwrap_or("none")
        ))),
    }
}

// ---------------------------------------------------------------------------
// RevisionSource
// ---------------------------------------------------------------------------

/// A [`RevisionSource`] backed by one GitHub repository.
#[derive(Clone)]
pub struct GitHubSource {
    client: GitHubClient,
    repo: String,
}

impl GitHubSource {
    /// `repo` is `owner/name`.
    pub fn new(client: GitHubClient, repo: impl Into<String>) -> Self {
        Self {
            client,
            repo: repo.into(),
        }
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }
}

#[async_trait]
impl RevisionSource for GitHubSource {
    async fn compare(&self, base_ref: &str, head_ref: &str) -> Result<Comparison, SourceError> {
        let resp = self
            .client
            .compare_commits(&self.repo, base_ref, head_ref)
            .await?;
        Ok(Comparison {
            merge_base_sha: resp.merge_base_commit.sha,
            files: resp.files.into_iter().map(|f| f.filename).collect(),
        })
    }

    async fn fetch(&self, path: &str, rev: &str) -> Result<Option<String>, SourceError> {
        match self.client.get_file_content(&self.repo, path, rev).await? {
            Some(bytes) => decode_text(bytes, path, rev).map(Some),
            None => Ok(None),
        }
    }
}
