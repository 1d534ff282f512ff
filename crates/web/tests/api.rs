//! HTTP-level tests for the API router, driven with `tower::ServiceExt::oneshot`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use mergelens_core::errors::{GitHubError, SourceError};
use mergelens_core::preview::PreviewSettings;
use mergelens_core::{Comparison, RevisionSource};
use mergelens_web::{router, AppState, RepoSources};

// ===========================================================================
// Fakes
// ===========================================================================

/// Revisions keyed by `(rev, path)`; merge base is always `mb`.
struct MemorySource {
    files: Vec<String>,
    contents: HashMap<(String, String), String>,
}

#[async_trait]
impl RevisionSource for MemorySource {
    async fn compare(&self, _base: &str, head: &str) -> Result<Comparison, SourceError> {
        if head == "missing" {
            return Err(GitHubError::ApiError {
                status: 404,
                body: "HTTP 404 Not Found".into(),
            }
            .into());
        }
        Ok(Comparison {
            merge_base_sha: "mb".into(),
            files: self.files.clone(),
        })
    }

    async fn fetch(&self, path: &str, rev: &str) -> Result<Option<String>, SourceError> {
        Ok(self.contents.get(&(rev.to_string(), path.to_string())).cloned())
    }
}

struct FakeSources {
    authenticated: bool,
}

impl RepoSources for FakeSources {
    fn source_for(&self, _owner: &str, _repo: &str) -> Option<Arc<dyn RevisionSource>> {
        if !self.authenticated {
            return None;
        }
        let mut contents = HashMap::new();
        for (rev, text) in [("mb", "a\nb\nc"), ("main", "a\nX\nc"), ("feature", "a\nY\nc")] {
            contents.insert((rev.to_string(), "conflict.txt".to_string()), text.to_string());
        }
        for (rev, text) in [("mb", "1\n2"), ("main", "1\n2"), ("feature", "1\n2\n3")] {
            contents.insert((rev.to_string(), "clean.txt".to_string()), text.to_string());
        }
        Some(Arc::new(MemorySource {
            files: vec!["conflict.txt".into(), "clean.txt".into()],
            contents,
        }))
    }
}

fn app(authenticated: bool) -> axum::Router {
    router(Arc::new(AppState {
        sources: Arc::new(FakeSources { authenticated }),
        preview: PreviewSettings::default(),
    }))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn health_reports_version() {
    let (status, body) = get(app(false), "/api/status/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn missing_parameters_is_bad_request() {
    for uri in [
        "/api/merge-conflicts",
        "/api/merge-conflicts?owner=acme&repo=widgets&base=main",
        "/api/merge-conflicts?owner=acme&repo=&base=main&head=feature",
    ] {
        let (status, body) = get(app(true), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(
            body["error"],
            "Missing required parameters: owner, repo, base, head"
        );
    }
}

#[tokio::test]
async fn unauthenticated_is_rejected() {
    let (status, body) = get(
        app(false),
        "/api/merge-conflicts?owner=acme&repo=widgets&base=main&head=feature",
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Not authenticated");
}

#[tokio::test]
async fn preview_json_shape() {
    let (status, body) = get(
        app(true),
        "/api/merge-conflicts?owner=acme&repo=widgets&base=main&head=feature",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mergeBaseSha"], "mb");
    assert_eq!(body["baseBranch"], "main");
    assert_eq!(body["headBranch"], "feature");
    assert_eq!(body["truncated"], false);

    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);

    let conflict = &files[0];
    assert_eq!(conflict["path"], "conflict.txt");
    assert_eq!(conflict["hasConflicts"], true);
    assert_eq!(conflict["autoResolved"], false);
    assert_eq!(
        conflict["hunks"],
        serde_json::json!([
            { "type": "clean", "resolvedLines": ["a"] },
            { "type": "conflict", "baseLines": ["X"], "headLines": ["Y"], "ancestorLines": ["b"] },
            { "type": "clean", "resolvedLines": ["c"] }
        ])
    );

    let clean = &files[1];
    assert_eq!(clean["path"], "clean.txt");
    assert_eq!(clean["autoResolved"], true);
    assert_eq!(
        clean["hunks"],
        serde_json::json!([{ "type": "clean", "resolvedLines": ["1", "2", "3"] }])
    );
}

#[tokio::test]
async fn comparison_failure_is_internal_error() {
    let (status, body) = get(
        app(true),
        "/api/merge-conflicts?owner=acme&repo=widgets&base=main&head=missing",
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("HTTP 404"));
}
