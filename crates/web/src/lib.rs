//! mergelens HTTP API.
//!
//! Provides an Axum-based HTTP server with:
//! - Health endpoint
//! - Merge-conflicts preview endpoint backed by the GitHub API

pub mod api;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use mergelens_core::config::{AppConfig, GitHubConfig};
use mergelens_core::errors::GitHubError;
use mergelens_core::git::{GitHubClient, GitHubSource};
use mergelens_core::preview::PreviewSettings;
use mergelens_core::RevisionSource;

/// Hands out a [`RevisionSource`] for a repository named in a request.
pub trait RepoSources: Send + Sync {
    /// The source for `owner/repo`, or `None` when no credentials are
    /// configured.
    fn source_for(&self, owner: &str, repo: &str) -> Option<Arc<dyn RevisionSource>>;
}

/// [`RepoSources`] backed by the GitHub REST API, sharing one HTTP client.
pub struct GitHubSources {
    client: Option<GitHubClient>,
}

impl GitHubSources {
    pub fn from_config(config: &GitHubConfig) -> Result<Self, GitHubError> {
        let client = match config.token.as_deref() {
            Some(token) => Some(GitHubClient::new(&config.api_url, token)?),
            None => {
                warn!(
                    token_env = %config.token_env,
                    "no GitHub token configured; merge previews will be rejected"
                );
                None
            }
        };
        Ok(Self { client })
    }
}

impl RepoSources for GitHubSources {
    fn source_for(&self, owner: &str, repo: &str) -> Option<Arc<dyn RevisionSource>> {
        let client = self.client.clone()?;
        let source = GitHubSource::new(client, format!("{}/{}", owner, repo));
        Some(Arc::new(source))
    }
}

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub sources: Arc<dyn RepoSources>,
    pub preview: PreviewSettings,
}

/// Build the application router with its middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .merge(api::status::routes())
        .merge(api::merge_conflicts::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// The web server.
pub struct WebServer {
    state: Arc<AppState>,
    listen: String,
}

impl WebServer {
    /// Create a web server from resolved configuration.
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let sources = GitHubSources::from_config(&config.github)?;
        let state = Arc::new(AppState {
            sources: Arc::new(sources),
            preview: PreviewSettings::from(&config.merge),
        });
        Ok(Self {
            state,
            listen: config.server.listen.clone(),
        })
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn start<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = self.listen.parse()?;
        let app = router(self.state);

        info!(addr = %addr, "starting web server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("web server stopped");
        Ok(())
    }
}
