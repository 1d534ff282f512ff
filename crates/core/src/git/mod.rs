//! Revision sources backed by Git hosts.

pub mod client;
pub mod github;

pub use client::{GitClient, LocalRepoSource};
pub use github::{GitHubClient, GitHubSource};
