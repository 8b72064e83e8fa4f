//! GitHub adapter for the code-host port.

mod client;

pub use client::{GitHubClient, GITHUB_API_BASE};
